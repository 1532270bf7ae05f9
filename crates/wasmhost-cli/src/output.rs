//! Colored terminal output for the subcommands.
//!
//! `NO_COLOR` wins over `--color`, which wins over TTY detection.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve the color choice from the `--color` flag and the environment
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// How a fragment of a report line is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Module compiled or reloaded
    Done,
    /// Skipped module or degraded mode
    Warn,
    /// Rejected module or failed rebuild
    Fail,
    /// Informational tag
    Note,
    /// Secondary details
    Faint,
    /// Keys and headings
    Strong,
}

impl Style {
    fn spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Style::Done => spec.set_fg(Some(Color::Green)).set_bold(true),
            Style::Warn => spec.set_fg(Some(Color::Yellow)).set_bold(true),
            Style::Fail => spec.set_fg(Some(Color::Red)).set_bold(true),
            Style::Note => spec.set_fg(Some(Color::Cyan)),
            Style::Faint => spec.set_fg(Some(Color::White)),
            Style::Strong => spec.set_bold(true),
        };
        spec
    }
}

/// Line-oriented report writer over stdout, with errors going to stderr
pub struct Console {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl Console {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Write `text` in `style`
    pub fn styled(&mut self, style: Style, text: &str) {
        let _ = self.stdout.set_color(&style.spec());
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Write `text` uncolored
    pub fn text(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    /// End the current line and flush it, so dev-mode reports show up immediately
    pub fn end_line(&mut self) {
        let _ = writeln!(self.stdout);
        let _ = self.stdout.flush();
    }

    /// Write a whole error line to stderr
    pub fn error_line(&mut self, text: &str) {
        let _ = self.stderr.set_color(&Style::Fail.spec());
        let _ = write!(self.stderr, "{}", text);
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr);
    }
}
