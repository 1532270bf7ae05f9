//! Ahead-of-time compiler interface
//!
//! The AOT generator translates a module's WASM bytecode into host bytecode
//! (one or more host classes), a compact binary descriptor and a thin source
//! stub. It is driven in three steps per module:
//!
//! ```text
//! compile(request)                → set of actually-interpreted functions
//! emit_descriptor(request, set)   → <descriptor-output>/<ns>/<Simple>.meta
//! emit_source_stub(request)       → <source-output>/<ns>/<Simple>.rs
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// What the compiler does when a function is too large to translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterpreterFallback {
    /// Interpret the function without telling anyone
    Silent,
    /// Interpret the function and log a warning
    #[default]
    Warn,
    /// Fail the compilation
    Fail,
}

impl InterpreterFallback {
    /// Wire spelling, as accepted by configuration and generator command lines
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpreterFallback::Silent => "SILENT",
            InterpreterFallback::Warn => "WARN",
            InterpreterFallback::Fail => "FAIL",
        }
    }
}

impl fmt::Display for InterpreterFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpreterFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SILENT" => Ok(InterpreterFallback::Silent),
            "WARN" => Ok(InterpreterFallback::Warn),
            "FAIL" => Ok(InterpreterFallback::Fail),
            other => Err(format!("unknown interpreter fallback policy: {}", other)),
        }
    }
}

/// Everything the generator needs to translate one module
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// WASM binary on disk
    pub wasm_file: &'a Path,
    /// Fully qualified module name (`pkg.Add`)
    pub name: &'a str,
    /// Root that receives the host classes
    pub class_output: &'a Path,
    /// Root that receives the binary descriptor
    pub descriptor_output: &'a Path,
    /// Root that receives the source stub
    pub source_output: &'a Path,
    /// Policy for functions too large to compile
    pub interpreter_fallback: InterpreterFallback,
    /// Function indices forced to interpretation
    pub interpreted_functions: &'a BTreeSet<u32>,
}

/// External ahead-of-time compiler
pub trait AotCompiler: Send + Sync {
    /// Generator name (for diagnostics)
    fn name(&self) -> &str;

    /// Translate the module into host classes.
    ///
    /// Returns the function indices that ended up interpreted: the forced
    /// ones plus whatever the fallback policy added.
    fn compile(&self, request: &CompileRequest<'_>) -> EngineResult<BTreeSet<u32>>;

    /// Write the binary descriptor for the module
    fn emit_descriptor(
        &self,
        request: &CompileRequest<'_>,
        interpreted: &BTreeSet<u32>,
    ) -> EngineResult<()>;

    /// Write the source stub for the module
    fn emit_source_stub(&self, request: &CompileRequest<'_>) -> EngineResult<()>;
}
