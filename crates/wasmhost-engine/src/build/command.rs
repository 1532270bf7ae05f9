//! External generator process adapter
//!
//! Drives an AOT generator binary in three invocations, one per step:
//!
//! ```text
//! <program> <args...> resources  --wasm-file F --name N --class-output D
//!                                --descriptor-output D --source-output D
//!                                --interpreter-fallback P [--interpreted-functions 1,2]
//! <program> <args...> descriptor ...same flags, with the final interpreted set
//! <program> <args...> sources    ...same flags
//! ```
//!
//! The `resources` step prints the interpreted function indices on stdout
//! as a JSON array.

use std::collections::BTreeSet;
use std::process::Command;

use tracing::debug;
use wasmhost_sdk::{AotCompiler, CompileRequest, EngineError, EngineResult};

/// [`AotCompiler`] backed by an external program
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// Create an adapter for `program` invoked with leading `args`
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line (program first). `None` when empty.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn run(
        &self,
        step: &str,
        request: &CompileRequest<'_>,
        interpreted: &BTreeSet<u32>,
    ) -> EngineResult<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(step)
            .arg("--wasm-file")
            .arg(request.wasm_file)
            .arg("--name")
            .arg(request.name)
            .arg("--class-output")
            .arg(request.class_output)
            .arg("--descriptor-output")
            .arg(request.descriptor_output)
            .arg("--source-output")
            .arg(request.source_output)
            .arg("--interpreter-fallback")
            .arg(request.interpreter_fallback.as_str());
        if !interpreted.is_empty() {
            let list = interpreted
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            command.arg("--interpreted-functions").arg(list);
        }

        debug!(program = self.program.as_str(), step, name = request.name, "running generator");
        let output = command.output().map_err(|e| {
            EngineError::Compilation(format!("cannot run {}: {}", self.program, e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Compilation(format!(
                "{} {} exited with {}: {}",
                self.program,
                step,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl AotCompiler for CommandCompiler {
    fn name(&self) -> &str {
        &self.program
    }

    fn compile(&self, request: &CompileRequest<'_>) -> EngineResult<BTreeSet<u32>> {
        let stdout = self.run("resources", request, request.interpreted_functions)?;
        let text = String::from_utf8_lossy(&stdout);
        let text = text.trim();
        if text.is_empty() {
            return Ok(request.interpreted_functions.clone());
        }
        serde_json::from_str(text).map_err(|e| {
            EngineError::Compilation(format!(
                "{} printed an invalid interpreted function list: {}",
                self.program, e
            ))
        })
    }

    fn emit_descriptor(
        &self,
        request: &CompileRequest<'_>,
        interpreted: &BTreeSet<u32>,
    ) -> EngineResult<()> {
        self.run("descriptor", request, interpreted).map(|_| ())
    }

    fn emit_source_stub(&self, request: &CompileRequest<'_>) -> EngineResult<()> {
        self.run("sources", request, request.interpreted_functions)
            .map(|_| ())
    }
}
