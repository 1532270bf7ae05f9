//! Execution strategy selection
//!
//! A pure decision over (payload kind, deployment target, configured mode).
//! Static payloads keep their configured mode, since legality was checked
//! when the module was accepted. Dynamic payloads get the JIT unless the
//! target is native, in which case they degrade to the interpreter.

use std::fmt;

use crate::mode::ExecutionMode;

/// Degraded choice reported alongside a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionWarning {
    /// Dynamic payload on a native target: nothing can be compiled
    InterpreterFallback,
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::InterpreterFallback => f.write_str(
                "no payload configured and ahead-of-time target active; falling back to interpreter",
            ),
        }
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Mode the module will run in
    pub mode: ExecutionMode,
    /// Set when the mode is a degraded choice
    pub warning: Option<SelectionWarning>,
}

/// Resolve the execution mode of a module
pub fn resolve(
    payload_is_dynamic: bool,
    is_native_target: bool,
    configured: ExecutionMode,
) -> Resolution {
    match (payload_is_dynamic, is_native_target) {
        (false, _) => Resolution {
            mode: configured,
            warning: None,
        },
        (true, true) => Resolution {
            mode: ExecutionMode::Interpreter,
            warning: Some(SelectionWarning::InterpreterFallback),
        },
        (true, false) => Resolution {
            mode: ExecutionMode::JitCompiled,
            warning: None,
        },
    }
}
