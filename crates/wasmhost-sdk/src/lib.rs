//! wasmhost SDK - interfaces between the host and a WebAssembly engine
//!
//! This crate holds the minimal types and traits an execution engine has to
//! implement to be embedded by `wasmhost-engine`, without depending on it:
//!
//! - [`AotCompiler`]: build-time generator of host classes, descriptor and stub
//! - [`JitCompiler`]: run-time compiler producing a [`Machine`]
//! - [`InterpreterFactory`]: direct interpreter construction
//! - [`MachineLoader`]: turns packaged host classes into constructors

#![warn(missing_docs)]

pub mod compiler;
pub mod error;
pub mod machine;

pub use compiler::{AotCompiler, CompileRequest, InterpreterFallback};
pub use error::{EngineError, EngineResult};
pub use machine::{
    Instance, InterpreterFactory, JitCompiler, Machine, MachineConstructor, MachineFactory,
    MachineKind, MachineLoader,
};
