//! Machine resolution
//!
//! Two providers, picked by launch mode:
//!
//! | resolved mode         | deployment provider    | development provider        |
//! |-----------------------|------------------------|-----------------------------|
//! | `Interpreter`         | interpreter            | interpreter                 |
//! | `JitCompiled`         | JIT compiler           | JIT compiler                |
//! | `AheadOfTimeCompiled` | packaged machine class | JIT (interpreter if native) |
//!
//! The development provider never touches build-time classes, so edits to a
//! module's payload take effect without a restart.

use std::sync::Arc;

use tracing::debug;
use wasmhost_sdk::{Instance, InterpreterFactory, JitCompiler, Machine, MachineFactory};

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::mode::{Deployment, ExecutionMode};
use crate::runtime::machines::MachineRegistry;

/// Which machine provider a resolver uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Fixed deployment: honours ahead-of-time classes
    Deployment,
    /// Development or test: always builds fresh machines
    Development,
}

impl Provider {
    /// Provider for a deployment's launch mode
    pub fn for_deployment(deployment: &Deployment) -> Self {
        if deployment.is_fixed() {
            Provider::Deployment
        } else {
            Provider::Development
        }
    }
}

/// Strategy a factory ends up using
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineStrategy {
    /// Construct the interpreter directly
    Interpreter,
    /// Run the JIT compiler
    Jit,
    /// Instantiate a packaged machine class
    Aot {
        /// Machine class name
        class: String,
    },
}

/// Turns execution contexts into machine factories
#[derive(Clone)]
pub struct MachineResolver {
    provider: Provider,
    jit: Arc<dyn JitCompiler>,
    interpreter: Arc<dyn InterpreterFactory>,
    machines: Arc<MachineRegistry>,
}

impl MachineResolver {
    /// Create a resolver
    pub fn new(
        provider: Provider,
        jit: Arc<dyn JitCompiler>,
        interpreter: Arc<dyn InterpreterFactory>,
        machines: Arc<MachineRegistry>,
    ) -> Self {
        Self {
            provider,
            jit,
            interpreter,
            machines,
        }
    }

    /// Active provider
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Strategy for a context under the active provider
    pub fn strategy(&self, ctx: &ExecutionContext) -> MachineStrategy {
        match (self.provider, ctx.resolved_mode()) {
            (_, ExecutionMode::Interpreter) => MachineStrategy::Interpreter,
            (_, ExecutionMode::JitCompiled) => MachineStrategy::Jit,
            (Provider::Deployment, ExecutionMode::AheadOfTimeCompiled) => MachineStrategy::Aot {
                class: ctx.name().machine_class(),
            },
            (Provider::Development, ExecutionMode::AheadOfTimeCompiled) => {
                if ctx.is_native_target() {
                    MachineStrategy::Interpreter
                } else {
                    MachineStrategy::Jit
                }
            }
        }
    }

    /// Machine factory for a context.
    ///
    /// Never fails itself; class lookup and compilation happen per instance.
    pub fn machine_factory(&self, ctx: &ExecutionContext) -> MachineFactory<Error> {
        let strategy = self.strategy(ctx);
        debug!(key = ctx.key(), mode = %ctx.resolved_mode(), ?strategy, "machine factory resolved");

        match strategy {
            MachineStrategy::Interpreter => {
                let interpreter = Arc::clone(&self.interpreter);
                Arc::new(move |instance: &dyn Instance| -> Result<Box<dyn Machine>> {
                    Ok(interpreter.create(instance))
                })
            }
            MachineStrategy::Jit => {
                let jit = Arc::clone(&self.jit);
                let name = ctx.name().to_string();
                Arc::new(move |instance: &dyn Instance| -> Result<Box<dyn Machine>> {
                    jit.compile(instance).map_err(|source| Error::Compilation {
                        name: name.clone(),
                        source,
                    })
                })
            }
            MachineStrategy::Aot { class } => {
                let machines = Arc::clone(&self.machines);
                Arc::new(move |instance: &dyn Instance| -> Result<Box<dyn Machine>> {
                    machines.instantiate(&class, instance)
                })
            }
        }
    }
}

impl std::fmt::Debug for MachineResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineResolver")
            .field("provider", &self.provider)
            .field("machines", &self.machines)
            .finish()
    }
}
