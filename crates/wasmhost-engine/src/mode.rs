//! Execution modes and deployment descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a module's code is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Direct interpretation of WASM bytecode
    #[default]
    Interpreter,
    /// Compilation to host code at run time, immediately before first use
    #[serde(alias = "RuntimeCompiler")]
    JitCompiled,
    /// Host code generated at build time and loaded from the package
    #[serde(alias = "BuildTimeCompiler")]
    AheadOfTimeCompiled,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Interpreter => f.write_str("Interpreter"),
            ExecutionMode::JitCompiled => f.write_str("JitCompiled"),
            ExecutionMode::AheadOfTimeCompiled => f.write_str("AheadOfTimeCompiled"),
        }
    }
}

/// What the application is being built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    /// Production target that can generate code at run time
    #[default]
    Jit,
    /// Ahead-of-time native image: no run-time code generation
    Native,
}

impl std::str::FromStr for DeploymentTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jit" => Ok(DeploymentTarget::Jit),
            "native" => Ok(DeploymentTarget::Native),
            other => Err(format!("unknown deployment target '{}' (expected jit or native)", other)),
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentTarget::Jit => f.write_str("jit"),
            DeploymentTarget::Native => f.write_str("native"),
        }
    }
}

/// How the running process was launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaunchMode {
    /// Fixed deployment
    #[default]
    Normal,
    /// Interactive development with live reload
    Development,
    /// Test harness
    Test,
}

/// Deployment target plus launch mode, passed explicitly to every component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deployment {
    /// Build target
    pub target: DeploymentTarget,
    /// Launch mode of the current process
    pub launch_mode: LaunchMode,
}

impl Deployment {
    /// Create a deployment descriptor
    pub fn new(target: DeploymentTarget, launch_mode: LaunchMode) -> Self {
        Self { target, launch_mode }
    }

    /// Whether run-time code generation is impossible
    pub fn is_native_target(&self) -> bool {
        self.target == DeploymentTarget::Native
    }

    /// Whether the process runs a fixed deployment (as opposed to dev/test)
    pub fn is_fixed(&self) -> bool {
        self.launch_mode == LaunchMode::Normal
    }
}
