//! Error types reported by engine callbacks

/// Result type for engine callbacks
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by an external engine (AOT generator, JIT, loader, machine)
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The compiler rejected the module or crashed
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// A generated machine class could not be loaded
    #[error("Load error: {0}")]
    Load(String),

    /// A machine could not be constructed for an instance
    #[error("Construction error: {0}")]
    Construction(String),

    /// Execution trapped
    #[error("Trap: {0}")]
    Trap(String),

    /// I/O failure inside the engine
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Compilation(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Compilation(s.to_string())
    }
}
