//! Machines and the engines that produce them
//!
//! A machine is the executable handle bound to one module instance. It is
//! produced by one of three strategies:
//! - an interpreter constructed directly over the instance (cannot fail)
//! - a JIT compiler invoked against the instance at run time
//! - a constructor for a host class generated ahead of time

use std::fmt;
use std::sync::Arc;

use crate::error::EngineResult;

/// Which strategy produced a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineKind {
    /// Direct interpretation of WASM bytecode
    Interpreter,
    /// Host code generated at run time
    Jit,
    /// Host code generated at build time
    Aot,
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineKind::Interpreter => f.write_str("interpreter"),
            MachineKind::Jit => f.write_str("jit"),
            MachineKind::Aot => f.write_str("aot"),
        }
    }
}

/// An instantiated module, as seen by the machine producers
pub trait Instance: Send + Sync {
    /// Fully qualified name of the module this instance was created from
    fn module_name(&self) -> &str;
}

/// Executable handle for one module instance
pub trait Machine: Send {
    /// Strategy that produced this machine
    fn kind(&self) -> MachineKind;

    /// Invoke a function by index with raw operand values
    fn call(&mut self, func_index: u32, args: &[i64]) -> EngineResult<Vec<i64>>;
}

/// Constructor for an ahead-of-time generated machine class
pub type MachineConstructor =
    Arc<dyn Fn(&dyn Instance) -> EngineResult<Box<dyn Machine>> + Send + Sync>;

/// Function from an instantiated module to its machine, handed out per context.
///
/// Generic over the error so the engine can report its own taxonomy.
pub type MachineFactory<E> =
    Arc<dyn Fn(&dyn Instance) -> Result<Box<dyn Machine>, E> + Send + Sync>;

/// Builds interpreter machines
pub trait InterpreterFactory: Send + Sync {
    /// Construct an interpreter over the instance
    fn create(&self, instance: &dyn Instance) -> Box<dyn Machine>;
}

/// Compiles an instance to host code at run time
pub trait JitCompiler: Send + Sync {
    /// Compile the instance and return a machine running the generated code
    fn compile(&self, instance: &dyn Instance) -> EngineResult<Box<dyn Machine>>;
}

/// Turns packaged host-class bytes into a machine constructor
pub trait MachineLoader: Send + Sync {
    /// Load the class `class_name` from its packaged bytes
    fn load(&self, class_name: &str, bytes: &[u8]) -> EngineResult<MachineConstructor>;
}

impl<F> InterpreterFactory for F
where
    F: Fn(&dyn Instance) -> Box<dyn Machine> + Send + Sync,
{
    fn create(&self, instance: &dyn Instance) -> Box<dyn Machine> {
        self(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Instance for Named {
        fn module_name(&self) -> &str {
            self.0
        }
    }

    struct Echo;

    impl Machine for Echo {
        fn kind(&self) -> MachineKind {
            MachineKind::Interpreter
        }

        fn call(&mut self, _func_index: u32, args: &[i64]) -> EngineResult<Vec<i64>> {
            Ok(args.to_vec())
        }
    }

    #[test]
    fn test_closure_as_interpreter_factory() {
        let factory = |_: &dyn Instance| -> Box<dyn Machine> { Box::new(Echo) };
        let mut machine = factory.create(&Named("pkg.Add"));
        assert_eq!(machine.kind(), MachineKind::Interpreter);
        assert_eq!(machine.call(0, &[41, 1]).unwrap(), vec![41, 1]);
    }

    #[test]
    fn test_machine_kind_display() {
        assert_eq!(MachineKind::Aot.to_string(), "aot");
        assert_eq!(MachineKind::Jit.to_string(), "jit");
    }
}
