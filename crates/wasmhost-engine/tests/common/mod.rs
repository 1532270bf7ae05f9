//! Shared fakes for engine integration tests
//!
//! - `FakeGenerator`: an AOT generator that writes the usual artifact layout
//! - `CountingJit`, `CountingInterpreter`, `CountingLoader`: engine doubles
//!   that record how often they were used

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use wasmhost_engine::{Deployment, Engines, ModuleRegistry, Orchestrator, WasmConfig};
use wasmhost_sdk::{
    AotCompiler, CompileRequest, EngineError, EngineResult, Instance, InterpreterFactory,
    JitCompiler, Machine, MachineConstructor, MachineKind, MachineLoader,
};

/// Which step of the generator misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `compile` reports failure
    CompileFails,
    /// descriptor step succeeds without writing anything
    NoDescriptor,
    /// source step writes two stubs
    DuplicateStub,
    /// compile writes the machine class only, no inner class
    NoInnerClass,
}

/// Writes `<ns>/<Simple>Machine.hbc`, `<ns>/<Simple>$1.hbc`,
/// `<ns>/<Simple>.meta` (holding the WASM bytes) and `<ns>/<Simple>.rs`
pub struct FakeGenerator {
    pub compiles: AtomicUsize,
    fault: Fault,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::with_fault(Fault::None)
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            compiles: AtomicUsize::new(0),
            fault,
        }
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

fn split(name: &str) -> (String, String) {
    let (ns, simple) = name.rsplit_once('.').unwrap();
    (ns.replace('.', "/"), simple.to_string())
}

impl AotCompiler for FakeGenerator {
    fn name(&self) -> &str {
        "fake-generator"
    }

    fn compile(&self, request: &CompileRequest<'_>) -> EngineResult<BTreeSet<u32>> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::CompileFails {
            return Err(EngineError::Compilation("function 3 is too large".into()));
        }
        let (ns, simple) = split(request.name);
        let dir = request.class_output.join(&ns);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{}Machine.hbc", simple)), request.name.as_bytes())?;
        if self.fault != Fault::NoInnerClass {
            fs::write(dir.join(format!("{}$1.hbc", simple)), b"inner")?;
        }
        Ok(request.interpreted_functions.clone())
    }

    fn emit_descriptor(
        &self,
        request: &CompileRequest<'_>,
        _interpreted: &BTreeSet<u32>,
    ) -> EngineResult<()> {
        if self.fault == Fault::NoDescriptor {
            return Ok(());
        }
        let (ns, simple) = split(request.name);
        let dir = request.descriptor_output.join(&ns);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{}.meta", simple)), fs::read(request.wasm_file)?)?;
        Ok(())
    }

    fn emit_source_stub(&self, request: &CompileRequest<'_>) -> EngineResult<()> {
        let (ns, simple) = split(request.name);
        let dir = request.source_output.join(&ns);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{}.rs", simple)), b"// stub")?;
        if self.fault == Fault::DuplicateStub {
            fs::write(request.source_output.join(format!("{}.rs", simple)), b"// again")?;
        }
        Ok(())
    }
}

pub struct FakeInstance(pub String);

impl FakeInstance {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl Instance for FakeInstance {
    fn module_name(&self) -> &str {
        &self.0
    }
}

/// Machine that reports its kind and sums its arguments
pub struct FakeMachine(pub MachineKind);

impl Machine for FakeMachine {
    fn kind(&self) -> MachineKind {
        self.0
    }

    fn call(&mut self, _func_index: u32, args: &[i64]) -> EngineResult<Vec<i64>> {
        Ok(vec![args.iter().sum()])
    }
}

#[derive(Default)]
pub struct CountingJit {
    pub calls: AtomicUsize,
}

impl JitCompiler for CountingJit {
    fn compile(&self, _instance: &dyn Instance) -> EngineResult<Box<dyn Machine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMachine(MachineKind::Jit)))
    }
}

#[derive(Default)]
pub struct CountingInterpreter {
    pub calls: AtomicUsize,
}

impl InterpreterFactory for CountingInterpreter {
    fn create(&self, _instance: &dyn Instance) -> Box<dyn Machine> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeMachine(MachineKind::Interpreter))
    }
}

#[derive(Default)]
pub struct CountingLoader {
    pub loads: AtomicUsize,
    pub constructions: Arc<AtomicUsize>,
}

impl MachineLoader for CountingLoader {
    fn load(&self, _class_name: &str, _bytes: &[u8]) -> EngineResult<MachineConstructor> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let constructions = Arc::clone(&self.constructions);
        Ok(Arc::new(move |_: &dyn Instance| -> EngineResult<Box<dyn Machine>> {
            constructions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeMachine(MachineKind::Aot)))
        }))
    }
}

/// The three engine doubles plus an [`Engines`] bundle over them
pub struct Doubles {
    pub jit: Arc<CountingJit>,
    pub interpreter: Arc<CountingInterpreter>,
    pub loader: Arc<CountingLoader>,
}

impl Doubles {
    pub fn new() -> Self {
        Self {
            jit: Arc::new(CountingJit::default()),
            interpreter: Arc::new(CountingInterpreter::default()),
            loader: Arc::new(CountingLoader::default()),
        }
    }

    pub fn engines(&self) -> Engines {
        Engines {
            jit: self.jit.clone(),
            interpreter: self.interpreter.clone(),
            loader: self.loader.clone(),
        }
    }

    pub fn jit_calls(&self) -> usize {
        self.jit.calls.load(Ordering::SeqCst)
    }

    pub fn interpreter_calls(&self) -> usize {
        self.interpreter.calls.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loader.loads.load(Ordering::SeqCst)
    }

    pub fn constructions(&self) -> usize {
        self.loader.constructions.load(Ordering::SeqCst)
    }
}

/// A project directory with a config and any number of WASM files
pub struct Project {
    pub dir: TempDir,
    pub config: WasmConfig,
}

impl Project {
    pub fn new(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("wasmhost.toml"), config).unwrap();
        let config = WasmConfig::from_file(&dir.path().join("wasmhost.toml")).unwrap();
        Self { dir, config }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn registry(&self, deployment: &Deployment) -> ModuleRegistry {
        let (registry, skipped) = ModuleRegistry::from_config(&self.config, self.base(), deployment);
        assert!(skipped.is_empty(), "unexpected skipped modules: {:?}", skipped);
        registry
    }

    pub fn orchestrator(&self, generator: Arc<FakeGenerator>) -> Orchestrator {
        Orchestrator::from_config(generator, &self.config.build, self.base())
    }
}
