//! Integration tests for build-time orchestration
//!
//! Drives the orchestrator with a fake generator over real temporary
//! project directories.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{FakeGenerator, Fault, Project};
use wasmhost_engine::build::WASM_FILE_GLOB;
use wasmhost_engine::{ArtifactKind, Deployment, Error, Package};

const CONFIG: &str = r#"
[modules.math]
name = "pkg.Add"
wasm-file = "add.wasm"

[modules.math.compiler]
interpreted-functions = [4, 2]

[modules.dyn]
name = "pkg.Dynamic"

[modules.res]
name = "lib.util.Hash"
wasm-resource = "mods/hash.wasm"
"#;

fn project() -> Project {
    let project = Project::new(CONFIG);
    project.write("add.wasm", b"\0asm-add");
    project.write("resources/mods/hash.wasm", b"\0asm-hash");
    project
}

#[test]
fn test_orchestrate_static_modules() {
    let project = project();
    let generator = Arc::new(FakeGenerator::new());
    let registry = project.registry(&Deployment::default());

    let report = project
        .orchestrator(generator.clone())
        .orchestrate(&registry)
        .unwrap();

    assert_eq!(generator.compiles(), 2);
    assert_eq!(report.dynamic, vec!["dyn"]);
    assert!(report.skipped.is_empty());
    let keys: Vec<&str> = report.artifacts.iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["math", "res"]);

    let math = report.artifacts_for("math").unwrap();
    assert_eq!(math.host_classes.len(), 2);
    assert!(math.binary_descriptor.ends_with("wasmhost/math/wasm/pkg/Add.meta"));
    assert_eq!(
        math.interpreted_functions,
        [2, 4].into_iter().collect::<BTreeSet<u32>>()
    );
}

#[test]
fn test_descriptor_packaged_at_namespace_path() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let report = project
        .orchestrator(Arc::new(FakeGenerator::new()))
        .orchestrate(&registry)
        .unwrap();
    let package = report.package(&registry).unwrap();

    assert_eq!(package.resource("pkg/Add.meta"), Some(&b"\0asm-add"[..]));
    assert_eq!(package.resource("lib/util/Hash.meta"), Some(&b"\0asm-hash"[..]));
    assert!(package.is_native_resource("pkg/Add.meta"));
    assert!(package.class("pkg.AddMachine").is_some());
    assert!(package.class("lib.util.HashMachine").is_some());
    assert!(package.auxiliary("pkg/Add.rs").is_some());
    assert_eq!(package.native_resource_globs().collect::<Vec<_>>(), vec![WASM_FILE_GLOB]);
}

#[test]
fn test_orchestration_is_idempotent() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let orchestrator = project.orchestrator(Arc::new(FakeGenerator::new()));

    let first = orchestrator.orchestrate(&registry).unwrap();
    let second = orchestrator.orchestrate(&registry).unwrap();

    assert_eq!(first.artifacts, second.artifacts);
    for set in &second.artifacts {
        assert!(set.binary_descriptor.is_file());
        assert!(set.source_stub.is_file());
        assert!(set.host_classes.iter().all(|c| c.is_file()));
    }
    assert_eq!(
        first.package(&registry).unwrap(),
        second.package(&registry).unwrap()
    );
}

#[test]
fn test_parallel_report_matches_sequential() {
    let project = project();
    let registry = project.registry(&Deployment::default());

    let sequential = project
        .orchestrator(Arc::new(FakeGenerator::new()))
        .with_jobs(1)
        .orchestrate(&registry)
        .unwrap();
    let parallel = project
        .orchestrator(Arc::new(FakeGenerator::new()))
        .with_jobs(4)
        .orchestrate(&registry)
        .unwrap();

    assert_eq!(sequential.artifacts, parallel.artifacts);
    assert_eq!(sequential.dynamic, parallel.dynamic);
}

#[test]
fn test_missing_file_skips_only_that_module() {
    let project = Project::new(CONFIG);
    project.write("resources/mods/hash.wasm", b"\0asm-hash");
    let registry = project.registry(&Deployment::default());
    let generator = Arc::new(FakeGenerator::new());

    let report = project
        .orchestrator(generator.clone())
        .orchestrate(&registry)
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "math");
    assert!(matches!(report.skipped[0].error, Error::ResourceNotFound { .. }));
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.artifacts[0].key, "res");
    assert_eq!(generator.compiles(), 1);
}

#[test]
fn test_missing_resource_skips_module() {
    let project = Project::new(CONFIG);
    project.write("add.wasm", b"\0asm-add");
    let registry = project.registry(&Deployment::default());

    let report = project
        .orchestrator(Arc::new(FakeGenerator::new()))
        .with_jobs(2)
        .orchestrate(&registry)
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "res");
    assert_eq!(report.artifacts[0].key, "math");
}

#[test]
fn test_compiler_failure_aborts() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let err = project
        .orchestrator(Arc::new(FakeGenerator::with_fault(Fault::CompileFails)))
        .orchestrate(&registry)
        .unwrap_err();
    match err {
        Error::Compilation { name, source } => {
            assert_eq!(name, "pkg.Add");
            assert!(source.to_string().contains("too large"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_descriptor_is_fatal() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let err = project
        .orchestrator(Arc::new(FakeGenerator::with_fault(Fault::NoDescriptor)))
        .orchestrate(&registry)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ArtifactNotFound { kind: ArtifactKind::Descriptor, .. }
    ));
    assert!(!err.is_module_local());
}

#[test]
fn test_duplicate_stub_is_fatal() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let err = project
        .orchestrator(Arc::new(FakeGenerator::with_fault(Fault::DuplicateStub)))
        .orchestrate(&registry)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateArtifact { kind: ArtifactKind::SourceStub, .. }
    ));
}

#[test]
fn test_package_survives_disk_round_trip() {
    let project = project();
    let registry = project.registry(&Deployment::default());
    let report = project
        .orchestrator(Arc::new(FakeGenerator::new()))
        .orchestrate(&registry)
        .unwrap();
    let package = report.package(&registry).unwrap();

    let out = project.base().join("target/package");
    package.write_to(&out).unwrap();
    assert_eq!(Package::load(&out).unwrap(), package);
}
