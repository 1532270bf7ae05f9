//! Module payload loading
//!
//! Fixed deployments and native targets are served the binary descriptor
//! produced at build time; development and test processes read the raw
//! WASM so that edits are picked up. Dynamic modules have no payload.

use std::fs;
use std::path::PathBuf;

use crate::build::ArtifactLayout;
use crate::error::{ArtifactKind, Error, Result};
use crate::mode::Deployment;
use crate::module::PayloadSource;
use crate::resources::ResourceLocator;
use crate::runtime::store::ModuleSnapshot;

/// Load the bytes a module should be parsed from, or `None` for a dynamic module
pub fn load_payload(
    snapshot: &ModuleSnapshot,
    deployment: &Deployment,
    resources: &ResourceLocator,
    layout: &ArtifactLayout,
) -> Result<Option<Vec<u8>>> {
    let descriptor = &snapshot.descriptor;
    if descriptor.is_dynamic() {
        return Ok(None);
    }

    if deployment.is_native_target() || deployment.is_fixed() {
        let name = descriptor.name();
        let resource = name.descriptor_resource(&layout.descriptor_extension);
        let bytes = snapshot
            .package
            .resource(&resource)
            .ok_or_else(|| Error::ArtifactNotFound {
                name: name.to_string(),
                kind: ArtifactKind::Descriptor,
                root: PathBuf::from(&resource),
            })?;
        return Ok(Some(bytes.to_vec()));
    }

    let bytes = match descriptor.payload() {
        PayloadSource::StaticFile(path) => fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ResourceNotFound {
                    key: descriptor.key().to_string(),
                    resource: path.display().to_string(),
                }
            } else {
                Error::io(path, e)
            }
        })?,
        PayloadSource::StaticResource(name) => resources.read(descriptor.key(), name)?,
        PayloadSource::Dynamic => return Ok(None),
    };
    Ok(Some(bytes))
}
