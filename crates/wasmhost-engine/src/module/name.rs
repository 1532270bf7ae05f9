//! Qualified module names and the artifact names derived from them

use std::fmt;

/// Suffix appended to a module's simple name to form its machine class
pub const MACHINE_SUFFIX: &str = "Machine";

/// A dotted, namespace-qualified module name such as `pkg.sub.Add`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    namespace: String,
    simple: String,
}

impl QualifiedName {
    /// Parse a dotted name.
    ///
    /// The name needs at least one namespace segment, and every segment must be
    /// non-empty and made of ASCII alphanumerics, `_` or `$`.
    pub fn parse(name: &str) -> Result<Self, String> {
        let name = name.trim();
        let (namespace, simple) = name
            .rsplit_once('.')
            .ok_or_else(|| format!("'{}' has no namespace (expected e.g. pkg.{})", name, name))?;

        for segment in name.split('.') {
            if segment.is_empty() {
                return Err(format!("'{}' contains an empty segment", name));
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
            {
                return Err(format!("'{}' contains invalid character '{}'", name, c));
            }
        }

        Ok(Self {
            namespace: namespace.to_string(),
            simple: simple.to_string(),
        })
    }

    /// Dotted namespace (`pkg.sub`)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Last segment (`Add`)
    pub fn simple_name(&self) -> &str {
        &self.simple
    }

    /// Namespace as a resource path (`pkg/sub`)
    pub fn namespace_path(&self) -> String {
        self.namespace.replace('.', "/")
    }

    /// Packaged resource path of a file generated for this module
    pub fn resource_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.namespace_path(), file_name)
    }

    /// Packaged path of the binary descriptor (`pkg/sub/Add.meta`)
    pub fn descriptor_resource(&self, extension: &str) -> String {
        self.resource_path(&format!("{}.{}", self.simple, extension))
    }

    /// Class name of the ahead-of-time machine (`pkg.sub.AddMachine`)
    pub fn machine_class(&self) -> String {
        self.class_name(&format!("{}{}", self.simple, MACHINE_SUFFIX))
    }

    /// Fully qualified class name of a generated artifact stem in this namespace
    pub fn class_name(&self, stem: &str) -> String {
        format!("{}.{}", self.namespace, stem)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.simple)
    }
}
