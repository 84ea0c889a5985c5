//! Loading descriptors from JSON or YAML documents

use crate::{Result, ServiceDescriptor, validate::validate};
use mon_fs::{ConfigStore, DocumentFormat, NormalizedPath};

/// Load and validate a descriptor; the format follows the file extension.
pub fn load_descriptor(path: &NormalizedPath) -> Result<ServiceDescriptor> {
    let descriptor: ServiceDescriptor = ConfigStore::new().load(path)?;
    validate(&descriptor)?;
    tracing::debug!(
        path = %path,
        service = %descriptor.identification.name,
        dependencies = descriptor.dependencies.len(),
        logs = descriptor.logs.len(),
        environments = descriptor.environments.len(),
        "loaded service descriptor"
    );
    Ok(descriptor)
}

/// Parse and validate descriptor text already in memory.
pub fn parse_descriptor(content: &str, format: DocumentFormat) -> Result<ServiceDescriptor> {
    let origin = NormalizedPath::new("<inline>");
    let descriptor: ServiceDescriptor = ConfigStore::new().parse(&origin, format, content)?;
    validate(&descriptor)?;
    Ok(descriptor)
}
