pub mod loader;
pub mod runner;
pub mod schema;

pub use loader::{discover_manifests, load_from_path, load_from_str, ConfigError};
pub use runner::{apply_manifest, check_manifest, PatchResult, RunError};
pub use schema::{Metadata, PatchDefinition, PatchManifest, ValidationError, ValidationIssue};
