//! Manifest runner - applies manifest patches in order
//!
//! Each patch goes through the same plan/apply path as a single CLI call:
//! - Target paths are resolved (and guarded) against the workspace
//! - Declarations already matching their replacement are reported, not rewritten
//! - Applied patches are verified unless the entry opts out

use crate::config::schema::{PatchDefinition, PatchManifest};
use crate::patcher::{apply_from, plan_from, PatchError, PatchOutcome};
use crate::replacement::ReplacementSource;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::tree::MatchLocation;
use crate::verifier::{check, VerifyError};
use crate::ErrorKind;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of running a single manifest patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// The file was rewritten
    Applied { file: PathBuf, location: String },
    /// The declaration already matched the replacement
    AlreadyApplied { file: PathBuf },
    /// Read-only check: applying would change the file
    Pending { file: PathBuf, location: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file, location } => {
                write!(f, "Applied to {} ({})", file.display(), location)
            }
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            PatchResult::Pending { file, location } => {
                write!(f, "Pending for {} ({})", file.display(), location)
            }
        }
    }
}

/// Errors while running a manifest patch
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("verification failed after patching: {0}")]
    Verify(#[from] VerifyError),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Safety(_) => ErrorKind::Io,
            RunError::Patch(e) => e.kind(),
            RunError::Verify(e) => e.kind(),
        }
    }
}

/// Apply every patch in `manifest`, in order.
///
/// A failing patch does not stop later ones; each gets its own result.
pub fn apply_manifest(
    manifest: &PatchManifest,
    workspace_root: &Path,
) -> Vec<(String, Result<PatchResult, RunError>)> {
    manifest
        .patches
        .iter()
        .map(|patch| (patch.id.clone(), apply_one(manifest, patch, workspace_root)))
        .collect()
}

/// Report what [`apply_manifest`] would do without writing anything.
pub fn check_manifest(
    manifest: &PatchManifest,
    workspace_root: &Path,
) -> Vec<(String, Result<PatchResult, RunError>)> {
    manifest
        .patches
        .iter()
        .map(|patch| (patch.id.clone(), check_one(manifest, patch, workspace_root)))
        .collect()
}

fn apply_one(
    manifest: &PatchManifest,
    patch: &PatchDefinition,
    workspace_root: &Path,
) -> Result<PatchResult, RunError> {
    let (file, replacement) = resolve(manifest, patch, workspace_root)?;

    let result = match apply_from(&file, &patch.declaration, &replacement)? {
        PatchOutcome::Applied { file, location } => PatchResult::Applied {
            file,
            location: location.to_string(),
        },
        PatchOutcome::AlreadyApplied { file, .. } => PatchResult::AlreadyApplied { file },
    };

    if patch.verify {
        check(&file, &patch.declaration)?;
    }

    Ok(result)
}

fn check_one(
    manifest: &PatchManifest,
    patch: &PatchDefinition,
    workspace_root: &Path,
) -> Result<PatchResult, RunError> {
    let (file, replacement) = resolve(manifest, patch, workspace_root)?;
    let plan = plan_from(&file, &patch.declaration, &replacement)?;

    Ok(if plan.is_noop() {
        PatchResult::AlreadyApplied { file }
    } else {
        PatchResult::Pending {
            file,
            location: location_label(&plan.location, plan.line),
        }
    })
}

fn location_label(location: &MatchLocation, line: usize) -> String {
    format!("{}, line {}", location, line)
}

/// Resolve the target file and replacement source of a manifest entry.
fn resolve(
    manifest: &PatchManifest,
    patch: &PatchDefinition,
    workspace_root: &Path,
) -> Result<(PathBuf, ReplacementSource), RunError> {
    if !manifest.meta.workspace_relative {
        return Ok((
            PathBuf::from(&patch.file),
            ReplacementSource::resolve(&patch.replacement),
        ));
    }

    let guard = WorkspaceGuard::new(workspace_root)?;
    let file = guard.validate_path(&patch.file)?;

    let candidate = Path::new(&patch.replacement);
    let replacement = if candidate.is_relative() && workspace_root.join(candidate).is_file() {
        ReplacementSource::File(guard.validate_path(candidate)?)
    } else {
        ReplacementSource::resolve(&patch.replacement)
    };

    Ok((file, replacement))
}
