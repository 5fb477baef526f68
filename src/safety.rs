use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory names that never hold patch targets, wherever they appear
/// inside the workspace.
const FORBIDDEN_COMPONENTS: &[&str] = &[".git", ".venv", "venv", "__pycache__", "site-packages"];

/// Workspace safety checks for manifest-driven patching.
///
/// Manifest entries name files relative to a workspace; the guard keeps
/// them from escaping it (via `..` or symlinks) and from landing in
/// interpreter-managed directories.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root is canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let mut forbidden_paths = Vec::new();

        // User-level interpreter installs and site-packages
        if let Some(home) = home::home_dir() {
            for dir in [".local/lib", ".pyenv"] {
                if let Ok(path) = home.join(dir).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to patch.
    ///
    /// Relative paths are resolved against the workspace root. Returns the
    /// canonicalized absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = canonicalize(&absolute)?;
        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        let relative = canonical
            .strip_prefix(&self.workspace_root)
            .unwrap_or(canonical);
        let mut prefix = self.workspace_root.clone();
        for component in relative.components() {
            prefix.push(component);
            let is_forbidden = component
                .as_os_str()
                .to_str()
                .is_some_and(|name| FORBIDDEN_COMPONENTS.contains(&name));
            if is_forbidden {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: prefix,
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            workspace_root: canonicalize(workspace_root.as_ref())?,
            forbidden_paths: forbidden,
        })
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize()
        .map_err(|source| SafetyError::Canonicalize {
            path: path.to_path_buf(),
            source,
        })
}
