use crate::config::schema::{PatchManifest, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    Discovery {
        path: PathBuf,
        source: walkdir::Error,
    },
    NoManifests {
        path: PathBuf,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read manifest {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse manifest TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse manifest TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid manifest ({}): {}", path.display(), source),
                None => write!(f, "invalid manifest: {}", source),
            },
            ConfigError::Discovery { path, source } => {
                write!(f, "failed to scan {} for manifests: {}", path.display(), source)
            }
            ConfigError::NoManifests { path } => {
                write!(f, "no .toml manifests found in {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Discovery { source, .. } => Some(source),
            ConfigError::NoManifests { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchManifest, ConfigError> {
    let manifest: PatchManifest = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    manifest
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(manifest)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchManifest, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Expand a manifest argument into manifest files.
///
/// A file is returned as-is. A directory yields its `*.toml` entries (not
/// recursive), sorted by path.
pub fn discover_manifests(path: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Discovery {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    if files.is_empty() {
        return Err(ConfigError::NoManifests {
            path: path.to_path_buf(),
        });
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[meta]
name = "launch-updates"
workspace_relative = true

[[patches]]
id = "robot-move"
file = "robot.py"
declaration = "move"
replacement = """
def move(self):
    return True
"""

[[patches]]
id = "start"
file = "app.py"
declaration = "start"
replacement = "patches/start.py"
verify = false
"#;

    #[test]
    fn load_valid_manifest() {
        let manifest = load_from_str(MANIFEST).unwrap();

        assert_eq!(manifest.meta.name, "launch-updates");
        assert!(manifest.meta.workspace_relative);
        assert_eq!(manifest.patches.len(), 2);
        assert_eq!(manifest.patches[0].declaration, "move");
        assert!(manifest.patches[0].verify);
        assert!(!manifest.patches[1].verify);
        assert!(manifest.patches[0].replacement.contains("return True"));
    }

    #[test]
    fn reject_empty_manifest() {
        let err = load_from_str("[meta]\nname = \"empty\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("no patches"));
    }

    #[test]
    fn reject_missing_fields() {
        let err = load_from_str(
            r#"
[[patches]]
id = "broken"
file = ""
declaration = "move"
replacement = "def move(self): pass"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'file'"));
    }

    #[test]
    fn reject_duplicate_ids_and_dotted_names() {
        let err = load_from_str(
            r#"
[[patches]]
id = "same"
file = "a.py"
declaration = "Robot.move"
replacement = "def move(self): pass"

[[patches]]
id = "same"
file = "b.py"
declaration = "start"
replacement = "def start(): pass"
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("used more than once"));
        assert!(message.contains("Robot.move"));
    }

    #[test]
    fn reject_bad_toml() {
        let err = load_from_str("[[patches]\nid = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("empty.toml"));
    }

    #[test]
    fn discover_sorted_toml_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("b.toml"), MANIFEST).unwrap();
        fs::write(temp_dir.path().join("a.toml"), MANIFEST).unwrap();
        fs::write(temp_dir.path().join("notes.md"), "").unwrap();

        let files = discover_manifests(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn discover_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = discover_manifests(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoManifests { .. }));
    }
}
