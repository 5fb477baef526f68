use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A patch manifest: a list of declaration replacements applied in order.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchManifest {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchManifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        for patch in &self.patches {
            let patch_id = (!patch.id.trim().is_empty()).then(|| patch.id.clone());

            if patch_id.is_none() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    patch_id: patch.id.clone(),
                });
            }

            let required = [
                ("file", &patch.file),
                ("declaration", &patch.declaration),
                ("replacement", &patch.replacement),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        patch_id: patch_id.clone(),
                        field,
                    });
                }
            }

            if patch.declaration.trim() != patch.declaration
                || patch.declaration.contains(|c: char| c.is_whitespace() || c == '.')
            {
                issues.push(ValidationIssue::InvalidName {
                    patch_id: patch_id.clone(),
                    name: patch.declaration.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve `file` and file-path replacements against the workspace root.
    #[serde(default)]
    pub workspace_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    /// Python file holding the declaration.
    pub file: String,
    /// Function name to replace.
    pub declaration: String,
    /// Replacement source, or the path of a file containing it.
    pub replacement: String,
    /// Run the verifier after applying.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        patch_id: String,
    },
    InvalidName {
        patch_id: Option<String>,
        name: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "manifest contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { patch_id } => {
                write!(f, "patch id '{patch_id}' is used more than once")
            }
            ValidationIssue::InvalidName { patch_id, name } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid declaration name '{name}'"),
                None => write!(f, "invalid declaration name '{name}'"),
            },
        }
    }
}
