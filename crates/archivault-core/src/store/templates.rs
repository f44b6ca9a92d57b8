use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::layout;
use crate::model::Vault;

/// Resolves a content-template reference to its body.
///
/// References may point into a *different* vault (`vaultName/path`), be
/// already rooted at the `archi-templates` convention directory of the
/// current vault, or be a bare path relative to the current vault. Candidates
/// are tried in that priority order.
pub struct TemplateResolver {
    root: PathBuf,
}

impl TemplateResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, vault: &Vault, reference: &str) -> Result<String, CoreError> {
        for candidate in self.candidates(vault, reference) {
            if candidate.is_file() {
                return fs::read_to_string(&candidate).map_err(|e| {
                    CoreError::failed(format!("reading template {}", candidate.display()), e)
                });
            }
        }
        Err(CoreError::not_found("template", reference))
    }

    fn candidates(&self, vault: &Vault, reference: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // Vault-qualified: "otherVault/path/to/template.md".
        if let Some((head, rest)) = reference.split_once('/') {
            let other = self.root.join(head);
            if head != vault.id && other.is_dir() {
                candidates.push(other.join(rest));
                candidates.push(other.join(layout::TEMPLATES_DIR).join(rest));
            }
        }

        let vault_root = self.root.join(&vault.id);

        // Already rooted at the templates convention directory.
        if Path::new(reference).starts_with(layout::TEMPLATES_DIR) {
            candidates.push(vault_root.join(reference));
        } else {
            // Bare relative reference in the current vault.
            candidates.push(vault_root.join(layout::TEMPLATES_DIR).join(reference));
            candidates.push(vault_root.join(reference));
        }

        candidates
    }
}
