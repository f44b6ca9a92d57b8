use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::CoreError;
use crate::layout;
use crate::model::{Address, ArtifactMetadata, TargetType, VaultRef};
use crate::store::fsutil;

/// Which relation list an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    Artifacts,
    CodePaths,
}

/// Persists per-entity metadata as side-car YAML files under each vault's
/// `.metadata/` directory.
///
/// Records are addressed by a file stem: an artifact's own metadata id (its
/// content-file stem, which makes the side-car guessable during indexing), or
/// the sanitized composite key for file/folder/vault targets. Writes are
/// atomic replaces; there is no cross-call locking.
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The record file stem for a composite (non-artifact) address.
    pub fn composite_stem(address: &Address) -> String {
        debug_assert!(address.target_type() != TargetType::Artifact);
        fsutil::sanitize_stem(&address.encode())
    }

    pub fn record_path(&self, vault_id: &str, stem: &str) -> PathBuf {
        self.metadata_dir(vault_id)
            .join(format!("{stem}{}", layout::METADATA_SUFFIX))
    }

    fn metadata_dir(&self, vault_id: &str) -> PathBuf {
        self.root.join(vault_id).join(layout::METADATA_DIR)
    }

    /// Load a record if it exists. Parse failures are real errors, a missing
    /// file is not.
    pub fn find(&self, vault_id: &str, stem: &str) -> Result<Option<ArtifactMetadata>, CoreError> {
        let path = self.record_path(vault_id, stem);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| CoreError::failed(format!("reading metadata {}", path.display()), e))?;
        Ok(Some(serde_yaml::from_str(&raw)?))
    }

    /// Return the stored record for the address, creating an empty one when
    /// none exists. Idempotent: repeated calls return the same record.
    pub fn get_or_create(
        &self,
        vault: &VaultRef,
        address: &Address,
        stem: &str,
    ) -> Result<ArtifactMetadata, CoreError> {
        if let Some(existing) = self.find(&vault.id, stem)? {
            return Ok(existing);
        }
        let record = ArtifactMetadata::new(address, vault);
        self.write(&vault.id, stem, &record)?;
        Ok(record)
    }

    pub fn write(
        &self,
        vault_id: &str,
        stem: &str,
        record: &ArtifactMetadata,
    ) -> Result<(), CoreError> {
        let path = self.record_path(vault_id, stem);
        let yaml = serde_yaml::to_string(record)?;
        fsutil::atomic_write(&path, yaml.as_bytes())
            .map_err(|e| CoreError::failed(format!("writing metadata {}", path.display()), e))
    }

    /// Remove a record. Missing files are fine.
    pub fn delete(&self, vault_id: &str, stem: &str) -> Result<(), CoreError> {
        let path = self.record_path(vault_id, stem);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::failed(format!("deleting metadata {}", path.display()), e)),
        }
    }

    /// Bump a record's `updatedAt` if it exists.
    pub fn touch(&self, vault_id: &str, stem: &str) -> Result<(), CoreError> {
        if let Some(mut record) = self.find(vault_id, stem)? {
            record.updated_at = Utc::now();
            self.write(vault_id, stem, &record)?;
        }
        Ok(())
    }

    /// Replace a relation list wholesale. Duplicate entries are rejected with
    /// `InvalidInput` before anything is touched; an empty list clears the
    /// field (omitted on disk, not stored as an empty array).
    pub fn update_relations(
        &self,
        vault: &VaultRef,
        address: &Address,
        stem: &str,
        field: RelationField,
        entries: &[String],
    ) -> Result<ArtifactMetadata, CoreError> {
        if let Some(dup) = first_duplicate(entries) {
            return Err(CoreError::InvalidInput(format!(
                "duplicate relation entry: {dup}"
            )));
        }

        let mut record = self.get_or_create(vault, address, stem)?;
        let value = if entries.is_empty() {
            None
        } else {
            Some(entries.to_vec())
        };
        match field {
            RelationField::Artifacts => record.related_artifacts = value,
            RelationField::CodePaths => record.related_code_paths = value,
        }
        record.updated_at = Utc::now();
        self.write(&vault.id, stem, &record)?;
        Ok(record)
    }

    /// All metadata records of one vault, for reverse lookups. Unparsable
    /// records are skipped with a warning.
    pub fn scan_vault(&self, vault_id: &str) -> Result<Vec<ArtifactMetadata>, CoreError> {
        let dir = self.metadata_dir(vault_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)
            .map_err(|e| CoreError::failed(format!("scanning {}", dir.display()), e))?
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(vault = vault_id, "Skipping unreadable metadata entry: {e}");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(layout::METADATA_SUFFIX) {
                continue;
            }
            match read_record(&entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(vault = vault_id, file = %name, "Skipping unparsable metadata record: {e}");
                }
            }
        }
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<ArtifactMetadata, CoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::failed(format!("reading {}", path.display()), e))?;
    Ok(serde_yaml::from_str(&raw)?)
}

fn first_duplicate(entries: &[String]) -> Option<&String> {
    let mut seen = std::collections::HashSet::new();
    entries.iter().find(|e| !seen.insert(e.as_str()))
}
