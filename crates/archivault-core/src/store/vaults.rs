use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::CoreError;
use crate::layout;
use crate::model::{Vault, VaultDescriptor, VaultType};
use crate::store::fsutil;

/// Discovers and describes vaults under a root directory.
///
/// Zero-configuration: every non-hidden, non-system subdirectory is a vault.
/// The in-memory map is a cache of the last scan only; every query re-derives
/// it from disk, so the filesystem stays the single source of truth.
pub struct VaultRegistry {
    root: PathBuf,
    cache: HashMap<String, Vault>,
}

impl VaultRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root directory and return every vault, sorted by id.
    /// Unreadable entries are skipped with a warning, not fatal to the scan.
    pub fn find_all(&mut self) -> Result<Vec<Vault>, CoreError> {
        self.cache.clear();

        let entries = fs::read_dir(&self.root)
            .map_err(|e| CoreError::failed(format!("scanning vault root {}", self.root.display()), e))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable root entry: {e}");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || layout::ROOT_SYSTEM_DIRS.contains(&name.as_str()) {
                continue;
            }
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(dir = %name, "Skipping entry with unreadable file type: {e}");
                    continue;
                }
            }

            match load_vault(&entry.path(), &name) {
                Ok(vault) => {
                    self.cache.insert(vault.id.clone(), vault);
                }
                Err(e) => {
                    tracing::warn!(dir = %name, "Skipping vault directory: {e}");
                }
            }
        }

        let mut vaults: Vec<Vault> = self.cache.values().cloned().collect();
        vaults.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vaults)
    }

    pub fn find_by_id(&mut self, id: &str) -> Result<Vault, CoreError> {
        self.find_all()?;
        self.cache
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("vault", id))
    }

    pub fn find_by_name(&mut self, name: &str) -> Result<Vault, CoreError> {
        self.find_all()?;
        self.cache
            .values()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| CoreError::not_found("vault", name))
    }

    /// Create the vault directory if missing and write its descriptor.
    ///
    /// Idempotent-create: an existing descriptor is never overwritten. Remote
    /// credentials belong to the host's secret store and are not persisted
    /// here.
    pub fn save(&mut self, vault: &Vault) -> Result<Vault, CoreError> {
        let vault_dir = self.root.join(&vault.id);
        fs::create_dir_all(&vault_dir)
            .map_err(|e| CoreError::failed(format!("creating vault directory {}", vault_dir.display()), e))?;

        let descriptor_path = vault_dir
            .join(layout::METADATA_DIR)
            .join(layout::VAULT_DESCRIPTOR_FILE);

        if !descriptor_path.exists() {
            let mut descriptor = VaultDescriptor::from_vault(vault);
            let now = Utc::now();
            descriptor.created_at.get_or_insert(now);
            descriptor.updated_at.get_or_insert(now);
            let yaml = serde_yaml::to_string(&descriptor)?;
            fsutil::atomic_write(&descriptor_path, yaml.as_bytes())
                .map_err(|e| CoreError::failed(format!("writing vault descriptor for {}", vault.id), e))?;
        }

        let stored = load_vault(&vault_dir, &vault.id)?;
        self.cache.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    /// Remove registry bookkeeping for a vault. The directory itself is left
    /// in place; file deletion is an explicit separate step for the caller.
    pub fn delete(&mut self, id: &str) -> Result<(), CoreError> {
        self.find_all()?;
        if self.cache.remove(id).is_none() {
            return Err(CoreError::not_found("vault", id));
        }
        Ok(())
    }
}

/// Materialize a vault from its directory: descriptor when present
/// (authoritative), conventional-subdirectory inference otherwise.
fn load_vault(vault_dir: &Path, dir_name: &str) -> Result<Vault, CoreError> {
    let descriptor_path = vault_dir
        .join(layout::METADATA_DIR)
        .join(layout::VAULT_DESCRIPTOR_FILE);

    if descriptor_path.exists() {
        let raw = fs::read_to_string(&descriptor_path)
            .map_err(|e| CoreError::failed(format!("reading {}", descriptor_path.display()), e))?;
        let descriptor: VaultDescriptor = serde_yaml::from_str(&raw)?;
        return Ok(descriptor.into_vault(dir_name));
    }

    let mut vault = Vault::new(dir_name);
    vault.vault_type = VaultType::infer(vault_dir);
    Ok(vault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(tmp: &TempDir) -> VaultRegistry {
        VaultRegistry::new(tmp.path())
    }

    #[test]
    fn test_find_all_discovers_plain_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("alpha")).unwrap();
        fs::create_dir(tmp.path().join("beta")).unwrap();
        fs::create_dir(tmp.path().join(".hidden")).unwrap();
        fs::create_dir(tmp.path().join("node_modules")).unwrap();
        fs::write(tmp.path().join("stray.txt"), "not a vault").unwrap();

        let vaults = registry(&tmp).find_all().unwrap();
        let ids: Vec<&str> = vaults.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(vaults[0].vault_type, VaultType::Document);
    }

    #[test]
    fn test_type_inferred_from_conventional_subdirectories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("t1").join(layout::TASKS_DIR)).unwrap();
        fs::create_dir_all(tmp.path().join("t2").join(layout::TEMPLATES_DIR)).unwrap();
        fs::create_dir_all(tmp.path().join("t3").join(layout::AI_ENHANCEMENTS_DIR)).unwrap();
        fs::create_dir_all(tmp.path().join("t4").join("docs")).unwrap();

        let mut reg = registry(&tmp);
        assert_eq!(reg.find_by_id("t1").unwrap().vault_type, VaultType::Task);
        assert_eq!(reg.find_by_id("t2").unwrap().vault_type, VaultType::Template);
        assert_eq!(reg.find_by_id("t3").unwrap().vault_type, VaultType::AiEnhancement);
        assert_eq!(reg.find_by_id("t4").unwrap().vault_type, VaultType::Document);
    }

    #[test]
    fn test_descriptor_is_authoritative() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("docs").join(layout::METADATA_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(layout::VAULT_DESCRIPTOR_FILE),
            "id: docs\nname: Design Documents\ntype: template\n",
        )
        .unwrap();
        // The conventional subdirectory would say "task"; descriptor wins.
        fs::create_dir_all(tmp.path().join("docs").join(layout::TASKS_DIR)).unwrap();

        let vault = registry(&tmp).find_by_id("docs").unwrap();
        assert_eq!(vault.name, "Design Documents");
        assert_eq!(vault.vault_type, VaultType::Template);
    }

    #[test]
    fn test_save_is_idempotent_create() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(&tmp);

        let mut vault = Vault::new("docs");
        vault.name = "Docs".to_string();
        let stored = reg.save(&vault).unwrap();
        assert_eq!(stored.name, "Docs");
        assert!(stored.created_at.is_some());

        // A second save with a different name must not overwrite the
        // existing descriptor.
        let mut renamed = Vault::new("docs");
        renamed.name = "Renamed".to_string();
        let stored = reg.save(&renamed).unwrap();
        assert_eq!(stored.name, "Docs");
    }

    #[test]
    fn test_find_by_name_and_missing_lookups() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(&tmp);
        reg.save(&Vault::new("docs")).unwrap();

        assert_eq!(reg.find_by_name("docs").unwrap().id, "docs");
        assert!(matches!(
            reg.find_by_id("nope"),
            Err(CoreError::NotFound { kind: "vault", .. })
        ));
        assert!(matches!(
            reg.find_by_name("nope"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_removes_bookkeeping_not_files() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(&tmp);
        reg.save(&Vault::new("docs")).unwrap();

        reg.delete("docs").unwrap();
        assert!(tmp.path().join("docs").is_dir());
        // The directory still exists, so the next scan rediscovers it.
        assert!(reg.find_by_id("docs").is_ok());

        assert!(matches!(
            reg.delete("missing"),
            Err(CoreError::NotFound { .. })
        ));
    }
}
