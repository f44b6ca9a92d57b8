use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout;

/// What kind of content a vault holds. Inferred from conventional
/// subdirectories when no descriptor is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VaultType {
    #[default]
    Document,
    AiEnhancement,
    Template,
    Task,
}

impl VaultType {
    /// Infer the type from the conventional subdirectories present under a
    /// vault root. Falls back to [`VaultType::Document`].
    pub fn infer(vault_root: &Path) -> Self {
        if vault_root.join(layout::AI_ENHANCEMENTS_DIR).is_dir() {
            Self::AiEnhancement
        } else if vault_root.join(layout::TEMPLATES_DIR).is_dir() {
            Self::Template
        } else if vault_root.join(layout::TASKS_DIR).is_dir() {
            Self::Task
        } else {
            Self::Document
        }
    }
}

/// Remote sync target for a vault. Credentials live in the host's secret
/// store, never in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRemote {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// An isolated content namespace mapped 1:1 to a root-level directory.
///
/// In-memory projection only: the directory tree is the source of truth and
/// this record is rebuilt on every registry scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub vault_type: VaultType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<VaultRemote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Vault {
    /// A plain document vault named after its directory.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            vault_type: VaultType::Document,
            description: None,
            remote: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn vault_ref(&self) -> super::artifact::VaultRef {
        super::artifact::VaultRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// On-disk vault descriptor (`.metadata/vault.yaml`). Authoritative for
/// id/name/type when present.
///
/// `readonly` is vestigial: it is accepted and preserved for descriptors that
/// carry it but enforced nowhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub vault_type: VaultType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<VaultRemote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VaultDescriptor {
    pub fn from_vault(vault: &Vault) -> Self {
        Self {
            id: Some(vault.id.clone()),
            name: vault.name.clone(),
            vault_type: vault.vault_type,
            description: vault.description.clone(),
            remote: vault.remote.clone(),
            readonly: None,
            created_at: vault.created_at,
            updated_at: vault.updated_at,
        }
    }

    /// Materialize a vault record, defaulting id/name to the directory name.
    pub fn into_vault(self, dir_name: &str) -> Vault {
        Vault {
            id: self.id.unwrap_or_else(|| dir_name.to_string()),
            name: self.name,
            vault_type: self.vault_type,
            description: self.description,
            remote: self.remote,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
