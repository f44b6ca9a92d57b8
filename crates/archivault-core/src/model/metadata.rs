use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::VaultRef;

/// What kind of entity a metadata record is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Artifact,
    File,
    Folder,
    Vault,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Artifact => "artifact",
            Self::File => "file",
            Self::Folder => "folder",
            Self::Vault => "vault",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TargetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artifact" => Ok(Self::Artifact),
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            "vault" => Ok(Self::Vault),
            _ => Err(()),
        }
    }
}

/// Address of a metadata record.
///
/// Artifacts are addressed by their own id; files, folders and whole vaults
/// have no artifact record and are addressed by an encoded composite key
/// `"<targetType>:<vaultId>:<targetId>"`. Encode/decode are total: decoding
/// keeps a `targetId` containing `:` intact (it is the final segment), but a
/// `vault_id` containing `:` cannot round-trip and must not be used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Artifact { id: String },
    File { vault_id: String, path: String },
    Folder { vault_id: String, path: String },
    Vault { vault_id: String },
}

impl Address {
    pub fn target_type(&self) -> TargetType {
        match self {
            Self::Artifact { .. } => TargetType::Artifact,
            Self::File { .. } => TargetType::File,
            Self::Folder { .. } => TargetType::Folder,
            Self::Vault { .. } => TargetType::Vault,
        }
    }

    /// The target id carried by the address: an artifact id, a vault-relative
    /// path, or the vault id itself.
    pub fn target_id(&self) -> &str {
        match self {
            Self::Artifact { id } => id,
            Self::File { path, .. } | Self::Folder { path, .. } => path,
            Self::Vault { vault_id } => vault_id,
        }
    }

    /// The stored `artifactId` value for this address.
    pub fn encode(&self) -> String {
        match self {
            Self::Artifact { id } => id.clone(),
            Self::File { vault_id, path } => format!("file:{vault_id}:{path}"),
            Self::Folder { vault_id, path } => format!("folder:{vault_id}:{path}"),
            Self::Vault { vault_id } => format!("vault:{vault_id}:{vault_id}"),
        }
    }

    /// Decode a stored `artifactId`. Anything that is not a well-formed
    /// composite key is an artifact id.
    pub fn decode(raw: &str) -> Self {
        let mut parts = raw.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("file"), Some(vault_id), Some(path)) => Self::File {
                vault_id: vault_id.to_string(),
                path: path.to_string(),
            },
            (Some("folder"), Some(vault_id), Some(path)) => Self::Folder {
                vault_id: vault_id.to_string(),
                path: path.to_string(),
            },
            (Some("vault"), Some(vault_id), Some(_)) => Self::Vault {
                vault_id: vault_id.to_string(),
            },
            _ => Self::Artifact {
                id: raw.to_string(),
            },
        }
    }

    /// Build an address from the caller-facing `(targetId, targetType)` pair.
    pub fn for_target(vault_id: &str, target_id: &str, target_type: TargetType) -> Self {
        match target_type {
            TargetType::Artifact => Self::Artifact {
                id: target_id.to_string(),
            },
            TargetType::File => Self::File {
                vault_id: vault_id.to_string(),
                path: target_id.to_string(),
            },
            TargetType::Folder => Self::Folder {
                vault_id: vault_id.to_string(),
                path: target_id.to_string(),
            },
            TargetType::Vault => Self::Vault {
                vault_id: vault_id.to_string(),
            },
        }
    }
}

/// Side-car metadata record, one YAML file per entity under `.metadata/`.
///
/// The only persisted home for tags, category and relations: losing the
/// record loses them even though the content file survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: String,
    /// A plain artifact id or an encoded composite key (see [`Address`]).
    pub artifact_id: String,
    pub vault_id: String,
    pub vault_name: String,
    /// View-type override for the artifact, when set.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub view_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Omitted, never stored as an empty array, when cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_artifacts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_code_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    /// A fresh record for the given address. Composite addresses get
    /// `properties.targetType` / `properties.targetId` for disambiguation on
    /// read-back.
    pub fn new(address: &Address, vault: &VaultRef) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4().to_string(),
            artifact_id: address.encode(),
            vault_id: vault.id.clone(),
            vault_name: vault.name.clone(),
            view_type: None,
            category: None,
            tags: Vec::new(),
            related_artifacts: None,
            related_code_paths: None,
            properties: None,
            created_at: now,
            updated_at: now,
        };
        if address.target_type() != TargetType::Artifact {
            record.set_property(
                "targetType",
                serde_json::Value::String(address.target_type().to_string()),
            );
            record.set_property(
                "targetId",
                serde_json::Value::String(address.target_id().to_string()),
            );
        }
        record
    }

    pub fn set_property(&mut self, key: &str, value: serde_json::Value) {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    pub fn address(&self) -> Address {
        Address::decode(&self.artifact_id)
    }
}
