use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content formats the repository indexes. Files with other extensions are
/// ignored by the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Markdown,
    Plantuml,
    Mermaid,
    Yaml,
    Json,
    Text,
}

impl ArtifactFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "puml" | "plantuml" => Some(Self::Plantuml),
            "mmd" | "mermaid" => Some(Self::Mermaid),
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Canonical extension used when creating a file of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Plantuml => "puml",
            Self::Mermaid => "mmd",
            Self::Yaml => "yml",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }

    /// Seed content for a freshly created artifact with no explicit content
    /// and no template.
    pub fn default_content(&self, title: &str) -> String {
        match self {
            Self::Markdown => format!("# {title}\n"),
            Self::Plantuml => format!("@startuml\ntitle {title}\n@enduml\n"),
            Self::Mermaid => format!("---\ntitle: {title}\n---\nflowchart TD\n"),
            Self::Yaml => String::new(),
            Self::Json => "{}\n".to_string(),
            Self::Text => String::new(),
        }
    }

    /// How an artifact of this format is presented by default.
    pub fn default_view_type(&self) -> ViewType {
        match self {
            Self::Plantuml | Self::Mermaid => ViewType::Diagram,
            _ => ViewType::Document,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Document,
    Design,
    Diagram,
}

impl std::str::FromStr for ViewType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "design" => Ok(Self::Design),
            "diagram" => Ok(Self::Diagram),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Draft,
    #[default]
    Active,
    Archived,
}

/// The vault an artifact belongs to, by id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRef {
    pub id: String,
    pub name: String,
}

/// A content file tracked by the system.
///
/// Transient projection of a file on disk plus its optional side-car
/// metadata; rebuilt on every scan, never persisted itself. `id` is the
/// canonical id from the side-car when one exists and degrades to the file
/// stem otherwise (derived ids can collide across files with equal stems).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub vault: VaultRef,
    /// Vault-relative path with `/` separators, unique within the vault.
    pub path: String,
    pub name: String,
    pub format: ArtifactFormat,
    /// Absolute filesystem location of the content file.
    pub content_location: String,
    pub view_type: ViewType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ArtifactStatus,
}

impl Artifact {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_deref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }
}
