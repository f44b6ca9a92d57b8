use serde::{Deserialize, Serialize};

/// A node in a declarative scaffold definition.
///
/// Directories carry ordered children; files carry an optional template
/// reference (possibly vault-qualified) used to seed their content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemplateItem {
    Directory {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<TemplateItem>,
    },
    File {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
}

impl TemplateItem {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. } | Self::File { name, .. } => name,
        }
    }
}
