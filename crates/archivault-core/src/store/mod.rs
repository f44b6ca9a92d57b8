pub mod artifacts;
pub mod fsutil;
pub mod metadata;
pub mod templates;
pub mod vaults;

pub use artifacts::{ArtifactQuery, ArtifactRepository, CreateArtifact, SortKey};
pub use metadata::{MetadataStore, RelationField};
pub use templates::TemplateResolver;
pub use vaults::VaultRegistry;
