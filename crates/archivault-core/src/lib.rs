//! Storage, addressing and linking core for architecture-documentation
//! vaults.
//!
//! Vaults are plain directories under one root; artifacts are content files
//! with optional side-car YAML metadata; relations link documentation to
//! source-code paths for traceability. The filesystem is the source of truth:
//! in-memory records are projections rebuilt by scanning, never persisted
//! themselves.

pub mod error;
pub mod layout;
pub mod model;
pub mod render;
pub mod store;
pub mod workspace;

pub use error::CoreError;
pub use model::{
    Address, Artifact, ArtifactFormat, ArtifactMetadata, ArtifactStatus, TargetType, TemplateItem,
    Vault, VaultDescriptor, VaultRef, VaultRemote, VaultType, ViewType,
};
pub use render::{Render, RenderError, VarSubstituter};
pub use store::{
    ArtifactQuery, ArtifactRepository, CreateArtifact, MetadataStore, SortKey, TemplateResolver,
    VaultRegistry,
};
pub use workspace::Workspace;
