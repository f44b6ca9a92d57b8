pub mod artifact;
pub mod metadata;
pub mod template;
pub mod vault;

pub use artifact::{Artifact, ArtifactFormat, ArtifactStatus, VaultRef, ViewType};
pub use metadata::{Address, ArtifactMetadata, TargetType};
pub use template::TemplateItem;
pub use vault::{Vault, VaultDescriptor, VaultRemote, VaultType};
