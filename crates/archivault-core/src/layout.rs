//! On-disk layout conventions shared by every store.

/// Reserved subtree holding side-car metadata records and the vault descriptor.
pub const METADATA_DIR: &str = ".metadata";

/// Vault descriptor file inside [`METADATA_DIR`].
pub const VAULT_DESCRIPTOR_FILE: &str = "vault.yaml";

/// Suffix for side-car metadata records.
pub const METADATA_SUFFIX: &str = ".metadata.yml";

/// Conventional subdirectory for task files and their solution documents.
pub const TASKS_DIR: &str = "archi-tasks";

/// Conventional subdirectory for structure and content templates.
pub const TEMPLATES_DIR: &str = "archi-templates";

/// Conventional subdirectory marking an AI-enhancement vault.
pub const AI_ENHANCEMENTS_DIR: &str = "archi-ai-enhancements";

/// Directories skipped entirely when scanning a vault's content tree.
pub const VAULT_SYSTEM_DIRS: &[&str] = &[METADATA_DIR, ".git"];

/// Root-level directories that are never treated as vaults.
pub const ROOT_SYSTEM_DIRS: &[&str] = &[".git", ".metadata", "node_modules", "target"];
