use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::model::{Address, Artifact, ArtifactMetadata, TargetType, Vault};
use crate::render::{Render, VarSubstituter};
use crate::store::{
    ArtifactQuery, ArtifactRepository, MetadataStore, RelationField, VaultRegistry,
};

/// Composition root owning the stores and the render capability.
///
/// Every cross-store operation (metadata for arbitrary targets, code-path
/// traceability) lives here, so no component needs process-wide state.
pub struct Workspace {
    root: PathBuf,
    vaults: VaultRegistry,
    artifacts: ArtifactRepository,
    metadata: MetadataStore,
    renderer: Box<dyn Render>,
}

impl Workspace {
    /// Open a workspace over a root directory with the built-in renderer.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_renderer(root, Box::new(VarSubstituter))
    }

    /// Open with a host-provided templating capability.
    pub fn with_renderer(root: impl Into<PathBuf>, renderer: Box<dyn Render>) -> Self {
        let root = root.into();
        Self {
            vaults: VaultRegistry::new(root.clone()),
            artifacts: ArtifactRepository::new(root.clone()),
            metadata: MetadataStore::new(root.clone()),
            renderer,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vaults(&mut self) -> &mut VaultRegistry {
        &mut self.vaults
    }

    pub fn artifacts(&self) -> &ArtifactRepository {
        &self.artifacts
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn renderer(&self) -> &dyn Render {
        self.renderer.as_ref()
    }

    /// Create an artifact through the workspace's renderer.
    pub fn create_artifact(
        &mut self,
        vault_id: &str,
        opts: crate::store::CreateArtifact,
    ) -> Result<Artifact, CoreError> {
        let vault = self.vaults.find_by_id(vault_id)?;
        self.artifacts.create(&vault, opts, self.renderer.as_ref())
    }

    /// List artifacts in one vault, or across every vault when `vault_id` is
    /// `None`. Cross-vault results go through the query pipeline once, so
    /// sort and pagination span vault boundaries.
    pub fn list_artifacts(
        &mut self,
        vault_id: Option<&str>,
        query: &ArtifactQuery,
    ) -> Result<Vec<Artifact>, CoreError> {
        match vault_id {
            Some(id) => {
                let vault = self.vaults.find_by_id(id)?;
                self.artifacts.list(&vault, query)
            }
            None => {
                let vaults = self.vaults.find_all()?;
                self.artifacts.list_all(&vaults, query)
            }
        }
    }

    /// Metadata for any entity: a real artifact (lazily giving it a record)
    /// or a file/folder/vault addressed by composite key.
    pub fn get_or_create_metadata(
        &mut self,
        vault_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> Result<ArtifactMetadata, CoreError> {
        let (vault, address, stem) = self.resolve_target(vault_id, target_id, target_type)?;
        self.metadata
            .get_or_create(&vault.vault_ref(), &address, &stem)
    }

    /// Non-creating lookup; `Ok(None)` when no record exists.
    pub fn find_metadata(
        &mut self,
        vault_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> Result<Option<ArtifactMetadata>, CoreError> {
        let (vault, _address, stem) = self.resolve_target(vault_id, target_id, target_type)?;
        self.metadata.find(&vault.id, &stem)
    }

    pub fn update_related_artifacts(
        &mut self,
        vault_id: &str,
        target_id: &str,
        target_type: TargetType,
        entries: &[String],
    ) -> Result<ArtifactMetadata, CoreError> {
        let (vault, address, stem) = self.resolve_target(vault_id, target_id, target_type)?;
        self.metadata.update_relations(
            &vault.vault_ref(),
            &address,
            &stem,
            RelationField::Artifacts,
            entries,
        )
    }

    pub fn update_related_code_paths(
        &mut self,
        vault_id: &str,
        target_id: &str,
        target_type: TargetType,
        entries: &[String],
    ) -> Result<ArtifactMetadata, CoreError> {
        let (vault, address, stem) = self.resolve_target(vault_id, target_id, target_type)?;
        self.metadata.update_relations(
            &vault.vault_ref(),
            &address,
            &stem,
            RelationField::CodePaths,
            entries,
        )
    }

    /// Traceability entry point: every artifact linked to a source-code path.
    ///
    /// Normalizes the path against the workspace root, then reverse-scans all
    /// metadata records. Composite file/folder hits are synthesized straight
    /// from the filesystem; artifact hits are searched across every vault.
    pub fn find_artifacts_by_code_path(
        &mut self,
        code_path: &str,
    ) -> Result<Vec<Artifact>, CoreError> {
        let normalized = crate::store::fsutil::normalize_code_path(&self.root, code_path);
        let vaults = self.vaults.find_all()?;

        let mut results: Vec<Artifact> = Vec::new();
        for vault in &vaults {
            for record in self.metadata.scan_vault(&vault.id)? {
                let linked = record
                    .related_code_paths
                    .as_deref()
                    .is_some_and(|paths| paths.iter().any(|p| p == &normalized));
                if !linked {
                    continue;
                }
                match self.resolve_record(&vaults, vault, &record) {
                    Some(artifact) => {
                        if !results
                            .iter()
                            .any(|a| a.vault.id == artifact.vault.id && a.path == artifact.path)
                        {
                            results.push(artifact);
                        }
                    }
                    None => {
                        tracing::warn!(
                            vault = %vault.id,
                            artifact_id = %record.artifact_id,
                            "Dangling code-path link, target no longer resolvable"
                        );
                    }
                }
            }
        }
        Ok(results)
    }

    fn resolve_record(
        &self,
        vaults: &[Vault],
        record_vault: &Vault,
        record: &ArtifactMetadata,
    ) -> Option<Artifact> {
        match record.address() {
            Address::File { vault_id, path } | Address::Folder { vault_id, path } => {
                let vault = vaults.iter().find(|v| v.id == vault_id)?;
                self.artifacts.synthesize(vault, &path).ok()
            }
            Address::Vault { .. } => None,
            Address::Artifact { id } => {
                // Prefer the record's own vault, then search the rest.
                let ordered = std::iter::once(record_vault)
                    .chain(vaults.iter().filter(|v| v.id != record_vault.id));
                for vault in ordered {
                    let query = ArtifactQuery::default();
                    if let Ok(artifacts) = self.artifacts.list(vault, &query) {
                        if let Some(hit) = artifacts.into_iter().find(|a| a.id == id) {
                            return Some(hit);
                        }
                    }
                }
                None
            }
        }
    }

    /// Resolve a caller-facing `(vaultId, targetId, targetType)` triple to
    /// the vault, address and record file stem.
    fn resolve_target(
        &mut self,
        vault_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> Result<(Vault, Address, String), CoreError> {
        let vault = self.vaults.find_by_id(vault_id)?;
        match target_type {
            TargetType::Artifact => {
                let artifact = self.artifacts.get(&vault, target_id)?;
                let stem = artifact
                    .metadata_id
                    .clone()
                    .unwrap_or_else(|| stem_of(&artifact.path));
                let address = Address::Artifact { id: artifact.id };
                Ok((vault, address, stem))
            }
            _ => {
                let address = Address::for_target(vault_id, target_id, target_type);
                let stem = MetadataStore::composite_stem(&address);
                Ok((vault, address, stem))
            }
        }
    }
}

fn stem_of(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactFormat, Vault};
    use crate::store::CreateArtifact;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(tmp: &TempDir) -> Workspace {
        let mut ws = Workspace::open(tmp.path());
        ws.vaults().save(&Vault::new("v1")).unwrap();
        ws
    }

    #[test]
    fn test_composite_metadata_roundtrip_through_workspace() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        fs::write(tmp.path().join("v1/vision.md"), "# Vision").unwrap();

        let first = ws
            .get_or_create_metadata("v1", "notes/readme.md", TargetType::File)
            .unwrap();
        assert_eq!(first.artifact_id, "file:v1:notes/readme.md");

        let second = ws
            .get_or_create_metadata("v1", "notes/readme.md", TargetType::File)
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_artifact_metadata_created_lazily() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        fs::write(tmp.path().join("v1/vision.md"), "# Vision").unwrap();

        assert_eq!(
            ws.find_metadata("v1", "vision.md", TargetType::Artifact)
                .unwrap(),
            None
        );

        let record = ws
            .get_or_create_metadata("v1", "vision.md", TargetType::Artifact)
            .unwrap();
        // No side-car existed, so the address carries the derived id.
        assert_eq!(record.artifact_id, "vision");
        assert!(tmp.path().join("v1/.metadata/vision.metadata.yml").is_file());
    }

    #[test]
    fn test_code_path_lookup_resolves_composite_and_artifact_links() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);

        // A real artifact linked to a code path.
        let mut opts = CreateArtifact::new("auth-design.md", ArtifactFormat::Markdown);
        opts.content = Some("# Auth".into());
        let artifact = ws.create_artifact("v1", opts).unwrap();
        ws.update_related_code_paths(
            "v1",
            "auth-design.md",
            TargetType::Artifact,
            &["src/auth/mod.rs".into()],
        )
        .unwrap();

        // A raw file (no artifact record) linked to the same path.
        fs::write(tmp.path().join("v1/raw-notes.md"), "notes").unwrap();
        ws.update_related_code_paths(
            "v1",
            "raw-notes.md",
            TargetType::File,
            &["src/auth/mod.rs".into()],
        )
        .unwrap();

        let hits = ws.find_artifacts_by_code_path("src/auth/mod.rs").unwrap();
        let mut paths: Vec<&str> = hits.iter().map(|a| a.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["auth-design.md", "raw-notes.md"]);
        assert!(hits.iter().any(|a| a.id == artifact.id));

        // Absolute paths inside the workspace normalize to the same link.
        let abs = tmp.path().join("src/auth/mod.rs");
        let hits = ws
            .find_artifacts_by_code_path(&abs.to_string_lossy())
            .unwrap();
        assert_eq!(hits.len(), 2);

        assert!(ws
            .find_artifacts_by_code_path("src/other.rs")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_artifacts_spans_vaults_when_vault_omitted() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        ws.vaults().save(&Vault::new("v2")).unwrap();
        fs::write(tmp.path().join("v1/alpha.md"), "a").unwrap();
        fs::write(tmp.path().join("v2/beta.md"), "b").unwrap();
        fs::write(tmp.path().join("v2/gamma.md"), "c").unwrap();

        // Scoped to one vault.
        let one = ws
            .list_artifacts(Some("v2"), &ArtifactQuery::default())
            .unwrap();
        assert_eq!(one.len(), 2);

        // No vault: every vault's artifacts, sorted as one set.
        let query = ArtifactQuery {
            sort: Some(crate::store::SortKey::Name),
            ..Default::default()
        };
        let all = ws.list_artifacts(None, &query).unwrap();
        let names: Vec<&str> = all.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.md", "beta.md", "gamma.md"]);

        // Pagination crosses the vault boundary.
        let query = ArtifactQuery {
            sort: Some(crate::store::SortKey::Name),
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let page = ws.list_artifacts(None, &query).unwrap();
        let names: Vec<&str> = page.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["beta.md", "gamma.md"]);

        assert!(matches!(
            ws.list_artifacts(Some("missing"), &ArtifactQuery::default()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_relations_rejected_through_workspace() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        fs::write(tmp.path().join("v1/a.md"), "a").unwrap();

        let err = ws
            .update_related_artifacts(
                "v1",
                "a.md",
                TargetType::Artifact,
                &["x".into(), "x".into()],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
