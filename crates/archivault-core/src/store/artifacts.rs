use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::CoreError;
use crate::layout;
use crate::model::{
    Address, Artifact, ArtifactFormat, ArtifactMetadata, ArtifactStatus, TargetType, Vault,
    ViewType,
};
use crate::render::Render;
use crate::store::fsutil;
use crate::store::metadata::{MetadataStore, RelationField};
use crate::store::templates::TemplateResolver;

/// Sort key for artifact queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Title,
    Path,
    CreatedAt,
    UpdatedAt,
}

/// Composable artifact query. Filters apply in declaration order: substring,
/// exact matches, tags, generic filters, then sort and pagination.
#[derive(Debug, Clone, Default)]
pub struct ArtifactQuery {
    /// Substring match over name, path and title.
    pub text: Option<String>,
    pub view_type: Option<ViewType>,
    pub category: Option<String>,
    pub status: Option<ArtifactStatus>,
    /// AND semantics: an artifact matches when its tag set is a superset.
    pub tags: Vec<String>,
    /// Generic key/value filter matched against the artifact's serialized
    /// fields.
    pub filters: BTreeMap<String, String>,
    pub sort: Option<SortKey>,
    pub descending: bool,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Inputs for artifact creation. Content resolution priority: explicit
/// `content` > rendered `template` > built-in default for the format.
#[derive(Debug, Clone)]
pub struct CreateArtifact {
    /// Vault-relative target path. The format's canonical extension is
    /// appended when missing.
    pub path: String,
    pub format: ArtifactFormat,
    pub title: Option<String>,
    pub view_type: Option<ViewType>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    /// Template reference, resolved through [`TemplateResolver`].
    pub template: Option<String>,
    pub variables: Option<serde_json::Value>,
    /// Applied best-effort after creation; failures are logged, not
    /// propagated.
    pub related_artifacts: Vec<String>,
    pub related_code_paths: Vec<String>,
}

impl CreateArtifact {
    pub fn new(path: impl Into<String>, format: ArtifactFormat) -> Self {
        Self {
            path: path.into(),
            format,
            title: None,
            view_type: None,
            category: None,
            tags: Vec::new(),
            description: None,
            content: None,
            template: None,
            variables: None,
            related_artifacts: Vec::new(),
            related_code_paths: Vec::new(),
        }
    }
}

/// Scans a vault's tree for content files and materializes [`Artifact`]
/// records, merging in side-car metadata when present.
///
/// There is no persistent index: every lookup is a linear scan over the
/// vault's files, acceptable at documentation-corpus scale.
pub struct ArtifactRepository {
    root: PathBuf,
    metadata: MetadataStore,
    templates: TemplateResolver,
}

impl ArtifactRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            metadata: MetadataStore::new(root.clone()),
            templates: TemplateResolver::new(root.clone()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the vault tree and return matching artifacts in scan order
    /// (unless the query sorts).
    pub fn list(&self, vault: &Vault, query: &ArtifactQuery) -> Result<Vec<Artifact>, CoreError> {
        Ok(apply_query(self.scan(vault)?, query))
    }

    /// Scan several vaults and apply the query once over the combined set,
    /// so sort and pagination span vault boundaries.
    pub fn list_all(
        &self,
        vaults: &[Vault],
        query: &ArtifactQuery,
    ) -> Result<Vec<Artifact>, CoreError> {
        let mut artifacts = Vec::new();
        for vault in vaults {
            artifacts.append(&mut self.scan(vault)?);
        }
        Ok(apply_query(artifacts, query))
    }

    fn scan(&self, vault: &Vault) -> Result<Vec<Artifact>, CoreError> {
        let vault_root = self.root.join(&vault.id);
        if !vault_root.is_dir() {
            return Err(CoreError::not_found("vault", &vault.id));
        }

        let mut artifacts = Vec::new();
        let walker = WalkDir::new(&vault_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_dir() && layout::VAULT_SYSTEM_DIRS.contains(&name.as_ref()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(vault = %vault.id, "Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = match entry.path().extension().and_then(|e| e.to_str()) {
                Some(ext) => ext,
                None => continue,
            };
            let format = match ArtifactFormat::from_extension(ext) {
                Some(format) => format,
                None => continue,
            };
            match self.artifact_from_file(vault, entry.path(), format) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    tracing::warn!(vault = %vault.id, path = %entry.path().display(), "Skipping file: {e}");
                }
            }
        }

        Ok(artifacts)
    }

    /// Resolve by id or vault-relative path: linear scan first, then a direct
    /// path fallback. Loads the file content.
    pub fn get(&self, vault: &Vault, id_or_path: &str) -> Result<Artifact, CoreError> {
        let all = self.list(vault, &ArtifactQuery::default())?;
        let found = all
            .into_iter()
            .find(|a| a.id == id_or_path || a.path == id_or_path);

        let mut artifact = match found {
            Some(artifact) => artifact,
            None => {
                // Direct path fallback for files the scan may have missed.
                let abs = self.root.join(&vault.id).join(id_or_path);
                let format = abs
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(ArtifactFormat::from_extension);
                match (abs.is_file(), format) {
                    (true, Some(format)) => self.artifact_from_file(vault, &abs, format)?,
                    _ => return Err(CoreError::not_found("artifact", id_or_path)),
                }
            }
        };

        let content = fs::read_to_string(&artifact.content_location)
            .map_err(|e| CoreError::failed(format!("reading {}", artifact.content_location), e))?;
        artifact.content = Some(content);
        Ok(artifact)
    }

    /// Create the content file (atomic write) and its side-car metadata
    /// record. The metadata record is always written, even when empty.
    pub fn create(
        &self,
        vault: &Vault,
        opts: CreateArtifact,
        renderer: &dyn Render,
    ) -> Result<Artifact, CoreError> {
        let rel_path = ensure_extension(&opts.path, opts.format);
        let abs = self.root.join(&vault.id).join(&rel_path);
        if abs.exists() {
            return Err(CoreError::InvalidInput(format!(
                "artifact already exists at {rel_path}"
            )));
        }

        let stem = file_stem(&rel_path);
        let title = opts.title.clone().unwrap_or_else(|| stem.clone());
        let view_type = opts.view_type.unwrap_or_else(|| opts.format.default_view_type());

        let mut content = match (&opts.content, &opts.template) {
            (Some(content), _) => content.clone(),
            (None, Some(reference)) => {
                let body = self.templates.resolve(vault, reference)?;
                let vars = opts.variables.clone().unwrap_or_else(default_vars);
                renderer.render(&body, &vars)?
            }
            (None, None) => opts.format.default_content(&title),
        };
        if view_type == ViewType::Design {
            content = strip_markdown_wrapping(&content);
        }

        fsutil::atomic_write(&abs, content.as_bytes())
            .map_err(|e| CoreError::failed(format!("writing artifact {rel_path}"), e))?;

        // Side-car record, always created alongside.
        let artifact_id = Uuid::new_v4().to_string();
        let vault_ref = vault.vault_ref();
        let address = Address::Artifact {
            id: artifact_id.clone(),
        };
        let mut record = ArtifactMetadata::new(&address, &vault_ref);
        record.tags = opts.tags.clone();
        record.category = opts.category.clone();
        record.view_type = Some(view_type_name(view_type).to_string());
        if let Some(t) = &opts.title {
            record.set_property("title", serde_json::Value::String(t.clone()));
        }
        record.set_property("targetId", serde_json::Value::String(rel_path.clone()));
        self.metadata.write(&vault.id, &stem, &record)?;

        // Initial relations are best-effort: a failure must not undo the
        // created artifact.
        for (field, entries) in [
            (RelationField::Artifacts, &opts.related_artifacts),
            (RelationField::CodePaths, &opts.related_code_paths),
        ] {
            if entries.is_empty() {
                continue;
            }
            if let Err(e) =
                self.metadata
                    .update_relations(&vault_ref, &address, &stem, field, entries)
            {
                tracing::warn!(vault = %vault.id, path = %rel_path, "Skipping initial relations: {e}");
            }
        }

        self.artifact_from_file(vault, &abs, opts.format)
    }

    /// Atomically rewrite an artifact's content file and bump its side-car
    /// `updatedAt`.
    pub fn update_content(
        &self,
        vault: &Vault,
        id_or_path: &str,
        content: &str,
    ) -> Result<Artifact, CoreError> {
        let artifact = self.get(vault, id_or_path)?;
        let abs = PathBuf::from(&artifact.content_location);
        fsutil::atomic_write(&abs, content.as_bytes())
            .map_err(|e| CoreError::failed(format!("writing artifact {}", artifact.path), e))?;

        if let Some(stem) = &artifact.metadata_id {
            self.metadata.touch(&vault.id, stem)?;
        }

        self.get(vault, &artifact.path)
    }

    /// Delete the underlying file (recursively for directories) and
    /// best-effort delete the side-car record.
    pub fn delete(&self, vault: &Vault, id_or_path: &str) -> Result<(), CoreError> {
        let vault_root = self.root.join(&vault.id);

        let (abs, stem) = match self.get(vault, id_or_path) {
            Ok(artifact) => (
                PathBuf::from(&artifact.content_location),
                artifact.metadata_id,
            ),
            Err(CoreError::NotFound { .. }) => {
                let candidate = vault_root.join(id_or_path);
                if candidate.is_dir() {
                    (candidate, None)
                } else {
                    return Err(CoreError::not_found("artifact", id_or_path));
                }
            }
            Err(e) => return Err(e),
        };

        if abs.is_dir() {
            fs::remove_dir_all(&abs)
                .map_err(|e| CoreError::failed(format!("deleting {}", abs.display()), e))?;
        } else {
            fs::remove_file(&abs)
                .map_err(|e| CoreError::failed(format!("deleting {}", abs.display()), e))?;
        }

        let stem = stem.unwrap_or_else(|| file_stem(id_or_path));
        if let Err(e) = self.metadata.delete(&vault.id, &stem) {
            tracing::warn!(vault = %vault.id, "Leaving orphaned metadata record: {e}");
        }
        Ok(())
    }

    /// Synthesize an artifact view directly from a file on disk, used by
    /// composite-address resolution in reverse lookups.
    pub fn synthesize(&self, vault: &Vault, rel_path: &str) -> Result<Artifact, CoreError> {
        let abs = self.root.join(&vault.id).join(rel_path);
        if abs.is_dir() {
            return Ok(self.synthesize_folder(vault, rel_path, &abs));
        }
        let format = abs
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ArtifactFormat::from_extension)
            .unwrap_or(ArtifactFormat::Text);
        if !abs.is_file() {
            return Err(CoreError::not_found("artifact", rel_path));
        }
        self.artifact_from_file(vault, &abs, format)
    }

    fn synthesize_folder(&self, vault: &Vault, rel_path: &str, abs: &Path) -> Artifact {
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.to_string());
        let (created_at, updated_at) = fs_timestamps(abs);
        Artifact {
            id: rel_path.to_string(),
            vault: vault.vault_ref(),
            path: rel_path.to_string(),
            title: name.clone(),
            name,
            format: ArtifactFormat::Text,
            content_location: abs.to_string_lossy().into_owned(),
            view_type: ViewType::Document,
            category: None,
            description: None,
            content: None,
            metadata_id: None,
            tags: None,
            created_at,
            updated_at,
            status: ArtifactStatus::Active,
        }
    }

    /// Build an artifact record from a content file, merging side-car
    /// overrides when a record with the guessed name exists.
    fn artifact_from_file(
        &self,
        vault: &Vault,
        abs: &Path,
        format: ArtifactFormat,
    ) -> Result<Artifact, CoreError> {
        let vault_root = self.root.join(&vault.id);
        let rel_path = fsutil::relative_path(&vault_root, abs);
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.clone());
        let stem = file_stem(&rel_path);
        let (created_at, updated_at) = fs_timestamps(abs);

        let mut artifact = Artifact {
            id: stem.clone(),
            vault: vault.vault_ref(),
            path: rel_path.clone(),
            name,
            format,
            content_location: abs.to_string_lossy().into_owned(),
            view_type: format.default_view_type(),
            category: None,
            title: stem.clone(),
            description: None,
            content: None,
            metadata_id: None,
            tags: None,
            created_at,
            updated_at,
            status: ArtifactStatus::Active,
        };

        // The side-car name is guessed from the file's base name; an
        // unreadable record falls back to filesystem-derived defaults.
        let record = match self.metadata.find(&vault.id, &stem) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(vault = %vault.id, path = %rel_path, "Ignoring unreadable side-car: {e}");
                None
            }
        };
        if let Some(record) = record {
            if sidecar_matches(&record, &rel_path) {
                apply_sidecar(&mut artifact, &record, &stem);
            }
        }

        Ok(artifact)
    }
}

/// A guessed side-car applies when it is an artifact record whose stored
/// target path (if any) matches; composite records for other entities that
/// happen to share the stem are ignored.
fn sidecar_matches(record: &ArtifactMetadata, rel_path: &str) -> bool {
    match record.address() {
        Address::Artifact { .. } => record
            .property("targetId")
            .and_then(|v| v.as_str())
            .map(|target| target == rel_path)
            .unwrap_or(true),
        _ => false,
    }
}

fn apply_sidecar(artifact: &mut Artifact, record: &ArtifactMetadata, stem: &str) {
    artifact.id = record.artifact_id.clone();
    artifact.metadata_id = Some(stem.to_string());
    artifact.tags = Some(record.tags.clone());
    artifact.category = record.category.clone();
    artifact.created_at = record.created_at;
    artifact.updated_at = record.updated_at;
    if let Some(vt) = record.view_type.as_deref().and_then(|s| s.parse().ok()) {
        artifact.view_type = vt;
    }
    if let Some(title) = record.property("title").and_then(|v| v.as_str()) {
        artifact.title = title.to_string();
    }
}

fn view_type_name(view_type: ViewType) -> &'static str {
    match view_type {
        ViewType::Document => "document",
        ViewType::Design => "design",
        ViewType::Diagram => "diagram",
    }
}

fn file_stem(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string())
}

/// Append the format's canonical extension unless the path already ends in a
/// supported one. A dot inside the name ("notes-v1.2") is not an extension.
fn ensure_extension(path: &str, format: ArtifactFormat) -> String {
    let supported = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ArtifactFormat::from_extension)
        .is_some();
    if supported {
        path.to_string()
    } else {
        format!("{path}.{}", format.extension())
    }
}

fn default_vars() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn fs_timestamps(path: &Path) -> (DateTime<Utc>, DateTime<Utc>) {
    let meta = fs::metadata(path).ok();
    let modified = meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now);
    let created = meta
        .as_ref()
        .and_then(|m| m.created().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified);
    (created, modified)
}

/// Strip accidental markdown wrapping from design bodies: leading heading
/// lines and a surrounding code fence.
pub fn strip_markdown_wrapping(content: &str) -> String {
    let mut lines: Vec<&str> = content.lines().collect();

    while let Some(first) = lines.first() {
        let trimmed = first.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            lines.remove(0);
        } else {
            break;
        }
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    if lines.first().is_some_and(|l| l.trim().starts_with("```")) {
        lines.remove(0);
        if lines.last().is_some_and(|l| l.trim().starts_with("```")) {
            lines.pop();
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Apply filters, sort and pagination, in that order.
fn apply_query(artifacts: Vec<Artifact>, query: &ArtifactQuery) -> Vec<Artifact> {
    let mut matched: Vec<Artifact> = artifacts
        .into_iter()
        .filter(|a| {
            if let Some(text) = &query.text {
                let text = text.to_lowercase();
                let hit = a.name.to_lowercase().contains(&text)
                    || a.path.to_lowercase().contains(&text)
                    || a.title.to_lowercase().contains(&text);
                if !hit {
                    return false;
                }
            }
            if query.view_type.is_some_and(|vt| vt != a.view_type) {
                return false;
            }
            if query
                .category
                .as_deref()
                .is_some_and(|c| a.category.as_deref() != Some(c))
            {
                return false;
            }
            if query.status.is_some_and(|s| s != a.status) {
                return false;
            }
            if !query.tags.iter().all(|t| a.has_tag(t)) {
                return false;
            }
            if !query.filters.is_empty() && !matches_filters(a, &query.filters) {
                return false;
            }
            true
        })
        .collect();

    if let Some(sort) = query.sort {
        matched.sort_by(|a, b| {
            let ord = match sort {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Title => a.title.cmp(&b.title),
                SortKey::Path => a.path.cmp(&b.path),
                SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            if query.descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    let offset = query.offset.unwrap_or(0);
    let mut paged: Vec<Artifact> = matched.into_iter().skip(offset).collect();
    if let Some(limit) = query.limit {
        paged.truncate(limit);
    }
    paged
}

/// Generic key/value filter over the artifact's serialized representation.
fn matches_filters(artifact: &Artifact, filters: &BTreeMap<String, String>) -> bool {
    let value = match serde_json::to_value(artifact) {
        Ok(value) => value,
        Err(_) => return false,
    };
    filters.iter().all(|(key, expected)| {
        value
            .get(key)
            .map(|v| match v {
                serde_json::Value::String(s) => s == expected,
                other => other.to_string() == *expected,
            })
            .unwrap_or(false)
    })
}
