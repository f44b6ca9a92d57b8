use std::fs;
use std::path::{Path, PathBuf};

use archivault_core::model::{Address, TemplateItem, Vault};
use archivault_core::render::Render;
use archivault_core::store::fsutil;
use archivault_core::store::{MetadataStore, TemplateResolver};
use archivault_core::CoreError;
use thiserror::Error;

use crate::report::ScaffoldReport;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base path: {0}")]
    InvalidBasePath(String),
}

/// Instantiates a declarative directory/file template into a vault.
///
/// Best-effort: individual item failures are recorded on the report and do
/// not abort siblings or unrelated subtrees. A failed directory skips only
/// its own children.
pub struct Scaffolder<'r> {
    root: PathBuf,
    renderer: &'r dyn Render,
    resolver: TemplateResolver,
    metadata: MetadataStore,
}

impl<'r> Scaffolder<'r> {
    pub fn new(root: impl Into<PathBuf>, renderer: &'r dyn Render) -> Self {
        let root = root.into();
        Self {
            resolver: TemplateResolver::new(root.clone()),
            metadata: MetadataStore::new(root.clone()),
            root,
            renderer,
        }
    }

    /// Create the template's directories and files under
    /// `<vault>/<base_path>`, substituting `variables` into file bodies.
    pub fn create_folder_structure(
        &self,
        vault: &Vault,
        base_path: &str,
        items: &[TemplateItem],
        variables: &serde_json::Value,
    ) -> Result<ScaffoldReport, ScaffoldError> {
        if Path::new(base_path).is_absolute() || base_path.split('/').any(|c| c == "..") {
            return Err(ScaffoldError::InvalidBasePath(base_path.to_string()));
        }

        let vault_root = self.root.join(&vault.id);
        let base_abs = if base_path.is_empty() {
            vault_root.clone()
        } else {
            vault_root.join(base_path)
        };
        fs::create_dir_all(&base_abs)?;

        let mut report = ScaffoldReport::default();
        for item in items {
            self.scaffold_item(vault, &vault_root, &base_abs, item, variables, &mut report);
        }
        Ok(report)
    }

    fn scaffold_item(
        &self,
        vault: &Vault,
        vault_root: &Path,
        parent_abs: &Path,
        item: &TemplateItem,
        variables: &serde_json::Value,
        report: &mut ScaffoldReport,
    ) {
        let abs = parent_abs.join(item.name());
        let rel = fsutil::relative_path(vault_root, &abs);

        match item {
            TemplateItem::Directory { children, .. } => {
                // Idempotent: an existing directory is accepted, an existing
                // file at the path is an item error.
                if abs.is_file() {
                    report.record_failure(rel, "a file already exists at this path");
                    return;
                }
                if let Err(e) = fs::create_dir_all(&abs) {
                    report.record_failure(rel, e.to_string());
                    return;
                }
                report.created.push(abs.clone());

                if !children.is_empty() {
                    self.write_folder_metadata(vault, &rel, children);
                }
                for child in children {
                    self.scaffold_item(vault, vault_root, &abs, child, variables, report);
                }
            }
            TemplateItem::File { template, .. } => {
                let body = match template {
                    Some(reference) => match self.resolver.resolve(vault, reference) {
                        Ok(body) => body,
                        Err(e) => {
                            report.record_failure(rel, e.to_string());
                            return;
                        }
                    },
                    None => String::new(),
                };
                let rendered = match self.renderer.render(&body, variables) {
                    Ok(rendered) => rendered,
                    Err(e) => {
                        report.record_failure(rel, e.to_string());
                        return;
                    }
                };
                if let Err(e) = fsutil::atomic_write(&abs, rendered.as_bytes()) {
                    report.record_failure(rel, e.to_string());
                    return;
                }
                report.created.push(abs);
            }
        }
    }

    /// Record the declared children on the folder's metadata record, so the
    /// "expected but not yet created" set survives a partial scaffold.
    /// Auxiliary bookkeeping only: failures are logged, never item errors.
    fn write_folder_metadata(&self, vault: &Vault, rel: &str, children: &[TemplateItem]) {
        let address = Address::Folder {
            vault_id: vault.id.clone(),
            path: rel.to_string(),
        };
        let stem = MetadataStore::composite_stem(&address);
        let expected: Vec<serde_json::Value> = children
            .iter()
            .map(|c| serde_json::Value::String(c.name().to_string()))
            .collect();

        let result = self
            .metadata
            .get_or_create(&vault.vault_ref(), &address, &stem)
            .and_then(|mut record| {
                record.set_property("expectedChildren", serde_json::Value::Array(expected));
                record.updated_at = chrono::Utc::now();
                self.metadata.write(&vault.id, &stem, &record)
            });
        if let Err(e) = result {
            tracing::warn!(vault = %vault.id, folder = rel, "Skipping folder metadata: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ScaffoldStatus;
    use archivault_core::render::VarSubstituter;
    use serde_json::json;
    use tempfile::TempDir;

    fn vault_fixture(tmp: &TempDir) -> Vault {
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        Vault::new("docs")
    }

    fn dir(name: &str, children: Vec<TemplateItem>) -> TemplateItem {
        TemplateItem::Directory {
            name: name.into(),
            children,
        }
    }

    fn file(name: &str, template: Option<&str>) -> TemplateItem {
        TemplateItem::File {
            name: name.into(),
            template: template.map(String::from),
        }
    }

    #[test]
    fn test_scaffold_full_tree() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);
        fs::create_dir_all(tmp.path().join("docs/archi-templates")).unwrap();
        fs::write(
            tmp.path().join("docs/archi-templates/adr.md"),
            "# ADR for {{system}}\n",
        )
        .unwrap();

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![dir(
            "decisions",
            vec![file("0001.md", Some("adr.md")), dir("drafts", vec![])],
        )];
        let report = scaffolder
            .create_folder_structure(&vault, "", &items, &json!({"system": "billing"}))
            .unwrap();

        assert_eq!(report.status(), ScaffoldStatus::Complete);
        assert!(tmp.path().join("docs/decisions/drafts").is_dir());
        assert_eq!(
            fs::read_to_string(tmp.path().join("docs/decisions/0001.md")).unwrap(),
            "# ADR for billing\n"
        );
    }

    #[test]
    fn test_partial_failure_continues_with_siblings() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);
        fs::create_dir_all(tmp.path().join("docs/archi-templates")).unwrap();
        fs::write(tmp.path().join("docs/archi-templates/b.md"), "X={{x}}").unwrap();

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![dir(
            "docs",
            vec![
                file("a.md", Some("missing-template.md")),
                file("b.md", Some("b.md")),
            ],
        )];
        let report = scaffolder
            .create_folder_structure(&vault, "", &items, &json!({"x": "1"}))
            .unwrap();

        // The call succeeds; the failure is visible on the report.
        assert_eq!(report.status(), ScaffoldStatus::Partial);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "docs/a.md");
        assert!(!tmp.path().join("docs/docs/a.md").exists());
        assert_eq!(
            fs::read_to_string(tmp.path().join("docs/docs/b.md")).unwrap(),
            "X=1"
        );
    }

    #[test]
    fn test_existing_file_at_directory_path_is_item_error() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);
        fs::write(tmp.path().join("docs/taken"), "a file").unwrap();

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![
            dir("taken", vec![file("child.md", None)]),
            dir("fine", vec![]),
        ];
        let report = scaffolder
            .create_folder_structure(&vault, "", &items, &json!({}))
            .unwrap();

        assert_eq!(report.status(), ScaffoldStatus::Partial);
        assert_eq!(report.failures.len(), 1);
        // The failed directory's children are skipped...
        assert!(!tmp.path().join("docs/taken/child.md").exists());
        // ...but unrelated siblings still scaffold.
        assert!(tmp.path().join("docs/fine").is_dir());
    }

    #[test]
    fn test_existing_directory_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);
        fs::create_dir_all(tmp.path().join("docs/existing")).unwrap();

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![dir("existing", vec![file("note.md", None)])];
        let report = scaffolder
            .create_folder_structure(&vault, "", &items, &json!({}))
            .unwrap();

        assert_eq!(report.status(), ScaffoldStatus::Complete);
        assert!(tmp.path().join("docs/existing/note.md").is_file());
    }

    #[test]
    fn test_folder_metadata_records_expected_children() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![dir(
            "design",
            vec![file("a.md", Some("nope.md")), file("b.md", None)],
        )];
        scaffolder
            .create_folder_structure(&vault, "", &items, &json!({}))
            .unwrap();

        let store = MetadataStore::new(tmp.path());
        let address = Address::Folder {
            vault_id: "docs".into(),
            path: "design".into(),
        };
        let record = store
            .find("docs", &MetadataStore::composite_stem(&address))
            .unwrap()
            .expect("folder metadata record");
        let expected: Vec<&str> = record
            .property("expectedChildren")
            .and_then(|v| v.as_array())
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(expected, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_items_parsed_from_yaml_definition() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);

        // The on-disk shape structure templates are written in.
        let yaml = r#"
- type: directory
  name: adr
  children:
    - type: file
      name: template.md
    - type: directory
      name: accepted
"#;
        let items: Vec<TemplateItem> = serde_yaml::from_str(yaml).unwrap();
        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let report = scaffolder
            .create_folder_structure(&vault, "", &items, &json!({}))
            .unwrap();

        assert_eq!(report.status(), ScaffoldStatus::Complete);
        assert!(tmp.path().join("docs/adr/accepted").is_dir());
        assert!(tmp.path().join("docs/adr/template.md").is_file());
    }

    #[test]
    fn test_scaffold_under_base_path() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);

        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);
        let items = vec![file("readme.md", None)];
        let report = scaffolder
            .create_folder_structure(&vault, "nested/area", &items, &json!({}))
            .unwrap();

        assert_eq!(report.status(), ScaffoldStatus::Complete);
        assert!(tmp.path().join("docs/nested/area/readme.md").is_file());
    }

    #[test]
    fn test_escaping_base_path_rejected() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_fixture(&tmp);
        let scaffolder = Scaffolder::new(tmp.path(), &VarSubstituter);

        assert!(matches!(
            scaffolder.create_folder_structure(&vault, "../outside", &[], &json!({})),
            Err(ScaffoldError::InvalidBasePath(_))
        ));
    }
}
