//! End-to-end flow over a real temporary directory tree: discover vaults,
//! create and query artifacts, attach metadata, trace code paths.

use std::fs;

use archivault_core::{
    ArtifactFormat, ArtifactQuery, CreateArtifact, TargetType, Vault, VaultType, Workspace,
};
use tempfile::TempDir;

#[test]
fn test_full_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let mut ws = Workspace::open(tmp.path());

    // Empty root: no vaults.
    assert!(ws.vaults().find_all().unwrap().is_empty());

    // Register a vault and a second one discovered purely by convention.
    let mut vault = Vault::new("architecture");
    vault.description = Some("System architecture docs".into());
    ws.vaults().save(&vault).unwrap();
    fs::create_dir_all(tmp.path().join("todo/archi-tasks")).unwrap();

    let vaults = ws.vaults().find_all().unwrap();
    assert_eq!(vaults.len(), 2);
    assert_eq!(
        ws.vaults().find_by_id("todo").unwrap().vault_type,
        VaultType::Task
    );

    // Create artifacts, one from a content template.
    fs::create_dir_all(tmp.path().join("architecture/archi-templates")).unwrap();
    fs::write(
        tmp.path().join("architecture/archi-templates/service.md"),
        "# {{name}} service\n\nOwner: {{owner}}\n",
    )
    .unwrap();

    let mut opts = CreateArtifact::new("services/billing", ArtifactFormat::Markdown);
    opts.template = Some("service.md".into());
    opts.variables = Some(serde_json::json!({"name": "billing", "owner": "platform"}));
    opts.tags = vec!["service".into(), "billing".into()];
    let billing = ws.create_artifact("architecture", opts).unwrap();
    assert_eq!(billing.path, "services/billing.md");

    let mut opts = CreateArtifact::new("services/payments.md", ArtifactFormat::Markdown);
    opts.tags = vec!["service".into()];
    ws.create_artifact("architecture", opts).unwrap();

    // Query: AND-tag filtering narrows to the billing doc.
    let vault = ws.vaults().find_by_id("architecture").unwrap();
    let query = ArtifactQuery {
        tags: vec!["service".into(), "billing".into()],
        ..Default::default()
    };
    let matched = ws.artifacts().list(&vault, &query).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, billing.id);

    // Rendered template content survived the round trip.
    let loaded = ws.artifacts().get(&vault, "services/billing.md").unwrap();
    assert_eq!(
        loaded.content.as_deref(),
        Some("# billing service\n\nOwner: platform\n")
    );

    // Link documentation to code, both ways of addressing.
    ws.update_related_code_paths(
        "architecture",
        "services/billing.md",
        TargetType::Artifact,
        &["src/billing/mod.rs".into()],
    )
    .unwrap();
    ws.update_related_code_paths(
        "architecture",
        "services",
        TargetType::Folder,
        &["src/billing/mod.rs".into()],
    )
    .unwrap();

    let hits = ws.find_artifacts_by_code_path("src/billing/mod.rs").unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|a| a.id == billing.id));
    assert!(hits.iter().any(|a| a.path == "services"));

    // Deleting the artifact removes its side-car and breaks the link.
    ws.artifacts().delete(&vault, "services/billing.md").unwrap();
    let hits = ws.find_artifacts_by_code_path("src/billing/mod.rs").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "services");
}
