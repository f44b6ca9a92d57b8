//! Filesystem helpers shared by the stores.

use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Atomically replace `path` with `contents`: write a sibling temp file, then
/// rename over the target. Parent directories are created as needed. No
/// cross-process locking is attempted; concurrent writers race and the later
/// rename wins.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "write".to_string()),
        Uuid::new_v4().as_simple()
    );
    let tmp_path = parent.join(tmp_name);

    fs::write(&tmp_path, contents)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Turn an arbitrary record key into a filesystem-safe file stem.
///
/// Keeps `[A-Za-z0-9._-]` as-is; anything else maps to `-`. When the key was
/// altered, an 8-hex SHA-256 suffix keeps distinct keys distinct (composite
/// keys contain `:` and `/`).
pub fn sanitize_stem(raw: &str) -> String {
    let mut changed = false;
    let mut stem: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                changed = true;
                '-'
            }
        })
        .collect();

    if changed || stem.is_empty() {
        let digest = Sha256::digest(raw.as_bytes());
        let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
        stem.push('-');
        stem.push_str(&suffix);
    }
    stem
}

/// Vault-relative path with `/` separators.
pub fn relative_path(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Normalize a code path for relation matching: strip the workspace root
/// when given an absolute path inside it, normalize separators, drop a
/// leading `./`.
pub fn normalize_code_path(workspace_root: &Path, given: &str) -> String {
    let unified = given.replace('\\', "/");
    let path = Path::new(&unified);
    let rel = if path.is_absolute() {
        match path.strip_prefix(workspace_root) {
            Ok(stripped) => stripped.to_string_lossy().into_owned(),
            Err(_) => unified.clone(),
        }
    } else {
        unified.clone()
    };
    rel.trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a/b/c.yml");

        atomic_write(&target, b"one").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "one");

        atomic_write(&target, b"two").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "two");

        // No temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_sanitize_stem_passthrough_for_safe_keys() {
        assert_eq!(sanitize_stem("readme"), "readme");
        assert_eq!(sanitize_stem("context-diagram_v2"), "context-diagram_v2");
    }

    #[test]
    fn test_sanitize_stem_distinct_for_distinct_keys() {
        let a = sanitize_stem("file:v1:notes/readme.md");
        let b = sanitize_stem("file:v1:notes-readme.md");
        assert_ne!(a, b);
        assert!(a.starts_with("file-v1-notes-readme.md-"));
        assert!(!a.contains(':'));
        assert!(!a.contains('/'));
    }

    #[test]
    fn test_normalize_code_path() {
        let root = Path::new("/ws");
        assert_eq!(normalize_code_path(root, "/ws/src/main.rs"), "src/main.rs");
        assert_eq!(normalize_code_path(root, "./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_code_path(root, "src\\main.rs"), "src/main.rs");
        assert_eq!(normalize_code_path(root, "/other/x.rs"), "/other/x.rs");
    }
}
