//! Configuration resolution.

use std::path::{Path, PathBuf};

use c2db::DEFAULT_BASE_URL;

/// Env var overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "C2DB_OUTPUT_DIR";

/// Env var overriding the C2DB row URL.
pub const BASE_URL_ENV: &str = "C2DB_BASE_URL";

const DEFAULT_OUTPUT_DIR: &str = "c2db_database";

/// ASE database picked up by a bare `crawl`.
pub const DEFAULT_ASE_DB: &str = "c2db.db";

/// Resolve the output directory: explicit > env > `./c2db_database`.
pub fn resolve_output_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(OUTPUT_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// `./c2db.db` if it exists.
pub fn default_ase_db() -> Option<PathBuf> {
    existing(Path::new(DEFAULT_ASE_DB))
}

fn existing(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

/// Resolve the base row URL: explicit > env > public C2DB.
pub fn resolve_base_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }

    match std::env::var(BASE_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        assert_eq!(resolve_output_dir(Some("/tmp/out")), PathBuf::from("/tmp/out"));
        assert_eq!(resolve_base_url(Some("http://mirror/row")), "http://mirror/row");
    }

    #[test]
    fn test_existing_db_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join(DEFAULT_ASE_DB);
        assert_eq!(existing(&db), None);
        std::fs::write(&db, b"").unwrap();
        assert_eq!(existing(&db), Some(db));
        assert_eq!(existing(dir.path()), None);
    }
}
