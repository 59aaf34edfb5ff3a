//! Sources of material IDs to crawl.
//!
//! The C2DB release ships as an ASE SQLite database whose `systems` table
//! stores each row's `key_value_pairs` as a JSON object; the material ID is
//! the `uid` key. Plain-text lists (one ID per line) are accepted as well.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;

/// Read material IDs from an ASE database, in row order.
///
/// Rows without a `uid` key are skipped with a warning.
pub fn ids_from_ase_db(path: &Path) -> Result<Vec<String>> {
    let db = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open ASE database: {}", path.display()))?;

    let mut stmt = db
        .prepare("SELECT id, key_value_pairs FROM systems ORDER BY id")
        .with_context(|| format!("{} is not an ASE database", path.display()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut ids = Vec::with_capacity(rows.len());
    for (row_id, kvp) in rows {
        match kvp.as_deref().and_then(uid_from_key_value_pairs) {
            Some(uid) => ids.push(uid),
            None => tracing::warn!("Row {row_id} in {} has no uid", path.display()),
        }
    }

    tracing::info!("Loaded {} material ids from {}", ids.len(), path.display());
    Ok(ids)
}

fn uid_from_key_value_pairs(raw: &str) -> Option<String> {
    let kvp: Value = serde_json::from_str(raw).ok()?;
    match kvp.get("uid")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Read material IDs from a text file, one per line.
pub fn ids_from_list_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read id list: {}", path.display()))?;
    Ok(parse_id_list(&text))
}

/// Parse an ID list; blank lines and `#` comments are ignored.
pub fn parse_id_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
