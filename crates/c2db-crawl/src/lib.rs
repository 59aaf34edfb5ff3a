//! c2db-crawl — mirror C2DB material records into local JSON files.

pub mod catalog;
pub mod config;

pub use catalog::{ids_from_ase_db, ids_from_list_file, parse_id_list};
pub use config::{default_ase_db, resolve_base_url, resolve_output_dir};
