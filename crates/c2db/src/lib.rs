//! C2DB — fetch, decode and condense per-material records from the C2DB database.

pub mod assemble;
pub mod codec;
pub mod crawl;
pub mod document;
pub mod extract;
pub mod fetch;
pub mod storage;
pub mod types;

pub use assemble::{Assembler, DEFAULT_BASE_URL};
pub use codec::{decode, decode_dim, encode, EncodedArray};
pub use crawl::{CrawlReport, Crawler, FieldMap, OutputRecord};
pub use document::DocumentType;
pub use fetch::{Fetch, HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use storage::RecordWriter;
pub use types::*;
