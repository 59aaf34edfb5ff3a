//! Record assembly: resolve requested documents and run their extractors.

use std::collections::BTreeMap;

use crate::document::DocumentType;
use crate::fetch::Fetch;
use crate::types::{AssembledRecord, C2dbError, C2dbResult};

/// Root of the per-material row URLs.
pub const DEFAULT_BASE_URL: &str = "https://cmrdb.fysik.dtu.dk/c2db/row";

/// Builds one [`AssembledRecord`] per material from a fixed fetcher.
pub struct Assembler<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> Assembler<F> {
    /// Create an assembler against the public C2DB site.
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { fetcher, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Assemble a record from document names.
    ///
    /// All names are validated before any request is made.
    pub fn assemble<S: AsRef<str>>(&self, uid: &str, names: &[S]) -> C2dbResult<AssembledRecord> {
        let docs = DocumentType::parse_list(names)?;
        self.assemble_types(uid, &docs)
    }

    /// Assemble a record from already-resolved document types.
    pub fn assemble_types(&self, uid: &str, docs: &[DocumentType]) -> C2dbResult<AssembledRecord> {
        if docs.is_empty() {
            return Err(C2dbError::Configuration(
                "no document types requested".into(),
            ));
        }
        check_uid(uid)?;

        let mut documents = BTreeMap::new();
        for &doc in docs {
            let url = doc.url(&self.base_url, uid);
            let extraction = doc.extract(&self.fetcher, &url, uid)?;
            documents.insert(doc, extraction);
        }

        Ok(AssembledRecord {
            uid: uid.to_string(),
            documents,
        })
    }
}

/// Material ids go verbatim into URL paths and file names.
fn check_uid(uid: &str) -> C2dbResult<()> {
    if uid.trim().is_empty() {
        return Err(C2dbError::Configuration("empty material id".into()));
    }
    let unsafe_char =
        |c: &char| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control();
    if let Some(bad) = uid.chars().find(unsafe_char) {
        return Err(C2dbError::Configuration(format!(
            "material id {uid:?} contains {bad:?}, which cannot appear in a URL path or file name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extraction;
    use serde_json::{json, Value};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Spy {
        urls: RefCell<Vec<String>>,
    }

    impl Fetch for Spy {
        fn fetch(&self, url: &str) -> C2dbResult<Value> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(json!({ "kwargs": { "data": { "uid": "MoS2-1" } } }))
        }
    }

    #[test]
    fn test_empty_request_fails_before_fetching() {
        let assembler = Assembler::new(Spy::default());
        let empty: [&str; 0] = [];
        let err = assembler.assemble("MoS2-1", &empty).unwrap_err();
        assert!(matches!(err, C2dbError::Configuration(_)));
        assert!(assembler.fetcher().urls.borrow().is_empty());
    }

    #[test]
    fn test_unknown_type_fails_before_fetching() {
        let assembler = Assembler::new(Spy::default());
        let err = assembler
            .assemble(
                "MoS2-1",
                &["results-asr.database.material_fingerprint.json", "bogus.json"],
            )
            .unwrap_err();
        assert!(matches!(err, C2dbError::Configuration(_)));
        assert!(assembler.fetcher().urls.borrow().is_empty());
    }

    #[test]
    fn test_unsafe_uid_fails_before_fetching() {
        let assembler = Assembler::new(Spy::default());
        for uid in ["MoS2/../x", "MoS2-1?page=2", "MoS2 1", "a#b", "50%"] {
            let err = assembler
                .assemble(uid, &["results-asr.database.material_fingerprint.json"])
                .unwrap_err();
            assert!(matches!(err, C2dbError::Configuration(_)), "{uid}");
        }
        assert!(assembler.fetcher().urls.borrow().is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let assembler = Assembler::with_base_url(Spy::default(), "http://mirror.local/row///");
        assert_eq!(assembler.base_url(), "http://mirror.local/row");
        assert_eq!(Assembler::new(Spy::default()).base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_assemble_builds_urls_and_keys() {
        let assembler = Assembler::with_base_url(Spy::default(), "http://mirror.local/row/");
        let record = assembler
            .assemble(
                "MoS2-1",
                &[
                    "results-asr.database.material_fingerprint.json",
                    "results-asr.gs.json",
                ],
            )
            .unwrap();

        assert_eq!(
            *assembler.fetcher().urls.borrow(),
            vec!["http://mirror.local/row/MoS2-1/data/results-asr.database.material_fingerprint.json/json"]
        );
        assert_eq!(
            record.get(DocumentType::MaterialFingerprint),
            Some(&Extraction::Fingerprint("MoS2-1".into()))
        );
        assert_eq!(
            record.get(DocumentType::Gs),
            Some(&Extraction::NotImplemented(DocumentType::Gs))
        );
    }
}
