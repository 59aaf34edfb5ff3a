//! Sequential crawl over material IDs.
//!
//! Each ID is assembled, flattened into an [`OutputRecord`] and written
//! before the next one starts. A record that fails for any reason is
//! counted as invalid and skipped; the crawl itself never aborts.

use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::assemble::Assembler;
use crate::document::DocumentType;
use crate::fetch::Fetch;
use crate::storage::RecordWriter;
use crate::types::{AssembledRecord, C2dbError, C2dbResult, Extraction};

/// Output key to source document, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    fields: Vec<(String, DocumentType)>,
}

impl FieldMap {
    /// Build a mapping; keys must be unique and non-empty.
    pub fn new<K: Into<String>>(
        fields: impl IntoIterator<Item = (K, DocumentType)>,
    ) -> C2dbResult<Self> {
        let mut out: Vec<(String, DocumentType)> = Vec::new();
        for (key, doc) in fields {
            let key = key.into();
            if key.trim().is_empty() {
                return Err(C2dbError::Configuration("empty output field name".into()));
            }
            if out.iter().any(|(k, _)| *k == key) {
                return Err(C2dbError::Configuration(format!(
                    "duplicate output field: {key}"
                )));
            }
            out.push((key, doc));
        }
        if out.is_empty() {
            return Err(C2dbError::Configuration("no output fields configured".into()));
        }
        Ok(Self { fields: out })
    }

    /// Parse `key=document-name` pairs.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> C2dbResult<Self> {
        let pairs = specs
            .iter()
            .map(|spec| {
                let spec = spec.as_ref();
                let (key, name) = spec.split_once('=').ok_or_else(|| {
                    C2dbError::Configuration(format!(
                        "output field must look like key=document-type, got {spec}"
                    ))
                })?;
                Ok((key.trim().to_string(), name.trim().parse::<DocumentType>()?))
            })
            .collect::<C2dbResult<Vec<_>>>()?;
        Self::new(pairs)
    }

    pub fn fields(&self) -> &[(String, DocumentType)] {
        &self.fields
    }

    /// Requested documents: each mapped type once, in mapping order.
    pub fn document_types(&self) -> Vec<DocumentType> {
        let mut docs = Vec::new();
        for (_, doc) in &self.fields {
            if !docs.contains(doc) {
                docs.push(*doc);
            }
        }
        docs
    }

    /// Project an assembled record onto the output fields.
    pub fn project(&self, record: &AssembledRecord) -> OutputRecord {
        let fields = self
            .fields
            .iter()
            .map(|(key, doc)| {
                let value = record.get(*doc).cloned().unwrap_or(Extraction::Absent);
                (key.clone(), value)
            })
            .collect();
        OutputRecord { fields }
    }
}

impl Default for FieldMap {
    /// `uid`, `structure` and `bands`.
    fn default() -> Self {
        Self {
            fields: vec![
                ("uid".into(), DocumentType::MaterialFingerprint),
                ("structure".into(), DocumentType::StructureInfo),
                ("bands".into(), DocumentType::BandStructure),
            ],
        }
    }
}

/// The flattened document written for one material.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub fields: Vec<(String, Extraction)>,
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Tallies threaded through the crawl and returned at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub total: usize,
    pub written: usize,
    pub invalid: usize,
    pub invalid_ids: Vec<String>,
}

impl CrawlReport {
    fn record_written(mut self) -> Self {
        self.total += 1;
        self.written += 1;
        self
    }

    fn record_invalid(mut self, uid: &str) -> Self {
        self.total += 1;
        self.invalid += 1;
        self.invalid_ids.push(uid.to_string());
        self
    }
}

/// Drives assembly and persistence for a sequence of material IDs.
pub struct Crawler<F> {
    assembler: Assembler<F>,
    fields: FieldMap,
    documents: Vec<DocumentType>,
    writer: RecordWriter,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(assembler: Assembler<F>, fields: FieldMap, writer: RecordWriter) -> Self {
        for (key, doc) in fields.fields() {
            if !doc.is_implemented() {
                tracing::warn!("Output field {key} maps to {doc}, which has no extractor; it will be written as null");
            }
        }
        let documents = fields.document_types();
        Self {
            assembler,
            fields,
            documents,
            writer,
        }
    }

    pub fn assembler(&self) -> &Assembler<F> {
        &self.assembler
    }

    pub fn writer(&self) -> &RecordWriter {
        &self.writer
    }

    /// Crawl every ID in order and return the final tallies.
    pub fn run<I, S>(&self, ids: I) -> CrawlReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tracing::info!("Loading...");

        let report = ids.into_iter().fold(CrawlReport::default(), |report, uid| {
            let uid = uid.as_ref();
            let report = match self.process(uid) {
                Ok(_) => report.record_written(),
                Err(e) => {
                    tracing::warn!("Skipping {uid}: {e}");
                    report.record_invalid(uid)
                }
            };
            tracing::info!(
                "Finished: {} | Invalid: {} | Processed: {}",
                report.written,
                report.invalid,
                report.total
            );
            report
        });

        if !report.invalid_ids.is_empty() {
            tracing::info!("Invalid uid list: {:?}", report.invalid_ids);
        }
        report
    }

    /// Assemble, project and write a single material.
    pub fn process(&self, uid: &str) -> C2dbResult<PathBuf> {
        let record = self.assembler.assemble_types(uid, &self.documents)?;
        let output = self.fields.project(&record);
        for (key, value) in &output.fields {
            if value.is_absent() {
                tracing::debug!("{uid}: no data for {key}");
            }
        }
        self.writer.write(uid, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields() {
        let fields = FieldMap::default();
        assert_eq!(
            fields.document_types(),
            vec![
                DocumentType::MaterialFingerprint,
                DocumentType::StructureInfo,
                DocumentType::BandStructure
            ]
        );
    }

    #[test]
    fn test_parse_fields() {
        let fields = FieldMap::parse(&[
            "uid=results-asr.database.material_fingerprint.json",
            "cell = results-asr.relax.json",
            "id2=results-asr.database.material_fingerprint.json",
        ])
        .unwrap();
        assert_eq!(fields.fields()[1], ("cell".to_string(), DocumentType::Relax));
        assert_eq!(fields.document_types().len(), 2);
    }

    #[test]
    fn test_parse_fields_rejects_bad_specs() {
        assert!(FieldMap::parse(&["uid"]).is_err());
        assert!(FieldMap::parse(&["uid=nope.json"]).is_err());
        assert!(FieldMap::parse(&["=results-asr.gs.json"]).is_err());
        let empty: [&str; 0] = [];
        assert!(FieldMap::parse(&empty).is_err());
        assert!(FieldMap::parse(&["a=results-asr.gs.json", "a=results-asr.relax.json"]).is_err());
    }

    #[test]
    fn test_output_keeps_field_order() {
        let record = OutputRecord {
            fields: vec![
                ("uid".into(), Extraction::Fingerprint("x".into())),
                ("bands".into(), Extraction::Absent),
                ("alpha".into(), Extraction::NotImplemented(DocumentType::Gs)),
            ],
        };
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"uid":"x","bands":null,"alpha":null}"#);
    }

    #[test]
    fn test_report_accumulates() {
        let report = CrawlReport::default()
            .record_written()
            .record_invalid("b")
            .record_written();
        assert_eq!(report.total, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.invalid_ids, vec!["b"]);
    }
}
