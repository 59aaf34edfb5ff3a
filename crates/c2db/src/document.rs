//! The closed set of per-material JSON documents published by C2DB.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::types::{C2dbError, C2dbResult};

/// One named JSON resource available under a material's data URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentType {
    Info,
    Bader,
    BandStructure,
    BandStructureCalculate,
    ConvexHull,
    MaterialFingerprint,
    Exchange,
    ExchangeCalculate,
    Gs,
    GsCalculate,
    MagneticAnisotropy,
    Magstate,
    Pdos,
    PdosCalculate,
    Phonons,
    PhononsCalculate,
    PlasmaFrequency,
    PlasmaFrequencyCalculate,
    Polarizability,
    ProjectedBandStructure,
    Relax,
    SetInfo,
    SetupReduce,
    SetupStrains,
    Stiffness,
    StructureInfo,
    Structure,
}

impl DocumentType {
    pub const ALL: [DocumentType; 27] = [
        Self::Info,
        Self::Bader,
        Self::BandStructure,
        Self::BandStructureCalculate,
        Self::ConvexHull,
        Self::MaterialFingerprint,
        Self::Exchange,
        Self::ExchangeCalculate,
        Self::Gs,
        Self::GsCalculate,
        Self::MagneticAnisotropy,
        Self::Magstate,
        Self::Pdos,
        Self::PdosCalculate,
        Self::Phonons,
        Self::PhononsCalculate,
        Self::PlasmaFrequency,
        Self::PlasmaFrequencyCalculate,
        Self::Polarizability,
        Self::ProjectedBandStructure,
        Self::Relax,
        Self::SetInfo,
        Self::SetupReduce,
        Self::SetupStrains,
        Self::Stiffness,
        Self::StructureInfo,
        Self::Structure,
    ];

    /// The document's file name as it appears in C2DB URLs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Info => "info.json",
            Self::Bader => "results-asr.bader.json",
            Self::BandStructure => "results-asr.bandstructure.json",
            Self::BandStructureCalculate => "results-asr.bandstructure@calculate.json",
            Self::ConvexHull => "results-asr.convex_hull.json",
            Self::MaterialFingerprint => "results-asr.database.material_fingerprint.json",
            Self::Exchange => "results-asr.exchange.json",
            Self::ExchangeCalculate => "results-asr.exchange@calculate.json",
            Self::Gs => "results-asr.gs.json",
            Self::GsCalculate => "results-asr.gs@calculate.json",
            Self::MagneticAnisotropy => "results-asr.magnetic_anisotropy.json",
            Self::Magstate => "results-asr.magstate.json",
            Self::Pdos => "results-asr.pdos.json",
            Self::PdosCalculate => "results-asr.pdos@calculate.json",
            Self::Phonons => "results-asr.phonons.json",
            Self::PhononsCalculate => "results-asr.phonons@calculate.json",
            Self::PlasmaFrequency => "results-asr.plasmafrequency.json",
            Self::PlasmaFrequencyCalculate => "results-asr.plasmafrequency@calculate.json",
            Self::Polarizability => "results-asr.polarizability.json",
            Self::ProjectedBandStructure => "results-asr.projected_bandstructure.json",
            Self::Relax => "results-asr.relax.json",
            Self::SetInfo => "results-asr.setinfo.json",
            Self::SetupReduce => "results-asr.setup.reduce.json",
            Self::SetupStrains => "results-asr.setup.strains.json",
            Self::Stiffness => "results-asr.stiffness.json",
            Self::StructureInfo => "results-asr.structureinfo.json",
            Self::Structure => "structure.json",
        }
    }

    /// Whether an extractor exists for this document.
    pub fn is_implemented(self) -> bool {
        matches!(
            self,
            Self::BandStructure | Self::MaterialFingerprint | Self::Relax | Self::StructureInfo
        )
    }

    /// Full URL of this document for one material.
    pub fn url(self, base_url: &str, uid: &str) -> String {
        format!(
            "{}/{uid}/data/{}/json",
            base_url.trim_end_matches('/'),
            self.name()
        )
    }

    /// Parse a requested list of document names.
    ///
    /// Fails on an empty list, an empty name, or a name outside the
    /// enumeration. Nothing is fetched before this succeeds.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> C2dbResult<Vec<DocumentType>> {
        if names.is_empty() {
            return Err(C2dbError::Configuration(
                "no document types requested".into(),
            ));
        }
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for DocumentType {
    type Err = C2dbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(C2dbError::Configuration(
                "empty document type requested".into(),
            ));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| C2dbError::Configuration(format!("unknown document type: {s}")))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DocumentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_roundtrip() {
        for doc in DocumentType::ALL {
            assert_eq!(doc.name().parse::<DocumentType>().unwrap(), doc);
        }
        let unique: HashSet<_> = DocumentType::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(unique.len(), DocumentType::ALL.len());
    }

    #[test]
    fn test_url_layout() {
        let url = DocumentType::BandStructure.url("https://cmrdb.fysik.dtu.dk/c2db/row/", "MoS2-b3b4685fb6e1");
        assert_eq!(
            url,
            "https://cmrdb.fysik.dtu.dk/c2db/row/MoS2-b3b4685fb6e1/data/results-asr.bandstructure.json/json"
        );
    }

    #[test]
    fn test_parse_list_rejects_bad_requests() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            DocumentType::parse_list(&empty),
            Err(C2dbError::Configuration(_))
        ));
        assert!(matches!(
            DocumentType::parse_list(&["results-asr.gs.json", ""]),
            Err(C2dbError::Configuration(_))
        ));
        assert!(matches!(
            DocumentType::parse_list(&["results-asr.nope.json"]),
            Err(C2dbError::Configuration(_))
        ));
    }

    #[test]
    fn test_implemented_set() {
        let implemented: Vec<_> = DocumentType::ALL
            .into_iter()
            .filter(|d| d.is_implemented())
            .collect();
        assert_eq!(implemented.len(), 4);
        assert!(!DocumentType::Phonons.is_implemented());
    }
}
