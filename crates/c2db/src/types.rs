//! Core data types for extracted material records.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Array3};
use serde::Serialize;
use serde_json::Value;

use crate::codec::serialize_nested;
use crate::document::DocumentType;

/// Whether a band-structure calculation was spin polarized.
///
/// Derived from the leading axis of the energies array: one spin channel
/// means unpolarized, two means polarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinConfiguration {
    Unpolarized,
    Polarized,
}

impl SpinConfiguration {
    /// Classify from the size of the spin axis.
    pub fn from_channels(channels: usize) -> C2dbResult<Self> {
        match channels {
            1 => Ok(Self::Unpolarized),
            2 => Ok(Self::Polarized),
            other => Err(C2dbError::Decode(format!(
                "unrecognized spin configuration: {other} spin channels"
            ))),
        }
    }

    pub fn is_polarized(self) -> bool {
        matches!(self, Self::Polarized)
    }
}

/// The k-point path a band structure was sampled along.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KPath {
    /// Fractional k-point coordinates, one row per point.
    #[serde(serialize_with = "serialize_nested")]
    pub kpoints: Array2<f64>,
}

/// One band-structure calculation (with or without spin-orbit coupling).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandVariant {
    #[serde(rename = "is_spinpolarized", serialize_with = "serialize_spin")]
    pub spin: SpinConfiguration,
    /// Eigenvalues indexed by (spin or band set, k-point, eigenvalue).
    #[serde(rename = "bands", serialize_with = "serialize_nested")]
    pub energies: Array3<f64>,
    pub kpath: KPath,
    /// Labels locating named points along the path.
    #[serde(rename = "kpoint_labels")]
    pub labels: Value,
    /// Special-point name to fractional coordinate.
    pub special_points: Value,
}

fn serialize_spin<S: serde::Serializer>(
    spin: &SpinConfiguration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(spin.is_polarized())
}

/// Band structure record; each variant present only when the source had it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BandStructure {
    #[serde(rename = "nonsoc_energies", skip_serializing_if = "Option::is_none")]
    pub no_spin_orbit: Option<BandVariant>,
    #[serde(rename = "soc_energies", skip_serializing_if = "Option::is_none")]
    pub spin_orbit: Option<BandVariant>,
}

impl BandStructure {
    pub fn is_empty(&self) -> bool {
        self.no_spin_orbit.is_none() && self.spin_orbit.is_none()
    }
}

/// Lattice constants: three lengths and three angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatticeParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// Relaxed unit cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaxedCell {
    pub symbols: Vec<String>,
    pub lattice_info: LatticeParameters,
    pub energy_dft: f64,
    /// Fractional atomic positions (atom index × 3).
    #[serde(rename = "supercell_positions", serialize_with = "serialize_nested")]
    pub positions: Array2<f64>,
}

/// Symmetry and standardized-cell information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureInfo {
    pub formula: String,
    pub point_group: String,
    pub spacegroup: String,
    pub spacegroup_number: i64,
    #[serde(serialize_with = "serialize_nested")]
    pub lattice: Array2<f64>,
    #[serde(rename = "position", serialize_with = "serialize_nested")]
    pub positions: Array2<f64>,
    #[serde(serialize_with = "serialize_nested")]
    pub atom_types: Array1<i64>,
}

/// Outcome of running one document extractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    /// The uid reported by the fingerprint document.
    Fingerprint(String),
    BandStructure(BandStructure),
    RelaxedCell(RelaxedCell),
    StructureInfo(StructureInfo),
    /// The document had no data for this material.
    Absent,
    /// No extractor exists for this document type; nothing was fetched.
    #[serde(serialize_with = "serialize_not_implemented")]
    NotImplemented(DocumentType),
}

fn serialize_not_implemented<S: serde::Serializer>(
    _doc: &DocumentType,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_none()
}

impl Extraction {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

/// All extractions for one material, keyed by document type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledRecord {
    pub uid: String,
    pub documents: BTreeMap<DocumentType, Extraction>,
}

impl AssembledRecord {
    pub fn get(&self, doc: DocumentType) -> Option<&Extraction> {
        self.documents.get(&doc)
    }
}

/// Errors that can occur while fetching and extracting records.
#[derive(thiserror::Error, Debug)]
pub enum C2dbError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Transport error for {url}: {reason}")]
    Transport {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type C2dbResult<T> = Result<T, C2dbError>;
