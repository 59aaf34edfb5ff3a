//! Per-document extractors.
//!
//! Every implemented document nests its payload under `kwargs.data`. The
//! extractors fetch the document, check that it is a JSON object, and
//! project the handful of fields we keep, decoding `__ndarray__` arrays on
//! the way.
//!
//! Failure policy:
//! - transport failure: the fingerprint is mandatory and fails the record;
//!   every other extractor reports [`Extraction::Absent`].
//! - non-object document: the relaxed cell treats it as "no relaxation
//!   data" (absent); every other extractor fails with a type mismatch.

use ndarray::{Axis, Dimension, Ix1, Ix2, Ix3};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec;
use crate::document::DocumentType;
use crate::fetch::Fetch;
use crate::types::{
    BandStructure, BandVariant, C2dbError, C2dbResult, Extraction, KPath, LatticeParameters,
    RelaxedCell, SpinConfiguration, StructureInfo,
};

/// Path prefix of the payload inside every results document.
const DATA_PATH: [&str; 2] = ["kwargs", "data"];

const NO_SPIN_ORBIT_KEY: &str = "bs_nosoc";
const SPIN_ORBIT_KEY: &str = "bs_soc";

impl DocumentType {
    /// Run this document's extractor against `url`.
    ///
    /// `uid` is the requested material and is only consulted by the
    /// fingerprint identity check. Unimplemented documents are not fetched.
    pub fn extract<F: Fetch + ?Sized>(
        self,
        fetcher: &F,
        url: &str,
        uid: &str,
    ) -> C2dbResult<Extraction> {
        match self {
            DocumentType::MaterialFingerprint => {
                extract_fingerprint(fetcher, url, uid).map(Extraction::Fingerprint)
            }
            DocumentType::BandStructure => Ok(extract_band_structure(fetcher, url)?
                .map_or(Extraction::Absent, Extraction::BandStructure)),
            DocumentType::Relax => Ok(extract_relaxed_cell(fetcher, url)?
                .map_or(Extraction::Absent, Extraction::RelaxedCell)),
            DocumentType::StructureInfo => Ok(extract_structure_info(fetcher, url)?
                .map_or(Extraction::Absent, Extraction::StructureInfo)),
            other => {
                tracing::warn!("No extractor implemented for {other}");
                Ok(Extraction::NotImplemented(other))
            }
        }
    }
}

/// Check the fingerprint's uid against the requested one.
///
/// A mismatch is logged and the reported uid returned unchanged.
pub fn extract_fingerprint<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
    uid: &str,
) -> C2dbResult<String> {
    let doc = fetcher.fetch(url)?;
    let data = data_section(expect_mapping(&doc)?)?;

    let reported = match field(data, "uid")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if reported != uid {
        tracing::warn!("ID not match: got {reported} | required {uid}");
    }

    Ok(reported)
}

/// Extract both band-structure variants; `None` when neither is present.
pub fn extract_band_structure<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
) -> C2dbResult<Option<BandStructure>> {
    let Some(doc) = fetch_optional(fetcher, url)? else {
        return Ok(None);
    };
    let data = data_section(expect_mapping(&doc)?)?;

    let bands = BandStructure {
        no_spin_orbit: band_variant(data, NO_SPIN_ORBIT_KEY)?,
        spin_orbit: band_variant(data, SPIN_ORBIT_KEY)?,
    };

    if bands.is_empty() {
        tracing::debug!("No band structure variants in {url}");
        return Ok(None);
    }
    Ok(Some(bands))
}

fn band_variant(data: &Value, key: &str) -> C2dbResult<Option<BandVariant>> {
    let Some(encoded) = lookup(data, &[key, "energies"]) else {
        return Ok(None);
    };

    let energies = decode_at::<f64, Ix3>(encoded, &[key, "energies"])?;
    let spin = SpinConfiguration::from_channels(energies.len_of(Axis(0)))?;

    let path = required(data, &[key, "path"])?;
    let kpoints = decode_at::<f64, Ix2>(required(path, &["kpts"])?, &[key, "path", "kpts"])?;
    if kpoints.ncols() != 3 {
        return Err(C2dbError::Decode(format!(
            "{key}.path.kpts: expected 3 columns, got {}",
            kpoints.ncols()
        )));
    }

    Ok(Some(BandVariant {
        spin,
        energies,
        kpath: KPath { kpoints },
        labels: required(path, &["labelseq"])?.clone(),
        special_points: required(path, &["special_points"])?.clone(),
    }))
}

/// Extract the relaxed cell; `None` when the material has no relaxation data.
pub fn extract_relaxed_cell<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
) -> C2dbResult<Option<RelaxedCell>> {
    let Some(doc) = fetch_optional(fetcher, url)? else {
        return Ok(None);
    };
    if !doc.is_object() {
        tracing::debug!("No relaxation information at {url}");
        return Ok(None);
    }
    let data = data_section(&doc)?;

    let lattice_info = LatticeParameters {
        a: scalar(data, "a")?,
        b: scalar(data, "b")?,
        c: scalar(data, "c")?,
        alpha: scalar(data, "alpha")?,
        beta: scalar(data, "beta")?,
        gamma: scalar(data, "gamma")?,
    };

    Ok(Some(RelaxedCell {
        symbols: typed(data, "symbols")?,
        lattice_info,
        energy_dft: scalar(data, "edft")?,
        positions: decode_at::<f64, Ix2>(field(data, "spos")?, &["spos"])?,
    }))
}

/// Extract formula, symmetry labels and the standardized cell.
pub fn extract_structure_info<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
) -> C2dbResult<Option<StructureInfo>> {
    let Some(doc) = fetch_optional(fetcher, url)? else {
        return Ok(None);
    };
    let data = data_section(expect_mapping(&doc)?)?;
    let dataset = field(data, "spglib_dataset")?;

    Ok(Some(StructureInfo {
        formula: typed(data, "formula")?,
        point_group: typed(data, "pointgroup")?,
        spacegroup: typed(data, "spacegroup")?,
        spacegroup_number: typed(dataset, "number")?,
        lattice: decode_at::<f64, Ix2>(
            required(dataset, &["std_lattice"])?,
            &["spglib_dataset", "std_lattice"],
        )?,
        positions: decode_at::<f64, Ix2>(
            required(dataset, &["std_positions"])?,
            &["spglib_dataset", "std_positions"],
        )?,
        atom_types: decode_at::<i64, Ix1>(
            required(dataset, &["std_types"])?,
            &["spglib_dataset", "std_types"],
        )?,
    }))
}

/// Fetch a document whose absence is tolerated.
fn fetch_optional<F: Fetch + ?Sized>(fetcher: &F, url: &str) -> C2dbResult<Option<Value>> {
    match fetcher.fetch(url) {
        Ok(doc) => Ok(Some(doc)),
        Err(C2dbError::Transport { reason, .. }) => {
            tracing::debug!("Treating {url} as absent: {reason}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn expect_mapping(doc: &Value) -> C2dbResult<&Value> {
    if doc.is_object() {
        Ok(doc)
    } else {
        Err(C2dbError::TypeMismatch {
            expected: "structured document".into(),
            found: json_kind(doc).into(),
        })
    }
}

fn data_section(doc: &Value) -> C2dbResult<&Value> {
    lookup(doc, &DATA_PATH).ok_or_else(|| C2dbError::MissingField(DATA_PATH.join(".")))
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

fn required<'a>(value: &'a Value, path: &[&str]) -> C2dbResult<&'a Value> {
    lookup(value, path).ok_or_else(|| C2dbError::MissingField(path.join(".")))
}

fn field<'a>(data: &'a Value, name: &str) -> C2dbResult<&'a Value> {
    required(data, &[name])
}

fn scalar(data: &Value, name: &str) -> C2dbResult<f64> {
    let value = field(data, name)?;
    value.as_f64().ok_or_else(|| C2dbError::TypeMismatch {
        expected: format!("number for {name}"),
        found: json_kind(value).into(),
    })
}

fn typed<T: DeserializeOwned>(data: &Value, name: &str) -> C2dbResult<T> {
    let value = field(data, name)?;
    T::deserialize(value).map_err(|e| C2dbError::TypeMismatch {
        expected: format!("{} for {name}", std::any::type_name::<T>()),
        found: format!("{} ({e})", json_kind(value)),
    })
}

fn decode_at<T: DeserializeOwned, D: Dimension>(
    value: &Value,
    path: &[&str],
) -> C2dbResult<ndarray::Array<T, D>> {
    codec::decode_dim::<T, D>(value).map_err(|e| match e {
        C2dbError::Decode(msg) => C2dbError::Decode(format!("{}: {msg}", path.join("."))),
        other => other,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
