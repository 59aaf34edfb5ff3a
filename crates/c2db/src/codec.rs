//! Decoder for the `__ndarray__` shaped-array encoding used by C2DB documents.
//!
//! An encoded array is a JSON object of the form
//! `{"__ndarray__": [shape, dtype, flat]}` where `shape` lists the axis
//! lengths, `dtype` names the element type (passed through unused) and
//! `flat` holds every element in row-major order.

use ndarray::{Array, ArrayD, ArrayViewD, Axis, Dimension, IxDyn};
use serde::de::DeserializeOwned;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

use crate::types::{C2dbError, C2dbResult};

/// Key wrapping the encoded triple.
pub const NDARRAY_KEY: &str = "__ndarray__";

/// The shape × dtype × flat-data triple, checked against its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArray<T> {
    pub shape: Vec<usize>,
    pub dtype: Value,
    pub flat: Vec<T>,
}

#[derive(Deserialize)]
struct Wire<T> {
    #[serde(rename = "__ndarray__")]
    triple: (Vec<usize>, Value, Vec<T>),
}

impl<T: DeserializeOwned> EncodedArray<T> {
    /// Parse the wrapper object. Fails if the value does not follow the
    /// triple layout or the elements are not of type `T`.
    pub fn from_value(value: &Value) -> C2dbResult<Self> {
        let wire = Wire::<T>::deserialize(value)
            .map_err(|e| C2dbError::Decode(format!("malformed encoded array: {e}")))?;
        let (shape, dtype, flat) = wire.triple;
        Ok(Self { shape, dtype, flat })
    }
}

impl<T> EncodedArray<T> {
    /// Number of elements the shape calls for; `None` if it overflows.
    pub fn expected_len(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &axis| acc.checked_mul(axis))
    }

    /// Reshape the flat data into an N-dimensional array.
    pub fn into_array(self) -> C2dbResult<ArrayD<T>> {
        if self.shape.is_empty() {
            return Err(C2dbError::Decode("encoded array has an empty shape".into()));
        }
        if self.shape.contains(&0) {
            return Err(C2dbError::Decode(format!(
                "encoded array shape {:?} has a zero-length axis",
                self.shape
            )));
        }
        let expected = self.expected_len().ok_or_else(|| {
            C2dbError::Decode(format!("encoded array shape {:?} is too large", self.shape))
        })?;
        if self.flat.len() != expected {
            return Err(C2dbError::Decode(format!(
                "shape {:?} needs {expected} elements, found {}",
                self.shape,
                self.flat.len()
            )));
        }
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.flat)
            .map_err(|e| C2dbError::Decode(format!("reshape failed: {e}")))
    }
}

/// Decode an encoded array of any rank.
///
/// The elements are copied out of the source document.
pub fn decode<T: DeserializeOwned>(value: &Value) -> C2dbResult<ArrayD<T>> {
    EncodedArray::<T>::from_value(value)?.into_array()
}

/// Decode an encoded array that must have the rank of `D`.
pub fn decode_dim<T, D>(value: &Value) -> C2dbResult<Array<T, D>>
where
    T: DeserializeOwned,
    D: Dimension,
{
    let array = decode::<T>(value)?;
    let shape = array.shape().to_vec();
    array.into_dimensionality::<D>().map_err(|_| {
        C2dbError::Decode(format!(
            "expected a {}-D array, got shape {shape:?}",
            D::NDIM.unwrap_or(0)
        ))
    })
}

/// Encode an array back into the `__ndarray__` wire layout.
pub fn encode<A, D>(array: &Array<A, D>, dtype: &str) -> Value
where
    A: Serialize,
    D: Dimension,
{
    let flat: Vec<&A> = array.iter().collect();
    json!({ NDARRAY_KEY: [array.shape(), dtype, flat] })
}

/// Serialize an array as nested JSON sequences in row-major order.
///
/// Intended for `#[serde(serialize_with = "...")]` on array fields.
pub fn serialize_nested<A, D, S>(array: &Array<A, D>, serializer: S) -> Result<S::Ok, S::Error>
where
    A: Serialize,
    D: Dimension,
    S: Serializer,
{
    Nested(array.view().into_dyn()).serialize(serializer)
}

struct Nested<'a, A>(ArrayViewD<'a, A>);

impl<A: Serialize> Serialize for Nested<'_, A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.ndim() == 0 {
            return match self.0.iter().next() {
                Some(scalar) => scalar.serialize(serializer),
                None => serializer.serialize_none(),
            };
        }
        let mut seq = serializer.serialize_seq(Some(self.0.len_of(Axis(0))))?;
        for sub in self.0.outer_iter() {
            seq.serialize_element(&Nested(sub))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, Ix2};

    #[test]
    fn test_decode_row_major() {
        let value = json!({ "__ndarray__": [[2, 3], "float64", [1, 2, 3, 4, 5, 6]] });
        let arr = decode::<f64>(&value).unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[0, 2]], 3.0);
        assert_eq!(arr[[1, 0]], 4.0);
    }

    #[test]
    fn test_roundtrip_3d() {
        let original = Array3::from_shape_fn((2, 3, 4), |(s, k, b)| (s * 100 + k * 10 + b) as f64);
        let decoded = decode_dim::<f64, ndarray::Ix3>(&encode(&original, "float64")).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_length_mismatch() {
        let value = json!({ "__ndarray__": [[2, 2], "float64", [1.0, 2.0, 3.0]] });
        let err = decode::<f64>(&value).unwrap_err();
        assert!(matches!(err, C2dbError::Decode(_)));
    }

    #[test]
    fn test_oversized_shape_is_decode_error() {
        let value = json!({ "__ndarray__": [[1u64 << 40, 1u64 << 40], "float64", [1.0]] });
        let err = decode::<f64>(&value).unwrap_err();
        assert!(matches!(err, C2dbError::Decode(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_dtype_passed_through() {
        let value = json!({ "__ndarray__": [[1], {"kind": "opaque"}, [7]] });
        let enc = EncodedArray::<i64>::from_value(&value).unwrap();
        assert_eq!(enc.dtype, json!({"kind": "opaque"}));
        assert_eq!(enc.expected_len(), Some(1));
    }

    #[test]
    fn test_rejects_empty_and_zero_shapes() {
        let empty = json!({ "__ndarray__": [[], "float64", []] });
        assert!(decode::<f64>(&empty).is_err());
        let zero = json!({ "__ndarray__": [[0, 3], "float64", []] });
        assert!(decode::<f64>(&zero).is_err());
    }

    #[test]
    fn test_rejects_wrong_layout() {
        assert!(decode::<f64>(&json!([[1], "float64", [1.0]])).is_err());
        assert!(decode::<f64>(&json!({ "__ndarray__": [[1], "float64"] })).is_err());
        assert!(decode::<f64>(&json!({ "__ndarray__": [[-1], "float64", [1.0]] })).is_err());
    }

    #[test]
    fn test_rank_check() {
        let value = json!({ "__ndarray__": [[6], "float64", [1, 2, 3, 4, 5, 6]] });
        let err = decode_dim::<f64, Ix2>(&value).unwrap_err();
        assert!(err.to_string().contains("2-D"));
    }

    #[test]
    fn test_serialize_nested() {
        #[derive(Serialize)]
        struct Holder {
            #[serde(serialize_with = "serialize_nested")]
            grid: ndarray::Array2<i64>,
        }
        let holder = Holder {
            grid: array![[1, 2], [3, 4]],
        };
        assert_eq!(
            serde_json::to_value(&holder).unwrap(),
            json!({ "grid": [[1, 2], [3, 4]] })
        );
    }
}
