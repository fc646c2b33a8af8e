//! Dataset and attribute values, and the storage-kind classification
//! derived from them.
//!
//! A dataset never declares its storage shape separately. The shape the
//! backend sees is a function of the value's runtime variant, computed
//! when the tree is written out, so a value edited in place between
//! construction and the write pass is stored in its edited form.

use std::fmt;

/// Element types a backend can store. Fixed-length strings carry their
/// byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Fixed-length byte string of the given length.
    Str(u32),
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> u32 {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
            ElementType::Str(len) => *len,
        }
    }

    /// Parse the short type code produced by [`Display`](fmt::Display).
    pub fn parse(code: &str) -> Option<ElementType> {
        match code {
            "i8" => Some(ElementType::I8),
            "i16" => Some(ElementType::I16),
            "i32" => Some(ElementType::I32),
            "i64" => Some(ElementType::I64),
            "u8" => Some(ElementType::U8),
            "u16" => Some(ElementType::U16),
            "u32" => Some(ElementType::U32),
            "u64" => Some(ElementType::U64),
            "f32" => Some(ElementType::F32),
            "f64" => Some(ElementType::F64),
            _ => {
                let len = code.strip_prefix('S')?.parse().ok()?;
                Some(ElementType::Str(len))
            }
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::I8 => write!(f, "i8"),
            ElementType::I16 => write!(f, "i16"),
            ElementType::I32 => write!(f, "i32"),
            ElementType::I64 => write!(f, "i64"),
            ElementType::U8 => write!(f, "u8"),
            ElementType::U16 => write!(f, "u16"),
            ElementType::U32 => write!(f, "u32"),
            ElementType::U64 => write!(f, "u64"),
            ElementType::F32 => write!(f, "f32"),
            ElementType::F64 => write!(f, "f64"),
            ElementType::Str(len) => write!(f, "S{len}"),
        }
    }
}

/// N-dimensional array with an explicit shape, element type and raw
/// little-endian payload in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<u64>,
    elem: ElementType,
    data: Vec<u8>,
}

impl NdArray {
    /// All-zero array of the given shape and element type.
    pub fn zeros(shape: &[u64], elem: ElementType) -> NdArray {
        let count: u64 = shape.iter().product();
        NdArray {
            shape: shape.to_vec(),
            elem,
            data: vec![0u8; (count * elem.size_bytes() as u64) as usize],
        }
    }

    /// Array of f64 values in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not match the shape's element count.
    pub fn from_f64(shape: &[u64], values: &[f64]) -> NdArray {
        let count: u64 = shape.iter().product();
        assert_eq!(values.len() as u64, count, "value count does not match shape");
        let mut data = Vec::with_capacity(values.len() * 8);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        NdArray { shape: shape.to_vec(), elem: ElementType::F64, data }
    }

    /// Array of i64 values in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not match the shape's element count.
    pub fn from_i64(shape: &[u64], values: &[i64]) -> NdArray {
        let count: u64 = shape.iter().product();
        assert_eq!(values.len() as u64, count, "value count does not match shape");
        let mut data = Vec::with_capacity(values.len() * 8);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        NdArray { shape: shape.to_vec(), elem: ElementType::I64, data }
    }

    /// Array of u32 values in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not match the shape's element count.
    pub fn from_u32(shape: &[u64], values: &[u32]) -> NdArray {
        let count: u64 = shape.iter().product();
        assert_eq!(values.len() as u64, count, "value count does not match shape");
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        NdArray { shape: shape.to_vec(), elem: ElementType::U32, data }
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn elem(&self) -> ElementType {
        self.elem
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total element count.
    pub fn len(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dataset value.
///
/// The variant decides how the dataset is laid out in storage: bare
/// numbers become rank-0 datasets, text becomes a scalar fixed-length
/// string, sequences become 1-D, and [`NdArray`] keeps its own shape.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    F64(f64),
    I64(i64),
    Str(String),
    F64Seq(Vec<f64>),
    I64Seq(Vec<i64>),
    Array(NdArray),
}

/// Storage-shape category of a [`DataValue`].
///
/// Classification is total over the value variants and runs at write
/// time, never at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Bare number: rank-0 dataspace.
    Scalar,
    /// Text: rank-0 dataspace, fixed-length string of `len` bytes.
    Text { len: u32 },
    /// Ordered sequence: 1-D dataspace of `len` elements.
    Sequence { len: u64 },
    /// Array with its own explicit shape.
    Array { shape: Vec<u64> },
}

impl DataValue {
    /// Classify this value's storage shape.
    pub fn kind(&self) -> ValueKind {
        match self {
            DataValue::Array(a) => ValueKind::Array { shape: a.shape().to_vec() },
            DataValue::Str(s) => ValueKind::Text { len: s.len() as u32 },
            DataValue::F64Seq(v) => ValueKind::Sequence { len: v.len() as u64 },
            DataValue::I64Seq(v) => ValueKind::Sequence { len: v.len() as u64 },
            DataValue::F64(_) | DataValue::I64(_) => ValueKind::Scalar,
        }
    }

    /// Dataspace dimensions the backend should create: empty for scalars
    /// and text, `[n]` for sequences, the array's own shape otherwise.
    pub fn shape(&self) -> Vec<u64> {
        match self.kind() {
            ValueKind::Scalar | ValueKind::Text { .. } => Vec::new(),
            ValueKind::Sequence { len } => vec![len],
            ValueKind::Array { shape } => shape,
        }
    }

    /// Element type inferred from the value alone.
    pub fn element_type(&self) -> ElementType {
        match self {
            DataValue::F64(_) | DataValue::F64Seq(_) => ElementType::F64,
            DataValue::I64(_) | DataValue::I64Seq(_) => ElementType::I64,
            DataValue::Str(s) => ElementType::Str(s.len() as u32),
            DataValue::Array(a) => a.elem(),
        }
    }

    /// Raw little-endian payload, encoded as `elem`.
    ///
    /// Numeric scalars and sequences are converted to the requested
    /// element type; text and explicit arrays already carry their own
    /// element type and are returned as-is.
    pub fn raw_bytes(&self, elem: ElementType) -> Vec<u8> {
        match self {
            DataValue::F64(v) => encode_f64(&[*v], elem),
            DataValue::I64(v) => encode_i64(&[*v], elem),
            DataValue::F64Seq(vs) => encode_f64(vs, elem),
            DataValue::I64Seq(vs) => encode_i64(vs, elem),
            DataValue::Str(s) => s.as_bytes().to_vec(),
            DataValue::Array(a) => a.data().to_vec(),
        }
    }
}

fn encode_f64(values: &[f64], elem: ElementType) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * elem.size_bytes() as usize);
    for &v in values {
        match elem {
            ElementType::I8 => out.push((v as i8) as u8),
            ElementType::I16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
            ElementType::I32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
            ElementType::I64 => out.extend_from_slice(&(v as i64).to_le_bytes()),
            ElementType::U8 => out.push(v as u8),
            ElementType::U16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
            ElementType::U32 => out.extend_from_slice(&(v as u32).to_le_bytes()),
            ElementType::U64 => out.extend_from_slice(&(v as u64).to_le_bytes()),
            ElementType::F32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            ElementType::F64 | ElementType::Str(_) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out
}

fn encode_i64(values: &[i64], elem: ElementType) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * elem.size_bytes() as usize);
    for &v in values {
        match elem {
            ElementType::I8 => out.push((v as i8) as u8),
            ElementType::I16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
            ElementType::I32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
            ElementType::U8 => out.push(v as u8),
            ElementType::U16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
            ElementType::U32 => out.extend_from_slice(&(v as u32).to_le_bytes()),
            ElementType::U64 => out.extend_from_slice(&(v as u64).to_le_bytes()),
            ElementType::F32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            ElementType::F64 => out.extend_from_slice(&(v as f64).to_le_bytes()),
            ElementType::I64 | ElementType::Str(_) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out
}

impl From<f64> for DataValue {
    fn from(v: f64) -> DataValue {
        DataValue::F64(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> DataValue {
        DataValue::I64(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> DataValue {
        DataValue::Str(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> DataValue {
        DataValue::Str(v)
    }
}

impl From<Vec<f64>> for DataValue {
    fn from(v: Vec<f64>) -> DataValue {
        DataValue::F64Seq(v)
    }
}

impl From<Vec<i64>> for DataValue {
    fn from(v: Vec<i64>) -> DataValue {
        DataValue::I64Seq(v)
    }
}

impl From<NdArray> for DataValue {
    fn from(v: NdArray) -> DataValue {
        DataValue::Array(v)
    }
}

/// Attribute values: small named annotations on groups and datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    F64(f64),
    I64(i64),
    String(String),
    F64Array(Vec<f64>),
    I64Array(Vec<i64>),
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> AttrValue {
        AttrValue::F64(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> AttrValue {
        AttrValue::I64(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> AttrValue {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> AttrValue {
        AttrValue::String(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> AttrValue {
        AttrValue::F64Array(v)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> AttrValue {
        AttrValue::I64Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_classifies_by_byte_length() {
        let v = DataValue::from("silicon");
        assert_eq!(v.kind(), ValueKind::Text { len: 7 });
        assert_eq!(v.shape(), Vec::<u64>::new());
        assert_eq!(v.element_type(), ElementType::Str(7));
    }

    #[test]
    fn sequence_classifies_as_one_dimensional() {
        let v = DataValue::from(vec![1.0, 0.0, 0.0]);
        assert_eq!(v.kind(), ValueKind::Sequence { len: 3 });
        assert_eq!(v.shape(), vec![3]);
    }

    #[test]
    fn bare_number_classifies_as_scalar() {
        assert_eq!(DataValue::F64(0.0).kind(), ValueKind::Scalar);
        assert_eq!(DataValue::I64(4096).kind(), ValueKind::Scalar);
        assert_eq!(DataValue::F64(0.0).shape(), Vec::<u64>::new());
    }

    #[test]
    fn array_keeps_its_own_shape() {
        let v = DataValue::from(NdArray::zeros(&[16, 1024, 2048], ElementType::I32));
        assert_eq!(v.kind(), ValueKind::Array { shape: vec![16, 1024, 2048] });
        assert_eq!(v.shape(), vec![16, 1024, 2048]);
        assert_eq!(v.element_type(), ElementType::I32);
    }

    #[test]
    fn empty_sequence_is_still_a_sequence() {
        let v = DataValue::F64Seq(Vec::new());
        assert_eq!(v.kind(), ValueKind::Sequence { len: 0 });
        assert_eq!(v.shape(), vec![0]);
    }

    #[test]
    fn zeros_payload_is_all_zero() {
        let a = NdArray::zeros(&[2, 3], ElementType::I32);
        assert_eq!(a.len(), 6);
        assert_eq!(a.data().len(), 24);
        assert!(a.data().iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "value count does not match shape")]
    fn from_f64_rejects_wrong_count() {
        NdArray::from_f64(&[2, 2], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn raw_bytes_little_endian() {
        let bytes = DataValue::F64(1.0).raw_bytes(ElementType::F64);
        assert_eq!(bytes, 1.0f64.to_le_bytes());

        let bytes = DataValue::from("pixel").raw_bytes(ElementType::Str(5));
        assert_eq!(bytes, b"pixel");

        let bytes = DataValue::I64Seq(vec![1, 1]).raw_bytes(ElementType::I64);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &1i64.to_le_bytes());
    }

    #[test]
    fn numeric_values_convert_to_requested_element_type() {
        let bytes = DataValue::F64Seq(vec![1.0, 2.0]).raw_bytes(ElementType::F32);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());

        let bytes = DataValue::I64(258).raw_bytes(ElementType::U16);
        assert_eq!(bytes, 258u16.to_le_bytes());
    }

    #[test]
    fn element_type_codes_round_trip() {
        for elem in [
            ElementType::I8,
            ElementType::U16,
            ElementType::I32,
            ElementType::U64,
            ElementType::F32,
            ElementType::F64,
            ElementType::Str(7),
        ] {
            assert_eq!(ElementType::parse(&elem.to_string()), Some(elem));
        }
        assert_eq!(ElementType::parse("complex128"), None);
    }
}
