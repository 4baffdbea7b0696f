//! Protobuf wire-format reading for the subset of ONNX `ModelProto` that
//! weight reconstruction needs: metadata properties and float initializers.
//!
//! Field numbers follow `onnx.proto3`:
//! - `ModelProto`: graph = 7, metadata_props = 14
//! - `GraphProto`: initializer = 5
//! - `TensorProto`: dims = 1, data_type = 2, float_data = 4, name = 8, raw_data = 9
//! - `StringStringEntryProto`: key = 1, value = 2

use std::collections::HashMap;

use log::debug;

use crate::model::ModelError;

const MODEL_GRAPH: u32 = 7;
const MODEL_METADATA_PROPS: u32 = 14;
const GRAPH_INITIALIZER: u32 = 5;
const TENSOR_DIMS: u32 = 1;
const TENSOR_DATA_TYPE: u32 = 2;
const TENSOR_FLOAT_DATA: u32 = 4;
const TENSOR_NAME: u32 = 8;
const TENSOR_RAW_DATA: u32 = 9;
const ENTRY_KEY: u32 = 1;
const ENTRY_VALUE: u32 = 2;

/// `TensorProto.DataType.FLOAT`
const DATA_TYPE_FLOAT: u64 = 1;

/// A decoded float tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData {
    pub dims: Vec<usize>,
    pub values: Vec<f32>,
}

/// Everything the reconstruction path reads out of an artifact.
#[derive(Debug, Default)]
pub struct RawModel {
    pub metadata: HashMap<String, String>,
    pub initializers: HashMap<String, TensorData>,
}

#[derive(Debug, Clone, Copy)]
enum Field<'a> {
    Varint(u64),
    Fixed64,
    Bytes(&'a [u8]),
    Fixed32(u32),
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_varint(&mut self) -> Result<u64, ModelError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self.buf.get(self.pos)
                .ok_or_else(|| malformed("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(malformed("varint longer than 10 bytes"))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ModelError> {
        let end = self.pos.checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| malformed("length-delimited field runs past end of buffer"))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn next_field(&mut self) -> Result<Option<(u32, Field<'a>)>, ModelError> {
        if self.is_empty() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let number = u32::try_from(key >> 3).map_err(|_| malformed("field number out of range"))?;
        let field = match key & 0x7 {
            0 => Field::Varint(self.read_varint()?),
            1 => {
                self.take(8)?;
                Field::Fixed64
            }
            2 => {
                let len = usize::try_from(self.read_varint()?)
                    .map_err(|_| malformed("length exceeds address space"))?;
                Field::Bytes(self.take(len)?)
            }
            5 => {
                let raw = self.take(4)?;
                Field::Fixed32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            wire_type => {
                return Err(malformed(&format!("unsupported wire type {} for field {}", wire_type, number)));
            }
        };
        Ok(Some((number, field)))
    }
}

fn malformed(message: &str) -> ModelError {
    ModelError::MalformedArtifact(message.to_string())
}

fn utf8(bytes: &[u8], what: &str) -> Result<String, ModelError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| malformed(&format!("{} is not valid UTF-8", what)))
}

/// Decodes the metadata properties and float initializers of an ONNX model.
pub fn parse_model(bytes: &[u8]) -> Result<RawModel, ModelError> {
    let mut model = RawModel::default();
    let mut reader = Reader::new(bytes);
    while let Some((number, field)) = reader.next_field()? {
        match (number, field) {
            (MODEL_GRAPH, Field::Bytes(graph)) => parse_graph(graph, &mut model.initializers)?,
            (MODEL_METADATA_PROPS, Field::Bytes(entry)) => {
                let (key, value) = parse_entry(entry)?;
                model.metadata.insert(key, value);
            }
            _ => {}
        }
    }
    Ok(model)
}

fn parse_graph(bytes: &[u8], initializers: &mut HashMap<String, TensorData>) -> Result<(), ModelError> {
    let mut reader = Reader::new(bytes);
    while let Some((number, field)) = reader.next_field()? {
        if let (GRAPH_INITIALIZER, Field::Bytes(tensor)) = (number, field) {
            if let Some((name, data)) = parse_tensor(tensor)? {
                initializers.insert(name, data);
            }
        }
    }
    Ok(())
}

fn parse_entry(bytes: &[u8]) -> Result<(String, String), ModelError> {
    let mut key = String::new();
    let mut value = String::new();
    let mut reader = Reader::new(bytes);
    while let Some((number, field)) = reader.next_field()? {
        match (number, field) {
            (ENTRY_KEY, Field::Bytes(raw)) => key = utf8(raw, "metadata key")?,
            (ENTRY_VALUE, Field::Bytes(raw)) => value = utf8(raw, "metadata value")?,
            _ => {}
        }
    }
    Ok((key, value))
}

/// Returns `None` for tensors that are not float32; only those can feed the reconstructed network.
fn parse_tensor(bytes: &[u8]) -> Result<Option<(String, TensorData)>, ModelError> {
    let mut dims = Vec::new();
    let mut data_type = 0u64;
    let mut name = String::new();
    let mut float_data = Vec::new();
    let mut raw_data: Option<&[u8]> = None;

    let mut reader = Reader::new(bytes);
    while let Some((number, field)) = reader.next_field()? {
        match (number, field) {
            (TENSOR_DIMS, Field::Varint(dim)) => dims.push(to_dim(dim)?),
            (TENSOR_DIMS, Field::Bytes(packed)) => {
                let mut packed = Reader::new(packed);
                while !packed.is_empty() {
                    dims.push(to_dim(packed.read_varint()?)?);
                }
            }
            (TENSOR_DATA_TYPE, Field::Varint(ty)) => data_type = ty,
            (TENSOR_FLOAT_DATA, Field::Fixed32(bits)) => float_data.push(f32::from_bits(bits)),
            (TENSOR_FLOAT_DATA, Field::Bytes(packed)) => float_data.extend(le_floats(packed)?),
            (TENSOR_NAME, Field::Bytes(raw)) => name = utf8(raw, "tensor name")?,
            (TENSOR_RAW_DATA, Field::Bytes(raw)) => raw_data = Some(raw),
            _ => {}
        }
    }

    if data_type != DATA_TYPE_FLOAT {
        debug!("Skipping initializer '{}' with data type {}", name, data_type);
        return Ok(None);
    }

    let values = match raw_data {
        Some(raw) => le_floats(raw)?,
        None => float_data,
    };
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| malformed(&format!("tensor '{}' dims {:?} overflow", name, dims)))?;
    if values.len() != expected {
        return Err(malformed(&format!(
            "tensor '{}' holds {} values but its dims {:?} need {}",
            name, values.len(), dims, expected
        )));
    }
    Ok(Some((name, TensorData { dims, values })))
}

fn to_dim(raw: u64) -> Result<usize, ModelError> {
    // int64 on the wire; a negative dim encodes as a huge u64
    i64::try_from(raw).ok()
        .and_then(|dim| usize::try_from(dim).ok())
        .ok_or_else(|| malformed("negative tensor dimension"))
}

fn le_floats(bytes: &[u8]) -> Result<Vec<f32>, ModelError> {
    if bytes.len() % 4 != 0 {
        return Err(malformed("float payload is not a multiple of 4 bytes"));
    }
    Ok(bytes.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Writers for hand-building artifacts in tests.
#[cfg(test)]
pub(crate) mod encode {
    fn varint(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    fn bytes_field(number: u32, payload: &[u8], out: &mut Vec<u8>) {
        varint(u64::from(number) << 3 | 2, out);
        varint(payload.len() as u64, out);
        out.extend_from_slice(payload);
    }

    fn varint_field(number: u32, value: u64, out: &mut Vec<u8>) {
        varint(u64::from(number) << 3, out);
        varint(value, out);
    }

    pub fn float_tensor(name: &str, dims: &[usize], values: &[f32]) -> Vec<u8> {
        let mut out = Vec::new();
        for &dim in dims {
            varint_field(super::TENSOR_DIMS, dim as u64, &mut out);
        }
        varint_field(super::TENSOR_DATA_TYPE, super::DATA_TYPE_FLOAT, &mut out);
        bytes_field(super::TENSOR_NAME, name.as_bytes(), &mut out);
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        bytes_field(super::TENSOR_RAW_DATA, &raw, &mut out);
        out
    }

    pub fn int64_tensor(name: &str, dims: &[usize]) -> Vec<u8> {
        let mut out = Vec::new();
        for &dim in dims {
            varint_field(super::TENSOR_DIMS, dim as u64, &mut out);
        }
        varint_field(super::TENSOR_DATA_TYPE, 7, &mut out);
        bytes_field(super::TENSOR_NAME, name.as_bytes(), &mut out);
        out
    }

    /// Builds a `ModelProto` with the given metadata properties and encoded initializers.
    pub fn model(metadata: &[(&str, &str)], tensors: &[Vec<u8>]) -> Vec<u8> {
        let mut graph = Vec::new();
        for tensor in tensors {
            bytes_field(super::GRAPH_INITIALIZER, tensor, &mut graph);
        }
        let mut out = Vec::new();
        // ir_version (field 1), ignored by the reader
        varint_field(1, 8, &mut out);
        bytes_field(super::MODEL_GRAPH, &graph, &mut out);
        for (key, value) in metadata {
            let mut entry = Vec::new();
            bytes_field(super::ENTRY_KEY, key.as_bytes(), &mut entry);
            bytes_field(super::ENTRY_VALUE, value.as_bytes(), &mut entry);
            bytes_field(super::MODEL_METADATA_PROPS, &entry, &mut out);
        }
        out
    }
}
