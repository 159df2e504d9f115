use crate::codec::Quantizer;
use crate::error::{Error, Result};
use crate::node::{Metadata, Node, Timestamp};

pub const HEADER_LEN: usize = 12;

/// The 12-byte container header: dimensions then node count, both
/// little-endian, with no padding between them (spec.md 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub dimensions: u32,
    pub node_count: u64,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.dimensions.to_le_bytes());
        buf[4..12].copy_from_slice(&self.node_count.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Header> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Truncated("header"));
        }
        let dimensions = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let node_count = u64::from_le_bytes(buf[4..12].try_into().unwrap());
        Ok(Header { dimensions, node_count })
    }
}

/// Peek the single compression-flag byte right after the header. Per
/// spec.md 6: a byte equal to 1 marks the compressed variant and is
/// consumed; anything else (including no byte at all) means uncompressed
/// and the position is left unconsumed for the first node record to read.
/// Returns `(compressed, bytes_consumed)`.
pub fn probe_compression_flag(buf: &[u8]) -> (bool, usize) {
    match buf.first() {
        Some(1) => (true, 1),
        _ => (false, 0),
    }
}

pub fn encode_node(node: &Node, compressed: bool, out: &mut Vec<u8>) {
    if compressed {
        encode_node_compressed(node, out);
    } else {
        encode_node_uncompressed(node, out);
    }
}

fn encode_node_uncompressed(node: &Node, out: &mut Vec<u8>) {
    out.extend_from_slice(&(node.key.len() as u32).to_le_bytes());
    for &x in &node.key {
        out.extend_from_slice(&x.to_le_bytes());
    }
    encode_tail(node, out);
}

fn encode_node_compressed(node: &Node, out: &mut Vec<u8>) {
    let q = Quantizer::quantize(&node.key);
    out.extend_from_slice(&(node.key.len() as u32).to_le_bytes());
    out.extend_from_slice(&q.min.to_le_bytes());
    out.extend_from_slice(&q.max.to_le_bytes());
    out.extend_from_slice(&q.codes);
    encode_tail(node, out);
}

fn encode_tail(node: &Node, out: &mut Vec<u8>) {
    out.extend_from_slice(&(node.value.len() as u64).to_le_bytes());
    out.extend_from_slice(&node.value);

    let ts_bytes = node.timestamp.to_bytes();
    out.extend_from_slice(&(ts_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&ts_bytes);

    let meta_bytes = serde_json::to_vec(&node.metadata).unwrap_or_default();
    out.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&meta_bytes);
}

fn read_u32(buf: &[u8], pos: usize, what: &'static str) -> Result<(u32, usize)> {
    let end = pos.checked_add(4).ok_or(Error::Truncated(what))?;
    let slice = buf.get(pos..end).ok_or(Error::Truncated(what))?;
    Ok((u32::from_le_bytes(slice.try_into().unwrap()), end))
}

fn read_u64(buf: &[u8], pos: usize, what: &'static str) -> Result<(u64, usize)> {
    let end = pos.checked_add(8).ok_or(Error::Truncated(what))?;
    let slice = buf.get(pos..end).ok_or(Error::Truncated(what))?;
    Ok((u64::from_le_bytes(slice.try_into().unwrap()), end))
}

/// Optional trailing length-prefixed field: absent when the buffer ends
/// before the length prefix (spec.md 4.2 backward compatibility). Returns
/// `(bytes, next_pos)`.
fn read_optional_field(buf: &[u8], pos: usize, what: &'static str) -> Result<(Vec<u8>, usize)> {
    if pos + 4 > buf.len() {
        return Ok((Vec::new(), pos));
    }
    let (len, pos) = read_u32(buf, pos, what)?;
    let end = pos.checked_add(len as usize).ok_or(Error::Truncated(what))?;
    let bytes = buf.get(pos..end).ok_or(Error::Truncated(what))?.to_vec();
    Ok((bytes, end))
}

/// Decoded node plus the byte length of its record, given the expected
/// collection dimension and whether the container is the quantized variant.
pub fn decode_node(buf: &[u8], pos: usize, dims: u32, compressed: bool) -> Result<(Node, usize)> {
    let (per_node_dim, mut cursor) = read_u32(buf, pos, "per_node_dim")?;
    if per_node_dim != dims {
        return Err(Error::Corrupt(format!(
            "node declares dim {} but header declares {}",
            per_node_dim, dims
        )));
    }

    let key = if compressed {
        let min_end = cursor.checked_add(4).ok_or(Error::Truncated("min"))?;
        let min = f32::from_le_bytes(buf.get(cursor..min_end).ok_or(Error::Truncated("min"))?.try_into().unwrap());
        cursor = min_end;
        let max_end = cursor.checked_add(4).ok_or(Error::Truncated("max"))?;
        let max = f32::from_le_bytes(buf.get(cursor..max_end).ok_or(Error::Truncated("max"))?.try_into().unwrap());
        cursor = max_end;

        let codes_end = cursor.checked_add(per_node_dim as usize).ok_or(Error::Truncated("q_values"))?;
        let codes = buf.get(cursor..codes_end).ok_or(Error::Truncated("q_values"))?.to_vec();
        cursor = codes_end;

        let q = crate::codec::Quantized { codes, min, max };
        Quantizer::dequantize(&q)
    } else {
        let mut key = Vec::with_capacity(per_node_dim as usize);
        for _ in 0..per_node_dim {
            let end = cursor.checked_add(4).ok_or(Error::Truncated("key"))?;
            let v = f32::from_le_bytes(buf.get(cursor..end).ok_or(Error::Truncated("key"))?.try_into().unwrap());
            key.push(v);
            cursor = end;
        }
        key
    };

    let (value_len, c) = read_u64(buf, cursor, "value_len")?;
    cursor = c;
    let value_end = cursor.checked_add(value_len as usize).ok_or(Error::Truncated("value"))?;
    let value = buf.get(cursor..value_end).ok_or(Error::Truncated("value"))?.to_vec();
    cursor = value_end;

    let (ts_bytes, c) = read_optional_field(buf, cursor, "timestamp_len")?;
    cursor = c;
    let timestamp = Timestamp::from_bytes(&ts_bytes).unwrap_or(Timestamp(0));

    let (meta_bytes, c) = read_optional_field(buf, cursor, "metadata_len")?;
    cursor = c;
    let metadata: Metadata = if meta_bytes.is_empty() {
        Metadata::new()
    } else {
        serde_json::from_slice(&meta_bytes).map_err(|e| Error::Corrupt(e.to_string()))?
    };

    Ok((
        Node { key, value, timestamp, metadata },
        cursor - pos,
    ))
}
