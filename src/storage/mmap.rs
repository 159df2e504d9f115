use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use super::format::{self, HEADER_LEN};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::storage::VectorSource;

/// Read-only, memory-mapped view of a container file. Opening costs time
/// proportional to node count (building the offset table), never to the
/// size of the vector payloads (spec.md 4.3).
pub struct MmapLoader {
    mmap: Mmap,
    _file: File,
    dimensions: u32,
    compressed: bool,
    /// Byte offset of each node record, relative to the start of the file.
    offsets: Vec<u64>,
}

impl MmapLoader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        warmup(&mmap);

        let header = format::Header::decode(&mmap)?;
        let (compressed, flag_len) =
            format::probe_compression_flag(&mmap[HEADER_LEN..]);
        let body_start = HEADER_LEN + flag_len;

        let mut offsets = Vec::with_capacity(header.node_count as usize);
        let mut pos = body_start;
        for _ in 0..header.node_count {
            offsets.push(pos as u64);
            let len = skip_node(&mmap, pos, header.dimensions, compressed)?;
            pos += len;
        }

        Ok(MmapLoader {
            mmap,
            _file: file,
            dimensions: header.dimensions,
            compressed,
            offsets,
        })
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len()
    }
}

/// Best-effort prefetch hint, not part of the spec's contract: advise the
/// kernel the whole mapping will be read soon and fault pages in ahead of
/// the offset-table pass. Never observable by callers beyond timing.
#[cfg(unix)]
fn warmup(mmap: &Mmap) {
    unsafe {
        let ptr = mmap.as_ptr();
        let len = mmap.len();
        libc::madvise(ptr as *mut _, len, libc::MADV_WILLNEED);
    }
}

#[cfg(not(unix))]
fn warmup(_mmap: &Mmap) {}

/// Forward-only pass over a single node's framing fields: advances past the
/// key/value/metadata bytes without allocating or materializing them.
/// Used solely to build the offset table (spec.md 4.3 step 3).
fn skip_node(buf: &[u8], pos: usize, dims: u32, compressed: bool) -> Result<usize> {
    let start = pos;
    let per_node_dim = read_u32_at(buf, pos)?;
    if per_node_dim != dims {
        return Err(Error::Corrupt(format!(
            "node declares dim {} but header declares {}",
            per_node_dim, dims
        )));
    }
    let mut cursor = pos + 4;

    if compressed {
        cursor += 8; // min, max
        cursor = cursor
            .checked_add(per_node_dim as usize)
            .ok_or(Error::Truncated("q_values"))?;
    } else {
        cursor = cursor
            .checked_add(per_node_dim as usize * 4)
            .ok_or(Error::Truncated("key"))?;
    }

    let value_len = read_u64_at(buf, cursor)?;
    cursor += 8;
    cursor = cursor
        .checked_add(value_len as usize)
        .ok_or(Error::Truncated("value"))?;

    cursor = skip_optional_field(buf, cursor)?;
    cursor = skip_optional_field(buf, cursor)?;

    Ok(cursor - start)
}

fn skip_optional_field(buf: &[u8], pos: usize) -> Result<usize> {
    if pos + 4 > buf.len() {
        return Ok(pos);
    }
    let len = read_u32_at(buf, pos)?;
    let end = (pos + 4)
        .checked_add(len as usize)
        .ok_or(Error::Truncated("optional field"))?;
    if end > buf.len() {
        return Err(Error::Truncated("optional field"));
    }
    Ok(end)
}

fn read_u32_at(buf: &[u8], pos: usize) -> Result<u32> {
    let end = pos.checked_add(4).ok_or(Error::Truncated("u32"))?;
    let slice = buf.get(pos..end).ok_or(Error::Truncated("u32"))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_u64_at(buf: &[u8], pos: usize) -> Result<u64> {
    let end = pos.checked_add(8).ok_or(Error::Truncated("u64"))?;
    let slice = buf.get(pos..end).ok_or(Error::Truncated("u64"))?;
    Ok(u64::from_le_bytes(slice.try_into().unwrap()))
}

impl VectorSource for MmapLoader {
    fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Direct read of dimension `d` of node `i` without decoding the rest
    /// of the record (spec.md 4.3 "Random access"). For the compressed
    /// variant there is no raw float to read directly, so the single code
    /// byte is dequantized using the record's own min/max.
    fn dim_value(&self, pos: usize, dim: usize) -> f32 {
        let offset = self.offsets[pos] as usize;
        if self.compressed {
            let min_pos = offset + 4;
            let max_pos = offset + 8;
            let min = f32::from_le_bytes(self.mmap[min_pos..min_pos + 4].try_into().unwrap());
            let max = f32::from_le_bytes(self.mmap[max_pos..max_pos + 4].try_into().unwrap());
            let code_pos = offset + 12 + dim;
            let code = self.mmap[code_pos];
            if max == min {
                min
            } else {
                min + code as f32 * (max - min) / 255.0
            }
        } else {
            let value_pos = offset + 4 + dim * 4;
            f32::from_le_bytes(self.mmap[value_pos..value_pos + 4].try_into().unwrap())
        }
    }

    fn get_node(&self, pos: usize) -> Node {
        let offset = self.offsets[pos] as usize;
        format::decode_node(&self.mmap, offset, self.dimensions, self.compressed)
            .expect("offset table entry must decode: built from the same file")
            .0
    }
}
