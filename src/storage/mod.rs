pub mod format;
pub mod mmap;

use crate::error::Result;
use crate::node::Node;
use std::io::Write;
use std::path::Path;

pub use mmap::MmapLoader;

/// Seam between the eagerly materialized node array and the mmap-backed
/// lazy loader (spec.md 9: "small trait/interface ... consumed by the
/// query engine; both representations implement it"). Implementors must
/// be safe to share across the `rayon` worker pool during a search.
pub trait VectorSource: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn dim_value(&self, pos: usize, dim: usize) -> f32;
    fn get_node(&self, pos: usize) -> Node;
}

impl VectorSource for Vec<Node> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn dim_value(&self, pos: usize, dim: usize) -> f32 {
        self[pos].key[dim]
    }

    fn get_node(&self, pos: usize) -> Node {
        self[pos].clone()
    }
}

/// Write a complete container to `path`, atomically relative to readers:
/// the new content is written to a temp file in the same directory and
/// then renamed over the target (spec.md 4.6: "write to a temp file and
/// rename" as the recommended flush strategy).
pub fn write_collection_atomic(
    path: &Path,
    dims: u32,
    nodes: &[Node],
    compressed: bool,
) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("quiver")
    ));

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        write_collection(&mut file, dims, nodes, compressed)?;
        file.flush()?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write header, optional compression flag, and every node record in
/// insertion order to `w` (spec.md 4.2).
pub fn write_collection<W: Write>(
    w: &mut W,
    dims: u32,
    nodes: &[Node],
    compressed: bool,
) -> Result<()> {
    let header = format::Header {
        dimensions: dims,
        node_count: nodes.len() as u64,
    };
    w.write_all(&header.encode())?;

    if compressed {
        w.write_all(&[1u8])?;
    }

    let mut buf = Vec::new();
    for node in nodes {
        buf.clear();
        format::encode_node(node, compressed, &mut buf);
        w.write_all(&buf)?;
    }

    Ok(())
}
