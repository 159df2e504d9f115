use rayon::prelude::*;
use std::sync::RwLock;

use crate::storage::VectorSource;

/// Per-dimension sorted permutations over node positions (spec.md 4.4).
/// One `RwLock<Option<Vec<u32>>>` cell per dimension doubles as both the
/// eager rebuild target and the mmap-mode lazy-build cache: a cell left
/// empty after `mark_dirty` is simply rebuilt for every dimension at once
/// by `rebuild_all`, while under mmap mode cells are populated one at a
/// time by `get_or_build` the first time a dimension is scanned.
pub struct PermIndex {
    dims: usize,
    cells: Vec<RwLock<Option<Vec<u32>>>>,
    dirty: RwLock<bool>,
}

impl PermIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            cells: (0..dims).map(|_| RwLock::new(None)).collect(),
            dirty: RwLock::new(true),
        }
    }

    pub fn mark_dirty(&self) {
        *self.dirty.write().unwrap() = true;
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty.read().unwrap()
    }

    /// Full parallel rebuild across all dimensions (spec.md 4.4 "Rebuild
    /// (bulk)"), embarrassingly parallel via `rayon`.
    pub fn rebuild_all(&self, source: &dyn VectorSource) {
        let n = source.len();
        let built: Vec<Vec<u32>> = (0..self.dims)
            .into_par_iter()
            .map(|d| sort_dimension(source, d, n))
            .collect();
        for (d, perm) in built.into_iter().enumerate() {
            *self.cells[d].write().unwrap() = Some(perm);
        }
        *self.dirty.write().unwrap() = false;
    }

    pub fn ensure_built(&self, source: &dyn VectorSource) {
        if self.is_dirty() {
            self.rebuild_all(source);
        }
    }

    /// Build-on-first-access for dimension `d`, double-checked locking so
    /// concurrent readers racing to build the same dimension all observe
    /// the first completed build (spec.md 4.4 "Lazy per-dimension build").
    pub fn get_or_build(&self, d: usize, source: &dyn VectorSource) -> Vec<u32> {
        if let Some(perm) = self.cells[d].read().unwrap().as_ref() {
            return perm.clone();
        }
        let mut guard = self.cells[d].write().unwrap();
        if let Some(perm) = guard.as_ref() {
            return perm.clone();
        }
        let perm = sort_dimension(source, d, source.len());
        *guard = Some(perm.clone());
        perm
    }

    /// Splice the freshly appended node at `new_pos` into every
    /// dimension's cached permutation (spec.md 4.4 "Incremental insert").
    /// Only sound to call when `is_dirty()` is false; the facade is
    /// responsible for choosing this path only then.
    pub fn splice_insert(&self, source: &dyn VectorSource, new_pos: u32) {
        for d in 0..self.dims {
            let mut guard = self.cells[d].write().unwrap();
            if guard.is_none() {
                *guard = Some(sort_dimension(source, d, new_pos as usize));
            }
            let perm = guard.as_mut().unwrap();
            let key = source.dim_value(new_pos as usize, d);
            // The new node always has the largest position, so ties on
            // `key` must place it after every existing equal-key entry to
            // keep the (key, position) order from I2.
            let p = perm.partition_point(|&pos| source.dim_value(pos as usize, d) <= key);
            perm.insert(p, new_pos);
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self, d: usize) -> Option<Vec<u32>> {
        self.cells[d].read().unwrap().clone()
    }
}

fn sort_dimension(source: &dyn VectorSource, d: usize, n: usize) -> Vec<u32> {
    let mut perm: Vec<u32> = (0..n as u32).collect();
    perm.sort_by(|&a, &b| {
        let ka = source.dim_value(a as usize, d);
        let kb = source.dim_value(b as usize, d);
        ka.partial_cmp(&kb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn nodes(keys: &[f32]) -> Vec<Node> {
        keys.iter().map(|&k| Node::new(vec![k], Vec::new())).collect()
    }

    #[test]
    fn rebuild_all_sorts_by_key_then_position() {
        let data = nodes(&[3.0, 1.0, 1.0, 2.0]);
        let index = PermIndex::new(1);
        index.rebuild_all(&data);
        let perm = index.snapshot(0).unwrap();
        assert_eq!(perm, vec![1, 2, 3, 0]);
        assert!(!index.is_dirty());
    }

    #[test]
    fn get_or_build_caches_result() {
        let data = nodes(&[5.0, 2.0, 8.0]);
        let index = PermIndex::new(1);
        let first = index.get_or_build(0, &data);
        assert_eq!(first, vec![1, 0, 2]);
        assert_eq!(index.snapshot(0), Some(first));
    }

    #[test]
    fn splice_insert_places_new_node_in_order() {
        let mut data = nodes(&[1.0, 3.0, 5.0]);
        let index = PermIndex::new(1);
        index.rebuild_all(&data);
        data.push(Node::new(vec![4.0], Vec::new()));
        index.splice_insert(&data, 3);
        assert_eq!(index.snapshot(0).unwrap(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn splice_insert_breaks_ties_by_position_ascending() {
        let mut data = nodes(&[5.0, 5.0]);
        let index = PermIndex::new(1);
        index.rebuild_all(&data);
        data.push(Node::new(vec![5.0], Vec::new()));
        index.splice_insert(&data, 2);
        assert_eq!(index.snapshot(0).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn mark_dirty_forces_rebuild_on_ensure_built() {
        let data = nodes(&[2.0, 1.0]);
        let index = PermIndex::new(1);
        index.rebuild_all(&data);
        index.mark_dirty();
        assert!(index.is_dirty());
        index.ensure_built(&data);
        assert!(!index.is_dirty());
        assert_eq!(index.snapshot(0).unwrap(), vec![1, 0]);
    }
}
