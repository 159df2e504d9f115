use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::filter::Filter;
use crate::index::PermIndex;
use crate::node::Node;
use crate::storage::VectorSource;

/// Run one exact nearest-neighbor search (spec.md 4.5). `index` must
/// already reflect `source` for every dimension the scan touches — the
/// facade is responsible for calling `PermIndex::ensure_built` ahead of
/// time (eager mode) or relying on `get_or_build`'s per-dimension laziness
/// (mmap mode); this function does the same `get_or_build` call either
/// way so a freshly rebuilt eager index is just a cache hit.
pub fn search(
    source: &dyn VectorSource,
    index: &PermIndex,
    query: &[f32],
    eps: f32,
    tau: f32,
    k: usize,
    filter: Option<&Filter>,
) -> Vec<(Node, f32)> {
    let dims = query.len();
    if source.len() == 0 || dims == 0 {
        return Vec::new();
    }

    let hits = discover_candidates(source, index, query, eps, dims);
    let admissible = eps * (dims as f32).sqrt() * (1.0 - tau);

    let mut admitted: Vec<(u32, Node, f32)> = hits
        .into_iter()
        .filter(|&(_, count)| count as usize == dims)
        .filter_map(|(pos, _)| {
            let node = source.get_node(pos as usize);
            if let Some(f) = filter {
                if !f.matches(&node) {
                    return None;
                }
            }
            let dist = euclidean(query, &node.key);
            if dist <= admissible {
                Some((pos, node, dist))
            } else {
                None
            }
        })
        .collect();

    admitted.sort_by(|a, b| {
        a.2.partial_cmp(&b.2)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    admitted.truncate(k);

    admitted.into_iter().map(|(_, node, dist)| (node, dist)).collect()
}

/// Per-dimension ε-interval scan in parallel, merging worker-local hit
/// counts into a shared accumulator under a mutex (spec.md 4.5.1). Merge
/// adds counts rather than taking a max, so a node present more than once
/// in a single dimension's interval (impossible here since permutations
/// are position-unique, but also true in general) still accumulates
/// correctly across dimensions.
fn discover_candidates(
    source: &dyn VectorSource,
    index: &PermIndex,
    query: &[f32],
    eps: f32,
    dims: usize,
) -> HashMap<u32, u32> {
    let shared: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());

    (0..dims).into_par_iter().for_each(|d| {
        let perm = index.get_or_build(d, source);
        let lo = query[d] - eps;
        let hi = query[d] + eps;

        let p_start = perm.partition_point(|&pos| source.dim_value(pos as usize, d) < lo);
        let p_end = perm.partition_point(|&pos| source.dim_value(pos as usize, d) <= hi);

        let mut local: HashMap<u32, u32> = HashMap::new();
        for &pos in &perm[p_start..p_end] {
            *local.entry(pos).or_insert(0) += 1;
        }

        let mut guard = shared.lock().unwrap();
        for (pos, count) in local {
            *guard.entry(pos).or_insert(0) += count;
        }
    });

    shared.into_inner().unwrap()
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
