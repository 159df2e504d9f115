use proptest::prelude::*;
use quiver::{Collection, CollectionConfig, InsertItem, Quantizer};
use tempfile::tempdir;

const DIM_RANGE: std::ops::Range<f32> = -100.0..100.0;

fn vector_strategy(dims: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(DIM_RANGE, dims)
}

proptest! {
    /// Quantization error bound (spec.md 8 property 4):
    /// ||dequantize(quantize(v)) - v||_2 / sqrt(D) <= (max(v) - min(v)) / 510.
    #[test]
    fn quantization_error_bound(v in vector_strategy(16)) {
        let q = Quantizer::quantize(&v);
        let back = Quantizer::dequantize(&q);

        let sq_err: f32 = v.iter().zip(back.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
        let l2 = sq_err.sqrt();
        let d = v.len() as f32;
        let bound = (q.max - q.min) / 510.0;

        prop_assert!(l2 / d.sqrt() <= bound + 1e-4);
    }

    /// Exact-recall (spec.md 8 property 6): the admitted set equals the
    /// set of positions whose true distance is within the admissible bound
    /// and whose every per-dimension difference is within eps.
    #[test]
    fn exact_recall_matches_brute_force(
        nodes in prop::collection::vec(vector_strategy(4), 1..30),
        query in vector_strategy(4),
        eps in 0.01f32..50.0,
        tau in 0.0f32..1.0,
    ) {
        let dir = tempdir().unwrap();
        let col = Collection::open(dir.path().join("c.qv"), 4, CollectionConfig::default()).unwrap();

        let items: Vec<InsertItem> = nodes
            .iter()
            .enumerate()
            .map(|(i, key)| InsertItem::new(key.clone(), i.to_string().into_bytes()))
            .collect();
        col.batch_insert(items).unwrap();

        let results = col.search(&query, eps, tau, nodes.len().max(1)).unwrap();
        let returned: std::collections::HashSet<usize> = results
            .iter()
            .map(|v| String::from_utf8(v.clone()).unwrap().parse().unwrap())
            .collect();

        let admissible = eps * (4f32).sqrt() * (1.0 - tau);
        let expected: std::collections::HashSet<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, key)| {
                key.iter().zip(query.iter()).all(|(a, b)| (a - b).abs() <= eps)
            })
            .filter(|(_, key)| {
                let dist: f32 = key.iter().zip(query.iter()).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt();
                dist <= admissible
            })
            .map(|(i, _)| i)
            .collect();

        prop_assert_eq!(returned, expected);
    }
}

/// Sequential reference scan used only to check the parallel query engine
/// against a non-parallel baseline (spec.md 8 property 5).
fn sequential_search(
    nodes: &[Vec<f32>],
    values: &[Vec<u8>],
    query: &[f32],
    eps: f32,
    tau: f32,
    k: usize,
) -> Vec<Vec<u8>> {
    let dims = query.len();
    let admissible = eps * (dims as f32).sqrt() * (1.0 - tau);

    let mut admitted: Vec<(usize, f32)> = nodes
        .iter()
        .enumerate()
        .filter(|(_, key)| key.iter().zip(query.iter()).all(|(a, b)| (a - b).abs() <= eps))
        .filter_map(|(i, key)| {
            let dist: f32 = key
                .iter()
                .zip(query.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt();
            (dist <= admissible).then_some((i, dist))
        })
        .collect();

    admitted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
    admitted.truncate(k);
    admitted.into_iter().map(|(i, _)| values[i].clone()).collect()
}

proptest! {
    #[test]
    fn parallel_matches_sequential(
        nodes in prop::collection::vec(vector_strategy(5), 1..40),
        query in vector_strategy(5),
        eps in 0.01f32..60.0,
        tau in 0.0f32..1.0,
    ) {
        let dir = tempdir().unwrap();
        let col = Collection::open(dir.path().join("c.qv"), 5, CollectionConfig::default()).unwrap();

        let values: Vec<Vec<u8>> = (0..nodes.len()).map(|i| i.to_string().into_bytes()).collect();
        let items: Vec<InsertItem> = nodes
            .iter()
            .zip(values.iter())
            .map(|(key, value)| InsertItem::new(key.clone(), value.clone()))
            .collect();
        col.batch_insert(items).unwrap();

        let parallel = col.search(&query, eps, tau, nodes.len()).unwrap();
        let sequential = sequential_search(&nodes, &values, &query, eps, tau, nodes.len());

        prop_assert_eq!(parallel, sequential);
    }
}
