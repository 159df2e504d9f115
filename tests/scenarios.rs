use quiver::{Collection, CollectionConfig, Error, Filter, InsertItem, Metadata};
use serde_json::json;
use std::time::Instant;
use tempfile::tempdir;

fn cfg() -> CollectionConfig {
    CollectionConfig::default()
}

#[test]
fn scenario_a_tiny_3d_search() {
    let dir = tempdir().unwrap();
    let col = Collection::open(dir.path().join("a.qv"), 3, cfg()).unwrap();

    col.insert(vec![0.1, 0.2, 0.3], b"A".to_vec()).unwrap();
    col.insert(vec![0.1, 0.3, 0.2], b"B".to_vec()).unwrap();
    col.insert(vec![0.9, 0.1, 0.05], b"C".to_vec()).unwrap();

    let results = col.search(&[0.1, 0.25, 0.25], 0.2, 0.5, 2).unwrap();
    assert_eq!(results, vec![b"A".to_vec(), b"B".to_vec()]);
}

#[test]
fn scenario_b_epsilon_boundary() {
    let dir = tempdir().unwrap();
    let col = Collection::open(dir.path().join("b.qv"), 3, cfg()).unwrap();

    col.insert(vec![0.1, 0.2, 0.3], b"A".to_vec()).unwrap();
    col.insert(vec![0.1, 0.3, 0.2], b"B".to_vec()).unwrap();
    col.insert(vec![0.9, 0.1, 0.05], b"C".to_vec()).unwrap();

    let results = col.search(&[0.1, 0.2, 0.3], 0.0, 0.0, 5).unwrap();
    assert_eq!(results, vec![b"A".to_vec()]);
}

#[test]
fn scenario_c_metadata_filter() {
    let dir = tempdir().unwrap();
    let col = Collection::open(dir.path().join("c.qv"), 2, cfg()).unwrap();

    let mut meta_x = Metadata::new();
    meta_x.insert("cat".into(), json!("a"));
    let mut meta_y = Metadata::new();
    meta_y.insert("cat".into(), json!("b"));

    col.insert_with_metadata(vec![0.0, 0.0], b"x".to_vec(), meta_x).unwrap();
    col.insert_with_metadata(vec![0.0, 0.0], b"y".to_vec(), meta_y).unwrap();

    let filter = Filter::new().with_metadata("cat", json!("a"));
    let results = col.search_with_filter(&[0.0, 0.0], 0.1, 0.0, 5, Some(&filter)).unwrap();
    assert_eq!(results, vec![b"x".to_vec()]);
}

#[test]
fn scenario_d_persistence_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.qv");
    let col = Collection::open(&path, 8, cfg()).unwrap();

    let mut rng_state: u64 = 12345;
    let mut next = || {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
    };

    let items: Vec<InsertItem> = (0..10)
        .map(|i| {
            let key: Vec<f32> = (0..8).map(|_| next()).collect();
            InsertItem::new(key, format!("node-{i}").into_bytes())
        })
        .collect();

    col.batch_insert(items).unwrap();
    col.flush().unwrap();

    let query = vec![0.0f32; 8];
    let before = col.search(&query, 0.8, 0.1, 5).unwrap();

    let reopened = Collection::open(&path, 8, cfg()).unwrap();
    assert_eq!(reopened.node_count(), 10);
    let after = reopened.search(&query, 0.8, 0.1, 5).unwrap();

    assert_eq!(before, after);
}

#[test]
fn scenario_e_dimension_mismatch() {
    let dir = tempdir().unwrap();
    let col = Collection::open(dir.path().join("e.qv"), 4, cfg()).unwrap();

    let err = col.insert(vec![1.0, 2.0, 3.0], b"x".to_vec());
    assert!(matches!(err, Err(Error::DimensionMismatch { expected: 4, actual: 3 })));
    assert_eq!(col.node_count(), 0);
}

#[test]
fn scenario_f_mmap_lazy_open_is_fast() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f.qv");

    const DIMS: usize = 64;
    const N: usize = 2_000;

    let col = Collection::open(&path, DIMS as u32, cfg()).unwrap();
    let mut rng_state: u64 = 999;
    let mut next = || {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
    };

    let items: Vec<InsertItem> = (0..N)
        .map(|i| {
            let key: Vec<f32> = (0..DIMS).map(|_| next()).collect();
            InsertItem::new(key, format!("n{i}").into_bytes())
        })
        .collect();
    col.batch_insert(items).unwrap();
    col.flush().unwrap();
    drop(col);

    let query: Vec<f32> = (0..DIMS).map(|_| next()).collect();

    let eager_cfg = CollectionConfig { eager_index_on_open: true, ..cfg() };
    let eager_start = Instant::now();
    let eager = Collection::open(&path, DIMS as u32, eager_cfg).unwrap();
    eager.search(&query, 0.5, 0.2, 10).unwrap();
    let eager_total = eager_start.elapsed();

    let lazy_cfg = CollectionConfig { eager_index_on_open: false, ..cfg() };
    let lazy_start = Instant::now();
    let lazy = Collection::open(&path, DIMS as u32, lazy_cfg).unwrap();
    let results = lazy.search(&query, 0.5, 0.2, 10).unwrap();
    let lazy_total = lazy_start.elapsed();

    println!(
        "eager open+query: {eager_total:?}, lazy open+query: {lazy_total:?}, {} results",
        results.len()
    );
}
