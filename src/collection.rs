use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, instrument};

use crate::config::CollectionConfig;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::index::PermIndex;
use crate::node::{InsertItem, Metadata, Node};
use crate::query;
use crate::storage::{self, MmapLoader, VectorSource};

enum Storage {
    Eager(Vec<Node>),
    Mmap(MmapLoader),
}

impl Storage {
    fn len(&self) -> usize {
        match self {
            Storage::Eager(nodes) => nodes.len(),
            Storage::Mmap(loader) => loader.node_count(),
        }
    }

    fn as_source(&self) -> &dyn VectorSource {
        match self {
            Storage::Eager(nodes) => nodes,
            Storage::Mmap(loader) => loader,
        }
    }

    fn materialize(&mut self) -> &mut Vec<Node> {
        if let Storage::Mmap(loader) = self {
            let nodes = (0..loader.node_count()).map(|i| loader.get_node(i)).collect();
            *self = Storage::Eager(nodes);
        }
        match self {
            Storage::Eager(nodes) => nodes,
            Storage::Mmap(_) => unreachable!(),
        }
    }

    fn snapshot_nodes(&self) -> Vec<Node> {
        match self {
            Storage::Eager(nodes) => nodes.clone(),
            Storage::Mmap(loader) => (0..loader.node_count()).map(|i| loader.get_node(i)).collect(),
        }
    }
}

/// Owns a node array plus its per-dimension index, bound to a single file
/// path (spec.md 4.6). Readers (searches) run concurrently with each
/// other; mutation (`insert`, `batch_insert`, `flush`) is exclusive.
pub struct Collection {
    path: PathBuf,
    dimensions: u32,
    storage: RwLock<Storage>,
    index: PermIndex,
    config: CollectionConfig,
    inserts_since_flush: RwLock<usize>,
}

impl Collection {
    /// Open a collection file, or initialize an empty one with `declared_d`
    /// dimensions if the file does not exist. A non-zero `declared_d` that
    /// conflicts with the file's own header is a `DimensionMismatch`
    /// (spec.md 4.6).
    #[instrument(skip(path, config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, declared_d: u32, config: CollectionConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let exists_nonempty = std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let (storage, dimensions) = if exists_nonempty {
            let loader = MmapLoader::open(&path)?;
            if declared_d != 0 && declared_d != loader.dimensions() {
                return Err(Error::DimensionMismatch {
                    expected: declared_d as usize,
                    actual: loader.dimensions() as usize,
                });
            }
            let dims = loader.dimensions();
            (Storage::Mmap(loader), dims)
        } else {
            if declared_d == 0 {
                return Err(Error::InvalidArgument("dimensions must be positive".into()));
            }
            (Storage::Eager(Vec::new()), declared_d)
        };

        let index = PermIndex::new(dimensions as usize);
        if config.eager_index_on_open {
            index.rebuild_all(storage.as_source());
        }

        info!(dimensions, node_count = storage.len(), "collection opened");

        Ok(Self {
            path,
            dimensions,
            storage: RwLock::new(storage),
            index,
            config,
            inserts_since_flush: RwLock::new(0),
        })
    }

    pub fn insert(&self, key: Vec<f32>, value: Vec<u8>) -> Result<()> {
        self.insert_with_metadata(key, value, Metadata::new())
    }

    #[instrument(skip(self, key, value, metadata), fields(dims = key.len()))]
    pub fn insert_with_metadata(
        &self,
        key: Vec<f32>,
        value: Vec<u8>,
        metadata: Metadata,
    ) -> Result<()> {
        if key.len() != self.dimensions as usize {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions as usize,
                actual: key.len(),
            });
        }

        let mut storage = self.storage.write().unwrap();
        let nodes = storage.materialize();
        let new_pos = nodes.len() as u32;
        nodes.push(Node::with_metadata(key, value, metadata));

        if !self.index.is_dirty() && (new_pos as usize) < self.config.splice_threshold {
            self.index.splice_insert(&*nodes, new_pos);
        } else {
            self.index.mark_dirty();
        }
        drop(storage);

        debug!(position = new_pos, "node inserted");
        self.maybe_flush(1)?;
        Ok(())
    }

    /// Validate every item's dimension before mutating anything; append
    /// all, then rebuild every permutation exactly once (spec.md 4.4
    /// "Batch insert", 4.6 "batch_insert").
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub fn batch_insert(&self, items: Vec<InsertItem>) -> Result<()> {
        for item in &items {
            if item.key.len() != self.dimensions as usize {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions as usize,
                    actual: item.key.len(),
                });
            }
        }

        let mut storage = self.storage.write().unwrap();
        let nodes = storage.materialize();
        let count = items.len();
        for item in items {
            nodes.push(Node::with_metadata(item.key, item.value, item.metadata));
        }
        self.index.rebuild_all(&*nodes);
        drop(storage);

        info!(count, "batch insert complete");
        self.maybe_flush(count)?;
        Ok(())
    }

    pub fn search(
        &self,
        key: &[f32],
        eps: f32,
        tau: f32,
        k: usize,
    ) -> Result<Vec<Vec<u8>>> {
        self.search_with_filter(key, eps, tau, k, None)
    }

    #[instrument(skip(self, key, filter), fields(eps, tau, k))]
    pub fn search_with_filter(
        &self,
        key: &[f32],
        eps: f32,
        tau: f32,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Vec<u8>>> {
        if key.len() != self.dimensions as usize {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions as usize,
                actual: key.len(),
            });
        }
        if eps < 0.0 {
            return Err(Error::InvalidArgument("epsilon must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&tau) {
            return Err(Error::InvalidArgument("tau must be within [0, 1]".into()));
        }
        if k < 1 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }

        let storage = self.storage.read().unwrap();
        if let Storage::Eager(_) = *storage {
            self.index.ensure_built(storage.as_source());
        }

        let results = query::search(storage.as_source(), &self.index, key, eps, tau, k, filter);
        debug!(admitted = results.len(), "search complete");
        Ok(results.into_iter().map(|(node, _dist)| node.value).collect())
    }

    /// Write the current state to disk atomically relative to readers
    /// (spec.md 4.6 "flush"). A successful flush leaves a complete,
    /// readable file; a crash mid-write leaves the previous file intact
    /// because the new content lands in a temp file first.
    #[instrument(skip(self))]
    pub fn flush(&self) -> Result<()> {
        let storage = self.storage.write().unwrap();
        let nodes = storage.snapshot_nodes();
        storage::write_collection_atomic(&self.path, self.dimensions, &nodes, self.config.compress_on_flush)?;
        *self.inserts_since_flush.write().unwrap() = 0;
        info!(node_count = nodes.len(), "flushed");
        Ok(())
    }

    fn maybe_flush(&self, delta: usize) -> Result<()> {
        let mut count = self.inserts_since_flush.write().unwrap();
        *count += delta;
        if *count >= self.config.flush_every {
            drop(count);
            self.flush()?;
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.storage.read().unwrap().len()
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }
}
