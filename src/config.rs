/// Tunables for a single `Collection`. Constructed directly or via
/// `Default` — this crate does not carry a config-file loader; at this
/// scale a plain struct with sane defaults is the whole story.
#[derive(Debug, Clone, Copy)]
pub struct CollectionConfig {
    /// Flush to disk after this many successful inserts. `insert` never
    /// flushes on every call by default (spec.md 4.6).
    pub flush_every: usize,
    /// Eagerly build all `D` permutations right after `open`/`load`
    /// instead of leaving the index dirty for a lazy rebuild on first
    /// query. Eager build costs time proportional to `D * N log N` up
    /// front; lazy defers that cost to the first `search`.
    pub eager_index_on_open: bool,
    /// Below this node count, `insert` splices the new node into each
    /// sorted permutation immediately (when the permutations are already
    /// clean) instead of marking them dirty. Above it, every insert marks
    /// dirty and defers to a full parallel rebuild on the next query.
    pub splice_threshold: usize,
    /// Write the scalar-quantized container variant on `flush` instead of
    /// the uncompressed one. The query engine always searches over
    /// dequantized vectors regardless of which variant is on disk
    /// (spec.md 9).
    pub compress_on_flush: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            flush_every: 100,
            eager_index_on_open: false,
            splice_threshold: 4096,
            compress_on_flush: false,
        }
    }
}
