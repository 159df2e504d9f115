/// External collaborator that turns text into vectors. Implemented by
/// callers (HTTP clients to local or remote model servers); this crate
/// never implements or calls it — only the type is defined here as the
/// seam (spec.md 1, 6).
pub trait EmbeddingProvider {
    type Error: std::error::Error;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;
}
