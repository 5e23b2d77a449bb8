//! Pipeline artifact caching and startup loading

pub mod loader;
pub mod store;

pub use loader::{bootstrap, ensure_artifact, prepare_pipeline, ArtifactStatus};
pub use store::create_store;
