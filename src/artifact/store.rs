//! Object store construction for the artifact bucket

use crate::config::{StorageConfig, StorageProvider};
use anyhow::{anyhow, Context, Result};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Build the store holding the pipeline artifact.
///
/// GCS credentials come from the standard `GOOGLE_*` environment variables.
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.provider {
        StorageProvider::Gcs => {
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(&config.bucket_name)
                .build()
                .map_err(|e| anyhow!("Failed to build GCS store: {}", e))?;
            info!(bucket = %config.bucket_name, "Using Google Cloud Storage");
            Ok(Arc::new(store))
        }
        StorageProvider::Local => {
            let root = config
                .local_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&config.bucket_name);
            std::fs::create_dir_all(&root)
                .with_context(|| format!("Failed to create local bucket {}", root.display()))?;
            let store = LocalFileSystem::new_with_prefix(&root)
                .with_context(|| format!("Failed to open local bucket {}", root.display()))?;
            info!(root = %root.display(), "Using local directory as bucket");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::path::Path as ObjectPath;

    fn local_config(root: PathBuf) -> StorageConfig {
        StorageConfig {
            provider: StorageProvider::Local,
            bucket_name: "models".to_string(),
            pipeline_filename: "pipeline.onnx".to_string(),
            local_pipeline_path: root.join("cache.onnx"),
            local_root: Some(root),
        }
    }

    #[tokio::test]
    async fn test_local_bucket_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/pipeline.onnx"), b"onnx").unwrap();

        let store = create_store(&local_config(dir.path().to_path_buf())).unwrap();
        let bytes = store
            .get(&ObjectPath::from("pipeline.onnx"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();

        assert_eq!(bytes.as_ref(), b"onnx");
    }

    #[test]
    fn test_local_bucket_is_created() {
        let dir = tempfile::tempdir().unwrap();
        create_store(&local_config(dir.path().to_path_buf())).unwrap();
        assert!(dir.path().join("models").is_dir());
    }
}
