//! Startup artifact handling: cache the pipeline file locally, then load it

use crate::artifact::store::create_store;
use crate::config::AppConfig;
use crate::models::{OnnxPipeline, PipelineHandle, RiskPipeline};
use anyhow::{Context, Result};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// What [`ensure_artifact`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// A file already existed at the local path; nothing was fetched
    AlreadyPresent,
    /// The object was downloaded and written to the local path
    Downloaded { bytes: usize },
}

/// Make sure the artifact exists at `local_path`, downloading `remote_key` if it does not.
///
/// The download is written to a sibling `.part` file and renamed into place,
/// so a failure never leaves a truncated artifact at `local_path`.
pub async fn ensure_artifact(
    store: &dyn ObjectStore,
    remote_key: &str,
    local_path: &Path,
) -> Result<ArtifactStatus> {
    if tokio::fs::try_exists(local_path).await.unwrap_or(false) {
        info!(path = %local_path.display(), "Pipeline already exists locally");
        return Ok(ArtifactStatus::AlreadyPresent);
    }

    info!(
        key = %remote_key,
        path = %local_path.display(),
        "Pipeline not found locally, downloading from artifact store"
    );

    let bytes = store
        .get(&ObjectPath::from(remote_key))
        .await
        .with_context(|| format!("Failed to fetch '{}' from artifact store", remote_key))?
        .bytes()
        .await
        .with_context(|| format!("Failed to read '{}' from artifact store", remote_key))?;

    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let partial = partial_path(local_path);
    tokio::fs::write(&partial, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    if let Err(e) = tokio::fs::rename(&partial, local_path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e).with_context(|| format!("Failed to move pipeline to {}", local_path.display()));
    }

    info!(key = %remote_key, bytes = bytes.len(), "Downloaded pipeline from artifact store");
    Ok(ArtifactStatus::Downloaded { bytes: bytes.len() })
}

fn partial_path(local_path: &Path) -> PathBuf {
    let mut name = local_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    local_path.with_file_name(name)
}

/// Cache and load the pipeline with an explicit store and loader.
///
/// Never fails: every error is logged and turned into
/// [`PipelineHandle::Unavailable`], so the service keeps serving `/` and
/// answers `/predict` with "Model not loaded".
pub async fn prepare_pipeline<P, F>(
    store: Result<Arc<dyn ObjectStore>>,
    remote_key: &str,
    local_path: &Path,
    load: F,
) -> PipelineHandle
where
    P: RiskPipeline + 'static,
    F: FnOnce(&Path) -> Result<P>,
{
    match store {
        Ok(store) => {
            if let Err(e) = ensure_artifact(store.as_ref(), remote_key, local_path).await {
                error!(error = %format!("{:#}", e), "Error downloading pipeline from artifact store");
            }
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Artifact store unavailable, skipping download");
        }
    }

    match load(local_path) {
        Ok(pipeline) => {
            info!(model = %pipeline.name(), "Pipeline (model + preprocessor) loaded successfully");
            PipelineHandle::available(pipeline)
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            error!(error = %reason, "Error loading pipeline");
            PipelineHandle::unavailable(reason)
        }
    }
}

/// Production startup path: configured store plus the ONNX loader
pub async fn bootstrap(config: &AppConfig) -> PipelineHandle {
    let storage = &config.storage;
    let model_config = config.model.clone();

    prepare_pipeline(
        create_store(storage),
        &storage.pipeline_filename,
        &storage.local_pipeline_path,
        move |path| OnnxPipeline::load(path, &model_config),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureRecord;
    use anyhow::anyhow;
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    struct FilePipeline {
        contents: String,
    }

    impl RiskPipeline for FilePipeline {
        fn name(&self) -> &str {
            &self.contents
        }

        fn predict_proba(&self, _record: &FeatureRecord) -> Result<f64> {
            Ok(0.5)
        }
    }

    fn read_pipeline(path: &Path) -> Result<FilePipeline> {
        Ok(FilePipeline {
            contents: std::fs::read_to_string(path)?,
        })
    }

    async fn store_with(key: &str, body: &'static [u8]) -> Arc<dyn ObjectStore> {
        let store = InMemory::new();
        store
            .put(&ObjectPath::from(key), PutPayload::from_static(body))
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_downloads_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("nested/pipeline.onnx");
        let store = store_with("models/pipeline.onnx", b"remote").await;

        let status = ensure_artifact(store.as_ref(), "models/pipeline.onnx", &local)
            .await
            .unwrap();

        assert_eq!(status, ArtifactStatus::Downloaded { bytes: 6 });
        assert_eq!(std::fs::read(&local).unwrap(), b"remote");
        assert!(!partial_path(&local).exists());
    }

    #[tokio::test]
    async fn test_existing_artifact_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        std::fs::write(&local, b"cached").unwrap();
        let store = store_with("pipeline.onnx", b"remote").await;

        let status = ensure_artifact(store.as_ref(), "pipeline.onnx", &local)
            .await
            .unwrap();

        assert_eq!(status, ArtifactStatus::AlreadyPresent);
        assert_eq!(std::fs::read(&local).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_missing_remote_object_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let result = ensure_artifact(store.as_ref(), "pipeline.onnx", &local).await;

        assert!(result.is_err());
        assert!(!local.exists());
        assert!(!partial_path(&local).exists());
    }

    #[tokio::test]
    async fn test_prepare_pipeline_loads_downloaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        let store = store_with("pipeline.onnx", b"fitted").await;

        let handle = prepare_pipeline(Ok(store), "pipeline.onnx", &local, read_pipeline).await;

        assert_eq!(handle.pipeline().map(|p| p.name()), Some("fitted"));
    }

    #[tokio::test]
    async fn test_prepare_pipeline_survives_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let handle = prepare_pipeline(Ok(store), "pipeline.onnx", &local, read_pipeline).await;

        assert!(!handle.is_available());
    }

    #[tokio::test]
    async fn test_prepare_pipeline_uses_cache_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        std::fs::write(&local, b"cached").unwrap();

        let handle = prepare_pipeline(
            Err(anyhow!("no credentials")),
            "pipeline.onnx",
            &local,
            read_pipeline,
        )
        .await;

        assert_eq!(handle.pipeline().map(|p| p.name()), Some("cached"));
    }

    #[tokio::test]
    async fn test_prepare_pipeline_reports_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("pipeline.onnx");
        std::fs::write(&local, b"corrupt").unwrap();

        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let handle = prepare_pipeline(Ok(store), "pipeline.onnx", &local, |_| {
            Err::<FilePipeline, _>(anyhow!("invalid protobuf"))
        })
        .await;

        match handle {
            PipelineHandle::Unavailable { reason } => assert!(reason.contains("invalid protobuf")),
            PipelineHandle::Available(_) => panic!("expected unavailable pipeline"),
        }
    }
}
