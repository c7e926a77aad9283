//! `ModelManager`: resolves, downloads and garbage-collects on-disk model
//! weights under the per-platform cache root (§6.4), and performs the
//! one-time legacy-tree migration.

use conduit_core::AIError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// The two model repositories this backend understands, each getting its own
/// subdirectory under the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRepoKind {
    Mlx,
    HuggingFace,
}

impl ModelRepoKind {
    fn dir_name(self) -> &'static str {
        match self {
            ModelRepoKind::Mlx => "mlx",
            ModelRepoKind::HuggingFace => "huggingface",
        }
    }
}

/// Manages the on-disk cache of downloaded model weights. Stateless beyond
/// its `http` client and cache root: every method recomputes paths from
/// `(kind, repo)` rather than holding a registry, so concurrent managers
/// pointed at the same root never disagree.
pub struct ModelManager {
    client: reqwest::Client,
    cache_root: PathBuf,
}

impl ModelManager {
    pub fn new() -> Self {
        ModelManager { client: reqwest::Client::new(), cache_root: default_cache_root() }
    }

    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        ModelManager { client: reqwest::Client::new(), cache_root: cache_root.into() }
    }

    /// Renames a legacy `.../SwiftAI/Models` tree to the current
    /// `.../Conduit/Models` location, once, if the legacy tree exists and the
    /// new one does not. Idempotent: a no-op on every call after the first.
    pub async fn migrate_legacy_cache(&self) -> Result<(), AIError> {
        let Some(base) = self.cache_root.parent().and_then(Path::parent) else { return Ok(()) };
        let legacy = base.join("SwiftAI").join("Models");
        if legacy.is_dir() && !self.cache_root.is_dir() {
            if let Some(parent) = self.cache_root.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AIError::GenerationFailed(format!("cache migration: {e}")))?;
            }
            tokio::fs::rename(&legacy, &self.cache_root)
                .await
                .map_err(|e| AIError::GenerationFailed(format!("cache migration: {e}")))?;
        }
        Ok(())
    }

    pub fn local_path(&self, kind: ModelRepoKind, repo: &str) -> PathBuf {
        self.cache_root.join(kind.dir_name()).join(repo)
    }

    pub fn is_cached(&self, kind: ModelRepoKind, repo: &str) -> bool {
        self.local_path(kind, repo).is_dir()
    }

    /// `HEAD`s `source_url` and returns its declared `Content-Length`, or
    /// `None` if the server doesn't report one.
    pub async fn estimate_download_size(&self, source_url: &str) -> Result<Option<u64>, AIError> {
        let response = self
            .client
            .head(source_url)
            .send()
            .await
            .map_err(|e| AIError::NetworkError(e.to_string()))?;
        Ok(response.content_length())
    }

    /// Downloads `source_url` into the cache under `(kind, repo)`, streaming
    /// to a `.part` sibling file and renaming atomically on success so a
    /// reader never observes a partially-written model.
    pub async fn download(&self, kind: ModelRepoKind, repo: &str, source_url: &str) -> Result<PathBuf, AIError> {
        self.download_validated(kind, repo, source_url, None).await
    }

    /// As `download`, additionally verifying the downloaded bytes' SHA-256
    /// digest against `expected_sha256` (lowercase hex) before the rename,
    /// failing the whole download rather than installing a corrupt file.
    pub async fn download_validated(
        &self,
        kind: ModelRepoKind,
        repo: &str,
        source_url: &str,
        expected_sha256: Option<&str>,
    ) -> Result<PathBuf, AIError> {
        use futures_util::StreamExt;

        let dest_dir = self.local_path(kind, repo);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| AIError::GenerationFailed(format!("creating model dir: {e}")))?;
        let filename = source_url.rsplit('/').next().unwrap_or("weights.bin");
        let dest = dest_dir.join(filename);
        let part = dest_dir.join(format!("{filename}.part"));

        let response = self.client.get(source_url).send().await.map_err(|e| AIError::NetworkError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AIError::from_status(response.status().as_u16(), "model download failed", None));
        }

        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| AIError::GenerationFailed(format!("creating part file: {e}")))?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AIError::NetworkError(e.to_string()))?;
            hasher.update(&chunk);
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
                .await
                .map_err(|e| AIError::GenerationFailed(format!("writing model bytes: {e}")))?;
        }
        drop(file);

        if let Some(expected) = expected_sha256 {
            let actual = hex_digest(&hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(AIError::GenerationFailed(format!(
                    "downloaded model digest mismatch: expected {expected}, got {actual}"
                )));
            }
        }

        tokio::fs::rename(&part, &dest).await.map_err(|e| AIError::GenerationFailed(format!("installing model: {e}")))?;
        Ok(dest)
    }

    /// Every repo directory currently on disk, across both repo kinds.
    pub async fn cached_models(&self) -> Result<Vec<PathBuf>, AIError> {
        let mut result = Vec::new();
        for kind in [ModelRepoKind::Mlx, ModelRepoKind::HuggingFace] {
            let dir = self.cache_root.join(kind.dir_name());
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else { continue };
            while let Some(entry) =
                entries.next_entry().await.map_err(|e| AIError::GenerationFailed(format!("listing cache: {e}")))?
            {
                if entry.path().is_dir() {
                    result.push(entry.path());
                }
            }
        }
        Ok(result)
    }

    /// Total bytes occupied by every cached model directory.
    pub async fn cache_size(&self) -> Result<u64, AIError> {
        let mut total = 0u64;
        for model_dir in self.cached_models().await? {
            total += dir_size(&model_dir).await?;
        }
        Ok(total)
    }

    /// Deletes the least-recently-modified cached models until total cache
    /// size is at or under `max_size` bytes.
    pub async fn evict_to_fit(&self, max_size: u64) -> Result<(), AIError> {
        let mut models = self.cached_models().await?;
        models.sort_by_key(|path| {
            std::fs::metadata(path).and_then(|m| m.modified()).unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });
        let mut total = self.cache_size().await?;
        for model_dir in models {
            if total <= max_size {
                break;
            }
            let size = dir_size(&model_dir).await?;
            tokio::fs::remove_dir_all(&model_dir)
                .await
                .map_err(|e| AIError::GenerationFailed(format!("evicting model: {e}")))?;
            total = total.saturating_sub(size);
        }
        Ok(())
    }

    pub async fn delete(&self, kind: ModelRepoKind, repo: &str) -> Result<(), AIError> {
        let path = self.local_path(kind, repo);
        if path.is_dir() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| AIError::GenerationFailed(format!("deleting model: {e}")))?;
        }
        Ok(())
    }

    pub async fn clear_cache(&self) -> Result<(), AIError> {
        for model_dir in self.cached_models().await? {
            tokio::fs::remove_dir_all(&model_dir)
                .await
                .map_err(|e| AIError::GenerationFailed(format!("clearing cache: {e}")))?;
        }
        Ok(())
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        ModelManager::new()
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("Conduit").join("Models")
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn dir_size(dir: &Path) -> Result<u64, AIError> {
    let mut total = 0u64;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| AIError::GenerationFailed(format!("measuring cache: {e}")))?;
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| AIError::GenerationFailed(format!("measuring cache: {e}")))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| AIError::GenerationFailed(format!("measuring cache: {e}")))?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_nests_under_the_repo_kind_directory() {
        let manager = ModelManager::with_cache_root("/tmp/conduit-test-cache");
        let path = manager.local_path(ModelRepoKind::Mlx, "org/model");
        assert_eq!(path, PathBuf::from("/tmp/conduit-test-cache/mlx/org/model"));
    }

    #[test]
    fn is_cached_is_false_for_a_nonexistent_directory() {
        let manager = ModelManager::with_cache_root("/tmp/conduit-test-cache-does-not-exist");
        assert!(!manager.is_cached(ModelRepoKind::HuggingFace, "org/model"));
    }

    #[tokio::test]
    async fn migrate_legacy_cache_renames_an_existing_legacy_tree() {
        let base = std::env::temp_dir().join(format!("conduit-migrate-test-{}", uuid::Uuid::new_v4()));
        let legacy = base.join("SwiftAI").join("Models");
        tokio::fs::create_dir_all(legacy.join("mlx")).await.unwrap();
        let new_root = base.join("Conduit").join("Models");
        let manager = ModelManager::with_cache_root(&new_root);

        manager.migrate_legacy_cache().await.unwrap();

        assert!(new_root.join("mlx").is_dir());
        assert!(!legacy.is_dir());
        tokio::fs::remove_dir_all(&base).await.ok();
    }

    #[tokio::test]
    async fn cache_size_sums_every_cached_model_directory() {
        let base = std::env::temp_dir().join(format!("conduit-size-test-{}", uuid::Uuid::new_v4()));
        let manager = ModelManager::with_cache_root(&base);
        let model_dir = manager.local_path(ModelRepoKind::Mlx, "org/model");
        tokio::fs::create_dir_all(&model_dir).await.unwrap();
        tokio::fs::write(model_dir.join("weights.bin"), vec![0u8; 128]).await.unwrap();

        assert_eq!(manager.cache_size().await.unwrap(), 128);
        tokio::fs::remove_dir_all(&base).await.ok();
    }
}
