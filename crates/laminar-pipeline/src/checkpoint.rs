//! Execution-state checkpointing for crash recovery and resume.
//!
//! After each layer the orchestrator persists the full accumulated
//! [`ExecutionState`] as one snapshot (overwrite, not append). The write
//! goes to a temp file first and is renamed into place, so an operator
//! inspecting the state file mid-run never observes a partial write.

use std::path::{Path, PathBuf};

use laminar_types::{ExecutionState, LaminarError, Result};

/// Persists and restores [`ExecutionState`] snapshots.
pub struct StateCheckpointer {
    path: PathBuf,
}

impl StateCheckpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically write the snapshot: serialize to `<path>.tmp`, then
    /// rename over the target. Parent directories are created on demand.
    pub async fn save(&self, state: &ExecutionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), layers = state.layers.len(), "State checkpoint saved");
        Ok(())
    }

    /// Load the last snapshot. Returns `Ok(None)` when no state file exists.
    pub async fn load(&self) -> Result<Option<ExecutionState>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.path).await?;
        let state: ExecutionState = serde_json::from_str(&json).map_err(|e| {
            LaminarError::StateError {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Some(state))
    }

    /// Delete the snapshot, if present.
    pub async fn clear(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminar_types::LayerResult;

    fn sample_state() -> ExecutionState {
        let mut state = ExecutionState::new();
        state.record(LayerResult {
            layer_id: 1,
            layer_name: "build".into(),
            success: true,
            tools: vec![],
            duration_ms: 42,
            skipped_reason: None,
        });
        state
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("state.json"));

        cp.save(&sample_state()).await.unwrap();
        let loaded = cp.load().await.unwrap().unwrap();
        assert_eq!(loaded.layers.len(), 1);
        assert_eq!(loaded.layer(1).unwrap().layer_name, "build");
    }

    #[tokio::test]
    async fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("absent.json"));
        assert!(cp.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("nested/deeper/state.json"));
        cp.save(&sample_state()).await.unwrap();
        assert!(cp.path().exists());
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("state.json"));

        cp.save(&sample_state()).await.unwrap();

        let mut bigger = sample_state();
        bigger.record(LayerResult {
            layer_id: 2,
            layer_name: "test".into(),
            success: false,
            tools: vec![],
            duration_ms: 7,
            skipped_reason: None,
        });
        cp.save(&bigger).await.unwrap();

        let loaded = cp.load().await.unwrap().unwrap();
        assert_eq!(loaded.layers.len(), 2);
        assert!(!loaded.layer(2).unwrap().success);
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("state.json"));
        cp.save(&sample_state()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["state.json".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_state_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cp = StateCheckpointer::new(&path);
        let err = cp.load().await.unwrap_err();
        assert!(matches!(err, LaminarError::StateError { .. }));
    }

    #[tokio::test]
    async fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cp = StateCheckpointer::new(dir.path().join("state.json"));
        cp.save(&sample_state()).await.unwrap();
        assert!(cp.path().exists());

        cp.clear().await.unwrap();
        assert!(!cp.path().exists());
        // Clearing twice is fine.
        cp.clear().await.unwrap();
    }
}
