use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use wyckoff_models::AnalysisBatch;

#[derive(Error, Debug)]
#[error("sink error: {0}")]
pub struct SinkError(pub String);

/// Destination for completed batches. Persistence is best-effort; the
/// orchestrator returns the batch either way.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn persist(&self, batch: &AnalysisBatch) -> Result<(), SinkError>;
}

/// Writes each batch as a pretty-printed JSON file, one per analysis run.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, batch: &AnalysisBatch) -> PathBuf {
        let stamp = batch.generated_at.format("%Y%m%d_%H%M%S");
        self.dir
            .join(format!("wyckoff_analysis_{}_{stamp}.json", batch.subject))
    }
}

#[async_trait]
impl BatchSink for JsonFileSink {
    async fn persist(&self, batch: &AnalysisBatch) -> Result<(), SinkError> {
        let path = self.path_for(batch);
        let json = serde_json::to_string_pretty(batch)
            .map_err(|e| SinkError(format!("serialize failed: {e}")))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SinkError(format!("create {} failed: {e}", self.dir.display())))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| SinkError(format!("write {} failed: {e}", path.display())))?;

        info!(path = %path.display(), "Batch written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wyckoff_models::{AgentRecord, Consensus, Role, SubjectId};

    fn batch() -> AnalysisBatch {
        let subject: SubjectId = "300750".parse().unwrap();
        let records = Role::ALL
            .iter()
            .map(|role| AgentRecord::fallback(*role, "test", vec![]))
            .collect();
        AnalysisBatch::new(subject, records, Consensus::default())
    }

    #[tokio::test]
    async fn writes_readable_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let batch = batch();

        sink.persist(&batch).await.unwrap();

        let path = sink.path_for(&batch);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let back: AnalysisBatch = serde_json::from_str(&contents).unwrap();
        assert_eq!(back, batch);
    }

    #[tokio::test]
    async fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/batches");
        let sink = JsonFileSink::new(&nested);

        sink.persist(&batch()).await.unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn file_name_carries_subject_and_timestamp() {
        let sink = JsonFileSink::new(".");
        let batch = batch();
        let name = sink
            .path_for(&batch)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("wyckoff_analysis_300750_"), "{name}");
        assert!(name.ends_with(".json"), "{name}");
    }
}
