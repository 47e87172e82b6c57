//! Durable artifact store backed by a newline-delimited JSON journal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use guard_primitives::BoardId;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::StoreResult;
use crate::record::{ArtifactKind, ArtifactRecord, ArtifactRef};
use crate::store::{ArtifactIndex, ArtifactStore};

/// Fix applied to a journal whose last line lacks its newline.
enum Repair {
    Intact,
    /// The last record is whole; only the newline is missing.
    Terminate,
    /// The last line is a partial record; cut the file back to this length.
    Truncate(u64),
}

struct JournalState {
    file: File,
    index: ArtifactIndex,
}

/// File-backed store appending one JSON record per line.
///
/// Existing records are replayed into memory when the journal is opened;
/// the uniqueness check and the append happen under one lock.
pub struct FileArtifactStore {
    path: PathBuf,
    state: Mutex<JournalState>,
}

impl FileArtifactStore {
    /// Opens (or creates) a journal file at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialization errors encountered while preparing the
    /// file or replaying existing records.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut index = ArtifactIndex::default();
        let mut replayed = 0_usize;
        let mut repair = Repair::Intact;
        if fs::try_exists(&path).await? {
            let data = fs::read(&path).await?;
            let complete = data.iter().rposition(|byte| *byte == b'\n').map_or(0, |at| at + 1);
            let (lines, tail) = data.split_at(complete);
            for chunk in lines
                .split(|byte| *byte == b'\n')
                .filter(|chunk| !chunk.is_empty())
            {
                let record: ArtifactRecord = serde_json::from_slice(chunk)?;
                index.insert(record);
                replayed += 1;
            }
            if !tail.is_empty() {
                match serde_json::from_slice::<ArtifactRecord>(tail) {
                    Ok(record) => {
                        index.insert(record);
                        replayed += 1;
                        repair = Repair::Terminate;
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            bytes = tail.len(),
                            error = %err,
                            "discarding torn journal tail"
                        );
                        repair = Repair::Truncate(complete as u64);
                    }
                }
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        match repair {
            Repair::Intact => {}
            Repair::Terminate => {
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
            Repair::Truncate(len) => file.set_len(len).await?,
        }

        debug!(path = %path.display(), replayed, "artifact journal opened");
        Ok(Self {
            path,
            state: Mutex::new(JournalState { file, index }),
        })
    }

    /// Returns the underlying path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn write(&self, record: ArtifactRecord) -> StoreResult<ArtifactRef> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        let mut guard = self.state.lock().await;
        guard.index.ensure_unique(&record)?;
        guard.file.write_all(&line).await?;
        guard.file.flush().await?;

        let reference = record.reference();
        debug!(board_id = %record.board_id(), kind = %record.kind(), %reference, "artifact appended");
        guard.index.insert(record);
        Ok(reference)
    }

    async fn latest(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
    ) -> StoreResult<Option<ArtifactRecord>> {
        Ok(self.state.lock().await.index.latest(board_id, kind).cloned())
    }

    async fn find(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
        key: &str,
    ) -> StoreResult<Option<ArtifactRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .index
            .find(board_id, kind, key)
            .cloned())
    }

    async fn list(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
    ) -> StoreResult<Vec<ArtifactRecord>> {
        Ok(self.state.lock().await.index.list(board_id, kind))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn temp_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("guard-journal-{}", Uuid::new_v4()));
        path.push("state.jsonl");
        path
    }

    fn board() -> BoardId {
        BoardId::new("board-a").unwrap()
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let path = temp_path();
        {
            let store = FileArtifactStore::open(&path).await.unwrap();
            for (key, n) in [("k1", 1), ("k2", 2)] {
                let record = ArtifactRecord::builder(board(), ArtifactKind::Decision, json!({ "n": n }))
                    .key(key)
                    .unwrap()
                    .build()
                    .unwrap();
                store.write(record).await.unwrap();
            }
        }

        let store = FileArtifactStore::open(&path).await.unwrap();
        let found = store
            .find(&board(), ArtifactKind::Decision, "k1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.payload()["n"], 1);
        let latest = store
            .latest(&board(), ArtifactKind::Decision)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.payload()["n"], 2);

        let duplicate = ArtifactRecord::builder(board(), ArtifactKind::Decision, json!({}))
            .key("k2")
            .unwrap()
            .build()
            .unwrap();
        assert!(store.write(duplicate).await.unwrap_err().is_conflict());

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    fn keyed(key: &str, n: u32) -> ArtifactRecord {
        ArtifactRecord::builder(board(), ArtifactKind::Decision, json!({ "n": n }))
            .key(key)
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn torn_tail_is_discarded_and_later_appends_stay_readable() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let whole = serde_json::to_string(&keyed("k1", 1)).unwrap();
        let torn = serde_json::to_string(&keyed("k2", 2)).unwrap();
        std::fs::write(&path, format!("{whole}\n{}", &torn[..torn.len() / 2])).unwrap();

        {
            let store = FileArtifactStore::open(&path).await.unwrap();
            assert!(store.find(&board(), ArtifactKind::Decision, "k2").await.unwrap().is_none());
            store.write(keyed("k3", 3)).await.unwrap();
        }

        let store = FileArtifactStore::open(&path).await.unwrap();
        let keys: Vec<_> = store
            .list(&board(), ArtifactKind::Decision)
            .await
            .unwrap()
            .iter()
            .map(|record| record.key().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(keys, ["k1", "k3"]);
        assert!(std::fs::read_to_string(&path).unwrap().ends_with('\n'));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn unterminated_whole_record_is_kept() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(&keyed("k1", 1)).unwrap()).unwrap();

        {
            let store = FileArtifactStore::open(&path).await.unwrap();
            store.write(keyed("k2", 2)).await.unwrap();
        }

        let store = FileArtifactStore::open(&path).await.unwrap();
        assert_eq!(store.list(&board(), ArtifactKind::Decision).await.unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
