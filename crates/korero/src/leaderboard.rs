//! High-score table.
//!
//! Keeps the best [`MAX_ENTRIES`] scores, highest first, with ties going
//! to whoever got there earlier. Initials are exactly three uppercase
//! ASCII letters and must not spell anything on [`BLOCKED_INITIALS`].
//!
//! When a path is configured the table is loaded from it at startup and
//! rewritten after every accepted submission. One background writer
//! task owns the file: it is handed the newest encoded table over a
//! `watch` channel, so writes never overlap and a burst of submissions
//! collapses into writing the last one. Each write goes to a sibling
//! temp file that is then renamed over the table. A failed write is
//! logged and the in-memory table stays authoritative.

use std::io;
use std::path::{Path, PathBuf};

use korero_protocol::LeaderboardEntry;
use time::OffsetDateTime;
use tokio::sync::watch;

pub const MAX_ENTRIES: usize = 100;

/// Three-letter combinations that are never shown on the board.
pub const BLOCKED_INITIALS: &[&str] = &[
    "ASS", "CUM", "COK", "DIC", "DIK", "FAG", "FCK", "FUC", "FUK", "FUX", "GAY", "JIZ", "KKK",
    "KYS", "NIG", "PIS", "POO", "SEX", "SHT", "SUK", "TIT", "VAG", "WTF", "XXX",
];

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("initials must be exactly three uppercase letters, got {0:?}")]
    InvalidInitials(String),

    #[error("initials {0:?} are not allowed")]
    Blocked(String),

    #[error("leaderboard file: {0}")]
    Io(#[from] io::Error),

    #[error("leaderboard file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Checks `initials` against the format and the block list.
pub fn validate_initials(initials: &str) -> Result<(), LeaderboardError> {
    let well_formed =
        initials.len() == 3 && initials.bytes().all(|b| b.is_ascii_uppercase());
    if !well_formed {
        return Err(LeaderboardError::InvalidInitials(initials.to_string()));
    }
    if BLOCKED_INITIALS.contains(&initials) {
        return Err(LeaderboardError::Blocked(initials.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    /// Sorted by score descending, then `achieved_at` ascending.
    entries: Vec<LeaderboardEntry>,
    path: Option<PathBuf>,
    /// Started by the first [`persist`](Leaderboard::persist).
    writer: Option<watch::Sender<Vec<u8>>>,
}

impl Leaderboard {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the table stored at `path`. A missing file is an empty
    /// table; later writes will create it.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LeaderboardError> {
        let path = path.into();
        let mut entries: Vec<LeaderboardEntry> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.achieved_at.cmp(&b.achieved_at))
        });
        entries.truncate(MAX_ENTRIES);
        tracing::info!(path = %path.display(), entries = entries.len(), "leaderboard loaded");
        Ok(Self {
            entries,
            path: Some(path),
            writer: None,
        })
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records a score. Returns its 1-based rank, or `None` if it did
    /// not make the board.
    pub fn submit(
        &mut self,
        initials: &str,
        score: u32,
        achieved_at: OffsetDateTime,
    ) -> Result<Option<usize>, LeaderboardError> {
        validate_initials(initials)?;

        // Equal scores already on the board were earlier, so they stay ahead.
        let position = self
            .entries
            .partition_point(|e| e.score > score || (e.score == score && e.achieved_at <= achieved_at));
        if position >= MAX_ENTRIES {
            return Ok(None);
        }

        self.entries.insert(
            position,
            LeaderboardEntry {
                initials: initials.to_string(),
                score,
                achieved_at,
            },
        );
        self.entries.truncate(MAX_ENTRIES);
        tracing::info!(%initials, score, rank = position + 1, "score recorded");
        Ok(Some(position + 1))
    }

    /// Queues the table for writing to its file. Must be called from
    /// within a Tokio runtime.
    pub fn persist(&mut self) {
        let Some(path) = &self.path else {
            return;
        };
        let bytes = match serde_json::to_vec_pretty(&self.entries) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode leaderboard");
                return;
            }
        };
        match &self.writer {
            Some(writer) => {
                if writer.send(bytes).is_err() {
                    tracing::warn!(path = %path.display(), "leaderboard writer has stopped");
                }
            }
            None => {
                let (writer, latest) = watch::channel(bytes);
                tokio::spawn(write_loop(path.clone(), latest));
                self.writer = Some(writer);
            }
        }
    }
}

/// Writes each table it is handed, newest first, until the leaderboard
/// is dropped.
async fn write_loop(path: PathBuf, mut latest: watch::Receiver<Vec<u8>>) {
    loop {
        let bytes = latest.borrow_and_update().clone();
        if let Err(e) = write_replacing(&path, &bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to write leaderboard");
        }
        if latest.changed().await.is_err() {
            break;
        }
    }
}

async fn write_replacing(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::macros::datetime;

    use super::*;

    fn at(offset_secs: u64) -> OffsetDateTime {
        datetime!(2026-03-01 12:00 UTC) + Duration::from_secs(offset_secs)
    }

    // =====================================================================
    // Validation
    // =====================================================================

    #[test]
    fn test_validate_initials_accepts_three_uppercase() {
        assert!(validate_initials("KIA").is_ok());
    }

    #[test]
    fn test_validate_initials_rejects_bad_format() {
        for bad in ["", "AB", "ABCD", "abc", "A1C", "ĀBC", " AB"] {
            assert!(
                matches!(validate_initials(bad), Err(LeaderboardError::InvalidInitials(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_initials_rejects_blocked() {
        assert!(matches!(
            validate_initials("FUK"),
            Err(LeaderboardError::Blocked(_))
        ));
    }

    // =====================================================================
    // Ranking
    // =====================================================================

    #[test]
    fn test_submit_orders_by_score_descending() {
        let mut board = Leaderboard::in_memory();
        assert_eq!(board.submit("AAA", 10, at(0)).unwrap(), Some(1));
        assert_eq!(board.submit("BBB", 30, at(1)).unwrap(), Some(1));
        assert_eq!(board.submit("CCC", 20, at(2)).unwrap(), Some(2));

        let order: Vec<_> = board.entries().iter().map(|e| e.initials.as_str()).collect();
        assert_eq!(order, ["BBB", "CCC", "AAA"]);
    }

    #[test]
    fn test_submit_tie_goes_to_earlier_date() {
        let mut board = Leaderboard::in_memory();
        board.submit("AAA", 50, at(10)).unwrap();
        assert_eq!(board.submit("BBB", 50, at(20)).unwrap(), Some(2));
        assert_eq!(board.submit("CCC", 50, at(5)).unwrap(), Some(1));

        let order: Vec<_> = board.entries().iter().map(|e| e.initials.as_str()).collect();
        assert_eq!(order, ["CCC", "AAA", "BBB"]);
    }

    #[test]
    fn test_submit_full_board_low_score_not_ranked() {
        let mut board = Leaderboard::in_memory();
        for i in 0..MAX_ENTRIES as u64 {
            board.submit("AAA", 100, at(i)).unwrap();
        }
        assert_eq!(board.submit("ZZZ", 100, at(1_000)).unwrap(), None);
        assert_eq!(board.submit("ZZZ", 5, at(1_001)).unwrap(), None);
        assert_eq!(board.entries().len(), MAX_ENTRIES);
    }

    #[test]
    fn test_submit_full_board_high_score_evicts_last() {
        let mut board = Leaderboard::in_memory();
        for i in 0..MAX_ENTRIES as u64 {
            board.submit("AAA", 100 + i as u32, at(i)).unwrap();
        }
        assert_eq!(board.submit("TOP", 1_000, at(500)).unwrap(), Some(1));
        assert_eq!(board.entries().len(), MAX_ENTRIES);
        assert_eq!(board.entries().last().map(|e| e.score), Some(101));
    }

    #[test]
    fn test_submit_invalid_initials_leaves_board_unchanged() {
        let mut board = Leaderboard::in_memory();
        assert!(board.submit("no", 10, at(0)).is_err());
        assert!(board.entries().is_empty());
    }

    // =====================================================================
    // Persistence
    // =====================================================================

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("korero-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let path = scratch_path("missing");
        let _ = std::fs::remove_file(&path);
        let board = Leaderboard::load(&path).unwrap();
        assert!(board.entries().is_empty());
        assert_eq!(board.path(), Some(path.as_path()));
    }

    #[test]
    fn test_load_sorts_stored_entries() {
        let path = scratch_path("sorted");
        let stored = vec![
            LeaderboardEntry {
                initials: "LOW".into(),
                score: 3,
                achieved_at: at(0),
            },
            LeaderboardEntry {
                initials: "HIG".into(),
                score: 9,
                achieved_at: at(1),
            },
        ];
        std::fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        let board = Leaderboard::load(&path).unwrap();
        assert_eq!(board.entries()[0].initials, "HIG");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, b"{ not a list").unwrap();
        assert!(matches!(
            Leaderboard::load(&path),
            Err(LeaderboardError::Corrupt(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_persist_writes_entries() {
        let path = scratch_path("persist");
        let _ = std::fs::remove_file(&path);
        let mut board = Leaderboard::load(&path).unwrap();
        board.submit("KIA", 42, at(0)).unwrap();
        board.persist();

        let mut written = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Ok(reloaded) = Leaderboard::load(&path) {
                if !reloaded.entries().is_empty() {
                    written = Some(reloaded);
                    break;
                }
            }
        }
        let reloaded = written.expect("leaderboard should be written");
        assert_eq!(reloaded.entries()[0].initials, "KIA");
        assert_eq!(reloaded.entries()[0].score, 42);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_persist_burst_leaves_latest_table() {
        let path = scratch_path("burst");
        let _ = std::fs::remove_file(&path);
        let mut board = Leaderboard::load(&path).unwrap();
        for (i, initials) in ["AAA", "BBB", "CCC", "DDD", "EEE"].iter().enumerate() {
            board.submit(initials, 10 + i as u32, at(i as u64)).unwrap();
            board.persist();
        }

        let mut written = Vec::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Ok(reloaded) = Leaderboard::load(&path) {
                written = reloaded.entries().to_vec();
                if written.len() == 5 {
                    break;
                }
            }
        }
        // Give any out-of-order write a chance to land.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = Leaderboard::load(&path).unwrap();

        assert_eq!(written.len(), 5);
        assert_eq!(settled.entries(), board.entries());
        assert_eq!(settled.entries()[0].initials, "EEE");
        let _ = std::fs::remove_file(&path);
    }
}
