//! Audio archive
//!
//! Optionally writes uploaded audio and synthesized replies to disk with
//! timestamped, session-tagged filenames. Archive failures are logged and
//! never fail the request.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Writes request/response audio under a configured directory.
pub struct AudioArchive {
    dir: PathBuf,
}

impl AudioArchive {
    /// Create an archive rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create archive dir");
        }
        Self { dir }
    }

    /// Archive the uploaded audio for a turn.
    pub async fn save_upload(&self, session_id: &str, bytes: &[u8]) {
        self.save("upload", session_id, bytes).await;
    }

    /// Archive the synthesized reply for a turn.
    pub async fn save_response(&self, session_id: &str, bytes: &[u8]) {
        self.save("response", session_id, bytes).await;
    }

    async fn save(&self, prefix: &str, session_id: &str, bytes: &[u8]) {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self
            .dir
            .join(format!("{prefix}_{timestamp}_{session_id}.wav"));

        match tokio::fs::write(&path, bytes).await {
            Ok(()) => tracing::debug!(path = %path.display(), bytes = bytes.len(), "archived audio"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "audio archive failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archive_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = AudioArchive::new(dir.path());

        archive.save_upload("s1", b"fake upload").await;
        archive.save_response("s1", b"fake response").await;

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.starts_with("upload_") && n.ends_with("_s1.wav")));
        assert!(names.iter().any(|n| n.starts_with("response_") && n.ends_with("_s1.wav")));
    }
}
