use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;

use crate::error::TumorboardError;

pub fn tumorboard_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join("tumorboard"),
        None => std::env::temp_dir().join("tumorboard"),
    }
}

pub fn cache_key(id: &str) -> String {
    format!("{:x}", md5::compute(id.as_bytes()))
}

pub fn cache_path(id: &str, extension: &str) -> PathBuf {
    tumorboard_cache_dir().join(format!("{}.{extension}", cache_key(id)))
}

/// A cached file is valid if it exists and its mtime is within `max_age`.
pub fn cache_is_valid(path: &Path, max_age: Duration) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    match modified.elapsed() {
        Ok(elapsed) => elapsed < max_age,
        Err(_) => true, // mtime is in the future; treat as fresh rather than re-downloading
    }
}

/// Writes `content` to the cache file for `id`, atomically (write-then-rename),
/// unconditionally overwriting whatever was there before.
pub async fn save_atomic(path: &Path, content: &[u8]) -> Result<(), TumorboardError> {
    let Some(dir) = path.parent() else {
        return Err(TumorboardError::InvalidArgument(
            "Invalid cache path (no parent directory)".into(),
        ));
    };
    tokio::fs::create_dir_all(dir).await?;

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("cache");

    let mut tmp_path = None;
    let mut file_opt = None;
    for attempt in 0..32_u32 {
        let candidate = dir.join(format!(
            ".{file_name}.{}.{}.tmp",
            std::process::id(),
            seed.saturating_add(attempt as u128)
        ));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                tmp_path = Some(candidate);
                file_opt = Some(file);
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let Some(tmp_path) = tmp_path else {
        return Err(TumorboardError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "Unable to allocate secure temporary cache file",
        )));
    };
    let Some(mut file) = file_opt else {
        return Err(TumorboardError::Io(std::io::Error::other(
            "Temporary cache file handle was not initialized",
        )));
    };
    file.write_all(content).await?;
    file.flush().await?;

    match tokio::fs::rename(&tmp_path, path).await {
        Ok(()) => Ok(()),
        // A concurrent writer winning the race is an acceptable outcome too.
        Err(_) if tokio::fs::metadata(path).await.is_ok() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_md5_hex() {
        assert_eq!(cache_key("hello"), format!("{:x}", md5::compute(b"hello")));
    }

    #[tokio::test]
    async fn save_atomic_roundtrips_content() {
        let dir = std::env::temp_dir().join(format!("tumorboard-test-{}", std::process::id()));
        let path = dir.join("biomarkers.tsv");
        save_atomic(&path, b"Gene\tAlteration\nBRAF\tV600E\n")
            .await
            .unwrap();
        let read_back = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(read_back.contains("BRAF"));
        assert!(cache_is_valid(&path, Duration::from_secs(3600)));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn cache_is_valid_rejects_missing_file() {
        let path = std::env::temp_dir().join("tumorboard-does-not-exist.tsv");
        assert!(!cache_is_valid(&path, Duration::from_secs(86_400)));
    }
}
