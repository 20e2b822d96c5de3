//! The external "file-fetch handler" collaborator (§6): `file/get` resolves
//! a repo-relative path and returns its content, or a typed error.

use std::path::PathBuf;

use base64::Engine;
use serde::Serialize;

use crate::error::{Error, Result};

/// Conservative relative to the 512 KiB transport message limit (§6):
/// base64 inflates size by roughly 4/3, so this leaves headroom for the
/// envelope around it.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Base64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContents {
    pub content: String,
    pub encoding: Encoding,
    pub truncated: bool,
    pub size: u64,
}

pub trait FileFetcher: Send + Sync {
    fn fetch(&self, repo_relative_path: &str) -> Result<FileContents>;
}

/// Reference implementation: resolves against a fixed repo root and refuses
/// to read outside it.
pub struct FilesystemFileFetcher {
    root: PathBuf,
    max_bytes: u64,
}

impl FilesystemFileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FilesystemFileFetcher { root: root.into(), max_bytes: DEFAULT_MAX_FILE_BYTES }
    }

    pub fn with_max_bytes(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        FilesystemFileFetcher { root: root.into(), max_bytes }
    }

    fn resolve(&self, repo_relative_path: &str) -> Result<PathBuf> {
        let joined = self.root.join(repo_relative_path);
        let mut resolved = PathBuf::new();
        for component in joined.components() {
            use std::path::Component;
            match component {
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(Error::PathOutsideRepo(repo_relative_path.to_string()));
                    }
                }
                Component::CurDir => {}
                other => resolved.push(other),
            }
        }
        if !resolved.starts_with(&self.root) {
            return Err(Error::PathOutsideRepo(repo_relative_path.to_string()));
        }
        Ok(resolved)
    }
}

impl FileFetcher for FilesystemFileFetcher {
    fn fetch(&self, repo_relative_path: &str) -> Result<FileContents> {
        let path = self.resolve(repo_relative_path)?;
        let metadata = std::fs::metadata(&path)
            .map_err(|_| Error::FileNotFound(repo_relative_path.to_string()))?;
        if !metadata.is_file() {
            return Err(Error::FileNotFound(repo_relative_path.to_string()));
        }
        let size = metadata.len();
        if size > self.max_bytes {
            return Err(Error::FileTooLarge {
                path: repo_relative_path.to_string(),
                size,
                limit: self.max_bytes,
            });
        }

        let bytes = std::fs::read(&path)?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(FileContents { content, encoding: Encoding::Utf8, truncated: false, size }),
            Err(err) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(err.into_bytes());
                Ok(FileContents { content: encoded, encoding: Encoding::Base64, truncated: false, size })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_utf8_file_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let fetcher = FilesystemFileFetcher::new(dir.path());
        let contents = fetcher.fetch("a.txt").unwrap();
        assert_eq!(contents.content, "hello");
        assert_eq!(contents.encoding, Encoding::Utf8);
    }

    #[test]
    fn rejects_paths_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FilesystemFileFetcher::new(dir.path());
        let err = fetcher.fetch("../outside.txt").unwrap_err();
        assert!(matches!(err, Error::PathOutsideRepo(_)));
    }

    #[test]
    fn reports_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 10]).unwrap();
        let fetcher = FilesystemFileFetcher::with_max_bytes(dir.path(), 4);
        let err = fetcher.fetch("big.bin").unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));
    }

    #[test]
    fn non_utf8_content_is_base64_encoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let fetcher = FilesystemFileFetcher::new(dir.path());
        let contents = fetcher.fetch("bin.dat").unwrap();
        assert_eq!(contents.encoding, Encoding::Base64);
    }
}
