use encoding_rs::Encoding;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, SubtitlerError};

pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "iso-8859-1", "iso-8859-2"];

const BOM: char = '\u{feff}';

/// Rewrites subtitle files as BOM-free UTF-8.
#[derive(Debug, Clone)]
pub struct EncodingNormalizer {
    candidates: Vec<&'static Encoding>,
}

impl Default for EncodingNormalizer {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_ENCODINGS
                .iter()
                .filter_map(|label| Encoding::for_label(label.as_bytes()))
                .collect(),
        }
    }
}

impl EncodingNormalizer {
    /// Builds a normalizer trying the given WHATWG encoding labels in order.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let candidates = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| SubtitlerError::UnknownEncoding(label.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { candidates })
    }

    /// Decodes with the first candidate that accepts the bytes without errors.
    pub fn decode(&self, bytes: &[u8]) -> Option<(String, &'static Encoding)> {
        self.candidates.iter().find_map(|encoding| {
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| {
                    let text = text.strip_prefix(BOM).unwrap_or(text.as_ref()).to_string();
                    (text, *encoding)
                })
        })
    }

    /// Rewrites `path` as UTF-8 through a temp file in the same directory.
    /// Returns the encoding the content was decoded from.
    pub fn normalize(&self, path: &Path) -> Result<&'static Encoding> {
        let bytes = fs::read(path).map_err(|e| SubtitlerError::io(path, e))?;
        let permissions = fs::metadata(path)
            .map_err(|e| SubtitlerError::io(path, e))?
            .permissions();
        let (text, encoding) = self.decode(&bytes).ok_or_else(|| SubtitlerError::Decode {
            path: path.to_path_buf(),
        })?;

        if encoding == encoding_rs::UTF_8 {
            debug!(path = %path.display(), "subtitle is already UTF-8");
        } else {
            info!(path = %path.display(), from = encoding.name(), "re-encoding subtitle to UTF-8");
        }

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(directory).map_err(|e| SubtitlerError::io(directory, e))?;
        if let Err(e) = temp.write_all(text.as_bytes()).and_then(|_| temp.flush()) {
            return Err(SubtitlerError::io(temp.path(), e));
        }
        // Temp files are created owner-only; keep the subtitle's own mode.
        fs::set_permissions(temp.path(), permissions)
            .map_err(|e| SubtitlerError::io(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| SubtitlerError::io(path, e.error))?;

        Ok(encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = EncodingNormalizer::from_labels(&["utf-8", "klingon"]).unwrap_err();
        assert!(matches!(err, SubtitlerError::UnknownEncoding(label) if label == "klingon"));
    }

    #[test]
    fn test_latin1_falls_back() {
        let normalizer = EncodingNormalizer::default();
        let (text, encoding) = normalizer.decode(b"caf\xe9").unwrap();
        assert_eq!(text, "café");
        assert_ne!(encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn test_utf8_only_rejects_latin1() {
        let normalizer = EncodingNormalizer::from_labels(&["utf-8"]).unwrap();
        assert!(normalizer.decode(b"caf\xe9").is_none());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.srt");
        fs::write(&path, b"caf\xe9").unwrap();
        let err = normalizer.normalize(&path).unwrap_err();
        assert!(matches!(err, SubtitlerError::Decode { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"caf\xe9");
    }

    #[test]
    fn test_normalize_strips_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.srt");
        fs::write(&path, b"\xef\xbb\xbf1\n00:00:01").unwrap();

        let encoding = EncodingNormalizer::default().normalize(&path).unwrap();
        assert_eq!(encoding, encoding_rs::UTF_8);
        assert_eq!(fs::read(&path).unwrap(), b"1\n00:00:01");
    }

    #[test]
    fn test_normalize_rewrites_latin1_as_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.srt");
        fs::write(&path, b"1\nGar\xe7on\n").unwrap();

        EncodingNormalizer::default().normalize(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\nGarçon\n");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("twice.srt");
        fs::write(&path, b"\xef\xbb\xbf1\nD\xc3\xa9j\xc3\xa0 vu\n").unwrap();

        let normalizer = EncodingNormalizer::default();
        normalizer.normalize(&path).unwrap();
        let first = fs::read(&path).unwrap();
        normalizer.normalize(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(first, "1\nDéjà vu\n".as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Ep1.srt");
        fs::write(&path, b"1\nGar\xe7on\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        EncodingNormalizer::default().normalize(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\nGarçon\n");
    }

    #[test]
    fn test_normalize_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("only.srt");
        fs::write(&path, "hello").unwrap();

        EncodingNormalizer::default().normalize(&path).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
