//! Waveform blob loading
//!
//! A waveform file holds raw, already multiplexed output words: each byte
//! position maps to the parallel output pins at one clock tick. blgen never
//! looks inside it; the only derived property is the length, which sizes the
//! driver allocation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors while loading a waveform
#[derive(Error, Debug)]
pub enum WaveformError {
    /// File missing or unreadable
    #[error("Cannot read waveform {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The driver sizes allocations with a 32-bit value
    #[error("Waveform {path} is {len} bytes; the driver can allocate at most {max}")]
    TooLarge { path: PathBuf, len: u64, max: u32 },
}

/// An opaque, pre-multiplexed waveform held in memory
#[derive(Clone)]
pub struct Waveform {
    source: PathBuf,
    data: Vec<u8>,
}

impl Waveform {
    /// Read a whole waveform file into memory.
    ///
    /// The file handle is closed before this returns.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WaveformError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| WaveformError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), bytes = data.len(), "Waveform loaded");

        Ok(Self {
            source: path.to_path_buf(),
            data,
        })
    }

    /// Wrap bytes that did not come from a file
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            source: PathBuf::from("<memory>"),
            data: data.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value to write to the allocation attribute: exactly the blob length
    pub fn allocation_size(&self) -> Result<u32, WaveformError> {
        u32::try_from(self.data.len()).map_err(|_| WaveformError::TooLarge {
            path: self.source.clone(),
            len: self.data.len() as u64,
            max: u32::MAX,
        })
    }
}

impl fmt::Debug for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waveform")
            .field("source", &self.source)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_reads_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PRUdata.bin");
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let waveform = Waveform::load(&path).unwrap();
        assert_eq!(waveform.len(), 3000);
        assert_eq!(waveform.allocation_size().unwrap(), 3000);
        assert_eq!(waveform.as_bytes(), &data[..]);
        assert_eq!(waveform.source(), path.as_path());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Waveform::load(dir.path().join("PRUdata.bin")).unwrap_err();
        assert!(matches!(
            err,
            WaveformError::Read { ref source, .. } if source.kind() == io::ErrorKind::NotFound
        ));
        assert!(err.to_string().contains("PRUdata.bin"));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let waveform = Waveform::load(&path).unwrap();
        assert!(waveform.is_empty());
        assert_eq!(waveform.allocation_size().unwrap(), 0);
    }

    #[test]
    fn test_debug_omits_payload() {
        let waveform = Waveform::from_bytes(vec![7u8; 4]);
        assert_eq!(format!("{:?}", waveform), "Waveform { source: \"<memory>\", len: 4 }");
    }
}
