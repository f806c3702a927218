//! `/dev/beaglelogic` device node access

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::path::{Path, PathBuf};

use crate::commands::{IoctlCommand, IOCTL_BL_START};
use crate::error::{DriverError, DriverResult};
use crate::traits::TransmitChannel;

/// Raw ioctl wrappers generated from the driver header
mod raw {
    nix::ioctl_read!(bl_get_buffer_size, b'k', 0x26, u32);
    nix::ioctl_none!(bl_start, b'k', 0x29);
}

fn ioctl_error(command: IoctlCommand, errno: nix::errno::Errno) -> DriverError {
    DriverError::Ioctl {
        command: command.name(),
        reason: errno.desc().to_string(),
    }
}

/// An open, write-only handle on the device node.
///
/// `File` does no userspace buffering, so every `write` goes straight to the
/// driver.
#[derive(Debug)]
pub struct DeviceNode {
    path: PathBuf,
    file: File,
    started: bool,
}

impl DeviceNode {
    /// Open the device node for writing
    pub fn open(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| DriverError::open_failed(path.clone(), e))?;

        tracing::debug!(path = %path.display(), "Opened device node");

        Ok(Self {
            path,
            file,
            started: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the raw file descriptor
    pub fn as_raw_fd(&self) -> i32 {
        self.file.as_raw_fd()
    }

    /// Total allocated bytes, as reported through ioctl
    pub fn buffer_size(&self) -> DriverResult<u32> {
        let mut value: u32 = 0;
        unsafe { raw::bl_get_buffer_size(self.as_raw_fd(), &mut value) }
            .map_err(|e| ioctl_error(IoctlCommand::GetBufferSize, e))?;
        Ok(value)
    }
}

impl TransmitChannel for DeviceNode {
    fn write_waveform(&mut self, data: &[u8]) -> DriverResult<usize> {
        let expected = data.len();
        let mut written = 0;

        // The driver copies at most one buffer's remainder per call
        while written < expected {
            match self.file.write(&data[written..]) {
                Ok(0) => return Err(DriverError::ShortWrite { written, expected }),
                Ok(n) => {
                    written += n;
                    tracing::trace!(chunk = n, written, expected, "Device write");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(DriverError::WriteFailed {
                        written,
                        expected,
                        source,
                    })
                }
            }
        }

        tracing::debug!(bytes = written, "Waveform written to device");
        Ok(written)
    }

    fn start(&mut self) -> DriverResult<()> {
        if self.started {
            return Err(DriverError::Busy("generation already started".to_string()));
        }

        unsafe { raw::bl_start(self.as_raw_fd()) }
            .map_err(|e| ioctl_error(IoctlCommand::Start, e))?;
        self.started = true;

        tracing::info!(
            "Generation started ({} = {:#06x})",
            IoctlCommand::Start.name(),
            IOCTL_BL_START
        );
        Ok(())
    }

    fn close(self) -> DriverResult<()> {
        let fd = self.file.into_raw_fd();
        nix::unistd::close(fd).map_err(|e| DriverError::CloseFailed(e.desc().to_string()))?;
        tracing::debug!(path = %self.path.display(), "Closed device node");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_node() {
        let dir = TempDir::new().unwrap();
        let err = DeviceNode::open(dir.path().join("beaglelogic")).unwrap_err();
        assert!(matches!(err, DriverError::DeviceNotFound(_)));
    }

    #[test]
    fn test_write_to_regular_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beaglelogic");
        std::fs::write(&path, b"").unwrap();

        let mut node = DeviceNode::open(&path).unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        assert_eq!(node.write_waveform(&data).unwrap(), data.len());
        node.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_start_rejected_by_non_device() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beaglelogic");
        std::fs::write(&path, b"").unwrap();

        let mut node = DeviceNode::open(&path).unwrap();
        let err = node.start().unwrap_err();
        assert!(matches!(err, DriverError::Ioctl { command: "IOCTL_BL_START", .. }));
        assert!(node.buffer_size().is_err());
    }
}
