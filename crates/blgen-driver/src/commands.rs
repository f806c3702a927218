//! Control command (ioctl) definitions for `/dev/beaglelogic`
//!
//! Linux packs an ioctl request number into 32 bits:
//!
//! ```text
//!  31 30 29          16 15           8 7            0
//! ┌─────┬──────────────┬──────────────┬──────────────┐
//! │ dir │ argument size│  type ('k')  │    number    │
//! └─────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! `dir` is 0 for no data, 1 for write (user to kernel) and 2 for read.

/// Command type byte shared by every BeagleLogic command
pub const IOCTL_TYPE: u8 = b'k';

/// Transfer direction bits
pub mod dir {
    pub const NONE: u32 = 0;
    pub const WRITE: u32 = 1;
    pub const READ: u32 = 2;
}

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = 8;
const SIZE_SHIFT: u32 = 16;
const DIR_SHIFT: u32 = 30;

/// Encode a request number the way the kernel's `_IOC` macro does
pub const fn ioc(dir: u32, ty: u8, nr: u8, size: u32) -> u32 {
    (dir << DIR_SHIFT)
        | (size << SIZE_SHIFT)
        | ((ty as u32) << TYPE_SHIFT)
        | ((nr as u32) << NR_SHIFT)
}

/// Start waveform generation: `_IO('k', 0x29)`.
///
/// No direction, no argument, type `0x6B`, number `0x29`, giving `0x6B29`.
pub const IOCTL_BL_START: u32 = ioc(dir::NONE, IOCTL_TYPE, 0x29, 0);

/// Commands understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCommand {
    /// `_IOR('k', 0x20, u32)`
    GetVersion,
    /// `_IOR('k', 0x26, u32)`: total allocated bytes
    GetBufferSize,
    /// `_IOW('k', 0x26, u32)`: reallocate, argument passed by value
    SetBufferSize,
    /// `_IOR('k', 0x27, u32)`
    GetBufunitSize,
    /// `_IOW('k', 0x27, u32)`: argument passed by value
    SetBufunitSize,
    /// `_IO('k', 0x29)`
    Start,
}

impl IoctlCommand {
    /// Every command, in header order
    pub const ALL: [IoctlCommand; 6] = [
        IoctlCommand::GetVersion,
        IoctlCommand::GetBufferSize,
        IoctlCommand::SetBufferSize,
        IoctlCommand::GetBufunitSize,
        IoctlCommand::SetBufunitSize,
        IoctlCommand::Start,
    ];

    /// Name as it appears in the driver header
    pub fn name(self) -> &'static str {
        match self {
            IoctlCommand::GetVersion => "IOCTL_BL_GET_VERSION",
            IoctlCommand::GetBufferSize => "IOCTL_BL_GET_BUFFER_SIZE",
            IoctlCommand::SetBufferSize => "IOCTL_BL_SET_BUFFER_SIZE",
            IoctlCommand::GetBufunitSize => "IOCTL_BL_GET_BUFUNIT_SIZE",
            IoctlCommand::SetBufunitSize => "IOCTL_BL_SET_BUFUNIT_SIZE",
            IoctlCommand::Start => "IOCTL_BL_START",
        }
    }

    /// Command number within the `'k'` type
    pub fn number(self) -> u8 {
        match self {
            IoctlCommand::GetVersion => 0x20,
            IoctlCommand::GetBufferSize | IoctlCommand::SetBufferSize => 0x26,
            IoctlCommand::GetBufunitSize | IoctlCommand::SetBufunitSize => 0x27,
            IoctlCommand::Start => 0x29,
        }
    }

    fn direction(self) -> u32 {
        match self {
            IoctlCommand::GetVersion
            | IoctlCommand::GetBufferSize
            | IoctlCommand::GetBufunitSize => dir::READ,
            IoctlCommand::SetBufferSize | IoctlCommand::SetBufunitSize => dir::WRITE,
            IoctlCommand::Start => dir::NONE,
        }
    }

    /// Encoded request number
    pub fn code(self) -> u32 {
        let size = if self.direction() == dir::NONE {
            0
        } else {
            std::mem::size_of::<u32>() as u32
        };
        ioc(self.direction(), IOCTL_TYPE, self.number(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_code() {
        assert_eq!(IOCTL_BL_START, 0x6B29);
        assert_eq!(IOCTL_BL_START, ((b'k' as u32) << 8) | 0x29);
        assert_eq!(IoctlCommand::Start.code(), IOCTL_BL_START);
    }

    #[test]
    fn test_sized_codes() {
        assert_eq!(IoctlCommand::GetVersion.code(), 0x8004_6B20);
        assert_eq!(IoctlCommand::GetBufferSize.code(), 0x8004_6B26);
        assert_eq!(IoctlCommand::SetBufferSize.code(), 0x4004_6B26);
        assert_eq!(IoctlCommand::GetBufunitSize.code(), 0x8004_6B27);
        assert_eq!(IoctlCommand::SetBufunitSize.code(), 0x4004_6B27);
    }

    #[cfg(all(feature = "beaglelogic", target_os = "linux"))]
    #[test]
    fn test_codes_match_nix() {
        assert_eq!(nix::request_code_none!(b'k', 0x29) as u32, IOCTL_BL_START);
        assert_eq!(
            nix::request_code_read!(b'k', 0x26, std::mem::size_of::<u32>()) as u32,
            IoctlCommand::GetBufferSize.code()
        );
        assert_eq!(
            nix::request_code_write!(b'k', 0x27, std::mem::size_of::<u32>()) as u32,
            IoctlCommand::SetBufunitSize.code()
        );
    }
}
