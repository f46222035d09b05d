//! Command and acknowledge code sets of the device link
//!
//! Host-issued commands occupy 0x01..=0x0B; 0x2F is the universal
//! acknowledge the device sends when an operation cannot be answered with
//! its own reply frame.

/// Commands issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Power-on handshake
    Handshake = 0x01,
    /// Query the software version string
    GetSoftwareVersion = 0x02,
    /// Store a new hardware version string
    SetHardwareVersion = 0x03,
    /// Query the hardware version string
    GetHardwareVersion = 0x04,
    /// Store a new serial number
    SetSerialNumber = 0x05,
    /// Query the serial number
    GetSerialNumber = 0x06,
    /// Software reset
    SoftReset = 0x07,
    /// Run the self check
    SelfCheck = 0x08,
    /// Enter low-power mode
    LowPowerMode = 0x09,
    /// Start in-application upgrade
    StartUpgrade = 0x0A,
    /// Switch cyclic upload mode on or off
    UploadMode = 0x0B,
    /// Universal acknowledge (device to host)
    Ack = 0x2F,
}

impl Command {
    /// Get the command as its wire byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte into a command
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Command::Handshake),
            0x02 => Some(Command::GetSoftwareVersion),
            0x03 => Some(Command::SetHardwareVersion),
            0x04 => Some(Command::GetHardwareVersion),
            0x05 => Some(Command::SetSerialNumber),
            0x06 => Some(Command::GetSerialNumber),
            0x07 => Some(Command::SoftReset),
            0x08 => Some(Command::SelfCheck),
            0x09 => Some(Command::LowPowerMode),
            0x0A => Some(Command::StartUpgrade),
            0x0B => Some(Command::UploadMode),
            0x2F => Some(Command::Ack),
            _ => None,
        }
    }
}

/// Result codes carried by the universal acknowledge frame.
///
/// 0x00..=0x06 report link-level problems, 0x11..=0x18 report device
/// state problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AckCode {
    /// Success
    Finish = 0x00,
    /// Unknown failure
    Unknown = 0x01,
    /// Malformed request
    Format = 0x02,
    /// Bad frame length
    FrameLen = 0x03,
    /// Required data missing
    EmptyData = 0x04,
    /// Wrong device number
    DeviceNumber = 0x05,
    /// Verification failed
    Check = 0x06,
    /// Execution timed out
    Timeout = 0x11,
    /// Device busy
    Busy = 0x12,
    /// Data out of range
    DataAbnormal = 0x13,
    /// Operation failed
    OperateAbnormal = 0x14,
    /// Wrong mode for this operation
    ModeAbnormal = 0x15,
    /// Operation not valid here
    OperateInvalid = 0x16,
    /// Module is locked
    ModuleLock = 0x17,
    /// System is locked (handshake not completed)
    SystemLock = 0x18,
}

impl AckCode {
    /// Get the code as its wire byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte into a code
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(AckCode::Finish),
            0x01 => Some(AckCode::Unknown),
            0x02 => Some(AckCode::Format),
            0x03 => Some(AckCode::FrameLen),
            0x04 => Some(AckCode::EmptyData),
            0x05 => Some(AckCode::DeviceNumber),
            0x06 => Some(AckCode::Check),
            0x11 => Some(AckCode::Timeout),
            0x12 => Some(AckCode::Busy),
            0x13 => Some(AckCode::DataAbnormal),
            0x14 => Some(AckCode::OperateAbnormal),
            0x15 => Some(AckCode::ModeAbnormal),
            0x16 => Some(AckCode::OperateInvalid),
            0x17 => Some(AckCode::ModuleLock),
            0x18 => Some(AckCode::SystemLock),
            _ => None,
        }
    }
}
