//! Leading type bytes of inbound frames
//!
//! The first byte of every frame the display sends identifies what
//! follows. Codes fall into three groups: command return codes (the
//! result of the last instruction, enabled with `bkcmd=3`), data replies
//! (`get` results), and unsolicited notifications.

// Notifications
pub const STARTUP: u8 = 0x00;
pub const TOUCH_EVENT: u8 = 0x65;
pub const CURRENT_PAGE: u8 = 0x66;
pub const TOUCH_COORDINATE: u8 = 0x67;
pub const SLEEP_TOUCH_COORDINATE: u8 = 0x68;
pub const AUTOMATIC_SLEEP: u8 = 0x86;
pub const AUTOMATIC_WAKE_UP: u8 = 0x87;
pub const READY: u8 = 0x88;
pub const START_SD_UPGRADE: u8 = 0x89;

// Data replies
pub const STRING_REPLY: u8 = 0x70;
pub const NUMBER_REPLY: u8 = 0x71;

// Command return codes
pub const INVALID_INSTRUCTION: u8 = 0x00;
pub const CMD_FINISHED_OK: u8 = 0x01;
pub const INVALID_COMPONENT_ID: u8 = 0x02;
pub const INVALID_PAGE_ID: u8 = 0x03;
pub const INVALID_PICTURE_ID: u8 = 0x04;
pub const INVALID_FONT_ID: u8 = 0x05;
pub const INVALID_FILE_OPERATION: u8 = 0x06;
pub const INVALID_CRC: u8 = 0x09;
pub const INVALID_BAUD: u8 = 0x11;
pub const INVALID_WAVEFORM: u8 = 0x12;
pub const INVALID_VARIABLE: u8 = 0x1A;
pub const INVALID_VARIABLE_OPERATION: u8 = 0x1B;
pub const ASSIGNMENT_FAILED: u8 = 0x1C;
pub const EEPROM_FAILED: u8 = 0x1D;
pub const INVALID_PARAMETER_COUNT: u8 = 0x1E;
pub const IO_FAILED: u8 = 0x1F;
pub const INVALID_ESCAPE_CHARACTER: u8 = 0x20;
pub const VARIABLE_NAME_TOO_LONG: u8 = 0x23;
pub const SERIAL_BUFFER_OVERFLOW: u8 = 0x24;
pub const TRANSPARENT_DATA_FINISHED: u8 = 0xFD;
pub const TRANSPARENT_DATA_READY: u8 = 0xFE;

/// Command return codes the display reports for an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReturnCode {
    /// Instruction was not understood
    InvalidInstruction,
    /// Instruction completed successfully
    Finished,
    InvalidComponent,
    InvalidPage,
    InvalidPicture,
    InvalidFont,
    InvalidFileOperation,
    InvalidCrc,
    InvalidBaud,
    InvalidWaveform,
    InvalidVariable,
    InvalidVariableOperation,
    AssignmentFailed,
    EepromFailed,
    InvalidParameterCount,
    IoFailed,
    InvalidEscapeCharacter,
    VariableNameTooLong,
    /// Display's serial input buffer overflowed
    SerialBufferOverflow,
    /// Transparent data transfer completed
    TransparentDataFinished,
    /// Display is ready to receive transparent data
    TransparentDataReady,
}

impl ReturnCode {
    /// Parse a return code from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        use ReturnCode::*;
        Some(match byte {
            INVALID_INSTRUCTION => InvalidInstruction,
            CMD_FINISHED_OK => Finished,
            INVALID_COMPONENT_ID => InvalidComponent,
            INVALID_PAGE_ID => InvalidPage,
            INVALID_PICTURE_ID => InvalidPicture,
            INVALID_FONT_ID => InvalidFont,
            INVALID_FILE_OPERATION => InvalidFileOperation,
            INVALID_CRC => InvalidCrc,
            INVALID_BAUD => InvalidBaud,
            INVALID_WAVEFORM => InvalidWaveform,
            INVALID_VARIABLE => InvalidVariable,
            INVALID_VARIABLE_OPERATION => InvalidVariableOperation,
            ASSIGNMENT_FAILED => AssignmentFailed,
            EEPROM_FAILED => EepromFailed,
            INVALID_PARAMETER_COUNT => InvalidParameterCount,
            IO_FAILED => IoFailed,
            INVALID_ESCAPE_CHARACTER => InvalidEscapeCharacter,
            VARIABLE_NAME_TOO_LONG => VariableNameTooLong,
            SERIAL_BUFFER_OVERFLOW => SerialBufferOverflow,
            TRANSPARENT_DATA_FINISHED => TransparentDataFinished,
            TRANSPARENT_DATA_READY => TransparentDataReady,
            _ => return None,
        })
    }

    /// Whether this code reports a failed instruction
    pub fn is_failure(self) -> bool {
        !matches!(
            self,
            ReturnCode::Finished
                | ReturnCode::TransparentDataFinished
                | ReturnCode::TransparentDataReady
        )
    }
}

/// Total length (including terminator) of frame types with a fixed layout
///
/// Payload bytes of these frames may legitimately equal the terminator
/// value, so the decoder only looks for the terminator in the last three
/// positions.
pub fn fixed_frame_len(type_byte: u8) -> Option<usize> {
    match type_byte {
        NUMBER_REPLY => Some(8),
        TOUCH_EVENT => Some(7),
        CURRENT_PAGE => Some(5),
        TOUCH_COORDINATE | SLEEP_TOUCH_COORDINATE => Some(9),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_table() {
        assert_eq!(ReturnCode::from_byte(0x01), Some(ReturnCode::Finished));
        assert_eq!(ReturnCode::from_byte(0x1A), Some(ReturnCode::InvalidVariable));
        assert_eq!(ReturnCode::from_byte(0x24), Some(ReturnCode::SerialBufferOverflow));
        assert_eq!(ReturnCode::from_byte(0xFE), Some(ReturnCode::TransparentDataReady));
        assert_eq!(ReturnCode::from_byte(0x07), None);
        assert_eq!(ReturnCode::from_byte(STRING_REPLY), None);
    }

    #[test]
    fn test_failure_classification() {
        assert!(!ReturnCode::Finished.is_failure());
        assert!(!ReturnCode::TransparentDataReady.is_failure());
        assert!(ReturnCode::InvalidInstruction.is_failure());
        assert!(ReturnCode::InvalidPage.is_failure());
    }

    #[test]
    fn test_fixed_lengths() {
        assert_eq!(fixed_frame_len(NUMBER_REPLY), Some(8));
        assert_eq!(fixed_frame_len(TOUCH_COORDINATE), Some(9));
        assert_eq!(fixed_frame_len(STRING_REPLY), None);
        assert_eq!(fixed_frame_len(CMD_FINISHED_OK), None);
    }
}
