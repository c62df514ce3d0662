use core::fmt;

use crate::compress::CompressError;

/// Largest source buffer the format can address
pub const MAX_INPUT_LEN: usize = 256;
/// Largest length a single header byte can carry
pub const MAX_TOKEN_LEN: usize = LEN_MASK as usize;

pub const RAW_FLAG: u8 = 0b00_000000;
pub const REP_FLAG: u8 = 0b01_000000;
pub const RLE_FLAG: u8 = 0b10_000000;
pub const EOS_FLAG: u8 = 0b11_000000;
pub const COM_MASK: u8 = 0b11_000000;
pub const LEN_MASK: u8 = 0b00_111111;

/// Token command, stored in the top two bits of a header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Copy `length` literal bytes
    Raw,
    /// Copy `length` bytes from an earlier position of the output
    Rep,
    /// Repeat one byte `length` times
    Rle,
    /// End of stream
    Eos,
}

impl Command {
    pub const fn flag(self) -> u8 {
        match self {
            Command::Raw => RAW_FLAG,
            Command::Rep => REP_FLAG,
            Command::Rle => RLE_FLAG,
            Command::Eos => EOS_FLAG,
        }
    }

    /// Decode the command bits of a header byte. The length bits are ignored.
    pub const fn from_header(header: u8) -> Self {
        match header & COM_MASK {
            RAW_FLAG => Command::Raw,
            REP_FLAG => Command::Rep,
            RLE_FLAG => Command::Rle,
            _ => Command::Eos,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Raw => "RAW",
            Command::Rep => "REP",
            Command::Rle => "RLE",
            Command::Eos => "EOS",
        })
    }
}

/// One encoded instruction
///
/// What `position` refers to depends on where the token came from.
/// For tokens produced by the [Encoder](crate::Encoder), a RAW or RLE position is an offset
/// into the source buffer and a REP position is an offset into the already-produced output.
/// For tokens produced by the [Parser](crate::Parser), it is the offset of the token's
/// header byte inside the compressed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub(crate) position: u16,
    pub(crate) length: u16,
    pub(crate) command: Command,
}

impl Token {
    pub const EOS: Token = Token {
        position: 0,
        length: 0,
        command: Command::Eos,
    };

    pub const fn raw(position: u16, length: u16) -> Self {
        Self {
            position,
            length,
            command: Command::Raw,
        }
    }

    pub const fn rep(position: u16, length: u16) -> Self {
        Self {
            position,
            length,
            command: Command::Rep,
        }
    }

    pub const fn rle(position: u16, length: u16) -> Self {
        Self {
            position,
            length,
            command: Command::Rle,
        }
    }

    /// Crate-internal constructor from index arithmetic
    ///
    /// Callers have already bounded both values by the input or compressed length.
    pub(crate) fn at(command: Command, position: usize, length: usize) -> Self {
        debug_assert!(position <= u16::MAX as usize);
        debug_assert!(length <= MAX_INPUT_LEN);
        Self {
            position: position as u16,
            length: length as u16,
            command,
        }
    }

    pub fn position(&self) -> usize {
        self.position as usize
    }

    pub fn length(&self) -> usize {
        self.length as usize
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// The header byte for this token
    ///
    /// Fails if the length does not fit the 6-bit field. RAW runs longer than
    /// [MAX_TOKEN_LEN] are split by the serializer before reaching this point.
    pub fn header(&self) -> Result<u8, CompressError> {
        header_byte(self.command, self.length())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] IDX:{:02x} LEN:{:02x}",
            self.command, self.position, self.length
        )
    }
}

pub(crate) fn header_byte(command: Command, length: usize) -> Result<u8, CompressError> {
    match command {
        Command::Eos if length == 0 => Ok(EOS_FLAG),
        Command::Eos => Err(CompressError::LengthOverflow { command, length }),
        _ if length == 0 => Err(CompressError::EmptyToken { command }),
        _ if length > MAX_TOKEN_LEN => Err(CompressError::LengthOverflow { command, length }),
        _ => Ok(command.flag() | length as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bits() {
        assert_eq!(Command::from_header(0x3f), Command::Raw);
        assert_eq!(Command::from_header(0x44), Command::Rep);
        assert_eq!(Command::from_header(0x81), Command::Rle);
        assert_eq!(Command::from_header(0xc0), Command::Eos);
        assert_eq!(Command::from_header(0xff), Command::Eos);
    }

    #[test]
    fn test_header() {
        assert_eq!(Token::raw(0, 2).header(), Ok(0x02));
        assert_eq!(Token::rep(0, 4).header(), Ok(0x44));
        assert_eq!(Token::rle(9, 63).header(), Ok(0xbf));
        assert_eq!(Token::EOS.header(), Ok(0xc0));
    }

    #[test]
    fn test_header_out_of_range() {
        assert_eq!(
            Token::rle(0, 64).header(),
            Err(CompressError::LengthOverflow {
                command: Command::Rle,
                length: 64
            })
        );
        assert_eq!(
            Token::raw(0, 0).header(),
            Err(CompressError::EmptyToken {
                command: Command::Raw
            })
        );
        // EOS never carries a length
        assert_eq!(
            Token {
                position: 0,
                length: 1,
                command: Command::Eos
            }
            .header(),
            Err(CompressError::LengthOverflow {
                command: Command::Eos,
                length: 1
            })
        );
    }

    #[test]
    fn test_display() {
        extern crate alloc;
        use alloc::string::ToString;

        assert_eq!(Token::raw(0, 2).to_string(), "[RAW] IDX:00 LEN:02");
        assert_eq!(Token::rep(0x10, 0x3f).to_string(), "[REP] IDX:10 LEN:3f");
        assert_eq!(Token::EOS.to_string(), "[EOS] IDX:00 LEN:00");
    }
}
