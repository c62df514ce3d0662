use core::iter::FusedIterator;

use crate::observer::{NoopObserver, TokenObserver};
use crate::token::*;
use crate::trace::{trace_decompressed, trace_replay};
use crate::util::*;

#[cfg(feature = "alloc")]
extern crate alloc;

/// Ways a compressed stream can be malformed
///
/// Each variant carries the offset of the offending token's header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Malformation {
    #[error("token at offset {offset} runs past the end of the input")]
    Truncated { offset: usize },
    #[error("token at offset {offset} has an invalid length")]
    InvalidLength { offset: usize },
    #[error("back-reference at offset {offset} points past the output written so far")]
    DanglingBackreference { offset: usize },
    #[error("token at offset {offset} expands past the 256 byte limit")]
    CapacityExceeded { offset: usize },
    #[error("input ended at offset {offset} without an end-of-stream marker")]
    MissingEndOfStream { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DecompressError {
    #[error("malformed stream: {0}")]
    MalformedStream(#[from] Malformation),
    #[error("output buffer was insufficient")]
    OutputTooSmall,
}

impl From<OutputFull> for DecompressError {
    fn from(_: OutputFull) -> Self {
        DecompressError::OutputTooSmall
    }
}

/// Splits a compressed stream into tokens
///
/// Every token is bounds-checked against the input before it is yielded, so
/// replaying a yielded token never reads outside the input. Iteration ends after
/// the EOS token; anything following it is ignored. After an error the parser
/// yields nothing more.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    inp: &'a [u8],
    offset: usize,
    produced: usize,
    finished: bool,
}

impl<'a> Parser<'a> {
    pub fn new(inp: &'a [u8]) -> Self {
        Self {
            inp,
            offset: 0,
            produced: 0,
            finished: false,
        }
    }

    /// Total output length of the tokens yielded so far
    pub fn produced(&self) -> usize {
        self.produced
    }

    fn parse_next(&mut self) -> Result<Token, Malformation> {
        let offset = self.offset;
        let Some(&header) = self.inp.get(offset) else {
            return Err(Malformation::MissingEndOfStream { offset });
        };

        let command = Command::from_header(header);
        let length = (header & LEN_MASK) as usize;
        let width = match command {
            Command::Raw => length + 1,
            Command::Rep | Command::Rle => 2,
            Command::Eos => 1,
        };

        let valid_length = match command {
            Command::Eos => length == 0,
            _ => length != 0,
        };
        if !valid_length {
            return Err(Malformation::InvalidLength { offset });
        }
        if offset + width > self.inp.len() {
            return Err(Malformation::Truncated { offset });
        }
        if command == Command::Rep && self.inp[offset + 1] as usize >= self.produced {
            return Err(Malformation::DanglingBackreference { offset });
        }
        if self.produced + length > MAX_INPUT_LEN {
            return Err(Malformation::CapacityExceeded { offset });
        }

        self.produced += length;
        self.offset += width;
        Ok(Token::at(command, offset, length))
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Token, DecompressError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let ret = self.parse_next();
        self.finished = match ret {
            Ok(token) => token.command == Command::Eos,
            Err(_) => true,
        };
        Some(ret.map_err(DecompressError::from))
    }
}

impl<'a> FusedIterator for Parser<'a> {}

/// Parse a whole compressed stream into its token list
///
/// The returned list always ends with exactly one EOS token.
#[cfg(feature = "alloc")]
pub fn parse_tokens(inp: &[u8]) -> Result<alloc::vec::Vec<Token>, DecompressError> {
    Parser::new(inp).collect()
}

/// Execute one parsed token against the output
fn replay_token<O: OutputSink>(
    token: &Token,
    inp: &[u8],
    outp: &mut O,
) -> Result<(), DecompressError> {
    let param = token.position() + 1;
    let len = token.length();

    match token.command {
        Command::Raw => outp.put_lits(&inp[param..param + len])?,
        Command::Rle => outp.put_run(inp[param], len)?,
        Command::Rep => {
            let from = inp[param] as usize;
            if from >= outp.pos() {
                return Err(Malformation::DanglingBackreference {
                    offset: token.position(),
                }
                .into());
            }
            outp.put_backref(from, len)?
        }
        Command::Eos => {}
    }

    Ok(())
}

fn decompress_impl<O: OutputSink, B: TokenObserver>(
    inp: &[u8],
    outp: &mut O,
    observer: &mut B,
) -> Result<(), DecompressError> {
    for token in Parser::new(inp) {
        let token = token?;
        let start = outp.pos();
        replay_token(&token, inp, outp)?;

        let bytes = outp.written(start);
        trace_replay(&token, bytes);
        observer.token(&token, bytes);
    }

    trace_decompressed(inp.len(), outp.pos());
    Ok(())
}

/// Decompress the input into a preallocated buffer
///
/// Returns the decompressed size on success, or an error otherwise.
/// A buffer of [MAX_INPUT_LEN] bytes is always large enough.
///
/// On error the buffer holds the output of every token replayed before the
/// failing one. For [DecompressError::OutputTooSmall] that includes the failing
/// token's output up to the end of the buffer.
pub fn decompress_to_buf(inp: &[u8], outp: &mut [u8]) -> Result<usize, DecompressError> {
    decompress_to_buf_observed(inp, outp, &mut NoopObserver)
}

/// [decompress_to_buf], reporting every replayed token to `observer`
pub fn decompress_to_buf_observed<B: TokenObserver>(
    inp: &[u8],
    outp: &mut [u8],
    observer: &mut B,
) -> Result<usize, DecompressError> {
    let mut outp: BufOutput = outp.into();
    decompress_impl(inp, &mut outp, observer)?;
    Ok(outp.pos)
}

/// Decompress the input into a [Vec](alloc::vec::Vec)
///
/// Returns the result on success, or an error otherwise
#[cfg(feature = "alloc")]
pub fn decompress_to_vec(inp: &[u8]) -> Result<alloc::vec::Vec<u8>, DecompressError> {
    decompress_to_vec_observed(inp, &mut NoopObserver)
}

/// [decompress_to_vec], reporting every replayed token to `observer`
#[cfg(feature = "alloc")]
pub fn decompress_to_vec_observed<B: TokenObserver>(
    inp: &[u8],
    observer: &mut B,
) -> Result<alloc::vec::Vec<u8>, DecompressError> {
    let mut ret: VecOutput = alloc::vec::Vec::<u8>::with_capacity(MAX_INPUT_LEN).into();
    decompress_impl(inp, &mut ret, observer)?;
    Ok(ret.vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(m: Malformation) -> Option<Result<Token, DecompressError>> {
        Some(Err(DecompressError::MalformedStream(m)))
    }

    #[test]
    fn test_parse_positions() {
        let inp = [0x02, 0x41, 0x42, 0x44, 0x00, 0xc0];
        let mut parser = Parser::new(&inp);
        assert_eq!(parser.next(), Some(Ok(Token::raw(0, 2))));
        assert_eq!(parser.next(), Some(Ok(Token::rep(3, 4))));
        assert_eq!(parser.produced(), 6);
        assert_eq!(parser.next(), Some(Ok(Token::at(Command::Eos, 5, 0))));
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn test_parse_stops_at_eos() {
        let mut parser = Parser::new(&[0xc0, 0x44, 0xff]);
        assert_eq!(parser.next(), Some(Ok(Token::EOS)));
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn test_parse_truncated() {
        assert_eq!(
            Parser::new(&[0x44]).next(),
            malformed(Malformation::Truncated { offset: 0 })
        );
        assert_eq!(
            Parser::new(&[0x01, 7, 0x84]).nth(1),
            malformed(Malformation::Truncated { offset: 2 })
        );
        assert_eq!(
            Parser::new(&[0x03, 1, 2]).next(),
            malformed(Malformation::Truncated { offset: 0 })
        );
    }

    #[test]
    fn test_parse_invalid_length() {
        assert_eq!(
            Parser::new(&[0x00, 0xc0]).next(),
            malformed(Malformation::InvalidLength { offset: 0 })
        );
        assert_eq!(
            Parser::new(&[0x80, 0x01, 0xc0]).next(),
            malformed(Malformation::InvalidLength { offset: 0 })
        );
        assert_eq!(
            Parser::new(&[0xc1]).next(),
            malformed(Malformation::InvalidLength { offset: 0 })
        );
    }

    #[test]
    fn test_parse_dangling_backref() {
        // nothing produced yet
        assert_eq!(
            Parser::new(&[0x42, 0x00, 0xc0]).next(),
            malformed(Malformation::DanglingBackreference { offset: 0 })
        );
        let mut parser = Parser::new(&[0x01, 7, 0x42, 0x01, 0xc0]);
        assert_eq!(parser.next(), Some(Ok(Token::raw(0, 1))));
        assert_eq!(
            parser.next(),
            malformed(Malformation::DanglingBackreference { offset: 2 })
        );
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn test_parse_capacity() {
        let inp = [0xbf, 0, 0xbf, 0, 0xbf, 0, 0xbf, 0, 0xbf, 0, 0xc0];
        let mut parser = Parser::new(&inp);
        for _ in 0..4 {
            assert!(parser.next().unwrap().is_ok());
        }
        assert_eq!(
            parser.next(),
            malformed(Malformation::CapacityExceeded { offset: 8 })
        );
    }

    #[test]
    fn test_parse_missing_eos() {
        assert_eq!(
            Parser::new(&[]).next(),
            malformed(Malformation::MissingEndOfStream { offset: 0 })
        );
        assert_eq!(
            Parser::new(&[0x01, 7]).nth(1),
            malformed(Malformation::MissingEndOfStream { offset: 2 })
        );
    }

    #[test]
    fn test_replay_overlapping_backref() {
        let mut out = [0u8; 6];
        let len = decompress_to_buf(&[0x01, 7, 0x45, 0x00, 0xc0], &mut out).unwrap();
        assert_eq!(len, 6);
        assert_eq!(out, [7; 6]);
    }

    #[test]
    fn test_replay_dangling_backref() {
        // the parser rejects these, so feed the replayer directly
        let inp = [0x01, 7, 0x42, 0x01];
        let mut out = [0u8; 4];
        let mut outbuf: BufOutput = (&mut out[..]).into();
        replay_token(&Token::raw(0, 1), &inp, &mut outbuf).unwrap();
        assert_eq!(
            replay_token(&Token::rep(2, 2), &inp, &mut outbuf),
            Err(DecompressError::MalformedStream(
                Malformation::DanglingBackreference { offset: 2 }
            ))
        );
        assert_eq!(outbuf.pos, 1);
    }

    #[test]
    fn test_decompress_simple() {
        let mut out = [0u8; 10];
        let len = decompress_to_buf(&[0x03, 1, 2, 3, 0x46, 0x00, 0x01, 4, 0xc0], &mut out)
            .unwrap();
        assert_eq!(len, 10);
        assert_eq!(out, [1, 2, 3, 1, 2, 3, 1, 2, 3, 4]);
    }

    #[test]
    fn test_decompress_rle() {
        let mut out = [0u8; 5];
        let len = decompress_to_buf(&[0x82, 9, 0x01, 1, 0x82, 9, 0xc0], &mut out).unwrap();
        assert_eq!(len, 5);
        assert_eq!(out, [9, 9, 1, 9, 9]);
    }

    #[test]
    fn test_decompress_output_too_small() {
        let mut out = [0u8; 2];
        assert_eq!(
            decompress_to_buf(&[0x84, 5, 0xc0], &mut out),
            Err(DecompressError::OutputTooSmall)
        );
        // written up to the limit
        assert_eq!(out, [5, 5]);
    }

    #[test]
    fn test_decompress_empty_stream() {
        let mut out = [0u8; 0];
        assert_eq!(decompress_to_buf(&[0xc0], &mut out), Ok(0));
    }
}
