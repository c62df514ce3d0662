use core::iter::FusedIterator;

use crate::observer::{NoopObserver, TokenObserver};
use crate::token::*;
use crate::trace::{trace_compressed, trace_emit};
use crate::util::*;

#[cfg(feature = "alloc")]
extern crate alloc;

/// Compression errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CompressError {
    /// The source is longer than the format can address.
    #[error("input of {len} bytes exceeds the 256 byte limit")]
    InputTooLarge { len: usize },
    /// A token's length does not fit the 6-bit header field.
    #[error("{command} length {length} does not fit in a token header")]
    LengthOverflow { command: Command, length: usize },
    /// A RAW, REP or RLE token with a length of zero.
    #[error("{command} token has zero length")]
    EmptyToken { command: Command },
    /// A token refers to bytes outside the source, or a REP token refers to output
    /// that has not been produced yet.
    #[error("token at {position} with length {length} is out of range")]
    TokenOutOfRange { position: usize, length: usize },
    /// The output buffer was too small to hold all the output.
    ///
    /// The output that has been written *is* valid, but has been truncated.
    #[error("output buffer was insufficient")]
    OutputTooSmall,
}

impl From<OutputFull> for CompressError {
    fn from(_: OutputFull) -> Self {
        CompressError::OutputTooSmall
    }
}

/// Find the run of bytes equal to `src[idx]` starting at `idx`
///
/// Returns an RLE token when the run is at least two bytes long, otherwise a
/// one-byte RAW token. Runs are capped at [MAX_TOKEN_LEN].
///
/// # Panics
///
/// Panics if `idx` is out of bounds.
pub fn run_length_at(src: &[u8], idx: usize) -> Token {
    let byte = src[idx];
    let run = src[idx..]
        .iter()
        .take(MAX_TOKEN_LEN)
        .take_while(|&&b| b == byte)
        .count();

    if run > 1 {
        Token::at(Command::Rle, idx, run)
    } else {
        Token::at(Command::Raw, idx, 1)
    }
}

/// Find a back-reference for the bytes starting at `idx`
///
/// Candidate lengths are tried in increasing order. For each one the first
/// occurrence of `src[idx..idx + len]` is located; if it starts before `idx` the
/// candidate is accepted and the next length is tried. The offset of the *last*
/// accepted candidate is returned, not the best offset seen overall.
///
/// Returns a REP token when a match of at least two bytes exists, otherwise a
/// one-byte RAW token. Matches are capped at [MAX_TOKEN_LEN].
///
/// # Panics
///
/// Panics if `idx` is out of bounds.
pub fn rep_length_at(src: &[u8], idx: usize) -> Token {
    assert!(idx < src.len());

    let mut found = None;
    for len in 1..=MAX_TOKEN_LEN {
        if idx + len > src.len() {
            break;
        }

        // anything starting before idx ends before idx + len
        let needle = &src[idx..idx + len];
        let haystack = &src[..idx + len - 1];
        match haystack.windows(len).position(|w| w == needle) {
            Some(offset) => found = Some((offset, len)),
            None => break,
        }
    }

    match found {
        Some((offset, len)) if len > 1 => Token::at(Command::Rep, offset, len),
        _ => Token::at(Command::Raw, idx, 1),
    }
}

/// Pick the token for position `idx`. Ties go to RLE.
fn select_at(src: &[u8], idx: usize) -> Token {
    let rle = run_length_at(src, idx);
    let rep = rep_length_at(src, idx);
    if rle.length >= rep.length {
        rle
    } else {
        rep
    }
}

/// Greedy token generator
///
/// Yields tokens in stream order with adjacent RAW tokens merged, followed by
/// exactly one [Token::EOS]. Merged RAW tokens may be longer than
/// [MAX_TOKEN_LEN]; the serializer splits them.
#[derive(Debug, Clone)]
pub struct Encoder<'a> {
    src: &'a [u8],
    idx: usize,
    pending_raw: Option<Token>,
    queued: Option<Token>,
    done: bool,
}

impl<'a> Encoder<'a> {
    pub fn new(src: &'a [u8]) -> Result<Self, CompressError> {
        if src.len() > MAX_INPUT_LEN {
            return Err(CompressError::InputTooLarge { len: src.len() });
        }
        Ok(Self {
            src,
            idx: 0,
            pending_raw: None,
            queued: None,
            done: false,
        })
    }
}

impl<'a> Iterator for Encoder<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.queued.take() {
            return Some(token);
        }

        while self.idx < self.src.len() {
            let token = select_at(self.src, self.idx);
            self.idx += token.length();

            if token.command == Command::Raw {
                match &mut self.pending_raw {
                    Some(raw) => raw.length += token.length,
                    None => self.pending_raw = Some(token),
                }
            } else if let Some(raw) = self.pending_raw.take() {
                self.queued = Some(token);
                return Some(raw);
            } else {
                return Some(token);
            }
        }

        if let Some(raw) = self.pending_raw.take() {
            return Some(raw);
        }

        if self.done {
            None
        } else {
            self.done = true;
            Some(Token::EOS)
        }
    }
}

impl<'a> FusedIterator for Encoder<'a> {}

/// Run the encoder over `src` and collect the token list
#[cfg(feature = "alloc")]
pub fn encode_tokens(src: &[u8]) -> Result<alloc::vec::Vec<Token>, CompressError> {
    Ok(Encoder::new(src)?.collect())
}

/// Write the wire encoding of one token
///
/// `produced` is how much output the preceding tokens reconstruct.
fn emit_token<O: OutputSink>(
    token: &Token,
    src: &[u8],
    produced: usize,
    outp: &mut O,
) -> Result<(), CompressError> {
    let position = token.position();
    let length = token.length();
    let out_of_range = CompressError::TokenOutOfRange { position, length };

    match token.command {
        Command::Raw => {
            if length == 0 {
                return Err(CompressError::EmptyToken {
                    command: Command::Raw,
                });
            }
            let lits = src.get(position..position + length).ok_or(out_of_range)?;
            for chunk in lits.chunks(MAX_TOKEN_LEN) {
                outp.put_lits(&[header_byte(Command::Raw, chunk.len())?])?;
                outp.put_lits(chunk)?;
            }
        }
        Command::Rle => {
            let header = token.header()?;
            let byte = *src.get(position).ok_or(out_of_range)?;
            outp.put_lits(&[header, byte])?;
        }
        Command::Rep => {
            let header = token.header()?;
            if position >= produced || position > u8::MAX as usize {
                return Err(out_of_range);
            }
            outp.put_lits(&[header, position as u8])?;
        }
        Command::Eos => {
            outp.put_lits(&[token.header()?])?;
        }
    }

    Ok(())
}

fn emit_impl<O: OutputSink, B: TokenObserver>(
    tokens: impl IntoIterator<Item = Token>,
    src: &[u8],
    outp: &mut O,
    observer: &mut B,
) -> Result<(), CompressError> {
    if src.len() > MAX_INPUT_LEN {
        return Err(CompressError::InputTooLarge { len: src.len() });
    }

    let mut produced = 0;
    for token in tokens {
        let start = outp.pos();
        emit_token(&token, src, produced, outp)?;
        produced += token.length();

        let bytes = outp.written(start);
        trace_emit(&token, bytes);
        observer.token(&token, bytes);
    }

    trace_compressed(src.len(), outp.pos());
    Ok(())
}

fn compress_impl<O: OutputSink, B: TokenObserver>(
    src: &[u8],
    outp: &mut O,
    observer: &mut B,
) -> Result<(), CompressError> {
    emit_impl(Encoder::new(src)?, src, outp, observer)
}

/// Upper bound on the compressed size of `src_len` bytes
pub const fn max_compressed_len(src_len: usize) -> usize {
    // Every match covers at least as many bytes as its two wire bytes, so only
    // RAW headers and EOS expand. RAW runs are separated by matches of two or
    // more bytes, so there is at most one header per three source bytes:
    // RAW(1) RLE(2) repeated reaches it.
    src_len + src_len.div_ceil(3) + 1
}

/// Compress the input into a preallocated buffer
///
/// Returns the compressed size on success, or an error otherwise.
/// A buffer of [max_compressed_len] bytes is always large enough.
///
/// On error the buffer is left holding whatever was written before the failure.
/// For [CompressError::OutputTooSmall] that is the stream cut off at the end of
/// the buffer, possibly in the middle of a token.
pub fn compress_to_buf(src: &[u8], outp: &mut [u8]) -> Result<usize, CompressError> {
    compress_to_buf_observed(src, outp, &mut NoopObserver)
}

/// [compress_to_buf], reporting every emitted token to `observer`
pub fn compress_to_buf_observed<B: TokenObserver>(
    src: &[u8],
    outp: &mut [u8],
    observer: &mut B,
) -> Result<usize, CompressError> {
    let mut outp: BufOutput = outp.into();
    compress_impl(src, &mut outp, observer)?;
    Ok(outp.pos)
}

/// Compress the input into a [Vec](alloc::vec::Vec)
///
/// Returns the result on success, or an error otherwise
#[cfg(feature = "alloc")]
pub fn compress_to_vec(src: &[u8]) -> Result<alloc::vec::Vec<u8>, CompressError> {
    compress_to_vec_observed(src, &mut NoopObserver)
}

/// [compress_to_vec], reporting every emitted token to `observer`
#[cfg(feature = "alloc")]
pub fn compress_to_vec_observed<B: TokenObserver>(
    src: &[u8],
    observer: &mut B,
) -> Result<alloc::vec::Vec<u8>, CompressError> {
    let capacity = max_compressed_len(usize::min(src.len(), MAX_INPUT_LEN));
    let mut ret: VecOutput = alloc::vec::Vec::<u8>::with_capacity(capacity).into();
    compress_impl(src, &mut ret, observer)?;
    Ok(ret.vec)
}

/// Serialize a token list
///
/// RAW and RLE positions refer to `src`. The list is written as given; it is not
/// checked for a trailing EOS.
#[cfg(feature = "alloc")]
pub fn emit_tokens(tokens: &[Token], src: &[u8]) -> Result<alloc::vec::Vec<u8>, CompressError> {
    let mut ret: VecOutput = alloc::vec::Vec::<u8>::new().into();
    emit_impl(tokens.iter().copied(), src, &mut ret, &mut NoopObserver)?;
    Ok(ret.vec)
}
