//! Structured log events, compiled out without the `tracing` feature.

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::token::Token;

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn trace_emit(token: &Token, bytes: &[u8]) {
    trace!(
        target: "lz65::emit",
        command = %token.command(),
        position = token.position(),
        length = token.length(),
        wire_len = bytes.len(),
        "{}",
        token
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
pub(crate) fn trace_emit(_token: &Token, _bytes: &[u8]) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn trace_replay(token: &Token, bytes: &[u8]) {
    trace!(
        target: "lz65::replay",
        command = %token.command(),
        position = token.position(),
        length = token.length(),
        written = bytes.len(),
        "{}",
        token
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
pub(crate) fn trace_replay(_token: &Token, _bytes: &[u8]) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn trace_compressed(src_len: usize, out_len: usize) {
    debug!(
        target: "lz65::compress",
        src_len,
        out_len,
        "compressed {} bytes into {}",
        src_len,
        out_len
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
pub(crate) fn trace_compressed(_src_len: usize, _out_len: usize) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn trace_decompressed(inp_len: usize, out_len: usize) {
    debug!(
        target: "lz65::decompress",
        inp_len,
        out_len,
        "expanded {} bytes into {}",
        inp_len,
        out_len
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
pub(crate) fn trace_decompressed(_inp_len: usize, _out_len: usize) {}
