//! LZ65: a tiny RAW/RLE/REP codec for buffers of at most 256 bytes.
#![no_std]

mod compress;
mod decompress;
mod observer;
mod token;
mod trace;
mod util;

#[cfg(feature = "alloc")]
pub use compress::{compress_to_vec, compress_to_vec_observed, emit_tokens, encode_tokens};
pub use compress::{
    compress_to_buf, compress_to_buf_observed, max_compressed_len, rep_length_at, run_length_at,
    CompressError, Encoder,
};
#[cfg(feature = "alloc")]
pub use decompress::{decompress_to_vec, decompress_to_vec_observed, parse_tokens};
pub use decompress::{
    decompress_to_buf, decompress_to_buf_observed, DecompressError, Malformation, Parser,
};
pub use observer::{NoopObserver, TokenObserver};
pub use token::{
    Command, Token, COM_MASK, EOS_FLAG, LEN_MASK, MAX_INPUT_LEN, MAX_TOKEN_LEN, RAW_FLAG,
    REP_FLAG, RLE_FLAG,
};
#[cfg(feature = "alloc")]
extern crate alloc;
