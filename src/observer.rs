use crate::token::Token;

/// Receives one event per token while a stream is written or replayed
///
/// During compression `bytes` is the wire encoding that was emitted for the token.
/// During decompression it is the output the token reconstructed.
/// Observers cannot influence the codec.
pub trait TokenObserver {
    fn token(&mut self, token: &Token, bytes: &[u8]);
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TokenObserver for NoopObserver {
    #[inline]
    fn token(&mut self, _token: &Token, _bytes: &[u8]) {}
}

impl<F: FnMut(&Token, &[u8])> TokenObserver for F {
    fn token(&mut self, token: &Token, bytes: &[u8]) {
        self(token, bytes)
    }
}
