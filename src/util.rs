#[cfg(feature = "alloc")]
extern crate alloc;

/// The output ran out of room
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct OutputFull;

/// Internal abstraction for types of outputs (slice vs Vec)
///
/// Note for all functions: we guarantee writing all the way up to the limit
pub(crate) trait OutputSink {
    /// Number of bytes written so far
    fn pos(&self) -> usize;
    /// Bytes written since `start`
    fn written(&self, start: usize) -> &[u8];
    /// Add the given literal run to the output
    fn put_lits(&mut self, lits: &[u8]) -> Result<(), OutputFull>;
    /// Add `len` copies of `byte` to the output
    fn put_run(&mut self, byte: u8, len: usize) -> Result<(), OutputFull>;
    /// Copy `len` bytes starting at absolute output offset `from`
    ///
    /// `from` must be less than [pos](OutputSink::pos). The copy goes one byte at a time,
    /// so `len` may exceed `pos - from`.
    fn put_backref(&mut self, from: usize, len: usize) -> Result<(), OutputFull>;
}

pub(crate) struct BufOutput<'a> {
    pub pos: usize,
    pub buf: &'a mut [u8],
}
impl<'a> From<&'a mut [u8]> for BufOutput<'a> {
    fn from(buf: &'a mut [u8]) -> Self {
        Self { pos: 0, buf }
    }
}
impl<'a> BufOutput<'a> {
    /// Clip `len` to the remaining room, reporting whether it had to
    fn clip(&self, len: usize) -> (usize, bool) {
        let room = self.buf.len() - self.pos;
        if len > room {
            (room, true)
        } else {
            (len, false)
        }
    }
}
impl<'a> OutputSink for BufOutput<'a> {
    fn pos(&self) -> usize {
        self.pos
    }

    fn written(&self, start: usize) -> &[u8] {
        &self.buf[start..self.pos]
    }

    fn put_lits(&mut self, lits: &[u8]) -> Result<(), OutputFull> {
        let (len, did_overflow) = self.clip(lits.len());

        self.buf[self.pos..self.pos + len].copy_from_slice(&lits[..len]);
        self.pos += len;

        if did_overflow {
            Err(OutputFull)
        } else {
            Ok(())
        }
    }

    fn put_run(&mut self, byte: u8, len: usize) -> Result<(), OutputFull> {
        let (len, did_overflow) = self.clip(len);

        self.buf[self.pos..self.pos + len].fill(byte);
        self.pos += len;

        if did_overflow {
            Err(OutputFull)
        } else {
            Ok(())
        }
    }

    fn put_backref(&mut self, from: usize, len: usize) -> Result<(), OutputFull> {
        debug_assert!(from < self.pos);
        let (len, did_overflow) = self.clip(len);

        for i in 0..len {
            self.buf[self.pos + i] = self.buf[from + i];
        }
        self.pos += len;

        if did_overflow {
            Err(OutputFull)
        } else {
            Ok(())
        }
    }
}

#[cfg(feature = "alloc")]
pub(crate) struct VecOutput {
    pub vec: alloc::vec::Vec<u8>,
}
#[cfg(feature = "alloc")]
impl From<alloc::vec::Vec<u8>> for VecOutput {
    fn from(vec: alloc::vec::Vec<u8>) -> Self {
        Self { vec }
    }
}
#[cfg(feature = "alloc")]
impl OutputSink for VecOutput {
    fn pos(&self) -> usize {
        self.vec.len()
    }

    fn written(&self, start: usize) -> &[u8] {
        &self.vec[start..]
    }

    fn put_lits(&mut self, lits: &[u8]) -> Result<(), OutputFull> {
        self.vec.extend_from_slice(lits);
        Ok(())
    }

    fn put_run(&mut self, byte: u8, len: usize) -> Result<(), OutputFull> {
        let pos = self.vec.len();
        self.vec.resize(pos + len, byte);
        Ok(())
    }

    fn put_backref(&mut self, from: usize, len: usize) -> Result<(), OutputFull> {
        debug_assert!(from < self.vec.len());
        self.vec.reserve(len);
        for i in 0..len {
            let b = self.vec[from + i];
            self.vec.push(b);
        }
        Ok(())
    }
}
