use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::io::{AsyncRead, AsyncReadExt, Chain as AsyncChain, Cursor as AsyncCursor};

/// Reads ahead from the start of a stream without losing what was read.
pub struct AsyncPeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> AsyncPeekableReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Up to `limit` bytes from the start of the stream. Shorter only when the
    /// stream ends first.
    pub async fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if self.buffer.len() < limit {
            let needed = (limit - self.buffer.len()) as u64;
            (&mut self.inner).take(needed).read_to_end(&mut self.buffer).await.or_raise(|| ErrorKind::Io)?;
        }
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// The whole stream again, starting with the bytes already peeked.
    pub fn into_reader(self) -> AsyncChain<AsyncCursor<Vec<u8>>, R> {
        AsyncCursor::new(self.buffer).chain(self.inner)
    }
}

impl Compression {
    /// Check that `reader` starts with this format's magic bytes, before any
    /// of it reaches a decoder.
    ///
    /// Returns a reader over the complete stream. A mismatch (an HTML error
    /// page, an empty body) is [`InvalidData`](ErrorKind::InvalidData); a
    /// failure to read the head is [`Io`](ErrorKind::Io).
    pub async fn async_check_magic_bytes<R>(&self, reader: R) -> Result<AsyncChain<AsyncCursor<Vec<u8>>, R>>
    where
        R: AsyncRead + Unpin,
    {
        let mut peekable = AsyncPeekableReader::new(reader);
        let head = peekable.peek(Self::MAGIC_LEN).await?;
        if !self.check_magic_bytes(head) {
            tracing::warn!(format = %self, "stream does not start with the expected magic bytes");
            exn::bail!(ErrorKind::InvalidData);
        }
        Ok(peekable.into_reader())
    }
}
