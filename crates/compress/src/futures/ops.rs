//! Async Decompression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use async_compression::futures::bufread::{XzDecoder, ZstdDecoder};
use exn::ResultExt;
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader as AsyncBufReader};
use tracing::instrument;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

impl Compression {
    /// Wrap an async reader with the appropriate decompression layer.
    /// Automatically wraps with a buffered reader internally.
    ///
    /// Decoder errors are deferred until the first read attempt.
    pub fn async_wrap_reader<'a, R>(&self, reader: R) -> Box<dyn AsyncRead + Send + Unpin + 'a>
    where
        R: AsyncRead + Send + Unpin + 'a,
    {
        // `async-compression` only accepts buffered readers.
        let reader = AsyncBufReader::new(reader);
        match self {
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            Compression::Zstd => Box::new(ZstdDecoder::new(reader)),
        }
    }

    /// Decompress from an async reader into an async writer, returning the
    /// number of decompressed bytes written. The writer is closed once the
    /// stream ends.
    ///
    /// Metadata databases decompress to hundreds of megabytes, so this is the
    /// path used when writing them to the cache: only the decoder's window and
    /// one copy buffer are held in memory.
    ///
    /// Failures to read or decode are reported as
    /// [`InvalidData`](ErrorKind::InvalidData); failures of the writer as
    /// [`Io`](ErrorKind::Io).
    #[instrument(skip(reader, writer), fields(format = %self))]
    pub async fn async_decompress_stream<R, W>(&self, reader: R, writer: &mut W) -> Result<u64>
    where
        R: AsyncRead + Send + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = self.async_wrap_reader(reader);
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let read = match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).or_raise(|| ErrorKind::InvalidData),
            };
            writer.write_all(&buffer[..read]).await.or_raise(|| ErrorKind::Io)?;
            total += read as u64;
        }
        writer.close().await.or_raise(|| ErrorKind::Io)?;
        Ok(total)
    }
}
