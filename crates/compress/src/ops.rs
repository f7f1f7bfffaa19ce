//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::Write;
use xz2::write::XzEncoder;
use zstd::stream::write::Encoder as ZstdEncoder;

// Only used to produce artifacts (mirrors, fixtures); the levels favour size,
// matching what repository tooling publishes.
const XZ_LEVEL: u32 = 9;
const ZSTD_LEVEL: i32 = 19;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmorder_compress::Compression;
    ///
    /// let compressed = Compression::Xz.compress(b"Hello, world!").unwrap();
    /// assert!(Compression::Xz.check_magic_bytes(&compressed));
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::Xz => {
                let mut encoder = XzEncoder::new(&mut output, XZ_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        Ok(output)
    }
}
