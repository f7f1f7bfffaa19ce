use crate::Compression;
use crate::error::{ErrorKind, Result};
use std::path::Path;

const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

impl Compression {
    /// Length of the longest magic header; enough of a stream to identify it.
    pub const MAGIC_LEN: usize = XZ_MAGIC.len();

    /// Detect compression from the extension of a file path or URL.
    ///
    /// Repository descriptors reference databases by relative `href`, so the
    /// same detection works for local paths and for resolved download URLs.
    /// A missing or unknown extension is an
    /// [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) error carrying the
    /// offending path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
            Some("xz") => Ok(Compression::Xz),
            Some("zst") => Ok(Compression::Zstd),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Detect compression format from magic bytes.
    ///
    /// Returns `None` if no magic bytes match or if the input is too short.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&XZ_MAGIC) {
            return Some(Compression::Xz);
        }
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Some(Compression::Zstd);
        }
        None
    }
}
