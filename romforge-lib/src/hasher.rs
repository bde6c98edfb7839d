use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::RomForgeError;

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Format a CRC32 value as the 8-char lowercase hex fingerprint used by the catalog.
pub fn format_fingerprint(crc: u32) -> String {
    format!("{crc:08x}")
}

/// Compute the CRC32 fingerprint of everything `reader` yields, streaming in 64KB chunks.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    fingerprint_reader_with_progress(reader, 0, &|_, _| {})
}

/// Compute the CRC32 fingerprint with a progress callback.
/// The callback receives (bytes_processed, total_bytes); `total_bytes` is
/// whatever the caller passed in.
pub fn fingerprint_reader_with_progress<R: Read>(
    reader: &mut R,
    total_bytes: u64,
    progress: &dyn Fn(u64, u64),
) -> std::io::Result<String> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut processed: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        processed += n as u64;
        progress(processed, total_bytes);
    }

    Ok(format_fingerprint(hasher.finalize()))
}

/// Compute the CRC32 fingerprint of a file on disk.
///
/// Depends only on the file's bytes, never its name or timestamps.
pub fn fingerprint_file(path: &Path) -> Result<String, RomForgeError> {
    fingerprint_file_with_progress(path, &|_, _| {})
}

/// Compute a file's fingerprint, reporting (bytes_processed, file_size).
pub fn fingerprint_file_with_progress(
    path: &Path,
    progress: &dyn Fn(u64, u64),
) -> Result<String, RomForgeError> {
    let mut file = File::open(path).map_err(|e| RomForgeError::file_read(path, e))?;
    let file_size = file
        .metadata()
        .map_err(|e| RomForgeError::file_read(path, e))?
        .len();
    fingerprint_reader_with_progress(&mut file, file_size, progress)
        .map_err(|e| RomForgeError::file_read(path, e))
}
