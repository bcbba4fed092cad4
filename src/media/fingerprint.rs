use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::domain::models::FileFingerprint;
use crate::error::{Error, Result};

pub const BLOCK_SIZE: u64 = 64 * 1024;
pub const MIN_FILE_SIZE: u64 = 2 * BLOCK_SIZE;

/// Size-seeded 64-bit sum of the first and last 64 KiB of a file.
///
/// This is the catalog's movie hash: every implementation must agree on it
/// bit for bit, so the arithmetic wraps at 64 bits exactly like the reference.
pub fn fingerprint(path: &Path) -> Result<FileFingerprint> {
    let size = path.metadata().map_err(|e| Error::io(path, e))?.len();
    if size < MIN_FILE_SIZE {
        return Err(Error::TooSmall {
            path: path.to_path_buf(),
            size,
            min: MIN_FILE_SIZE,
        });
    }

    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let hash = hash_reader(&mut file, size).map_err(|e| Error::io(path, e))?;

    Ok(FileFingerprint {
        hash: format!("{hash:016x}"),
        size,
    })
}

fn hash_reader<R: Read + Seek>(reader: &mut R, size: u64) -> std::io::Result<u64> {
    let mut hash = size;
    let mut block = vec![0u8; BLOCK_SIZE as usize];

    for offset in [0, size.saturating_sub(BLOCK_SIZE)] {
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut block)?;
        hash = sum_block(hash, &block);
    }

    Ok(hash)
}

fn sum_block(mut hash: u64, block: &[u8]) -> u64 {
    // Signed and unsigned addition agree modulo 2^64.
    for word in block.chunks_exact(8) {
        let mut le = [0u8; 8];
        le.copy_from_slice(word);
        hash = hash.wrapping_add(u64::from_le_bytes(le));
    }
    hash
}
