use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::domain::models::{Fingerprint, VideoSignature};
use crate::error::{Result, SubtitlerError};

pub const BLOCK_SIZE: u64 = 65536;
pub const MIN_FILE_SIZE: u64 = BLOCK_SIZE * 2;

/// Computes the lookup fingerprint of a video file along with its size.
pub fn compute(path: &Path) -> Result<VideoSignature> {
    let mut file = File::open(path).map_err(|e| SubtitlerError::io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| SubtitlerError::io(path, e))?
        .len();

    if size < MIN_FILE_SIZE {
        return Err(SubtitlerError::Size {
            path: path.to_path_buf(),
            size,
        });
    }

    let fingerprint = fingerprint_reader(&mut file, size).map_err(|e| SubtitlerError::io(path, e))?;
    Ok(VideoSignature { fingerprint, size })
}

/// Sums `size` and the head and tail blocks read as little-endian 64-bit
/// words, wrapping on overflow. `size` must be at least [`MIN_FILE_SIZE`].
pub fn fingerprint_reader<R: Read + Seek>(reader: &mut R, size: u64) -> std::io::Result<Fingerprint> {
    let mut hash = size;
    let mut block = vec![0u8; BLOCK_SIZE as usize];

    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut block)?;
    hash = sum_words(hash, &block);

    reader.seek(SeekFrom::Start(size.saturating_sub(BLOCK_SIZE)))?;
    reader.read_exact(&mut block)?;
    hash = sum_words(hash, &block);

    Ok(Fingerprint(hash))
}

fn sum_words(start: u64, block: &[u8]) -> u64 {
    block.chunks_exact(8).fold(start, |acc, word| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(word);
        acc.wrapping_add(i64::from_le_bytes(bytes) as u64)
    })
}
