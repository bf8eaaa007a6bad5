use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};

const CHUNK_SIZE: u64 = 65536;
const WORD_SIZE: usize = 8;

/// 64-bit content hash used as the search key of the indexed subtitle service.
///
/// The value is the file size plus the first and last 64 KiB read as
/// little-endian `u64` words, summed with wrapping arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of_file(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size < CHUNK_SIZE * 2 {
            return Err(Error::SizeTooSmall);
        }

        let mut reader = BufReader::new(File::open(path)?);
        let mut hash = size;
        hash = hash.wrapping_add(sum_chunk(&mut reader)?);
        reader.seek(SeekFrom::Start(size.saturating_sub(CHUNK_SIZE)))?;
        hash = hash.wrapping_add(sum_chunk(&mut reader)?);

        Ok(Self(hash))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.value())
    }
}

fn sum_chunk(reader: &mut impl Read) -> Result<u64> {
    let mut chunk = vec![0u8; CHUNK_SIZE as usize];
    reader.read_exact(&mut chunk)?;
    Ok(chunk
        .chunks_exact(WORD_SIZE)
        .map(|word| u64::from_le_bytes(word.try_into().unwrap_or([0; WORD_SIZE])))
        .fold(0u64, |acc, word| acc.wrapping_add(word)))
}
