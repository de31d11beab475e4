//! Streaming SHA-256 content digests.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use cdnsync_core::ContentDigest;

use crate::error::{io_err, SyncError};

const BLOCK_SIZE: usize = 64 * 1024;

/// Hash a file's full byte stream without buffering it whole.
pub fn hash_file(path: &Path) -> Result<ContentDigest, SyncError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    hash_reader(BufReader::new(file)).map_err(|e| io_err(path, e))
}

/// Hash any reader in fixed-size blocks.
pub fn hash_reader(mut reader: impl Read) -> std::io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest(hex::encode(hasher.finalize())))
}
