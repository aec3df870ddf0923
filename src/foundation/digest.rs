use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::Digest as _;

use crate::foundation::error::{DcpError, DcpResult};
use xxhash_rust::xxh3::Xxh3;

/// Length in bytes of a frame content digest.
pub const DIGEST_LEN: usize = 32;

/// Raw SHA-256 content digest.
pub type ContentDigest = [u8; DIGEST_LEN];

/// Incremental SHA-256 over frame or asset bytes.
#[derive(Clone, Default)]
pub struct Digester {
    inner: sha2::Sha256,
}

impl Digester {
    /// Start a new digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes.
    pub fn add(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finish and return the raw digest.
    pub fn finish(self) -> ContentDigest {
        self.inner.finalize().into()
    }

    /// Digest of a single buffer.
    pub fn digest(bytes: &[u8]) -> ContentDigest {
        sha2::Sha256::digest(bytes).into()
    }
}

/// SHA-256 of the file at `path`, read in chunks; `progress` receives the bytes read so far.
pub fn digest_file(path: &Path, mut progress: impl FnMut(u64)) -> DcpResult<ContentDigest> {
    let mut f = File::open(path).map_err(|e| DcpError::io(path, "open for digest", e))?;
    let mut d = Digester::new();
    let mut buf = vec![0u8; 1 << 20];
    let mut done = 0u64;
    loop {
        let n = f
            .read(&mut buf)
            .map_err(|e| DcpError::io(path, "read for digest", e))?;
        if n == 0 {
            break;
        }
        d.add(&buf[..n]);
        done += n as u64;
        progress(done);
    }
    Ok(d.finish())
}

/// Lower-case hex rendering of a digest.
pub fn digest_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// Stable 128-bit fingerprint of a set of parameters.
///
/// Used to name and identify picture assets so that unchanged picture parameters map onto the
/// same on-disk asset across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl Fingerprint {
    /// Combined 128-bit value.
    pub fn as_u128(self) -> u128 {
        (u128::from(self.hi) << 64) | u128::from(self.lo)
    }

    /// Hex rendering, suitable for file names.
    pub fn to_hex(self) -> String {
        format!("{:016x}{:016x}", self.hi, self.lo)
    }
}

pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_bool(&mut self, v: bool) {
        self.write_bytes(&[u8::from(v)]);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    pub(crate) fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/digest.rs"]
mod tests;
