//! Durable storage for term inventories.
//!
//! One file per `(version, organism, column)` key. Files are written to a
//! temporary name, synced, then renamed into place, so a concurrent reader
//! sees either the previous file or the complete new one.
//!
//! # File Format
//!
//! The inventory file format (`.cxgi`) is a binary format:
//!
//! ```text
//! [4 bytes]  Magic: "CXGI"
//! [4 bytes]  Format version (u32 LE)
//! [4 + n]    Census version (u32 LE length + UTF-8)
//! [4 + n]    Organism (u32 LE length + UTF-8)
//! [4 + n]    Column (u32 LE length + UTF-8)
//! [4 + n]    Fetch timestamp, RFC 3339 (u32 LE length + UTF-8)
//! [8 bytes]  Term count (u64 LE)
//! [32 bytes] SHA-256 of the payload
//! [4 + n]    Payload: bincode-encoded sorted list of terms
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::InventoryKey;
use crate::error::{EnhancerError, EnhancerResult};

/// Magic bytes for inventory files.
const INVENTORY_MAGIC: &[u8; 4] = b"CXGI";

/// Current inventory file format version.
const INVENTORY_VERSION: u32 = 1;

/// File extension for inventory files.
pub const INVENTORY_EXTENSION: &str = "cxgi";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A serialized term inventory with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryFile {
    /// Key the inventory was fetched for.
    pub key: InventoryKey,
    /// When the census was read.
    pub fetched_at: DateTime<Utc>,
    /// Terms, sorted.
    pub terms: Vec<String>,
}

impl InventoryFile {
    /// Creates a file for `terms`, stamped with the current time.
    pub fn new(key: InventoryKey, terms: &HashSet<String>) -> Self {
        let mut terms: Vec<String> = terms.iter().cloned().collect();
        terms.sort_unstable();
        Self {
            key,
            fetched_at: Utc::now(),
            terms,
        }
    }

    /// Returns the terms as a set.
    pub fn term_set(&self) -> HashSet<String> {
        self.terms.iter().cloned().collect()
    }

    fn hash_payload(payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.finalize().into()
    }

    /// Encodes the file into bytes.
    pub fn encode(&self) -> EnhancerResult<Vec<u8>> {
        let payload = bincode::encode_to_vec(&self.terms, bincode::config::standard())
            .map_err(|e| EnhancerError::SerializationError(e.to_string()))?;

        let mut out = Vec::with_capacity(payload.len() + 128);
        out.extend_from_slice(INVENTORY_MAGIC);
        out.extend_from_slice(&INVENTORY_VERSION.to_le_bytes());
        put_str(&mut out, &self.key.version)?;
        put_str(&mut out, &self.key.organism)?;
        put_str(&mut out, &self.key.column)?;
        put_str(&mut out, &self.fetched_at.to_rfc3339())?;
        out.extend_from_slice(&(self.terms.len() as u64).to_le_bytes());
        out.extend_from_slice(&Self::hash_payload(&payload));
        put_len(&mut out, payload.len())?;
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decodes a file from bytes, verifying every header field.
    pub fn decode(bytes: &[u8]) -> EnhancerResult<Self> {
        let mut cursor = Cursor::new(bytes);

        if cursor.take(4)? != INVENTORY_MAGIC {
            return Err(EnhancerError::invalid_format("Invalid magic bytes"));
        }

        let version = cursor.u32()?;
        if version != INVENTORY_VERSION {
            return Err(EnhancerError::invalid_format(format!(
                "Unsupported version: {} (expected {})",
                version, INVENTORY_VERSION
            )));
        }

        let key = InventoryKey {
            version: cursor.string()?,
            organism: cursor.string()?,
            column: cursor.string()?,
        };

        let stamp = cursor.string()?;
        let fetched_at = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|e| EnhancerError::invalid_format(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        let term_count = cursor.u64()?;

        let mut expected_hash = [0u8; 32];
        expected_hash.copy_from_slice(cursor.take(32)?);

        let payload_len = cursor.u32()? as usize;
        let payload = cursor.take(payload_len)?;
        if !cursor.is_empty() {
            return Err(EnhancerError::invalid_format("Trailing bytes after payload"));
        }

        let actual_hash = Self::hash_payload(payload);
        if actual_hash != expected_hash {
            return Err(EnhancerError::HashMismatch {
                expected: hex::encode(&expected_hash),
                actual: hex::encode(&actual_hash),
            });
        }

        let (terms, _): (Vec<String>, usize) =
            bincode::decode_from_slice(payload, bincode::config::standard())
                .map_err(|e| EnhancerError::DeserializationError(e.to_string()))?;

        if terms.len() as u64 != term_count {
            return Err(EnhancerError::invalid_format(format!(
                "Term count mismatch: expected {}, got {}",
                term_count,
                terms.len()
            )));
        }

        Ok(Self {
            key,
            fetched_at,
            terms,
        })
    }

    /// Atomically writes the file to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> EnhancerResult<()> {
        let path = path.as_ref();
        let bytes = self.encode()?;
        write_atomic(path, &bytes)
    }

    /// Reads and verifies the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> EnhancerResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| EnhancerError::io_error(path, e))?;
        Self::decode(&bytes)
    }
}

/// Directory of inventory files.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    dir: PathBuf,
}

impl InventoryStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file path for `key`.
    pub fn path_for(&self, key: &InventoryKey) -> PathBuf {
        self.dir.join(file_name(key))
    }

    /// Loads the inventory for `key`.
    ///
    /// Returns `Ok(None)` if no file exists, and an error if the file is
    /// unreadable, corrupt, or was written for a different key.
    pub fn load(&self, key: &InventoryKey) -> EnhancerResult<Option<HashSet<String>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let file = InventoryFile::load(&path)?;
        if &file.key != key {
            return Err(EnhancerError::invalid_format(format!(
                "File {} holds inventory for {}",
                path.display(),
                file.key
            )));
        }
        Ok(Some(file.term_set()))
    }

    /// Saves the inventory for `key`, returning the file path.
    pub fn save(&self, key: &InventoryKey, terms: &HashSet<String>) -> EnhancerResult<PathBuf> {
        let path = self.path_for(key);
        InventoryFile::new(key.clone(), terms).save(&path)?;
        Ok(path)
    }

    /// Removes every inventory file in the directory, returning how many
    /// were removed. A missing directory counts as empty.
    pub fn clear(&self) -> EnhancerResult<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(EnhancerError::io_error(&self.dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| EnhancerError::io_error(&self.dir, e))?.path();
            if path.extension().and_then(|s| s.to_str()) == Some(INVENTORY_EXTENSION) {
                fs::remove_file(&path).map_err(|e| EnhancerError::io_error(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// `{version}_{organism}_{column}.cxgi`, with the organism reduced to ASCII
/// alphanumerics and other components restricted to `[A-Za-z0-9._-]`.
fn file_name(key: &InventoryKey) -> String {
    let organism: String = key
        .organism
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!(
        "{}_{}_{}.{}",
        sanitize(&key.version),
        organism,
        sanitize(&key.column),
        INVENTORY_EXTENSION
    )
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> EnhancerResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| EnhancerError::invalid_format("Inventory path has no parent"))?;
    fs::create_dir_all(parent).map_err(|e| EnhancerError::io_error(parent, e))?;

    let tmp = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("inventory"),
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(EnhancerError::io_error(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(EnhancerError::io_error(path, e));
    }

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

fn put_len(out: &mut Vec<u8>, len: usize) -> EnhancerResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| EnhancerError::SerializationError(format!("Field too large: {} bytes", len)))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn put_str(out: &mut Vec<u8>, s: &str) -> EnhancerResult<()> {
    put_len(out, s.len())?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Bounds-checked reader over a byte slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn take(&mut self, n: usize) -> EnhancerResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| EnhancerError::invalid_format("Truncated file"))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> EnhancerResult<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> EnhancerResult<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn string(&mut self) -> EnhancerResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| EnhancerError::invalid_format("Invalid UTF-8 in header"))
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
