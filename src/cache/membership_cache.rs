//! Two-tier membership cache
//!
//! Maps a region key to the clusters its traversal classified. The hot
//! tier is an in-memory LRU; the optional disk tier stores one file per key:
//!
//! ```text
//! | magic "QRMC" | version u8 | crc32 u32 LE | full_len u32 LE | full bitmap | partial bitmap |
//! ```
//!
//! The CRC covers everything after itself. Any unreadable entry is a miss.
//! Only membership is stored, never evaluation results.

use crate::config::CacheConfig;
use crate::error::{RepairError, Result};
use crate::search::Membership;
use lru::LruCache;
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const MAGIC: &[u8; 4] = b"QRMC";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 4;

#[derive(Debug)]
pub struct MembershipCache {
    hot: Mutex<LruCache<String, Arc<Membership>>>,
    dir: Option<PathBuf>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    disk_hits: AtomicU64,
}

impl MembershipCache {
    /// Open the cache; creates the disk directory when one is configured.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        if let Some(dir) = &config.dir {
            fs::create_dir_all(dir)?;
        }
        let capacity = NonZeroUsize::new(config.hot_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            hot: Mutex::new(LruCache::new(capacity)),
            dir: config.dir.clone(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
        })
    }

    /// In-memory only
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            hot: Mutex::new(LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))),
            dir: None,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("rp_filtered_{}.qrmc", key)))
    }

    /// Look up a key. Entries naming clusters outside `node_count` are
    /// treated as stale.
    pub fn get(&self, key: &str, node_count: usize) -> Option<Arc<Membership>> {
        if let Some(found) = self.hot.lock().get(key) {
            if found.fits(node_count) {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(found));
            }
        }

        if let Some(path) = self.entry_path(key) {
            if path.exists() {
                match read_entry(&path) {
                    Ok(membership) if membership.fits(node_count) => {
                        let membership = Arc::new(membership);
                        self.hot.lock().put(key.to_string(), Arc::clone(&membership));
                        self.hit_count.fetch_add(1, Ordering::Relaxed);
                        self.disk_hits.fetch_add(1, Ordering::Relaxed);
                        return Some(membership);
                    }
                    Ok(_) => {
                        warn!("[MembershipCache] Entry {} references unknown clusters, ignoring", key);
                    }
                    Err(e) => {
                        warn!("[MembershipCache] Unreadable entry {}: {}", path.display(), e);
                    }
                }
            }
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a membership in both tiers. Disk failures are logged and dropped.
    pub fn put(&self, key: &str, membership: &Membership) -> Arc<Membership> {
        let shared = Arc::new(membership.clone());
        self.hot.lock().put(key.to_string(), Arc::clone(&shared));

        if let Some(path) = self.entry_path(key) {
            if let Err(e) = write_entry(&path, membership) {
                warn!("[MembershipCache] Failed to persist {}: {}", path.display(), e);
            }
        }
        shared
    }

    /// Drop a key from both tiers
    pub fn invalidate(&self, key: &str) {
        self.hot.lock().pop(key);
        if let Some(path) = self.entry_path(key) {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("[MembershipCache] Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Empty the hot tier only; disk entries survive
    pub fn clear_hot(&self) {
        self.hot.lock().clear();
        debug!("[MembershipCache] Hot tier cleared");
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count.load(Ordering::Relaxed) as f64;
        let misses = self.miss_count.load(Ordering::Relaxed) as f64;

        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hot = self.hot.lock();

        CacheStats {
            capacity: hot.cap().get(),
            size: hot.len(),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }
}

fn bitmap(ids: &[u32]) -> RoaringBitmap {
    ids.iter().copied().collect()
}

fn encode(membership: &Membership) -> Result<Vec<u8>> {
    let full = bitmap(&membership.full);
    let partial = bitmap(&membership.partial);

    let mut body = Vec::with_capacity(4 + full.serialized_size() + partial.serialized_size());
    body.extend_from_slice(&(full.serialized_size() as u32).to_le_bytes());
    full.serialize_into(&mut body)?;
    partial.serialize_into(&mut body)?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<Membership> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(RepairError::CacheCorruption(format!("truncated entry ({} bytes)", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(RepairError::CacheCorruption("bad magic".into()));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(RepairError::CacheCorruption(format!("unsupported version {}", bytes[4])));
    }

    let stored = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    let body = &bytes[HEADER_LEN..];
    let actual = crc32fast::hash(body);
    if stored != actual {
        return Err(RepairError::CacheCorruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored, actual
        )));
    }

    let full_len = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let rest = &body[4..];
    if full_len > rest.len() {
        return Err(RepairError::CacheCorruption("full bitmap overruns entry".into()));
    }
    let full = RoaringBitmap::deserialize_from(&rest[..full_len])
        .map_err(|e| RepairError::CacheCorruption(e.to_string()))?;
    let partial = RoaringBitmap::deserialize_from(&rest[full_len..])
        .map_err(|e| RepairError::CacheCorruption(e.to_string()))?;

    Ok(Membership {
        full: full.iter().collect(),
        partial: partial.iter().collect(),
    })
}

fn read_entry(path: &Path) -> Result<Membership> {
    decode(&fs::read(path)?)
}

/// Write to a sibling temp file, then rename over the entry
fn write_entry(path: &Path, membership: &Membership) -> Result<()> {
    let bytes = encode(membership)?;
    let temp_path = path.with_extension("qrmc.tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub capacity: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hits served by the disk tier
    pub disk_hits: u64,
    pub hit_rate: f64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Membership cache: {}/{} hot entries, {:.1}% hit rate ({} hits, {} from disk, {} misses)",
            self.size,
            self.capacity,
            self.hit_rate * 100.0,
            self.hits,
            self.disk_hits,
            self.misses
        )
    }
}
