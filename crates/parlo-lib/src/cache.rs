//! Fingerprint-keyed audio artifact cache.
//!
//! Every synthesis request funnels through [`CacheStore::get_or_create`].
//! A hit returns immediately with no backend call — the same sentence,
//! voice, and speed recur on every auto-repeat pass, so this is where the
//! drill's latency and backend cost go away. A miss generates through the
//! [`Synthesizer`], writes `<fingerprint>.wav.partial`, then renames into
//! place: a failed or abandoned generation never leaves an indexed entry or
//! a half-written file under the real name.
//!
//! Concurrency discipline is single-writer-per-key: a per-fingerprint async
//! lock serializes callers racing on the same clip (one backend call, the
//! loser gets the cache hit), while distinct fingerprints generate freely in
//! parallel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use parlo_core::fingerprint::Fingerprint;
use parlo_core::text::{is_speakable, normalize};
use parlo_core::wav::estimate_duration;
use parlo_core::{Error, Result};

use crate::synth::Synthesizer;

/// A generated or cached clip plus its known duration.
#[derive(Debug)]
pub struct AudioArtifact {
    pub fingerprint: Fingerprint,
    /// On-disk home of the clip. Best-effort: playback reads `bytes`.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub duration_secs: f32,
}

struct CacheSlot {
    artifact: Arc<AudioArtifact>,
    last_used: u64,
}

pub struct CacheStore<S> {
    synth: S,
    dir: PathBuf,
    /// Retention cap; least-recently-used idle entries are evicted above it.
    max_entries: usize,
    index: Mutex<HashMap<Fingerprint, CacheSlot>>,
    locks: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
    use_counter: AtomicU64,
}

impl<S: Synthesizer> CacheStore<S> {
    pub fn new(synth: S, dir: PathBuf, max_entries: usize) -> Self {
        Self {
            synth,
            dir,
            max_entries: max_entries.max(1),
            index: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            use_counter: AtomicU64::new(0),
        }
    }

    /// Return the cached artifact for `(text, voice, speed)`, generating it
    /// first if needed. Empty or whitespace-only text is rejected with
    /// [`Error::NoContent`] before anything else happens.
    pub async fn get_or_create(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Arc<AudioArtifact>> {
        let text = normalize(text);
        if !is_speakable(&text) {
            return Err(Error::NoContent);
        }
        let fp = Fingerprint::compute(&text, voice, speed);

        if let Some(artifact) = self.lookup(&fp).await {
            debug!(%fp, "cache hit");
            return Ok(artifact);
        }

        // Serialize generation per fingerprint. Whoever loses the race
        // re-checks the index and takes the winner's artifact.
        let key_lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(fp.clone()).or_default().clone()
        };
        let _guard = key_lock.lock().await;

        if let Some(artifact) = self.lookup(&fp).await {
            debug!(%fp, "cache hit after wait");
            return Ok(artifact);
        }

        let bytes = self.synth.synthesize(&text, voice, speed).await?;
        let duration_secs = estimate_duration(&bytes);
        let path = self.dir.join(fp.file_name());
        self.store_file(&path, &bytes).await;

        let artifact = Arc::new(AudioArtifact {
            fingerprint: fp.clone(),
            path,
            bytes,
            duration_secs,
        });

        let mut index = self.index.lock().await;
        index.insert(
            fp.clone(),
            CacheSlot {
                artifact: artifact.clone(),
                last_used: self.next_use(),
            },
        );
        self.evict_over_cap(&mut index);
        debug!(%fp, duration_secs, "cached new artifact");

        Ok(artifact)
    }

    async fn lookup(&self, fp: &Fingerprint) -> Option<Arc<AudioArtifact>> {
        let mut index = self.index.lock().await;
        let slot = index.get_mut(fp)?;
        slot.last_used = self.next_use();
        Some(slot.artifact.clone())
    }

    /// Partial-write-then-rename, so a crash or cancellation mid-write can
    /// never leave a corrupt file under the fingerprint's real name. Disk
    /// trouble is logged and tolerated — the in-memory artifact stays
    /// authoritative for this session.
    async fn store_file(&self, path: &std::path::Path, bytes: &[u8]) {
        let partial = path.with_extension("wav.partial");
        let result: std::io::Result<()> = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&partial, bytes).await?;
            tokio::fs::rename(&partial, path).await
        }
        .await;
        if let Err(e) = result {
            warn!("failed to store clip at {}: {e}", path.display());
        }
    }

    fn next_use(&self) -> u64 {
        self.use_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Evict least-recently-used idle entries above the cap. An artifact
    /// with outstanding references is mid-playback (or queued) and is never
    /// touched.
    fn evict_over_cap(&self, index: &mut HashMap<Fingerprint, CacheSlot>) {
        while index.len() > self.max_entries {
            let victim = index
                .iter()
                .filter(|(_, slot)| Arc::strong_count(&slot.artifact) == 1)
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(fp, _)| fp.clone());
            let Some(fp) = victim else { break };
            if let Some(slot) = index.remove(&fp) {
                Self::remove_file(&slot.artifact.path);
                debug!(%fp, "evicted clip");
            }
        }
    }

    /// Drop every idle entry and its backing file. Called at session end.
    pub async fn purge(&self) {
        let mut index = self.index.lock().await;
        index.retain(|_, slot| {
            if Arc::strong_count(&slot.artifact) > 1 {
                return true;
            }
            Self::remove_file(&slot.artifact.path);
            false
        });
        self.locks.lock().await.clear();
    }

    fn remove_file(path: &std::path::Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to delete clip {}: {e}", path.display());
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    pub async fn contains(&self, text: &str, voice: &str, speed: f32) -> bool {
        let fp = Fingerprint::compute(&normalize(text), voice, speed);
        self.index.lock().await.contains_key(&fp)
    }
}
