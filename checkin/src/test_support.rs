//! Test-only collaborators for driving the sequencer without a UI.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::completion::ExitCallback;
use crate::core::types::{Arm, StepId};
use crate::io::config::CheckinPaths;
use crate::io::store::{FileStore, KeyValueStore, MemoryStore, StoreError};
use crate::navigation::{Navigator, ReadinessGate};
use crate::sequencer::Sequencer;

/// Navigator that records every command and streams it to the test.
pub struct RecordingNavigator {
    log: Mutex<Vec<StepId>>,
    tx: mpsc::UnboundedSender<StepId>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<StepId>>,
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            log: Mutex::new(Vec::new()),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

impl RecordingNavigator {
    /// Every step navigated to so far, in order.
    pub fn navigated(&self) -> Vec<StepId> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait up to `timeout` for the next navigation command.
    pub async fn next_navigation(&self, timeout: Duration) -> Option<StepId> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, step: StepId) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
        let _ = self.tx.send(step);
    }
}

/// In-memory store that counts writes, fails on demand and can hold writes.
#[derive(Debug)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    paused: watch::Sender<bool>,
}

impl Default for RecordingStore {
    fn default() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            inner: MemoryStore::new(),
            writes: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            paused,
        }
    }
}

impl RecordingStore {
    /// Number of `set` and `remove` calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every access to `key` fail until [`RecordingStore::heal`].
    pub fn fail_key(&self, key: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Hold every `set` and `remove` until [`RecordingStore::resume_writes`].
    pub fn pause_writes(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume_writes(&self) {
        self.paused.send_replace(false);
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.ok().flatten()
    }

    pub async fn seed(&self, key: &str, value: &str) {
        let _ = self.inner.set(key, value).await;
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(key) {
            return Err(StoreError::Backend {
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_unpaused(&self) {
        let mut rx = self.paused.subscribe();
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.wait_unpaused().await;
        self.check(key)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.wait_unpaused().await;
        self.check(key)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }
}

/// Counts calls of the host exit callback.
#[derive(Debug, Clone, Default)]
pub struct ExitProbe {
    count: Arc<AtomicUsize>,
}

impl ExitProbe {
    pub fn callback(&self) -> ExitCallback {
        let count = Arc::clone(&self.count);
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

pub type TestSequencer = Sequencer<RecordingStore, RecordingNavigator>;

/// A sequencer wired to recording collaborators.
pub struct Harness {
    pub sequencer: Arc<TestSequencer>,
    pub store: Arc<RecordingStore>,
    pub exits: ExitProbe,
}

impl Harness {
    /// Fresh sequencer on `Welcome` with an empty store and a closed gate.
    pub fn new(arm: Arm) -> Self {
        Self::with_store(arm, Arc::new(RecordingStore::default()))
    }

    pub fn with_store(arm: Arm, store: Arc<RecordingStore>) -> Self {
        let exits = ExitProbe::default();
        let sequencer = Sequencer::new(
            arm,
            Arc::clone(&store),
            RecordingNavigator::default(),
            ReadinessGate::new(),
            exits.callback(),
        );
        Self {
            sequencer: Arc::new(sequencer),
            store,
            exits,
        }
    }

    pub fn navigator(&self) -> &RecordingNavigator {
        self.sequencer.navigator()
    }
}

/// Temporary `.checkin/` root backed by a [`FileStore`].
pub struct TempCheckin {
    dir: tempfile::TempDir,
    pub paths: CheckinPaths,
}

impl TempCheckin {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let paths = CheckinPaths::new(dir.path());
        Ok(Self { dir, paths })
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn store_path(&self) -> PathBuf {
        self.paths.checkin_dir.join("state.json")
    }

    pub fn open_store(&self) -> FileStore {
        FileStore::new(self.store_path())
    }
}
