//! Load-once model cache
//!
//! The artifact is read and decoded on first use. Concurrent first callers
//! block on a single initialisation; afterwards the slot is read without
//! locking. A failed load is remembered and returned to every later caller,
//! storage is not probed again.

use crate::error::PredictorError;
use crate::models::artifact::ModelArtifact;
use crate::models::loader::ModelLoader;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of the cached artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

type Slot = Result<Arc<ModelArtifact>, PredictorError>;

/// Holds the single model artifact served by this process
pub struct ModelCache {
    path: PathBuf,
    loader: ModelLoader,
    slot: OnceCell<Slot>,
    /// Set while a first load is running; the slot decides every other state
    loading: AtomicBool,
}

/// Clears the loading flag if the loader panics. The cell stays empty in
/// that case and the next caller retries.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(false, Ordering::Release);
        }
    }
}

impl ModelCache {
    pub fn new(path: impl Into<PathBuf>, loader: ModelLoader) -> Self {
        Self {
            path: path.into(),
            loader,
            slot: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Configured artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> CacheState {
        match self.slot.get() {
            Some(Ok(_)) => CacheState::Loaded,
            Some(Err(_)) => CacheState::Failed,
            None if self.loading.load(Ordering::Acquire) => CacheState::Loading,
            None => CacheState::Unloaded,
        }
    }

    /// Return the cached artifact, loading it on first call.
    pub fn get_model(&self) -> Result<Arc<ModelArtifact>, PredictorError> {
        self.slot
            .get_or_init(|| {
                self.loading.store(true, Ordering::Release);
                let _guard = LoadingGuard(&self.loading);
                let slot = self.loader.load(&self.path).map(Arc::new);
                debug!(
                    path = %self.path.display(),
                    loaded = slot.is_ok(),
                    "Model cache populated"
                );
                slot
            })
            .clone()
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loader::{ArtifactFormat, ArtifactSource};
    use std::io;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    const LOGISTIC: &str = r#"{"estimator": {"kind": "logistic_regression", "coef": [0,0.1,0,0,0,0,0,0], "intercept": -12.0}}"#;

    /// In-memory source counting how often storage is touched
    struct CountingSource {
        bytes: Option<Vec<u8>>,
        reads: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ArtifactSource for CountingSource {
        fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.bytes
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn counting_cache(bytes: Option<&str>, delay: Duration) -> (ModelCache, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            bytes: bytes.map(|b| b.as_bytes().to_vec()),
            reads: reads.clone(),
            delay,
        };
        let loader = ModelLoader::with_source(Box::new(source), ArtifactFormat::Json);
        (ModelCache::new("models/test.json", loader), reads)
    }

    #[test]
    fn test_loads_once_and_returns_same_instance() {
        let (cache, reads) = counting_cache(Some(LOGISTIC), Duration::ZERO);
        assert_eq!(cache.state(), CacheState::Unloaded);

        let first = cache.get_model().unwrap();
        let second = cache.get_model().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(), CacheState::Loaded);
    }

    #[test]
    fn test_concurrent_first_access_reads_once() {
        let (cache, reads) = counting_cache(Some(LOGISTIC), Duration::from_millis(300));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.get_model().unwrap())
            })
            .collect();

        // the first reader is now sleeping inside the load
        while reads.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        assert_eq!(cache.state(), CacheState::Loading);

        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.state(), CacheState::Loaded);
    }

    /// Source whose first read panics
    struct PanicOnceSource {
        reads: AtomicUsize,
    }

    impl ArtifactSource for PanicOnceSource {
        fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("storage driver crashed");
            }
            Ok(LOGISTIC.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_panicking_load_does_not_stick_in_loading() {
        let source = PanicOnceSource {
            reads: AtomicUsize::new(0),
        };
        let loader = ModelLoader::with_source(Box::new(source), ArtifactFormat::Json);
        let cache = ModelCache::new("models/test.json", loader);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| cache.get_model()));
        assert!(outcome.is_err());
        assert_eq!(cache.state(), CacheState::Unloaded);

        assert!(cache.get_model().is_ok());
        assert_eq!(cache.state(), CacheState::Loaded);
    }

    #[test]
    fn test_missing_artifact_failure_is_remembered() {
        let (cache, reads) = counting_cache(None, Duration::ZERO);

        let first = cache.get_model().unwrap_err();
        let second = cache.get_model().unwrap_err();

        match &first {
            PredictorError::ModelNotFound { path, .. } => {
                assert_eq!(path, Path::new("models/test.json"))
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(), CacheState::Failed);
    }

    #[test]
    fn test_corrupt_artifact_failure_is_remembered() {
        let (cache, reads) = counting_cache(Some("{\"estimator\": 42}"), Duration::ZERO);

        let first = cache.get_model().unwrap_err();
        assert_eq!(first.kind(), "model_corrupt");
        assert_eq!(cache.get_model().unwrap_err(), first);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}
