//! # Transcoder Loader
//!
//! Loads the external transcoder from an ordered list of [`ToolSource`]s,
//! at most once per process.
//!
//! ## States
//!
//! ```text
//! Unloaded ──load()──▶ Loading ──first source ok──▶ Loaded
//!                         │
//!                         └──every source failed──▶ FailedPermanently
//! ```
//!
//! Callers arriving while a load is in flight await the same attempt. A
//! failed load is sticky: later calls fail fast with
//! [`LoaderError::FailedPermanently`] until [`ToolLoader::reset`] is called.

use crate::error::LoaderError;
use bridge_traits::{ToolSource, TranscoderTool};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn TranscoderTool>, LoaderError>>>;

enum LoaderState {
    Unloaded,
    Loading(LoadFuture),
    Loaded(Arc<dyn TranscoderTool>),
    FailedPermanently(LoaderError),
}

/// Observable loader state, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStatus {
    Unloaded,
    Loading,
    Loaded,
    FailedPermanently,
}

/// Single-flight loader for the external transcoder.
pub struct ToolLoader {
    sources: Arc<Vec<Arc<dyn ToolSource>>>,
    state: Mutex<LoaderState>,
    attempts: Arc<AtomicUsize>,
}

impl ToolLoader {
    pub fn new(sources: Vec<Arc<dyn ToolSource>>) -> Self {
        Self {
            sources: Arc::new(sources),
            state: Mutex::new(LoaderState::Unloaded),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn status(&self) -> LoaderStatus {
        match &*self.state.lock() {
            LoaderState::Unloaded => LoaderStatus::Unloaded,
            LoaderState::Loading(_) => LoaderStatus::Loading,
            LoaderState::Loaded(_) => LoaderStatus::Loaded,
            LoaderState::FailedPermanently(_) => LoaderStatus::FailedPermanently,
        }
    }

    /// Number of load attempts started since creation or the last reset.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Descriptions of the configured sources, in order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.describe()).collect()
    }

    /// Return the loaded tool, loading it first if needed.
    ///
    /// The state lock is only held to inspect or replace the state, never
    /// across an await.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<dyn TranscoderTool>, LoaderError> {
        let in_flight = {
            let mut state = self.state.lock();
            match &*state {
                LoaderState::Loaded(tool) => return Ok(tool.clone()),
                LoaderState::FailedPermanently(err) => {
                    debug!("Transcoder load failed earlier, not retrying");
                    return Err(LoaderError::FailedPermanently(err.to_string()));
                }
                LoaderState::Loading(future) => future.clone(),
                LoaderState::Unloaded => {
                    let future = self.start_attempt();
                    *state = LoaderState::Loading(future.clone());
                    future
                }
            }
        };

        let outcome = in_flight.clone().await;

        let mut state = self.state.lock();
        // Only the waiters of the current attempt may settle it; a reset
        // during the await leaves the new state alone.
        if let LoaderState::Loading(current) = &*state {
            if current.ptr_eq(&in_flight) {
                *state = match &outcome {
                    Ok(tool) => LoaderState::Loaded(tool.clone()),
                    Err(err) => LoaderState::FailedPermanently(err.clone()),
                };
            }
        }

        outcome
    }

    /// Forget any loaded tool or recorded failure.
    pub fn reset(&self) {
        *self.state.lock() = LoaderState::Unloaded;
        self.attempts.store(0, Ordering::SeqCst);
        debug!("Transcoder loader reset");
    }

    fn start_attempt(&self) -> LoadFuture {
        let sources = Arc::clone(&self.sources);
        let attempts = Arc::clone(&self.attempts);

        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            load_first_available(&sources).await
        }
        .boxed()
        .shared()
    }
}

async fn load_first_available(
    sources: &[Arc<dyn ToolSource>],
) -> Result<Arc<dyn TranscoderTool>, LoaderError> {
    if sources.is_empty() {
        warn!("No transcoder sources configured");
        return Err(LoaderError::NoSources);
    }

    let mut last_error = String::new();

    for (index, source) in sources.iter().enumerate() {
        let name = source.describe();
        debug!(source = %name, index, "Trying transcoder source");

        match source.load().await {
            Ok(tool) => {
                info!(source = %name, tool = tool.name(), "Transcoder loaded");
                return Ok(tool);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Transcoder source failed");
                last_error = format!("{}: {}", name, e);
            }
        }
    }

    Err(LoaderError::AllSourcesFailed {
        attempted: sources.len(),
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, ToolOutput};
    use bytes::Bytes;

    struct NullTool;

    #[async_trait]
    impl TranscoderTool for NullTool {
        fn name(&self) -> &str {
            "null"
        }

        async fn write_entry(&self, _name: &str, _data: Bytes) -> bridge_traits::Result<()> {
            Ok(())
        }

        async fn execute(&self, _args: &[String]) -> bridge_traits::Result<ToolOutput> {
            Ok(ToolOutput::success(""))
        }

        async fn read_entry(&self, _name: &str) -> bridge_traits::Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn delete_entry(&self, _name: &str) -> bridge_traits::Result<()> {
            Ok(())
        }
    }

    struct CountingSource {
        label: &'static str,
        succeed: bool,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(label: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                label,
                succeed,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ToolSource for CountingSource {
        fn describe(&self) -> String {
            self.label.to_string()
        }

        async fn load(&self) -> bridge_traits::Result<Arc<dyn TranscoderTool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Arc::new(NullTool))
            } else {
                Err(BridgeError::NotAvailable(format!("{} unreachable", self.label)))
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_search() {
        let primary = CountingSource::new("primary", false);
        let mirror = CountingSource::new("mirror", true);
        let spare = CountingSource::new("spare", true);
        let loader = ToolLoader::new(vec![primary.clone(), mirror.clone(), spare.clone()]);

        let tool = loader.load().await.unwrap();
        assert_eq!(tool.name(), "null");
        assert_eq!(loader.status(), LoaderStatus::Loaded);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mirror.calls.load(Ordering::SeqCst), 1);
        assert_eq!(spare.calls.load(Ordering::SeqCst), 0);

        // Loaded state is reused without touching sources again
        loader.load().await.unwrap();
        assert_eq!(mirror.calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_sticky_until_reset() {
        let only = CountingSource::new("only", false);
        let loader = ToolLoader::new(vec![only.clone()]);

        let first = loader.load().await.err().unwrap();
        assert!(matches!(first, LoaderError::AllSourcesFailed { attempted: 1, .. }));
        assert_eq!(loader.status(), LoaderStatus::FailedPermanently);

        let second = loader.load().await.err().unwrap();
        assert!(matches!(second, LoaderError::FailedPermanently(_)));
        assert_eq!(only.calls.load(Ordering::SeqCst), 1);

        loader.reset();
        assert_eq!(loader.status(), LoaderStatus::Unloaded);
        assert!(loader.load().await.is_err());
        assert_eq!(only.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let loader = ToolLoader::new(Vec::new());
        assert_eq!(loader.load().await.err().unwrap(), LoaderError::NoSources);
        assert!(loader.sources().is_empty());
    }
}
