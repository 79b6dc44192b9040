//! Tests for the external transcoder backend and its loader
//!
//! Uses an in-memory transcoder that "converts" by copying a canned MP3
//! payload into the output entry named on its command line.

use async_trait::async_trait;
use bridge_traits::{
    BridgeError, CapabilityProbe, ExecutionCapabilities, StaticCapabilityProbe, ToolOutput,
    ToolSource, TranscoderTool,
};
use bytes::Bytes;
use core_compress::{
    AudioCompressor, BackendKind, CancellationToken, CompressError, ExternalToolCompressor,
    LoaderError, LoaderStatus, NoProgress, SourceAudio, Stage, ToolLoader, TranscoderConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const FAKE_MP3: &[u8] = &[0xFF, 0xFB, 0x50, 0xC4, 0x00, 0x00, 0x00, 0x00];

// ============================================================================
// In-memory transcoder
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Convert,
    ExitWithError,
    NoOutput,
    Hang,
}

struct MemoryTool {
    behaviour: Behaviour,
    entries: Mutex<HashMap<String, Bytes>>,
    executions: Mutex<Vec<Vec<String>>>,
}

impl MemoryTool {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            entries: Mutex::new(HashMap::new()),
            executions: Mutex::new(Vec::new()),
        })
    }

    fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscoderTool for MemoryTool {
    fn name(&self) -> &str {
        "memory-tool"
    }

    async fn write_entry(&self, name: &str, data: Bytes) -> bridge_traits::Result<()> {
        bridge_traits::validate_entry_name(name)?;
        self.entries.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    async fn execute(&self, args: &[String]) -> bridge_traits::Result<ToolOutput> {
        self.executions.lock().unwrap().push(args.to_vec());

        match self.behaviour {
            Behaviour::Convert => {
                let output = args.last().cloned().unwrap_or_default();
                self.entries
                    .lock()
                    .unwrap()
                    .insert(output, Bytes::from_static(FAKE_MP3));
                Ok(ToolOutput::success("size=1kB"))
            }
            Behaviour::ExitWithError => {
                let output = args.last().cloned().unwrap_or_default();
                // Leave a partial artifact behind to check cleanup
                self.entries
                    .lock()
                    .unwrap()
                    .insert(output, Bytes::from_static(&[0xFF]));
                Ok(ToolOutput {
                    exit_code: Some(1),
                    log: "Input #0, matroska,webm\nInvalid data found when processing input"
                        .to_string(),
                })
            }
            Behaviour::NoOutput => Ok(ToolOutput::success("")),
            Behaviour::Hang => futures::future::pending().await,
        }
    }

    async fn read_entry(&self, name: &str) -> bridge_traits::Result<Bytes> {
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::OperationFailed(format!("{} not found", name)))
    }

    async fn delete_entry(&self, name: &str) -> bridge_traits::Result<()> {
        self.entries.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Source that hands out one shared tool, optionally waiting for a gate.
struct MemorySource {
    tool: Option<Arc<MemoryTool>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MemorySource {
    fn serving(tool: Arc<MemoryTool>) -> Arc<Self> {
        Arc::new(Self {
            tool: Some(tool),
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn gated(tool: Arc<MemoryTool>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            tool: Some(tool),
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        })
    }

    fn broken() -> Arc<Self> {
        Arc::new(Self {
            tool: None,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn gated_broken(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            tool: None,
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolSource for MemorySource {
    fn describe(&self) -> String {
        "memory://transcoder".to_string()
    }

    async fn load(&self) -> bridge_traits::Result<Arc<dyn TranscoderTool>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.tool {
            Some(tool) => Ok(tool.clone() as Arc<dyn TranscoderTool>),
            None => Err(BridgeError::NotAvailable("mirror offline".to_string())),
        }
    }
}

fn probe(caps: ExecutionCapabilities) -> Arc<dyn CapabilityProbe> {
    Arc::new(StaticCapabilityProbe(caps))
}

fn compressor_with(sources: Vec<Arc<dyn ToolSource>>) -> ExternalToolCompressor {
    ExternalToolCompressor::new(
        TranscoderConfig::default(),
        probe(ExecutionCapabilities::full()),
        Arc::new(ToolLoader::new(sources)),
    )
    .unwrap()
}

fn recording() -> SourceAudio {
    SourceAudio::new(vec![0x1A, 0x45, 0xDF, 0xA3, 0x00], "answer.webm")
        .with_media_type("audio/webm;codecs=opus")
}

// ============================================================================
// Compressor
// ============================================================================

#[tokio::test]
async fn test_successful_transcode() {
    let tool = MemoryTool::new(Behaviour::Convert);
    let compressor = compressor_with(vec![MemorySource::serving(tool.clone())]);

    let mut seen = Vec::new();
    let mut sink = |p: u8| seen.push(p);
    let result = compressor.compress(recording(), &mut sink).await.unwrap();

    assert_eq!(result.data.as_ref(), FAKE_MP3);
    assert_eq!(result.file_name, "answer.mp3");
    assert_eq!(result.media_type, "audio/mpeg");
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);

    let executions = tool.executions.lock().unwrap().clone();
    assert_eq!(executions.len(), 1);
    let args = &executions[0];
    assert_eq!(args[0], "-i");
    assert!(args[1].starts_with("input-") && args[1].ends_with(".webm"));
    assert!(args.windows(2).any(|w| w[0] == "-ar" && w[1] == "24000"));
    assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "64k"));
    assert!(args.last().unwrap().ends_with(".mp3"));

    // Both scratch entries are gone
    assert_eq!(tool.entry_count(), 0);
}

#[tokio::test]
async fn test_tool_failure_cleans_up() {
    let tool = MemoryTool::new(Behaviour::ExitWithError);
    let compressor = compressor_with(vec![MemorySource::serving(tool.clone())]);

    let failure = compressor
        .compress(recording(), &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Transcode);
    assert!(failure.to_string().contains("Invalid data found"));
    assert_eq!(tool.entry_count(), 0);
}

#[tokio::test]
async fn test_missing_output_cleans_up() {
    let tool = MemoryTool::new(Behaviour::NoOutput);
    let compressor = compressor_with(vec![MemorySource::serving(tool.clone())]);

    let failure = compressor
        .compress(recording(), &mut NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(failure.cause(), CompressError::Transcode(_)));
    assert_eq!(tool.entry_count(), 0);
}

#[tokio::test]
async fn test_cancel_during_execution() {
    let tool = MemoryTool::new(Behaviour::Hang);
    let compressor = compressor_with(vec![MemorySource::serving(tool.clone())]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let mut seen = Vec::new();
    let mut sink = |p: u8| seen.push(p);
    let failure = compressor
        .compress_with_cancel(recording(), &mut sink, cancel)
        .await
        .unwrap_err();

    assert!(failure.is_cancelled());
    assert!(!seen.contains(&100));
    assert_eq!(tool.entry_count(), 0);
}

#[tokio::test]
async fn test_requires_isolation_and_shared_memory() {
    let source = MemorySource::serving(MemoryTool::new(Behaviour::Convert));
    let loader = Arc::new(ToolLoader::new(vec![source.clone()]));
    let caps = ExecutionCapabilities {
        audio_decoding: true,
        shared_memory: true,
        cross_origin_isolated: false,
    };
    let compressor =
        ExternalToolCompressor::new(TranscoderConfig::default(), probe(caps), loader.clone())
            .unwrap();

    assert!(!compressor.is_supported());
    let failure = compressor
        .compress(recording(), &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Setup);
    assert!(matches!(failure.cause(), CompressError::Unsupported(_)));
    assert_eq!(source.calls(), 0);
    assert_eq!(loader.status(), LoaderStatus::Unloaded);
}

#[tokio::test]
async fn test_estimate_and_backend() {
    let compressor = compressor_with(Vec::new());
    assert_eq!(compressor.estimate_compressed_size(1_000_000), 150_000);
    assert_eq!(compressor.backend(), BackendKind::ExternalTool);
}

// ============================================================================
// Loader
// ============================================================================

#[tokio::test]
async fn test_concurrent_loads_share_one_attempt() {
    let gate = Arc::new(Notify::new());
    let source = MemorySource::gated(MemoryTool::new(Behaviour::Convert), gate.clone());
    let loader = Arc::new(ToolLoader::new(vec![source.clone()]));

    let loads = futures::future::join_all((0..5).map(|_| {
        let loader = loader.clone();
        async move { loader.load().await.map(|tool| tool.name().to_string()) }
    }));

    let release = {
        let loader = loader.clone();
        async move {
            tokio::task::yield_now().await;
            assert_eq!(loader.status(), LoaderStatus::Loading);
            gate.notify_one();
        }
    };

    let (results, ()) = futures::future::join(loads, release).await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.as_deref() == Ok("memory-tool")));
    assert_eq!(source.calls(), 1);
    assert_eq!(loader.attempts(), 1);
    assert_eq!(loader.status(), LoaderStatus::Loaded);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_failure() {
    let gate = Arc::new(Notify::new());
    let source = MemorySource::gated_broken(gate.clone());
    let loader = Arc::new(ToolLoader::new(vec![source.clone()]));

    let loads = futures::future::join_all((0..5).map(|_| {
        let loader = loader.clone();
        async move { loader.load().await.err() }
    }));

    let release = {
        let loader = loader.clone();
        async move {
            tokio::task::yield_now().await;
            assert_eq!(loader.status(), LoaderStatus::Loading);
            gate.notify_one();
        }
    };

    let (results, ()) = futures::future::join(loads, release).await;

    let expected = LoaderError::AllSourcesFailed {
        attempted: 1,
        last_error: "memory://transcoder: Bridge capability not available: mirror offline"
            .to_string(),
    };
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.as_ref() == Some(&expected)), "{:?}", results);
    assert_eq!(source.calls(), 1);
    assert_eq!(loader.attempts(), 1);
    assert_eq!(loader.status(), LoaderStatus::FailedPermanently);
}

#[tokio::test]
async fn test_failover_to_next_source() {
    let broken = MemorySource::broken();
    let tool = MemoryTool::new(Behaviour::Convert);
    let working = MemorySource::serving(tool.clone());
    let compressor = compressor_with(vec![broken.clone(), working.clone()]);

    compressor.compress(recording(), &mut NoProgress).await.unwrap();
    compressor.compress(recording(), &mut NoProgress).await.unwrap();

    assert_eq!(broken.calls(), 1);
    assert_eq!(working.calls(), 1);
    assert_eq!(tool.executions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sticky_failure_across_calls() {
    let first = MemorySource::broken();
    let second = MemorySource::broken();
    let compressor = compressor_with(vec![first.clone(), second.clone()]);

    let failure = compressor
        .compress(recording(), &mut NoProgress)
        .await
        .unwrap_err();
    assert_eq!(failure.stage(), Stage::Load);
    assert!(matches!(
        failure.cause(),
        CompressError::Loader(LoaderError::AllSourcesFailed { attempted: 2, .. })
    ));

    let failure = compressor
        .compress(recording(), &mut NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(
        failure.cause(),
        CompressError::Loader(LoaderError::FailedPermanently(_))
    ));

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(compressor.loader().status(), LoaderStatus::FailedPermanently);

    compressor.loader().reset();
    assert_eq!(compressor.loader().status(), LoaderStatus::Unloaded);
}
