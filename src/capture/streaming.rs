use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{CaptureEvent, SpeechCapture};
use crate::audio::AudioChunk;
use crate::error::CaptureError;

/// Microphone capability consumed by the streaming adapter.
///
/// Implemented by the embedding host (real input device) or by test fakes.
#[async_trait::async_trait]
pub trait Microphone: Send + Sync {
    /// Open the input stream at the given sample rate
    async fn open(&mut self, sample_rate: u32) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Close the input stream
    async fn close(&mut self) -> Result<(), CaptureError>;
}

/// Continuous raw-audio capture for the live duplex channel.
///
/// Opens the microphone at a fixed sample rate and forwards PCM chunks until
/// `end()`. Suspend and resume are no-ops: in live mode the remote end owns
/// barge-in, so the stream keeps flowing while the model speaks.
pub struct StreamingCapture {
    microphone: Box<dyn Microphone>,
    sample_rate: u32,
    capturing: Arc<AtomicBool>,
    forward_task: Option<JoinHandle<()>>,
}

impl StreamingCapture {
    pub fn new(microphone: Box<dyn Microphone>, sample_rate: u32) -> Self {
        Self {
            microphone,
            sample_rate,
            capturing: Arc::new(AtomicBool::new(false)),
            forward_task: None,
        }
    }
}

#[async_trait::async_trait]
impl SpeechCapture for StreamingCapture {
    async fn begin(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        let mut chunk_rx = self.microphone.open(self.sample_rate).await?;
        self.capturing.store(true, Ordering::SeqCst);

        info!("Streaming capture started at {} Hz", self.sample_rate);

        let (tx, rx) = mpsc::channel(64);
        let capturing = Arc::clone(&self.capturing);

        let task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(CaptureEvent::Chunk(chunk)).await.is_err() {
                    break;
                }
            }
            debug!("Streaming capture forwarding task stopped");
        });

        self.forward_task = Some(task);

        Ok(rx)
    }

    async fn end(&mut self) -> Result<(), CaptureError> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.microphone.close().await?;

        if let Some(task) = self.forward_task.take() {
            task.abort();
        }

        info!("Streaming capture stopped");

        Ok(())
    }

    async fn suspend(&mut self) {
        // Continuous stream; the live channel handles interruption remotely.
    }

    async fn resume(&mut self) {}

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "streaming"
    }
}
