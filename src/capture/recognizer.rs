use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CaptureEvent, SpeechCapture};
use crate::config::Language;
use crate::error::CaptureError;

/// Event emitted by a speech recognizer for one recognition cycle
#[derive(Debug)]
pub enum RecognizerEvent {
    /// One finalized text utterance
    Finalized(String),
    /// The cycle ended without hearing anything
    NoSpeech,
    /// The recognizer failed
    Error(CaptureError),
    /// The recognition cycle ended; the adapter decides whether to restart
    Ended,
}

/// Speech-to-text capability consumed by the utterance adapter.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start one recognition cycle in the given language
    async fn listen(
        &mut self,
        language: Language,
    ) -> Result<mpsc::Receiver<RecognizerEvent>, CaptureError>;

    /// Abort the current recognition cycle
    async fn abort(&mut self) -> Result<(), CaptureError>;
}

/// Discrete utterance capture.
///
/// Runs the recognizer for one finalized utterance per cycle, then restarts
/// listening. The restart decision is made from the `active` and `suspended`
/// flags at the moment the cycle ends, never from state captured when the
/// cycle began, so a restart cannot race an explicit `end()` or `suspend()`.
pub struct UtteranceCapture {
    recognizer: Arc<Mutex<Box<dyn SpeechRecognizer>>>,
    language: Language,
    active: Arc<AtomicBool>,
    suspended: Arc<AtomicBool>,
    resume_signal: Arc<Notify>,
    listen_task: Option<JoinHandle<()>>,
}

impl UtteranceCapture {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>, language: Language) -> Self {
        Self {
            recognizer: Arc::new(Mutex::new(recognizer)),
            language,
            active: Arc::new(AtomicBool::new(false)),
            suspended: Arc::new(AtomicBool::new(false)),
            resume_signal: Arc::new(Notify::new()),
            listen_task: None,
        }
    }
}

#[async_trait::async_trait]
impl SpeechCapture for UtteranceCapture {
    async fn begin(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        self.active.store(true, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);

        info!("Utterance capture started ({})", self.language.as_str());

        let (tx, rx) = mpsc::channel(16);
        let recognizer = Arc::clone(&self.recognizer);
        let active = Arc::clone(&self.active);
        let suspended = Arc::clone(&self.suspended);
        let resume_signal = Arc::clone(&self.resume_signal);
        let language = self.language;

        let task = tokio::spawn(async move {
            loop {
                if !active.load(Ordering::SeqCst) {
                    break;
                }

                if suspended.load(Ordering::SeqCst) {
                    resume_signal.notified().await;
                    continue;
                }

                let cycle = {
                    let mut recognizer = recognizer.lock().await;
                    recognizer.listen(language).await
                };

                let mut events = match cycle {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("Recognizer failed to start: {}", e);
                        let _ = tx.send(CaptureEvent::Error(e)).await;
                        break;
                    }
                };

                let mut fatal = false;
                while let Some(event) = events.recv().await {
                    match event {
                        RecognizerEvent::Finalized(text) => {
                            if tx.send(CaptureEvent::Utterance(text)).await.is_err() {
                                fatal = true;
                                break;
                            }
                        }
                        RecognizerEvent::NoSpeech => {
                            debug!("No speech detected, listening continues");
                            let _ = tx.send(CaptureEvent::Error(CaptureError::NoSpeech)).await;
                        }
                        RecognizerEvent::Error(e) if e.is_recoverable() => {
                            let _ = tx.send(CaptureEvent::Error(e)).await;
                        }
                        RecognizerEvent::Error(e) => {
                            warn!("Recognizer error: {}", e);
                            let _ = tx.send(CaptureEvent::Error(e)).await;
                            fatal = true;
                            break;
                        }
                        RecognizerEvent::Ended => break,
                    }
                }

                if fatal {
                    active.store(false, Ordering::SeqCst);
                    break;
                }

                // Loop back: restart only if still active and not suspended.
            }

            debug!("Utterance capture task stopped");
        });

        self.listen_task = Some(task);

        Ok(rx)
    }

    async fn end(&mut self) -> Result<(), CaptureError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Wake the task if it is parked on suspend so it can observe the flag.
        self.resume_signal.notify_one();

        {
            let mut recognizer = self.recognizer.lock().await;
            recognizer.abort().await?;
        }

        if let Some(task) = self.listen_task.take() {
            task.abort();
        }

        info!("Utterance capture stopped");

        Ok(())
    }

    async fn suspend(&mut self) {
        self.suspended.store(true, Ordering::SeqCst);

        let mut recognizer = self.recognizer.lock().await;
        if let Err(e) = recognizer.abort().await {
            warn!("Failed to abort recognition cycle on suspend: {}", e);
        }
    }

    async fn resume(&mut self) {
        self.suspended.store(false, Ordering::SeqCst);
        self.resume_signal.notify_one();
    }

    fn is_capturing(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "utterance"
    }
}
