use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::stats::{SessionStats, SessionStatus};
use super::transcript::{Speaker, Transcript, TurnRecord};
use crate::audio::AudioChunk;
use crate::capture::{CaptureEvent, SpeechCapture};
use crate::error::CaptureError;
use crate::gateway::{AdviceBackend, LiveChannel, ServerEvent};
use crate::playback::{OutputPayload, SpeechOutput};

/// How the session exchanges turns with the model backend
enum Exchange {
    /// One HTTP call per utterance
    Discrete(Arc<dyn AdviceBackend>),
    /// Persistent duplex channel
    Live(Arc<dyn LiveChannel>),
}

/// In-progress transcription fragments for the live variant, flushed into the
/// transcript on turn completion
#[derive(Default)]
struct TurnBuffers {
    user: String,
    advisor: String,
}

/// A conversation session that coordinates capture, the backend exchange, and
/// speech playback.
///
/// State machine: `Idle → Connecting → Listening → Speaking → Listening
/// (loop) → Idle`, with an error/interrupt path from any state back to
/// `Idle`. At most one capture handle and one in-flight backend call exist at
/// a time; `stop()` is idempotent and releases every held resource.
pub struct ConversationSession {
    /// Session configuration
    config: SessionConfig,

    /// Backend exchange mode (discrete HTTP or live duplex)
    exchange: Exchange,

    /// Output adapter (stream player or synthesizer)
    output: Arc<dyn SpeechOutput>,

    /// Capture adapter; exactly one handle, held for the session's lifetime
    capture: Mutex<Option<Box<dyn SpeechCapture>>>,

    /// Current lifecycle state
    status: Mutex<SessionStatus>,

    /// Bounded rolling transcript
    transcript: Mutex<Transcript>,

    /// Live-variant transcription fragments awaiting turn completion
    turn_buffers: Mutex<TurnBuffers>,

    /// Outbound side of the live channel, if connected
    outbound: Mutex<Option<mpsc::Sender<AudioChunk>>>,

    /// Whether the session is currently active
    active: AtomicBool,

    /// Guards the one-call-in-flight invariant
    in_flight: AtomicBool,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Handle for the capture event loop task
    capture_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the live inbound event loop task
    live_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConversationSession {
    /// Create a session in discrete (recognize-then-respond) mode
    pub fn discrete(
        config: SessionConfig,
        capture: Box<dyn SpeechCapture>,
        output: Arc<dyn SpeechOutput>,
        backend: Arc<dyn AdviceBackend>,
    ) -> Self {
        Self::new(config, capture, output, Exchange::Discrete(backend))
    }

    /// Create a session in live (continuous duplex audio) mode
    pub fn live(
        config: SessionConfig,
        capture: Box<dyn SpeechCapture>,
        output: Arc<dyn SpeechOutput>,
        channel: Arc<dyn LiveChannel>,
    ) -> Self {
        Self::new(config, capture, output, Exchange::Live(channel))
    }

    fn new(
        config: SessionConfig,
        capture: Box<dyn SpeechCapture>,
        output: Arc<dyn SpeechOutput>,
        exchange: Exchange,
    ) -> Self {
        let history_limit = config.history_limit;

        Self {
            config,
            exchange,
            output,
            capture: Mutex::new(Some(capture)),
            status: Mutex::new(SessionStatus::Idle),
            transcript: Mutex::new(Transcript::new(history_limit)),
            turn_buffers: Mutex::new(TurnBuffers::default()),
            outbound: Mutex::new(None),
            active: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            started_at: Utc::now(),
            capture_task: Mutex::new(None),
            live_task: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.lock().await
    }

    /// Snapshot of the retained transcript, oldest first
    pub async fn transcript(&self) -> Vec<TurnRecord> {
        self.transcript.lock().await.entries()
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let transcript_len = self.transcript.lock().await.len();
        let status = *self.status.lock().await;

        SessionStats {
            is_active: self.active.load(Ordering::SeqCst),
            status,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            transcript_len,
        }
    }

    /// Start the session.
    ///
    /// No-op if already active. If the capture capability is unavailable
    /// (permission denied) the session stays idle without surfacing an error.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("Session {} already active", self.config.session_id);
            return Ok(());
        }

        self.set_status(SessionStatus::Connecting).await;

        let events = {
            let mut capture = self.capture.lock().await;
            let adapter = capture
                .as_mut()
                .context("Session has no capture adapter")?;

            match adapter.begin().await {
                Ok(events) => events,
                Err(CaptureError::PermissionDenied) => {
                    warn!("Capture capability unavailable, session stays idle");
                    self.active.store(false, Ordering::SeqCst);
                    self.set_status(SessionStatus::Idle).await;
                    return Ok(());
                }
                Err(e) => {
                    self.active.store(false, Ordering::SeqCst);
                    self.set_status(SessionStatus::Idle).await;
                    return Err(e).context("Failed to start capture");
                }
            }
        };

        if let Exchange::Live(channel) = &self.exchange {
            let conversation = match channel.connect(self.config.language).await {
                Ok(conversation) => conversation,
                Err(e) => {
                    self.active.store(false, Ordering::SeqCst);
                    self.teardown().await;
                    return Err(e).context("Failed to open live channel");
                }
            };

            {
                let mut outbound = self.outbound.lock().await;
                *outbound = Some(conversation.outbound);
            }

            let session = Arc::clone(self);
            let task = tokio::spawn(session.run_live_loop(conversation.inbound));

            let mut handle = self.live_task.lock().await;
            *handle = Some(task);
        }

        // A stop() racing this start may have already torn the session down;
        // its Idle must not be overwritten with Listening.
        if self.active.load(Ordering::SeqCst) {
            self.set_status(SessionStatus::Listening).await;
            info!("Session {} started", self.config.session_id);
        }

        let session = Arc::clone(self);
        let task = tokio::spawn(session.run_capture_loop(events));

        {
            let mut handle = self.capture_task.lock().await;
            *handle = Some(task);
        }

        Ok(())
    }

    /// Stop the session.
    ///
    /// Idempotent and safe to call from any state and from a teardown path.
    /// Cancels in-flight playback, releases the capture device, joins
    /// background tasks, and returns final stats.
    pub async fn stop(&self) -> SessionStats {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Stopping session {}", self.config.session_id);
        }

        self.teardown().await;

        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        error!("Capture event loop panicked: {}", e);
                    }
                }
            }
        }

        {
            let mut handle = self.live_task.lock().await;
            if let Some(task) = handle.take() {
                // The inbound loop may be parked on a quiet channel; don't
                // wait for the remote end to close it.
                task.abort();
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        error!("Live event loop panicked: {}", e);
                    }
                }
            }
        }

        self.stats().await
    }

    /// Handle one finalized utterance from the capture adapter.
    ///
    /// Valid only while listening; empty input is dropped without a backend
    /// call. Capture is suspended for the duration of the exchange so a
    /// second utterance can never overlap an in-flight call.
    pub async fn on_utterance(&self, text: &str) -> Result<()> {
        {
            let status = self.status.lock().await;
            if *status != SessionStatus::Listening {
                debug!("Ignoring utterance while {:?}", *status);
                return Ok(());
            }
        }

        let utterance = text.trim();
        if utterance.is_empty() {
            debug!("Dropping empty utterance");
            return Ok(());
        }

        let backend = match &self.exchange {
            Exchange::Discrete(backend) => Arc::clone(backend),
            Exchange::Live(_) => {
                // Live mode streams raw audio; there is nothing to dispatch.
                debug!("Ignoring finalized utterance in live mode");
                return Ok(());
            }
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Backend call already in flight, dropping utterance");
            return Ok(());
        }

        self.set_status(SessionStatus::Connecting).await;
        self.suspend_capture().await;

        let history = self.transcript.lock().await.entries();
        let result = backend
            .send(utterance, &history, self.config.language)
            .await;

        self.in_flight.store(false, Ordering::SeqCst);

        if !self.active.load(Ordering::SeqCst) {
            // Stopped while the call was in flight; the reply is discarded.
            return Ok(());
        }

        match result {
            Ok(reply) => self.on_backend_result(utterance, &reply).await,
            Err(e) => {
                warn!("Backend call failed: {}", e);
                self.abort().await;
                Ok(())
            }
        }
    }

    /// Record a completed exchange and speak the reply.
    pub async fn on_backend_result(&self, utterance: &str, reply: &str) -> Result<()> {
        {
            let mut transcript = self.transcript.lock().await;
            transcript.push_exchange(utterance.to_string(), reply.to_string());
        }

        self.set_status(SessionStatus::Speaking).await;

        let completion = match self.output.play(OutputPayload::Text(reply.to_string())).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Playback failed: {}", e);
                self.abort().await;
                return Ok(());
            }
        };

        // Resolves normally when the utterance ends, with an error when
        // playback was cancelled; either way the turn is over.
        let _ = completion.await;
        self.on_playback_complete().await;

        Ok(())
    }

    /// Playback finished: resume listening if the session is still active.
    pub async fn on_playback_complete(&self) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        self.resume_capture().await;
        self.set_status(SessionStatus::Listening).await;
    }

    /// The user barged in (live variant): drop all pending playback
    /// immediately and go back to listening.
    pub async fn on_interrupt(&self) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        info!("Playback interrupted");
        self.output.cancel_all().await;
        self.set_status(SessionStatus::Listening).await;
    }

    /// Capture event loop: routes utterances, chunks, and errors until the
    /// adapter's channel closes or the session goes inactive.
    async fn run_capture_loop(self: Arc<Self>, mut events: mpsc::Receiver<CaptureEvent>) {
        while let Some(event) = events.recv().await {
            if !self.active.load(Ordering::SeqCst) {
                break;
            }

            match event {
                CaptureEvent::Utterance(text) => {
                    if let Err(e) = self.on_utterance(&text).await {
                        error!("Exchange failed: {}", e);
                        self.abort().await;
                        break;
                    }
                }
                CaptureEvent::Chunk(chunk) => self.forward_chunk(chunk).await,
                CaptureEvent::Error(e) if e.is_recoverable() => {
                    debug!("Recoverable capture error, listening continues: {}", e);
                }
                CaptureEvent::Error(e) => {
                    warn!("Fatal capture error: {}", e);
                    self.abort().await;
                    break;
                }
            }
        }

        debug!("Capture event loop stopped");
    }

    /// Live inbound loop: accumulates transcription fragments, schedules
    /// audio fragments, and reacts to turn/interrupt markers.
    async fn run_live_loop(self: Arc<Self>, mut inbound: mpsc::Receiver<ServerEvent>) {
        while let Some(event) = inbound.recv().await {
            if !self.active.load(Ordering::SeqCst) {
                break;
            }

            match event {
                ServerEvent::UserTranscript(text) => {
                    self.turn_buffers.lock().await.user.push_str(&text);
                }
                ServerEvent::AdvisorTranscript(text) => {
                    self.turn_buffers.lock().await.advisor.push_str(&text);
                }
                ServerEvent::Audio(pcm) => {
                    self.set_status(SessionStatus::Speaking).await;

                    let payload = OutputPayload::Audio {
                        pcm,
                        sample_rate: self.config.output_sample_rate,
                        channels: self.config.channels,
                    };

                    match self.output.play(payload).await {
                        Ok(completion) => {
                            let session = Arc::clone(&self);
                            tokio::spawn(async move {
                                // Fires only for the fragment that drains the
                                // active set; earlier fragments resolve with
                                // an error and are ignored here.
                                if completion.await.is_ok() {
                                    session.on_playback_complete().await;
                                }
                            });
                        }
                        Err(e) => {
                            error!("Playback failed: {}", e);
                            self.abort().await;
                            break;
                        }
                    }
                }
                ServerEvent::TurnComplete => self.flush_turn().await,
                ServerEvent::Interrupted => self.on_interrupt().await,
            }
        }

        if self.active.load(Ordering::SeqCst) {
            info!("Live channel closed, stopping session");
            self.abort().await;
        }

        debug!("Live event loop stopped");
    }

    /// Move accumulated transcription fragments into the transcript.
    async fn flush_turn(&self) {
        let (user, advisor) = {
            let mut buffers = self.turn_buffers.lock().await;
            (
                std::mem::take(&mut buffers.user),
                std::mem::take(&mut buffers.advisor),
            )
        };

        if user.is_empty() && advisor.is_empty() {
            return;
        }

        let mut transcript = self.transcript.lock().await;
        if !user.is_empty() {
            transcript.push(TurnRecord {
                speaker: Speaker::User,
                text: user,
            });
        }
        if !advisor.is_empty() {
            transcript.push(TurnRecord {
                speaker: Speaker::Advisor,
                text: advisor,
            });
        }
    }

    /// Forward a captured chunk to the live channel, if one is open.
    async fn forward_chunk(&self, chunk: AudioChunk) {
        let outbound = self.outbound.lock().await;
        if let Some(tx) = outbound.as_ref() {
            if tx.send(chunk).await.is_err() {
                debug!("Live channel closed, dropping audio chunk");
            }
        }
    }

    async fn suspend_capture(&self) {
        let mut capture = self.capture.lock().await;
        if let Some(adapter) = capture.as_mut() {
            adapter.suspend().await;
        }
    }

    async fn resume_capture(&self) {
        let mut capture = self.capture.lock().await;
        if let Some(adapter) = capture.as_mut() {
            adapter.resume().await;
        }
    }

    /// Fatal-error path: deactivate and release everything, without joining
    /// the background tasks (safe to call from inside them).
    async fn abort(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.teardown().await;
        }
    }

    /// Release every held resource and return to idle. Idempotent.
    async fn teardown(&self) {
        self.output.cancel_all().await;

        {
            let mut outbound = self.outbound.lock().await;
            outbound.take();
        }

        {
            let mut capture = self.capture.lock().await;
            if let Some(adapter) = capture.as_mut() {
                if let Err(e) = adapter.end().await {
                    warn!("Failed to release capture device: {}", e);
                }
            }
        }

        {
            let mut buffers = self.turn_buffers.lock().await;
            buffers.user.clear();
            buffers.advisor.clear();
        }

        self.in_flight.store(false, Ordering::SeqCst);
        self.set_status(SessionStatus::Idle).await;
    }

    async fn set_status(&self, next: SessionStatus) {
        let mut status = self.status.lock().await;
        if *status != next {
            debug!("Session status {:?} -> {:?}", *status, next);
            *status = next;
        }
    }
}
