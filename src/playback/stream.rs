use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use super::{OutputPayload, SpeechOutput};
use crate::audio::{codec, AudioBuffer};
use crate::error::PlaybackError;

/// Identifier for one scheduled playback source
pub type SourceId = u64;

/// A source handed back by the sink: its id plus a signal that fires when the
/// source finishes (or is dropped by the sink on stop).
pub struct ScheduledSource {
    pub id: SourceId,
    pub done: oneshot::Receiver<()>,
}

/// Audio playback capability consumed by the stream player.
///
/// `current_time` is the sink's running playback clock in seconds.
pub trait AudioSink: Send + Sync {
    fn current_time(&self) -> f64;

    /// Schedule a buffer to start at the given clock time
    fn start_source(
        &self,
        buffer: AudioBuffer,
        start_at: f64,
    ) -> Result<ScheduledSource, PlaybackError>;

    /// Stop a scheduled source immediately
    fn stop_source(&self, id: SourceId);
}

struct SchedulerState {
    /// Earliest time the next fragment may start
    next_start: f64,
    /// Sources currently scheduled or playing
    active: HashSet<SourceId>,
}

/// Streamed-audio playback with overlap-free scheduling.
///
/// Each fragment starts at the later of the sink's current clock and the
/// previous fragment's end time, so back-to-back fragments play gapless and
/// strictly ordered. The completion receiver returned by `play` resolves only
/// when that fragment ends with no other sources still active.
pub struct StreamPlayer {
    sink: Arc<dyn AudioSink>,
    state: Arc<Mutex<SchedulerState>>,
}

impl StreamPlayer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            state: Arc::new(Mutex::new(SchedulerState {
                next_start: 0.0,
                active: HashSet::new(),
            })),
        }
    }

    /// Number of sources currently scheduled or playing
    pub fn active_sources(&self) -> usize {
        self.state.lock().expect("scheduler state poisoned").active.len()
    }

    /// Current value of the scheduling clock
    pub fn playback_clock(&self) -> f64 {
        self.state.lock().expect("scheduler state poisoned").next_start
    }
}

#[async_trait::async_trait]
impl SpeechOutput for StreamPlayer {
    async fn play(&self, payload: OutputPayload) -> Result<oneshot::Receiver<()>, PlaybackError> {
        let (pcm, sample_rate, channels) = match payload {
            OutputPayload::Audio {
                pcm,
                sample_rate,
                channels,
            } => (pcm, sample_rate, channels),
            OutputPayload::Text(_) => {
                return Err(PlaybackError::UnsupportedPayload(
                    "stream player only plays decoded audio",
                ))
            }
        };

        let buffer = codec::decode_pcm16(&pcm, sample_rate, channels);
        let duration = buffer.duration_secs();

        let source = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            let start_at = self.sink.current_time().max(state.next_start);
            let source = self.sink.start_source(buffer, start_at)?;
            state.next_start = start_at + duration;
            state.active.insert(source.id);
            debug!(
                "Scheduled fragment {} at {:.3}s ({:.3}s long)",
                source.id, start_at, duration
            );
            source
        };

        let (done_tx, done_rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        let id = source.id;

        tokio::spawn(async move {
            // Resolves on normal end; errors if the sink dropped the source
            // on stop. Either way the source is no longer active.
            let _ = source.done.await;

            let all_drained = {
                let mut state = state.lock().expect("scheduler state poisoned");
                state.active.remove(&id);
                state.active.is_empty()
            };

            if all_drained {
                let _ = done_tx.send(());
            }
        });

        Ok(done_rx)
    }

    async fn cancel_all(&self) {
        let stopped: Vec<SourceId> = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            state.next_start = 0.0;
            state.active.drain().collect()
        };

        for id in &stopped {
            self.sink.stop_source(*id);
        }

        if !stopped.is_empty() {
            debug!("Cancelled {} active playback sources", stopped.len());
        }
    }
}
