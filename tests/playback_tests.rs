// Integration tests for the speech output adapters.
//
// The stream player must schedule fragments gapless and overlap-free on the
// sink's playback clock, track every active source, and reset the clock to
// zero on cancellation. The synthesis player must keep at most one utterance
// speaking at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use advisor_voice::audio::AudioBuffer;
use advisor_voice::config::Language;
use advisor_voice::error::PlaybackError;
use advisor_voice::playback::{
    AudioSink, OutputPayload, ScheduledSource, SourceId, SpeechOutput, SpeechSynthesizer,
    StreamPlayer, SynthesisPlayer,
};
use tokio::sync::oneshot;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeSink {
    clock: Mutex<f64>,
    next_id: AtomicU64,
    /// (id, start_at, duration) per scheduled source
    scheduled: Mutex<Vec<(SourceId, f64, f64)>>,
    /// Completion senders for sources still playing
    playing: Mutex<HashMap<SourceId, oneshot::Sender<()>>>,
    stopped: Mutex<Vec<SourceId>>,
}

impl FakeSink {
    fn set_clock(&self, t: f64) {
        *self.clock.lock().unwrap() = t;
    }

    /// Let one source finish playing
    fn finish(&self, id: SourceId) {
        if let Some(tx) = self.playing.lock().unwrap().remove(&id) {
            let _ = tx.send(());
        }
    }

    fn starts(&self) -> Vec<f64> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|(_, start, _)| *start)
            .collect()
    }
}

impl AudioSink for FakeSink {
    fn current_time(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn start_source(
        &self,
        buffer: AudioBuffer,
        start_at: f64,
    ) -> Result<ScheduledSource, PlaybackError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        self.playing.lock().unwrap().insert(id, tx);
        self.scheduled
            .lock()
            .unwrap()
            .push((id, start_at, buffer.duration_secs()));

        Ok(ScheduledSource { id, done: rx })
    }

    fn stop_source(&self, id: SourceId) {
        self.stopped.lock().unwrap().push(id);
        // Dropping the sender signals the source is gone.
        self.playing.lock().unwrap().remove(&id);
    }
}

#[derive(Default)]
struct FakeSynthesizer {
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl FakeSynthesizer {
    fn finish_current(&self) {
        if let Some(tx) = self.current.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn speak(
        &self,
        text: &str,
        _language: Language,
    ) -> Result<oneshot::Receiver<()>, PlaybackError> {
        self.spoken.lock().unwrap().push(text.to_string());
        let (tx, rx) = oneshot::channel();
        *self.current.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().take();
    }
}

/// A fragment of silence: `secs` seconds of mono PCM16 at 8kHz
fn fragment(secs: f64) -> OutputPayload {
    let samples = (secs * 8000.0) as usize;
    OutputPayload::Audio {
        pcm: vec![0u8; samples * 2],
        sample_rate: 8000,
        channels: 1,
    }
}

async fn wait_for_sources(player: &StreamPlayer, expected: usize) {
    for _ in 0..200 {
        if player.active_sources() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} active sources, found {}",
        expected,
        player.active_sources()
    );
}

// ============================================================================
// Stream player
// ============================================================================

#[tokio::test]
async fn test_fragments_schedule_gapless_and_ordered() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink.clone());

    // Three 2-second fragments arriving back-to-back
    for _ in 0..3 {
        player.play(fragment(2.0)).await.unwrap();
    }

    assert_eq!(sink.starts(), vec![0.0, 2.0, 4.0]);
    assert_eq!(player.active_sources(), 3);
    assert!((player.playback_clock() - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_fragment_never_starts_before_sink_clock() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink.clone());

    sink.set_clock(1.5);
    player.play(fragment(1.0)).await.unwrap();

    assert_eq!(sink.starts(), vec![1.5]);
    assert!((player.playback_clock() - 2.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_completion_fires_when_last_source_drains() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink.clone());

    let first = player.play(fragment(2.0)).await.unwrap();
    let _second = player.play(fragment(2.0)).await.unwrap();
    let third = player.play(fragment(2.0)).await.unwrap();

    let ids: Vec<_> = sink.scheduled.lock().unwrap().iter().map(|(id, _, _)| *id).collect();

    sink.finish(ids[0]);
    wait_for_sources(&player, 2).await;
    // Not the last source: its completion channel is dropped, not resolved.
    assert!(first.await.is_err());

    sink.finish(ids[1]);
    wait_for_sources(&player, 1).await;

    sink.finish(ids[2]);
    wait_for_sources(&player, 0).await;
    // Last source out resolves its completion signal.
    assert!(third.await.is_ok());
}

#[tokio::test]
async fn test_cancel_all_stops_sources_and_resets_clock() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink.clone());

    for _ in 0..3 {
        player.play(fragment(2.0)).await.unwrap();
    }
    assert_eq!(player.active_sources(), 3);

    player.cancel_all().await;

    assert_eq!(player.active_sources(), 0);
    assert!((player.playback_clock() - 0.0).abs() < 1e-9);
    assert_eq!(sink.stopped.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_scheduling_restarts_from_sink_clock_after_cancel() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink.clone());

    player.play(fragment(2.0)).await.unwrap();
    player.cancel_all().await;

    // The clock was reset; the next fragment starts at the sink's current
    // time, not after the cancelled fragment.
    sink.set_clock(0.5);
    player.play(fragment(1.0)).await.unwrap();

    assert_eq!(sink.starts().last().copied(), Some(0.5));
}

#[tokio::test]
async fn test_stream_player_rejects_text_payload() {
    let sink = Arc::new(FakeSink::default());
    let player = StreamPlayer::new(sink);

    let result = player.play(OutputPayload::Text("bonjour".to_string())).await;
    assert!(matches!(result, Err(PlaybackError::UnsupportedPayload(_))));
}

// ============================================================================
// Synthesis player
// ============================================================================

#[tokio::test]
async fn test_synthesis_cancels_prior_utterance() {
    let synthesizer = Arc::new(FakeSynthesizer::default());
    let player = SynthesisPlayer::new(synthesizer.clone(), Language::En);

    let first = player
        .play(OutputPayload::Text("first reply".to_string()))
        .await
        .unwrap();

    // Starting a second reply cancels the first before speaking.
    let second = player
        .play(OutputPayload::Text("second reply".to_string()))
        .await
        .unwrap();

    assert_eq!(synthesizer.cancels.load(Ordering::SeqCst), 2);
    assert_eq!(
        *synthesizer.spoken.lock().unwrap(),
        vec!["first reply".to_string(), "second reply".to_string()]
    );

    // The first utterance's completion never resolves.
    assert!(first.await.is_err());

    synthesizer.finish_current();
    assert!(second.await.is_ok());
}

#[tokio::test]
async fn test_synthesis_cancel_all() {
    let synthesizer = Arc::new(FakeSynthesizer::default());
    let player = SynthesisPlayer::new(synthesizer.clone(), Language::Fr);

    let completion = player
        .play(OutputPayload::Text("une réponse".to_string()))
        .await
        .unwrap();

    player.cancel_all().await;

    assert!(completion.await.is_err());
    assert!(synthesizer.cancels.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_synthesis_rejects_audio_payload() {
    let synthesizer = Arc::new(FakeSynthesizer::default());
    let player = SynthesisPlayer::new(synthesizer, Language::En);

    let result = player
        .play(OutputPayload::Audio {
            pcm: vec![0u8; 4],
            sample_rate: 24000,
            channels: 1,
        })
        .await;

    assert!(matches!(result, Err(PlaybackError::UnsupportedPayload(_))));
}
