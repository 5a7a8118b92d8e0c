//! Playback driver — one clip at a time, completion by timed wait.
//!
//! The audio output device is fire-and-forget: it accepts raw bytes and
//! offers no "done" callback. Completion is therefore simulated by sleeping
//! for the clip's known duration plus the configured gap, with the sleep
//! raced against the session's stop signal. An internal async mutex keeps
//! playback strictly FIFO — a second clip waits out the first, never
//! overlapping it.

use std::io::Cursor;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};

use parlo_core::{Error, Result};

use crate::cache::AudioArtifact;

/// The external audio output device.
///
/// Implementations hand bytes to real hardware (or record them, in tests).
/// No completion signal exists at this seam; duration math lives above it.
pub trait AudioSink: Send + Sync + 'static {
    fn play(&self, bytes: &[u8]) -> Result<()>;
}

/// Sleep that ends early when the stop signal fires (or its sender is gone,
/// which counts as a stop). Returns `true` if the full duration elapsed.
pub async fn interruptible_sleep(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = async { let _ = stop.wait_for(|s| *s).await; } => false,
    }
}

/// Real device: a dedicated OS thread owning the rodio output stream
/// (`OutputStream` is `!Send`), fed over a channel. The single sink plays
/// appended sources in order, which preserves FIFO at the device too.
pub struct RodioSink {
    tx: std::sync::mpsc::Sender<Vec<u8>>,
}

impl RodioSink {
    /// Spawn the playback thread and open the default output device.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();

        std::thread::Builder::new()
            .name("parlo-playback".into())
            .spawn(move || playback_thread(rx, ready_tx))
            .map_err(|e| Error::Playback(format!("failed to spawn playback thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| Error::Playback("playback thread died during startup".into()))?
            .map_err(Error::Playback)?;

        Ok(Self { tx })
    }
}

impl AudioSink for RodioSink {
    fn play(&self, bytes: &[u8]) -> Result<()> {
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| Error::Playback("playback thread gone".into()))
    }
}

fn playback_thread(
    rx: std::sync::mpsc::Receiver<Vec<u8>>,
    ready_tx: std::sync::mpsc::Sender<std::result::Result<(), String>>,
) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open audio output: {e}")));
            return;
        }
    };

    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to create sink: {e}")));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    while let Ok(bytes) = rx.recv() {
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => sink.append(source),
            Err(e) => error!("undecodable clip dropped: {e}"),
        }
    }

    sink.stop();
    debug!("playback thread exiting");
}

/// Drives one artifact through the device and owns the completion wait.
pub struct PlaybackDriver<D> {
    device: D,
    fifo: Mutex<()>,
}

impl<D: AudioSink> PlaybackDriver<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            fifo: Mutex::new(()),
        }
    }

    /// Play one clip and wait out `duration + gap_after`.
    ///
    /// Returns the seconds actually spent waiting — shorter than the full
    /// wait when the stop signal cut it off. A device error returns
    /// immediately with no wait at all.
    pub async fn play(
        &self,
        artifact: &AudioArtifact,
        gap_after: Duration,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<f32> {
        let _guard = self.fifo.lock().await;

        self.device.play(&artifact.bytes)?;

        let wait = Duration::from_secs_f32(artifact.duration_secs.max(0.0)) + gap_after;
        let started = tokio::time::Instant::now();
        if !interruptible_sleep(wait, stop).await {
            warn!(fp = %artifact.fingerprint, "playback wait interrupted by stop");
        }
        Ok(started.elapsed().as_secs_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use parlo_core::fingerprint::Fingerprint;
    use parlo_core::wav::write_wav;

    #[derive(Default)]
    struct FakeSink {
        played: StdMutex<Vec<(usize, tokio::time::Instant)>>,
        fail: bool,
    }

    impl AudioSink for std::sync::Arc<FakeSink> {
        fn play(&self, bytes: &[u8]) -> Result<()> {
            if self.fail {
                return Err(Error::Playback("no device".into()));
            }
            self.played
                .lock()
                .unwrap()
                .push((bytes.len(), tokio::time::Instant::now()));
            Ok(())
        }
    }

    fn one_second_clip() -> AudioArtifact {
        let bytes = write_wav(&vec![0i16; 16000], 16000);
        AudioArtifact {
            fingerprint: Fingerprint::compute("clip", "v", 1.0),
            path: std::path::PathBuf::from("/nonexistent/clip.wav"),
            duration_secs: 1.0,
            bytes,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_duration_plus_gap() {
        let sink = std::sync::Arc::new(FakeSink::default());
        let driver = PlaybackDriver::new(sink.clone());
        let (_tx, mut stop) = watch::channel(false);

        let t0 = tokio::time::Instant::now();
        let elapsed = driver
            .play(&one_second_clip(), Duration::from_millis(500), &mut stop)
            .await
            .unwrap();

        assert!((elapsed - 1.5).abs() < 0.05, "elapsed={elapsed}");
        assert!((t0.elapsed().as_secs_f32() - 1.5).abs() < 0.05);
        assert_eq!(sink.played.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_play_waits_for_the_first() {
        let sink = std::sync::Arc::new(FakeSink::default());
        let driver = std::sync::Arc::new(PlaybackDriver::new(sink.clone()));
        let (_tx, stop) = watch::channel(false);

        let (d1, d2) = (driver.clone(), driver.clone());
        let (mut s1, mut s2) = (stop.clone(), stop.clone());
        let (r1, r2) = tokio::join!(
            async move { d1.play(&one_second_clip(), Duration::ZERO, &mut s1).await },
            async move { d2.play(&one_second_clip(), Duration::ZERO, &mut s2).await },
        );
        r1.unwrap();
        r2.unwrap();

        let played = sink.played.lock().unwrap();
        assert_eq!(played.len(), 2);
        let spacing = played[1].1.duration_since(played[0].1).as_secs_f32();
        assert!(spacing >= 0.95, "clips overlapped: spacing={spacing}");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_the_wait_short() {
        let sink = std::sync::Arc::new(FakeSink::default());
        let driver = PlaybackDriver::new(sink);
        let (tx, mut stop) = watch::channel(false);

        let clip = AudioArtifact {
            duration_secs: 10.0,
            ..one_second_clip()
        };
        let (elapsed, _) = tokio::join!(driver.play(&clip, Duration::ZERO, &mut stop), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(true);
        });

        let elapsed = elapsed.unwrap();
        assert!(elapsed < 2.0, "stop ignored: elapsed={elapsed}");
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_returns_without_waiting() {
        let sink = std::sync::Arc::new(FakeSink {
            fail: true,
            ..FakeSink::default()
        });
        let driver = PlaybackDriver::new(sink);
        let (_tx, mut stop) = watch::channel(false);

        let t0 = tokio::time::Instant::now();
        let result = driver
            .play(&one_second_clip(), Duration::from_secs(1), &mut stop)
            .await;
        assert!(matches!(result, Err(Error::Playback(_))));
        assert!(t0.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn interruptible_sleep_honors_prior_stop() {
        let (tx, mut stop) = watch::channel(false);
        tx.send(true).unwrap();
        let t0 = tokio::time::Instant::now();
        assert!(!interruptible_sleep(Duration::from_secs(5), &mut stop).await);
        assert!(t0.elapsed() < Duration::from_millis(50));
    }
}
