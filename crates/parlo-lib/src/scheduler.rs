//! Session scheduler — the drill's state machine.
//!
//! `Idle → Running → (Breaking ⇄ Running) → Completed`, with `Cancelled`
//! reachable from every non-terminal state. One logical task drives the
//! whole session; every suspension point (generation awaits, playback
//! waits, break and gap sleeps) is raced against the stop signal, so a stop
//! lands at the next boundary without busy-polling.
//!
//! Mutable settings (break cycle, auto-repeat) are re-read at sentence
//! boundaries only — an edit mid-sentence applies from the next sentence.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tracing::{info, warn};

use parlo_core::types::{
    resolve_tracks, ResolvedTrack, Sentence, SessionState, SessionStatus, Settings,
};

use crate::cache::CacheStore;
use crate::playback::{interruptible_sleep, AudioSink, PlaybackDriver};
use crate::sequencer::TrackSequencer;
use crate::study::StudyTimeAccumulator;
use crate::synth::Synthesizer;
use crate::ui::UiHost;

/// Break chime, break announcement, and completion announcement, all
/// synthesized through the normal cache path in the stock Korean voice.
const CUE_VOICE: &str = "ko-KR-SunHiNeural";
const BREAK_CHIME: &str = "딩동";
const BREAK_MESSAGE: &str = "쉬어가는 시간입니다, 잠시 호흡을 느껴보세요";
const COMPLETION_MESSAGE: &str = "학습을 마쳤습니다, 수고하셨습니다";

/// Per-session mutable bookkeeping. Created when playback starts, discarded
/// at stop or completion; only the study-time total outlives the process.
struct Session {
    /// Row index of the sentence currently (or last) being processed.
    current_index: usize,
    sentences_since_break: u32,
    /// Completed passes over the range.
    loops_done: u32,
    started_at: tokio::time::Instant,
    elapsed_secs: f32,
}

/// Cloneable remote control for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Request cancellation. Observed at the scheduler's next suspension
    /// point; the final status snapshot keeps the sentence index.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }
}

pub struct SessionScheduler<S, D, U> {
    cache: Arc<CacheStore<S>>,
    driver: Arc<PlaybackDriver<D>>,
    sequencer: TrackSequencer<S, D, U>,
    ui: Arc<U>,
    settings: Arc<RwLock<Settings>>,
    study: StudyTimeAccumulator,
    tracks: Vec<ResolvedTrack>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<SessionStatus>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl<S: Synthesizer, D: AudioSink, U: UiHost> SessionScheduler<S, D, U> {
    pub fn new(
        cache: Arc<CacheStore<S>>,
        driver: Arc<PlaybackDriver<D>>,
        ui: Arc<U>,
        settings: Arc<RwLock<Settings>>,
        study: StudyTimeAccumulator,
    ) -> Self {
        // Tracks resolve once, at session start; only break/loop settings
        // stay mutable afterwards.
        let tracks = resolve_tracks(&settings.read().unwrap());
        let sequencer = TrackSequencer::new(cache.clone(), driver.clone(), ui.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SessionStatus::idle());
        Self {
            cache,
            driver,
            sequencer,
            ui,
            settings,
            study,
            tracks,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            status_tx,
            status_rx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            stop_tx: self.stop_tx.clone(),
            status_rx: self.status_rx.clone(),
        }
    }

    /// Drive the whole session to a terminal state.
    ///
    /// The sentence list is the session-start snapshot from the data
    /// source; it is never reloaded mid-session.
    pub async fn run(mut self, sentences: Vec<Sentence>) -> SessionState {
        let total = sentences.len();
        if total == 0 {
            self.publish(SessionState::Completed, 0, 0, 1);
            return SessionState::Completed;
        }

        let speeds = parlo_core::types::speed_summary(&self.tracks);
        let mut session = Session {
            current_index: sentences[0].index,
            sentences_since_break: 0,
            loops_done: 0,
            started_at: tokio::time::Instant::now(),
            elapsed_secs: 0.0,
        };
        let mut stop = self.stop_rx.clone();

        info!(total, %speeds, "session starting");

        loop {
            let loop_number = session.loops_done + 1;

            for (pos, sentence) in sentences.iter().enumerate() {
                session.current_index = sentence.index;

                // Sentence boundary: re-read the mutable settings.
                let (timing, breaks, keep_subtitles) = {
                    let s = self.settings.read().unwrap();
                    (s.timing.clone(), s.breaks.clone(), s.keep_subtitles)
                };

                self.publish(SessionState::Running, sentence.index, total, loop_number);
                self.ui.render_status(pos + 1, total, &speeds);

                if *stop.borrow() {
                    return self.cancelled(&session, total, loop_number);
                }

                let outcome = self
                    .sequencer
                    .run_sentence(sentence, &self.tracks, &timing, &mut stop)
                    .await;
                session.elapsed_secs += outcome.elapsed_secs;
                self.study.tick(Local::now());

                if outcome.stopped {
                    return self.cancelled(&session, total, loop_number);
                }

                if !keep_subtitles {
                    for track in &self.tracks {
                        self.ui.render_subtitle(track.slot, "", &track.style);
                    }
                }

                if !interruptible_sleep(
                    Duration::from_secs_f32(timing.next_sentence_delay.max(0.0)),
                    &mut stop,
                )
                .await
                {
                    return self.cancelled(&session, total, loop_number);
                }

                session.sentences_since_break += 1;
                if breaks.enabled
                    && breaks.interval > 0
                    && session.sentences_since_break >= breaks.interval
                {
                    self.publish(SessionState::Breaking, sentence.index, total, loop_number);
                    if !self.take_break(breaks.duration_secs, &mut stop).await {
                        return self.cancelled(&session, total, loop_number);
                    }
                    session.sentences_since_break = 0;
                }
            }

            session.loops_done += 1;
            self.play_cue(COMPLETION_MESSAGE, &mut stop).await;

            let loops = self.settings.read().unwrap().loops.clone();
            if *stop.borrow() {
                return self.cancelled(&session, total, loop_number);
            }
            if loops.auto_repeat && session.loops_done < loops.repeat_count {
                info!(pass = session.loops_done, "range complete, repeating");
                continue;
            }

            info!(
                passes = session.loops_done,
                elapsed = session.started_at.elapsed().as_secs(),
                "session complete"
            );
            self.publish(SessionState::Completed, session.current_index, total, loop_number);
            self.cache.purge().await;
            return SessionState::Completed;
        }
    }

    /// Rest break: chime, spoken message, then sleep whatever remains of
    /// the configured duration (cue time is subtracted, floored at zero).
    /// Returns false if a stop cut the break short.
    async fn take_break(&self, duration_secs: f32, stop: &mut watch::Receiver<bool>) -> bool {
        let t0 = tokio::time::Instant::now();
        self.play_cue(BREAK_CHIME, stop).await;
        self.play_cue(BREAK_MESSAGE, stop).await;
        if *stop.borrow() {
            return false;
        }
        let rest = (duration_secs - t0.elapsed().as_secs_f32()).max(0.0);
        interruptible_sleep(Duration::from_secs_f32(rest), stop).await
    }

    /// Fixed spoken cue through the normal cache path. Cue failures are
    /// logged and skipped, never escalated.
    async fn play_cue(&self, text: &str, stop: &mut watch::Receiver<bool>) {
        match self.cache.get_or_create(text, CUE_VOICE, 1.0).await {
            Ok(artifact) => {
                if let Err(e) = self.driver.play(&artifact, Duration::ZERO, stop).await {
                    warn!("cue playback failed: {e}");
                }
            }
            Err(e) => warn!("cue generation failed: {e}"),
        }
    }

    fn cancelled(&self, session: &Session, total: usize, loop_number: u32) -> SessionState {
        info!(
            index = session.current_index,
            elapsed = session.elapsed_secs,
            "session cancelled"
        );
        // The index stays observable so a resume can restart here.
        self.publish(
            SessionState::Cancelled,
            session.current_index,
            total,
            loop_number,
        );
        SessionState::Cancelled
    }

    fn publish(&self, state: SessionState, sentence_index: usize, total: usize, loop_number: u32) {
        let loops = self.settings.read().unwrap().loops.clone();
        let _ = self.status_tx.send(SessionStatus {
            state,
            sentence_index,
            total_sentences: total,
            loop_number,
            loops_total: if loops.auto_repeat { loops.repeat_count } else { 1 },
            study_minutes: self.study.minutes_today(),
            speeds: parlo_core::types::speed_summary(&self.tracks),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use parlo_core::types::SubtitleStyle;
    use parlo_core::Result;

    struct EchoSynth;

    impl Synthesizer for EchoSynth {
        async fn synthesize(&self, text: &str, _voice: &str, _speed: f32) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        played: StdMutex<Vec<String>>,
    }

    impl AudioSink for Arc<RecordingSink> {
        fn play(&self, bytes: &[u8]) -> Result<()> {
            self.played
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }
    }

    /// UI that can fire the stop signal when a given sentence comes up.
    #[derive(Default)]
    struct TriggerUi {
        stop_at_sentence: Option<usize>,
        handle: StdMutex<Option<SessionHandle>>,
    }

    impl UiHost for TriggerUi {
        fn render_subtitle(&self, _slot: usize, _text: &str, _style: &SubtitleStyle) {}
        fn render_status(&self, sentence_no: usize, _total: usize, _speeds: &str) {
            if Some(sentence_no) == self.stop_at_sentence {
                if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                    handle.stop();
                }
            }
        }
        fn notice(&self, _message: &str) {}
    }

    fn sentences(n: usize) -> Vec<Sentence> {
        (1..=n)
            .map(|i| Sentence {
                index: i,
                texts: HashMap::from([("english".into(), format!("S{i}"))]),
            })
            .collect()
    }

    /// Single english track, one repeat, fast timings.
    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.tracks[0].language = "english".into();
        settings.tracks[0].repeat = 1;
        settings.tracks[1].repeat = 0;
        settings.tracks[2].repeat = 0;
        settings.timing.spacing = 0.01;
        settings.timing.subtitle_delay = 0.01;
        settings.timing.next_sentence_delay = 0.01;
        settings.breaks.enabled = false;
        settings.loops.auto_repeat = false;
        settings
    }

    struct Rig {
        scheduler: SessionScheduler<EchoSynth, Arc<RecordingSink>, TriggerUi>,
        sink: Arc<RecordingSink>,
        _dir: tempfile::TempDir,
    }

    fn rig(settings: Settings, stop_at: Option<usize>) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::new(EchoSynth, dir.path().to_path_buf(), 256));
        let sink = Arc::new(RecordingSink::default());
        let driver = Arc::new(PlaybackDriver::new(sink.clone()));
        let ui = Arc::new(TriggerUi {
            stop_at_sentence: stop_at,
            handle: StdMutex::new(None),
        });
        let study = StudyTimeAccumulator::in_memory();
        let scheduler = SessionScheduler::new(
            cache,
            driver,
            ui.clone(),
            Arc::new(RwLock::new(settings)),
            study,
        );
        *ui.handle.lock().unwrap() = Some(scheduler.handle());
        Rig {
            scheduler,
            sink,
            _dir: dir,
        }
    }

    fn drill_plays(played: &[String]) -> Vec<&str> {
        played
            .iter()
            .filter(|t| t.starts_with('S'))
            .map(String::as_str)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn single_pass_visits_every_sentence_then_completes() {
        let rig = rig(test_settings(), None);
        let handle = rig.scheduler.handle();

        let state = rig.scheduler.run(sentences(4)).await;
        assert_eq!(state, SessionState::Completed);

        let played = rig.sink.played.lock().unwrap().clone();
        assert_eq!(
            drill_plays(&played),
            vec!["S1", "S2", "S3", "S4"],
            "full log: {played:?}"
        );
        assert_eq!(handle.status().state, SessionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn break_triggers_after_exactly_interval_sentences() {
        let mut settings = test_settings();
        settings.breaks.enabled = true;
        settings.breaks.interval = 5;
        settings.breaks.duration_secs = 1.0;
        let rig = rig(settings, None);

        rig.scheduler.run(sentences(8)).await;

        let played = rig.sink.played.lock().unwrap().clone();
        let chime_pos = played.iter().position(|t| t == BREAK_CHIME).unwrap();
        let s5_pos = played.iter().position(|t| t == "S5").unwrap();
        let s6_pos = played.iter().position(|t| t == "S6").unwrap();
        assert!(s5_pos < chime_pos && chime_pos < s6_pos, "{played:?}");
        // 8 sentences with interval 5: exactly one break.
        assert_eq!(played.iter().filter(|t| *t == BREAK_CHIME).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_repeat_runs_the_range_repeat_count_times() {
        let mut settings = test_settings();
        settings.loops.auto_repeat = true;
        settings.loops.repeat_count = 3;
        let rig = rig(settings, None);

        let state = rig.scheduler.run(sentences(10)).await;
        assert_eq!(state, SessionState::Completed);

        let played = rig.sink.played.lock().unwrap().clone();
        assert_eq!(drill_plays(&played).len(), 30);
        // A completion cue closes every pass.
        assert_eq!(
            played.iter().filter(|t| *t == COMPLETION_MESSAGE).count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_and_preserves_the_sentence_index() {
        let rig = rig(test_settings(), Some(3));
        let handle = rig.scheduler.handle();

        let state = rig.scheduler.run(sentences(5)).await;
        assert_eq!(state, SessionState::Cancelled);

        let played = rig.sink.played.lock().unwrap().clone();
        // Sentence 3's status callback fired the stop; its clips never play.
        assert_eq!(drill_plays(&played), vec!["S1", "S2"]);

        let status = handle.status();
        assert_eq!(status.state, SessionState::Cancelled);
        assert_eq!(status.sentence_index, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_range_completes_immediately() {
        let rig = rig(test_settings(), None);
        let state = rig.scheduler.run(Vec::new()).await;
        assert_eq!(state, SessionState::Completed);
        assert!(rig.sink.played.lock().unwrap().is_empty());
    }
}
