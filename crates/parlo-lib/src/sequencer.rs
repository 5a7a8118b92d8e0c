//! Track sequencer — one sentence across all configured tracks.
//!
//! Subtitles for every slot render first (the learner reads before any
//! audio starts), then each audible track plays its repeats in slot order.
//! Failures stay local: a track that cannot generate or play is skipped
//! with a notice, and the sentence still advances. A sentence where no
//! track played at all is not an error either.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use parlo_core::types::{ResolvedTrack, Sentence, TimingConfig};
use parlo_core::Error;

use crate::cache::CacheStore;
use crate::playback::{interruptible_sleep, AudioSink, PlaybackDriver};
use crate::synth::Synthesizer;
use crate::ui::UiHost;

/// Gap after a track's final repeat, when the sequence moves straight on.
const ADVANCE_PAD: Duration = Duration::from_millis(200);

/// What one sentence cost.
#[derive(Debug, Default)]
pub struct SentenceOutcome {
    /// Seconds of real playback-and-wait time.
    pub elapsed_secs: f32,
    /// A stop signal was observed; the caller should unwind.
    pub stopped: bool,
}

pub struct TrackSequencer<S, D, U> {
    cache: Arc<CacheStore<S>>,
    driver: Arc<PlaybackDriver<D>>,
    ui: Arc<U>,
}

impl<S: Synthesizer, D: AudioSink, U: UiHost> TrackSequencer<S, D, U> {
    pub fn new(cache: Arc<CacheStore<S>>, driver: Arc<PlaybackDriver<D>>, ui: Arc<U>) -> Self {
        Self { cache, driver, ui }
    }

    /// Run every track for one sentence: subtitles, delay, then audio in
    /// strict slot order with `spacing` between repeats.
    pub async fn run_sentence(
        &self,
        sentence: &Sentence,
        tracks: &[ResolvedTrack],
        timing: &TimingConfig,
        stop: &mut watch::Receiver<bool>,
    ) -> SentenceOutcome {
        let mut outcome = SentenceOutcome::default();

        // Subtitles first, all slots. A hidden or "none" slot renders empty
        // text so the stack keeps its shape.
        for track in tracks {
            let text = if track.language == "none" || !track.show_subtitle {
                ""
            } else {
                sentence.text_for(&track.language)
            };
            self.ui.render_subtitle(track.slot, text, &track.style);
        }

        if !interruptible_sleep(Duration::from_secs_f32(timing.subtitle_delay.max(0.0)), stop).await
        {
            outcome.stopped = true;
            return outcome;
        }

        for track in tracks {
            if !track.audible() {
                continue;
            }
            let Some(voice) = track.voice.as_deref() else {
                continue;
            };
            let text = sentence.text_for(&track.language);

            for rep in 0..track.repeat {
                if *stop.borrow() {
                    outcome.stopped = true;
                    return outcome;
                }

                let artifact = match self.cache.get_or_create(text, voice, track.speed).await {
                    Ok(a) => a,
                    Err(Error::NoContent) => {
                        debug!(sentence = sentence.index, slot = track.slot, "empty text, skipping track");
                        break;
                    }
                    Err(e) => {
                        warn!(sentence = sentence.index, slot = track.slot, "track generation failed: {e}");
                        self.ui
                            .notice(&format!("slot {} skipped: {e}", track.slot + 1));
                        break;
                    }
                };

                let gap = if rep + 1 < track.repeat {
                    Duration::from_secs_f32(timing.spacing.max(0.0))
                } else {
                    ADVANCE_PAD
                };

                match self.driver.play(&artifact, gap, stop).await {
                    Ok(secs) => outcome.elapsed_secs += secs,
                    Err(e) => {
                        warn!(sentence = sentence.index, slot = track.slot, "playback failed: {e}");
                        self.ui.notice(&format!("playback skipped: {e}"));
                    }
                }

                if *stop.borrow() {
                    outcome.stopped = true;
                    return outcome;
                }
            }
        }

        outcome
    }
}
