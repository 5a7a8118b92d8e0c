//! Shared types for the parlo dictation player.
//!
//! Settings structs are the persisted JSON schema: every section carries
//! `#[serde(default)]` so a file written by an older build deserializes with
//! defaults filled in for the keys it lacks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::voices;

/// Number of track slots. Fixed: slot order defines both subtitle stacking
/// and per-sentence playback order.
pub const TRACK_SLOTS: usize = 3;

/// Playback speed bounds (multiplicative factor; 1.0 = backend default).
pub const MIN_SPEED: f32 = 0.8;
pub const MAX_SPEED: f32 = 6.0;

/// Maximum audio repeats per track per sentence. 0 = subtitle-only.
pub const MAX_REPEAT: u32 = 2;

// ─── Settings (persisted JSON) ─────────────────────────────────────────────

/// One priority slot: language, voice, speed, repeats, subtitle styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Language code, or `"none"` to suppress the slot entirely.
    pub language: String,
    /// Voice display key or backend id; empty resolves the language default.
    pub voice: String,
    pub speed: f32,
    pub repeat: u32,
    pub show_subtitle: bool,
    pub color: String,
    pub font_size: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            language: "none".into(),
            voice: String::new(),
            speed: 1.0,
            repeat: 1,
            show_subtitle: true,
            color: "#00FF00".into(),
            font_size: 32,
        }
    }
}

/// Inter-clip timing, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Gap between repeats of the same track.
    pub spacing: f32,
    /// How long subtitles are visible before the first clip plays.
    pub subtitle_delay: f32,
    /// Pause after a sentence's last track before advancing.
    pub next_sentence_delay: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            subtitle_delay: 1.0,
            next_sentence_delay: 1.0,
        }
    }
}

/// Rest-break cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakConfig {
    pub enabled: bool,
    /// Sentences between breaks.
    pub interval: u32,
    /// Total break length in seconds, chime and message included.
    pub duration_secs: f32,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 10,
            duration_secs: 10.0,
        }
    }
}

/// Whole-range auto-repeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub auto_repeat: bool,
    /// Total passes over the range when auto-repeat is on.
    pub repeat_count: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            auto_repeat: true,
            repeat_count: 5,
        }
    }
}

/// Synthesis backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Extra attempts after a failed synthesis call.
    pub retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5500".into(),
            timeout_secs: 30,
            retries: 1,
        }
    }
}

/// The full persisted configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sheet name within the sentence directory.
    pub sheet: String,
    /// 1-based inclusive sentence range.
    pub start_row: usize,
    pub end_row: usize,
    pub tracks: [TrackConfig; TRACK_SLOTS],
    pub timing: TimingConfig,
    pub breaks: BreakConfig,
    pub loops: LoopConfig,
    /// Leave subtitles on screen through the whole sentence.
    pub keep_subtitles: bool,
    pub backend: BackendConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet: "everyday".into(),
            start_row: 1,
            end_row: 50,
            tracks: default_tracks(),
            timing: TimingConfig::default(),
            breaks: BreakConfig::default(),
            loops: LoopConfig::default(),
            keep_subtitles: true,
            backend: BackendConfig::default(),
        }
    }
}

/// Stock configuration: native language first at double speed, target
/// language twice after it, the second pass faster.
fn default_tracks() -> [TrackConfig; TRACK_SLOTS] {
    [
        TrackConfig {
            language: "korean".into(),
            voice: "SunHi".into(),
            speed: 2.0,
            repeat: 1,
            color: "#00FF00".into(),
            ..TrackConfig::default()
        },
        TrackConfig {
            language: "english".into(),
            voice: "Steffan (US)".into(),
            speed: 2.0,
            repeat: 1,
            color: "#FFFFF0".into(),
            ..TrackConfig::default()
        },
        TrackConfig {
            language: "english".into(),
            voice: "Jenny (US)".into(),
            speed: 3.0,
            repeat: 1,
            color: "#00FF00".into(),
            ..TrackConfig::default()
        },
    ]
}

// ─── Session data ──────────────────────────────────────────────────────────

/// One drill sentence: its row index and the text per language code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// 1-based row index in the source sheet.
    pub index: usize,
    pub texts: HashMap<String, String>,
}

impl Sentence {
    /// Text for a language; missing columns read as empty, not as errors.
    pub fn text_for(&self, language: &str) -> &str {
        self.texts.get(language).map(String::as_str).unwrap_or("")
    }
}

/// Subtitle presentation for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleStyle {
    pub color: String,
    pub font_size: u32,
}

/// A track after one-time resolution at session start: voice resolved
/// through the catalog, speed and repeat clamped to their legal ranges.
#[derive(Debug, Clone)]
pub struct ResolvedTrack {
    pub slot: usize,
    pub language: String,
    /// `None` when the slot is `"none"` or the language has no voices.
    pub voice: Option<String>,
    pub speed: f32,
    pub repeat: u32,
    pub show_subtitle: bool,
    pub style: SubtitleStyle,
}

impl ResolvedTrack {
    pub fn resolve(slot: usize, config: &TrackConfig) -> Self {
        let voice = if config.language == "none" {
            None
        } else {
            voices::resolve_voice(&config.language, &config.voice).map(str::to_string)
        };
        Self {
            slot,
            language: config.language.clone(),
            voice,
            speed: config.speed.clamp(MIN_SPEED, MAX_SPEED),
            repeat: config.repeat.min(MAX_REPEAT),
            show_subtitle: config.show_subtitle,
            style: SubtitleStyle {
                color: config.color.clone(),
                font_size: config.font_size,
            },
        }
    }

    /// Whether this slot produces audio at all.
    pub fn audible(&self) -> bool {
        self.repeat > 0 && self.voice.is_some()
    }
}

/// Resolve all slots once, at session start.
pub fn resolve_tracks(settings: &Settings) -> Vec<ResolvedTrack> {
    settings
        .tracks
        .iter()
        .enumerate()
        .map(|(slot, t)| ResolvedTrack::resolve(slot, t))
        .collect()
}

/// Speed summary line for the status strip, audible tracks only:
/// `korean 2x · english 1.2x`.
pub fn speed_summary(tracks: &[ResolvedTrack]) -> String {
    let parts: Vec<String> = tracks
        .iter()
        .filter(|t| t.audible())
        .map(|t| {
            if t.speed.fract() == 0.0 {
                format!("{} {}x", t.language, t.speed as u32)
            } else {
                format!("{} {:.1}x", t.language, t.speed)
            }
        })
        .collect();
    parts.join(" · ")
}

// ─── Session state machine ─────────────────────────────────────────────────

/// Scheduler states. `Cancelled` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Breaking,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Breaking => "breaking",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Observable session snapshot, published on every transition and sentence
/// boundary. After cancellation `sentence_index` still holds the row the
/// session stopped on, so a resume can restart there.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// 1-based row index of the current sentence.
    pub sentence_index: usize,
    pub total_sentences: usize,
    /// 1-based pass number over the range.
    pub loop_number: u32,
    pub loops_total: u32,
    pub study_minutes: u32,
    pub speeds: String,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            sentence_index: 0,
            total_sentences: 0,
            loop_number: 0,
            loops_total: 0,
            study_minutes: 0,
            speeds: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_round_trips() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tracks[0].language, "korean");
        assert_eq!(back.tracks[2].speed, 3.0);
        assert_eq!(back.breaks.interval, 10);
    }

    #[test]
    fn missing_keys_fill_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"start_row": 21, "end_row": 40}"#).unwrap();
        assert_eq!(s.start_row, 21);
        assert_eq!(s.end_row, 40);
        assert_eq!(s.sheet, "everyday");
        assert_eq!(s.loops.repeat_count, 5);
        assert!(s.breaks.enabled);
    }

    #[test]
    fn partial_track_fills_with_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"tracks": [{"language": "japanese"}, {}, {}]}"#).unwrap();
        assert_eq!(s.tracks[0].language, "japanese");
        assert_eq!(s.tracks[0].repeat, 1);
        assert_eq!(s.tracks[1].language, "none");
    }

    #[test]
    fn resolve_clamps_speed_and_repeat() {
        let t = ResolvedTrack::resolve(
            0,
            &TrackConfig {
                language: "english".into(),
                speed: 9.0,
                repeat: 5,
                ..TrackConfig::default()
            },
        );
        assert_eq!(t.speed, MAX_SPEED);
        assert_eq!(t.repeat, MAX_REPEAT);
        assert!(t.audible());
    }

    #[test]
    fn none_slot_is_silent_but_keeps_its_position() {
        let t = ResolvedTrack::resolve(1, &TrackConfig::default());
        assert_eq!(t.slot, 1);
        assert!(t.voice.is_none());
        assert!(!t.audible());
    }

    #[test]
    fn repeat_zero_is_subtitle_only() {
        let t = ResolvedTrack::resolve(
            0,
            &TrackConfig {
                language: "english".into(),
                repeat: 0,
                ..TrackConfig::default()
            },
        );
        assert!(t.voice.is_some());
        assert!(!t.audible());
    }

    #[test]
    fn sentence_missing_language_reads_empty() {
        let s = Sentence {
            index: 3,
            texts: HashMap::from([("english".into(), "Hello.".into())]),
        };
        assert_eq!(s.text_for("english"), "Hello.");
        assert_eq!(s.text_for("thai"), "");
    }

    #[test]
    fn speed_summary_skips_silent_tracks() {
        let settings = Settings::default();
        let mut tracks = resolve_tracks(&settings);
        tracks[2].repeat = 0;
        let summary = speed_summary(&tracks);
        assert_eq!(summary, "korean 2x · english 2x");
    }
}
