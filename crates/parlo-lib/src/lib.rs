//! parlo-lib — Dictation drill engine.
//!
//! The session scheduler turns a static configuration (tracks × sentences)
//! into a strictly ordered, resumable, cancellable sequence of
//! generate-or-reuse → display → play → wait steps. Synthesis goes through a
//! fingerprint-keyed artifact cache so auto-repeat loops never pay the
//! backend twice for the same clip.

pub mod cache;
pub mod playback;
pub mod scheduler;
pub mod sequencer;
pub mod server;
pub mod settings;
pub mod source;
pub mod study;
pub mod synth;
pub mod ui;

// Re-export parlo-core for convenience
pub use parlo_core;
