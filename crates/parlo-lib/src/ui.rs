//! UI host interface.
//!
//! The widget host is an external collaborator: it renders subtitle slots
//! and a status strip, and surfaces non-blocking notices. The engine only
//! talks through this trait, so tests run against a recorder and the CLI
//! ships a console implementation.

use parlo_core::types::SubtitleStyle;

pub trait UiHost: Send + Sync + 'static {
    /// Render one subtitle slot. Empty text clears the slot while keeping
    /// its ordinal position in the stack.
    fn render_subtitle(&self, slot: usize, text: &str, style: &SubtitleStyle);

    /// Update the progress strip: current sentence, total, speed summary.
    fn render_status(&self, sentence_no: usize, total: usize, speeds: &str);

    /// A user-visible, non-blocking notice (skipped track, failed write).
    fn notice(&self, message: &str);
}

/// Headless host: swallows everything.
pub struct NullUi;

impl UiHost for NullUi {
    fn render_subtitle(&self, _slot: usize, _text: &str, _style: &SubtitleStyle) {}
    fn render_status(&self, _sentence_no: usize, _total: usize, _speeds: &str) {}
    fn notice(&self, _message: &str) {}
}
