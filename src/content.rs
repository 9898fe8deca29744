//! Content hosted by the panels
//!
//! Rendering is not the overlay's business. The only contract with content is
//! that it reports the size it wants to be; controllers never look at what is
//! inside.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::conf::OverlaySize;
use crate::geometry::Size;

/// What the primary overlay is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    #[default]
    Dictation,
    Edit,
    Command,
}

impl OverlayMode {
    pub fn label(&self) -> &'static str {
        match self {
            OverlayMode::Dictation => "Dictate",
            OverlayMode::Edit => "Edit",
            OverlayMode::Command => "Command",
        }
    }

    pub const ALL: [OverlayMode; 3] = [OverlayMode::Dictation, OverlayMode::Edit, OverlayMode::Command];
}

/// Live input level feeding the waveform
pub trait AudioLevelSource {
    /// Current level in `[0.0, 1.0]`
    fn level(&self) -> f32;
}

/// Content of the primary overlay panel
pub trait OverlayContent {
    /// Natural size of the content as currently laid out
    fn fitting_size(&self) -> Size;

    fn set_mode(&mut self, _mode: OverlayMode) {}

    fn set_processing(&mut self, _processing: bool) {}

    fn set_level_source(&mut self, _source: Option<Rc<dyn AudioLevelSource>>) {}

    fn set_overlay_size(&mut self, _size: OverlaySize) {}
}

/// Content of the popup menu
pub trait MenuContent {
    /// Lay out for `max_width` and return the resulting size
    fn fitting_size(&mut self, max_width: f64) -> Size;
}

#[derive(Debug, Clone, Copy)]
struct Metrics {
    char_width: f64,
    line_height: f64,
    bar_height: f64,
    padding: f64,
    indicator: f64,
    min_width: f64,
    max_width: f64,
    max_lines: usize,
}

impl Metrics {
    fn for_size(size: OverlaySize) -> Self {
        match size {
            OverlaySize::Small => Metrics {
                char_width: 6.5,
                line_height: 14.0,
                bar_height: 28.0,
                padding: 10.0,
                indicator: 48.0,
                min_width: 160.0,
                max_width: 360.0,
                max_lines: 2,
            },
            OverlaySize::Medium => Metrics {
                char_width: 7.5,
                line_height: 17.0,
                bar_height: 36.0,
                padding: 12.0,
                indicator: 64.0,
                min_width: 200.0,
                max_width: 480.0,
                max_lines: 3,
            },
            OverlaySize::Large => Metrics {
                char_width: 9.0,
                line_height: 20.0,
                bar_height: 44.0,
                padding: 14.0,
                indicator: 80.0,
                min_width: 240.0,
                max_width: 600.0,
                max_lines: 3,
            },
        }
    }
}

/// Status bar with mode label and streamed transcript text.
///
/// Width grows with the text up to a maximum, after which the text wraps
/// onto additional lines (up to a cap, then it scrolls).
pub struct TranscriptContent {
    mode: OverlayMode,
    processing: bool,
    text: String,
    size: OverlaySize,
    level_source: Option<Rc<dyn AudioLevelSource>>,
}

impl TranscriptContent {
    pub fn new(size: OverlaySize) -> Self {
        Self {
            mode: OverlayMode::default(),
            processing: false,
            text: String::new(),
            size,
            level_source: None,
        }
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn level(&self) -> f32 {
        self.level_source
            .as_ref()
            .map(|source| source.level())
            .unwrap_or(0.0)
    }
}

impl OverlayContent for TranscriptContent {
    fn fitting_size(&self) -> Size {
        let m = Metrics::for_size(self.size);
        let label = self.mode.label().chars().count() as f64 * m.char_width;
        let chrome = 2.0 * m.padding + m.indicator + label;

        let chars = self.text.chars().count() as f64;
        if chars == 0.0 {
            return Size::new(chrome.max(m.min_width), m.bar_height);
        }

        let text_width = chars * m.char_width;
        let width = (chrome + text_width).clamp(m.min_width, m.max_width);
        let per_line = (m.max_width - chrome).max(m.char_width);
        let lines = ((text_width / per_line).ceil() as usize).clamp(1, m.max_lines);
        let height = m.bar_height + (lines - 1) as f64 * m.line_height;

        Size::new(width, height)
    }

    fn set_mode(&mut self, mode: OverlayMode) {
        self.mode = mode;
    }

    fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    fn set_level_source(&mut self, source: Option<Rc<dyn AudioLevelSource>>) {
        self.level_source = source;
    }

    fn set_overlay_size(&mut self, size: OverlaySize) {
        self.size = size;
    }
}

/// Vertical list of menu rows
#[derive(Debug, Clone)]
pub struct MenuItems {
    items: Vec<String>,
}

impl MenuItems {
    const ROW_HEIGHT: f64 = 28.0;
    const PADDING: f64 = 6.0;
    const CHAR_WIDTH: f64 = 7.5;
    const ROW_INSET: f64 = 24.0;

    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// One row per overlay mode
    pub fn modes() -> Self {
        Self::new(
            OverlayMode::ALL
                .iter()
                .map(|mode| mode.label().to_string())
                .collect(),
        )
    }
}

impl MenuContent for MenuItems {
    fn fitting_size(&mut self, max_width: f64) -> Size {
        if self.items.is_empty() {
            return Size::ZERO;
        }
        let longest = self
            .items
            .iter()
            .map(|item| item.chars().count())
            .max()
            .unwrap_or(0) as f64;
        let width = (longest * Self::CHAR_WIDTH + Self::ROW_INSET).min(max_width);
        let height = self.items.len() as f64 * Self::ROW_HEIGHT + 2.0 * Self::PADDING;
        Size::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLevel(f32);

    impl AudioLevelSource for FixedLevel {
        fn level(&self) -> f32 {
            self.0
        }
    }

    #[test]
    fn test_empty_transcript_is_minimum_bar() {
        let content = TranscriptContent::new(OverlaySize::Medium);
        assert_eq!(content.fitting_size(), Size::new(200.0, 36.0));
    }

    #[test]
    fn test_transcript_grows_then_wraps() {
        let mut content = TranscriptContent::new(OverlaySize::Medium);
        content.push_text("hello");
        let short = content.fitting_size();

        content.push_text(&" more words".repeat(10));
        let long = content.fitting_size();
        assert!(long.width > short.width);
        assert_eq!(long.width, 480.0);
        assert!(long.height > short.height);

        content.push_text(&"x".repeat(5000));
        let capped = content.fitting_size();
        assert_eq!(capped.height, 36.0 + 2.0 * 17.0);
    }

    #[test]
    fn test_overlay_size_changes_metrics() {
        let mut content = TranscriptContent::new(OverlaySize::Small);
        let small = content.fitting_size();
        content.set_overlay_size(OverlaySize::Large);
        assert!(content.fitting_size().height > small.height);
    }

    #[test]
    fn test_level_source() {
        let mut content = TranscriptContent::new(OverlaySize::Medium);
        assert_eq!(content.level(), 0.0);
        content.set_level_source(Some(Rc::new(FixedLevel(0.4))));
        assert_eq!(content.level(), 0.4);
    }

    #[test]
    fn test_menu_respects_max_width() {
        let mut menu = MenuItems::new(vec!["a very long menu entry indeed".to_string()]);
        assert_eq!(menu.fitting_size(100.0).width, 100.0);
        assert_eq!(menu.fitting_size(1000.0).height, 28.0 + 12.0);
    }

    #[test]
    fn test_empty_menu_is_degenerate() {
        let mut menu = MenuItems::new(Vec::new());
        assert!(menu.fitting_size(200.0).is_degenerate());
    }
}
