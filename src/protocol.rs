use serde::{Deserialize, Serialize};

use crate::conf::OverlaySize;
use crate::content::OverlayMode;
use crate::geometry::ScreenRect;

/// Commands driving the overlay from a script or a pipe
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayCommand {
    /// Show the primary overlay
    Show {
        #[serde(default)]
        mode: OverlayMode,
    },
    /// Fade the overlay out and close the popup
    Hide,
    SetProcessing { processing: bool },
    /// Stream transcript text into the overlay content
    AppendText { text: String },
    ClearText,
    SelectorHover { hovering: bool },
    MenuHover { hovering: bool },
    /// The popup trigger was laid out at `frame` within the overlay panel
    TriggerLayout { frame: ScreenRect },
    SetVerticalOffset { offset: f64 },
    SetOverlaySize { size: OverlaySize },
    /// Let time pass (scripts only)
    Wait { ms: u64 },
    /// Tear down and stop
    Quit,
}

impl OverlayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OverlayCommand::Show { .. } => "show",
            OverlayCommand::Hide => "hide",
            OverlayCommand::SetProcessing { .. } => "set_processing",
            OverlayCommand::AppendText { .. } => "append_text",
            OverlayCommand::ClearText => "clear_text",
            OverlayCommand::SelectorHover { .. } => "selector_hover",
            OverlayCommand::MenuHover { .. } => "menu_hover",
            OverlayCommand::TriggerLayout { .. } => "trigger_layout",
            OverlayCommand::SetVerticalOffset { .. } => "set_vertical_offset",
            OverlayCommand::SetOverlaySize { .. } => "set_overlay_size",
            OverlayCommand::Wait { .. } => "wait",
            OverlayCommand::Quit => "quit",
        }
    }
}
