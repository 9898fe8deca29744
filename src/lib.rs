//! Floating overlay and popup panel management for the dictate OSD.
//!
//! The primary overlay sits at the bottom center of the active screen; a
//! popup menu tracks a trigger control living inside it. Both are driven
//! through a `WindowBackend` so the geometry and timing rules can run
//! against any window server, including the in-memory one in
//! `window::headless`.

pub mod anchor;
pub mod animation;
pub mod codec;
pub mod conf;
pub mod content;
pub mod debounce;
pub mod error;
pub mod geometry;
pub mod overlay;
pub mod placement;
pub mod popup;
pub mod protocol;
pub mod runtime;
pub mod services;
pub mod session;
pub mod window;

pub use anchor::{AnchorProbe, AnchorSnapshot};
pub use conf::Settings;
pub use content::OverlayMode;
pub use error::{ConfigError, OverlayError};
pub use geometry::{Point, ScreenRect, Size};
pub use overlay::{OverlayPhase, PrimaryOverlayController};
pub use placement::{Direction, PlacementPolicy};
pub use popup::{HoverState, PopupController};
pub use services::OverlayServices;
pub use window::{HostWindowRef, WindowBackend, WindowId};
