//! Window system seam
//!
//! Controllers never talk to a native toolkit directly. Everything they need
//! from the window server (panels, frames, child links, screens, lifecycle
//! notifications) goes through `WindowBackend`.

pub mod headless;

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::geometry::ScreenRect;

pub use headless::HeadlessBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observed, never owned, reference to a window hosting some content.
///
/// The window may be destroyed at any time; ask the backend with
/// `is_alive` before relying on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostWindowRef(WindowId);

impl HostWindowRef {
    pub fn id(&self) -> WindowId {
        self.0
    }
}

impl From<WindowId> for HostWindowRef {
    fn from(id: WindowId) -> Self {
        Self(id)
    }
}

/// Kind of floating panel a controller owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelRole {
    Overlay,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEventKind {
    Moved,
    Resized,
    ScreenChanged,
    Closed,
}

/// Lifecycle notification for an observed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub window: WindowId,
    pub kind: WindowEventKind,
}

/// Backend-agnostic window operations.
///
/// All methods take `&self`: a backend is shared by both controllers on the
/// UI thread as `Rc<dyn WindowBackend>` and serializes its own state.
pub trait WindowBackend {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Create a borderless, floating, non-activating panel. Starts ordered out.
    fn create_panel(&self, role: PanelRole) -> WindowId;

    fn panel_frame(&self, panel: WindowId) -> Option<ScreenRect>;

    fn set_panel_frame(&self, panel: WindowId, frame: ScreenRect, animate: bool);

    fn set_panel_alpha(&self, panel: WindowId, alpha: f32);

    /// Bring the panel to the front without making it key or active
    fn order_front(&self, panel: WindowId);

    fn order_out(&self, panel: WindowId);

    fn is_panel_visible(&self, panel: WindowId) -> bool;

    /// Attach `child` so it follows `host`. Returns false if `host` is gone.
    fn add_child(&self, host: HostWindowRef, child: WindowId) -> bool;

    fn remove_child(&self, host: HostWindowRef, child: WindowId);

    fn is_alive(&self, host: HostWindowRef) -> bool;

    /// Visible bounds of the screen `host` is on
    fn screen_of(&self, host: HostWindowRef) -> Option<ScreenRect>;

    /// Visible bounds of the screen new overlays should appear on
    fn active_screen(&self) -> Option<ScreenRect>;

    /// Convert a rectangle in `host`'s window coordinates to screen space
    fn convert_to_screen(&self, host: HostWindowRef, rect: ScreenRect) -> Option<ScreenRect>;

    /// Start receiving lifecycle events for `host` until the subscription drops
    fn observe(&self, host: HostWindowRef) -> WindowSubscription;

    /// Events for observed windows since the last call
    fn drain_events(&self) -> Vec<WindowEvent>;
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    observers: HashMap<u64, WindowId>,
}

/// Book-keeping for window observers, shared with the subscriptions it hands out
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, window: WindowId) -> WindowSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.insert(id, window);

        WindowSubscription {
            id,
            window,
            registry: Rc::downgrade(&self.inner),
        }
    }

    pub fn is_observed(&self, window: WindowId) -> bool {
        self.inner.borrow().observers.values().any(|w| *w == window)
    }

    pub fn observer_count(&self, window: WindowId) -> usize {
        self.inner
            .borrow()
            .observers
            .values()
            .filter(|w| **w == window)
            .count()
    }
}

/// Scoped observation of one window; unsubscribes when dropped
#[derive(Debug)]
pub struct WindowSubscription {
    id: u64,
    window: WindowId,
    registry: Weak<RefCell<RegistryInner>>,
}

impl WindowSubscription {
    pub fn window(&self) -> WindowId {
        self.window
    }
}

impl Drop for WindowSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.borrow_mut().observers.remove(&self.id);
        }
    }
}
