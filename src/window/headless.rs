//! In-memory window server
//!
//! Keeps screens, windows, child links and a log of every mutating call.
//! Used by the `simulate` and `run` commands and as the assertion surface in
//! controller tests.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use super::{
    HostWindowRef, ObserverRegistry, PanelRole, WindowBackend, WindowEvent, WindowEventKind,
    WindowId, WindowSubscription,
};
use crate::geometry::{Point, ScreenRect, Size};

/// Menu bar / dock style reservation applied to every screen's visible bounds
const MENU_BAR_HEIGHT: f64 = 25.0;

/// One mutating call made against the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BackendOp {
    CreatePanel { window: WindowId, role: PanelRole },
    SetFrame { window: WindowId, frame: ScreenRect, animate: bool },
    SetAlpha { window: WindowId, alpha: f32 },
    OrderFront { window: WindowId },
    OrderOut { window: WindowId },
    AddChild { host: WindowId, child: WindowId },
    RemoveChild { host: WindowId, child: WindowId },
}

#[derive(Debug, Clone)]
struct Screen {
    frame: ScreenRect,
    visible: ScreenRect,
}

#[derive(Debug, Clone)]
struct HeadlessWindow {
    role: Option<PanelRole>,
    frame: ScreenRect,
    alpha: f32,
    visible: bool,
    parent: Option<WindowId>,
    screen: Option<usize>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_window: u64,
    screens: Vec<Screen>,
    active_screen: usize,
    windows: BTreeMap<WindowId, HeadlessWindow>,
    ops: Vec<BackendOp>,
    events: VecDeque<WindowEvent>,
}

impl HeadlessState {
    fn screen_index_for(&self, frame: &ScreenRect) -> Option<usize> {
        let center = Point::new(frame.mid_x(), frame.mid_y());
        self.screens
            .iter()
            .position(|screen| screen.frame.contains_point(center))
    }

    fn record(&mut self, op: BackendOp) {
        log::debug!("headless: {:?}", op);
        self.ops.push(op);
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: RefCell<HeadlessState>,
    observers: ObserverRegistry,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with a single screen of the given full frame
    pub fn with_screen(frame: ScreenRect) -> Self {
        let backend = Self::new();
        backend.add_screen(frame);
        backend
    }

    /// Add a screen; its visible bounds exclude a menu bar along the top
    pub fn add_screen(&self, frame: ScreenRect) -> usize {
        let visible = ScreenRect::new(
            frame.min_x(),
            frame.min_y(),
            frame.width(),
            (frame.height() - MENU_BAR_HEIGHT).max(0.0),
        );
        self.add_screen_with_visible(frame, visible)
    }

    pub fn add_screen_with_visible(&self, frame: ScreenRect, visible: ScreenRect) -> usize {
        let mut state = self.state.borrow_mut();
        state.screens.push(Screen { frame, visible });
        state.screens.len() - 1
    }

    pub fn set_active_screen(&self, index: usize) {
        self.state.borrow_mut().active_screen = index;
    }

    /// Create an ordinary visible application window
    pub fn create_window(&self, frame: ScreenRect) -> HostWindowRef {
        let mut state = self.state.borrow_mut();
        let id = WindowId(state.next_window);
        state.next_window += 1;
        let screen = state.screen_index_for(&frame);
        state.windows.insert(
            id,
            HeadlessWindow {
                role: None,
                frame,
                alpha: 1.0,
                visible: true,
                parent: None,
                screen,
            },
        );
        HostWindowRef::from(id)
    }

    /// Move a window (and its children) so its origin is at `origin`
    pub fn move_window(&self, window: WindowId, origin: Point) {
        let Some(current) = self.window_frame(window) else {
            return;
        };
        let dx = origin.x - current.origin.x;
        let dy = origin.y - current.origin.y;
        self.shift_window(window, dx, dy);
    }

    pub fn resize_window(&self, window: WindowId, size: Size) {
        {
            let mut state = self.state.borrow_mut();
            let Some(win) = state.windows.get_mut(&window) else {
                return;
            };
            win.frame = win.frame.with_size(size);
            let frame = win.frame;
            let screen = state.screen_index_for(&frame);
            if let Some(win) = state.windows.get_mut(&window) {
                win.screen = screen;
            }
        }
        self.emit(window, WindowEventKind::Resized);
    }

    /// Destroy a window. Children are detached and stay where they are.
    pub fn close_window(&self, window: WindowId) {
        {
            let mut state = self.state.borrow_mut();
            if state.windows.remove(&window).is_none() {
                return;
            }
            for win in state.windows.values_mut() {
                if win.parent == Some(window) {
                    win.parent = None;
                }
            }
        }
        self.emit(window, WindowEventKind::Closed);
    }

    pub fn window_frame(&self, window: WindowId) -> Option<ScreenRect> {
        self.state.borrow().windows.get(&window).map(|w| w.frame)
    }

    pub fn role_of(&self, window: WindowId) -> Option<PanelRole> {
        self.state.borrow().windows.get(&window).and_then(|w| w.role)
    }

    pub fn alpha_of(&self, window: WindowId) -> Option<f32> {
        self.state.borrow().windows.get(&window).map(|w| w.alpha)
    }

    pub fn parent_of(&self, window: WindowId) -> Option<WindowId> {
        self.state
            .borrow()
            .windows
            .get(&window)
            .and_then(|w| w.parent)
    }

    pub fn is_observed(&self, window: WindowId) -> bool {
        self.observers.is_observed(window)
    }

    pub fn ops(&self) -> Vec<BackendOp> {
        self.state.borrow().ops.clone()
    }

    /// Return and clear the op log
    pub fn take_ops(&self) -> Vec<BackendOp> {
        std::mem::take(&mut self.state.borrow_mut().ops)
    }

    /// Number of logged ops matching `predicate`
    pub fn count_ops(&self, predicate: impl Fn(&BackendOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| predicate(*op)).count()
    }

    fn shift_window(&self, window: WindowId, dx: f64, dy: f64) {
        let (children, screen_changed) = {
            let mut state = self.state.borrow_mut();
            let Some(win) = state.windows.get(&window) else {
                return;
            };
            let frame = win.frame;
            let moved = frame.with_origin(Point::new(frame.origin.x + dx, frame.origin.y + dy));
            let screen = state.screen_index_for(&moved);
            let Some(win) = state.windows.get_mut(&window) else {
                return;
            };
            let screen_changed = win.screen != screen;
            win.frame = moved;
            win.screen = screen;

            let children: Vec<WindowId> = state
                .windows
                .iter()
                .filter(|(_, w)| w.parent == Some(window))
                .map(|(id, _)| *id)
                .collect();
            (children, screen_changed)
        };

        self.emit(window, WindowEventKind::Moved);
        if screen_changed {
            self.emit(window, WindowEventKind::ScreenChanged);
        }
        for child in children {
            self.shift_window(child, dx, dy);
        }
    }

    fn emit(&self, window: WindowId, kind: WindowEventKind) {
        if self.observers.is_observed(window) {
            self.state
                .borrow_mut()
                .events
                .push_back(WindowEvent { window, kind });
        }
    }
}

impl WindowBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn create_panel(&self, role: PanelRole) -> WindowId {
        let mut state = self.state.borrow_mut();
        let id = WindowId(state.next_window);
        state.next_window += 1;
        state.windows.insert(
            id,
            HeadlessWindow {
                role: Some(role),
                frame: ScreenRect::ZERO,
                alpha: 1.0,
                visible: false,
                parent: None,
                screen: None,
            },
        );
        state.record(BackendOp::CreatePanel { window: id, role });
        id
    }

    fn panel_frame(&self, panel: WindowId) -> Option<ScreenRect> {
        self.window_frame(panel)
    }

    fn set_panel_frame(&self, panel: WindowId, frame: ScreenRect, animate: bool) {
        let current = {
            let mut state = self.state.borrow_mut();
            let Some(win) = state.windows.get(&panel) else {
                return;
            };
            let current = win.frame;
            state.record(BackendOp::SetFrame {
                window: panel,
                frame,
                animate,
            });
            current
        };

        if current.size != frame.size {
            self.resize_window(panel, frame.size);
        }
        if current.origin != frame.origin {
            self.move_window(panel, frame.origin);
        }
    }

    fn set_panel_alpha(&self, panel: WindowId, alpha: f32) {
        let mut state = self.state.borrow_mut();
        if let Some(win) = state.windows.get_mut(&panel) {
            win.alpha = alpha;
            state.record(BackendOp::SetAlpha {
                window: panel,
                alpha,
            });
        }
    }

    fn order_front(&self, panel: WindowId) {
        let mut state = self.state.borrow_mut();
        if let Some(win) = state.windows.get_mut(&panel) {
            win.visible = true;
            state.record(BackendOp::OrderFront { window: panel });
        }
    }

    fn order_out(&self, panel: WindowId) {
        let mut state = self.state.borrow_mut();
        if let Some(win) = state.windows.get_mut(&panel) {
            win.visible = false;
            state.record(BackendOp::OrderOut { window: panel });
        }
    }

    fn is_panel_visible(&self, panel: WindowId) -> bool {
        self.state
            .borrow()
            .windows
            .get(&panel)
            .is_some_and(|w| w.visible)
    }

    fn add_child(&self, host: HostWindowRef, child: WindowId) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.windows.contains_key(&host.id()) {
            return false;
        }
        let Some(win) = state.windows.get_mut(&child) else {
            return false;
        };
        win.parent = Some(host.id());
        state.record(BackendOp::AddChild {
            host: host.id(),
            child,
        });
        true
    }

    fn remove_child(&self, host: HostWindowRef, child: WindowId) {
        let mut state = self.state.borrow_mut();
        let Some(win) = state.windows.get_mut(&child) else {
            return;
        };
        if win.parent == Some(host.id()) {
            win.parent = None;
        }
        state.record(BackendOp::RemoveChild {
            host: host.id(),
            child,
        });
    }

    fn is_alive(&self, host: HostWindowRef) -> bool {
        self.state.borrow().windows.contains_key(&host.id())
    }

    fn screen_of(&self, host: HostWindowRef) -> Option<ScreenRect> {
        let state = self.state.borrow();
        let index = state.windows.get(&host.id())?.screen?;
        state.screens.get(index).map(|s| s.visible)
    }

    fn active_screen(&self) -> Option<ScreenRect> {
        let state = self.state.borrow();
        state
            .screens
            .get(state.active_screen)
            .or_else(|| state.screens.first())
            .map(|s| s.visible)
    }

    fn convert_to_screen(&self, host: HostWindowRef, rect: ScreenRect) -> Option<ScreenRect> {
        let frame = self.window_frame(host.id())?;
        Some(rect.with_origin(Point::new(
            frame.origin.x + rect.origin.x,
            frame.origin.y + rect.origin.y,
        )))
    }

    fn observe(&self, host: HostWindowRef) -> WindowSubscription {
        self.observers.subscribe(host.id())
    }

    fn drain_events(&self) -> Vec<WindowEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }
}
