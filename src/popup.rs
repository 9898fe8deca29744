//! Popup menu controller
//!
//! A small panel that tracks a trigger control. Two independent hover
//! sources (the trigger and the menu itself) feed one effective intent, so
//! the pointer can travel from the trigger into the menu without the popup
//! collapsing. While visible the panel is a child of whatever window hosts
//! the trigger, and follows it when that host changes.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::anchor::AnchorSnapshot;
use crate::conf::{PopupSettings, Timing};
use crate::content::MenuContent;
use crate::debounce::Debouncer;
use crate::geometry::{ScreenRect, Size};
use crate::placement::{Direction, PlacementPolicy};
use crate::window::{HostWindowRef, PanelRole, WindowBackend, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PopupWork {
    Show,
    Hide,
    Reposition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    pub over_trigger: bool,
    pub over_menu: bool,
}

impl HoverState {
    /// Effective visibility intent
    pub fn is_active(&self) -> bool {
        self.over_trigger || self.over_menu
    }
}

pub struct PopupController {
    backend: Rc<dyn WindowBackend>,
    content: Rc<RefCell<dyn MenuContent>>,
    panel: Option<WindowId>,
    visible: bool,
    attached: Option<HostWindowRef>,
    anchor: Option<AnchorSnapshot>,
    max_width: f64,
    gap: f64,
    direction: Direction,
    hover: HoverState,
    work: Debouncer<PopupWork>,
    timing: Timing,
}

impl PopupController {
    pub fn new(
        backend: Rc<dyn WindowBackend>,
        content: Rc<RefCell<dyn MenuContent>>,
        settings: &PopupSettings,
        timing: Timing,
    ) -> Self {
        Self {
            backend,
            content,
            panel: None,
            visible: false,
            attached: None,
            anchor: None,
            max_width: settings.max_width,
            gap: settings.gap,
            direction: settings.direction,
            hover: HoverState::default(),
            work: Debouncer::new(),
            timing,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn panel(&self) -> Option<WindowId> {
        self.panel
    }

    /// Host window the panel is currently a child of
    pub fn attached_host(&self) -> Option<HostWindowRef> {
        self.attached
    }

    pub fn anchor(&self) -> Option<AnchorSnapshot> {
        self.anchor
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn selector_hover_changed(&mut self, hovering: bool, now: Instant) {
        self.hover.over_trigger = hovering;
        self.hover_changed(now);
    }

    pub fn menu_hover_changed(&mut self, hovering: bool, now: Instant) {
        self.hover.over_menu = hovering;
        self.hover_changed(now);
    }

    fn hover_changed(&mut self, now: Instant) {
        if self.hover.is_active() {
            self.work.cancel(PopupWork::Hide);
            if self.visible {
                self.reposition();
            } else if !self.work.is_pending(PopupWork::Show) {
                self.work
                    .schedule(PopupWork::Show, now, self.timing.show_delay());
            }
        } else {
            self.work.cancel(PopupWork::Show);
            if self.visible {
                self.work
                    .schedule(PopupWork::Hide, now, self.timing.hide_delay());
            }
        }
    }

    /// New trigger location from the anchor probe
    pub fn update_anchor(&mut self, snapshot: AnchorSnapshot, max_width: f64, gap: f64, now: Instant) {
        if snapshot.is_empty() {
            log::debug!("popup: anchor detached");
            self.anchor = None;
            self.hide();
            return;
        }

        self.anchor = Some(snapshot);
        self.max_width = max_width;
        self.gap = gap;

        if snapshot.frame.is_degenerate() {
            log::trace!("popup: degenerate anchor, leaving panel as is");
            return;
        }

        if !self.visible {
            // Retry a show that gave up for lack of geometry
            if self.hover.is_active() && !self.work.is_pending(PopupWork::Show) {
                self.show_now();
            }
            return;
        }

        if let Some(panel) = self.panel {
            if !self.sync_host(snapshot.host, panel) {
                log::debug!("popup: new host is gone, hiding");
                self.hide();
                return;
            }
        }

        self.work
            .schedule(PopupWork::Reposition, now, self.timing.reposition_delay());
    }

    /// Cancel all pending work and take the panel off screen. Idempotent.
    ///
    /// Hover is reset too: the popup comes back only on a fresh hover.
    pub fn hide(&mut self) {
        self.work.cancel_all();
        self.hover = HoverState::default();

        let Some(panel) = self.panel else {
            return;
        };
        if let Some(host) = self.attached.take() {
            self.backend.remove_child(host, panel);
        }
        if self.visible {
            log::debug!("popup: hidden");
            self.backend.order_out(panel);
            self.visible = false;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.work.next_deadline()
    }

    pub fn tick(&mut self, now: Instant) {
        for work in self.work.take_due(now) {
            match work {
                PopupWork::Show => {
                    if self.hover.is_active() && !self.visible {
                        self.show_now();
                    }
                }
                PopupWork::Hide => {
                    if !self.hover.is_active() {
                        self.hide();
                    }
                }
                PopupWork::Reposition => {
                    if self.visible {
                        self.reposition();
                    }
                }
            }
        }
    }

    pub fn teardown(&mut self) {
        self.hide();
    }

    fn ensure_panel(&mut self) -> WindowId {
        match self.panel {
            Some(panel) => panel,
            None => {
                let panel = self.backend.create_panel(PanelRole::Popup);
                log::debug!("popup: created panel {} ({})", panel, self.backend.name());
                self.panel = Some(panel);
                panel
            }
        }
    }

    fn show_now(&mut self) {
        let Some(anchor) = self.usable_anchor() else {
            log::debug!("popup: no usable anchor, not showing");
            return;
        };
        let panel = self.ensure_panel();
        let Some(size) = self.measure() else {
            log::debug!("popup: menu has no size yet, not showing");
            return;
        };

        if !self.sync_host(anchor.host, panel) {
            log::debug!("popup: host is gone, not showing");
            return;
        }

        let frame = self.place(&anchor, size);
        self.apply_frame(panel, frame);
        self.backend.order_front(panel);
        self.visible = true;
        log::debug!("popup: shown at {}", frame);
    }

    fn reposition(&mut self) {
        let (Some(panel), Some(anchor)) = (self.panel, self.usable_anchor()) else {
            log::trace!("popup: degenerate anchor, skipping reposition");
            return;
        };

        if !self.sync_host(anchor.host, panel) {
            self.hide();
            return;
        }

        let Some(size) = self.measure() else {
            return;
        };
        let frame = self.place(&anchor, size);
        self.apply_frame(panel, frame);
    }

    /// Make `panel` a child of `host`, or of nothing, detaching it from any
    /// previous host first. False if `host` is gone.
    fn sync_host(&mut self, host: Option<HostWindowRef>, panel: WindowId) -> bool {
        if self.attached == host {
            return true;
        }
        if let Some(previous) = self.attached.take() {
            log::debug!("popup: detaching from host {}", previous.id());
            self.backend.remove_child(previous, panel);
        }
        let Some(host) = host else {
            return true;
        };
        if self.backend.add_child(host, panel) {
            log::debug!("popup: attached to host {}", host.id());
            self.attached = Some(host);
            true
        } else {
            false
        }
    }

    fn usable_anchor(&self) -> Option<AnchorSnapshot> {
        self.anchor.filter(|anchor| !anchor.frame.is_degenerate())
    }

    fn measure(&self) -> Option<Size> {
        let size = self.content.borrow_mut().fitting_size(self.max_width);
        (!size.is_degenerate()).then_some(size)
    }

    fn place(&self, anchor: &AnchorSnapshot, size: Size) -> ScreenRect {
        let screen = anchor
            .host
            .and_then(|host| self.backend.screen_of(host))
            .or_else(|| self.backend.active_screen());
        PlacementPolicy::anchored(anchor.frame, self.gap, self.direction).place(size, screen)
    }

    fn apply_frame(&self, panel: WindowId, frame: ScreenRect) {
        if self
            .backend
            .panel_frame(panel)
            .is_some_and(|current| current.approx_eq(&frame))
        {
            return;
        }
        self.backend.set_panel_frame(panel, frame, false);
    }
}
