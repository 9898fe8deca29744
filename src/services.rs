//! Single owner of the overlay panels
//!
//! Built once at startup and handed to the content layer by reference. Holds
//! the window backend, both controllers and the anchor probe, and is the only
//! path through which anchor reports and window events reach the popup.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::anchor::{AnchorProbe, AnchorSnapshot};
use crate::conf::{OverlaySize, Settings};
use crate::content::{AudioLevelSource, MenuContent, OverlayContent, OverlayMode};
use crate::geometry::ScreenRect;
use crate::overlay::PrimaryOverlayController;
use crate::popup::PopupController;
use crate::window::{HostWindowRef, WindowBackend, WindowEvent};

pub struct OverlayServices {
    backend: Rc<dyn WindowBackend>,
    overlay: PrimaryOverlayController,
    popup: PopupController,
    probe: AnchorProbe,
    settings: Settings,
}

impl OverlayServices {
    pub fn new(
        backend: Rc<dyn WindowBackend>,
        overlay_content: Rc<RefCell<dyn OverlayContent>>,
        menu_content: Rc<RefCell<dyn MenuContent>>,
        settings: Settings,
    ) -> Self {
        log::info!("Starting overlay services ({} backend)", backend.name());
        let overlay = PrimaryOverlayController::new(
            backend.clone(),
            overlay_content,
            &settings.overlay,
            settings.timing.clone(),
        );
        let popup = PopupController::new(
            backend.clone(),
            menu_content,
            &settings.popup,
            settings.timing.clone(),
        );
        let probe = AnchorProbe::new(backend.clone());

        Self {
            backend,
            overlay,
            popup,
            probe,
            settings,
        }
    }

    pub fn overlay(&self) -> &PrimaryOverlayController {
        &self.overlay
    }

    pub fn popup(&self) -> &PopupController {
        &self.popup
    }

    pub fn probe(&self) -> &AnchorProbe {
        &self.probe
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Show the primary overlay. The popup trigger lives inside it.
    pub fn show(
        &mut self,
        level_source: Option<Rc<dyn AudioLevelSource>>,
        mode: OverlayMode,
        now: Instant,
    ) {
        self.overlay.show(level_source, mode, now);
        if let Some(host) = self.overlay.host() {
            self.set_trigger_host(Some(host), now);
        }
    }

    pub fn hide(&mut self, now: Instant) {
        self.popup.hide();
        self.overlay.hide(now);
    }

    /// Processing replaces the trigger's menu, so the popup goes away
    pub fn set_processing(&mut self, processing: bool, now: Instant) {
        if processing {
            self.popup.hide();
        }
        self.overlay.set_processing(processing, now);
    }

    pub fn refresh_size_for_content(&mut self, now: Instant) {
        self.overlay.refresh_size_for_content(now);
    }

    pub fn selector_hover_changed(&mut self, hovering: bool, now: Instant) {
        self.popup.selector_hover_changed(hovering, now);
    }

    pub fn menu_hover_changed(&mut self, hovering: bool, now: Instant) {
        self.popup.menu_hover_changed(hovering, now);
    }

    /// The trigger was laid out at `bounds` within its host window
    pub fn trigger_layout_changed(&mut self, bounds: ScreenRect, now: Instant) {
        if let Some(snapshot) = self.probe.layout_changed(bounds) {
            self.route(snapshot, now);
        }
    }

    /// The trigger moved into another window, or out of every window
    pub fn set_trigger_host(&mut self, host: Option<HostWindowRef>, now: Instant) {
        if let Some(snapshot) = self.probe.set_host(host) {
            self.route(snapshot, now);
        }
    }

    pub fn set_vertical_offset(&mut self, offset: f64, now: Instant) {
        self.settings.overlay.vertical_offset = offset;
        self.overlay.set_vertical_offset(offset, now);
    }

    pub fn set_overlay_size(&mut self, size: OverlaySize, now: Instant) {
        self.settings.overlay.size = size;
        self.overlay.set_overlay_size(size, now);
    }

    /// Adopt freshly loaded settings
    pub fn apply_settings(&mut self, settings: Settings, now: Instant) {
        self.overlay.set_timing(settings.timing.clone());
        self.popup.set_timing(settings.timing.clone());
        self.popup.set_direction(settings.popup.direction);
        self.settings = settings;
        self.overlay.set_overlay_size(self.settings.overlay.size, now);
        self.overlay
            .set_vertical_offset(self.settings.overlay.vertical_offset, now);
    }

    /// Feed pending window lifecycle events through the probe
    pub fn pump_window_events(&mut self, now: Instant) -> Vec<WindowEvent> {
        let events = self.backend.drain_events();
        for event in &events {
            log::trace!("window event: {} {:?}", event.window, event.kind);
            if let Some(snapshot) = self.probe.handle_window_event(*event) {
                self.route(snapshot, now);
            }
        }
        events
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.overlay.next_deadline(), self.popup.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.pump_window_events(now);
        self.overlay.tick(now);
        self.popup.tick(now);
        // Overlay reflows move the trigger's host
        self.pump_window_events(now);
    }

    /// Cancel every pending token on both controllers and take both panels down
    pub fn teardown(&mut self) {
        log::info!("Tearing down overlay services");
        self.popup.teardown();
        self.overlay.teardown();
        self.probe.set_host(None);
    }

    fn route(&mut self, snapshot: AnchorSnapshot, now: Instant) {
        self.popup.update_anchor(
            snapshot,
            self.settings.popup.max_width,
            self.settings.popup.gap,
            now,
        );
    }
}
