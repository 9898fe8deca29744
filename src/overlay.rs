//! Primary overlay controller
//!
//! Owns the floating status panel shown at the bottom center of the active
//! screen while dictating. Phases move `Hidden → Showing → Visible → Hiding →
//! Hidden`; a show arriving while hiding reverses the fade from wherever the
//! opacity currently is.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::animation::{Fade, FadeDirection};
use crate::conf::{OverlaySettings, OverlaySize, Timing};
use crate::content::{AudioLevelSource, OverlayContent, OverlayMode};
use crate::debounce::Debouncer;
use crate::geometry::ScreenRect;
use crate::placement::PlacementPolicy;
use crate::window::{HostWindowRef, PanelRole, WindowBackend, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OverlayWork {
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Hidden,
    Showing,
    Visible,
    Hiding,
}

/// Which screen a reflow places the panel on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenChoice {
    /// Screen new overlays appear on
    Active,
    /// Screen the panel is already on, falling back to the active one
    Current,
}

pub struct PrimaryOverlayController {
    backend: Rc<dyn WindowBackend>,
    content: Rc<RefCell<dyn OverlayContent>>,
    panel: Option<WindowId>,
    phase: OverlayPhase,
    fade: Option<Fade>,
    alpha: f32,
    next_frame: Option<Instant>,
    work: Debouncer<OverlayWork>,
    vertical_offset: f64,
    timing: Timing,
    reflows: usize,
}

impl PrimaryOverlayController {
    pub fn new(
        backend: Rc<dyn WindowBackend>,
        content: Rc<RefCell<dyn OverlayContent>>,
        settings: &OverlaySettings,
        timing: Timing,
    ) -> Self {
        content.borrow_mut().set_overlay_size(settings.size);
        Self {
            backend,
            content,
            panel: None,
            phase: OverlayPhase::Hidden,
            fade: None,
            alpha: 0.0,
            next_frame: None,
            work: Debouncer::new(),
            vertical_offset: settings.vertical_offset,
            timing,
            reflows: 0,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn panel(&self) -> Option<WindowId> {
        self.panel
    }

    /// The primary panel as a host for content living inside it
    pub fn host(&self) -> Option<HostWindowRef> {
        self.panel.map(HostWindowRef::from)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Number of reflow passes executed so far
    pub fn reflow_count(&self) -> usize {
        self.reflows
    }

    pub fn is_resize_pending(&self) -> bool {
        self.work.is_pending(OverlayWork::Resize)
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    pub fn show(
        &mut self,
        level_source: Option<Rc<dyn AudioLevelSource>>,
        mode: OverlayMode,
        now: Instant,
    ) {
        {
            let mut content = self.content.borrow_mut();
            content.set_level_source(level_source);
            content.set_mode(mode);
        }

        match self.phase {
            OverlayPhase::Hidden => {
                let panel = self.ensure_panel();
                if !self.reflow(ScreenChoice::Active) {
                    log::debug!("overlay: no usable geometry, staying hidden");
                    return;
                }
                log::debug!("overlay: showing {:?} on panel {}", mode, panel);
                self.apply_alpha(panel, 0.0);
                self.backend.order_front(panel);
                self.start_fade(Fade::fade_in(0.0, self.timing.fade_in(), now), now);
                self.phase = OverlayPhase::Showing;
            }
            OverlayPhase::Hiding => {
                log::debug!("overlay: show while hiding, reversing from {:.2}", self.alpha);
                let alpha = self.current_alpha(now);
                self.start_fade(Fade::fade_in(alpha, self.timing.fade_in(), now), now);
                self.phase = OverlayPhase::Showing;
                self.refresh_size_for_content(now);
            }
            OverlayPhase::Showing | OverlayPhase::Visible => {
                self.refresh_size_for_content(now);
            }
        }
    }

    pub fn hide(&mut self, now: Instant) {
        self.work.cancel_all();

        match self.phase {
            OverlayPhase::Showing | OverlayPhase::Visible => {
                let alpha = self.current_alpha(now);
                log::debug!("overlay: hiding from {:.2}", alpha);
                self.start_fade(Fade::fade_out(alpha, self.timing.fade_out(), now), now);
                self.phase = OverlayPhase::Hiding;
            }
            OverlayPhase::Hiding | OverlayPhase::Hidden => {}
        }
    }

    pub fn set_processing(&mut self, processing: bool, now: Instant) {
        self.content.borrow_mut().set_processing(processing);
        self.refresh_size_for_content(now);
    }

    /// Coalesce content size changes into one reflow after the debounce delay
    pub fn refresh_size_for_content(&mut self, now: Instant) {
        if !matches!(self.phase, OverlayPhase::Showing | OverlayPhase::Visible) {
            log::trace!("overlay: not on screen, reflow deferred to next show");
            return;
        }
        self.work
            .schedule(OverlayWork::Resize, now, self.timing.resize_debounce());
    }

    pub fn set_vertical_offset(&mut self, offset: f64, now: Instant) {
        self.vertical_offset = offset;
        self.refresh_size_for_content(now);
    }

    pub fn set_overlay_size(&mut self, size: OverlaySize, now: Instant) {
        self.content.borrow_mut().set_overlay_size(size);
        self.refresh_size_for_content(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.work.next_deadline(), self.next_frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        for work in self.work.take_due(now) {
            match work {
                OverlayWork::Resize => {
                    // Stale if the overlay left the screen since scheduling
                    if matches!(self.phase, OverlayPhase::Showing | OverlayPhase::Visible) {
                        self.reflow(ScreenChoice::Current);
                    }
                }
            }
        }

        if self.next_frame.is_some_and(|due| due <= now) {
            self.animate(now);
        }
    }

    /// Cancel everything and take the panel off screen immediately
    pub fn teardown(&mut self) {
        self.work.cancel_all();
        self.fade = None;
        self.next_frame = None;
        if let Some(panel) = self.panel {
            if self.phase != OverlayPhase::Hidden {
                self.apply_alpha(panel, 0.0);
                self.backend.order_out(panel);
            }
        }
        self.phase = OverlayPhase::Hidden;
    }

    fn ensure_panel(&mut self) -> WindowId {
        match self.panel {
            Some(panel) => panel,
            None => {
                let panel = self.backend.create_panel(PanelRole::Overlay);
                log::debug!("overlay: created panel {} ({})", panel, self.backend.name());
                self.panel = Some(panel);
                panel
            }
        }
    }

    fn start_fade(&mut self, fade: Fade, now: Instant) {
        self.fade = Some(fade);
        self.next_frame = Some(now);
    }

    fn current_alpha(&self, now: Instant) -> f32 {
        self.fade
            .as_ref()
            .map(|fade| fade.value_at(now))
            .unwrap_or(self.alpha)
    }

    fn apply_alpha(&mut self, panel: WindowId, alpha: f32) {
        self.alpha = alpha;
        self.backend.set_panel_alpha(panel, alpha);
    }

    fn animate(&mut self, now: Instant) {
        let (Some(panel), Some(fade)) = (self.panel, self.fade.as_ref()) else {
            self.next_frame = None;
            return;
        };

        let alpha = fade.value_at(now);
        let complete = fade.is_complete(now);
        let direction = fade.direction;
        self.apply_alpha(panel, alpha);

        if !complete {
            self.next_frame = Some(now + self.timing.frame_interval());
            return;
        }

        self.fade = None;
        self.next_frame = None;
        match direction {
            FadeDirection::In => {
                self.phase = OverlayPhase::Visible;
            }
            FadeDirection::Out => {
                self.backend.order_out(panel);
                self.phase = OverlayPhase::Hidden;
                log::debug!("overlay: hidden");
            }
        }
    }

    /// Measure the content, resize in place if needed, then re-run placement.
    ///
    /// Returns false when the panel could not be given a frame.
    fn reflow(&mut self, choice: ScreenChoice) -> bool {
        let Some(panel) = self.panel else {
            return false;
        };
        self.reflows += 1;

        let size = self.content.borrow().fitting_size();
        if size.is_degenerate() {
            log::debug!("overlay: content has no size yet, skipping reflow");
            return false;
        }

        let screen = match choice {
            ScreenChoice::Active => self.backend.active_screen(),
            ScreenChoice::Current => self
                .backend
                .screen_of(HostWindowRef::from(panel))
                .or_else(|| self.backend.active_screen()),
        };
        let Some(screen) = screen else {
            log::debug!("overlay: no screen available, leaving frame as is");
            return false;
        };

        let Some(mut current) = self.backend.panel_frame(panel) else {
            return false;
        };

        if !size.approx_eq(&current.size) {
            let resized = current.with_size(size);
            self.backend.set_panel_frame(panel, resized, false);
            current = resized;
        }

        let placed = PlacementPolicy::bottom_center(self.vertical_offset).place(size, Some(screen));
        self.apply_frame(panel, current, placed);
        true
    }

    fn apply_frame(&self, panel: WindowId, current: ScreenRect, target: ScreenRect) {
        if current.approx_eq(&target) {
            return;
        }
        log::trace!("overlay: frame {} -> {}", current, target);
        self.backend.set_panel_frame(panel, target, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TranscriptContent;
    use crate::geometry::{Size, FRAME_TOLERANCE};
    use crate::window::headless::BackendOp;
    use crate::window::HeadlessBackend;
    use std::time::Duration;

    struct Fixture {
        backend: Rc<HeadlessBackend>,
        content: Rc<RefCell<TranscriptContent>>,
        overlay: PrimaryOverlayController,
        start: Instant,
    }

    fn fixture(vertical_offset: f64) -> Fixture {
        let backend = Rc::new(HeadlessBackend::new());
        backend.add_screen_with_visible(
            ScreenRect::new(0.0, 0.0, 1440.0, 875.0),
            ScreenRect::new(0.0, 0.0, 1440.0, 850.0),
        );
        let content = Rc::new(RefCell::new(TranscriptContent::new(OverlaySize::Medium)));
        let settings = OverlaySettings {
            vertical_offset,
            size: OverlaySize::Medium,
        };
        let overlay =
            PrimaryOverlayController::new(backend.clone(), content.clone(), &settings, Timing::default());
        Fixture {
            backend,
            content,
            overlay,
            start: Instant::now(),
        }
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    fn is_set_frame(op: &BackendOp) -> bool {
        matches!(op, BackendOp::SetFrame { .. })
    }

    #[test]
    fn test_show_places_bottom_center_and_fades_in() {
        let mut f = fixture(200.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);

        let panel = f.overlay.panel().unwrap();
        let frame = f.backend.window_frame(panel).unwrap();
        assert_eq!(frame.size, Size::new(200.0, 36.0));
        assert_eq!(frame.origin.x, 720.0 - 100.0);
        assert_eq!(frame.origin.y, 200.0);
        assert!(f.backend.is_panel_visible(panel));
        assert_eq!(f.overlay.phase(), OverlayPhase::Showing);
        assert_eq!(f.backend.alpha_of(panel), Some(0.0));

        f.overlay.tick(ms(f.start, 100));
        let midway = f.overlay.alpha();
        assert!(midway > 0.0 && midway < 1.0);

        f.overlay.tick(ms(f.start, 250));
        assert_eq!(f.overlay.phase(), OverlayPhase::Visible);
        assert_eq!(f.overlay.alpha(), 1.0);
        assert_eq!(f.overlay.next_deadline(), None);
    }

    #[test]
    fn test_show_uses_active_screen_and_reflow_keeps_current_one() {
        let mut f = fixture(200.0);
        let second = f.backend.add_screen(ScreenRect::new(1440.0, 0.0, 1920.0, 1080.0));
        f.backend.set_active_screen(second);
        f.overlay.show(None, OverlayMode::Dictation, f.start);

        let panel = f.overlay.panel().unwrap();
        let expected = ScreenRect::new(1440.0 + 960.0 - 100.0, 200.0, 200.0, 36.0);
        assert_eq!(f.backend.window_frame(panel), Some(expected));

        // Focus moves back to the first screen; a reflow stays where the panel is
        let after_show = f.overlay.reflow_count();
        f.backend.set_active_screen(0);
        f.overlay.refresh_size_for_content(ms(f.start, 100));
        f.overlay.tick(ms(f.start, 150));
        assert_eq!(f.overlay.reflow_count(), after_show + 1);
        assert_eq!(f.backend.window_frame(panel), Some(expected));
    }

    #[test]
    fn test_hide_fades_out_then_orders_out() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        f.overlay.tick(ms(f.start, 250));

        f.overlay.hide(ms(f.start, 300));
        assert_eq!(f.overlay.phase(), OverlayPhase::Hiding);
        let panel = f.overlay.panel().unwrap();
        assert!(f.backend.is_panel_visible(panel));

        f.overlay.tick(ms(f.start, 460));
        assert_eq!(f.overlay.phase(), OverlayPhase::Hidden);
        assert!(!f.backend.is_panel_visible(panel));
        assert_eq!(f.overlay.alpha(), 0.0);
    }

    #[test]
    fn test_show_while_hiding_reverses_from_current_alpha() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        f.overlay.tick(ms(f.start, 250));
        f.overlay.hide(ms(f.start, 300));
        f.overlay.tick(ms(f.start, 350));
        let partial = f.overlay.alpha();
        assert!(partial > 0.0 && partial < 1.0);

        f.overlay.show(None, OverlayMode::Dictation, ms(f.start, 350));
        assert_eq!(f.overlay.phase(), OverlayPhase::Showing);
        f.overlay.tick(ms(f.start, 366));
        assert!(f.overlay.alpha() >= partial);

        let panel = f.overlay.panel().unwrap();
        assert_eq!(f.backend.count_ops(|op| matches!(op, BackendOp::OrderOut { .. })), 0);
        assert_eq!(
            f.backend.count_ops(|op| matches!(op, BackendOp::CreatePanel { .. })),
            1
        );
        assert!(f.backend.is_panel_visible(panel));
    }

    #[test]
    fn test_refresh_bursts_collapse_into_one_reflow_with_latest_content() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        let after_show = f.overlay.reflow_count();
        f.backend.take_ops();

        for i in 0..20 {
            f.content.borrow_mut().push_text("word ");
            f.overlay.refresh_size_for_content(ms(f.start, 10 + i));
        }
        f.overlay.tick(ms(f.start, 40));
        assert_eq!(f.overlay.reflow_count(), after_show);

        f.overlay.tick(ms(f.start, 29 + 50));
        assert_eq!(f.overlay.reflow_count(), after_show + 1);
        assert!(!f.overlay.is_resize_pending());

        let panel = f.overlay.panel().unwrap();
        let expected = f.content.borrow().fitting_size();
        let frame = f.backend.window_frame(panel).unwrap();
        assert!(frame.size.approx_eq(&expected));
    }

    #[test]
    fn test_resize_keeps_origin_before_placement() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        let panel = f.overlay.panel().unwrap();
        let before = f.backend.window_frame(panel).unwrap();
        f.backend.take_ops();

        f.content.borrow_mut().push_text(&"x".repeat(40));
        f.overlay.refresh_size_for_content(f.start);
        f.overlay.tick(ms(f.start, 50));

        let frames: Vec<ScreenRect> = f
            .backend
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                BackendOp::SetFrame { frame, animate, .. } => {
                    assert!(!animate);
                    Some(frame)
                }
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].origin, before.origin);
        assert!(frames[1].width() > before.width());
        assert!((frames[1].mid_x() - 720.0).abs() < FRAME_TOLERANCE);
    }

    #[test]
    fn test_unchanged_reflow_applies_no_frames() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        f.backend.take_ops();

        f.overlay.refresh_size_for_content(f.start);
        f.overlay.tick(ms(f.start, 50));
        f.overlay.refresh_size_for_content(ms(f.start, 60));
        f.overlay.tick(ms(f.start, 110));

        assert_eq!(f.overlay.reflow_count(), 3);
        assert_eq!(f.backend.count_ops(is_set_frame), 0);
    }

    #[test]
    fn test_vertical_offset_change_moves_without_resize() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        let panel = f.overlay.panel().unwrap();
        f.backend.take_ops();

        f.overlay.set_vertical_offset(300.0, f.start);
        f.overlay.tick(ms(f.start, 50));

        assert_eq!(f.backend.count_ops(is_set_frame), 1);
        assert_eq!(f.backend.window_frame(panel).unwrap().origin.y, 300.0);
    }

    #[test]
    fn test_offset_past_the_top_is_clamped() {
        let mut f = fixture(5000.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        let frame = f.backend.window_frame(f.overlay.panel().unwrap()).unwrap();
        assert_eq!(frame.max_y(), 850.0 - 40.0);
    }

    #[test]
    fn test_hide_cancels_pending_resize() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        let after_show = f.overlay.reflow_count();

        f.overlay.set_processing(true, f.start);
        assert!(f.overlay.is_resize_pending());
        f.overlay.hide(ms(f.start, 10));
        assert!(!f.overlay.is_resize_pending());

        f.overlay.tick(ms(f.start, 500));
        assert_eq!(f.overlay.reflow_count(), after_show);
        assert!(f.content.borrow().is_processing());
    }

    #[test]
    fn test_show_without_screen_leaves_panel_off_screen() {
        let backend = Rc::new(HeadlessBackend::new());
        let content = Rc::new(RefCell::new(TranscriptContent::new(OverlaySize::Medium)));
        let mut overlay = PrimaryOverlayController::new(
            backend.clone(),
            content,
            &OverlaySettings::default(),
            Timing::default(),
        );

        overlay.show(None, OverlayMode::Command, Instant::now());
        assert_eq!(overlay.phase(), OverlayPhase::Hidden);
        let panel = overlay.panel().unwrap();
        assert!(!backend.is_panel_visible(panel));
        assert_eq!(backend.count_ops(is_set_frame), 0);
    }

    #[test]
    fn test_show_passes_mode_to_content() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Edit, f.start);
        assert_eq!(f.content.borrow().mode(), OverlayMode::Edit);
    }

    #[test]
    fn test_teardown_orders_out_and_clears_deadlines() {
        let mut f = fixture(60.0);
        f.overlay.show(None, OverlayMode::Dictation, f.start);
        f.overlay.refresh_size_for_content(f.start);
        assert!(f.overlay.next_deadline().is_some());

        f.overlay.teardown();
        assert_eq!(f.overlay.phase(), OverlayPhase::Hidden);
        assert_eq!(f.overlay.next_deadline(), None);
        assert!(!f.backend.is_panel_visible(f.overlay.panel().unwrap()));
    }
}
