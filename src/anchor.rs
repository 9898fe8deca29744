//! Anchor probe
//!
//! Sits invisibly inside the popup trigger's layout and turns "a rectangle
//! that moves with normal layout" into "a screen-space rectangle another
//! window can track". It has no opinion on visibility; it only reports.

use std::rc::Rc;

use crate::geometry::ScreenRect;
use crate::window::{
    HostWindowRef, WindowBackend, WindowEvent, WindowEventKind, WindowSubscription,
};

/// Latest known screen-space location of the popup trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSnapshot {
    pub frame: ScreenRect,
    pub host: Option<HostWindowRef>,
}

impl AnchorSnapshot {
    /// Reported once when the probe leaves its window
    pub const EMPTY: AnchorSnapshot = AnchorSnapshot {
        frame: ScreenRect::ZERO,
        host: None,
    };

    pub fn new(frame: ScreenRect, host: HostWindowRef) -> Self {
        Self {
            frame,
            host: Some(host),
        }
    }

    /// No host and no geometry: the probe left its window
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.frame.is_degenerate()
    }

    /// Host identity changed or the frame moved by more than the tolerance
    pub fn differs_from(&self, other: &AnchorSnapshot) -> bool {
        self.host != other.host || !self.frame.approx_eq(&other.frame)
    }
}

pub struct AnchorProbe {
    backend: Rc<dyn WindowBackend>,
    host: Option<HostWindowRef>,
    /// Probe bounds in the host window's coordinate space
    bounds: Option<ScreenRect>,
    subscription: Option<WindowSubscription>,
    last_reported: Option<AnchorSnapshot>,
}

impl AnchorProbe {
    pub fn new(backend: Rc<dyn WindowBackend>) -> Self {
        Self {
            backend,
            host: None,
            bounds: None,
            subscription: None,
            last_reported: None,
        }
    }

    pub fn host(&self) -> Option<HostWindowRef> {
        self.host
    }

    pub fn last_reported(&self) -> Option<AnchorSnapshot> {
        self.last_reported
    }

    /// True while the probe holds a lifecycle subscription on its host
    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    /// The probe was moved into `host`, or out of any window with `None`
    pub fn set_host(&mut self, host: Option<HostWindowRef>) -> Option<AnchorSnapshot> {
        if self.host != host {
            // Unsubscribe from the old host before observing the new one
            self.subscription = None;
            self.host = host;
            if let Some(host) = host.filter(|h| self.backend.is_alive(*h)) {
                log::debug!("anchor: observing host {}", host.id());
                self.subscription = Some(self.backend.observe(host));
            }
        }
        self.recompute()
    }

    /// Normal layout pass moved or resized the probe within its window
    pub fn layout_changed(&mut self, bounds_in_window: ScreenRect) -> Option<AnchorSnapshot> {
        self.bounds = Some(bounds_in_window);
        self.recompute()
    }

    pub fn handle_window_event(&mut self, event: WindowEvent) -> Option<AnchorSnapshot> {
        if self.host.map(|h| h.id()) != Some(event.window) {
            return None;
        }

        match event.kind {
            WindowEventKind::Closed => {
                log::debug!("anchor: host {} closed", event.window);
                self.subscription = None;
                self.host = None;
                self.recompute()
            }
            WindowEventKind::Moved | WindowEventKind::Resized | WindowEventKind::ScreenChanged => {
                self.recompute()
            }
        }
    }

    /// Compute the current snapshot and return it if it should be reported
    fn recompute(&mut self) -> Option<AnchorSnapshot> {
        let current = self.host.and_then(|host| {
            let bounds = self.bounds?;
            let frame = self.backend.convert_to_screen(host, bounds)?;
            Some(AnchorSnapshot::new(frame, host))
        });

        match current {
            Some(snapshot) => {
                if self
                    .last_reported
                    .is_some_and(|last| !snapshot.differs_from(&last))
                {
                    return None;
                }
                self.last_reported = Some(snapshot);
                Some(snapshot)
            }
            None => {
                // Detached: tell consumers once, and only if they saw a position
                if self.host.is_some() && self.bounds.is_none() {
                    return None;
                }
                match self.last_reported {
                    Some(last) if !last.is_empty() => {
                        self.last_reported = Some(AnchorSnapshot::EMPTY);
                        Some(AnchorSnapshot::EMPTY)
                    }
                    _ => None,
                }
            }
        }
    }
}
