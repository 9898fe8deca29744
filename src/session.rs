//! Overlay session against the in-memory window server
//!
//! Wires `OverlayServices` to a `HeadlessBackend`, transcript content and the
//! mode menu, and applies `OverlayCommand`s to it. Scripts are replayed in
//! virtual time: `wait` jumps straight to each pending deadline instead of
//! sleeping.

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::conf::Settings;
use crate::content::{MenuItems, TranscriptContent};
use crate::geometry::ScreenRect;
use crate::protocol::OverlayCommand;
use crate::services::OverlayServices;
use crate::window::headless::BackendOp;
use crate::window::HeadlessBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Backend operation stamped with the session time it happened at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedOp {
    pub at_ms: u64,
    #[serde(flatten)]
    pub op: BackendOp,
}

pub struct HeadlessSession {
    backend: Rc<HeadlessBackend>,
    transcript: Rc<RefCell<TranscriptContent>>,
    services: OverlayServices,
    started_at: Instant,
}

impl HeadlessSession {
    pub fn new(screen: ScreenRect, settings: Settings, started_at: Instant) -> Self {
        let backend = Rc::new(HeadlessBackend::with_screen(screen));
        let transcript = Rc::new(RefCell::new(TranscriptContent::new(settings.overlay.size)));
        let services = OverlayServices::new(
            backend.clone(),
            transcript.clone(),
            Rc::new(RefCell::new(MenuItems::modes())),
            settings,
        );

        Self {
            backend,
            transcript,
            services,
            started_at,
        }
    }

    pub fn backend(&self) -> &HeadlessBackend {
        &self.backend
    }

    pub fn services(&self) -> &OverlayServices {
        &self.services
    }

    pub fn transcript(&self) -> std::cell::Ref<'_, TranscriptContent> {
        self.transcript.borrow()
    }

    pub fn apply(&mut self, command: &OverlayCommand, now: Instant) -> Flow {
        log::debug!("command: {}", command.name());

        match command {
            OverlayCommand::Show { mode } => self.services.show(None, *mode, now),
            OverlayCommand::Hide => self.services.hide(now),
            OverlayCommand::SetProcessing { processing } => {
                self.services.set_processing(*processing, now)
            }
            OverlayCommand::AppendText { text } => {
                self.transcript.borrow_mut().push_text(text);
                self.services.refresh_size_for_content(now);
            }
            OverlayCommand::ClearText => {
                self.transcript.borrow_mut().clear_text();
                self.services.refresh_size_for_content(now);
            }
            OverlayCommand::SelectorHover { hovering } => {
                self.services.selector_hover_changed(*hovering, now)
            }
            OverlayCommand::MenuHover { hovering } => {
                self.services.menu_hover_changed(*hovering, now)
            }
            OverlayCommand::TriggerLayout { frame } => {
                self.services.trigger_layout_changed(*frame, now)
            }
            OverlayCommand::SetVerticalOffset { offset } => {
                self.services.set_vertical_offset(*offset, now)
            }
            OverlayCommand::SetOverlaySize { size } => self.services.set_overlay_size(*size, now),
            OverlayCommand::Wait { ms } => {
                log::trace!("wait {}ms is handled by the caller's clock", ms);
            }
            OverlayCommand::Quit => {
                self.services.teardown();
                return Flow::Quit;
            }
        }

        Flow::Continue
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.services.next_deadline()
    }

    pub fn tick(&mut self, now: Instant) {
        self.services.tick(now);
    }

    /// Drain the backend's op log, stamped with `now`
    pub fn take_ops(&self, now: Instant) -> Vec<TimedOp> {
        let at_ms = now.saturating_duration_since(self.started_at).as_millis() as u64;
        self.backend
            .take_ops()
            .into_iter()
            .map(|op| TimedOp { at_ms, op })
            .collect()
    }

    /// Replay `commands` in virtual time and return every backend operation
    pub fn simulate(&mut self, commands: &[OverlayCommand]) -> Vec<TimedOp> {
        let mut now = self.started_at;
        let mut ops = Vec::new();

        for command in commands {
            if let OverlayCommand::Wait { ms } = command {
                let until = now + Duration::from_millis(*ms);
                now = self.advance(now, until, &mut ops);
                continue;
            }

            let flow = self.apply(command, now);
            ops.extend(self.take_ops(now));
            if flow == Flow::Quit {
                break;
            }
        }

        ops
    }

    /// Fire every deadline up to `until` in order, returning the new clock
    fn advance(&mut self, mut now: Instant, until: Instant, ops: &mut Vec<TimedOp>) -> Instant {
        while let Some(deadline) = self.next_deadline().filter(|deadline| *deadline <= until) {
            now = deadline.max(now);
            self.tick(now);
            ops.extend(self.take_ops(now));
        }
        until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_script;
    use crate::overlay::OverlayPhase;

    fn session() -> HeadlessSession {
        HeadlessSession::new(
            ScreenRect::new(0.0, 0.0, 1440.0, 900.0),
            Settings::default(),
            Instant::now(),
        )
    }

    #[test]
    fn test_show_then_wait_completes_fade() {
        let mut session = session();
        let commands = decode_script(
            r#"
{"type":"show","mode":"dictation"}
{"type":"wait","ms":300}
"#,
        )
        .unwrap();

        let ops = session.simulate(&commands);
        assert!(matches!(ops[0].op, BackendOp::CreatePanel { .. }));
        assert_eq!(session.services().overlay().phase(), OverlayPhase::Visible);

        let last_alpha = ops
            .iter()
            .rev()
            .find_map(|timed| match timed.op {
                BackendOp::SetAlpha { alpha, .. } => Some(alpha),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_alpha, 1.0);
        assert!(ops.iter().all(|timed| timed.at_ms <= 300));
    }

    #[test]
    fn test_streamed_text_reflows_once_after_burst() {
        let mut session = session();
        let mut commands = vec![
            OverlayCommand::Show {
                mode: Default::default(),
            },
            OverlayCommand::Wait { ms: 300 },
        ];
        for _ in 0..10 {
            commands.push(OverlayCommand::AppendText {
                text: "some words ".to_string(),
            });
            commands.push(OverlayCommand::Wait { ms: 5 });
        }
        commands.push(OverlayCommand::Wait { ms: 200 });

        let ops = session.simulate(&commands);
        let reflow_frames = ops
            .iter()
            .filter(|timed| timed.at_ms > 300 && matches!(timed.op, BackendOp::SetFrame { .. }))
            .count();
        assert_eq!(reflow_frames, 2);
        assert_eq!(session.services().overlay().reflow_count(), 2);
        assert_eq!(session.transcript().text().len(), 110);
    }

    #[test]
    fn test_quit_stops_replay_and_tears_down() {
        let mut session = session();
        let commands = vec![
            OverlayCommand::Show {
                mode: Default::default(),
            },
            OverlayCommand::Quit,
            OverlayCommand::Show {
                mode: Default::default(),
            },
        ];
        let ops = session.simulate(&commands);
        assert!(matches!(
            ops.last().map(|timed| &timed.op),
            Some(BackendOp::OrderOut { .. })
        ));
        assert_eq!(session.services().overlay().phase(), OverlayPhase::Hidden);
    }

    #[test]
    fn test_timed_op_serializes_flat() {
        let timed = TimedOp {
            at_ms: 16,
            op: BackendOp::OrderFront {
                window: crate::window::WindowId(3),
            },
        };
        assert_eq!(
            serde_json::to_string(&timed).unwrap(),
            r#"{"at_ms":16,"op":"order_front","window":3}"#
        );
    }
}
