//! UI-thread event loop
//!
//! Everything the overlay does runs on the thread that owns the calloop
//! event loop. Commands arrive over a calloop channel; one timer is kept armed
//! for the session's earliest deadline and re-armed after every dispatch.

use calloop::channel::{self, Channel, Sender};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, LoopSignal, RegistrationToken};
use std::time::Instant;

use crate::conf::Settings;
use crate::error::OverlayError;
use crate::geometry::ScreenRect;
use crate::protocol::OverlayCommand;
use crate::session::{Flow, HeadlessSession, TimedOp};

/// Receives every backend operation as it happens
pub type OpSink = Box<dyn FnMut(&TimedOp)>;

struct ArmedTimer {
    token: RegistrationToken,
    deadline: Instant,
}

pub struct RuntimeState {
    session: HeadlessSession,
    handle: LoopHandle<'static, RuntimeState>,
    signal: LoopSignal,
    timer: Option<ArmedTimer>,
    sink: OpSink,
}

impl RuntimeState {
    fn handle_command(&mut self, command: OverlayCommand) {
        let now = Instant::now();
        if self.session.apply(&command, now) == Flow::Quit {
            log::info!("Quit requested");
            self.signal.stop();
        }
        self.flush(now);
    }

    fn on_timer(&mut self) {
        let now = Instant::now();
        self.session.tick(now);
        self.flush(now);
    }

    fn flush(&mut self, now: Instant) {
        for op in self.session.take_ops(now) {
            (self.sink)(&op);
        }
    }

    /// Keep exactly one timer armed for the earliest pending deadline
    fn rearm(&mut self) {
        let deadline = self.session.next_deadline();
        if self.timer.as_ref().map(|t| t.deadline) == deadline {
            return;
        }

        if let Some(armed) = self.timer.take() {
            self.handle.remove(armed.token);
        }

        let Some(deadline) = deadline else {
            return;
        };

        let inserted = self.handle.insert_source(
            Timer::from_deadline(deadline),
            |_, _, state: &mut RuntimeState| {
                state.timer = None;
                state.on_timer();
                TimeoutAction::Drop
            },
        );
        match inserted {
            Ok(token) => self.timer = Some(ArmedTimer { token, deadline }),
            Err(e) => log::warn!("Failed to arm timer: {}", e.error),
        }
    }
}

pub struct Runtime {
    event_loop: EventLoop<'static, RuntimeState>,
    state: RuntimeState,
}

impl Runtime {
    /// Build the loop and return it with the sender commands are pushed through
    pub fn new(
        screen: ScreenRect,
        settings: Settings,
        sink: OpSink,
    ) -> Result<(Self, Sender<OverlayCommand>), OverlayError> {
        let event_loop: EventLoop<'static, RuntimeState> = EventLoop::try_new()?;
        let handle = event_loop.handle();
        let (sender, commands): (Sender<OverlayCommand>, Channel<OverlayCommand>) =
            channel::channel();

        handle
            .insert_source(commands, |event, _, state: &mut RuntimeState| match event {
                channel::Event::Msg(command) => state.handle_command(command),
                channel::Event::Closed => {
                    log::info!("Command stream closed");
                    state.session.apply(&OverlayCommand::Quit, Instant::now());
                    state.flush(Instant::now());
                    state.signal.stop();
                }
            })
            .map_err(|e| e.error)?;

        let state = RuntimeState {
            session: HeadlessSession::new(screen, settings, Instant::now()),
            handle,
            signal: event_loop.get_signal(),
            timer: None,
            sink,
        };

        Ok((Self { event_loop, state }, sender))
    }

    /// Dispatch until a `quit` command arrives or every sender is dropped
    pub fn run(mut self) -> Result<(), OverlayError> {
        log::info!("Overlay runtime started");
        self.event_loop
            .run(None::<std::time::Duration>, &mut self.state, RuntimeState::rearm)?;
        log::info!("Overlay runtime stopped");
        Ok(())
    }
}
