//! Single-threaded driver for the controller.
//!
//! Host events, engine messages and callback timers all arrive on one mpsc
//! channel and are handled in arrival order on the thread calling
//! [`EventLoop::run`]. The engine reader and the timers run on their own
//! threads and only ever send into that channel.

use std::ffi::OsStr;
use std::io::Read;
use std::process::ChildStdin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use ime_core::settings::Settings;
use ime_session::{Controller, EngineChannel, Host, HostEvent};

use crate::transport::{reader_loop, EngineProcess, FrameWriter, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    Host(HostEvent),
    Engine(String),
    /// The engine's output stream ended.
    EngineClosed,
}

/// Arms one-shot callback timers. Hosts call [`CallbackTimer::arm`] from
/// `Host::schedule_callback`.
#[derive(Debug, Clone)]
pub struct CallbackTimer {
    tx: Sender<LoopEvent>,
}

impl CallbackTimer {
    pub fn arm(&self, delay: Duration, generation: u64) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            // The loop may already be gone; nothing left to notify then.
            let _ = tx.send(LoopEvent::Host(HostEvent::CallbackTimer { generation }));
        });
    }
}

/// Forward every engine message from `reader` into the loop, followed by
/// [`LoopEvent::EngineClosed`].
pub fn spawn_engine_reader<R>(reader: R, tx: Sender<LoopEvent>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let result = reader_loop(reader, |message| {
            let _ = tx.send(LoopEvent::Engine(message));
        });
        if let Err(e) = result {
            warn!("engine reader stopped: {e}");
        }
        let _ = tx.send(LoopEvent::EngineClosed);
    })
}

pub struct EventLoop<H, C> {
    controller: Controller<H, C>,
    tx: Sender<LoopEvent>,
    rx: Receiver<LoopEvent>,
}

impl<H: Host> EventLoop<H, FrameWriter<ChildStdin>> {
    /// Start the engine process and wire its pipes to a new loop.
    pub fn spawn<F, I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        make_host: F,
        settings: Settings,
    ) -> Result<(Self, EngineProcess, JoinHandle<()>), TransportError>
    where
        F: FnOnce(CallbackTimer) -> H,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (process, writer, stdout) = EngineProcess::spawn(program, args)?;
        let event_loop = Self::new(make_host, writer, settings);
        let reader = event_loop.attach_engine(stdout);
        Ok((event_loop, process, reader))
    }
}

impl<H: Host, C: EngineChannel> EventLoop<H, C> {
    /// Build the loop around a controller created from the host `make_host`
    /// returns; the host receives the timer it should arm.
    pub fn new<F>(make_host: F, channel: C, settings: Settings) -> Self
    where
        F: FnOnce(CallbackTimer) -> H,
    {
        let (tx, rx) = mpsc::channel();
        let host = make_host(CallbackTimer { tx: tx.clone() });
        Self {
            controller: Controller::new(host, channel, settings),
            tx,
            rx,
        }
    }

    /// The reader thread feeding this loop from `stdout`.
    pub fn attach_engine<R>(&self, stdout: R) -> JoinHandle<()>
    where
        R: Read + Send + 'static,
    {
        spawn_engine_reader(stdout, self.sender())
    }

    pub fn sender(&self) -> Sender<LoopEvent> {
        self.tx.clone()
    }

    pub fn controller(&self) -> &Controller<H, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller<H, C> {
        &mut self.controller
    }

    fn handle(&mut self, event: LoopEvent) -> bool {
        match event {
            LoopEvent::Host(event) => self.controller.submit(event),
            LoopEvent::Engine(message) => self.controller.on_engine_message(&message),
            LoopEvent::EngineClosed => {
                debug!("engine closed, leaving event loop");
                return false;
            }
        }
        true
    }

    /// Run until the engine goes away.
    pub fn run(&mut self) {
        while let Ok(event) = self.rx.recv() {
            if !self.handle(event) {
                break;
            }
        }
    }

    /// Handle everything already queued without blocking. Returns false once
    /// the engine has closed.
    pub fn run_pending(&mut self) -> bool {
        while let Ok(event) = self.rx.try_recv() {
            if !self.handle(event) {
                return false;
            }
        }
        true
    }

    /// Wait up to `timeout` for one event and handle it.
    pub fn run_once(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => self.handle(event),
            Err(mpsc::RecvTimeoutError::Timeout) => true,
            Err(mpsc::RecvTimeoutError::Disconnected) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    use ime_core::translator::RawKeyEvent;
    use ime_session::{
        CandidateWindowProperties, Composition, ContextId, FieldKind, HostCandidate,
        InputContext, MenuItem,
    };

    use crate::transport::write_frame;

    #[derive(Default, Clone)]
    struct Posted(Arc<Mutex<Vec<String>>>);

    impl EngineChannel for Posted {
        fn post(&mut self, message: String) -> io::Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct TimerHost {
        timer: CallbackTimer,
        handled: Vec<(String, bool)>,
    }

    impl Host for TimerHost {
        fn set_composition(&mut self, _: ContextId, _: &Composition) {}
        fn clear_composition(&mut self, _: ContextId) {}
        fn set_candidates(&mut self, _: ContextId, _: &[HostCandidate]) {}
        fn set_cursor_position(&mut self, _: ContextId, _: i32) {}
        fn set_candidate_window_properties(&mut self, _: &str, _: &CandidateWindowProperties) {}
        fn commit_text(&mut self, _: ContextId, _: &str) {}
        fn set_menu_items(&mut self, _: &str, _: &[MenuItem]) {}
        fn update_menu_items(&mut self, _: &str, _: &[MenuItem]) {}
        fn delete_surrounding_text(&mut self, _: &str, _: ContextId, _: i32, _: u32) {}
        fn key_event_handled(&mut self, request_id: &str, handled: bool) {
            self.handled.push((request_id.to_string(), handled));
        }
        fn schedule_callback(&mut self, delay: Duration, generation: u64) {
            self.timer.arm(delay, generation);
        }
    }

    fn new_loop(posted: &Posted) -> EventLoop<TimerHost, Posted> {
        EventLoop::new(
            |timer| TimerHost {
                timer,
                handled: Vec::new(),
            },
            posted.clone(),
            Settings::default(),
        )
    }

    const INIT: &str = r#"{"event":{"type":"InitializeDone","config":{}}}"#;

    fn last_id(posted: &Posted) -> u64 {
        let sent = posted.0.lock().unwrap();
        let value: serde_json::Value = serde_json::from_str(sent.last().unwrap()).unwrap();
        value["id"].as_u64().unwrap()
    }

    #[test]
    fn engine_messages_from_reader_thread_drive_the_controller() {
        let posted = Posted::default();
        let mut ev = new_loop(&posted);

        let mut stream = Vec::new();
        write_frame(&mut stream, INIT.as_bytes(), 1024).unwrap();
        spawn_engine_reader(Cursor::new(stream), ev.sender())
            .join()
            .unwrap();

        let tx = ev.sender();
        tx.send(LoopEvent::Host(HostEvent::Activate {
            engine_id: "japanese_us".into(),
        }))
        .unwrap();
        tx.send(LoopEvent::Host(HostEvent::Focus(InputContext {
            context_id: 1,
            kind: FieldKind::Text,
        })))
        .unwrap();

        // EngineClosed was queued by the reader right after the init message.
        assert!(!ev.run_pending());
        assert!(ev.controller().gateway().is_ready());
        ev.run_pending();
        assert_eq!(posted.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn timer_fire_reaches_the_controller() {
        let posted = Posted::default();
        let mut ev = new_loop(&posted);
        let tx = ev.sender();
        tx.send(LoopEvent::Engine(INIT.into())).unwrap();
        tx.send(LoopEvent::Host(HostEvent::Activate {
            engine_id: "japanese_us".into(),
        }))
        .unwrap();
        tx.send(LoopEvent::Host(HostEvent::Focus(InputContext {
            context_id: 1,
            kind: FieldKind::Text,
        })))
        .unwrap();
        ev.run_pending();
        let create = last_id(&posted);
        tx.send(LoopEvent::Engine(format!(
            r#"{{"id":{create},"cmd":{{"output":{{"id":"5"}}}}}}"#
        )))
        .unwrap();
        tx.send(LoopEvent::Host(HostEvent::Key {
            engine_id: "japanese_us".into(),
            request_id: "r1".into(),
            event: RawKeyEvent::key_down("a", "KeyA"),
        }))
        .unwrap();
        ev.run_pending();

        let key = last_id(&posted);
        tx.send(LoopEvent::Engine(format!(
            r#"{{"id":{key},"cmd":{{"output":{{"consumed":true,"callback":{{"session_command":{{"type":"SUBMIT"}},"delay_millisecond":1}}}}}}}}"#
        )))
        .unwrap();
        ev.run_pending();
        assert!(ev.controller().has_pending_callback());
        assert_eq!(ev.controller().host().handled, vec![("r1".to_string(), true)]);

        let before = posted.0.lock().unwrap().len();
        assert!(ev.run_once(Duration::from_secs(5)));
        assert!(!ev.controller().has_pending_callback());
        let sent = posted.0.lock().unwrap();
        assert_eq!(sent.len(), before + 1);
        assert!(sent.last().unwrap().contains("SUBMIT"));
    }
}
