//! Logical connection to the engine.
//!
//! Correlates replies with requests over an unordered channel: every request
//! is stamped with the smallest free id and its continuation parked in the
//! pending table until the reply with that id comes back.

use std::collections::BTreeMap;
use std::io;

use tracing::{debug, warn};

use ime_core::command::{
    Capability, Command, Config, Input, InputType, SessionCommand, SessionId,
    UserDictionaryCommand,
};
use ime_core::key_event::KeyEvent;
use ime_core::protocol::{
    decode_inbound, encode_request, EngineEvent, Inbound, ProtocolError, Request, RequestBody,
    ResponsePayload,
};

/// Outgoing half of the engine message channel.
pub trait EngineChannel {
    fn post(&mut self, message: String) -> io::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("engine has not finished initializing")]
    NotReady,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("reply for unknown request id {0}")]
    UnknownId(u32),
    #[error("engine channel error: {0}")]
    Channel(#[from] io::Error),
}

/// What an inbound message resolved to.
#[derive(Debug)]
pub enum Delivery<T> {
    /// The engine finished initializing. `callbacks` are the continuations
    /// registered with [`Gateway::on_ready`], in registration order.
    Ready { config: Config, callbacks: Vec<T> },
    Reply {
        id: u32,
        continuation: Option<T>,
        payload: ResponsePayload,
    },
}

pub struct Gateway<C, T> {
    channel: C,
    pending: BTreeMap<u32, Option<T>>,
    ready: bool,
    on_ready: Vec<T>,
}

impl<C: EngineChannel, T> Gateway<C, T> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            pending: BTreeMap::new(),
            ready: false,
            on_ready: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// No request is awaiting its reply.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: u32) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Register a continuation for engine readiness. Returns it back when the
    /// engine is already ready so the caller can run it right away.
    pub fn on_ready(&mut self, continuation: T) -> Option<T> {
        if self.ready {
            return Some(continuation);
        }
        self.on_ready.push(continuation);
        None
    }

    fn next_id(&self) -> u32 {
        // Ids are handed out densely, so the first gap is found quickly.
        let mut id = 0;
        for &used in self.pending.keys() {
            if used != id {
                break;
            }
            id += 1;
        }
        id
    }

    pub fn send(&mut self, body: RequestBody, continuation: Option<T>) -> Result<u32, GatewayError> {
        if !self.ready {
            warn!("dropping request sent before engine initialization");
            return Err(GatewayError::NotReady);
        }
        let id = self.next_id();
        let message = encode_request(&Request { id, body })?;
        self.pending.insert(id, continuation);
        if let Err(e) = self.channel.post(message) {
            self.pending.remove(&id);
            return Err(e.into());
        }
        debug!(id, pending = self.pending.len(), "request sent");
        Ok(id)
    }

    /// Resolve one inbound message.
    ///
    /// Unparsable messages are reported and dropped; whatever request they
    /// answered stays pending.
    pub fn receive(&mut self, text: &str) -> Result<Delivery<T>, GatewayError> {
        match decode_inbound(text)? {
            Inbound::Initialized { config, version } => {
                if self.ready {
                    warn!("duplicate initialization signal");
                }
                debug!(?version, "engine initialized");
                self.ready = true;
                Ok(Delivery::Ready {
                    config,
                    callbacks: std::mem::take(&mut self.on_ready),
                })
            }
            Inbound::Response { id, payload } => {
                let continuation = self
                    .pending
                    .remove(&id)
                    .ok_or(GatewayError::UnknownId(id))?;
                debug!(id, pending = self.pending.len(), "reply received");
                Ok(Delivery::Reply {
                    id,
                    continuation,
                    payload,
                })
            }
        }
    }

    // --- Typed requests ---

    fn command(&mut self, input: Input, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.send(RequestBody::Command(Command::new(input)), continuation)
    }

    fn event(&mut self, event: EngineEvent, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.send(RequestBody::Event(event), continuation)
    }

    pub fn create_session(
        &mut self,
        capability: Capability,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        let mut input = Input::new(InputType::CreateSession);
        input.capability = Some(capability);
        self.command(input, continuation)
    }

    pub fn delete_session(
        &mut self,
        session: &SessionId,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        self.command(
            Input::for_session(InputType::DeleteSession, session),
            continuation,
        )
    }

    pub fn send_key(
        &mut self,
        session: &SessionId,
        key: KeyEvent,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        let mut input = Input::for_session(InputType::SendKey, session);
        input.key = Some(key);
        self.command(input, continuation)
    }

    pub fn send_command(
        &mut self,
        session: &SessionId,
        command: SessionCommand,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        let mut input = Input::for_session(InputType::SendCommand, session);
        input.command = Some(command);
        self.command(input, continuation)
    }

    pub fn get_config(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.command(Input::new(InputType::GetConfig), continuation)
    }

    pub fn set_config(
        &mut self,
        config: Config,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        let mut input = Input::new(InputType::SetConfig);
        input.config = Some(config);
        self.command(input, continuation)
    }

    pub fn clear_user_history(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.command(Input::new(InputType::ClearUserHistory), continuation)
    }

    pub fn clear_user_prediction(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.command(Input::new(InputType::ClearUserPrediction), continuation)
    }

    pub fn clear_unused_user_prediction(
        &mut self,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        self.command(Input::new(InputType::ClearUnusedUserPrediction), continuation)
    }

    pub fn reload(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.command(Input::new(InputType::Reload), continuation)
    }

    pub fn send_user_dictionary_command(
        &mut self,
        command: UserDictionaryCommand,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        let mut input = Input::new(InputType::SendUserDictionaryCommand);
        input.user_dictionary_command = Some(command);
        self.command(input, continuation)
    }

    pub fn get_version_info(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.event(EngineEvent::GetVersionInfo, continuation)
    }

    pub fn is_valid_reading(
        &mut self,
        reading: &str,
        continuation: Option<T>,
    ) -> Result<u32, GatewayError> {
        self.event(
            EngineEvent::IsValidReading {
                data: reading.to_string(),
            },
            continuation,
        )
    }

    pub fn get_pos_list(&mut self, continuation: Option<T>) -> Result<u32, GatewayError> {
        self.event(EngineEvent::GetPosList, continuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    #[derive(Default)]
    struct Outbox(Vec<String>);

    impl EngineChannel for Outbox {
        fn post(&mut self, message: String) -> io::Result<()> {
            self.0.push(message);
            Ok(())
        }
    }

    struct Broken;

    impl EngineChannel for Broken {
        fn post(&mut self, _message: String) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "engine gone"))
        }
    }

    const INIT: &str = r#"{"event": {"type": "InitializeDone", "config": {"preedit_method": "ROMAN"}}}"#;

    fn ready_gateway() -> Gateway<Outbox, &'static str> {
        let mut gw = Gateway::new(Outbox::default());
        gw.receive(INIT).unwrap();
        gw
    }

    fn reply(id: u32) -> String {
        format!(r#"{{"id": {id}, "cmd": {{"output": {{"consumed": true}}}}}}"#)
    }

    #[test]
    fn send_before_ready_fails_fast() {
        let mut gw: Gateway<Outbox, ()> = Gateway::new(Outbox::default());
        assert!(matches!(gw.reload(None), Err(GatewayError::NotReady)));
        assert!(gw.channel().0.is_empty());
        assert!(gw.is_idle());
    }

    #[test]
    fn ready_runs_registered_callbacks_once() {
        let mut gw = Gateway::new(Outbox::default());
        assert!(gw.on_ready("first").is_none());
        assert!(gw.on_ready("second").is_none());
        match gw.receive(INIT).unwrap() {
            Delivery::Ready { config, callbacks } => {
                assert!(!config.is_kana_input());
                assert_eq!(callbacks, vec!["first", "second"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(gw.is_ready());
        assert_eq!(gw.on_ready("late"), Some("late"));
    }

    #[test]
    fn ids_are_stamped_on_the_wire() {
        let mut gw = ready_gateway();
        gw.get_config(None).unwrap();
        gw.is_valid_reading("よみ", None).unwrap();
        let first: Value = serde_json::from_str(&gw.channel().0[0]).unwrap();
        let second: Value = serde_json::from_str(&gw.channel().0[1]).unwrap();
        assert_eq!(first["id"], 0);
        assert_eq!(first["cmd"]["input"]["type"], "GET_CONFIG");
        assert_eq!(second["id"], 1);
        assert_eq!(second["event"]["type"], "IsValidReading");
        assert_eq!(second["event"]["data"], "よみ");
    }

    #[test]
    fn replies_resolve_only_their_own_continuation() {
        let mut gw = ready_gateway();
        let a = gw.reload(Some("a")).unwrap();
        let b = gw.reload(Some("b")).unwrap();
        assert_ne!(a, b);
        match gw.receive(&reply(b)).unwrap() {
            Delivery::Reply {
                id, continuation, ..
            } => {
                assert_eq!(id, b);
                assert_eq!(continuation, Some("b"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(gw.is_pending(a));
        assert!(!gw.is_pending(b));
    }

    #[test]
    fn smallest_free_id_is_reused_only_after_resolution() {
        let mut gw = ready_gateway();
        assert_eq!(gw.reload(None).unwrap(), 0);
        assert_eq!(gw.reload(None).unwrap(), 1);
        assert_eq!(gw.reload(None).unwrap(), 2);
        gw.receive(&reply(1)).unwrap();
        assert_eq!(gw.reload(None).unwrap(), 1);
        assert_eq!(gw.reload(None).unwrap(), 3);
    }

    #[test]
    fn unknown_and_malformed_replies_leave_pending_untouched() {
        let mut gw = ready_gateway();
        gw.reload(Some("x")).unwrap();
        assert!(matches!(
            gw.receive(&reply(7)),
            Err(GatewayError::UnknownId(7))
        ));
        assert!(matches!(
            gw.receive("{\"id\": 0, \"cmd\": "),
            Err(GatewayError::Protocol(_))
        ));
        assert_eq!(gw.pending_len(), 1);
    }

    #[test]
    fn channel_failure_releases_the_id() {
        let mut gw: Gateway<Broken, ()> = Gateway::new(Broken);
        gw.receive(INIT).unwrap();
        assert!(matches!(gw.reload(None), Err(GatewayError::Channel(_))));
        assert!(gw.is_idle());
    }

    proptest! {
        #[test]
        fn allocated_id_is_smallest_unused(ops in prop::collection::vec(any::<(bool, u8)>(), 1..60)) {
            let mut gw: Gateway<Outbox, ()> = ready_gateway_unit();
            let mut outstanding: Vec<u32> = Vec::new();
            for (send, pick) in ops {
                if send || outstanding.is_empty() {
                    let id = gw.reload(None).unwrap();
                    let expected = (0..).find(|i| !outstanding.contains(i)).unwrap();
                    prop_assert_eq!(id, expected);
                    outstanding.push(id);
                } else {
                    let id = outstanding.remove(pick as usize % outstanding.len());
                    prop_assert!(gw.receive(&reply(id)).is_ok());
                    prop_assert!(!gw.is_pending(id));
                }
                prop_assert_eq!(gw.pending_len(), outstanding.len());
            }
        }
    }

    fn ready_gateway_unit() -> Gateway<Outbox, ()> {
        let mut gw = Gateway::new(Outbox::default());
        gw.receive(INIT).unwrap();
        gw
    }
}
