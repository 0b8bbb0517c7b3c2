//! Front-end controller sitting between the host input-method framework and
//! the conversion engine.
//!
//! `Controller` owns the key translator, the engine gateway, the input pump
//! and the output reconciler. Host events go in through [`Controller::submit`]
//! (or one of its wrappers), engine messages through
//! [`Controller::on_engine_message`]; everything visible comes out through the
//! [`Host`] trait.

pub mod gateway;
pub mod host;
pub mod menu;
pub mod pump;
pub mod reconciler;
pub mod types;

mod handlers;
mod replies;

#[cfg(test)]
mod tests;

use tracing::{debug, warn};

use ime_core::command::{Config, SessionCommand, SessionId};
use ime_core::key_event::CompositionMode;
use ime_core::keymap::KeyboardLayout;
use ime_core::settings::Settings;
use ime_core::translator::{KeyTranslator, RawKeyEvent};

pub use gateway::{Delivery, EngineChannel, Gateway, GatewayError};
pub use host::{
    CandidateWindowProperties, Composition, CompositionSegment, ContextId, FieldKind, Host,
    HostCandidate, InputContext, MenuItem, MouseButton, SurroundingText, UnderlineStyle,
    UsageText, WindowPosition,
};
pub use pump::{InputPump, PumpState};
pub use reconciler::Reconciler;
pub use types::{Followup, HostEvent, Reply};

#[derive(Debug, Clone)]
struct ActiveEngine {
    id: String,
    layout: KeyboardLayout,
}

#[derive(Debug, Clone)]
struct FocusedContext {
    id: ContextId,
    kind: FieldKind,
    session: Option<SessionId>,
}

/// A callback command waiting for its timer.
#[derive(Debug, Clone)]
struct PendingCallback {
    command: SessionCommand,
    generation: u64,
    context_id: ContextId,
}

pub struct Controller<H, C> {
    host: H,
    gateway: Gateway<C, Followup>,
    pump: InputPump,
    translator: KeyTranslator,
    reconciler: Reconciler,
    settings: Settings,
    config: Config,

    engine: Option<ActiveEngine>,
    context: Option<FocusedContext>,
    surrounding: Option<SurroundingText>,

    callback: Option<PendingCallback>,
    /// Bumped for every callback command; a timer carrying an older value is
    /// stale.
    callback_generation: u64,
}

impl<H: Host, C: EngineChannel> Controller<H, C> {
    pub fn new(host: H, channel: C, settings: Settings) -> Self {
        let reconciler = Reconciler::new(&settings);
        Self {
            host,
            gateway: Gateway::new(channel),
            pump: InputPump::new(),
            translator: KeyTranslator::new(),
            reconciler,
            settings,
            config: Config::default(),
            engine: None,
            context: None,
            surrounding: None,
            callback: None,
            callback_generation: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn gateway(&self) -> &Gateway<C, Followup> {
        &self.gateway
    }

    /// Direct access for UI layers issuing their own requests (dictionary
    /// tool, options page). Use [`Followup::external`] for their replies.
    pub fn gateway_mut(&mut self) -> &mut Gateway<C, Followup> {
        &mut self.gateway
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Engine configuration currently in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> CompositionMode {
        self.reconciler.menu_mode()
    }

    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    pub fn queued_events(&self) -> usize {
        self.pump.len()
    }

    /// Session of the focused context, if it has one.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.context.as_ref().and_then(|c| c.session.as_ref())
    }

    pub fn has_pending_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Run `f` once the engine is initialized (right away if it already is).
    pub fn when_ready(&mut self, f: impl FnOnce(Reply) + 'static) {
        if let Some(followup) = self.gateway.on_ready(Followup::external(f)) {
            self.resolve(followup, Reply::Ready(self.config.clone()));
        }
    }

    /// Send SET_CONFIG; the new configuration takes effect once accepted.
    pub fn set_config(&mut self, config: Config) -> Result<u32, GatewayError> {
        self.gateway
            .set_config(config.clone(), Some(Followup::ConfigUpdated { config }))
    }

    // --- Host events ---

    pub fn submit(&mut self, event: HostEvent) {
        self.pump.enqueue(event);
        self.drain();
    }

    pub fn activate(&mut self, engine_id: &str) {
        self.submit(HostEvent::Activate {
            engine_id: engine_id.to_string(),
        });
    }

    pub fn deactivate(&mut self, engine_id: &str) {
        self.submit(HostEvent::Deactivate {
            engine_id: engine_id.to_string(),
        });
    }

    pub fn focus(&mut self, context: InputContext) {
        self.submit(HostEvent::Focus(context));
    }

    pub fn blur(&mut self, context_id: ContextId) {
        self.submit(HostEvent::Blur { context_id });
    }

    pub fn update_context(&mut self, context: InputContext) {
        self.submit(HostEvent::ContextUpdate(context));
    }

    pub fn key_event(&mut self, engine_id: &str, request_id: &str, event: RawKeyEvent) {
        self.submit(HostEvent::Key {
            engine_id: engine_id.to_string(),
            request_id: request_id.to_string(),
            event,
        });
    }

    pub fn candidate_clicked(&mut self, engine_id: &str, candidate_id: i32, button: MouseButton) {
        self.submit(HostEvent::CandidateClicked {
            engine_id: engine_id.to_string(),
            candidate_id,
            button,
        });
    }

    pub fn menu_item_activated(&mut self, engine_id: &str, name: &str) {
        self.submit(HostEvent::MenuItemActivated {
            engine_id: engine_id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn surrounding_text_changed(&mut self, engine_id: &str, info: SurroundingText) {
        self.submit(HostEvent::SurroundingTextChanged {
            engine_id: engine_id.to_string(),
            info,
        });
    }

    pub fn reset(&mut self, engine_id: &str) {
        self.submit(HostEvent::Reset {
            engine_id: engine_id.to_string(),
        });
    }

    pub fn callback_timer_fired(&mut self, generation: u64) {
        self.submit(HostEvent::CallbackTimer { generation });
    }

    // --- Engine messages ---

    /// Handle one inbound engine message, then let the pump resume.
    pub fn on_engine_message(&mut self, text: &str) {
        match self.gateway.receive(text) {
            Ok(Delivery::Ready { config, callbacks }) => {
                self.config = config;
                self.pump.init_completed();
                for followup in callbacks {
                    self.resolve(followup, Reply::Ready(self.config.clone()));
                }
            }
            Ok(Delivery::Reply {
                id,
                continuation,
                payload,
            }) => match continuation {
                Some(followup) => self.resolve(followup, payload.into()),
                None => debug!(id, "reply without continuation"),
            },
            Err(e) => warn!("dropping engine message: {e}"),
        }
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(event) = self.pump.begin(self.gateway.is_idle()) {
            self.dispatch(event);
            self.pump.finish();
        }
    }
}
