use tracing::{debug, debug_span, warn};

use ime_core::command::{Capability, SessionCommand, SessionCommandType, SessionId, TextDeletion};
use ime_core::key_event::CompositionMode;
use ime_core::translator::RawKeyEvent;

use super::host::{ContextId, FieldKind, Host, InputContext, MouseButton, SurroundingText};
use super::menu::{menu_items, mode_for_item};
use super::types::{Followup, HostEvent};
use super::{ActiveEngine, Controller, EngineChannel, FocusedContext};

impl<H: Host, C: EngineChannel> Controller<H, C> {
    pub(super) fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Activate { engine_id } => self.handle_activate(engine_id),
            HostEvent::Deactivate { engine_id } => self.handle_deactivate(&engine_id),
            HostEvent::Focus(context) => self.handle_focus(context),
            HostEvent::Blur { context_id } => self.handle_blur(context_id),
            HostEvent::ContextUpdate(context) => self.handle_context_update(context),
            HostEvent::Key {
                engine_id,
                request_id,
                event,
            } => self.handle_key(&engine_id, &request_id, &event),
            HostEvent::CandidateClicked {
                engine_id,
                candidate_id,
                button,
            } => self.handle_candidate_clicked(&engine_id, candidate_id, button),
            HostEvent::MenuItemActivated { engine_id, name } => {
                self.handle_menu_item(&engine_id, &name)
            }
            HostEvent::SurroundingTextChanged { engine_id, info } => {
                self.handle_surrounding_text(&engine_id, info)
            }
            HostEvent::Reset { engine_id } => self.handle_reset(&engine_id),
            HostEvent::CallbackTimer { generation } => self.handle_callback_timer(generation),
        }
    }

    fn is_active(&self, engine_id: &str) -> bool {
        match &self.engine {
            Some(engine) if engine.id == engine_id => true,
            _ => {
                debug!(engine_id, "event for inactive engine");
                false
            }
        }
    }

    /// The focused context and its session, if both exist.
    fn session_target(&self) -> Option<(ContextId, SessionId)> {
        let context = self.context.as_ref()?;
        Some((context.id, context.session.clone()?))
    }

    fn handle_activate(&mut self, engine_id: String) {
        let layout = self.settings.layout_for(&engine_id);
        debug!(engine_id = %engine_id, %layout, "activate");
        self.reconciler.reset();
        self.translator.reset();
        self.host
            .set_menu_items(&engine_id, &menu_items(self.reconciler.menu_mode()));
        self.engine = Some(ActiveEngine {
            id: engine_id,
            layout,
        });
    }

    fn handle_deactivate(&mut self, engine_id: &str) {
        if !self.is_active(engine_id) {
            return;
        }
        debug!(engine_id, "deactivate");
        self.end_session();
        self.engine = None;
    }

    fn handle_focus(&mut self, context: InputContext) {
        if self.engine.is_none() {
            warn!(context_id = context.context_id, "focus without an active engine");
            return;
        }
        // A context that was never blurred still owns a session.
        self.end_session();
        self.context = Some(FocusedContext {
            id: context.context_id,
            kind: context.kind,
            session: None,
        });
        self.start_session(context.context_id, context.kind);
    }

    fn handle_blur(&mut self, context_id: ContextId) {
        if self.context.as_ref().map(|c| c.id) == Some(context_id) {
            self.end_session();
        } else {
            debug!(context_id, "blur for unfocused context");
        }
    }

    fn handle_context_update(&mut self, update: InputContext) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        if context.id != update.context_id || context.kind == update.kind {
            return;
        }
        let was_password = context.kind == FieldKind::Password;
        context.kind = update.kind;
        let is_password = update.kind == FieldKind::Password;
        if is_password && !was_password {
            self.delete_session();
            self.callback = None;
            if let Some(engine_id) = self.engine.as_ref().map(|e| e.id.clone()) {
                self.reconciler
                    .clear(&mut self.host, &engine_id, update.context_id);
            }
            self.reconciler.reset();
        } else if was_password && !is_password {
            self.start_session(update.context_id, update.kind);
        }
    }

    fn start_session(&mut self, context_id: ContextId, kind: FieldKind) {
        if kind == FieldKind::Password {
            debug!(context_id, "no session for password field");
            return;
        }
        let text_deletion = if self.host.supports_delete_surrounding_text() {
            TextDeletion::DeletePrecedingText
        } else {
            TextDeletion::NoTextDeletionCapability
        };
        if let Err(e) = self.gateway.create_session(
            Capability { text_deletion },
            Some(Followup::SessionCreated { context_id }),
        ) {
            warn!(context_id, "CREATE_SESSION failed: {e}");
        }
    }

    /// Delete the focused context's session, keeping the context.
    fn delete_session(&mut self) {
        let Some(session) = self.context.as_mut().and_then(|c| c.session.take()) else {
            return;
        };
        debug!(%session, "deleting session");
        if let Err(e) = self.gateway.delete_session(&session, None) {
            warn!(%session, "DELETE_SESSION failed: {e}");
        }
    }

    /// Drop the focused context along with everything tied to it.
    fn end_session(&mut self) {
        self.delete_session();
        self.context = None;
        self.surrounding = None;
        self.callback = None;
        self.translator.reset();
        self.reconciler.reset();
    }

    fn handle_key(&mut self, engine_id: &str, request_id: &str, raw: &RawKeyEvent) {
        let _span = debug_span!("key", request_id, code = %raw.code).entered();

        // A new key supersedes any callback command still waiting.
        if self.callback.take().is_some() {
            debug!("callback command superseded");
        }

        let layout = match &self.engine {
            Some(engine) if engine.id == engine_id => engine.layout,
            _ => {
                debug!(engine_id, "key for inactive engine");
                self.host.key_event_handled(request_id, false);
                return;
            }
        };
        let key = self
            .translator
            .translate(raw, self.config.is_kana_input(), layout);

        let Some((context_id, session)) = self.session_target() else {
            debug!("no session, passing key through");
            self.host.key_event_handled(request_id, false);
            return;
        };
        if self.reconciler.is_direct() || key.is_empty() {
            self.host.key_event_handled(request_id, false);
            return;
        }

        let key = key.with_mode(self.reconciler.mode());
        let followup = Followup::KeyReply {
            request_id: request_id.to_string(),
            context_id,
        };
        if let Err(e) = self.gateway.send_key(&session, key, Some(followup)) {
            warn!("SEND_KEY failed: {e}");
            self.host.key_event_handled(request_id, false);
        }
    }

    fn handle_candidate_clicked(&mut self, engine_id: &str, candidate_id: i32, button: MouseButton) {
        if button != MouseButton::Left || !self.is_active(engine_id) {
            return;
        }
        self.send_session_command(SessionCommand::select_candidate(candidate_id));
    }

    fn handle_menu_item(&mut self, engine_id: &str, name: &str) {
        if !self.is_active(engine_id) {
            return;
        }
        let Some(mode) = mode_for_item(name) else {
            warn!(name, "unknown menu item");
            return;
        };
        if mode == CompositionMode::Direct {
            if !self.reconciler.is_direct() {
                // Whatever is being composed is committed as is.
                self.send_session_command(SessionCommand::new(SessionCommandType::Submit));
                self.reconciler.set_direct(true);
            }
        } else {
            self.reconciler.set_direct(false);
            self.reconciler.set_mode(mode);
            self.send_session_command(SessionCommand::switch_input_mode(mode));
        }
        self.host
            .update_menu_items(engine_id, &menu_items(self.reconciler.menu_mode()));
    }

    fn handle_surrounding_text(&mut self, engine_id: &str, info: SurroundingText) {
        if self.is_active(engine_id) {
            self.surrounding = Some(info);
        }
    }

    fn handle_reset(&mut self, engine_id: &str) {
        if !self.is_active(engine_id) {
            return;
        }
        self.callback = None;
        self.send_session_command(SessionCommand::new(SessionCommandType::ResetContext));
    }

    fn handle_callback_timer(&mut self, generation: u64) {
        match self.callback.take() {
            Some(pending) if pending.generation == generation => {
                if self.context.as_ref().map(|c| c.id) == Some(pending.context_id) {
                    debug!(generation, kind = ?pending.command.kind, "firing callback command");
                    self.send_session_command(pending.command);
                }
            }
            other => {
                debug!(generation, "stale callback timer");
                self.callback = other;
            }
        }
    }

    /// SEND_COMMAND to the focused session, reconciling the reply.
    pub(super) fn send_session_command(&mut self, command: SessionCommand) {
        let Some((context_id, session)) = self.session_target() else {
            debug!(kind = ?command.kind, "no session for command");
            return;
        };
        if let Err(e) =
            self.gateway
                .send_command(&session, command, Some(Followup::Reconcile { context_id }))
        {
            warn!("SEND_COMMAND failed: {e}");
        }
    }
}
