use std::time::Duration;

use tracing::{debug, warn};

use ime_core::command::{Callback, Output, SessionCommand, SessionCommandType};
use ime_core::key_event::CompositionMode;

use super::host::{ContextId, Host};
use super::types::{Followup, Reply};
use super::{Controller, EngineChannel, PendingCallback};

/// Unwrap a command reply, logging what is not one.
fn command_output(reply: Reply) -> Option<Output> {
    match reply {
        Reply::Command(Ok(output)) => Some(output),
        Reply::Command(Err(failure)) if failure.is_suppressible() => {
            debug!("engine reported {failure}");
            None
        }
        Reply::Command(Err(failure)) => {
            warn!("engine reported {failure}");
            None
        }
        other => {
            warn!(?other, "expected a command reply");
            None
        }
    }
}

impl<H: Host, C: EngineChannel> Controller<H, C> {
    pub(super) fn resolve(&mut self, followup: Followup, reply: Reply) {
        match followup {
            Followup::External(f) => f(reply),
            Followup::SessionCreated { context_id } => {
                if let Some(output) = command_output(reply) {
                    self.on_session_created(context_id, output);
                }
            }
            Followup::KeyReply {
                request_id,
                context_id,
            } => {
                let consumed = match command_output(reply) {
                    Some(output) => {
                        self.reconcile(context_id, &output);
                        output.consumed
                    }
                    None => false,
                };
                self.host.key_event_handled(&request_id, consumed);
            }
            Followup::Reconcile { context_id } => {
                if let Some(output) = command_output(reply) {
                    self.reconcile(context_id, &output);
                }
            }
            Followup::ConfigUpdated { config } => {
                if let Some(output) = command_output(reply) {
                    debug!("config updated");
                    self.config = output.config.unwrap_or(config);
                }
            }
        }
    }

    fn on_session_created(&mut self, context_id: ContextId, output: Output) {
        let Some(session) = output.id else {
            warn!(context_id, "CREATE_SESSION reply without a session id");
            return;
        };
        let Some(context) = self
            .context
            .as_mut()
            .filter(|c| c.id == context_id && c.session.is_none())
        else {
            // The context went away while the session was being created.
            debug!(%session, "discarding orphan session");
            if let Err(e) = self.gateway.delete_session(&session, None) {
                warn!(%session, "DELETE_SESSION failed: {e}");
            }
            return;
        };
        debug!(%session, context_id, "session created");
        context.session = Some(session);

        // New sessions start in hiragana.
        let mode = self.reconciler.mode();
        if mode != CompositionMode::Hiragana {
            self.send_session_command(SessionCommand::switch_input_mode(mode));
        }
    }

    fn reconcile(&mut self, context_id: ContextId, output: &Output) {
        if self.context.as_ref().map(|c| c.id) != Some(context_id) {
            debug!(context_id, "output for a context that lost focus");
            return;
        }
        let Some(engine_id) = self.engine.as_ref().map(|e| e.id.clone()) else {
            return;
        };

        if let Some(range) = output.deletion_range {
            if self.host.supports_delete_surrounding_text() {
                self.host
                    .delete_surrounding_text(&engine_id, context_id, range.offset, range.length);
            } else {
                warn!(?range, "host cannot delete surrounding text");
            }
        }

        if let Some(callback) = self
            .reconciler
            .apply(&mut self.host, &engine_id, context_id, output)
        {
            self.accept_callback(callback, context_id);
        }
    }

    /// Send or schedule an engine-issued callback command. It replaces any
    /// callback still waiting.
    fn accept_callback(&mut self, callback: Callback, context_id: ContextId) {
        self.callback = None;
        self.callback_generation += 1;
        let generation = self.callback_generation;

        let Some(mut command) = callback.session_command else {
            return;
        };
        if command.kind == SessionCommandType::Unknown {
            debug!("ignoring unknown callback command");
            return;
        }
        if command.kind == SessionCommandType::ConvertReverse {
            match self.surrounding.as_ref().and_then(|s| s.selection()) {
                Some(text) => command.text = Some(text),
                None => {
                    debug!("no selection to reconvert");
                    return;
                }
            }
        }

        match callback.delay_millisecond.filter(|&ms| ms > 0) {
            Some(ms) => {
                debug!(generation, ms, kind = ?command.kind, "callback command scheduled");
                self.callback = Some(PendingCallback {
                    command,
                    generation,
                    context_id,
                });
                self.host
                    .schedule_callback(Duration::from_millis(u64::from(ms)), generation);
            }
            None => self.send_session_command(command),
        }
    }
}
