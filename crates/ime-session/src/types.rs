use std::fmt;

use ime_core::command::{CommandFailure, Config, Output};
use ime_core::protocol::{EventResult, ResponsePayload};
use ime_core::translator::RawKeyEvent;

use crate::host::{ContextId, InputContext, MouseButton, SurroundingText};

/// A host handler invocation captured for the input pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Activate {
        engine_id: String,
    },
    Deactivate {
        engine_id: String,
    },
    Focus(InputContext),
    Blur {
        context_id: ContextId,
    },
    ContextUpdate(InputContext),
    Key {
        engine_id: String,
        request_id: String,
        event: RawKeyEvent,
    },
    CandidateClicked {
        engine_id: String,
        candidate_id: i32,
        button: MouseButton,
    },
    MenuItemActivated {
        engine_id: String,
        name: String,
    },
    SurroundingTextChanged {
        engine_id: String,
        info: SurroundingText,
    },
    Reset {
        engine_id: String,
    },
    /// The host timer armed by `Host::schedule_callback` went off.
    CallbackTimer {
        generation: u64,
    },
}

/// Typed reply handed to a continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Engine initialization finished with this default configuration.
    Ready(Config),
    Command(Result<Output, CommandFailure>),
    Event(EventResult),
}

impl From<ResponsePayload> for Reply {
    fn from(payload: ResponsePayload) -> Self {
        match payload {
            ResponsePayload::Command(output) => Reply::Command(output.check().map(|()| output)),
            ResponsePayload::Event(event) => Reply::Event(event),
        }
    }
}

/// What to do once the reply to a request arrives.
pub enum Followup {
    /// Record the new session for the context that asked for it.
    SessionCreated { context_id: ContextId },
    /// Reconcile the output, then tell the host whether the key was consumed.
    KeyReply {
        request_id: String,
        context_id: ContextId,
    },
    /// Reconcile the output into the given context.
    Reconcile { context_id: ContextId },
    /// Adopt `config` once the engine accepted it.
    ConfigUpdated { config: Config },
    /// Caller-supplied continuation, for UI layers outside the controller.
    External(Box<dyn FnOnce(Reply)>),
}

impl Followup {
    pub fn external(f: impl FnOnce(Reply) + 'static) -> Self {
        Followup::External(Box::new(f))
    }
}

impl fmt::Debug for Followup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionCreated { context_id } => f
                .debug_struct("SessionCreated")
                .field("context_id", context_id)
                .finish(),
            Self::KeyReply {
                request_id,
                context_id,
            } => f
                .debug_struct("KeyReply")
                .field("request_id", request_id)
                .field("context_id", context_id)
                .finish(),
            Self::Reconcile { context_id } => f
                .debug_struct("Reconcile")
                .field("context_id", context_id)
                .finish(),
            Self::ConfigUpdated { .. } => f.write_str("ConfigUpdated"),
            Self::External(_) => f.write_str("External"),
        }
    }
}
