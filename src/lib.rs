//! Japanese input-method front end: drives an [`ime_session::Controller`]
//! against an engine running as a child process.

pub mod event_loop;
pub mod transport;

mod trace_init;

pub use ime_core;
pub use ime_session;

pub use event_loop::{spawn_engine_reader, CallbackTimer, EventLoop, LoopEvent};
pub use trace_init::init_tracing;
pub use transport::{EngineProcess, FrameWriter, TransportError};
