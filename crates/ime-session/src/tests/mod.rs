
use std::io;
use std::time::Duration;

use serde_json::Value;

use crate::gateway::EngineChannel;
use crate::host::{
    CandidateWindowProperties, Composition, ContextId, Host, HostCandidate, MenuItem,
};

pub(super) const INIT: &str =
    r#"{"event": {"type": "InitializeDone", "config": {"preedit_method": "ROMAN"}}}"#;

pub(super) const INIT_KANA: &str =
    r#"{"event": {"type": "InitializeDone", "config": {"preedit_method": "KANA"}}}"#;

/// Channel that records every posted message.
#[derive(Default)]
pub(super) struct FakeChannel {
    pub sent: Vec<String>,
    pub broken: bool,
}

impl FakeChannel {
    pub fn requests(&self) -> Vec<Value> {
        self.sent
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect()
    }
}

impl EngineChannel for FakeChannel {
    fn post(&mut self, message: String) -> io::Result<()> {
        if self.broken {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "engine exited"));
        }
        self.sent.push(message);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum HostCall {
    SetComposition { text: String, cursor: usize },
    ClearComposition,
    SetCandidates(Vec<String>),
    SetCursorPosition(i32),
    WindowProperties(CandidateWindowProperties),
    Commit(String),
    SetMenuItems(Vec<MenuItem>),
    UpdateMenuItems(Vec<MenuItem>),
    DeleteSurroundingText { offset: i32, length: u32 },
    KeyEventHandled { request_id: String, handled: bool },
    ScheduleCallback { delay: Duration, generation: u64 },
}

/// Host that records every call in order.
pub(super) struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub can_delete: bool,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            can_delete: true,
        }
    }
}

impl Host for RecordingHost {
    fn set_composition(&mut self, _context_id: ContextId, composition: &Composition) {
        self.calls.push(HostCall::SetComposition {
            text: composition.text.clone(),
            cursor: composition.cursor,
        });
    }

    fn clear_composition(&mut self, _context_id: ContextId) {
        self.calls.push(HostCall::ClearComposition);
    }

    fn set_candidates(&mut self, _context_id: ContextId, candidates: &[HostCandidate]) {
        self.calls.push(HostCall::SetCandidates(
            candidates.iter().map(|c| c.candidate.clone()).collect(),
        ));
    }

    fn set_cursor_position(&mut self, _context_id: ContextId, candidate_id: i32) {
        self.calls.push(HostCall::SetCursorPosition(candidate_id));
    }

    fn set_candidate_window_properties(
        &mut self,
        _engine_id: &str,
        properties: &CandidateWindowProperties,
    ) {
        self.calls
            .push(HostCall::WindowProperties(properties.clone()));
    }

    fn commit_text(&mut self, _context_id: ContextId, text: &str) {
        self.calls.push(HostCall::Commit(text.to_string()));
    }

    fn set_menu_items(&mut self, _engine_id: &str, items: &[MenuItem]) {
        self.calls.push(HostCall::SetMenuItems(items.to_vec()));
    }

    fn update_menu_items(&mut self, _engine_id: &str, items: &[MenuItem]) {
        self.calls.push(HostCall::UpdateMenuItems(items.to_vec()));
    }

    fn delete_surrounding_text(
        &mut self,
        _engine_id: &str,
        _context_id: ContextId,
        offset: i32,
        length: u32,
    ) {
        self.calls
            .push(HostCall::DeleteSurroundingText { offset, length });
    }

    fn key_event_handled(&mut self, request_id: &str, handled: bool) {
        self.calls.push(HostCall::KeyEventHandled {
            request_id: request_id.to_string(),
            handled,
        });
    }

    fn schedule_callback(&mut self, delay: Duration, generation: u64) {
        self.calls
            .push(HostCall::ScheduleCallback { delay, generation });
    }

    fn supports_delete_surrounding_text(&self) -> bool {
        self.can_delete
    }
}

/// Build an engine reply carrying a command output.
pub(super) fn cmd_reply(id: u32, output: Value) -> String {
    serde_json::json!({"id": id, "cmd": {"output": output}}).to_string()
}

pub(super) fn handled(request_id: &str, handled: bool) -> HostCall {
    HostCall::KeyEventHandled {
        request_id: request_id.to_string(),
        handled,
    }
}
