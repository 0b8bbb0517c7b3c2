//! The "command" envelope: `{input: {...}, output: {...}}`.
//!
//! Field names follow the engine's JSON encoding. Everything on the output
//! side is optional because the engine only fills what changed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::key_event::{CompositionMode, KeyEvent};

/// Engine-side session id (a 64-bit integer carried as a decimal string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    CreateSession,
    DeleteSession,
    SendKey,
    TestSendKey,
    SendCommand,
    GetConfig,
    SetConfig,
    ClearUserHistory,
    ClearUserPrediction,
    ClearUnusedUserPrediction,
    SendUserDictionaryCommand,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionCommandType {
    Revert,
    Submit,
    SelectCandidate,
    HighlightCandidate,
    SwitchInputMode,
    ResetContext,
    ConvertReverse,
    Undo,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCommand {
    #[serde(rename = "type")]
    pub kind: SessionCommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_mode: Option<CompositionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SessionCommand {
    pub fn new(kind: SessionCommandType) -> Self {
        Self {
            kind,
            id: None,
            composition_mode: None,
            text: None,
        }
    }

    pub fn select_candidate(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::new(SessionCommandType::SelectCandidate)
        }
    }

    pub fn switch_input_mode(mode: CompositionMode) -> Self {
        Self {
            composition_mode: Some(mode),
            ..Self::new(SessionCommandType::SwitchInputMode)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextDeletion {
    NoTextDeletionCapability,
    DeletePrecedingText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub text_deletion: TextDeletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreeditMethod {
    Roman,
    Kana,
}

/// Engine configuration. Only the fields this front end reads are typed; the
/// rest is carried through untouched so SET_CONFIG round-trips it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preedit_method: Option<PreeditMethod>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    pub fn is_kana_input(&self) -> bool {
        self.preedit_method == Some(PreeditMethod::Kana)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserDictionaryCommandType {
    CreateSession,
    DeleteSession,
    Load,
    Save,
    GetUserDictionaryNameList,
    GetEntries,
    CreateDictionary,
    DeleteDictionary,
    RenameDictionary,
    AddEntry,
    EditEntry,
    DeleteEntry,
    ImportData,
    Undo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDictionaryEntry {
    pub key: String,
    pub value: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDictionaryCommand {
    #[serde(rename = "type")]
    pub kind: UserDictionaryCommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<UserDictionaryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_index: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl UserDictionaryCommand {
    pub fn new(kind: UserDictionaryCommandType) -> Self {
        Self {
            kind,
            session_id: None,
            dictionary_id: None,
            dictionary_name: None,
            entry: None,
            entry_index: Vec::new(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DictionaryStatus {
    UserDictionaryCommandSuccess,
    UnknownError,
    UnknownCommand,
    InvalidArgument,
    UnknownSessionId,
    FileNotFound,
    InvalidFileFormat,
    DictionaryNameEmpty,
    DictionaryNameTooLong,
    DictionaryNameContainsInvalidCharacter,
    DictionaryNameDuplicated,
    ReadingEmpty,
    ReadingTooLong,
    ReadingContainsInvalidCharacter,
    WordEmpty,
    WordTooLong,
    WordContainsInvalidCharacter,
    InvalidPosType,
    CommentTooLong,
    CommentContainsInvalidCharacter,
    ImportTooManyWords,
    ImportInvalidEntries,
    NoUndoHistory,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDictionaryCommandStatus {
    pub status: DictionaryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(rename = "type")]
    pub kind: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<SessionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_dictionary_command: Option<UserDictionaryCommand>,
}

impl Input {
    pub fn new(kind: InputType) -> Self {
        Self {
            kind,
            id: None,
            key: None,
            command: None,
            config: None,
            capability: None,
            user_dictionary_command: None,
        }
    }

    pub fn for_session(kind: InputType, session: &SessionId) -> Self {
        Self {
            id: Some(session.clone()),
            ..Self::new(kind)
        }
    }
}

// --- Output side ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentAnnotation {
    #[default]
    None,
    Underline,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub annotation: SegmentAnnotation,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preedit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u32>,
    #[serde(default)]
    pub segment: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_position: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub index: u32,
    pub value: String,
    #[serde(default)]
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateCategory {
    #[default]
    Conversion,
    Prediction,
    Suggestion,
    Transliteration,
    Usage,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_label: Option<String>,
    #[serde(default)]
    pub index_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Information {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub candidate_id: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationList {
    #[serde(default)]
    pub information: Vec<Information>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_index: Option<u32>,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub candidate: Vec<Candidate>,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub category: CandidateCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<InformationList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_command: Option<SessionCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_millisecond: Option<u32>,
}

/// Range of already-committed text before the caret the engine wants removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRange {
    pub offset: i32,
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionSuccess,
    SessionFailure,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CompositionMode>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub consumed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommitResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preedit: Option<Preedit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Candidates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Callback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_range: Option<DeletionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_dictionary_command_status: Option<UserDictionaryCommandStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl Output {
    /// Engine-reported failure carried by this output, if any.
    pub fn check(&self) -> Result<(), CommandFailure> {
        if let Some(status) = &self.user_dictionary_command_status {
            if status.status != DictionaryStatus::UserDictionaryCommandSuccess {
                return Err(CommandFailure::Dictionary(status.status));
            }
        }
        match self.error_code {
            Some(ErrorCode::SessionFailure) | Some(ErrorCode::Other) => {
                Err(CommandFailure::Session)
            }
            _ => Ok(()),
        }
    }
}

/// The command envelope sent under `"cmd"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub input: Input,
    #[serde(default)]
    pub output: Output,
}

impl Command {
    pub fn new(input: Input) -> Self {
        Self {
            input,
            output: Output::default(),
        }
    }
}

/// Non-success status reported by the engine for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandFailure {
    #[error("engine reported a session failure")]
    Session,
    #[error("user dictionary command failed: {0:?}")]
    Dictionary(DictionaryStatus),
}

impl CommandFailure {
    /// Expected validation failures that should not interrupt typing.
    pub fn is_suppressible(&self) -> bool {
        matches!(
            self,
            Self::Dictionary(DictionaryStatus::ReadingEmpty)
                | Self::Dictionary(DictionaryStatus::WordEmpty)
        )
    }
}
