//! TUI screen definitions.
//!
//! One screen per demo step. Screens own only view state (cursor, input
//! buffer); everything else is read from the session snapshot each frame.
//! Key handlers return an [`Action`] that the app applies to the session.

mod chat;
mod intake;

use std::fmt;
use std::path::PathBuf;

use botdemo_shared::{DemoStep, FileId, IntakeAnswer};

pub(crate) use chat::ChatScreen;
pub(crate) use intake::IntakeScreen;

/// Screen identifiers, one per demo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Intake,
    Chat,
}

impl ScreenId {
    pub(crate) const ALL: [ScreenId; 2] = [ScreenId::Intake, ScreenId::Chat];

    pub(crate) fn step(self) -> DemoStep {
        match self {
            Self::Intake => DemoStep::Intake,
            Self::Chat => DemoStep::Chat,
        }
    }
}

impl From<DemoStep> for ScreenId {
    fn from(step: DemoStep) -> Self {
        match step {
            DemoStep::Intake => Self::Intake,
            DemoStep::Chat => Self::Chat,
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = self.step();
        write!(f, "{}. {}", step.number(), step.label())
    }
}

/// What a key press asks the app to do.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    None,
    Answer(String, IntakeAnswer),
    ClearAnswer(String),
    StartChat,
    Send(String),
    Upload(Vec<PathBuf>),
    RemoveFile(FileId),
    Reset,
    Status(String),
}
