//! Query progress stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages of one query, in order. `Failed` is terminal and reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Init,
    MenuNavigated,
    FrameLocated,
    CodeSubmitted,
    ResultOpened,
    CurrentExtracted,
    PreviousExtracted,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::MenuNavigated => "menu-navigated",
            Stage::FrameLocated => "frame-located",
            Stage::CodeSubmitted => "code-submitted",
            Stage::ResultOpened => "result-opened",
            Stage::CurrentExtracted => "current-extracted",
            Stage::PreviousExtracted => "previous-extracted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the forward-only progress of a single query.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Init,
            history: vec![Stage::Init],
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Move forward to `next`. Returns false (and stays put) on a backwards
    /// move or after `Failed`.
    pub fn advance(&mut self, next: Stage) -> bool {
        if self.current == Stage::Failed || next <= self.current {
            return false;
        }
        log::debug!("Stage {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
        true
    }

    /// Mark the query failed, returning the last stage actually reached.
    pub fn fail(&mut self) -> Stage {
        let reached = self.current;
        if reached != Stage::Failed {
            self.current = Stage::Failed;
            self.history.push(Stage::Failed);
        }
        reached
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
