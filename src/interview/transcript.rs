use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Model => "Model",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceStatus {
    /// The single mutable slot, rewritten while a reply streams in.
    InProgress,
    Sealed,
    /// Sealed with an error marker instead of model text.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub role: Role,
    pub text: String,
    pub status: UtteranceStatus,
}

impl Utterance {
    pub fn is_sealed(&self) -> bool {
        self.status != UtteranceStatus::InProgress
    }

    pub fn is_failed(&self) -> bool {
        self.status == UtteranceStatus::Failed
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role.label(), self.text)
    }
}

/// Addresses the in-progress utterance it was issued for. A handle stays
/// tied to that one entry no matter what gets appended afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceHandle {
    id: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    utterance: Utterance,
}

/// Ordered, role-tagged dialogue history. Append-only, except for at most one
/// in-progress entry that is addressed through its [`UtteranceHandle`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    next_id: u64,
    in_progress: Option<UtteranceHandle>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: Role, text: String, status: UtteranceStatus) -> UtteranceHandle {
        let handle = UtteranceHandle { id: self.next_id };
        self.next_id += 1;
        self.entries.push(Entry {
            id: handle.id,
            utterance: Utterance { role, text, status },
        });
        handle
    }

    /// Appends an already-final utterance.
    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.push(role, text.into(), UtteranceStatus::Sealed);
    }

    /// Opens the mutable slot with empty text. Returns `None` while another
    /// entry is still in progress.
    pub fn open(&mut self, role: Role) -> Option<UtteranceHandle> {
        if self.in_progress.is_some() {
            return None;
        }
        let handle = self.push(role, String::new(), UtteranceStatus::InProgress);
        self.in_progress = Some(handle);
        Some(handle)
    }

    fn slot_mut(&mut self, handle: UtteranceHandle) -> Option<&mut Utterance> {
        if self.in_progress != Some(handle) {
            return None;
        }
        self.entries
            .iter_mut()
            .rev()
            .find(|entry| entry.id == handle.id)
            .map(|entry| &mut entry.utterance)
    }

    /// Replaces the in-progress text. False if `handle` is not in progress.
    pub fn update(&mut self, handle: UtteranceHandle, text: &str) -> bool {
        match self.slot_mut(handle) {
            Some(utterance) => {
                text.clone_into(&mut utterance.text);
                true
            }
            None => false,
        }
    }

    /// Freezes the in-progress entry with its final text.
    pub fn seal(&mut self, handle: UtteranceHandle, text: &str) -> bool {
        self.close(handle, text, UtteranceStatus::Sealed)
    }

    /// Freezes the in-progress entry with an error marker.
    pub fn fail(&mut self, handle: UtteranceHandle, marker: &str) -> bool {
        self.close(handle, marker, UtteranceStatus::Failed)
    }

    fn close(&mut self, handle: UtteranceHandle, text: &str, status: UtteranceStatus) -> bool {
        let Some(utterance) = self.slot_mut(handle) else {
            return false;
        };
        text.clone_into(&mut utterance.text);
        utterance.status = status;
        self.in_progress = None;
        true
    }

    pub fn get(&self, handle: UtteranceHandle) -> Option<&Utterance> {
        self.entries
            .iter()
            .find(|entry| entry.id == handle.id)
            .map(|entry| &entry.utterance)
    }

    pub fn in_progress(&self) -> Option<UtteranceHandle> {
        self.in_progress
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter().map(|entry| &entry.utterance)
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last().map(|entry| &entry.utterance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_progress = None;
    }

    /// `Role: text` lines of the dialogue so far. Error markers and the
    /// unfinished slot are not part of the dialogue and are left out.
    pub fn render(&self) -> String {
        self.iter()
            .filter(|utterance| utterance.status == UtteranceStatus::Sealed)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
