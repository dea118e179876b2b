use std::collections::HashMap;
use std::ops::Range;

use crate::NoteId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "status", content = "target", rename_all = "lowercase")]
pub enum ReferenceStatus {
    Resolved(NoteId),
    Unresolved,
}

impl ReferenceStatus {
    pub fn target(&self) -> Option<&NoteId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A `[[...]]` occurrence in a note body together with its resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Reference {
    /// Marker text, verbatim.
    pub target_text: String,
    #[serde(flatten)]
    pub status: ReferenceStatus,
    /// Byte offset of the opening `[[`.
    pub offset: usize,
    /// Byte range of the whole marker.
    pub span: Range<usize>,
}

/// Text surrounding a reference, with the marker's byte range inside `text`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContextSnippet {
    pub text: String,
    pub highlight: Range<usize>,
}

impl ContextSnippet {
    pub fn highlighted(&self) -> &str {
        &self.text[self.highlight.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Backlink {
    pub source: NoteId,
    pub context: ContextSnippet,
    /// Byte offset of the marker in the source body.
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklinksIndex {
    /// Occurrences that matched no note title.
    pub unresolved: usize,
    pub(crate) inbound: HashMap<NoteId, Vec<Backlink>>,
}

impl BacklinksIndex {
    /// Inbound references for `target`; unknown ids yield an empty slice.
    pub fn backlinks(&self, target: &NoteId) -> &[Backlink] {
        self.inbound
            .get(target)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn targets(&self) -> impl Iterator<Item = &NoteId> {
        self.inbound.keys()
    }
}

/// A reference text that names no note, with every note that uses it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnresolvedTarget {
    pub text: String,
    pub sources: Vec<NoteId>,
}
