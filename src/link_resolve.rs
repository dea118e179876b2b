use std::collections::HashMap;

use crate::parse::{ReferenceSpan, extract_reference_spans};
use crate::{Note, NoteId, Reference, ReferenceStatus};

/// Title to id lookup used for reference resolution.
///
/// Implementations must compare titles case-insensitively and exactly.
pub trait TitleLookup {
    fn lookup(&self, title: &str) -> Option<NoteId>;
}

impl<T: TitleLookup + ?Sized> TitleLookup for &T {
    fn lookup(&self, title: &str) -> Option<NoteId> {
        (**self).lookup(title)
    }
}

/// Default lookup built from a note list. On duplicate titles the first note
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleIndex {
    by_title_lower: HashMap<String, NoteId>,
}

impl TitleIndex {
    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut by_title_lower = HashMap::new();
        for note in notes {
            by_title_lower
                .entry(note.title.to_lowercase())
                .or_insert_with(|| note.id.clone());
        }
        Self { by_title_lower }
    }

    pub fn len(&self) -> usize {
        self.by_title_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title_lower.is_empty()
    }
}

impl TitleLookup for TitleIndex {
    fn lookup(&self, title: &str) -> Option<NoteId> {
        self.by_title_lower.get(&title.to_lowercase()).cloned()
    }
}

impl TitleLookup for HashMap<String, NoteId> {
    fn lookup(&self, title: &str) -> Option<NoteId> {
        let needle = title.to_lowercase();
        self.iter()
            .find(|(t, _)| t.to_lowercase() == needle)
            .map(|(_, id)| id.clone())
    }
}

#[derive(Debug, Clone)]
pub struct LinkResolver<L> {
    lookup: L,
}

impl<L: TitleLookup> LinkResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, target_text: &str) -> ReferenceStatus {
        match self.lookup.lookup(target_text) {
            Some(id) => ReferenceStatus::Resolved(id),
            None => ReferenceStatus::Unresolved,
        }
    }

    pub fn resolve_span(&self, body: &str, span: &ReferenceSpan) -> Reference {
        let target_text = span.text(body).to_string();
        Reference {
            status: self.resolve(&target_text),
            target_text,
            offset: span.marker.start,
            span: span.marker.clone(),
        }
    }

    pub fn references(&self, body: &str) -> Vec<Reference> {
        extract_reference_spans(body)
            .iter()
            .map(|span| self.resolve_span(body, span))
            .collect()
    }
}

/// Parses `body` for `[[...]]` markers and resolves each against `lookup`.
pub fn extract_references(body: &str, lookup: &impl TitleLookup) -> Vec<Reference> {
    LinkResolver::new(lookup).references(body)
}
