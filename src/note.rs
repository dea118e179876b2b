use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::link_resolve::TitleIndex;
use crate::Result;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(NoteId);
id_type!(TagId);
id_type!(FolderId);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub folder: Option<FolderId>,
    #[serde(default)]
    pub tags: BTreeSet<TagId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Note {
    /// A note with an empty body, no folder and no tags, timestamped now.
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            folder: None,
            tags: BTreeSet::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_folder(mut self, folder: impl Into<FolderId>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<TagId>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.modified_at = self.modified_at.max(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<FolderId>,
}

/// Folder hierarchy owned by the host application; only consulted to turn a
/// folder id into its path from the root.
#[derive(Debug, Clone, Default)]
pub struct FolderTree {
    folders: HashMap<FolderId, Folder>,
}

impl FolderTree {
    pub fn new(folders: impl IntoIterator<Item = Folder>) -> Self {
        Self {
            folders: folders.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    pub fn get(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    /// Full `/`-joined path from the root, e.g. `Work/Projects`.
    ///
    /// A dangling parent id terminates the walk; a parent cycle is cut at the
    /// first repeated folder.
    pub fn path(&self, id: &FolderId) -> Option<String> {
        let mut current = self.folders.get(id)?;
        let mut seen = HashSet::new();
        let mut parts = Vec::new();
        loop {
            if !seen.insert(&current.id) {
                break;
            }
            parts.push(current.name.as_str());
            let Some(parent) = current.parent.as_ref().and_then(|p| self.folders.get(p)) else {
                break;
            };
            current = parent;
        }
        parts.reverse();
        Some(parts.join("/"))
    }
}

/// In-memory snapshot of the note corpus handed over by the store.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    notes: Vec<Note>,
    positions: HashMap<NoteId, usize>,
    tags: HashMap<TagId, String>,
    folders: FolderTree,
}

#[derive(Debug, Default, serde::Deserialize)]
struct CorpusSnapshot {
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    folders: Vec<Folder>,
}

impl Corpus {
    pub fn new(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut corpus = Self::default();
        for note in notes {
            corpus.insert_note(note);
        }
        corpus
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags.into_iter().map(|t| (t.id, t.name)));
        self
    }

    pub fn with_folders(mut self, folders: impl IntoIterator<Item = Folder>) -> Self {
        self.folders = FolderTree::new(folders);
        self
    }

    /// Parses the JSON snapshot format `{ "notes": [..], "tags": [..], "folders": [..] }`.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let snapshot: CorpusSnapshot = serde_json::from_str(input)?;
        Ok(Self::new(snapshot.notes)
            .with_tags(snapshot.tags)
            .with_folders(snapshot.folders))
    }

    /// Inserts a note, replacing (in place) any note with the same id.
    pub fn insert_note(&mut self, note: Note) -> Option<Note> {
        match self.positions.get(&note.id) {
            Some(&pos) => Some(std::mem::replace(&mut self.notes[pos], note)),
            None => {
                self.positions.insert(note.id.clone(), self.notes.len());
                self.notes.push(note);
                None
            }
        }
    }

    pub fn remove_note(&mut self, id: &NoteId) -> Option<Note> {
        let pos = self.positions.remove(id)?;
        let removed = self.notes.remove(pos);
        for note in &self.notes[pos..] {
            if let Some(p) = self.positions.get_mut(&note.id) {
                *p -= 1;
            }
        }
        Some(removed)
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.positions.get(id).map(|&pos| &self.notes[pos])
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.positions.contains_key(id)
    }

    /// Notes in insertion order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn tag_name(&self, id: &TagId) -> Option<&str> {
        self.tags.get(id).map(String::as_str)
    }

    /// Names of the note's tags; ids without a known tag are skipped.
    pub fn tag_names<'a>(&'a self, note: &'a Note) -> impl Iterator<Item = &'a str> + 'a {
        note.tags.iter().filter_map(|t| self.tag_name(t))
    }

    pub(crate) fn tags_iter(&self) -> impl Iterator<Item = (&TagId, &str)> {
        self.tags.iter().map(|(id, name)| (id, name.as_str()))
    }

    pub fn folders(&self) -> &FolderTree {
        &self.folders
    }

    pub fn folder_path(&self, id: &FolderId) -> Option<String> {
        self.folders.path(id)
    }

    pub fn title_lookup(&self) -> TitleIndex {
        TitleIndex::from_notes(&self.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str, parent: Option<&str>) -> Folder {
        Folder {
            id: id.into(),
            name: name.into(),
            parent: parent.map(FolderId::from),
        }
    }

    #[test]
    fn folder_path_walks_to_root() {
        let tree = FolderTree::new([
            folder("w", "Work", None),
            folder("p", "Projects", Some("w")),
            folder("q", "Q3", Some("p")),
        ]);
        assert_eq!(tree.path(&"q".into()).as_deref(), Some("Work/Projects/Q3"));
        assert_eq!(tree.path(&"w".into()).as_deref(), Some("Work"));
        assert_eq!(tree.path(&"nope".into()), None);
    }

    #[test]
    fn folder_path_survives_cycles_and_missing_parents() {
        let tree = FolderTree::new([
            folder("a", "A", Some("b")),
            folder("b", "B", Some("a")),
            folder("c", "C", Some("gone")),
        ]);
        assert_eq!(tree.path(&"a".into()).as_deref(), Some("B/A"));
        assert_eq!(tree.path(&"c".into()).as_deref(), Some("C"));
    }

    #[test]
    fn insert_replaces_and_remove_keeps_order() {
        let mut corpus = Corpus::new([Note::new("a", "A"), Note::new("b", "B"), Note::new("c", "C")]);
        let old = corpus.insert_note(Note::new("b", "B2"));
        assert_eq!(old.map(|n| n.title), Some("B".to_string()));
        assert_eq!(corpus.len(), 3);

        corpus.remove_note(&"a".into());
        let ids: Vec<_> = corpus.notes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(corpus.note(&"c".into()).map(|n| n.title.as_str()), Some("C"));
        assert_eq!(corpus.note(&"b".into()).map(|n| n.title.as_str()), Some("B2"));
    }

    #[test]
    fn json_snapshot_loads_notes_tags_and_folders() {
        let corpus = Corpus::from_json_str(
            r#"{
                "notes": [{
                    "id": "n1", "title": "One", "body": "hi", "folder": "f",
                    "tags": ["t"], "createdAt": "2024-02-01T10:00:00Z",
                    "modifiedAt": "2024-02-02T10:00:00Z"
                }],
                "tags": [{"id": "t", "name": "work"}],
                "folders": [{"id": "f", "name": "Inbox"}]
            }"#,
        )
        .unwrap();
        let note = corpus.note(&"n1".into()).unwrap();
        assert_eq!(corpus.tag_names(note).collect::<Vec<_>>(), vec!["work"]);
        assert_eq!(corpus.folder_path(&"f".into()).as_deref(), Some("Inbox"));
    }
}
