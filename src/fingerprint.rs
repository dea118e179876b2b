use sha2::{Digest, Sha256};

use crate::Corpus;

/// Content hash of everything a derived view can depend on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(corpus: &Corpus) -> Self {
        let mut hasher = Sha256::new();
        for note in corpus.notes() {
            field(&mut hasher, note.id.as_str());
            field(&mut hasher, &note.title);
            field(&mut hasher, &note.body);
            field(&mut hasher, note.folder.as_ref().map_or("", |f| f.as_str()));
            for tag in &note.tags {
                field(&mut hasher, tag.as_str());
            }
            hasher.update([0xff]);
            hasher.update(note.created_at.timestamp_micros().to_le_bytes());
        }

        let mut tags: Vec<_> = corpus.tags_iter().collect();
        tags.sort();
        hasher.update(b"tags");
        for (id, name) in tags {
            field(&mut hasher, id.as_str());
            field(&mut hasher, name);
        }

        let mut folders: Vec<_> = corpus.folders().iter().collect();
        folders.sort_by(|a, b| a.id.cmp(&b.id));
        hasher.update(b"folders");
        for f in folders {
            field(&mut hasher, f.id.as_str());
            field(&mut hasher, &f.name);
            field(&mut hasher, f.parent.as_ref().map_or("", |p| p.as_str()));
        }

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Length-prefixed so adjacent fields cannot run together.
fn field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Note, Tag};

    #[test]
    fn identical_corpora_share_a_fingerprint() {
        let note = Note::new("a", "A").with_body("x");
        let a = Corpus::new([note.clone()]);
        let b = Corpus::new([note]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
        assert_eq!(Fingerprint::of(&a).as_str().len(), 64);
    }

    #[test]
    fn body_and_tag_name_changes_are_detected() {
        let note = Note::new("a", "A").with_tag("t");
        let base = Corpus::new([note.clone()]).with_tags([Tag {
            id: "t".into(),
            name: "work".into(),
        }]);
        let renamed = Corpus::new([note.clone()]).with_tags([Tag {
            id: "t".into(),
            name: "play".into(),
        }]);
        let edited = Corpus::new([note.with_body("changed")]);
        assert_ne!(Fingerprint::of(&base), Fingerprint::of(&renamed));
        assert_ne!(Fingerprint::of(&base), Fingerprint::of(&edited));
    }

    #[test]
    fn field_boundaries_matter() {
        let first = Note::new("ab", "c");
        let second = Note {
            id: "a".into(),
            title: "bc".into(),
            ..first.clone()
        };
        assert_ne!(
            Fingerprint::of(&Corpus::new([first])),
            Fingerprint::of(&Corpus::new([second]))
        );
    }
}
