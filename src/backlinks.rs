use std::collections::BTreeMap;
use std::ops::Range;

use tracing::debug;

use crate::{
    Backlink, BacklinksIndex, ContextSnippet, Corpus, LinkResolver, ReferenceStatus,
    TitleLookup, UnresolvedTarget,
};

const ELLIPSIS: &str = "…";

pub(crate) fn build_backlinks(
    corpus: &Corpus,
    lookup: &impl TitleLookup,
    context_window: usize,
) -> BacklinksIndex {
    let resolver = LinkResolver::new(lookup);
    let mut out = BacklinksIndex::default();

    for note in corpus.notes() {
        for reference in resolver.references(&note.body) {
            match &reference.status {
                ReferenceStatus::Resolved(target) if *target == note.id => {}
                ReferenceStatus::Resolved(target) => {
                    out.inbound
                        .entry(target.clone())
                        .or_default()
                        .push(Backlink {
                            source: note.id.clone(),
                            context: context_snippet(
                                &note.body,
                                reference.span.clone(),
                                context_window,
                            ),
                            offset: reference.offset,
                        });
                }
                ReferenceStatus::Unresolved => out.unresolved += 1,
            }
        }
    }

    for v in out.inbound.values_mut() {
        v.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.offset.cmp(&b.offset)));
    }
    debug!(
        targets = out.inbound.len(),
        unresolved = out.unresolved,
        "backlinks built"
    );
    out
}

pub(crate) fn unresolved_targets(
    corpus: &Corpus,
    lookup: &impl TitleLookup,
) -> Vec<UnresolvedTarget> {
    let resolver = LinkResolver::new(lookup);
    // Keyed case-insensitively; the first spelling seen is reported.
    let mut by_text: BTreeMap<String, UnresolvedTarget> = BTreeMap::new();

    for note in corpus.notes() {
        for reference in resolver.references(&note.body) {
            if reference.status.is_resolved() {
                continue;
            }
            let entry = by_text
                .entry(reference.target_text.to_lowercase())
                .or_insert_with(|| UnresolvedTarget {
                    text: reference.target_text.clone(),
                    sources: Vec::new(),
                });
            if !entry.sources.contains(&note.id) {
                entry.sources.push(note.id.clone());
            }
        }
    }

    by_text.into_values().collect()
}

/// Context around `marker`: the enclosing sentence when it fits within
/// `window` characters, otherwise a character window centred on the marker.
/// A marker longer than `window` is returned whole and alone.
pub(crate) fn context_snippet(body: &str, marker: Range<usize>, window: usize) -> ContextSnippet {
    let sentence = sentence_bounds(body, &marker);
    let sentence_text = &body[sentence.clone()];
    if sentence_text.chars().count() <= window {
        return ContextSnippet {
            text: sentence_text.to_string(),
            highlight: marker.start - sentence.start..marker.end - sentence.start,
        };
    }

    // The marker is never cut. Room for the two ellipses comes out of the
    // context budget, so the result stays within `window` unless the marker
    // alone is longer.
    let marker_chars = body[marker.clone()].chars().count();
    let side = window.saturating_sub(marker_chars).saturating_sub(2) / 2;
    if side == 0 {
        return ContextSnippet {
            text: body[marker.clone()].to_string(),
            highlight: 0..marker.end - marker.start,
        };
    }
    let start = step_back_chars(body, marker.start, side, sentence.start);
    let end = step_forward_chars(body, marker.end, side, sentence.end);

    let mut text = String::new();
    if start > sentence.start {
        text.push_str(ELLIPSIS);
    }
    let highlight_start = text.len() + (marker.start - start);
    text.push_str(&body[start..end]);
    if end < sentence.end {
        text.push_str(ELLIPSIS);
    }

    ContextSnippet {
        text,
        highlight: highlight_start..highlight_start + (marker.end - marker.start),
    }
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

fn sentence_bounds(body: &str, marker: &Range<usize>) -> Range<usize> {
    let mut start = body[..marker.start]
        .char_indices()
        .rev()
        .find(|(_, c)| is_sentence_end(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    let mut end = body[marker.end..]
        .char_indices()
        .find(|(_, c)| is_sentence_end(*c))
        .map(|(i, c)| {
            let at = marker.end + i;
            if c == '\n' { at } else { at + c.len_utf8() }
        })
        .unwrap_or(body.len());

    while start < marker.start {
        match body[start..].chars().next() {
            Some(c) if c.is_whitespace() => start += c.len_utf8(),
            _ => break,
        }
    }
    while end > marker.end {
        match body[..end].chars().next_back() {
            Some(c) if c.is_whitespace() => end -= c.len_utf8(),
            _ => break,
        }
    }

    start..end
}

fn step_back_chars(body: &str, from: usize, n: usize, floor: usize) -> usize {
    body[floor..from]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| floor + i)
        .unwrap_or(from)
}

fn step_forward_chars(body: &str, from: usize, n: usize, ceil: usize) -> usize {
    let mut end = from;
    for c in body[from..ceil].chars().take(n) {
        end += c.len_utf8();
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet_for(body: &str, marker_text: &str, window: usize) -> ContextSnippet {
        let start = body.find(marker_text).unwrap();
        context_snippet(body, start..start + marker_text.len(), window)
    }

    #[test]
    fn short_sentence_is_used_whole() {
        let s = snippet_for("First one. Then see [[B]] here! Last.", "[[B]]", 160);
        assert_eq!(s.text, "Then see [[B]] here!");
        assert_eq!(s.highlighted(), "[[B]]");
    }

    #[test]
    fn body_without_boundaries_is_one_sentence() {
        let s = snippet_for("See [[B]] and [[Ghost]]", "[[B]]", 160);
        assert_eq!(s.text, "See [[B]] and [[Ghost]]");
        assert_eq!(s.highlight, 4..9);
    }

    #[test]
    fn newline_ends_a_sentence() {
        let s = snippet_for("heading line\n  body [[X]] tail\nnext", "[[X]]", 160);
        assert_eq!(s.text, "body [[X]] tail");
    }

    #[test]
    fn long_sentence_falls_back_to_window() {
        let body = format!("{} [[Target]] {}", "a".repeat(100), "b".repeat(100));
        let s = snippet_for(&body, "[[Target]]", 30);
        assert!(s.text.starts_with('…'));
        assert!(s.text.ends_with('…'));
        assert_eq!(s.highlighted(), "[[Target]]");
        // 10 marker chars, 9 chars each side, two ellipses.
        assert_eq!(s.text.chars().count(), 30);
    }

    #[test]
    fn window_respects_multibyte_boundaries() {
        let body = format!("{} [[Ü]] {}", "é".repeat(50), "ß".repeat(50));
        let s = snippet_for(&body, "[[Ü]]", 15);
        assert_eq!(s.highlighted(), "[[Ü]]");
    }

    #[test]
    fn narrow_window_keeps_only_the_marker() {
        let body = format!("{} [[Target]] {}", "a".repeat(40), "b".repeat(40));
        for window in [4, 10, 12, 13] {
            let s = snippet_for(&body, "[[Target]]", window);
            assert_eq!(s.text, "[[Target]]", "window {window}");
            assert_eq!(s.highlighted(), "[[Target]]");
        }

        let s = snippet_for(&body, "[[Target]]", 14);
        assert_eq!(s.text, "… [[Target]] …");
        assert_eq!(s.text.chars().count(), 14);
    }
}
