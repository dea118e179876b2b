use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// A `[[...]]` marker found in a note body, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceSpan {
    /// Byte range of the whole marker, brackets included.
    pub marker: Range<usize>,
    /// Byte range of the text between the brackets.
    pub inner: Range<usize>,
}

impl ReferenceSpan {
    pub fn text<'a>(&self, body: &'a str) -> &'a str {
        &body[self.inner.clone()]
    }
}

fn wiki_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Non-greedy: the first `]]` closes the marker, nesting is not supported.
    RE.get_or_init(|| Regex::new(r"\[\[(.*?)\]\]").expect("static reference regex"))
}

/// Finds every `[[text]]` marker in document order.
///
/// Unterminated markers and markers spanning a newline are not matched. Empty
/// or whitespace-only markers are skipped.
pub fn extract_reference_spans(body: &str) -> Vec<ReferenceSpan> {
    wiki_reference_re()
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            if inner.as_str().trim().is_empty() {
                return None;
            }
            Some(ReferenceSpan {
                marker: whole.range(),
                inner: inner.range(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(body: &str) -> Vec<&str> {
        extract_reference_spans(body)
            .iter()
            .map(|s| s.text(body))
            .collect()
    }

    #[test]
    fn extracts_markers_in_order_with_offsets() {
        let body = "See [[B]] and [[Ghost]]";
        let spans = extract_reference_spans(body);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].marker, 4..9);
        assert_eq!(spans[0].inner, 6..7);
        assert_eq!(spans[1].text(body), "Ghost");
    }

    #[test]
    fn marker_text_is_verbatim() {
        assert_eq!(texts("[[ Mixed Case|alias#x ]]"), vec![" Mixed Case|alias#x "]);
    }

    #[test]
    fn first_closing_bracket_pair_wins() {
        assert_eq!(texts("[[a]]b]]"), vec!["a"]);
        assert_eq!(texts("[[[x]]"), vec!["[x"]);
    }

    #[test]
    fn unterminated_and_empty_markers_are_ignored() {
        assert!(texts("open [[never closed").is_empty());
        assert!(texts("[[]] and [[   ]]").is_empty());
        assert_eq!(texts("[[broken\nline]] then [[ok]]"), vec!["ok"]);
    }

    #[test]
    fn multibyte_text_keeps_byte_ranges() {
        let body = "ünï [[Café]]";
        let spans = extract_reference_spans(body);
        assert_eq!(spans[0].text(body), "Café");
        assert_eq!(&body[spans[0].marker.clone()], "[[Café]]");
    }

    #[test]
    fn repeated_markers_are_distinct_spans() {
        let body = "[[A]] [[A]]";
        let spans: std::collections::HashSet<ReferenceSpan> =
            extract_reference_spans(body).into_iter().collect();
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.text(body) == "A"));
    }
}
