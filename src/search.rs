use std::collections::BTreeMap;
use std::ops::Range;

use nucleo::{
    Matcher, Utf32Str,
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
};
use tracing::{debug, trace};
use unicode_segmentation::UnicodeSegmentation;

use crate::{Corpus, Note, NoteId, SearchConfig};

const ELLIPSIS: &str = "…";
// Roughly what nucleo awards a consecutive, word-aligned character.
const SCORE_PER_CHAR: u32 = 16;

/// Which field decided a hit's rank. Earlier variants rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchTier {
    ExactTitle,
    Title,
    Tag,
    Content,
}

/// Text with byte ranges of the matched regions, sorted and non-overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Highlighted {
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

impl Highlighted {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    /// Renders with every span wrapped in `open` / `close`.
    pub fn render(&self, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + self.spans.len() * 8);
        let mut at = 0;
        for span in &self.spans {
            out.push_str(&self.text[at..span.start]);
            out.push_str(open);
            out.push_str(&self.text[span.clone()]);
            out.push_str(close);
            at = span.end;
        }
        out.push_str(&self.text[at..]);
        out
    }

    pub fn matched(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|s| &self.text[s.clone()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchHit {
    pub id: NoteId,
    pub score: u32,
    pub tier: MatchTier,
    pub title: Highlighted,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Highlighted>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<Highlighted>,
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    title: String,
    title_lower: String,
    body: String,
    tags: Vec<String>,
}

impl IndexedDoc {
    fn new(note: &Note, corpus: &Corpus) -> Self {
        let mut tags: Vec<String> = corpus.tag_names(note).map(str::to_string).collect();
        tags.sort();
        Self {
            title: note.title.clone(),
            title_lower: note.title.to_lowercase(),
            body: note.body.clone(),
            tags,
        }
    }
}

/// Ranked fuzzy index over titles, bodies and tag names.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    config: SearchConfig,
    docs: BTreeMap<NoteId, IndexedDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldMatch {
    score: u32,
    spans: Vec<Range<usize>>,
}

struct QueryState<'q> {
    raw_lower: String,
    pattern: Pattern,
    typo: TypoQuery<'q>,
    matcher: Matcher,
    utf32_buf: Vec<char>,
    indices: Vec<u32>,
}

impl SearchIndex {
    pub fn build(corpus: &Corpus, config: SearchConfig) -> Self {
        let mut idx = Self {
            config,
            docs: BTreeMap::new(),
        };
        for note in corpus.notes() {
            idx.upsert(note, corpus);
        }
        debug!(docs = idx.docs.len(), "search index built");
        idx
    }

    /// Adds or replaces a single note; tag names are read from `corpus`.
    pub fn upsert(&mut self, note: &Note, corpus: &Corpus) {
        self.docs
            .insert(note.id.clone(), IndexedDoc::new(note, corpus));
    }

    pub fn remove(&mut self, id: &NoteId) -> bool {
        self.docs.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ranked matches for `query`. An empty query has no matches.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let q = query.trim();
        if q.is_empty() || self.config.limit == 0 {
            return Vec::new();
        }

        let words = normalized_words(q);
        let mut state = QueryState {
            raw_lower: q.to_lowercase(),
            pattern: Pattern::new(q, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy),
            typo: TypoQuery::new(&words, self.config.max_typo_distance),
            matcher: Matcher::new(nucleo::Config::DEFAULT),
            utf32_buf: Vec::new(),
            indices: Vec::new(),
        };

        let mut hits: Vec<SearchHit> = self
            .docs
            .iter()
            .filter_map(|(id, doc)| self.match_doc(id, doc, &mut state))
            .filter(|h| h.score >= self.config.min_score)
            .collect();

        hits.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.title.text.to_lowercase().cmp(&b.title.text.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(self.config.limit);
        trace!(query = q, hits = hits.len(), "search");
        hits
    }

    fn match_doc(&self, id: &NoteId, doc: &IndexedDoc, state: &mut QueryState<'_>) -> Option<SearchHit> {
        let title_match = match_field(&doc.title, state);
        let exact = doc.title_lower == state.raw_lower;

        if exact || title_match.is_some() {
            let (tier, m) = if exact {
                let score = title_match.as_ref().map_or(0, |m| m.score);
                (
                    MatchTier::ExactTitle,
                    FieldMatch {
                        score: score.max(exact_score(&doc.title)),
                        spans: vec![0..doc.title.len()],
                    },
                )
            } else {
                (MatchTier::Title, title_match?)
            };
            return Some(SearchHit {
                id: id.clone(),
                score: m.score.max(1),
                tier,
                title: Highlighted {
                    text: doc.title.clone(),
                    spans: m.spans,
                },
                tag: None,
                snippet: self.content_snippet(doc, state),
            });
        }

        let best_tag = doc
            .tags
            .iter()
            .filter_map(|t| match_field(t, state).map(|m| (t, m)))
            .max_by(|(ta, a), (tb, b)| a.score.cmp(&b.score).then_with(|| tb.cmp(ta)));
        if let Some((tag, m)) = best_tag {
            return Some(SearchHit {
                id: id.clone(),
                score: m.score.max(1),
                tier: MatchTier::Tag,
                title: Highlighted::plain(doc.title.clone()),
                tag: Some(Highlighted {
                    text: tag.clone(),
                    spans: m.spans,
                }),
                snippet: self.content_snippet(doc, state),
            });
        }

        let (line, m) = best_line_match(&doc.body, state)?;
        Some(SearchHit {
            id: id.clone(),
            score: m.score.max(1),
            tier: MatchTier::Content,
            title: Highlighted::plain(doc.title.clone()),
            tag: None,
            snippet: Some(snippet(line, &m.spans, self.config.snippet_radius)),
        })
    }

    fn content_snippet(&self, doc: &IndexedDoc, state: &mut QueryState<'_>) -> Option<Highlighted> {
        let (line, m) = best_line_match(&doc.body, state)?;
        Some(snippet(line, &m.spans, self.config.snippet_radius))
    }
}

fn exact_score(title: &str) -> u32 {
    (title.chars().count() as u32).saturating_mul(SCORE_PER_CHAR)
}

fn best_line_match<'b>(body: &'b str, state: &mut QueryState<'_>) -> Option<(&'b str, FieldMatch)> {
    let mut best: Option<(&str, FieldMatch)> = None;
    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(m) = match_field(line, state) else {
            continue;
        };
        match &best {
            Some((_, b)) if b.score >= m.score => {}
            _ => best = Some((line, m)),
        }
    }
    best
}

/// Fuzzy subsequence match first, edit-distance word match as fallback.
fn match_field(text: &str, state: &mut QueryState<'_>) -> Option<FieldMatch> {
    state.indices.clear();
    let fuzzy = state.pattern.indices(
        Utf32Str::new(text, &mut state.utf32_buf),
        &mut state.matcher,
        &mut state.indices,
    );
    if let Some(score) = fuzzy {
        return Some(FieldMatch {
            score,
            spans: match_indices_to_spans(text, &mut state.indices),
        });
    }
    state.typo.best_window(text)
}

/// Maps matcher indices back to byte spans. nucleo indexes ASCII text by
/// byte and everything else by extended grapheme cluster.
fn match_indices_to_spans(text: &str, indices: &mut Vec<u32>) -> Vec<Range<usize>> {
    indices.sort_unstable();
    indices.dedup();
    let units: Vec<(usize, usize)> = if text.is_ascii() {
        (0..text.len()).map(|i| (i, 1)).collect()
    } else {
        text.grapheme_indices(true).map(|(i, g)| (i, g.len())).collect()
    };
    let mut spans: Vec<Range<usize>> = Vec::new();
    for &ix in indices.iter() {
        let Some(&(start, len)) = units.get(ix as usize) else {
            continue;
        };
        let end = start + len;
        match spans.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => spans.push(start..end),
        }
    }
    spans
}

fn normalized_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Lowercased alphanumeric words of `text` with their byte ranges.
fn words_with_ranges(text: &str) -> Vec<(Range<usize>, String)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s..i, text[s..i].to_lowercase()));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s..text.len(), text[s..].to_lowercase()));
    }
    out
}

struct TypoQuery<'q> {
    words: &'q [String],
    joined: Vec<char>,
    max_distance: usize,
}

impl<'q> TypoQuery<'q> {
    fn new(words: &'q [String], max_typo_distance: usize) -> Self {
        let joined: Vec<char> = words.join(" ").chars().collect();
        let max_distance = allowed_typos(joined.len()).min(max_typo_distance);
        Self {
            words,
            joined,
            max_distance,
        }
    }

    /// Best window of consecutive words within the allowed edit distance.
    fn best_window(&self, text: &str) -> Option<FieldMatch> {
        let k = self.words.len();
        if k == 0 || self.max_distance == 0 {
            return None;
        }
        let words = words_with_ranges(text);
        if words.len() < k {
            return None;
        }

        let mut best: Option<(usize, Range<usize>)> = None;
        for window in words.windows(k) {
            let candidate: Vec<char> = window
                .iter()
                .map(|(_, w)| w.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .collect();
            if candidate.len().abs_diff(self.joined.len()) > self.max_distance {
                continue;
            }
            let dist = osa_distance(&self.joined, &candidate);
            if dist > self.max_distance {
                continue;
            }
            let range = window[0].0.start..window[k - 1].0.end;
            match &best {
                Some((d, _)) if *d <= dist => {}
                _ => best = Some((dist, range)),
            }
        }

        let (dist, range) = best?;
        let len = self.joined.len();
        let score = (len.saturating_sub(dist) as u32 * SCORE_PER_CHAR / (1 + dist as u32)).max(1);
        Some(FieldMatch {
            score,
            spans: vec![range],
        })
    }
}

fn allowed_typos(query_chars: usize) -> usize {
    match query_chars {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
fn osa_distance(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }
    let mut rows = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in rows.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        rows[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (rows[i - 1][j] + 1)
                .min(rows[i][j - 1] + 1)
                .min(rows[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(rows[i - 2][j - 2] + 1);
            }
            rows[i][j] = d;
        }
    }
    rows[n][m]
}

/// Cuts `line` to `radius` characters around the matched spans.
fn snippet(line: &str, spans: &[Range<usize>], radius: usize) -> Highlighted {
    let (Some(first), Some(last)) = (spans.first(), spans.last()) else {
        return Highlighted::plain(line.trim());
    };

    let start = line[..first.start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(first.start, |(i, _)| i);
    let end = line[last.end..]
        .chars()
        .take(radius)
        .fold(last.end, |at, c| at + c.len_utf8());

    let mut text = String::new();
    if start > 0 {
        text.push_str(ELLIPSIS);
    }
    let shift = text.len();
    text.push_str(&line[start..end]);
    if end < line.len() {
        text.push_str(ELLIPSIS);
    }

    Highlighted {
        text,
        spans: spans
            .iter()
            .map(|s| s.start - start + shift..s.end - start + shift)
            .collect(),
    }
}
