use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::backlinks::{build_backlinks, unresolved_targets};
use crate::parse::{HeadingNode, parse_outline};
use crate::{
    Backlink, BacklinksIndex, Corpus, EngineConfig, Fingerprint, Graph, LinkResolver, Note,
    NoteId, Reference, SearchHit, SearchIndex, Simulation, SmartCollection, TitleIndex,
    UnresolvedTarget, evaluate_collection,
};

/// A derived view cached against the corpus fingerprint it was built from.
#[derive(Debug)]
struct Memo<T> {
    view: &'static str,
    slot: RefCell<Option<(Fingerprint, Rc<T>)>>,
}

impl<T> Memo<T> {
    fn new(view: &'static str) -> Self {
        Self {
            view,
            slot: RefCell::new(None),
        }
    }

    fn get_or_build(&self, fingerprint: &Fingerprint, build: impl FnOnce() -> T) -> Rc<T> {
        {
            let slot = self.slot.borrow();
            if let Some((cached, value)) = slot.as_ref() {
                if cached == fingerprint {
                    trace!(view = self.view, "memo hit");
                    return Rc::clone(value);
                }
            }
        }

        debug!(view = self.view, %fingerprint, "rebuilding derived view");
        let value = Rc::new(build());
        *self.slot.borrow_mut() = Some((fingerprint.clone(), Rc::clone(&value)));
        value
    }

    fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}

/// Entry point for consumers: every query takes the current corpus and
/// answers from memoized views when the corpus is unchanged.
///
/// Not `Sync`: memo slots use `RefCell`.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    titles: Memo<TitleIndex>,
    backlinks: Memo<BacklinksIndex>,
    graph: Memo<Graph>,
    search: Memo<SearchIndex>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            titles: Memo::new("titles"),
            backlinks: Memo::new("backlinks"),
            graph: Memo::new("graph"),
            search: Memo::new("search"),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drops every cached view. Never needed for correctness.
    pub fn invalidate(&self) {
        self.titles.clear();
        self.backlinks.clear();
        self.graph.clear();
        self.search.clear();
    }

    pub fn title_index(&self, corpus: &Corpus) -> Rc<TitleIndex> {
        self.title_index_for(corpus, &Fingerprint::of(corpus))
    }

    fn title_index_for(&self, corpus: &Corpus, fp: &Fingerprint) -> Rc<TitleIndex> {
        self.titles.get_or_build(fp, || corpus.title_lookup())
    }

    /// `[[...]]` references in `body`, resolved against the corpus titles.
    pub fn extract_references(&self, corpus: &Corpus, body: &str) -> Vec<Reference> {
        let titles = self.title_index(corpus);
        LinkResolver::new(titles.as_ref()).references(body)
    }

    /// References leaving a note; empty for unknown ids.
    pub fn outgoing_references(&self, corpus: &Corpus, id: &NoteId) -> Vec<Reference> {
        match corpus.note(id) {
            Some(note) => self.extract_references(corpus, &note.body),
            None => Vec::new(),
        }
    }

    pub fn parse_outline(&self, id: &NoteId, body: &str) -> Vec<HeadingNode> {
        parse_outline(id, body)
    }

    /// Outline of a stored note; empty for unknown ids.
    pub fn note_outline(&self, corpus: &Corpus, id: &NoteId) -> Vec<HeadingNode> {
        corpus
            .note(id)
            .map(|note| parse_outline(&note.id, &note.body))
            .unwrap_or_default()
    }

    pub fn backlinks_index(&self, corpus: &Corpus) -> Rc<BacklinksIndex> {
        let fp = Fingerprint::of(corpus);
        let titles = self.title_index_for(corpus, &fp);
        self.backlinks.get_or_build(&fp, || {
            build_backlinks(corpus, titles.as_ref(), self.config.context_window)
        })
    }

    /// Inbound references to `id`; empty for unknown ids.
    pub fn get_backlinks(&self, corpus: &Corpus, id: &NoteId) -> Vec<Backlink> {
        self.backlinks_index(corpus).backlinks(id).to_vec()
    }

    pub fn unresolved_targets(&self, corpus: &Corpus) -> Vec<UnresolvedTarget> {
        let titles = self.title_index(corpus);
        unresolved_targets(corpus, titles.as_ref())
    }

    /// Graph over the whole corpus.
    pub fn build_graph(&self, corpus: &Corpus) -> Rc<Graph> {
        let fp = Fingerprint::of(corpus);
        let titles = self.title_index_for(corpus, &fp);
        self.graph
            .get_or_build(&fp, || crate::graph::build_graph(corpus.notes(), titles.as_ref()))
    }

    /// Graph restricted to `notes`; references are still resolved against the
    /// whole corpus, and edges leaving the subset are dropped. Not memoized.
    pub fn build_subgraph<'a>(
        &self,
        corpus: &Corpus,
        notes: impl IntoIterator<Item = &'a Note>,
    ) -> Graph {
        let titles = self.title_index(corpus);
        crate::graph::build_graph(notes, titles.as_ref())
    }

    pub fn layout(&self, graph: &Graph) -> Simulation {
        Simulation::new(graph, self.config.layout.clone())
    }

    pub fn search_index(&self, corpus: &Corpus) -> Rc<SearchIndex> {
        let fp = Fingerprint::of(corpus);
        self.search
            .get_or_build(&fp, || SearchIndex::build(corpus, self.config.search.clone()))
    }

    pub fn search(&self, corpus: &Corpus, query: &str) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.search_index(corpus).search(query)
    }

    /// Always evaluated against `corpus` as it is now.
    pub fn evaluate_collection<'a>(
        &self,
        corpus: &'a Corpus,
        collection: &SmartCollection,
    ) -> Vec<&'a Note> {
        evaluate_collection(collection, corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::new([
            Note::new("a", "A").with_body("See [[B]] and [[Ghost]]"),
            Note::new("b", "B"),
        ])
    }

    #[test]
    fn cached_views_are_reused_until_the_corpus_changes() {
        let engine = Engine::default();
        let mut corpus = corpus();

        let g1 = engine.build_graph(&corpus);
        let g2 = engine.build_graph(&corpus);
        assert!(Rc::ptr_eq(&g1, &g2));

        corpus.insert_note(Note::new("c", "C").with_body("[[A]]"));
        let g3 = engine.build_graph(&corpus);
        assert!(!Rc::ptr_eq(&g1, &g3));
        assert_eq!(g3.edges.len(), 2);
    }

    #[test]
    fn memoized_results_match_a_fresh_engine() {
        let warm = Engine::default();
        let mut corpus = corpus();
        let _ = warm.get_backlinks(&corpus, &"b".into());

        corpus.insert_note(Note::new("a", "A").with_body("nothing here"));
        let cold = Engine::default();
        assert_eq!(
            warm.get_backlinks(&corpus, &"b".into()),
            cold.get_backlinks(&corpus, &"b".into())
        );
        assert!(warm.get_backlinks(&corpus, &"b".into()).is_empty());
    }

    #[test]
    fn unknown_ids_yield_empty_results() {
        let engine = Engine::default();
        let corpus = corpus();
        let missing = NoteId::from("missing");
        assert!(engine.get_backlinks(&corpus, &missing).is_empty());
        assert!(engine.outgoing_references(&corpus, &missing).is_empty());
        assert!(engine.note_outline(&corpus, &missing).is_empty());
    }

    #[test]
    fn unresolved_targets_group_sources() {
        let engine = Engine::default();
        let mut corpus = corpus();
        corpus.insert_note(Note::new("c", "C").with_body("[[ghost]] again"));
        let targets = engine.unresolved_targets(&corpus);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].text, "Ghost");
        assert_eq!(targets[0].sources, vec![NoteId::from("a"), NoteId::from("c")]);
    }
}
