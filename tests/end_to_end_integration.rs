use notedex::{
    Corpus, Engine, GraphEdge, Note, NoteId, ReferenceStatus, build_graph, extract_references,
};

fn corpus() -> Corpus {
    Corpus::new([
        Note::new("a", "A").with_body("See [[B]] and [[Ghost]]"),
        Note::new("b", "B"),
    ])
}

#[test]
fn references_backlinks_and_graph_agree() -> anyhow::Result<()> {
    let corpus = corpus();
    let engine = Engine::default();

    let body = &corpus
        .note(&NoteId::from("a"))
        .ok_or_else(|| anyhow::anyhow!("a missing"))?
        .body;
    let refs = engine.extract_references(&corpus, body);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].status, ReferenceStatus::Resolved(NoteId::from("b")));
    assert_eq!(refs[1].target_text, "Ghost");
    assert_eq!(refs[1].status, ReferenceStatus::Unresolved);

    let backlinks = engine.get_backlinks(&corpus, &NoteId::from("b"));
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].source, NoteId::from("a"));
    assert!(engine.get_backlinks(&corpus, &NoteId::from("a")).is_empty());

    let graph = engine.build_graph(&corpus);
    let node_ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(node_ids, vec!["a", "b"]);
    assert_eq!(
        graph.edges,
        vec![GraphEdge {
            a: "a".into(),
            b: "b".into()
        }]
    );
    Ok(())
}

#[test]
fn free_functions_match_the_engine() -> anyhow::Result<()> {
    let corpus = corpus();
    let engine = Engine::default();
    let titles = corpus.title_lookup();

    let body = "See [[B]] and [[Ghost]]";
    assert_eq!(
        extract_references(body, &titles),
        engine.extract_references(&corpus, body)
    );
    assert_eq!(
        build_graph(corpus.notes(), &titles),
        *engine.build_graph(&corpus)
    );
    Ok(())
}

#[test]
fn creating_the_missing_note_resolves_the_reference() -> anyhow::Result<()> {
    let mut corpus = corpus();
    let engine = Engine::default();
    assert_eq!(engine.unresolved_targets(&corpus).len(), 1);
    assert_eq!(engine.build_graph(&corpus).edges.len(), 1);

    corpus.insert_note(Note::new("g", "ghost"));
    assert!(engine.unresolved_targets(&corpus).is_empty());
    assert_eq!(engine.get_backlinks(&corpus, &NoteId::from("g")).len(), 1);
    assert_eq!(engine.build_graph(&corpus).edges.len(), 2);
    Ok(())
}
