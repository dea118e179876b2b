use notedex::{Corpus, Engine, MatchTier, Note, NoteId, SearchConfig, SearchIndex, Tag};

fn corpus() -> Corpus {
    Corpus::new([
        Note::new("review", "Title Review").with_body("Quarterly numbers."),
        Note::new("meeting", "Meeting").with_body("Discuss the roadmap with the team."),
        Note::new("plan", "Roadmap").with_body("Milestones for spring."),
        Note::new("misc", "Scratch").with_tag("t1").with_body("Nothing relevant."),
    ])
    .with_tags([Tag {
        id: "t1".into(),
        name: "ideas".into(),
    }])
}

#[test]
fn typo_in_query_still_finds_the_title() -> anyhow::Result<()> {
    let engine = Engine::default();
    let hits = engine.search(&corpus(), "titel");
    let hit = hits
        .iter()
        .find(|h| h.id == NoteId::from("review"))
        .ok_or_else(|| anyhow::anyhow!("Title Review not found"))?;
    assert!(hit.score > 0);
    assert_eq!(hit.tier, MatchTier::Title);
    assert_eq!(hit.title.matched().collect::<Vec<_>>(), vec!["Title"]);
    Ok(())
}

#[test]
fn exact_title_ranks_above_body_only_match() -> anyhow::Result<()> {
    let engine = Engine::default();
    let hits = engine.search(&corpus(), "roadmap");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(&ids[..2], &["plan", "meeting"]);
    assert_eq!(hits[0].tier, MatchTier::ExactTitle);
    assert_eq!(hits[1].tier, MatchTier::Content);

    let snippet = hits[1]
        .snippet
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("content hit without snippet"))?;
    assert_eq!(snippet.render("<", ">"), "Discuss the <roadmap> with the team.");
    Ok(())
}

#[test]
fn tag_names_are_searchable() -> anyhow::Result<()> {
    let engine = Engine::default();
    let hits = engine.search(&corpus(), "ideas");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, NoteId::from("misc"));
    assert_eq!(hits[0].tier, MatchTier::Tag);
    assert_eq!(hits[0].tag.as_ref().map(|t| t.text.as_str()), Some("ideas"));
    Ok(())
}

#[test]
fn empty_query_and_limit() -> anyhow::Result<()> {
    let corpus = corpus();
    let engine = Engine::default();
    assert!(engine.search(&corpus, "   ").is_empty());

    let index = SearchIndex::build(
        &corpus,
        SearchConfig {
            limit: 1,
            ..SearchConfig::default()
        },
    );
    assert_eq!(index.search("e").len(), 1);
    Ok(())
}

#[test]
fn index_follows_corpus_edits() -> anyhow::Result<()> {
    let mut corpus = corpus();
    let engine = Engine::default();
    assert!(engine.search(&corpus, "zeppelin").is_empty());

    corpus.insert_note(Note::new("z", "Zeppelin"));
    let hits = engine.search(&corpus, "zeppelin");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tier, MatchTier::ExactTitle);

    corpus.remove_note(&NoteId::from("z"));
    assert!(engine.search(&corpus, "zeppelin").is_empty());
    Ok(())
}
