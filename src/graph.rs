use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::{LinkResolver, Note, NoteId, ReferenceStatus, TitleLookup};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NoteId,
    pub title: String,
    /// Resolved references leaving this note toward another node of the
    /// same graph; used for sizing only.
    pub link_count: usize,
}

/// Undirected edge, endpoints ordered so that `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct GraphEdge {
    pub a: NoteId,
    pub b: NoteId,
}

impl GraphEdge {
    /// Canonical key for the unordered pair, `None` for a self loop.
    pub fn undirected(x: NoteId, y: NoteId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn touches(&self, id: &NoteId) -> bool {
        self.a == *id || self.b == *id
    }

    pub fn other(&self, id: &NoteId) -> Option<&NoteId> {
        if self.a == *id {
            Some(&self.b)
        } else if self.b == *id {
            Some(&self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &NoteId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn neighbors<'a>(&'a self, id: &'a NoteId) -> impl Iterator<Item = &'a NoteId> + 'a {
        self.edges.iter().filter_map(move |e| e.other(id))
    }

    pub fn degree(&self, id: &NoteId) -> usize {
        self.edges.iter().filter(|e| e.touches(id)).count()
    }
}

/// One node per note and at most one edge per unordered pair of notes that
/// reference each other in either direction.
///
/// Edges whose endpoint is not among `notes` are dropped.
pub fn build_graph<'a>(
    notes: impl IntoIterator<Item = &'a Note>,
    lookup: &impl TitleLookup,
) -> Graph {
    let resolver = LinkResolver::new(lookup);
    let notes: Vec<&Note> = notes.into_iter().collect();
    let mut positions: HashMap<&NoteId, usize> = HashMap::with_capacity(notes.len());
    let mut nodes = Vec::with_capacity(notes.len());
    for note in &notes {
        if positions.contains_key(&note.id) {
            continue;
        }
        positions.insert(&note.id, nodes.len());
        nodes.push(GraphNode {
            id: note.id.clone(),
            title: note.title.clone(),
            link_count: 0,
        });
    }

    let mut edges: BTreeSet<GraphEdge> = BTreeSet::new();
    let mut dropped = 0usize;
    for note in &notes {
        let mut out_degree = 0usize;
        for reference in resolver.references(&note.body) {
            let ReferenceStatus::Resolved(target) = reference.status else {
                continue;
            };
            if target == note.id {
                continue;
            }
            if !positions.contains_key(&target) {
                dropped += 1;
                continue;
            }
            out_degree += 1;
            if let Some(edge) = GraphEdge::undirected(note.id.clone(), target) {
                edges.insert(edge);
            }
        }
        if let Some(&pos) = positions.get(&note.id) {
            nodes[pos].link_count += out_degree;
        }
    }

    if dropped > 0 {
        debug!(dropped, "dropped edges with missing endpoints");
    }
    debug!(nodes = nodes.len(), edges = edges.len(), "graph built");

    Graph {
        nodes,
        edges: edges.into_iter().collect(),
    }
}
