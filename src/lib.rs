mod backlinks;
mod collection;
mod config;
mod engine;
mod error;
mod fingerprint;
mod graph;
mod layout;
mod link_resolve;
mod links;
mod note;
pub mod parse;
mod search;

pub use crate::collection::{
    DateOp, Rule, RuleField, RuleOperator, RuleSpec, SmartCollection, TextOp, evaluate_collection,
};
pub use crate::config::{EngineConfig, LayoutConfig, SearchConfig};
pub use crate::engine::Engine;
pub use crate::error::{Error, Result};
pub use crate::fingerprint::Fingerprint;
pub use crate::graph::{Graph, GraphEdge, GraphNode, build_graph};
pub use crate::layout::{Particle, Simulation, Vec2};
pub use crate::link_resolve::{LinkResolver, TitleIndex, TitleLookup, extract_references};
pub use crate::links::{
    Backlink, BacklinksIndex, ContextSnippet, Reference, ReferenceStatus, UnresolvedTarget,
};
pub use crate::note::{Corpus, Folder, FolderId, FolderTree, Note, NoteId, Tag, TagId};
pub use crate::parse::{
    HeadingNode, ReferenceSpan, extract_reference_spans, find_heading, flatten_outline,
    parse_outline,
};
pub use crate::search::{Highlighted, MatchTier, SearchHit, SearchIndex};
