use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use notedex::{Corpus, Engine, EngineConfig, NoteId, SmartCollection};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ndx",
    version,
    about = "Note reference, outline, graph and search queries over a corpus snapshot"
)]
struct Cli {
    /// Path to a JSON corpus snapshot (`notes`, `tags`, `folders`).
    #[arg(long, env = "NOTEDEX_CORPUS", global = true)]
    corpus: Option<PathBuf>,

    /// Optional TOML engine configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// References in a note, with their resolution status.
    Refs {
        #[arg(long)]
        note: String,
    },
    /// Heading tree of a note.
    Outline {
        #[arg(long)]
        note: String,
    },
    /// Notes referencing a note, with context.
    Backlinks {
        #[arg(long)]
        note: String,
    },
    /// Reference targets that match no note title.
    Unresolved,
    /// Nodes and undirected edges, optionally with a force layout.
    Graph {
        /// Run this many layout steps and include node positions.
        #[arg(long)]
        layout_steps: Option<usize>,
    },
    /// Ranked fuzzy search over titles, tags and content.
    Search { query: String },
    /// Evaluate a smart collection stored as JSON.
    Collection {
        #[arg(long)]
        rules: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    let corpus = load_corpus(require_corpus(cli.corpus.as_deref())?)?;
    let engine = Engine::new(config);
    info!(notes = corpus.len(), "corpus loaded");

    let output = match cli.command {
        Command::Refs { note } => {
            serde_json::to_value(engine.outgoing_references(&corpus, &NoteId::from(note)))?
        }
        Command::Outline { note } => {
            serde_json::to_value(engine.note_outline(&corpus, &NoteId::from(note)))?
        }
        Command::Backlinks { note } => {
            serde_json::to_value(engine.get_backlinks(&corpus, &NoteId::from(note)))?
        }
        Command::Unresolved => serde_json::to_value(engine.unresolved_targets(&corpus))?,
        Command::Graph { layout_steps } => {
            let graph = engine.build_graph(&corpus);
            let mut value = serde_json::to_value(graph.as_ref())?;
            if let Some(steps) = layout_steps {
                let mut sim = engine.layout(&graph);
                let ran = sim.run(steps);
                let mut positions = serde_json::Map::new();
                for (id, p) in sim.positions() {
                    positions.insert(id.to_string(), serde_json::to_value(p)?);
                }
                value["layout"] = serde_json::json!({ "steps": ran, "positions": positions });
            }
            value
        }
        Command::Search { query } => serde_json::to_value(engine.search(&corpus, &query))?,
        Command::Collection { rules } => {
            let text = read_text(&rules)?;
            let collection = SmartCollection::from_json_str(&text)?;
            let ids: Vec<&NoteId> = engine
                .evaluate_collection(&corpus, &collection)
                .into_iter()
                .map(|n| &n.id)
                .collect();
            serde_json::json!({ "name": collection.name, "notes": ids })
        }
    };

    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("NOTEDEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn require_corpus(corpus: Option<&Path>) -> anyhow::Result<&Path> {
    corpus.ok_or_else(|| anyhow::anyhow!("--corpus is required (or set NOTEDEX_CORPUS)"))
}

fn load_corpus(path: &Path) -> anyhow::Result<Corpus> {
    let text = read_text(path)?;
    Ok(Corpus::from_json_str(&text)?)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))
}
