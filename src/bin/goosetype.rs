//! Goosetype CLI
//!
//! Loads model manifests into a registry and inspects the result: compiled
//! schema descriptions, class relations, fingerprints and class search.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use goosetype::{manifest, Checksum, ClassName, GoosetypeConfig, ModelRegistry, RelationGraph};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goosetype")]
#[command(about = "Build and inspect document schemas from model manifests")]
struct Cli {
    /// Config file (defaults to goosetype.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Manifest files or directories (overrides the configured paths)
    #[arg(short, long)]
    manifests: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered classes
    Classes,

    /// Print compiled schema descriptions as JSON
    Describe {
        /// Class to describe (all if omitted)
        class: Option<String>,
    },

    /// Show relations between classes
    Relations {
        /// Class to show (all if omitted)
        class: Option<String>,
        /// Emit Graphviz DOT instead of text
        #[arg(long)]
        dot: bool,
    },

    /// Print schema fingerprints
    Checksum {
        /// Class to fingerprint (all if omitted)
        class: Option<String>,
    },

    /// Fuzzy search class names
    Search {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match GoosetypeConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Err(e) = run(cli, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &GoosetypeConfig) -> anyhow::Result<()> {
    let registry = config.registry();
    let paths = if cli.manifests.is_empty() {
        config.manifest_paths()
    } else {
        cli.manifests.clone()
    };

    let applied = manifest::load_all(&registry, &paths, &config.manifests.extensions)
        .context("failed to load model manifests")?;
    tracing::info!(files = applied.len(), classes = registry.class_names().len(), "registry ready");

    match cli.command {
        Commands::Classes => {
            for class in registry.class_names() {
                let fields = registry.definition(class.as_str()).map(|d| d.len()).unwrap_or(0);
                println!("{:<32} {:>3} fields", class, fields);
            }
        }

        Commands::Describe { class } => {
            let described: Vec<serde_json::Value> = selected(&registry, class)
                .iter()
                .map(|class| registry.compiled_schema(class.as_str()).describe())
                .collect();
            let output = if described.len() == 1 {
                serde_json::to_string_pretty(&described[0])?
            } else {
                serde_json::to_string_pretty(&described)?
            };
            println!("{}", output);
        }

        Commands::Relations { class, dot } => {
            let graph = RelationGraph::build(&registry);
            if dot {
                print!("{}", graph.to_dot());
                return Ok(());
            }

            for class in selected(&registry, class) {
                for relation in graph.relations_from(&class) {
                    println!(
                        "{}.{} -> {} ({:?}{})",
                        relation.from,
                        relation.field,
                        relation.to,
                        relation.kind,
                        if relation.many { ", many" } else { "" }
                    );
                }
                for poly in graph.polymorphic_from(&class) {
                    println!("{}.{} -> <{}> (polymorphic)", poly.from, poly.field, poly.path);
                }
            }

            let cycles = graph.embedding_cycles();
            if !cycles.is_empty() {
                println!();
                println!("Embedding cycles:");
                for cycle in cycles {
                    let names: Vec<&str> = cycle.iter().map(ClassName::as_str).collect();
                    println!("  {}", names.join(" <-> "));
                }
            }
        }

        Commands::Checksum { class } => {
            for class in selected(&registry, class) {
                let checksum = Checksum::of_schema(&registry.compiled_schema(class.as_str()));
                println!("{}  {}", checksum, class);
            }
        }

        Commands::Search { query, limit } => {
            let results = registry.search(&query, limit);
            if results.is_empty() {
                println!("No classes match '{}'", query);
            }
            for result in results {
                println!("{:>5}  {} ({} fields)", result.score, result.class, result.fields);
            }
        }
    }

    Ok(())
}

fn selected(registry: &ModelRegistry, class: Option<String>) -> Vec<ClassName> {
    match class {
        Some(name) => vec![ClassName::new(&name)],
        None => registry.class_names(),
    }
}
