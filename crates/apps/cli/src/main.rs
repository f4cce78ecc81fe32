use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use directory::catalog::{category_catalog, department_catalog};
use directory::source::{EntitySource, JsonFileSource};
use directory::{Entity, recompute};
use engine::script::{load_script, replay};
use engine::{Engine, EngineConfig, HeadlessSurface};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pinboard", about = "Filter and replay sessions over a directory of map pins")]
struct Cli {
    /// Engine configuration (JSON). Reference values are used when absent.
    #[arg(long, global = true, env = "PINBOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the entities passing the given predicates.
    List(ListArgs),
    /// Replay a timestamped interaction script and print the final state.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    data: PathBuf,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "department")]
    departments: Vec<String>,
    /// Also print the category and department catalogs.
    #[arg(long)]
    catalogs: bool,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[arg(long)]
    data: PathBuf,
    #[arg(long)]
    script: PathBuf,
}

#[derive(Serialize)]
struct ListRow<'a> {
    index: usize,
    #[serde(flatten)]
    entity: &'a Entity,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    count: usize,
    results: Vec<ListRow<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    departments: Option<Vec<String>>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Cmd::List(args) => cmd_list(args),
        Cmd::Replay(args) => cmd_replay(config, args),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => {
            let config = EngineConfig::load(path).map_err(|e| e.to_string())?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_entities(path: &Path) -> Result<Vec<Entity>, String> {
    JsonFileSource::new(path).load().map_err(|e| e.to_string())
}

fn cmd_list(args: ListArgs) -> Result<(), String> {
    let entities = load_entities(&args.data)?;

    let predicates = directory::PredicateState {
        search_text: args.search.trim().to_string(),
        selected_categories: args
            .categories
            .iter()
            .map(|c| c.trim().to_string())
            .collect::<BTreeSet<_>>(),
        selected_departments: args.departments.into_iter().collect(),
    };
    let positions = recompute(&entities, &predicates);
    info!(total = entities.len(), matched = positions.len(), "filtered");

    let output = ListOutput {
        count: positions.len(),
        results: positions
            .iter()
            .enumerate()
            .map(|(index, &pos)| ListRow {
                index,
                entity: &entities[pos],
            })
            .collect(),
        categories: args.catalogs.then(|| category_catalog(&entities)),
        departments: args.catalogs.then(|| department_catalog(&entities)),
    };
    print_json(&output)
}

fn cmd_replay(config: EngineConfig, args: ReplayArgs) -> Result<(), String> {
    let entities = load_entities(&args.data)?;
    let steps = load_script(&args.script).map_err(|e| e.to_string())?;

    let mut surface = HeadlessSurface::new(&config);
    let mut engine = Engine::new(config, entities, &mut surface);
    let report = replay(&mut engine, &mut surface, &steps);
    engine.teardown(&mut surface);

    info!(steps = steps.len(), commands = report.commands.len(), "replay finished");
    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}").map_err(|e| e.to_string())
}
