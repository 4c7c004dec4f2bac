use std::fmt;

use backend::ApiConfig;
use learn_core::model::{ItemId, Module, ModuleId, ParseIdError, UnitId};
use learn_core::sequence::{self, ContinueTarget, Direction, Position};
use services::{AdvanceOutcome, AppServices, CompletionStatus, MarkOutcome, ProgressStore};
use tracing_subscriber::EnvFilter;

const IN_PROGRESS_LIMIT: usize = 3;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidId { name: &'static str, source: ParseIdError },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { name, source } => write!(f, "invalid <{name}>: {source}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app modules                               [options]");
    eprintln!("  app progress <module-id>                  [options]");
    eprintln!("  app next     <module-id> <unit-id> <item-id> [options]");
    eprintln!("  app prev     <module-id> <unit-id> <item-id> [options]");
    eprintln!("  app complete <module-id> <unit-id> <item-id> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --api <url>      REST backend base URL (default: http://localhost:5000)");
    eprintln!("  --token <token>  Bearer token sent with every request");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_API_URL, LEARN_API_TOKEN, LEARN_API_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Modules,
    Progress(ModuleId),
    Step(ModuleId, Position, Direction),
    Complete(ModuleId, Position),
}

#[derive(Debug)]
struct Args {
    command: Command,
    api_url: Option<String>,
    token: Option<String>,
}

fn parse_id<T>(value: Option<String>, name: &'static str) -> Result<T, ArgsError>
where
    T: std::str::FromStr<Err = ParseIdError>,
{
    let raw = value.ok_or(ArgsError::MissingArg { name })?;
    raw.parse()
        .map_err(|source| ArgsError::InvalidId { name, source })
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Option<Self>, ArgsError> {
        let mut api_url = None;
        let mut token = None;
        let mut positional = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => api_url = Some(require_value(&mut args, "--api")?),
                "--token" => token = Some(require_value(&mut args, "--token")?),
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let Some(name) = positional.next() else {
            return Ok(None);
        };
        let command = match name.as_str() {
            "modules" => Command::Modules,
            "progress" => Command::Progress(parse_id(positional.next(), "module-id")?),
            "next" | "prev" | "complete" => {
                let module_id = parse_id(positional.next(), "module-id")?;
                let unit_id: UnitId = parse_id(positional.next(), "unit-id")?;
                let item_id: ItemId = parse_id(positional.next(), "item-id")?;
                let position = Position::new(unit_id, item_id);
                match name.as_str() {
                    "next" => Command::Step(module_id, position, Direction::Next),
                    "prev" => Command::Step(module_id, position, Direction::Previous),
                    _ => Command::Complete(module_id, position),
                }
            }
            _ => return Err(ArgsError::UnknownArg(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            command,
            api_url,
            token,
        }))
    }

    fn api_config(&self) -> Result<ApiConfig, backend::ApiError> {
        let config = match &self.api_url {
            Some(url) => ApiConfig::from_env_with_base_url(url)?,
            None => ApiConfig::from_env()?,
        };
        Ok(match &self.token {
            Some(token) => config.with_token(Some(token.clone())),
            None => config,
        })
    }
}

fn print_module(module: &Module, store: &ProgressStore) {
    let progress = store.module_progress(module);
    println!(
        "{} [{}] {}% ({}/{} items)",
        module.title(),
        module.id(),
        progress.percentage,
        progress.completed,
        progress.total
    );
    for unit in module.units() {
        println!("  {:>3}%  {} [{}]", store.unit_percentage(unit), unit.title(), unit.id());
        for item in unit.items() {
            let mark = if store.is_completed(item.id()) { "x" } else { " " };
            let duration = item.duration().unwrap_or("self-paced");
            println!(
                "        [{mark}] {} ({}, {duration}) [{}]",
                item.title(),
                item.kind(),
                item.id()
            );
            if let Some(url) = item.video_url() {
                println!("              {url}");
            }
        }
    }

    match sequence::first_incomplete(module, &store.completions()) {
        ContinueTarget::Resume(target) => {
            println!("continue: {} / {}", target.unit.title(), target.item.title());
        }
        ContinueTarget::Review(target) => {
            println!("complete! review from: {} / {}", target.unit.title(), target.item.title());
        }
        ContinueTarget::Overview => println!("no lessons yet"),
    }
}

fn print_position(label: &str, position: Option<&Position>) {
    match position {
        Some(position) => println!("{label}: {} {}", position.unit_id, position.item_id),
        None => println!("{label}: none"),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match Args::parse(argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    let app = AppServices::from_config(parsed.api_config()?)?;
    let store = app.store();

    match parsed.command {
        Command::Modules => {
            app.start_session().await;
            let modules = app.list_modules().await?;
            for module in &modules {
                let progress = store.module_progress(module);
                println!("{:>3}%  {} [{}]", progress.percentage, module.title(), module.id());
            }

            let stats = store.learner_stats(&modules);
            println!();
            println!(
                "started: {}  completed: {}  lessons done: {}",
                stats.started_modules, stats.completed_modules, stats.completed_lessons
            );
            for (module, pct) in store.in_progress(&modules, IN_PROGRESS_LIMIT) {
                println!("  in progress: {} ({pct}%)", module.title());
            }
        }
        Command::Progress(module_id) => {
            app.start_session().await;
            let module = app.open_module(&module_id).await?;
            print_module(&module, &store);
        }
        Command::Step(module_id, position, direction) => {
            let module = app.open_module(&module_id).await?;
            let target = sequence::resolve(&module, &position, direction).map(|t| t.position());
            let label = match direction {
                Direction::Next => "next",
                Direction::Previous => "previous",
            };
            print_position(label, target.as_ref());
        }
        Command::Complete(module_id, position) => {
            app.start_session().await;
            let module = app.open_module(&module_id).await?;
            match app.learning().mark_and_advance(&module, &position).await {
                AdvanceOutcome::NotInModule => {
                    eprintln!("{} {} is not part of {}", position.unit_id, position.item_id, module_id);
                    std::process::exit(1);
                }
                AdvanceOutcome::Advanced { status, next } => {
                    let status = match status {
                        CompletionStatus::AlreadyCompleted => "already completed",
                        CompletionStatus::Marked(MarkOutcome::Confirmed) => "completed",
                        CompletionStatus::Marked(MarkOutcome::RolledBack) => "not saved",
                        CompletionStatus::Marked(MarkOutcome::Superseded) => "superseded",
                    };
                    println!("{status} ({}% of module)", store.module_percentage(&module));
                    if next.is_none() {
                        println!("end of module");
                    }
                    print_position("next", next.as_ref());
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
