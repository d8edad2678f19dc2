use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use seam_dispatch::{ChannelNotifier, Dispatcher, EventRequest};
use seam_registry::{MachineRegistry, validate_dir};
use seam_store::{MemoryStore, SqliteStore, StackStore};

/// Seam - drives infrastructure stacks through declarative state machines
#[derive(Parser)]
#[command(name = "seam")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Directory of machine definitions (*.yml, *.yaml, *.json)
  #[arg(long, global = true, env = "SEAM_MACHINE_DIR", default_value = "machines")]
  machines: PathBuf,

  /// SQLite database URL (default: sqlite://~/.seam/stacks.db?mode=rwc)
  #[arg(long, global = true, env = "SEAM_DATABASE_URL")]
  database_url: Option<String>,

  /// Keep stacks in memory instead of SQLite
  #[arg(long, global = true)]
  memory: bool,

  /// Write logs as JSON
  #[arg(long, global = true)]
  json_logs: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate every machine file in a directory
  Validate {
    /// Directory to validate
    dir: PathBuf,
  },

  /// Dispatch one event read from a file or stdin
  Dispatch {
    /// Path to the event JSON (default: stdin)
    file: Option<PathBuf>,
  },

  /// Dispatch newline-delimited events from stdin until EOF
  Run,

  /// Print a persisted stack
  Show {
    /// The stack id
    stack_id: String,
  },

  /// List persisted stacks
  List,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.json_logs);

  let Some(command) = cli.command else {
    println!("seam - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Validate { dir } => validate(&dir).await,
      Commands::Dispatch { file } => {
        let store = open_store(cli.memory, cli.database_url.as_deref()).await?;
        dispatch_one(&cli.machines, store, file).await
      }
      Commands::Run => {
        let store = open_store(cli.memory, cli.database_url.as_deref()).await?;
        run(&cli.machines, store).await
      }
      Commands::Show { stack_id } => {
        let store = open_store(cli.memory, cli.database_url.as_deref()).await?;
        show(store, &stack_id).await
      }
      Commands::List => {
        if cli.memory {
          bail!("the in-memory store has nothing to list");
        }
        list(&open_sqlite(cli.database_url.as_deref()).await?).await
      }
    }
  })
}

fn init_logging(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let registry = tracing_subscriber::registry().with(filter);

  if json {
    registry
      .with(fmt::layer().json().with_writer(io::stderr))
      .init();
  } else {
    registry.with(fmt::layer().with_writer(io::stderr)).init();
  }
}

async fn open_store(memory: bool, database_url: Option<&str>) -> Result<Arc<dyn StackStore>> {
  if memory {
    return Ok(Arc::new(MemoryStore::new()));
  }
  Ok(Arc::new(open_sqlite(database_url).await?))
}

async fn open_sqlite(database_url: Option<&str>) -> Result<SqliteStore> {
  let url = match database_url {
    Some(url) => url.to_string(),
    None => {
      let dir = dirs::home_dir()
        .context("could not determine home directory")?
        .join(".seam");
      tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
      format!("sqlite://{}?mode=rwc", dir.join("stacks.db").display())
    }
  };

  let store = SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open database: {}", url))?;
  store.migrate().await.context("failed to migrate database")?;
  Ok(store)
}

/// Build a dispatcher whose notifications are printed to stdout.
///
/// The printer finishes once every clone of the dispatcher is dropped.
async fn build_dispatcher(
  machines: &Path,
  store: Arc<dyn StackStore>,
) -> Result<(Dispatcher, JoinHandle<()>)> {
  let registry = MachineRegistry::load_dir(machines)
    .await
    .with_context(|| format!("failed to load machines from {}", machines.display()))?;

  let (notifier, mut notifications) = ChannelNotifier::channel();
  let printer = tokio::spawn(async move {
    while let Some(notification) = notifications.recv().await {
      match serde_json::to_string(&notification) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, task = %notification.task.name, "failed to encode notification"),
      }
    }
  });

  let dispatcher = Dispatcher::new(store, Arc::new(registry), Arc::new(notifier));
  Ok((dispatcher, printer))
}

async fn validate(dir: &Path) -> Result<()> {
  let reports = validate_dir(dir)
    .await
    .with_context(|| format!("failed to read machine directory: {}", dir.display()))?;

  let mut failed = 0;
  for report in &reports {
    match &report.result {
      Ok(()) => println!("ok    {}", report.path.display()),
      Err(e) => {
        failed += 1;
        println!("FAIL  {}: {}", report.path.display(), e);
      }
    }
  }

  if failed > 0 {
    bail!("{} of {} machine files are invalid", failed, reports.len());
  }
  Ok(())
}

async fn dispatch_one(machines: &Path, store: Arc<dyn StackStore>, file: Option<PathBuf>) -> Result<()> {
  let request = read_event(file.as_deref()).await?;
  let (dispatcher, printer) = build_dispatcher(machines, store).await?;

  let outcome = dispatcher.dispatch(request).await;
  drop(dispatcher);
  printer.await.context("notification printer failed")?;

  let outcome = outcome.context("dispatch failed")?;
  eprintln!(
    "Stack {} is in state {} ({} notified{})",
    outcome.stack.id(),
    outcome.stack.state(),
    outcome.notified.len(),
    if outcome.removed { ", finished" } else { "" }
  );
  Ok(())
}

async fn run(machines: &Path, store: Arc<dyn StackStore>) -> Result<()> {
  let (dispatcher, printer) = build_dispatcher(machines, store).await?;

  let cancel = CancellationToken::new();
  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      interrupt.cancel();
    }
  });

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut dispatched = 0;
  let mut failed = 0;

  loop {
    let line = tokio::select! {
      _ = cancel.cancelled() => {
        warn!("interrupted, stopping");
        break;
      }
      line = lines.next_line() => line.context("failed to read event from stdin")?,
    };
    let Some(line) = line else { break };
    if line.trim().is_empty() {
      continue;
    }

    let request: EventRequest = match serde_json::from_str(&line) {
      Ok(request) => request,
      Err(e) => {
        warn!(error = %e, "skipping malformed event");
        failed += 1;
        continue;
      }
    };

    // Failures are logged by the dispatcher; keep going.
    match dispatcher.dispatch(request).await {
      Ok(_) => dispatched += 1,
      Err(_) => failed += 1,
    }
  }

  drop(dispatcher);
  printer.await.context("notification printer failed")?;

  info!(dispatched, failed, "event stream finished");
  Ok(())
}

async fn show(store: Arc<dyn StackStore>, stack_id: &str) -> Result<()> {
  let stack = store
    .find_stack(stack_id)
    .await
    .with_context(|| format!("failed to load stack '{}'", stack_id))?
    .with_context(|| format!("stack '{}' not found", stack_id))?;

  println!("{}", serde_json::to_string_pretty(&stack)?);
  Ok(())
}

async fn list(store: &SqliteStore) -> Result<()> {
  for summary in store.list_stacks().await.context("failed to list stacks")? {
    println!(
      "{}\t{}\t{}\t{}",
      summary.id,
      summary.machine,
      summary.state,
      summary.last_updated_time.to_rfc3339()
    );
  }
  Ok(())
}

async fn read_event(file: Option<&Path>) -> Result<EventRequest> {
  let input = match file {
    Some(path) => tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read event file: {}", path.display()))?,
    None => {
      if io::stdin().is_terminal() {
        bail!("no event given, pass a file or pipe JSON on stdin");
      }
      let mut input = String::new();
      io::stdin()
        .read_to_string(&mut input)
        .context("failed to read event from stdin")?;
      input
    }
  };

  serde_json::from_str(&input).context("failed to parse event JSON")
}
