use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use filereacher::console::ConsoleReporter;
use filereacher::format::format_size;
use filereacher::navigation::{History, SessionHistory};
use filereacher::upload::{ProgressReporter, SilentReporter, UploadFile};
use filereacher::{ClientConfig, Explorer, ExplorerError, Settled};
use filereacher_core::{FileReacherClient, PathToken};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filereacher", version, about = "Browse and upload to a FileReacher file store")]
struct Cli {
    /// Server base URL, overrides FILEREACHER_URL
    #[arg(long)]
    server: Option<String>,
    /// Location to start in, as a path token
    #[arg(long)]
    path: Option<String>,
    /// Upload chunk size in bytes, overrides FILEREACHER_CHUNK_SIZE
    #[arg(long)]
    chunk_size: Option<u64>,
    /// Do not draw upload progress
    #[arg(short, long)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Print the store name
    Info,
    /// List the start location
    Ls,
    Mkdir {
        name: String,
    },
    /// Rename an entry
    Mv {
        name: String,
        to: String,
    },
    /// Delete a file
    Rm {
        name: String,
    },
    /// Delete a directory and its contents
    Rmdir {
        name: String,
    },
    /// Download a file
    Get {
        name: String,
        target: Option<PathBuf>,
    },
    /// Upload files, one after another
    Put {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Interactive browsing session
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }

    let client = FileReacherClient::with_base_url(&config.server_url)
        .with_context(|| format!("invalid server url {}", config.server_url))?;
    let reporter: Arc<dyn ProgressReporter> = if cli.quiet {
        Arc::new(SilentReporter)
    } else {
        Arc::new(ConsoleReporter::default())
    };
    let history = SessionHistory::new(cli.path.map(PathToken::new));
    let (mut explorer, worker) =
        Explorer::connect(client, history, reporter, config.upload_config())
            .await
            .context("cannot reach file store")?;
    tokio::spawn(worker.run());
    begin(&mut explorer).await;

    run(&mut explorer, cli.command).await
}

/// Shows the start location. A bad start token or a failed listing is a
/// notification, not a reason to abandon the command.
async fn begin<H: History>(explorer: &mut Explorer<H>) {
    if let Err(err) = explorer.start().await {
        warn!(kind = ?err.kind(), "cannot show start location: {err}");
        eprintln!("error: {err}");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(explorer: &mut Explorer<SessionHistory>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Info => {
            println!("{}", explorer.navigation().store_name());
        }
        Command::Ls => print_listing(explorer),
        Command::Mkdir { name } => explorer.mkdir(&name).await?,
        Command::Mv { name, to } => explorer.rename(&name, &to).await?,
        Command::Rm { name } => explorer.delete_file(&name).await?,
        Command::Rmdir { name } => explorer.delete_dir(&name).await?,
        Command::Get { name, target } => {
            let target = target.unwrap_or_else(|| PathBuf::from(&name));
            let written = explorer.download(&name, &target).await?;
            println!("{} ({})", target.display(), format_size(written));
        }
        Command::Put { files } => {
            let total = files.len();
            put(explorer, &files).await?;
            let settled = report_settled(explorer.settle_uploads().await);
            if !settled.failures.is_empty() {
                anyhow::bail!("{} of {} uploads failed", settled.failures.len(), total);
            }
        }
        Command::Shell => shell(explorer).await?,
    }
    Ok(())
}

async fn put(explorer: &Explorer<SessionHistory>, files: &[PathBuf]) -> Result<(), ExplorerError> {
    for path in files {
        let file = UploadFile::from_path(path).await?;
        explorer.upload(file)?;
    }
    Ok(())
}

const SHELL_HELP: &str = "\
commands:
  ls                 show the current directory
  pwd                show the breadcrumb trail
  cd NAME | cd ..    enter a directory or go up
  jump TOKEN         go to a location shown by pwd
  up                 go to the parent directory
  back | forward     move through history
  mkdir NAME         create a directory
  mv NAME NEW        rename an entry
  rm NAME            delete a file
  rmdir NAME         delete a directory and its contents
  get NAME           download a file into the working directory
  put FILE           upload a local file into the current directory
  quit";

async fn shell(explorer: &mut Explorer<SessionHistory>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_listing(explorer);
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(command, arg)| (command, arg.trim()))
            .unwrap_or((line, ""));
        match shell_step(explorer, command, arg).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

async fn shell_step(
    explorer: &mut Explorer<SessionHistory>,
    command: &str,
    arg: &str,
) -> Result<bool, ExplorerError> {
    match command {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "help" => println!("{SHELL_HELP}"),
        "ls" => print_listing(explorer),
        "pwd" => print_breadcrumbs(explorer),
        "cd" | "jump" | "mkdir" | "rm" | "rmdir" | "get" | "put" if arg.is_empty() => {
            eprintln!("usage: {command} {}", usage_arg(command));
        }
        "cd" if arg == ".." => {
            explorer.up().await?;
            print_listing(explorer);
        }
        "cd" => {
            explorer.open(arg).await?;
            print_listing(explorer);
        }
        "jump" => {
            explorer.jump(&PathToken::new(arg)).await?;
            print_listing(explorer);
        }
        "up" => {
            explorer.up().await?;
            print_listing(explorer);
        }
        "back" => {
            if explorer.back().await? {
                print_listing(explorer);
            }
        }
        "forward" => {
            if explorer.forward().await? {
                print_listing(explorer);
            }
        }
        "mkdir" => explorer.mkdir(arg).await?,
        "mv" => match arg.split_once(char::is_whitespace) {
            Some((name, to)) => explorer.rename(name, to.trim()).await?,
            None => eprintln!("usage: mv NAME NEW"),
        },
        "rm" => explorer.delete_file(arg).await?,
        "rmdir" => explorer.delete_dir(arg).await?,
        "get" => {
            let written = explorer.download(arg, &PathBuf::from(arg)).await?;
            println!("{arg} ({})", format_size(written));
        }
        "put" => {
            explorer.upload(UploadFile::from_path(arg).await?)?;
            report_settled(explorer.settle_uploads().await);
            print_listing(explorer);
        }
        other => eprintln!("unknown command: {other} (try help)"),
    }
    Ok(true)
}

fn usage_arg(command: &str) -> &'static str {
    match command {
        "jump" => "TOKEN",
        "put" => "FILE",
        _ => "NAME",
    }
}

fn report_settled(settled: Settled) -> Settled {
    for failure in &settled.failures {
        eprintln!("error: {failure}");
    }
    if let Some(err) = &settled.refresh_error {
        eprintln!("error: {err}");
    }
    settled
}

fn print_listing<H: History>(explorer: &Explorer<H>) {
    let navigation = explorer.navigation();
    println!("{}", navigation.title());
    let Some(listing) = navigation.listing() else {
        println!("  (listing unavailable)");
        return;
    };
    if listing.can_ascend() {
        println!("  ../");
    }
    for dir in &listing.entries.dirs {
        println!("  {dir}/");
    }
    for file in &listing.entries.files {
        println!("  {:<40} {:>12}", file.name, format_size(file.size));
    }
}

fn print_breadcrumbs<H: History>(explorer: &Explorer<H>) {
    let crumbs = explorer.navigation().breadcrumbs();
    let trail: Vec<String> = crumbs
        .iter()
        .map(|crumb| format!("{} [{}]", crumb.label, crumb.token))
        .collect();
    println!("{}", trail.join(" / "));
}
