// regpeer: registry directory peer. Joins a registry, publishes shared files, searches for peers.

mod config;
mod connect;
mod dispatch;
mod error;
mod shared;
mod transport;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use regpeer_core::PeerId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use dispatch::{Command, CommandKind, Dispatcher, Outcome};
use shared::SharedDir;

const INVALID_COMMAND: &str = "Invalid command. Please enter JOIN, PUBLISH, SEARCH, or EXIT.";

#[derive(Debug, Parser)]
#[command(name = "regpeer", version, about = "Registry directory peer")]
struct Cli {
    /// Registry host name or address
    registry_host: String,
    /// Registry port
    registry_port: String,
    /// Identifier of this peer (unsigned 32-bit)
    peer_id: PeerId,
    /// Directory of files to publish; overrides config and REGPEER_SHARED_DIR
    #[arg(long)]
    shared_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("regpeer: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load();
    let shared_dir = cli.shared_dir.unwrap_or(cfg.shared_dir);
    tracing::debug!(
        shared_dir = %shared_dir.display(),
        family = %cfg.address_family,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let stream =
            connect::connect_registry(&cli.registry_host, &cli.registry_port, cfg.address_family)
                .await
                .context("failed to connect to registry")?;
        let mut dispatcher = Dispatcher::new(stream, cli.peer_id, SharedDir::new(shared_dir));
        prompt_loop(
            &mut dispatcher,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await
    })
}

/// Read commands line by line until EXIT or end of input.
async fn prompt_loop<S, R, W>(
    dispatcher: &mut Dispatcher<S>,
    mut input: R,
    mut out: W,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        say(&mut out, "Enter Command: ").await?;
        let Some(line) = read_line(&mut input).await? else {
            tracing::debug!("input closed");
            dispatcher.execute(Command::Exit).await?;
            say(&mut out, "\nExiting...\n").await?;
            return Ok(());
        };
        let kind = std::str::from_utf8(&line)
            .ok()
            .and_then(|l| l.parse::<CommandKind>().ok());
        let Some(kind) = kind else {
            say(&mut out, &format!("{INVALID_COMMAND}\n")).await?;
            continue;
        };
        let cmd = match kind {
            CommandKind::Join => Command::Join,
            CommandKind::Publish => Command::Publish,
            CommandKind::Exit => Command::Exit,
            CommandKind::Search => {
                say(&mut out, "Enter filename: ").await?;
                match read_line(&mut input).await? {
                    Some(name) => Command::Search(name),
                    None => Command::Exit,
                }
            }
        };
        match dispatcher.execute(cmd).await {
            Ok(Outcome::Exited) => {
                say(&mut out, "Exiting...\n").await?;
                return Ok(());
            }
            Ok(outcome) => say(&mut out, &format!("{outcome}\n")).await?,
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                say(&mut out, &format!("Error: {e}\n")).await?;
                if e.breaks_connection() {
                    say(&mut out, "Registry connection is no longer usable; enter EXIT.\n")
                        .await?;
                }
            }
        }
    }
}

/// One input line as raw bytes, without its `\n` or `\r\n`. `None` at end of input.
async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if input.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, msg: &str) -> std::io::Result<()> {
    out.write_all(msg.as_bytes()).await?;
    out.flush().await
}
