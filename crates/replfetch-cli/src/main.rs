//! `replfetch` — list and download files from a board running a
//! MicroPython-style shell, over a UART exposed as a TCP port.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use replfetch_protocol::{
    decode_content, ClassifiedResponse, Command, PayloadEncoding, ProtocolError,
};
use replfetch_session::{DeadlinePolicy, Session, SessionConfig, TcpTransport};

#[derive(Parser)]
#[command(name = "replfetch", about = "Fetch files from a MicroPython board")]
struct Cli {
    /// Address of the board's serial channel, as host:port.
    #[arg(long, value_name = "HOST:PORT")]
    connect: String,

    /// Overall response deadline in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Increase log verbosity (-v info, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// List the files on the board.
    Ls,

    /// Print a file's text content to stdout.
    Cat {
        /// Path of the file on the board.
        path: String,
    },

    /// Download a file (base64 transfer, binary-safe).
    Get {
        /// Path of the file on the board.
        path: String,

        /// Local output path. Defaults to the remote filename.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e.downcast_ref::<ProtocolError>().is_some() {
                eprintln!("hint: the board may be busy or reset; retry or reconnect");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let encoding = match cli.command {
        Action::Get { .. } => PayloadEncoding::Base64,
        _ => PayloadEncoding::Text,
    };
    let config = SessionConfig {
        encoding,
        policy: DeadlinePolicy {
            overall_deadline: Duration::from_secs(cli.timeout),
            ..DeadlinePolicy::default()
        },
        ..SessionConfig::default()
    };

    let transport = TcpTransport::connect(&cli.connect)
        .with_context(|| format!("connecting to {}", cli.connect))?;
    info!("connected to {}", cli.connect);
    let mut session = Session::connect(transport, config)?;

    let code = match &cli.command {
        Action::Ls => {
            let response = session.execute(Command::List)?;
            match response {
                ClassifiedResponse::Listing(names) => {
                    for name in names {
                        println!("{name}");
                    }
                    ExitCode::SUCCESS
                }
                other => report_remote(&other),
            }
        }
        Action::Cat { path } => {
            let response = session.execute(Command::Read { path: path.clone() })?;
            match response {
                ClassifiedResponse::Content(text) => {
                    print!("{text}");
                    ExitCode::SUCCESS
                }
                other => report_remote(&other),
            }
        }
        Action::Get { path, output } => {
            let response = session.execute(Command::Read { path: path.clone() })?;
            match response {
                ClassifiedResponse::Content(text) => {
                    let bytes = decode_content(&text, PayloadEncoding::Base64)?;
                    let out = output.clone().unwrap_or_else(|| local_name(path));
                    fs::write(&out, &bytes)
                        .with_context(|| format!("writing {}", out.display()))?;
                    info!("wrote {} bytes to {}", bytes.len(), out.display());
                    ExitCode::SUCCESS
                }
                other => report_remote(&other),
            }
        }
    };

    session.close();
    Ok(code)
}

/// Remote-reported failures are content-level, not operational: print them
/// plainly and exit with a distinct code.
fn report_remote(response: &ClassifiedResponse) -> ExitCode {
    match response {
        ClassifiedResponse::RemoteError(msg) => {
            eprintln!("remote error: {msg}");
            ExitCode::from(2)
        }
        other => {
            eprintln!("unexpected response: {other:?}");
            ExitCode::FAILURE
        }
    }
}

/// Local filename for a remote path: the last path component.
fn local_name(remote: &str) -> PathBuf {
    let name = remote.rsplit('/').next().unwrap_or(remote);
    PathBuf::from(name)
}
