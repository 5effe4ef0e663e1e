use anyhow::{Context, Result};
use clap::Parser;
use logtail_core::{Config, TailRequest};
use logtail_stream::{DockerLogSource, TailEngine};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "logtail")]
#[command(author, version, about = "Follow the logs of a single pod container")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Tail a container's logs until it stops or Ctrl-C is pressed
    Tail {
        /// Namespace of the pod
        namespace: String,
        /// Pod name
        pod: String,
        /// Container name
        container: String,
        /// Number of trailing lines to fetch first
        #[arg(short = 'n', long)]
        lines: Option<u64>,
        /// Tail the previous instance of the container
        #[arg(short, long)]
        previous: bool,
        /// Milliseconds to wait for the stream to open
        #[arg(long)]
        grace_ms: Option<u64>,
        /// Line channel capacity
        #[arg(long)]
        capacity: Option<usize>,
        /// Longest log line accepted, in bytes
        #[arg(long)]
        max_line_bytes: Option<usize>,
    },
    /// Print the active configuration
    Config,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();
}

async fn tail(config: Config, request: TailRequest) -> Result<()> {
    let source = DockerLogSource::from_config(&config)?;
    let engine = TailEngine::new(source, config.tail_config())?;
    tracing::info!(
        grace = ?engine.config().open_grace,
        max_line_bytes = engine.config().max_line_bytes,
        "Tailing {request}"
    );

    let (tx, mut lines) = engine.line_channel();
    let cancel = engine
        .start_tail(request.clone(), tx)
        .await
        .with_context(|| format!("failed to tail {request}"))?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => println!("{line}"),
                None => break,
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupted, stopping tail");
                cancel.cancel();
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = Config::load()?;

    match cli.command {
        Commands::Tail {
            namespace,
            pod,
            container,
            lines,
            previous,
            grace_ms,
            capacity,
            max_line_bytes,
        } => {
            if let Some(grace_ms) = grace_ms {
                config.open_grace_ms = grace_ms;
            }
            if let Some(capacity) = capacity {
                config.channel_capacity = capacity;
            }
            if let Some(max_line_bytes) = max_line_bytes {
                config.max_line_bytes = max_line_bytes;
            }

            let mut request = TailRequest::new(namespace, pod, container).previous(previous);
            if let Some(limit) = lines.or(config.default_tail_lines) {
                request = request.with_line_limit(limit);
            }
            tail(config, request).await?;
        }
        Commands::Config => {
            println!("{}", Config::config_path()?.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
