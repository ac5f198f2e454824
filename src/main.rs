mod chunk;
mod completion;
mod config;
mod dispatch;
mod metrics;
mod protocol;
mod sender;
mod upload;
mod utils;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{SendConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "filesnd")]
#[command(about = "Send a file in fixed-size chunks, one TCP connection per chunk")]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short = 'f', help = "Source file [default: data.txt]")]
    file: Option<PathBuf>,

    #[arg(short = 'j', help = "Chunk size in bytes [default: 1]")]
    job: Option<usize>,

    #[arg(short = 's', help = "Receiver address host:port [default: 127.0.0.1:9001]")]
    server: Option<String>,

    #[arg(short = 'v', help = "Print version and exit")]
    version: bool,

    #[arg(long, help = "Config file path")]
    config: Option<PathBuf>,

    #[arg(long, help = "Maximum concurrent connections, 0 for unbounded")]
    max_inflight: Option<usize>,

    #[arg(long, help = "Print the transfer report as JSON")]
    json: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a config file with default values
    GenerateConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE, help = "Config file path")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("filesnd {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filesnd=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        SendConfig::default().save(output)?;
        println!("Wrote default config to {}", output.display());
        return Ok(());
    }

    let mut config = SendConfig::load(cli.config.as_deref())?;

    // Flags win over the config file
    if let Some(file) = cli.file {
        config.file = file;
    }
    if let Some(job) = cli.job {
        config.chunk_size = job;
    }
    if let Some(server) = cli.server {
        config.server = server;
    }
    if let Some(max_inflight) = cli.max_inflight {
        config.max_inflight = max_inflight;
    }

    info!("file: {}", config.file.display());
    info!("job: {}", config.chunk_size);
    info!("host:port: {}", config.server);

    let report = upload::run(&config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            "{} chunk(s), {} delivered, {} failed, {} bytes in {} us",
            report.chunks, report.delivered, report.failed, report.bytes_read, report.elapsed_us
        );
    }

    Ok(())
}
