use anyhow::{Context, Result};
use awscmd::config::{Config, OutputFormat};
use awscmd::operation::{self, OperationRequest, PagingOptions, Select};
use awscmd::output::{render_operation_table, render_value};
use awscmd::remote::{format_cmdlet_error, HttpRemoteClient};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Invoke AWS JSON API operations from the command line
#[derive(Parser, Debug)]
#[command(name = "awscmd", version = awscmd::VERSION, about, long_about = None)]
struct Cli {
    /// Endpoint URL used for every service (overrides config and AWS_ENDPOINT_URL)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke one operation
    Invoke(InvokeArgs),
    /// List registered operations
    Operations {
        /// Only show operations of this service
        #[arg(long)]
        service: Option<String>,
    },
    /// Show or update persisted defaults
    Config {
        /// Endpoint URL for every service; empty clears it
        #[arg(long)]
        set_endpoint: Option<String>,
        /// Default region; empty clears it
        #[arg(long)]
        set_region: Option<String>,
        /// Default server-side page size
        #[arg(long)]
        set_page_size: Option<u32>,
        /// Default output format
        #[arg(long, value_enum)]
        set_output: Option<OutputFormat>,
        /// Request timeout in seconds
        #[arg(long)]
        set_timeout: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct InvokeArgs {
    /// Operation name or cmdlet alias (e.g. DescribeDirectories, Get-DDBTableList)
    operation: String,

    /// Request parameter; repeat for more. Dotted keys build nested structures
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Resume from this cursor (fetches a single page)
    #[arg(long)]
    next_token: Option<String>,

    /// Stop once at least this many items were emitted
    #[arg(long)]
    max_items: Option<usize>,

    /// Server-side page size hint
    #[arg(long)]
    page_size: Option<u32>,

    /// Fetch only the first page
    #[arg(long)]
    no_auto_iterate: bool,

    /// `*` for the whole response, `^Param` to echo a parameter, or a field path
    #[arg(long)]
    select: Option<String>,

    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("awscmd started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("awscmd").join("awscmd.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".awscmd").join("awscmd.log");
    }
    PathBuf::from("awscmd.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<ExitCode> {
    let mut config = Config::load();

    match args.command {
        Command::Invoke(invoke) => run_invoke(&config, args.endpoint, args.region, invoke).await,
        Command::Operations { service } => {
            let operations = operation::list_operations(service.as_deref());
            print!("{}", render_operation_table(&operations));
            Ok(ExitCode::SUCCESS)
        }
        Command::Config {
            set_endpoint,
            set_region,
            set_page_size,
            set_output,
            set_timeout,
        } => {
            let changed = set_endpoint.is_some()
                || set_region.is_some()
                || set_page_size.is_some()
                || set_output.is_some()
                || set_timeout.is_some();

            if let Some(endpoint) = set_endpoint {
                config.endpoint = Some(endpoint).filter(|e| !e.is_empty());
            }
            if let Some(region) = set_region {
                config.region = Some(region).filter(|r| !r.is_empty());
            }
            if set_page_size.is_some() {
                config.page_size = set_page_size;
            }
            if set_output.is_some() {
                config.output = set_output;
            }
            if set_timeout.is_some() {
                config.timeout_secs = set_timeout;
            }
            if changed {
                config.save().context("Failed to save configuration")?;
            }

            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_invoke(
    config: &Config,
    endpoint: Option<String>,
    region: Option<String>,
    args: InvokeArgs,
) -> Result<ExitCode> {
    let client = HttpRemoteClient::new(config.client_config(endpoint, region))
        .context("Failed to create client")?;

    let mut builder = OperationRequest::builder();
    for assignment in &args.params {
        builder = builder.assign(assignment)?;
    }
    let request = builder.build();

    let select = args
        .select
        .as_deref()
        .map(str::parse::<Select>)
        .transpose()?;

    let options = PagingOptions {
        next_token: args.next_token,
        max_items: args.max_items,
        page_size: args.page_size.or(config.page_size),
        auto_iterate: !args.no_auto_iterate,
    };
    let format = args.output.or(config.output).unwrap_or_default();

    let cancel = CancellationToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trip.cancel();
        }
    });

    tracing::info!(
        "Invoking {} in {} ({} params)",
        args.operation,
        client.region(),
        request.params().len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error: Option<anyhow::Error> = None;

    let result = operation::invoke_operation(
        &client,
        &args.operation,
        request,
        &options,
        select.as_ref(),
        &cancel,
        |value| {
            if write_error.is_some() {
                return;
            }
            let written = render_value(&value, format)
                .and_then(|text| writeln!(out, "{}", text).map_err(anyhow::Error::from));
            if let Err(e) = written {
                write_error = Some(e);
                cancel.cancel();
            }
        },
    )
    .await;

    let _ = out.flush();
    if let Some(e) = write_error {
        return Err(e.context("Failed to write output"));
    }

    match result {
        Ok(outcome) => {
            if let Some(token) = &outcome.next_token {
                eprintln!("NextToken: {}", token);
            }
            if outcome.cancelled {
                eprintln!("Cancelled after {} items.", outcome.items_emitted);
                return Ok(ExitCode::from(130));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{} failed: {}", args.operation, e);
            eprintln!("Error: {}", format_cmdlet_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
