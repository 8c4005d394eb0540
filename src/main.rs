//! Splunk MCP CLI
//!
//! A command-line interface for the Splunk MCP server.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use splunk_mcp::{
    ConnectionManager, SERVER_NAME, SplunkConfig, SplunkError, SplunkResult, VERSION,
    config::{
        DEFAULT_HOST, DEFAULT_PORT, ENV_HOST, ENV_PASSWORD, ENV_PORT, ENV_PROTOCOL, ENV_TIMEOUT_SECS,
        ENV_TOKEN, ENV_USERNAME, Scheme,
    },
    server::{DEFAULT_SSE_PORT, ServerConfig, SplunkMcpServer, TransportType},
    tools::{indexes, query},
    types::{DEFAULT_EARLIEST_TIME, DEFAULT_LATEST_TIME, RunQueryArgs, SearchRecord},
};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt};

/// Splunk MCP - Splunk search tools for AI agents
#[derive(Parser, Debug)]
#[command(
    name = "splunk-mcp",
    version = VERSION,
    about = "An MCP server for running Splunk searches",
    long_about = "splunk-mcp is a Model Context Protocol (MCP) server that lets AI agents run Splunk searches and list Splunk indexes.\n\n\
                  It can be used as:\n\
                  - An MCP server (STDIO or SSE transport)\n\
                  - A CLI tool for direct searches and index listing\n\n\
                  Connection settings come from flags or SPLUNK_* environment variables."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable all logging output (useful for stdio transport)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(flatten)]
    splunk: SplunkArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Splunk connection settings
#[derive(Args, Debug)]
struct SplunkArgs {
    /// Splunk host
    #[arg(long = "splunk-host", env = ENV_HOST, default_value = DEFAULT_HOST, global = true)]
    splunk_host: String,

    /// Splunk management port
    #[arg(long = "splunk-port", env = ENV_PORT, default_value_t = DEFAULT_PORT, global = true)]
    splunk_port: u16,

    /// Scheme used to reach Splunk (http or https)
    #[arg(long = "splunk-protocol", env = ENV_PROTOCOL, default_value = "https", global = true)]
    protocol: Scheme,

    /// Authentication token; takes precedence over username/password
    #[arg(long = "splunk-token", env = ENV_TOKEN, hide_env_values = true, global = true)]
    token: Option<String>,

    /// Splunk username
    #[arg(long = "splunk-username", env = ENV_USERNAME, global = true)]
    username: Option<String>,

    /// Splunk password
    #[arg(long = "splunk-password", env = ENV_PASSWORD, hide_env_values = true, global = true)]
    password: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long = "timeout-secs", env = ENV_TIMEOUT_SECS, global = true)]
    timeout_secs: Option<u64>,
}

impl From<SplunkArgs> for SplunkConfig {
    fn from(args: SplunkArgs) -> Self {
        SplunkConfig {
            host: args.splunk_host,
            port: args.splunk_port,
            scheme: args.protocol,
            token: args.token,
            username: args.username,
            password: args.password,
            timeout: args.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP server
    Serve {
        /// Transport type to use
        #[arg(short, long, default_value = "stdio")]
        transport: TransportOption,

        /// Port for SSE transport (only used with --transport sse)
        #[arg(short, long, default_value_t = DEFAULT_SSE_PORT)]
        port: u16,

        /// Host to bind to for SSE transport
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Run a Splunk search
    Query {
        /// Search query, e.g. "search index=main error | head 10"
        query: String,

        /// Earliest time bound
        #[arg(short, long, default_value = DEFAULT_EARLIEST_TIME, allow_hyphen_values = true)]
        earliest: String,

        /// Latest time bound
        #[arg(short, long, default_value = DEFAULT_LATEST_TIME, allow_hyphen_values = true)]
        latest: String,
    },

    /// List accessible Splunk indexes
    Indexes,

    /// Show server information
    Info,

    /// Validate configuration and connectivity
    Check,
}

/// Transport options for the serve command
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum TransportOption {
    /// Standard input/output (for MCP clients)
    #[default]
    Stdio,
    /// Server-Sent Events over HTTP
    Sse,
}

/// Set up logging with configurable output destination
///
/// # Arguments
/// * `verbose` - Enable debug-level logging
/// * `use_stderr` - Write logs to stderr instead of stdout (required for stdio transport)
/// * `quiet` - Disable all logging output
/// * `json` - Emit JSON lines instead of human-readable logs
fn setup_logging(verbose: bool, use_stderr: bool, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    // For stdio transport, logs MUST go to stderr to avoid corrupting the JSON-RPC stream
    match (json, use_stderr) {
        (true, true) => subscriber.json().with_writer(std::io::stderr).init(),
        (true, false) => subscriber.json().init(),
        (false, true) => subscriber.with_ansi(false).with_writer(std::io::stderr).init(),
        (false, false) => subscriber.init(),
    }
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

fn print_info(label: &str, value: &str) {
    println!("  {} {}", format!("{}:", label).bright_blue(), value);
}

fn print_section(title: &str) {
    println!("\n{}", title.yellow().bold());
    println!("{}", "─".repeat(40).bright_black());
}

fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> SplunkResult<()> {
    match format {
        OutputFormat::JsonCompact => println!("{}", serde_json::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

async fn run_serve(
    config: SplunkConfig,
    transport: TransportOption,
    port: u16,
    host: String,
) -> SplunkResult<()> {
    let server = SplunkMcpServer::new(ServerConfig { splunk: config });

    let transport_type = match transport {
        TransportOption::Stdio => TransportType::Stdio,
        TransportOption::Sse => {
            let addr: Ipv4Addr = host.parse().map_err(|_| {
                SplunkError::InvalidArguments(format!("Invalid host format: {}", host))
            })?;

            TransportType::Sse {
                port,
                host: addr.octets(),
            }
        },
    };

    server.run(transport_type).await
}

async fn run_query(
    config: SplunkConfig,
    args: RunQueryArgs,
    format: OutputFormat,
    no_color: bool,
) -> SplunkResult<()> {
    let manager = ConnectionManager::new(config);
    let records = query::run_query(&manager, &args).await?;

    if !matches!(format, OutputFormat::Pretty) {
        return print_json(&records, format);
    }

    if no_color {
        println!("\nResults for: {}", args.query);
        println!("{}", "=".repeat(50));
        println!(
            "{} records ({} to {})",
            records.len(),
            args.earliest_time,
            args.latest_time
        );
    } else {
        print_section(&format!("Results for: {}", args.query.cyan()));
        println!(
            "{} records ({} to {})",
            records.len().to_string().green(),
            args.earliest_time.bright_blue(),
            args.latest_time.bright_blue()
        );
    }
    println!();

    for (i, record) in records.iter().enumerate() {
        match record {
            SearchRecord::Data(fields) => {
                if no_color {
                    println!("{}.", i + 1);
                } else {
                    println!("{}", format!("{}.", i + 1).bright_black());
                }
                for (name, value) in fields {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    if no_color {
                        println!("   {}: {}", name, value);
                    } else {
                        println!("   {} {}", format!("{}:", name).bright_black(), value.white());
                    }
                }
            },
            SearchRecord::Diagnostic(diagnostic) => {
                if no_color {
                    println!("[MESSAGE] {}", diagnostic.message);
                } else {
                    println!("{} {}", "⚠".yellow(), diagnostic.message.yellow());
                }
            },
        }
    }

    Ok(())
}

async fn run_indexes(config: SplunkConfig, format: OutputFormat, no_color: bool) -> SplunkResult<()> {
    let manager = ConnectionManager::new(config);
    let names = indexes::get_indexes(&manager).await?;

    if !matches!(format, OutputFormat::Pretty) {
        return print_json(&names, format);
    }

    if no_color {
        println!("\nIndexes ({}):", names.len());
        for name in &names {
            println!("  - {}", name);
        }
    } else {
        print_section(&format!("Indexes ({})", names.len()));
        for name in &names {
            println!("  {} {}", "→".bright_black(), name.green());
        }
    }

    Ok(())
}

fn run_info(config: &SplunkConfig, no_color: bool) {
    let target = format!("{}://{}:{}", config.scheme, config.host, config.port);
    let auth = match config.credentials() {
        Ok(splunk_mcp::Credentials::Token(_)) => "token".to_string(),
        Ok(splunk_mcp::Credentials::Basic { username, .. }) => format!("username ({})", username),
        Err(_) => "not configured".to_string(),
    };

    if no_color {
        println!("\nSplunk MCP Server Information");
        println!("{}", "=".repeat(50));
        println!("  Name: {}", SERVER_NAME);
        println!("  Version: {}", VERSION);
        println!("  Splunk: {}", target);
        println!("  Auth: {}", auth);
        println!();
        println!("Available Tools:");
        println!("  - run_splunk_query: Run a Splunk query and return the results");
        println!("  - get_indexes: List all accessible Splunk indexes");
        println!();
        println!("Supported Transports:");
        println!("  - stdio: Standard I/O for MCP clients");
        println!("  - sse: Server-Sent Events over HTTP");
    } else {
        print_section("Server Information");
        print_info("Name", SERVER_NAME);
        print_info("Version", VERSION);
        print_info("Splunk", &target);
        print_info("Auth", &auth);

        print_section("Available Tools");
        println!(
            "  {} {}",
            "run_splunk_query".green(),
            "- Run a Splunk query and return the results".bright_black()
        );
        println!(
            "  {} {}",
            "get_indexes".green(),
            "- List all accessible Splunk indexes".bright_black()
        );

        print_section("Supported Transports");
        println!(
            "  {} {}",
            "stdio".cyan(),
            "- Standard I/O for MCP clients".bright_black()
        );
        println!(
            "  {} {}",
            "sse".cyan(),
            "- Server-Sent Events over HTTP".bright_black()
        );
    }
}

fn report(ok: bool, label: &str, detail: Option<&str>, no_color: bool) {
    let message = match detail {
        Some(detail) => format!("{}: {}", label, detail),
        None => label.to_string(),
    };
    match (ok, no_color) {
        (true, true) => println!("  [OK] {}", message),
        (false, true) => println!("  [FAIL] {}", message),
        (true, false) => print_success(&message),
        (false, false) => print_error(&message),
    }
}

async fn run_check(config: SplunkConfig, no_color: bool) -> SplunkResult<()> {
    if no_color {
        println!("\nChecking Splunk MCP configuration...");
    } else {
        print_section("Configuration Check");
    }

    let mut all_ok = true;

    match config.credentials() {
        Ok(_) => report(true, "Credentials configured", None, no_color),
        Err(e) => {
            report(false, "Credentials", Some(&e.to_string()), no_color);
            all_ok = false;
        },
    }

    if all_ok {
        if no_color {
            println!("\nTesting connectivity...");
        } else {
            print_section("Connectivity Test");
        }

        let manager = ConnectionManager::new(config);
        match indexes::get_indexes(&manager).await {
            Ok(names) => report(
                true,
                "Splunk reachable",
                Some(&format!("{} indexes visible", names.len())),
                no_color,
            ),
            Err(e) => {
                report(false, "Splunk connection", Some(&e.to_string()), no_color);
                all_ok = false;
            },
        }
    }

    println!();

    if all_ok {
        if no_color {
            println!("All checks passed!");
        } else {
            println!("{}", "✓ All checks passed!".green().bold());
        }
    } else {
        if no_color {
            println!("Some checks failed. See above for details.");
        } else {
            println!(
                "{}",
                "✗ Some checks failed. See above for details.".red().bold()
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // For stdio transport, logs MUST go to stderr to avoid corrupting the JSON-RPC stream
    match &cli.command {
        Commands::Serve { transport, .. } => {
            let use_stderr = matches!(transport, TransportOption::Stdio);
            setup_logging(cli.verbose, use_stderr, cli.quiet, cli.log_json);
        },
        _ if cli.verbose && !cli.quiet => setup_logging(true, true, false, cli.log_json),
        _ => {},
    }

    let config = SplunkConfig::from(cli.splunk);

    let result = match cli.command {
        Commands::Serve {
            transport,
            port,
            host,
        } => run_serve(config, transport, port, host).await,

        Commands::Query {
            query,
            earliest,
            latest,
        } => {
            let args = RunQueryArgs::new(query).with_window(earliest, latest);
            run_query(config, args, cli.format, cli.no_color).await
        },

        Commands::Indexes => run_indexes(config, cli.format, cli.no_color).await,

        Commands::Info => {
            run_info(&config, cli.no_color);
            Ok(())
        },

        Commands::Check => run_check(config, cli.no_color).await,
    };

    if let Err(e) = result {
        if cli.no_color {
            eprintln!("Error: {}", e);
        } else {
            print_error(&e.to_string());
        }
        std::process::exit(1);
    }
}
