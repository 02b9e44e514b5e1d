mod commands;
mod helpers;
mod output;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use tracing::info;
use warble_core::config::{self};

#[derive(Parser)]
#[command(name = "warble")]
#[command(about = "Warble task and voice-note client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Account and session management
    Auth {
        #[command(subcommand)]
        cmd: AuthCommands,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        cmd: TaskCommands,
    },
    /// Transcribe an audio file
    Transcribe {
        /// Audio file to upload
        file: PathBuf,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Log in and store the session
    Login {
        /// Username to log in as
        username: String,

        /// Password (prompted for if omitted)
        #[arg(long, short = 'p')]
        password: Option<String>,
    },
    /// Create a new account
    Register {
        /// Username for the new account
        username: String,

        /// Email address for the new account
        email: String,
    },
    /// Show session state and cached profile
    Status,
    /// Log out and clear stored credentials
    Logout,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Due date, ISO 8601
        #[arg(long)]
        due: Option<String>,

        /// Priority (low, medium, high)
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show one task in detail
    Show {
        /// Task id
        id: String,
    },
    /// Toggle a task between pending and completed
    Done {
        /// Task id
        id: String,
    },
    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Save current configuration to file
    Save {
        /// Path to save to
        #[arg(default_value = "warble.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing with file logging
    use tracing_appender::rolling;
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    // Create log directory in user's data directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warble")
        .join("logs");

    // Ensure log directory exists
    std::fs::create_dir_all(&log_dir).ok();

    // Create a rolling file appender that rotates daily
    let file_appender = rolling::daily(&log_dir, "warble.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Terminal logging is quiet unless --debug; stdout stays clean for
    // command output, so layers write to stderr
    let env_filter = if cli.debug {
        EnvFilter::new("warble_core=debug,warble_auth=debug,warble_cli=debug,info")
    } else {
        EnvFilter::new("warble_core=warn,warble_auth=warn,warble_cli=warn,warn")
    };

    let terminal_layer = if cli.debug {
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .pretty()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    };

    // The log file keeps debug detail regardless of terminal verbosity
    let file_env_filter =
        EnvFilter::new("warble_core=debug,warble_auth=debug,warble_cli=debug,info");

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(false) // Disable ANSI colors in file output
        .with_writer(non_blocking)
        .pretty();

    // Initialize the subscriber with both layers, each with their own filter
    tracing_subscriber::registry()
        .with(terminal_layer.with_filter(env_filter))
        .with(file_layer.with_filter(file_env_filter))
        .init();

    info!(
        "Logging initialized. Logs are being written to: {:?}",
        log_dir.join("warble.log")
    );

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        info!("Loading config from standard locations");
        config::load_config_from_standard_locations().await?
    };

    match &cli.command {
        Commands::Auth { cmd } => match cmd {
            AuthCommands::Login { username, password } => {
                commands::auth::login(username, password.clone(), &config).await?
            }
            AuthCommands::Register { username, email } => {
                commands::auth::register(username, email, &config).await?
            }
            AuthCommands::Status => commands::auth::status(&config).await?,
            AuthCommands::Logout => commands::auth::logout(&config).await?,
        },
        Commands::Task { cmd } => match cmd {
            TaskCommands::List { all } => commands::task::list(*all, &config).await?,
            TaskCommands::Add {
                title,
                description,
                due,
                priority,
            } => {
                commands::task::add(
                    title,
                    description.clone(),
                    due.clone(),
                    priority.clone(),
                    &config,
                )
                .await?
            }
            TaskCommands::Show { id } => commands::task::show(id, &config).await?,
            TaskCommands::Done { id } => commands::task::done(id, &config).await?,
            TaskCommands::Rm { id } => commands::task::rm(id, &config).await?,
        },
        Commands::Transcribe { file } => commands::transcribe::run(file, &config).await?,
        Commands::Config { cmd } => {
            let output = crate::output::Output::new();
            match cmd {
                ConfigCommands::Show => commands::config::show(&config, &output).await?,
                ConfigCommands::Save { path } => {
                    commands::config::save(&config, path, &output).await?
                }
            }
        }
    }

    Ok(())
}
