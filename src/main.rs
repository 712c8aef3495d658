use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use wsbtrack::core::listing::ListingOrder;
use wsbtrack::core::log::init_logging;
use wsbtrack::core::provider::Interval;
use wsbtrack::{AppCommand, DateWindow};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct WindowArgs {
    /// First date to include (YYYY-MM-DD), defaults to the configured window
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl From<WindowArgs> for DateWindow {
    fn from(args: WindowArgs) -> Self {
        DateWindow {
            start: args.start,
            end: args.end,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display share price history
    Prices {
        /// Ticker symbol, defaults to the first configured symbol
        #[arg(short, long)]
        symbol: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Bar size: 1m, 5m, 1h, 1d, 1wk, 1mo, ...
        #[arg(short, long, default_value = "1d")]
        interval: Interval,
        /// Add a column with the change of this column against the first row
        #[arg(short, long)]
        normalise_column: Option<String>,
        /// Skip normalisation even when a column is given
        #[arg(long)]
        no_normalise: bool,
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Display short interest volumes
    ShortInterest {
        /// Ticker symbol, defaults to the first configured symbol
        #[arg(short, long)]
        symbol: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Add a column with the change of this column against the first row
        #[arg(short, long)]
        normalise_column: Option<String>,
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stack several datasets into one table, tagged by ticker
    Multi {
        /// Dataset codes, e.g. FINRA/FNYX_GME
        #[arg(required = true)]
        codes: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Display ticker metadata
    Info {
        /// Ticker symbol, defaults to the first configured symbol
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// List forum posts: hot, rising or new
    Posts {
        order: ListingOrder,
        /// Forum to read, defaults to the configured forum
        #[arg(short, long)]
        forum: Option<String>,
        /// Maximum number of posts
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print an HTML table with clickable links
        #[arg(long)]
        html: bool,
    },
    /// Display prices, short interest and hot posts together
    Dashboard {
        /// Ticker symbol, defaults to the first configured symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Days back from today, defaults to the configured window
        #[arg(short, long)]
        days: Option<i64>,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Prices {
                symbol,
                window,
                interval,
                normalise_column,
                no_normalise,
                json,
            } => AppCommand::Prices {
                symbol,
                window: window.into(),
                interval,
                normalise: !no_normalise,
                normalise_column,
                json,
            },
            Commands::ShortInterest {
                symbol,
                window,
                normalise_column,
                json,
            } => AppCommand::ShortInterest {
                symbol,
                window: window.into(),
                normalise_column,
                json,
            },
            Commands::Multi {
                codes,
                window,
                json,
            } => AppCommand::Multi {
                codes,
                window: window.into(),
                json,
            },
            Commands::Info { symbol } => AppCommand::Info { symbol },
            Commands::Posts {
                order,
                forum,
                limit,
                html,
            } => AppCommand::Posts {
                order,
                forum,
                limit,
                html,
            },
            Commands::Dashboard { symbol, days } => AppCommand::Dashboard { symbol, days },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(cli.config_path.as_deref()),
        Some(cmd) => wsbtrack::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup(config_path: Option<&str>) -> anyhow::Result<()> {
    use anyhow::Context;

    let path = match config_path {
        Some(path) => std::path::PathBuf::from(path),
        None => wsbtrack::config::AppConfig::default_config_path()?,
    };

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
# Reddit account the API client is registered to
account: "your-reddit-username"

symbols: ["AMC", "GME", "BB"]
forum: "wallstreetbets"
window_days: 365
post_limit: 20

providers:
  nasdaq:
    base_url: "https://data.nasdaq.com"
  yahoo:
    base_url: "https://query1.finance.yahoo.com"
  reddit:
    auth_url: "https://www.reddit.com"
    api_url: "https://oauth.reddit.com"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    println!(
        "Created {}. Set REDDIT_CLIENT, REDDIT_SECRET and QUANDL_KEY in the environment or a .env file.",
        path.display()
    );
    Ok(())
}
