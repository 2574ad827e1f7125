//! K-STAT query CLI
//!
//! Live queries need a running chromedriver (`[browser] webdriver_url`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use kstat::{
    browser::{BrowserFactory, FixtureFactory, FixtureSite, WebDriverFactory},
    error::Result,
    models::{Config, Period, Query},
    pipeline,
    storage::LocalStorage,
    utils::log as console,
};

/// kstat - monthly export figures from the K-STAT trade portal
#[derive(Parser, Debug)]
#[command(
    name = "kstat",
    version,
    about = "Current and previous month export values for an HSK code"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "kstat.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for spreadsheets, reports and screenshots
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the live portal
    Query {
        /// HSK codes (default: site.default_code)
        codes: Vec<String>,
    },

    /// Run the same pipeline against a saved fixture site
    Replay {
        /// Directory containing site.toml
        #[arg(long)]
        site: PathBuf,

        /// Query as of this day, YYYY-MM-DD (default: the site's saved_on, then today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// HSK codes (default: site.default_code)
        codes: Vec<String>,
    },

    /// Scan a saved result page without a browser
    Extract {
        #[arg(long)]
        html: PathBuf,

        /// Current period as YYYY-MM (default: this month)
        #[arg(long)]
        period: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
    console::init(level);
}

/// Run every code in its own session, print and persist each outcome.
async fn run_queries(
    config: &Config,
    factory: &dyn BrowserFactory,
    codes: Vec<String>,
    today: NaiveDate,
) -> Result<ExitCode> {
    let codes = if codes.is_empty() {
        vec![config.site.default_code.clone()]
    } else {
        codes
    };
    let queries: Vec<Query> = codes
        .into_iter()
        .map(|code| Query::new(code, today))
        .collect();

    let storage = LocalStorage::with_layout(
        &config.output.dir,
        &config.output.sheet_name,
        config.output.headers.clone(),
    );

    let outcomes = pipeline::run_batch(config, factory, &queries).await;
    let mut failed = 0;
    for outcome in &outcomes {
        pipeline::print_outcome(&config.output, outcome);
        pipeline::export_outcome(&config.output, &storage, outcome).await?;
        if outcome.failure().is_some() {
            failed += 1;
        }
    }

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("{} of {} queries failed", failed, outcomes.len());
        Ok(ExitCode::FAILURE)
    }
}

/// Load the configuration and apply command-line overrides.
fn load_config(path: &Path, output: Option<&Path>, headed: bool) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    if let Some(dir) = output {
        config.output.dir = dir.display().to_string();
    }
    if headed {
        config.browser.headless = false;
    }
    config.validate()?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // One clock reading for the whole run
    let today = Local::now().date_naive();

    match cli.command {
        Command::Query { codes } => {
            let config = load_config(&cli.config, cli.output.as_deref(), cli.headed)?;
            let factory = WebDriverFactory::new(config.browser.clone())?;
            run_queries(&config, &factory, codes, today).await
        }

        Command::Replay { site, date, codes } => {
            let config = load_config(&cli.config, cli.output.as_deref(), cli.headed)?;
            let fixture = FixtureSite::load(&site)?;
            let as_of = date.or(fixture.saved_on).unwrap_or(today);
            log::info!("Replaying fixture site {} as of {}", site.display(), as_of);
            let factory = FixtureFactory::new(fixture);
            run_queries(&config, &factory, codes, as_of).await
        }

        Command::Extract { html, period } => {
            let config = load_config(&cli.config, cli.output.as_deref(), cli.headed)?;
            let period = match period {
                Some(text) => text.parse::<Period>()?,
                None => Period::from_date(today),
            };
            let rows = pipeline::run_extract(&config, &html, period)?;

            let headers: Vec<&str> = config.output.headers.iter().map(String::as_str).collect();
            console::table(&headers, &pipeline::table_rows(&rows));
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate => Ok(match pipeline::run_validate(&cli.config) {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        }),
    }
}
