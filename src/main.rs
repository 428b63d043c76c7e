use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod chart;
mod client;
mod config;
mod handler;
mod transcript;
mod tui;
mod ui;

use app::App;
use chart::{ChartRenderer, RedrawPolicy, Surface};
use client::BackendKind;
use config::{Config, Locale, Overrides, Settings, API_URL_ENV};

#[derive(Parser)]
#[command(name = "spendchat")]
#[command(version, about = "Terminal chat with a weekly spending chart")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the chat service (POST {base}/api/chat)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where replies come from
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Language of the error message shown when a reply fails
    #[arg(long, value_enum, global = true)]
    locale: Option<Locale>,

    /// What triggers a chart redraw
    #[arg(long, value_enum, global = true)]
    redraw: Option<RedrawPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the chart once as SVG
    Chart {
        /// Output file (stdout if omitted)
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Show the resolved settings
    Config {
        /// Save the config file merged with the flags given here
        /// (SPENDCHAT_API_URL is not saved)
        #[arg(long)]
        write: bool,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            backend: self.backend,
            locale: self.locale,
            redraw: self.redraw,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Chart { svg }) => {
            init_stderr_logging();
            export_chart(svg.as_ref())
        }
        Some(Commands::Config { write }) => {
            init_stderr_logging();
            let settings = load_settings(&cli);
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if *write {
                let path = Config::load()?.with_overrides(cli.overrides()).save()?;
                println!("Saved to {}", path.display());
            }
            Ok(())
        }
        None => {
            init_file_logging();
            let settings = load_settings(&cli);
            run_tui(settings).await
        }
    }
}

fn load_settings(cli: &Cli) -> Settings {
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("ignoring config file: {}", e);
        Config::new()
    });
    let settings = config.resolve(cli.overrides(), std::env::var(API_URL_ENV).ok());
    tracing::info!(
        base_url = %settings.base_url,
        backend = settings.backend.as_str(),
        "settings loaded"
    );
    settings
}

fn env_filter() -> EnvFilter {
    EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "spendchat=info".into()))
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Open the log file for appending, creating its directory
fn log_writer(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))
}

/// The TUI draws on stderr, so logs go to a file instead. Without a usable
/// log file the app still runs, just without logs.
fn init_file_logging() {
    let file = match config::log_path().and_then(|path| log_writer(&path)) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("spendchat: logging disabled: {:#}", e);
            return;
        }
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();

    tracing::info!("spendchat v{} starting", env!("CARGO_PKG_VERSION"));
}

fn export_chart(path: Option<&PathBuf>) -> Result<()> {
    let mut surface = Surface::default();
    ChartRenderer::default().draw(&mut surface);
    let svg = surface.to_svg();

    match path {
        Some(path) => {
            fs::write(path, svg)
                .with_context(|| format!("Could not write {}", path.display()))?;
            tracing::info!("chart written to {}", path.display());
        }
        None => print!("{}", svg),
    }
    Ok(())
}

async fn run_tui(settings: Settings) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let sender = events.sender();
    let mut app = App::new(&settings);

    let result = async {
        while !app.should_quit {
            app.sync_chart();
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event, &sender),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!(
        messages = app.transcript.messages().len(),
        chart_redraws = app.chart.redraw_count(),
        "spendchat exiting"
    );
    result
}
