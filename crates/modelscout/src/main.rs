use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use modelscout::client::HttpScanClient;
use modelscout::controller::SearchController;
use modelscout::logging;
use modelscout::results::render_text;
use modelscout::settings::Settings;
use modelscout::ui::App;

#[derive(Parser)]
#[command(name = "modelscout")]
#[command(about = "Find and browse model files through a scan service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Scan service base URL (overrides the settings file)
    #[arg(short, long)]
    server: Option<String>,

    /// Path to settings file
    #[arg(short = 'c', long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive TUI
    Browse {
        /// Base path to pre-fill
        path: Option<String>,
    },
    /// Scan a directory and print model files grouped by folder
    Scan {
        /// Directory to scan, as seen by the service
        path: String,
        /// Only show files whose name contains this text
        #[arg(short = 'q', long, default_value = "")]
        search: String,
    },
    /// Clear the service's scan cache
    ClearCache {
        /// Only invalidate the cache for this path
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Show service health and cache statistics
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = if let Some(config) = &cli.config {
        PathBuf::from(shellexpand::tilde(config).to_string())
    } else {
        Settings::default_path()
    };
    let settings = Settings::load(&settings_path).context("Failed to load settings")?;

    let base_url = cli
        .server
        .clone()
        .unwrap_or_else(|| settings.service.base_url.clone());
    let client = HttpScanClient::new(&base_url, settings.service.request_timeout())
        .context("Failed to build HTTP client")?;

    match cli.command {
        None => browse(client, &settings, base_url, None).await?,
        Some(Commands::Browse { path }) => browse(client, &settings, base_url, path).await?,
        Some(Commands::Scan { path, search }) => {
            logging::init_stderr();

            let mut controller = SearchController::new(client, settings.timings());
            controller.set_base_path(path);
            controller.set_search_input(search, Instant::now());
            controller.handle_search().await;

            if let Some(message) = controller.error_message(Instant::now()) {
                bail!("{}", message);
            }
            if let Some(stats) = controller.stats_line() {
                println!("{}", stats);
            }
            for line in render_text(controller.results()) {
                println!("{}", line);
            }
        }
        Some(Commands::ClearCache { path }) => {
            logging::init_stderr();

            let mut controller = SearchController::new(client, settings.timings());
            controller.clear_cache(path.as_deref()).await;

            let now = Instant::now();
            if let Some(message) = controller.error_message(now) {
                bail!("{}", message);
            }
            if let Some(message) = controller.success_message(now) {
                println!("{}", message);
            }
        }
        Some(Commands::Health) => {
            logging::init_stderr();

            let health = client
                .health()
                .await
                .with_context(|| format!("Health check against {} failed", base_url))?;
            println!("Server: {}", client.base_url());
            println!("Status: {}", health.status);
            println!("Cached paths: {}", health.cache_size);
            println!("Cache TTL: {} minutes", health.cache_ttl_minutes);
        }
    }

    Ok(())
}

async fn browse(
    client: HttpScanClient,
    settings: &Settings,
    base_url: String,
    path: Option<String>,
) -> Result<()> {
    logging::init_file(&Settings::config_dir().join("modelscout.log"))?;

    let mut controller = SearchController::new(client, settings.timings());
    if let Some(path) = path.or_else(|| settings.ui.default_base_path.clone()) {
        controller.set_base_path(path);
    }

    let mut app = App::new(controller, base_url);
    app.run().await
}
