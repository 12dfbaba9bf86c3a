use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mines_core::{Analyzer, CellCount, Coord, CredentialPicker, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod fixture;
mod gemini;
mod keys;
mod render;
mod wire;

use app::App;
use config::Config;
use fixture::FixtureAnalyzer;
use gemini::GeminiAnalyzer;
use keys::{FileKeyPicker, KeyStore};

#[derive(Parser, Debug)]
#[command(version, about = "Mines with AI-assisted safe-cell predictions", long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// TOML file with `[game]` and `[analyzer]` tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid size, clamped to 2..=26
    #[arg(long)]
    size: Option<Coord>,

    /// Mine count, clamped to leave at least one safe cell
    #[arg(long)]
    mines: Option<CellCount>,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    /// Model name used for analysis
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the analysis API
    #[arg(long)]
    endpoint: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    api_key_env: Option<String>,

    /// Key file re-read by the `key` command
    #[arg(long)]
    api_key_file: Option<PathBuf>,

    /// Serve this canned analysis response instead of calling the API
    #[arg(long)]
    fixture: Option<PathBuf>,
}

impl Args {
    /// File values first, then command-line flags on top.
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(size) = self.size {
            config.game.grid_size = size;
        }
        if let Some(mines) = self.mines {
            config.game.num_mines = mines;
        }
        if self.seed.is_some() {
            config.game.seed = self.seed;
        }
        if let Some(model) = &self.model {
            config.analyzer.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.analyzer.endpoint = endpoint.clone();
        }
        if let Some(var) = &self.api_key_env {
            config.analyzer.api_key_env = var.clone();
        }
        if self.api_key_file.is_some() {
            config.analyzer.api_key_file = self.api_key_file.clone();
        }
        if self.fixture.is_some() {
            config.analyzer.fixture = self.fixture.clone();
        }
        Ok(config)
    }
}

fn init_logging(verbose: &clap_verbosity_flag::Verbosity) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbose.log_level_filter().as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

fn build_session(config: Config) -> anyhow::Result<(Session, String)> {
    let options = config.analyzer;

    let key_store = KeyStore::from_env(&options.api_key_env);
    if !key_store.is_set() {
        if let Some(path) = &options.api_key_file {
            match keys::read_key_file(path) {
                Ok(key) => key_store.set(key),
                Err(err) => log::warn!("Could not read {}: {}", path.display(), err),
            }
        }
    }

    let (analyzer, label) = match &options.fixture {
        Some(path) => (
            Box::new(FixtureAnalyzer::load(path)?) as Box<dyn Analyzer>,
            format!("fixture {}", path.display()),
        ),
        None => {
            let analyzer = GeminiAnalyzer::new(&options.endpoint, &options.model, key_store.clone())
                .context("building HTTP client")?;
            let label = format!("{} (key from ${})", analyzer.model(), options.api_key_env);
            (Box::new(analyzer) as Box<dyn Analyzer>, label)
        }
    };

    let credential_picker = options.api_key_file.map(|path| {
        Box::new(FileKeyPicker::new(path, key_store.clone())) as Box<dyn CredentialPicker>
    });
    if credential_picker.is_none() {
        log::debug!("no key file given, API key selection is disabled");
    }

    let session = Session::new(SessionConfig {
        settings: config.game,
        analyzer,
        credential_picker,
    });
    Ok((session, label))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.verbose)?;

    let config = args.resolve_config()?;
    log::debug!("config: {:?}", config);

    let (session, label) = build_session(config)?;
    println!("{}\n", app::HELP);
    App::new(session, std::io::stdout(), label).run().await
}
