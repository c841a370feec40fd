use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use codelab_client::HttpClient;
use codelab_client::LabClient;
use codelab_client::Session;
use codelab_term::configuration::Config;
use codelab_term::configuration::ConfigKey;
use codelab_term::domain::services::ActionsService;
use codelab_term::domain::services::EventsService;
use codelab_term::AppStateProps;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "CodeLab",
    author,
    version = "0.1.0",
    about = "Terminal client for the CodeLab online judge"
)]
struct Cli {
    #[clap(long, default_value = "", help = "Lab API base URL")]
    api_base_url: String,

    #[clap(long, default_value = "", help = "Path to config.toml")]
    config_file: String,

    #[clap(long, default_value = "", help = "Directory for durable state")]
    state_dir: String,

    #[clap(long, default_value = "", help = "Submissions shown per page")]
    records_page_size: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The alternate screen owns stdout, so logs go to a file.
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("codelab.log")
        .context("Failed to create codelab.log file")?;
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    Config::load(&[
        (ConfigKey::ConfigFile, cli.config_file),
        (ConfigKey::ApiBaseUrl, cli.api_base_url),
        (ConfigKey::StateDir, cli.state_dir),
        (ConfigKey::RecordsPageSize, cli.records_page_size),
    ])
    .await?;

    std::panic::set_hook(Box::new(|panic_info| {
        codelab_term::destruct_terminal_for_panic();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let state_dir = PathBuf::from(Config::get(ConfigKey::StateDir));
    let session = Session::with_persist_file(state_dir.join("session.json")).await;

    let http = HttpClient::new(&Config::get(ConfigKey::ApiBaseUrl))?;
    let client = Arc::new(LabClient::new(http, session.clone()));

    // "Remember this device" means one silent refresh attempt before the
    // first render; a dead cookie just leaves the session signed out.
    if session.persist().await && !session.is_authenticated().await {
        if let Err(err) = client.refresh_token().await {
            log::debug!("silent session refresh failed: {err}");
        }
    }

    let records_page_size = Config::get(ConfigKey::RecordsPageSize)
        .parse::<u32>()
        .unwrap_or(12);

    let (action_tx, mut action_rx) = tokio::sync::mpsc::unbounded_channel();
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut background_futures = tokio::task::JoinSet::new();
    let actions_client = client.clone();
    background_futures
        .spawn(async move { ActionsService::start(actions_client, event_tx, &mut action_rx).await });

    let mut events = EventsService::new(event_rx);
    let ui_future = codelab_term::start_loop(
        AppStateProps {
            action_tx,
            session,
            records_page_size,
            state_dir,
        },
        &mut events,
    );

    let result = tokio::select!(
        res = background_futures.join_next() => res.context("actions service stopped")??,
        res = ui_future => res,
    );

    if result.is_err() {
        codelab_term::destruct_terminal_for_panic();
    }

    result
}
