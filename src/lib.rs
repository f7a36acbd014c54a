mod cli;
pub mod config;
pub mod render;
pub mod twitch;
pub mod util; // doctestのためpubにする

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use thiserror::Error;

use cli::Args;
use config::AppConfig;
use twitch::{ClientIdentity, PollMode, PollingLoop, StreamQueryClient, TokenCache};

/// 起動〜終了までのエラー
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Poll(#[from] twitch::PollError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub fn run() -> ExitCode {
    let args = Args::parse_from(cli::normalize_args(std::env::args()));
    init_logging(args.log_level());

    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Application error: {}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// ログ初期化（RUST_LOG が設定されていればそちらを優先）
fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn execute(args: Args) -> Result<(), AppError> {
    let config_path = args.config_path();

    if args.new_config_file {
        AppConfig::write_template(&config_path)?;
        println!(
            "Config file has been generated @ '{}', please fill it in.",
            config_path.display()
        );
        return Ok(());
    }

    let config = AppConfig::load_or_default(&config_path)?.merge(args.overrides());
    config.validate()?;

    // ネットワーク処理は常に1つずつなので単一スレッドで十分
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(poll(config))
}

async fn poll(config: AppConfig) -> Result<(), AppError> {
    let http = config::build_http_client()?;
    let tokens = TokenCache::new(
        http.clone(),
        ClientIdentity::new(config.client_id, config.client_secret),
    );
    let source = StreamQueryClient::new(http, tokens);

    let poller = PollingLoop::new(source, PollMode::from_loop_flag(config.loop_mode));
    let clear_screen = poller.mode() == PollMode::Continuous;

    poller
        .run(&config.streamers, |event| render::render_event(event, clear_screen))
        .await?;
    Ok(())
}
