//! コマンドライン引数の定義

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{self, ConfigOverrides};

/// 1文字でない短縮オプションと対応する長いオプション
const MULTI_LETTER_SHORTS: &[(&str, &str)] = &[
    ("-cid", "--client-id"),
    ("-cs", "--client-secret"),
    ("-cf", "--config-file"),
    ("-ncf", "--new-config-file"),
];

/// `-cid` などの複数文字の短縮オプションを長い形式に書き換える
///
/// clapの短縮オプションは1文字のみのため、解析前に置き換える。
/// `--` 以降の引数はそのまま残す。
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut after_separator = false;
    args.into_iter()
        .map(|arg| {
            if after_separator {
                return arg;
            }
            if arg == "--" {
                after_separator = true;
                return arg;
            }
            MULTI_LETTER_SHORTS
                .iter()
                .find_map(|(short, long)| {
                    if arg == *short {
                        Some(long.to_string())
                    } else {
                        arg.strip_prefix(short)
                            .and_then(|rest| rest.strip_prefix('='))
                            .map(|value| format!("{}={}", long, value))
                    }
                })
                .unwrap_or(arg)
        })
        .collect()
}

/// Twitchチャンネルの配信状態を表示する
#[derive(Debug, Parser)]
#[command(name = "livestreams", version, about, long_about = None)]
pub struct Args {
    /// 終了せず15秒ごとに配信状態を更新し続ける
    #[arg(short = 'l', long = "loop")]
    pub loop_mode: bool,

    /// 設定ファイルを読み込む代わりに新しいテンプレートを生成する
    #[arg(long = "new-config-file", visible_alias = "ncf")]
    pub new_config_file: bool,

    /// 設定ファイルのパス（-ncf 指定時は生成先）
    #[arg(long = "config-file", visible_alias = "cf", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Twitch APIのクライアントID
    #[arg(long = "client-id", visible_alias = "cid", value_name = "ID")]
    pub client_id: Option<String>,

    /// Twitch APIのクライアントシークレット
    #[arg(long = "client-secret", visible_alias = "cs", value_name = "SECRET")]
    pub client_secret: Option<String>,

    /// 監視するチャンネル名（セミコロン区切り 例: streamer1;streamer2）
    #[arg(short = 's', long = "streamers", value_name = "LIST")]
    pub streamers: Option<String>,

    /// ログを詳細にする（-v: info, -vv: debug）
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH))
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            streamers: self.streamers.as_deref().map(config::parse_streamer_list),
            loop_mode: self.loop_mode,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }
}
