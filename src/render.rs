// =============================================================================
// ターミナル表示モジュール
// =============================================================================
// ポーリング結果を1チャンネル1行で表示する
// 配信中は緑、オフラインは赤（区切り線はオフライン側を黄色）
// =============================================================================

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::twitch::{ChannelStatus, PollResult, PollingEvent};

/// 区切り線の幅
const RULE_WIDTH: usize = 120;

/// 画面クリア（ANSI: 画面消去 + カーソルを左上へ）
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// チャンネル名の列幅（最長の名前 + 3）
pub fn name_column_width(result: &PollResult) -> usize {
    result
        .entries()
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0)
        + 3
}

/// 配信開始からの経過時間（例: "1h 05m"）
///
/// タイムスタンプが解釈できない場合はNone
pub fn format_uptime(started_at: &str, now: DateTime<Utc>) -> Option<String> {
    let started = DateTime::parse_from_rfc3339(started_at).ok()?;
    let minutes = (now - started.with_timezone(&Utc)).num_minutes().max(0);
    Some(format!("{}h {:02}m", minutes / 60, minutes % 60))
}

/// 1チャンネル分の行（名前 + 余白 + " | "）
pub fn format_row(status: &ChannelStatus, width: usize, now: DateTime<Utc>) -> String {
    let padding = " ".repeat(width.saturating_sub(status.name.chars().count()));

    match &status.stream {
        Some(stream) => {
            let uptime = format_uptime(&stream.started_at, now)
                .map(|u| format!(" ({})", u))
                .unwrap_or_default();
            format!(
                "{}{}  {} {}{}{}{}{}{}{}",
                status.name.green(),
                padding,
                "|".green(),
                "Online".green(),
                " for ".white(),
                stream.viewer_count.to_string().cyan(),
                " > ".white(),
                stream.title,
                " since ".white(),
                format!("{}{}", stream.started_at, uptime).cyan(),
            )
        }
        None => format!(
            "{}{}  {} {}",
            status.name.red(),
            padding,
            "|".yellow(),
            "Offline".red()
        ),
    }
}

fn rule(live: bool) -> String {
    let line = "=".repeat(RULE_WIDTH);
    if live {
        line.green().to_string()
    } else {
        line.yellow().to_string()
    }
}

/// ポーリング結果全体を表形式の文字列にする
pub fn format_poll_result(result: &PollResult, now: DateTime<Utc>) -> String {
    let width = name_column_width(result);
    let mut out = String::new();

    for status in result.entries() {
        out.push_str(&rule(status.is_live()));
        out.push('\n');
        out.push_str(&format_row(status, width, now));
        out.push('\n');
    }

    out.push_str(&rule(false));
    out.push('\n');
    out
}

/// ポーリング結果を標準出力に表示
pub fn render_poll_result(result: &PollResult, clear_screen: bool) {
    if clear_screen {
        print!("{}", CLEAR_SCREEN);
    }
    print!("{}", format_poll_result(result, Utc::now()));
}

/// イベント表示（エラーは表示して続行）
///
/// 画面クリアは永続モードでのみ行う
pub fn render_event(event: PollingEvent, clear_screen: bool) {
    match event {
        PollingEvent::Result { result } => render_poll_result(&result, clear_screen),
        PollingEvent::Error { message, .. } => {
            eprintln!("{} {}", "Caught and ignoring error:".yellow(), message);
        }
    }
}
