use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::WtgResult;

// ── Constants ────────────────────────────────────────────────────────────────

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Characters Telegram MarkdownV2 requires escaped. Backslash is handled
/// separately, before any of these.
const MARKDOWN_SPECIALS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Output markup styles supported by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    MarkdownV2,
    #[default]
    Html,
}

// ── Sanitizers ───────────────────────────────────────────────────────────────

/// Escape text for Telegram MarkdownV2: collapse whitespace runs, then
/// backslash-escape every special character (backslash itself first).
pub fn sanitize_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = WHITESPACE_RE.replace_all(text.trim(), " ");
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || MARKDOWN_SPECIALS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escape text for HTML output: collapse whitespace runs, then escape the
/// ampersand before the angle brackets.
pub fn sanitize_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    WHITESPACE_RE
        .replace_all(text.trim(), " ")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ── Message formatting ───────────────────────────────────────────────────────

/// Render an extraction result as a chat-ready message in the given dialect.
/// Pure function: repeated calls on the same input yield identical output.
pub fn format_message(result: &WtgResult, dialect: Dialect) -> String {
    match dialect {
        Dialect::MarkdownV2 => format_markdown(result),
        Dialect::Html => format_html(result),
    }
}

fn format_markdown(result: &WtgResult) -> String {
    let title = sanitize_markdown(&result.game.title);
    let score = sanitize_markdown(&result.game.score);
    let author = sanitize_markdown(&result.comment.author);
    let date = sanitize_markdown(&result.comment.date);
    let text = truncate_chars(&sanitize_markdown(&result.comment.text), 300, r"\.\.\.");

    format!(
        "🎮 *{title}*\n⭐ Score: {score}/100\n👤 Comment by: {author} \\- {date}\n\n💬 {text}\n\n🔗 [View original post]({url})",
        url = result.original_url,
    )
}

fn format_html(result: &WtgResult) -> String {
    let title = sanitize_html(&result.game.title);
    let score = sanitize_html(&result.game.score);
    let author = sanitize_html(&result.comment.author);
    let date = sanitize_html(&result.comment.date);
    // The HTML dialect tolerates longer comments before cutting; both
    // dialects cut to the same 297-char prefix.
    let text = truncate_chars(&sanitize_html(&result.comment.text), 1000, "...");

    format!(
        "🎮 <b>{title}</b>\n⭐ Score: {score}/100\n👤 Comment by: {author} - {date}\n\n💬 {text}\n\n🔗 <a href=\"{url}\">View original post</a>",
        url = result.original_url,
    )
}

/// Cut to a 297-char prefix plus `ellipsis` when `text` exceeds `limit`
/// chars. Counts chars, not bytes; comment text is frequently Cyrillic.
fn truncate_chars(text: &str, limit: usize, ellipsis: &str) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(297).collect();
        cut.push_str(ellipsis);
        cut
    } else {
        text.to_string()
    }
}
