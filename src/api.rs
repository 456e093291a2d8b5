use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde_json::Value;

use crate::models::{CommentInfo, UNKNOWN_DATE};

// ── Review API client ────────────────────────────────────────────────────────

/// Look a comment up on the review API by its sharing id. Returns `None` on
/// any network, status or shape problem; the caller treats that as "try the
/// HTML fallback", never as fatal.
pub async fn fetch_comment(
    client: &Client,
    api_url: &str,
    comment_id: &str,
    game_slug: &str,
) -> Option<CommentInfo> {
    tracing::info!(api_url, comment_id, game_slug, "querying review api");

    let response = match client
        .get(api_url)
        .query(&[
            ("sharing_id", comment_id),
            ("game_slug", game_slug),
            ("page", "1"),
            ("per_page", "1"),
        ])
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "review api request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::error!(status = %response.status(), "review api returned an error status");
        return None;
    }

    let body: Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "review api returned malformed json");
            return None;
        }
    };

    let review = match select_review(&body) {
        Some(r) => r,
        None => {
            tracing::warn!("no usable review in api response");
            return None;
        }
    };

    let comment = comment_from_review(review, comment_id);
    tracing::info!(
        author = %comment.author,
        date = %comment.date,
        text_len = comment.text.chars().count(),
        "extracted comment from api"
    );
    Some(comment)
}

// ── Response mapping ─────────────────────────────────────────────────────────

/// The API wraps results in `user_reviews`, sometimes as a list and sometimes
/// as a single object. Anything else counts as "no data".
fn select_review(body: &Value) -> Option<&Value> {
    let reviews = body.get("user_reviews")?;
    match reviews {
        Value::Array(items) => items.first(),
        Value::Object(map) if !map.is_empty() => Some(reviews),
        _ => None,
    }
}

fn comment_from_review(review: &Value, comment_id: &str) -> CommentInfo {
    // The author passes through in whatever shape the API uses; nested user
    // objects keep their JSON text rather than being guessed at or defaulted.
    let author = review
        .get("user")
        .map(json_to_text)
        .unwrap_or_else(|| "{}".to_string());

    let text = match review.get("text") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            "Review text not available".to_string()
        }
        Some(other) => other.to_string(),
    };

    let raw_date = ["created_at", "updated_at"]
        .iter()
        .find_map(|key| match review.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    CommentInfo {
        author,
        date: normalize_date(&raw_date),
        text,
        comment_id: comment_id.to_string(),
    }
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reviews carry ISO-8601 timestamps but display wants `DD.MM.YYYY`.
/// Anything that fails to parse is shown verbatim.
fn normalize_date(raw: &str) -> String {
    if raw == UNKNOWN_DATE || !raw.contains('T') {
        return raw.to_string();
    }

    let candidate = raw.replace('Z', "+00:00");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&candidate) {
        return dt.format("%d.%m.%Y").to_string();
    }
    // Timestamps without an offset also occur.
    if let Ok(dt) = NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%d.%m.%Y").to_string();
    }

    tracing::debug!(raw, "unparseable review date kept verbatim");
    raw.to_string()
}
