use once_cell::sync::Lazy;
use regex::Regex;

// ── Lazy static regexes ──────────────────────────────────────────────────────

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https://wtg\.com\.ua/game/[^/]+/comment/[a-f0-9\-]+").unwrap());

static VALID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https://wtg\.com\.ua/game/[^/]+/comment/[a-f0-9\-]+$").unwrap());

// ── Public API ───────────────────────────────────────────────────────────────

/// Collect wtg.com.ua comment links from free text, in encounter order.
/// Duplicates are kept as-is; unrelated URLs are ignored.
pub fn extract_links(text: &str) -> Vec<String> {
    let links: Vec<String> = LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    tracing::debug!(count = links.len(), "found wtg links in message");
    links
}

/// True only when the whole string is a comment URL. Trailing path segments
/// or a query string disqualify it.
pub fn is_valid(url: &str) -> bool {
    VALID_RE.is_match(url)
}

// ── URL segment splitters ────────────────────────────────────────────────────
//
// The orchestrator splits on the fixed markers without re-validating; these
// helpers mirror that contract and are shared with the title fallback.

/// Everything after the last `/comment/` marker.
pub fn comment_id(url: &str) -> &str {
    url.split("/comment/").last().unwrap_or("")
}

/// The segment between `/game/` and `/comment/`.
pub fn game_slug(url: &str) -> &str {
    url.split("/game/")
        .last()
        .unwrap_or("")
        .split("/comment/")
        .next()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_A: &str =
        "https://wtg.com.ua/game/lost-in-random-the-eternal-die/comment/06672ce6-96ce-471c-aea2-6ec3cd30cde8";
    const LINK_B: &str =
        "https://wtg.com.ua/game/test-game-name/comment/12345678-1234-5678-9abc-123456789abc";

    #[test]
    fn extracts_links_in_order() {
        let text = format!(
            "Check out this review: {LINK_A}\nAnd this one: {LINK_B}\nNot ours: https://example.com/game/x/comment/ab"
        );
        let links = extract_links(&text);
        assert_eq!(links, vec![LINK_A.to_string(), LINK_B.to_string()]);
    }

    #[test]
    fn extracted_links_are_always_valid() {
        let text = format!("{LINK_A} plus noise and {LINK_B}?utm=1 trailing");
        for link in extract_links(&text) {
            assert!(is_valid(&link), "extracted link failed validation: {link}");
        }
    }

    #[test]
    fn keeps_duplicates() {
        let text = format!("{LINK_A} again {LINK_A}");
        assert_eq!(extract_links(&text).len(), 2);
    }

    #[test]
    fn no_links_yields_empty_vec() {
        assert!(extract_links("no urls here, just text").is_empty());
    }

    #[test]
    fn validates_exact_comment_urls() {
        assert!(is_valid("https://wtg.com.ua/game/x/comment/abc-123"));
        // Case-insensitive on the pattern, matching the extraction regex.
        assert!(is_valid("HTTPS://WTG.COM.UA/game/x/comment/abc-123"));
    }

    #[test]
    fn rejects_trailing_query_or_path() {
        assert!(!is_valid("https://wtg.com.ua/game/x/comment/abc-123?x=1"));
        assert!(!is_valid("https://wtg.com.ua/game/x/comment/abc-123/reply"));
        assert!(!is_valid("https://wtg.com.ua/game/x/comment/"));
        assert!(!is_valid("https://example.com/game/x/comment/abc-123"));
    }

    #[test]
    fn splits_url_segments() {
        assert_eq!(comment_id(LINK_A), "06672ce6-96ce-471c-aea2-6ec3cd30cde8");
        assert_eq!(game_slug(LINK_A), "lost-in-random-the-eternal-die");
    }
}
