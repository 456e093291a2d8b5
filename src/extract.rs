use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::links;
use crate::models::{CommentInfo, GameInfo, SCORE_UNAVAILABLE, UNKNOWN_DATE, UNKNOWN_USER};
use crate::scrape::ScrapeError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Keywords that mark an image source as game artwork in the last-resort scan.
const IMAGE_KEYWORDS: &[&str] = &["game", "cover", "poster"];

/// Comment text at or below this length is treated as a non-match.
const MIN_COMMENT_TEXT_LEN: usize = 10;

/// Cap applied when the whole container text stands in for the comment body.
const CONTAINER_TEXT_LIMIT: usize = 500;

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

// ── Selector chains ──────────────────────────────────────────────────────────
//
// Ordered fallback lists, tried front to back; the first usable hit wins.

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        "h1.game-title",
        "h1",
        ".game-header h1",
        ".title",
        r#"[data-testid="game-title"]"#,
    ])
});

static SCORE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        ".score",
        ".rating",
        ".game-score",
        r#"[class*="score"]"#,
        r#"[class*="rating"]"#,
    ])
});

static IMAGE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        ".game-image img",
        ".poster img",
        ".cover img",
        r#"img[alt*="game"]"#,
        r#"img[src*="game"]"#,
        ".game-header img",
    ])
});

static ALL_IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static COMMENT_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| parse_all(&[".comment", ".user-comment", r#"[class*="comment"]"#]));

static BLOCK_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, article, section").unwrap());

static AUTHOR_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        ".author",
        ".username",
        ".user-name",
        ".comment-author",
        r#"[class*="author"]"#,
        r#"[class*="user"]"#,
    ])
});

static DATE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        ".date",
        ".timestamp",
        ".comment-date",
        "time",
        "[datetime]",
        r#"[class*="date"]"#,
        r#"[class*="time"]"#,
    ])
});

static TEXT_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| parse_all(&[".comment-text", ".comment-body", ".text", ".content", "p"]));

// ── Game info extraction ─────────────────────────────────────────────────────

/// Pull title, score and cover image URL for the game a comment page belongs
/// to. The individual fields never fail (each has a sentinel or a derived
/// fallback); only an unusable page URL aborts, since relative image sources
/// cannot be resolved without a base.
pub fn extract_game_info(html: &str, source_url: &str) -> Result<GameInfo, ScrapeError> {
    let base = Url::parse(source_url)
        .map_err(|e| ScrapeError::GameInfo(format!("unusable page URL {source_url}: {e}")))?;
    let document = Html::parse_document(html);

    let title = extract_title(&document, source_url);
    let score = extract_score(&document);
    let image_url = extract_image_url(&document, &base);

    tracing::info!(%title, %score, has_image = !image_url.is_empty(), "extracted game info");

    Ok(GameInfo {
        title,
        score,
        image_url,
    })
}

fn extract_title(document: &Html, source_url: &str) -> String {
    for sel in TITLE_SELECTORS.iter() {
        if let Some(el) = document.select(sel).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return text;
            }
        }
    }
    title_from_slug(links::game_slug(source_url))
}

/// Derive a readable title from the URL's game slug: hyphens become spaces,
/// each word is capitalized.
fn title_from_slug(slug: &str) -> String {
    slug.replace('-', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn extract_score(document: &Html) -> String {
    for sel in SCORE_SELECTORS.iter() {
        if let Some(el) = document.select(sel).next() {
            if let Some(m) = DIGIT_RUN_RE.find(&element_text(el)) {
                return m.as_str().to_string();
            }
        }
    }
    SCORE_UNAVAILABLE.to_string()
}

fn extract_image_url(document: &Html, base: &Url) -> String {
    for sel in IMAGE_SELECTORS.iter() {
        if let Some(el) = document.select(sel).next() {
            if let Some(src) = image_source(el) {
                if let Ok(abs) = base.join(src) {
                    return abs.to_string();
                }
            }
        }
    }

    // Nothing in the likely cover containers; take the first image anywhere
    // on the page whose source mentions game artwork.
    for el in document.select(&ALL_IMAGES) {
        if let Some(src) = image_source(el) {
            let lower = src.to_lowercase();
            if IMAGE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                if let Ok(abs) = base.join(src) {
                    return abs.to_string();
                }
            }
        }
    }

    String::new()
}

/// `src` with a lazy-load `data-src` fallback; blank attributes don't count.
fn image_source<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    let v = el.value();
    v.attr("src")
        .filter(|s| !s.is_empty())
        .or_else(|| v.attr("data-src").filter(|s| !s.is_empty()))
}

// ── Comment fallback extraction ──────────────────────────────────────────────

/// Extract a comment record straight from the page, used when the review API
/// yields nothing. Always produces a record; fields that cannot be located
/// get sentinel values.
pub fn extract_comment_fallback(html: &str, comment_id: &str) -> CommentInfo {
    let document = Html::parse_document(html);

    let container = match find_comment_container(&document, comment_id) {
        Some(el) => el,
        None => {
            tracing::warn!(comment_id, "no comment element found, using placeholder record");
            return CommentInfo {
                author: UNKNOWN_USER.to_string(),
                date: UNKNOWN_DATE.to_string(),
                text: "Comment content not available".to_string(),
                comment_id: comment_id.to_string(),
            };
        }
    };

    let author = select_first_text(container, &AUTHOR_SELECTORS)
        .unwrap_or_else(|| UNKNOWN_USER.to_string());
    let date = extract_comment_date(container);
    let text = extract_comment_text(container);

    tracing::info!(
        %author,
        %date,
        text_len = text.chars().count(),
        "extracted comment via html fallback"
    );

    CommentInfo {
        author,
        date,
        text,
        comment_id: comment_id.to_string(),
    }
}

fn find_comment_container<'doc>(
    document: &'doc Html,
    comment_id: &str,
) -> Option<ElementRef<'doc>> {
    // Exact id / data-id lookups splice the id into the selector; ids with
    // characters the selector grammar rejects just skip that strategy.
    for attr in ["id", "data-id"] {
        let sel = Selector::parse(&format!(r#"[{attr}="{comment_id}"]"#)).ok();
        if let Some(sel) = sel {
            if let Some(el) = document.select(&sel).next() {
                return Some(el);
            }
        }
    }

    for sel in COMMENT_SELECTORS.iter() {
        if let Some(el) = document.select(sel).next() {
            return Some(el);
        }
    }

    // Last resort: any block element whose class mentions comments.
    document.select(&BLOCK_ELEMENTS).find(|el| {
        el.value()
            .attr("class")
            .map(|c| c.to_lowercase().contains("comment"))
            .unwrap_or(false)
    })
}

fn extract_comment_date(container: ElementRef<'_>) -> String {
    for sel in DATE_SELECTORS.iter() {
        if let Some(el) = container.select(sel).next() {
            // A machine-readable datetime attribute beats the display text.
            if let Some(dt) = el.value().attr("datetime") {
                return dt.to_string();
            }
            return element_text(el);
        }
    }
    UNKNOWN_DATE.to_string()
}

fn extract_comment_text(container: ElementRef<'_>) -> String {
    for sel in TEXT_SELECTORS.iter() {
        if let Some(el) = container.select(sel).next() {
            let text = element_text(el);
            if text.chars().count() > MIN_COMMENT_TEXT_LEN {
                return text;
            }
        }
    }

    let all_text = element_text(container);
    if all_text.chars().count() > MIN_COMMENT_TEXT_LEN {
        all_text.chars().take(CONTAINER_TEXT_LIMIT).collect()
    } else {
        "Comment text not available".to_string()
    }
}

// ── DOM utility helpers ──────────────────────────────────────────────────────

/// Collapse an element's text nodes into one whitespace-normalized string.
fn element_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select_first_text(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| scope.select(sel).next().map(element_text))
}
