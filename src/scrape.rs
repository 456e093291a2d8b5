use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE};
use reqwest::Client;

use crate::api;
use crate::extract;
use crate::links;
use crate::models::WtgResult;

// ── Constants ────────────────────────────────────────────────────────────────

/// Browser-like identity; the site serves a different (leaner) page to
/// obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_API_URL: &str = "https://wtg.com.ua/api/backlog/user_review/user";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{0}")]
    Request(String),
    #[error("upstream returned an error status")]
    Upstream,
    #[error("game info extraction failed: {0}")]
    GameInfo(String),
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Tunables for one scraper instance. Defaults match production use; tests
/// zero the delay and point the URLs at a local server.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub api_url: String,
    /// Bounds in seconds for the random pause before each page fetch. This is
    /// a per-request courtesy delay, not a rate limiter across requests.
    pub delay_range: (f64, f64),
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            delay_range: (1.0, 3.0),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

// ── Scraper ──────────────────────────────────────────────────────────────────

/// Sequences one comment URL through the whole pipeline: URL split, page
/// fetch, game info extraction, API comment lookup with HTML fallback.
/// Owns the pooled HTTP client; safe to share across concurrent requests.
pub struct WtgScraper {
    client: Client,
    config: ScraperConfig,
}

impl WtgScraper {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_config(ScraperConfig::default())
    }

    pub fn with_config(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScrapeError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Full pipeline for one comment URL. Every failure along the way is
    /// logged and collapses to `None`; callers only ever see result-or-absence.
    pub async fn scrape_game_page(&self, url: &str) -> Option<WtgResult> {
        tracing::info!(url, "scraping wtg page");

        let comment_id = links::comment_id(url);
        let game_slug = links::game_slug(url);
        tracing::info!(comment_id, game_slug, "parsed url segments");

        self.politeness_delay().await;

        let html = match self.fetch_page(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(url, error = %e, "network error while scraping");
                return None;
            }
        };

        let game = match extract::extract_game_info(&html, url) {
            Ok(info) => info,
            Err(e) => {
                tracing::error!(url, error = %e, "failed to extract game information");
                return None;
            }
        };

        let comment =
            match api::fetch_comment(&self.client, &self.config.api_url, comment_id, game_slug)
                .await
            {
                Some(c) => c,
                None => {
                    tracing::warn!(comment_id, "api comment lookup failed, using html fallback");
                    extract::extract_comment_fallback(&html, comment_id)
                }
            };

        Some(WtgResult {
            game,
            comment,
            original_url: url.to_string(),
        })
    }

    /// Fetch the cover image bytes. Anything that is not an `image/*`
    /// response is discarded.
    pub async fn download_image(&self, image_url: &str) -> Option<Vec<u8>> {
        if image_url.is_empty() {
            return None;
        }
        tracing::info!(image_url, "downloading image");

        let response = match self.client.get(image_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(image_url, error = %e, "image download failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::error!(image_url, status = %response.status(), "image download returned an error status");
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            tracing::warn!(image_url, %content_type, "url did not return an image");
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::error!(image_url, error = %e, "failed reading image body");
                None
            }
        }
    }

    /// Random pause before hitting the site, bounds from the config.
    async fn politeness_delay(&self) {
        let (min, max) = self.config.delay_range;
        if max <= 0.0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(min..=max);
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Request(format!("TimeoutError: {}", e))
            } else if e.is_connect() {
                ScrapeError::Request(format!("ConnectError: {}", e))
            } else {
                ScrapeError::Request(format!("RequestError: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(ScrapeError::Upstream);
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::header;
    use axum::response::Html;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::*;

    const PAGE: &str = r#"<html><body>
        <h1 class="game-title">Neon Abyss</h1>
        <div class="score">Rating: 87/100</div>
        <div class="game-image"><img src="/covers/neon-abyss.jpg"></div>
        <div class="comment" id="abc-123">
            <span class="author">dmytro</span>
            <time datetime="2024-06-15T12:30:00Z">15 June</time>
            <p>Really enjoyed the soundtrack and the pacing.</p>
        </div>
    </body></html>"#;

    fn test_config(addr: std::net::SocketAddr) -> ScraperConfig {
        ScraperConfig {
            api_url: format!("http://{addr}/api"),
            delay_range: (0.0, 0.0),
            timeout: Duration::from_secs(5),
        }
    }

    async fn serve(app: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn scrapes_page_with_html_comment_fallback() {
        let app = Router::new()
            .route("/game/:slug/comment/:id", get(|| async { Html(PAGE) }))
            .route(
                "/api",
                get(|| async { Json(serde_json::json!({"user_reviews": []})) }),
            );
        let addr = serve(app).await;

        let scraper = WtgScraper::with_config(test_config(addr)).unwrap();
        let url = format!("http://{addr}/game/neon-abyss/comment/abc-123");
        let result = scraper.scrape_game_page(&url).await.expect("expected a result");

        assert_eq!(result.game.title, "Neon Abyss");
        assert_eq!(result.game.score, "87");
        assert_eq!(
            result.game.image_url,
            format!("http://{addr}/covers/neon-abyss.jpg")
        );
        // Empty API review list pushes the comment through the HTML fallback;
        // the fallback keeps the raw datetime attribute, unnormalized.
        assert_eq!(result.comment.author, "dmytro");
        assert_eq!(result.comment.date, "2024-06-15T12:30:00Z");
        assert!(result.comment.text.contains("soundtrack"));
        assert_eq!(result.comment.comment_id, "abc-123");
        assert_eq!(result.original_url, url);
    }

    #[tokio::test]
    async fn api_comment_wins_over_html_fallback() {
        let app = Router::new()
            .route("/game/:slug/comment/:id", get(|| async { Html(PAGE) }))
            .route(
                "/api",
                get(|| async {
                    Json(serde_json::json!({"user_reviews": [{
                        "user": "oleh",
                        "text": "Great game",
                        "created_at": "2024-06-15T12:30:00Z"
                    }]}))
                }),
            );
        let addr = serve(app).await;

        let scraper = WtgScraper::with_config(test_config(addr)).unwrap();
        let url = format!("http://{addr}/game/neon-abyss/comment/abc-123");
        let result = scraper.scrape_game_page(&url).await.expect("expected a result");

        assert_eq!(result.comment.author, "oleh");
        assert_eq!(result.comment.text, "Great game");
        assert_eq!(result.comment.date, "15.06.2024");
    }

    #[tokio::test]
    async fn page_fetch_failure_aborts_before_api_call() {
        let api_hits = Arc::new(AtomicUsize::new(0));
        let hits = api_hits.clone();
        let app = Router::new().route(
            "/api",
            get(move || {
                hits.fetch_add(1, Ordering::SeqCst);
                async { Json(serde_json::json!({"user_reviews": []})) }
            }),
        );
        let addr = serve(app).await;

        // A freshly freed local port: connecting to it is refused.
        let dead_port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };

        let scraper = WtgScraper::with_config(ScraperConfig {
            timeout: Duration::from_secs(1),
            ..test_config(addr)
        })
        .unwrap();
        let url = format!("http://127.0.0.1:{dead_port}/game/some-game/comment/abc-123");

        assert!(scraper.scrape_game_page(&url).await.is_none());
        assert_eq!(api_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_success_page_status_aborts() {
        let app = Router::new(); // every route is a 404
        let addr = serve(app).await;

        let scraper = WtgScraper::with_config(test_config(addr)).unwrap();
        let url = format!("http://{addr}/game/gone/comment/abc-123");
        assert!(scraper.scrape_game_page(&url).await.is_none());
    }

    #[tokio::test]
    async fn image_download_checks_content_type() {
        let app = Router::new()
            .route(
                "/cover.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![137u8, 80, 78, 71]) }),
            )
            .route("/page.html", get(|| async { Html("<p>not an image</p>") }));
        let addr = serve(app).await;

        let scraper = WtgScraper::with_config(test_config(addr)).unwrap();

        let bytes = scraper
            .download_image(&format!("http://{addr}/cover.png"))
            .await
            .expect("expected image bytes");
        assert_eq!(bytes, vec![137u8, 80, 78, 71]);

        assert!(scraper
            .download_image(&format!("http://{addr}/page.html"))
            .await
            .is_none());
        assert!(scraper.download_image("").await.is_none());
    }
}
