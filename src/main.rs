use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

mod api;
mod extract;
mod links;
mod models;
mod scrape;
mod text;

use models::{ImageQuery, LinksRequest, LinksResponse, PreviewRequest, PreviewResponse};
use scrape::WtgScraper;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let scraper = Arc::new(WtgScraper::new().unwrap());

    let app = Router::new()
        .route("/health", get(health))
        .route("/links", post(extract_links))
        .route("/preview", post(preview))
        .route("/image", get(image))
        .with_state(scraper);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy", "service": "wtg-review-api"}))
}

/// Pull candidate comment URLs out of free message text.
async fn extract_links(Json(req): Json<LinksRequest>) -> impl IntoResponse {
    Json(LinksResponse {
        links: links::extract_links(&req.text),
    })
}

async fn preview(
    State(scraper): State<Arc<WtgScraper>>,
    Json(req): Json<PreviewRequest>,
) -> Response {
    if !links::is_valid(&req.url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "detail": "expected a https://wtg.com.ua/game/*/comment/* url"
            })),
        )
            .into_response();
    }

    match scraper.scrape_game_page(&req.url).await {
        Some(result) => {
            let message = text::format_message(&result, req.dialect);
            let response = PreviewResponse {
                game: result.game,
                comment: result.comment,
                original_url: result.original_url,
                message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "detail": "failed to extract data from the page"
            })),
        )
            .into_response(),
    }
}

/// Proxy the cover image bytes so the chat transport can attach them.
async fn image(State(scraper): State<Arc<WtgScraper>>, Query(q): Query<ImageQuery>) -> Response {
    match scraper.download_image(&q.url).await {
        Some(bytes) => bytes.into_response(),
        None => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"detail": "url did not yield an image"})),
        )
            .into_response(),
    }
}
