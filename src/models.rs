use serde::{Deserialize, Serialize};

use crate::text::Dialect;

/// Placeholder shown when no numeric score is present on the page.
pub const SCORE_UNAVAILABLE: &str = "N/A";
/// Placeholder author for comments the fallback extractor cannot attribute.
pub const UNKNOWN_USER: &str = "Unknown User";
/// Placeholder date shared by the API client and the fallback extractor.
pub const UNKNOWN_DATE: &str = "Unknown Date";

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub url: String,
    /// Markup style for the rendered message; HTML unless asked otherwise.
    #[serde(default)]
    pub dialect: Dialect,
}

#[derive(Debug, Deserialize)]
pub struct LinksRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameInfo {
    pub title: String,
    /// Numeric score as text, [`SCORE_UNAVAILABLE`] when the page shows none.
    pub score: String,
    /// Absolute cover image URL, empty when nothing was found.
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentInfo {
    pub author: String,
    pub date: String,
    pub text: String,
    /// URL segment after `/comment/`, kept verbatim.
    pub comment_id: String,
}

/// Everything extracted for one comment URL. Built only once both the game
/// and the comment half succeeded; never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WtgResult {
    pub game: GameInfo,
    pub comment: CommentInfo,
    /// The exact input URL, never a redirected or normalized variant.
    pub original_url: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub game: GameInfo,
    pub comment: CommentInfo,
    pub original_url: String,
    pub message: String,
}
