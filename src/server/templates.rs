//! Template catalog and suggestion endpoints.

use axum::extract::Json;
use serde::{Deserialize, Serialize};

use crate::templates::{catalog, classify, entry, fallback, suggest_for_change_type};
use crate::templates::{Suggestion, TemplateView};

/// Request body for `POST /templates/suggest`.
///
/// Either describe the change itself (`changed_paths`, `diff_text`) or
/// state its type directly (`change_type`); a stated type wins.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub changed_paths: Vec<String>,

    #[serde(default)]
    pub diff_text: String,

    #[serde(default)]
    pub change_type: Option<String>,
}

/// Ranked suggestions plus the single recommended template.
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
    pub recommended: TemplateView,
}

/// Returns the full template catalog.
pub async fn templates_handler() -> Json<Vec<TemplateView>> {
    Json(catalog().iter().map(TemplateView::from).collect())
}

/// Ranks templates for a described change.
pub async fn suggest_handler(Json(request): Json<SuggestRequest>) -> Json<SuggestResponse> {
    let suggestions = classify(&request.changed_paths, &request.diff_text);

    let recommended = match &request.change_type {
        Some(change_type) => suggest_for_change_type(change_type),
        None => entry(&suggestions[0].template).unwrap_or_else(fallback),
    };

    Json(SuggestResponse {
        suggestions,
        recommended: recommended.into(),
    })
}
