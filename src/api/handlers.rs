use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use std::sync::Arc;
use std::time::Instant;

use crate::backend::SearchBackend;
use crate::data_models::{SearchRequest, SearchResponse};
use crate::render::{ResultArea, render_page};

use super::models::SearchParams;

async fn run_search(
    backend: &dyn SearchBackend,
    request: &SearchRequest,
) -> Result<SearchResponse, (StatusCode, String)> {
    let start = Instant::now();

    let results = backend.search(request).await.map_err(|e| {
        log::error!("search for {:?} failed: {:#}", request.query, e);
        (StatusCode::BAD_GATEWAY, format!("Search error: {}", e))
    })?;

    log::info!(
        "search {:?} level={} -> {} solutions, {} similar in {}ms",
        request.query,
        request.level,
        results.solutions.len(),
        results.similar.len(),
        start.elapsed().as_millis()
    );

    Ok(SearchResponse::for_request(request, results))
}

pub async fn results_handler(
    State(backend): State<Arc<dyn SearchBackend>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let level = params
        .level()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let Some(query) = params.q else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing query parameter q".to_string(),
        ));
    };

    let request = SearchRequest::new(query, level);
    let response = run_search(backend.as_ref(), &request).await?;
    Ok(Json(response))
}

/// Search page. With `q` present the search runs here and the results are
/// rendered into the page.
pub async fn index_handler(
    State(backend): State<Arc<dyn SearchBackend>>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Html<String>) {
    let mut area = ResultArea::default();

    let level = match params.level() {
        Ok(level) => level,
        Err(e) => {
            area.show_error(e.to_string());
            let query = params.q.unwrap_or_default();
            return (StatusCode::BAD_REQUEST, Html(render_page(&query, 4, &area)));
        }
    };

    let Some(query) = params.q else {
        return (StatusCode::OK, Html(render_page("", level.slider(), &area)));
    };

    let request = SearchRequest::new(query, level);
    let status = match run_search(backend.as_ref(), &request).await {
        Ok(response) => {
            area.show_response(&response);
            StatusCode::OK
        }
        Err((status, message)) => {
            area.show_error(message);
            status
        }
    };

    (
        status,
        Html(render_page(&request.query, level.slider(), &area)),
    )
}
