use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use scraper::{Html, Selector};
use tower::ServiceExt;

use triage::ajax::{AjaxClient, AjaxError, RequestOptions};
use triage::api::create_router;
use triage::backend::{BackendError, FixtureBackend, FixtureEntry, SearchBackend, UpstreamBackend};
use triage::data_models::{Level, SearchForm, SearchRequest, SearchResponse, SearchResults, SimilarIssue, Solution};
use triage::location::{AddressMode, PageLocation};
use triage::session::SearchSession;
use triage::view::{Outcome, ViewState};

mod test_helpers {
    use super::*;

    pub fn solution(body: &str, score: i64) -> Solution {
        Solution {
            body: body.to_string(),
            html_url: format!("https://github.com/example/repo/issues/1#{body}"),
            positive_score: serde_json::Number::from(score),
        }
    }

    pub fn fixture_backend() -> FixtureBackend {
        FixtureBackend::new(vec![
            FixtureEntry {
                pattern: "null pointer".to_string(),
                solutions: vec![solution("check-init", 14), solution("upgrade", 6)],
                similar: vec![SimilarIssue {
                    title: "Segfault on fresh client".to_string(),
                    html_url: "https://github.com/example/repo/issues/431".to_string(),
                }],
            },
            FixtureEntry {
                pattern: "timeout".to_string(),
                solutions: vec![],
                similar: vec![SimilarIssue {
                    title: "Requests hang behind a proxy".to_string(),
                    html_url: "https://github.com/example/repo/issues/220".to_string(),
                }],
            },
        ])
    }

    pub fn router() -> Router {
        create_router(Arc::new(fixture_backend()), "static")
    }

    pub async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let res = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Serve `router` on an ephemeral port and return the page url.
    pub async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    pub fn session(page: &str) -> SearchSession {
        SearchSession::new(
            AjaxClient::new(),
            PageLocation::parse(page).unwrap(),
            AddressMode::BasePath,
        )
    }

    /// Answers after a pause when the query mentions "slow".
    pub struct DelayBackend;

    #[async_trait]
    impl SearchBackend for DelayBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
            if request.query.contains("slow") {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            Ok(SearchResults {
                solutions: vec![solution("answer", 1)],
                similar: vec![],
            })
        }
    }

    pub struct FailingBackend;

    #[async_trait]
    impl SearchBackend for FailingBackend {
        async fn search(&self, _request: &SearchRequest) -> Result<SearchResults, BackendError> {
            Err(BackendError::Upstream(AjaxError::InvalidUrl("nowhere".to_string())))
        }
    }
}

use test_helpers::*;

#[cfg(test)]
mod results_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_results_with_matches() {
        let (status, body) = get_body(router(), "/results?q=error%3A%20null%20pointer&level=0").await;
        assert_eq!(status, StatusCode::OK);

        let res: SearchResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(res.q, "error: null pointer");
        assert!(res.has_results);
        assert!(res.search_made);
        assert_eq!(res.level, Some(4));
        assert_eq!(res.results.solutions.len(), 2);
        assert_eq!(res.results.solutions[0].body, "check-init");
        assert_eq!(res.results.similar.len(), 1);
    }

    #[tokio::test]
    async fn test_results_without_matches() {
        let (status, body) = get_body(router(), "/results?q=disk%20full&level=2").await;
        assert_eq!(status, StatusCode::OK);

        let res: SearchResponse = serde_json::from_str(&body).unwrap();
        assert!(!res.has_results);
        assert!(res.results.is_empty());
        assert_eq!(res.level, Some(2));
    }

    #[tokio::test]
    async fn test_results_rejects_missing_query() {
        let (status, body) = get_body(router(), "/results?level=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("q"));
    }

    #[tokio::test]
    async fn test_results_rejects_bad_level() {
        let (status, _) = get_body(router(), "/results?q=x&level=9").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_body(router(), "/results?q=x&level=high").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_results_backend_failure_is_bad_gateway() {
        let router = create_router(Arc::new(FailingBackend), "static");
        let (status, body) = get_body(router, "/results?q=x&level=0").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.starts_with("Search error"));
    }
}

#[cfg(test)]
mod index_page_tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_page_has_form_and_hidden_sections() {
        let (status, body) = get_body(router(), "/").await;
        assert_eq!(status, StatusCode::OK);

        let doc = Html::parse_document(&body);
        let form = Selector::parse("form#searchForm input[type=search]").unwrap();
        assert_eq!(doc.select(&form).count(), 1);
        let slider = Selector::parse("form#searchForm input[type=range]").unwrap();
        let slider = doc.select(&slider).next().unwrap();
        assert_eq!(slider.value().attr("min"), Some("1"));
        assert_eq!(slider.value().attr("max"), Some("4"));

        let hidden = Selector::parse(".result-section.hidden, .no-results.hidden, .loader.hidden").unwrap();
        assert_eq!(doc.select(&hidden).count(), 3);
    }

    #[tokio::test]
    async fn test_page_renders_results_for_query() {
        let (status, body) = get_body(router(), "/?q=null%20pointer&level=0").await;
        assert_eq!(status, StatusCode::OK);

        let doc = Html::parse_document(&body);
        let panels = Selector::parse(".results .suggestion-score").unwrap();
        assert_eq!(doc.select(&panels).count(), 2);
        let divider = Selector::parse(".results hr.result-divider").unwrap();
        assert_eq!(doc.select(&divider).count(), 1);
        let visible = Selector::parse("section.result-section:not(.hidden)").unwrap();
        assert_eq!(doc.select(&visible).count(), 1);

        let input = Selector::parse("input[type=search]").unwrap();
        let input = doc.select(&input).next().unwrap();
        assert_eq!(input.value().attr("value"), Some("null pointer"));
    }

    #[tokio::test]
    async fn test_page_accepts_raw_slider() {
        let (status, body) = get_body(router(), "/?q=nothing%20here&slider=1").await;
        assert_eq!(status, StatusCode::OK);

        let doc = Html::parse_document(&body);
        let empty = Selector::parse(".no-results:not(.hidden)").unwrap();
        assert_eq!(doc.select(&empty).count(), 1);
        let slider = Selector::parse("input[type=range]").unwrap();
        let slider = doc.select(&slider).next().unwrap();
        assert_eq!(slider.value().attr("value"), Some("1"));
    }

    #[tokio::test]
    async fn test_page_shows_backend_failure() {
        let router = create_router(Arc::new(FailingBackend), "static");
        let (status, body) = get_body(router, "/?q=x").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let doc = Html::parse_document(&body);
        let error = Selector::parse(".error-message:not(.hidden)").unwrap();
        assert_eq!(doc.select(&error).count(), 1);
    }
}

#[cfg(test)]
mod ajax_tests {
    use super::*;

    #[tokio::test]
    async fn test_send_invokes_callback_on_success() {
        let page = spawn(router()).await;
        let client = AjaxClient::new();

        let mut seen = None;
        client
            .send(
                &format!("{page}results"),
                |res: SearchResponse| seen = Some(res),
                Some(RequestOptions::default().data("q", "timeout").data("level", "1")),
            )
            .await
            .unwrap();

        let res = seen.expect("callback ran");
        assert_eq!(res.q, "timeout");
        assert!(res.has_results);
        assert!(res.results.solutions.is_empty());
        assert_eq!(res.results.similar.len(), 1);
    }

    #[tokio::test]
    async fn test_status_error_skips_callback() {
        let failing = Router::new().route(
            "/results",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let page = spawn(failing).await;

        let mut called = false;
        let res = AjaxClient::new()
            .send(
                &format!("{page}results"),
                |_: SearchResponse| called = true,
                None,
            )
            .await;

        assert!(matches!(
            res,
            Err(AjaxError::Status { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let garbage = Router::new()
            .route("/results", get(|| async { "{\"q\": \"x\", \"has_results\": tru" }))
            .route("/wrong", get(|| async { "{\"q\": 1}" }));
        let page = spawn(garbage).await;
        let client = AjaxClient::new();

        let res = client
            .fetch_json::<SearchResponse>(&format!("{page}results"), RequestOptions::default())
            .await;
        assert!(matches!(res, Err(AjaxError::Decode { .. })));

        let res = client
            .fetch_json::<SearchResponse>(&format!("{page}wrong"), RequestOptions::default())
            .await;
        assert!(matches!(res, Err(AjaxError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let res = AjaxClient::new()
            .fetch_json::<SearchResponse>(&format!("http://{addr}/results"), RequestOptions::default())
            .await;
        assert!(matches!(res, Err(AjaxError::Network { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let res = AjaxClient::new()
            .fetch_json::<SearchResponse>("::not a url::", RequestOptions::default())
            .await;
        assert!(matches!(res, Err(AjaxError::InvalidUrl(_))));
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_search_cycle() {
        let page = spawn(router()).await;
        let session = session(&page);

        let outcome = session
            .search(&SearchForm::new("error: null pointer", 4))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied(ViewState::ShowingResults));
        assert_eq!(session.address().await, Some(page.clone()));

        let doc = Html::parse_fragment(&session.to_html().await);
        let panels = Selector::parse(".results .suggestion-score").unwrap();
        assert_eq!(doc.select(&panels).count(), 2);
        let entries = Selector::parse(".results .list-group-item").unwrap();
        assert_eq!(doc.select(&entries).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_search_cycle() {
        let page = spawn(router()).await;
        let session = session(&page);

        let outcome = session.search(&SearchForm::new("disk full", 2)).await.unwrap();
        assert_eq!(outcome, Outcome::Applied(ViewState::ShowingEmpty));
        let area = session.area().await;
        assert!(area.no_results_visible);
        assert!(!area.result_section_visible);
        assert!(!area.loader_visible);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_ends_in_error_state() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session = session(&format!("http://{addr}/"));
        let outcome = session.search(&SearchForm::new("anything", 4)).await.unwrap();
        assert_eq!(outcome, Outcome::Applied(ViewState::Error));
        let area = session.area().await;
        assert!(!area.loader_visible);
        assert!(area.error_visible);
    }

    #[tokio::test]
    async fn test_unsafe_links_end_in_error_state() {
        let hostile = Router::new().route(
            "/results",
            get(|| async {
                r#"{"q":"x","has_results":true,"results":{
                    "solutions":[{"body":"b","html_url":"javascript:alert(document.cookie)","positive_score":1}],
                    "similar":[{"title":"t","html_url":"not a url at all"}]}}"#
            }),
        );
        let page = spawn(hostile).await;
        let session = session(&page);

        let outcome = session.search(&SearchForm::new("x", 4)).await.unwrap();
        assert_eq!(outcome, Outcome::Applied(ViewState::Error));

        let area = session.area().await;
        assert!(area.nodes.is_empty());
        assert!(area.error_message.contains("html_url"));
        let doc = Html::parse_fragment(&session.to_html().await);
        let links = Selector::parse("a[href]").unwrap();
        assert_eq!(doc.select(&links).count(), 0);
    }

    #[tokio::test]
    async fn test_relative_link_is_decode_error() {
        let relative = Router::new().route(
            "/results",
            get(|| async {
                r#"{"q":"x","has_results":true,"results":{"solutions":[],
                    "similar":[{"title":"t","html_url":"/issues/4"}]}}"#
            }),
        );
        let page = spawn(relative).await;

        let res = AjaxClient::new()
            .fetch_json::<SearchResponse>(&format!("{page}results"), RequestOptions::default())
            .await;
        assert!(matches!(res, Err(AjaxError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_newest_submission_wins_over_late_response() {
        let page = spawn(create_router(Arc::new(DelayBackend), "static")).await;
        let session = Arc::new(session(&page));

        let first = session.clone();
        let slow = tokio::spawn(async move { first.search(&SearchForm::new("slow query", 4)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fast = session.search(&SearchForm::new("fast query", 4)).await.unwrap();
        assert_eq!(fast, Outcome::Applied(ViewState::ShowingResults));

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow, Outcome::Stale);

        let area = session.area().await;
        assert_eq!(area.query_label, "\"fast query\"");
        assert_eq!(session.state().await, ViewState::ShowingResults);
    }
}

#[cfg(test)]
mod backend_tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_matches_case_insensitively_in_file_order() {
        let backend = fixture_backend();
        let req = SearchRequest::new("Null Pointer after TIMEOUT", Level::default());
        let results = backend.search(&req).await.unwrap();

        assert_eq!(results.solutions.len(), 2);
        let titles: Vec<&str> = results.similar.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Segfault on fresh client", "Requests hang behind a proxy"]);
    }

    #[tokio::test]
    async fn test_fixture_caps_solutions_by_level() {
        let solutions: Vec<Solution> = (0..60).map(|i| solution(&format!("s{i}"), i)).collect();
        let backend = FixtureBackend::new(vec![FixtureEntry {
            pattern: "crash".to_string(),
            solutions,
            similar: vec![],
        }]);

        for (level, expected) in [(0, 60), (1, 50), (2, 30), (3, 15)] {
            let req = SearchRequest::new("crash", Level::new(level).unwrap());
            let results = backend.search(&req).await.unwrap();
            assert_eq!(results.solutions.len(), expected);
            assert_eq!(results.solutions[0].body, "s0");
        }
    }

    #[tokio::test]
    async fn test_fixture_empty_query_has_no_results() {
        let backend = fixture_backend();
        let results = backend
            .search(&SearchRequest::new("   ", Level::default()))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fixture_file_loading() {
        let backend = FixtureBackend::from_file("fixtures/issues.json").unwrap();
        let results = backend
            .search(&SearchRequest::new("null pointer", Level::default()))
            .await
            .unwrap();
        assert!(!results.solutions.is_empty());

        assert!(matches!(
            FixtureBackend::from_file("fixtures/missing.json"),
            Err(BackendError::FixtureIo { .. })
        ));
    }

    #[tokio::test]
    async fn test_upstream_forwards_to_results_endpoint() {
        let page = spawn(router()).await;
        let backend = UpstreamBackend::new(AjaxClient::new(), PageLocation::parse(&page).unwrap());

        let results = backend
            .search(&SearchRequest::new("timeout", Level::new(3).unwrap()))
            .await
            .unwrap();
        assert_eq!(results.similar.len(), 1);

        let results = backend
            .search(&SearchRequest::new("nothing", Level::default()))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
