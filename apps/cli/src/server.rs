//! HTTP front end: `POST /scrape` and `GET /healthz`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use serpcluster_core::{ErrorBody, Pipeline, ScrapeRequest, SilentProgress};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

pub(crate) fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/scrape", post(scrape_handler))
        .with_state(AppState { pipeline })
}

/// Bind `addr` and serve until Ctrl-C.
pub(crate) async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .wrap_err_with(|| format!("invalid bind address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    println!("serpcluster listening on http://{addr}");
    info!(%addr, "http server started");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .wrap_err("server shutdown")?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid request body: {}", rejection.body_text()),
            );
        }
    };

    match serpcluster_core::scrape(&state.pipeline, request, &SilentProgress).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(status = status.as_u16(), error = %e, "scrape request failed");
            (status, Json(ErrorBody::from(&e))).into_response()
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use serpcluster_search::DuckDuckGoProvider;
    use serpcluster_shared::{PipelineConfig, SearchConfig};
    use serpcluster_storage::Storage;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        server: MockServer,
        storage: Arc<Storage>,
        app: Router,
    }

    /// Router wired to a mock search endpoint and a throwaway database.
    async fn harness() -> Harness {
        let server = MockServer::start().await;
        let provider = DuckDuckGoProvider::new(SearchConfig {
            endpoint: format!("{}/html/", server.uri()),
            ..SearchConfig::default()
        })
        .unwrap();

        let db_path =
            std::env::temp_dir().join(format!("serpcluster_server_test_{}.db", Uuid::now_v7()));
        let storage = Arc::new(Storage::open(&db_path).await.unwrap());

        let mut config = PipelineConfig::new(5);
        config.allow_private_hosts = true;
        let pipeline = Pipeline::new(config, Arc::new(provider), storage.clone()).unwrap();

        Harness {
            server,
            storage,
            app: router(Arc::new(pipeline)),
        }
    }

    async fn mount_results(server: &MockServer, links: &[String]) {
        let blocks: String = links
            .iter()
            .map(|href| {
                format!(
                    r#"<div class="result results_links results_links_deep web-result"><a class="result__a" href="{href}">t</a></div>"#
                )
            })
            .collect();
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<html><body>{blocks}</body></html>"), "text/html"),
            )
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, route: &str, text: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<html><body><p>{text}</p></body></html>"), "text/html"),
            )
            .mount(server)
            .await;
    }

    fn scrape_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/scrape")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let h = harness().await;
        let response = h
            .app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_query_is_a_bad_request() {
        let h = harness().await;
        let response = h.app.oneshot(scrape_request(r#"{"query": ""}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "no query provided");
        assert!(h.server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_a_bad_request() {
        let h = harness().await;
        let response = h.app.oneshot(scrape_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let h = harness().await;
        let response = h.app.oneshot(scrape_request("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn no_links_is_a_server_error() {
        let h = harness().await;
        mount_results(&h.server, &[]).await;

        let response = h.app.oneshot(scrape_request(r#"{"query": "zzzz"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "no links found");
        assert_eq!(h.storage.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn successful_scrape_returns_and_stores_clusters() {
        let h = harness().await;
        let base = h.server.uri();
        mount_results(
            &h.server,
            &[
                format!("{base}/short-1"),
                format!("{base}/short-2"),
                format!("{base}/article"),
            ],
        )
        .await;
        mount_page(&h.server, "/short-1", "Menu Home About").await;
        mount_page(&h.server, "/short-2", "Cookie banner").await;
        mount_page(
            &h.server,
            "/article",
            &"search engine optimization ".repeat(20),
        )
        .await;

        let response = h
            .app
            .oneshot(scrape_request(r#"{"query": "seo basics"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Scraping & clustering complete");
        let clusters = body["clusters"].as_object().unwrap();
        assert_eq!(clusters.len(), 5);
        assert_eq!(body["skipped_pages"].as_array().unwrap().len(), 2);

        assert_eq!(h.storage.count_rows().await.unwrap(), 3);
        assert_eq!(h.storage.list_runs(5).await.unwrap().len(), 1);
    }
}
