use crate::cache::{FetchError, Fetcher};
use crate::leetcode::api_types;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// HTTP client for one upstream service.
///
/// The subject is appended to the base URL as a single path segment, so
/// `http://localhost:3003/leetcode` + `alice` becomes
/// `http://localhost:3003/leetcode/alice`.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  base: Url,
  timeout: Duration,
}

impl HttpFetcher {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid upstream URL {}: {}", base_url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("Upstream URL {} cannot take path segments", base_url));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base,
      timeout,
    })
  }

  /// Build the request URL for a subject.
  fn endpoint(&self, subject: &str) -> Result<Url, FetchError> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| FetchError::Transport(format!("{} cannot take a path segment", self.base)))?
      .pop_if_empty()
      .push(subject);
    Ok(url)
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, subject: &str) -> Result<Value, FetchError> {
    let url = self.endpoint(subject)?;
    tracing::debug!(%url, "fetching from upstream");

    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| self.classify(e))?;

    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(|e| self.classify(e))?;

    interpret(status, serde_json::from_slice(&body).ok())
  }
}

impl HttpFetcher {
  fn classify(&self, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
      FetchError::Timeout(self.timeout)
    } else {
      FetchError::Transport(e.to_string())
    }
  }
}

/// Decide what a response carries.
///
/// A 2xx always yields a value (`null` when the body is not JSON) and is left
/// to the validation gate. A 4xx is passed on only with a JSON object body,
/// which holds the upstream's "no such user" message. Anything else, 5xx
/// included, is a fault of the upstream itself and never reaches the gate.
fn interpret(status: u16, body: Option<Value>) -> Result<Value, FetchError> {
  match (status, body) {
    (200..=299, body) => Ok(body.unwrap_or(Value::Null)),
    (400..=499, Some(value)) if value.is_object() => Ok(value),
    (_, body) => Err(FetchError::Status {
      status,
      detail: body
        .as_ref()
        .and_then(api_types::error_text)
        .map(String::from),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::StatusCode;
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::json;

  #[test]
  fn test_interpret() {
    assert_eq!(interpret(200, Some(json!({"a": 1}))).unwrap(), json!({"a": 1}));
    assert_eq!(interpret(204, None).unwrap(), Value::Null);
    assert_eq!(
      interpret(404, Some(json!({"detail": "nope"}))).unwrap(),
      json!({"detail": "nope"})
    );
    assert!(matches!(
      interpret(500, None),
      Err(FetchError::Status { status: 500, detail: None })
    ));
    assert!(matches!(
      interpret(502, Some(json!("bad gateway"))),
      Err(FetchError::Status { status: 502, .. })
    ));
    assert!(matches!(
      interpret(404, Some(json!("not found"))),
      Err(FetchError::Status { status: 404, .. })
    ));
  }

  #[test]
  fn test_server_errors_never_reach_the_gate() {
    let err = interpret(
      503,
      Some(json!({"detail": "Failed to connect to data source: refused"})),
    )
    .unwrap_err();
    match err {
      FetchError::Status { status, detail } => {
        assert_eq!(status, 503);
        assert_eq!(
          detail.as_deref(),
          Some("Failed to connect to data source: refused")
        );
      }
      other => panic!("expected a status error, got {other:?}"),
    }

    assert!(matches!(
      interpret(500, Some(json!({"success": true, "data": {"x": 1}}))),
      Err(FetchError::Status { status: 500, .. })
    ));
  }

  #[test]
  fn test_endpoint_encodes_subject_as_one_segment() {
    let fetcher = HttpFetcher::new("http://localhost:3003/leetcode/", Duration::from_secs(1)).unwrap();
    assert_eq!(
      fetcher.endpoint("alice").unwrap().as_str(),
      "http://localhost:3003/leetcode/alice"
    );
    assert_eq!(
      fetcher.endpoint("a/b c").unwrap().as_str(),
      "http://localhost:3003/leetcode/a%2Fb%20c"
    );
  }

  #[test]
  fn test_rejects_non_base_url() {
    assert!(HttpFetcher::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    assert!(HttpFetcher::new("not a url", Duration::from_secs(1)).is_err());
  }

  async fn spawn_upstream() -> String {
    let app = Router::new()
      .route(
        "/leetcode/{username}",
        get(|axum::extract::Path(name): axum::extract::Path<String>| async move {
          Json(json!({"success": true, "data": {"username": name}}))
        }),
      )
      .route(
        "/missing/{username}",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "User data not found"}))) }),
      )
      .route(
        "/broken/{username}",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
      )
      .route(
        "/degraded/{username}",
        get(|| async {
          (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"detail": "Failed to connect to data source: refused"})),
          )
        }),
      )
      .route(
        "/slow/{username}",
        get(|| async {
          tokio::time::sleep(Duration::from_secs(5)).await;
          Json(json!({}))
        }),
      );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
  }

  #[tokio::test]
  async fn test_fetch_against_live_server() {
    let base = spawn_upstream().await;
    let timeout = Duration::from_millis(200);

    let ok = HttpFetcher::new(&format!("{base}/leetcode"), timeout).unwrap();
    assert_eq!(
      ok.fetch("alice").await.unwrap(),
      json!({"success": true, "data": {"username": "alice"}})
    );

    let missing = HttpFetcher::new(&format!("{base}/missing"), timeout).unwrap();
    assert_eq!(
      missing.fetch("alice").await.unwrap(),
      json!({"detail": "User data not found"})
    );

    let broken = HttpFetcher::new(&format!("{base}/broken"), timeout).unwrap();
    assert!(matches!(
      broken.fetch("alice").await,
      Err(FetchError::Status { status: 500, detail: None })
    ));

    let degraded = HttpFetcher::new(&format!("{base}/degraded"), timeout).unwrap();
    assert!(matches!(
      degraded.fetch("alice").await,
      Err(FetchError::Status { status: 503, detail: Some(_) })
    ));

    let slow = HttpFetcher::new(&format!("{base}/slow"), timeout).unwrap();
    assert!(matches!(
      slow.fetch("alice").await,
      Err(FetchError::Timeout(_))
    ));
  }

  #[tokio::test]
  async fn test_upstream_503_resolves_as_unreachable() {
    use crate::cache::{CacheLayer, CacheStorage, FetchOutcome, Kind, MemoryStorage};
    use crate::proxy::CacheProxy;
    use std::sync::Arc;

    let base = spawn_upstream().await;
    let timeout = Duration::from_millis(200);
    let storage = Arc::new(MemoryStorage::new());
    let cache_storage: Arc<dyn CacheStorage> = storage.clone();
    let proxy = CacheProxy::new(
      CacheLayer::new(cache_storage),
      Arc::new(HttpFetcher::new(&format!("{base}/leetcode"), timeout).unwrap()),
      Arc::new(HttpFetcher::new(&format!("{base}/degraded"), timeout).unwrap()),
    );

    let outcome = proxy.resolve(Kind::Analysis, "alice").await.unwrap();
    assert!(matches!(
      outcome,
      FetchOutcome::UpstreamUnreachable(FetchError::Status { status: 503, .. })
    ));
    assert_eq!(storage.read("analysis:alice").unwrap(), None);
  }

  #[tokio::test]
  async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(&format!("http://{addr}/leetcode"), Duration::from_secs(1)).unwrap();
    assert!(matches!(
      fetcher.fetch("alice").await,
      Err(FetchError::Transport(_))
    ));
  }
}
