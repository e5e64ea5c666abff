//! # eqdb Data Client
//!
//! HTTP client for the eqdb game-data API. All three lookups are JSON GETs
//! against the configured base URL:
//!
//! - `GET /api/v1/items?name={name}` - item search
//! - `GET /api/v1/items?id={id}` - single item
//! - `GET /api/v1/trades?id={item_id}` - crafting recipe
//!
//! ## Failure handling
//!
//! - **404 / empty result**: returned as an empty list or `None`, never an error
//! - **429**: retried after `Retry-After` (or the policy default), a bounded
//!   number of times
//! - **5xx / transport**: retried once after a backoff
//! - **Malformed JSON**: reported as [`ClientError::MalformedJson`], no retry
//!
//! Every request logs its URL, status, elapsed time and record count at
//! `debug` level.

mod payload;
mod records;
mod retry;

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use tracing::{debug, error, info, warn};

pub use payload::Payload;
pub use retry::RetryPolicy;

use crate::error::ClientError;
use crate::models::{ItemRef, RawRecipeData};

/// The lookups the recipe resolver needs from a game-data source
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Items whose name matches, in the order the source returned them
    async fn search_item_by_name(&self, name: &str) -> Result<Vec<ItemRef>, ClientError>;

    async fn fetch_item_by_id(&self, id: u64) -> Result<Option<ItemRef>, ClientError>;

    /// Recipe for an item, without any name resolution
    async fn fetch_recipe_by_item_id(&self, id: u64) -> Result<Option<RawRecipeData>, ClientError>;
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Finished(Result<Option<Payload>, ClientError>),
    RateLimited(Duration),
    Retryable(ClientError),
}

/// eqdb client. Owns one connection pool, shared by every clone.
pub struct EqdbClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl EqdbClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("eq-crafting-bot/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    fn items_url(&self, query: &str, value: &str) -> String {
        format!(
            "{}/api/v1/items?{query}={}",
            self.base_url,
            urlencoding::encode(value)
        )
    }

    fn trades_url(&self, item_id: u64) -> String {
        format!("{}/api/v1/trades?id={item_id}", self.base_url)
    }

    /// GET a URL and normalise its body, applying the retry policy.
    /// `Ok(None)` means 404.
    async fn get_json(&self, url: &str) -> Result<Option<Payload>, ClientError> {
        let mut rate_limited = 0;
        let mut failures = 0;

        loop {
            match self.attempt(url).await {
                Attempt::Finished(result) => return result,
                Attempt::RateLimited(delay) => {
                    if rate_limited >= self.retry.max_rate_limit_retries {
                        error!(url, attempts = rate_limited + 1, "Giving up on rate limited eqdb request");
                        return Err(ClientError::RateLimited {
                            url: url.to_string(),
                            attempts: rate_limited + 1,
                        });
                    }
                    rate_limited += 1;
                    warn!(
                        url,
                        retry_in_ms = delay.as_millis() as u64,
                        retry = rate_limited,
                        "Rate limited by eqdb"
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::Retryable(err) => {
                    if failures >= self.retry.max_failure_retries {
                        error!(url, error = %err, "eqdb request failed, retries exhausted");
                        return Err(err);
                    }
                    failures += 1;
                    warn!(url, error = %err, retry = failures, "eqdb request failed, retrying");
                    tokio::time::sleep(self.retry.failure_backoff).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let started = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(source) => {
                return Attempt::Retryable(ClientError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let status = response.status();

        if !status.is_success() {
            debug!(
                url,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                records = 0,
                "eqdb request completed"
            );
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            return Attempt::RateLimited(self.retry.rate_limit_delay_for(retry_after));
        }

        if status.as_u16() == 404 {
            return Attempt::Finished(Ok(None));
        }

        if !status.is_success() {
            let err = ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
            return if status.is_server_error() {
                Attempt::Retryable(err)
            } else {
                Attempt::Finished(Err(err))
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(source) => {
                return Attempt::Retryable(ClientError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let result = decode(url, &body);
        match &result {
            Ok(payload) => debug!(
                url,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                records = payload.len(),
                "eqdb request completed"
            ),
            Err(err) => warn!(url, error = %err, "Unusable eqdb response body"),
        }

        Attempt::Finished(result.map(Some))
    }
}

fn decode(url: &str, body: &str) -> Result<Payload, ClientError> {
    if body.trim().is_empty() {
        return Ok(Payload::Empty);
    }

    let value = serde_json::from_str(body).map_err(|source| ClientError::MalformedJson {
        url: url.to_string(),
        source,
    })?;

    Payload::from_value(value).map_err(|message| ClientError::UnexpectedShape {
        url: url.to_string(),
        message,
    })
}

#[async_trait]
impl DataSource for EqdbClient {
    async fn search_item_by_name(&self, name: &str) -> Result<Vec<ItemRef>, ClientError> {
        let url = self.items_url("name", name);
        info!("Searching eqdb for item: '{}'", name);

        let Some(payload) = self.get_json(&url).await? else {
            return Ok(Vec::new());
        };

        let items: Vec<ItemRef> = payload
            .into_records()
            .iter()
            .filter_map(|record| match records::item_from_record(record) {
                Ok(item) => Some(item),
                Err(reason) => {
                    warn!(url = %url, reason = %reason, "Skipping unusable item in search results");
                    None
                }
            })
            .collect();

        info!("Found {} items matching '{}'", items.len(), name);
        Ok(items)
    }

    async fn fetch_item_by_id(&self, id: u64) -> Result<Option<ItemRef>, ClientError> {
        let url = self.items_url("id", &id.to_string());

        let Some(payload) = self.get_json(&url).await? else {
            return Ok(None);
        };

        let found = payload.into_records();
        let item = found
            .iter()
            .filter_map(|record| records::item_from_record(record).ok())
            .find(|item| item.id == id);

        if item.is_none() && !found.is_empty() {
            warn!(url = %url, id, "No returned item carries the requested id");
        }
        Ok(item)
    }

    async fn fetch_recipe_by_item_id(&self, id: u64) -> Result<Option<RawRecipeData>, ClientError> {
        let url = self.trades_url(id);
        info!("Fetching recipe for item ID: {}", id);

        let Some(payload) = self.get_json(&url).await? else {
            return Ok(None);
        };

        // Several recipes can produce the same item; the first one is used
        payload
            .into_records()
            .first()
            .map(|record| {
                records::recipe_from_record(record)
                    .map_err(|message| ClientError::UnexpectedShape { url, message })
            })
            .transpose()
    }
}

impl Clone for EqdbClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            retry: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawComponent;
    use serde_json::json;
    use tracing_test::traced_test;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_rate_limit_retries: 2,
            rate_limit_delay: Duration::from_millis(10),
            max_retry_after: Duration::from_secs(5),
            max_failure_retries: 1,
            failure_backoff: Duration::from_millis(10),
        }
    }

    fn client_for(server: &MockServer) -> EqdbClient {
        EqdbClient::new(&server.uri(), Duration::from_secs(5), fast_policy())
            .expect("client builds")
    }

    fn pick_item() -> ItemRef {
        ItemRef {
            id: 17731,
            name: "Black Acrylia Pick".to_string(),
        }
    }

    #[tokio::test]
    async fn search_sends_json_accept_and_encoded_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param("name", "Black Acrylia Pick"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 17731, "name": "Black Acrylia Pick"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let items = client_for(&server)
            .search_item_by_name("Black Acrylia Pick")
            .await
            .expect("search succeeds");
        assert_eq!(items, vec![pick_item()]);
    }

    #[tokio::test]
    async fn search_unwraps_envelopes_and_skips_unusable_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 1, "name": "Pick"},
                    {"id": 2},
                    {"item_id": "3", "name": "Pick Handle"}
                ]
            })))
            .mount(&server)
            .await;

        let items = client_for(&server)
            .search_item_by_name("Pick")
            .await
            .expect("search succeeds");
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn search_not_found_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("name", "Nothing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "Gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.search_item_by_name("Nothing").await.expect("ok").is_empty());
        assert!(client.search_item_by_name("Gone").await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn fetch_item_by_id_handles_object_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param("id", "500"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "500", "name": "Acrylia Ore"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param("id", "999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.fetch_item_by_id(500).await.expect("ok"),
            Some(ItemRef {
                id: 500,
                name: "Acrylia Ore".to_string()
            })
        );
        assert_eq!(client.fetch_item_by_id(999).await.expect("ok"), None);
    }

    #[tokio::test]
    async fn fetch_item_by_id_prefers_the_matching_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"id": 1, "name": "Other"},
                {"id": 42, "name": "Wanted"}
            ]})))
            .mount(&server)
            .await;

        let item = client_for(&server).fetch_item_by_id(42).await.expect("ok");
        assert_eq!(item.map(|i| i.name), Some("Wanted".to_string()));
    }

    #[tokio::test]
    async fn fetch_item_by_id_ignores_records_with_other_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param("id", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 17731, "name": "Black Acrylia Pick"}
            ])))
            .mount(&server)
            .await;

        let item = client_for(&server).fetch_item_by_id(500).await.expect("ok");
        assert_eq!(item, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_responses_are_logged_with_status_and_timing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_item_by_id(7).await;

        assert!(result.is_err());
        assert!(logs_contain("status=503"));
        assert!(logs_contain("elapsed_ms="));
        assert!(logs_contain("eqdb request completed"));
    }

    #[tokio::test]
    async fn fetch_recipe_returns_raw_components_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/trades"))
            .and(query_param("id", "17731"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "tradeskill": 63,
                "skillneeded": 0,
                "trivial": 102,
                "station_container_id": 1001,
                "components": [
                    {"item_id": 500, "quantity": 3},
                    {"item_id": 501, "quantity": 1}
                ]
            }])))
            .mount(&server)
            .await;

        let raw = client_for(&server)
            .fetch_recipe_by_item_id(17731)
            .await
            .expect("ok")
            .expect("recipe present");
        assert_eq!(raw.tradeskill_code, Some(63));
        assert_eq!(raw.station_container_id, Some(1001));
        assert_eq!(
            raw.components,
            vec![
                RawComponent { item_id: 500, quantity: 3 },
                RawComponent { item_id: 501, quantity: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn fetch_recipe_error_object_means_no_recipe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/trades"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "No recipe found"})),
            )
            .mount(&server)
            .await;

        let raw = client_for(&server).fetch_recipe_by_item_id(1).await.expect("ok");
        assert_eq!(raw, None);
    }

    #[tokio::test]
    async fn honours_retry_after_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 17731, "name": "Black Acrylia Pick"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let started = Instant::now();
        let items = client_for(&server)
            .search_item_by_name("Black Acrylia Pick")
            .await
            .expect("succeeds after retry");

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(items, vec![pick_item()]);
    }

    #[tokio::test]
    async fn rate_limit_retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_item_by_name("Pick")
            .await
            .expect_err("should give up");
        assert!(matches!(err, ClientError::RateLimited { attempts: 3, .. }));
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn server_errors_retry_once_then_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_recipe_by_item_id(17731)
            .await
            .expect_err("should fail");
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn server_error_then_success_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Forge"})))
            .mount(&server)
            .await;

        let item = client_for(&server).fetch_item_by_id(7).await.expect("recovers");
        assert_eq!(item.map(|i| i.name), Some("Forge".to_string()));
    }

    #[tokio::test]
    async fn client_errors_other_than_404_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_item_by_id(7).await.expect_err("fails");
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn malformed_json_is_reported_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_item_by_name("Pick")
            .await
            .expect_err("fails");
        assert!(matches!(err, ClientError::MalformedJson { .. }));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let client = EqdbClient::new("http://127.0.0.1:1", Duration::from_secs(1), fast_policy())
            .expect("client builds");

        let err = client.fetch_item_by_id(1).await.expect_err("fails");
        assert!(matches!(err, ClientError::Transport { .. }));
    }
}
