use async_stream::try_stream;
use futures::Stream;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use crate::document::SearchDocument;
use crate::document::query_excerpt;
use crate::error::SearchError;
use crate::projector::FailureLine;
use crate::settings::DOC_TYPE;
use crate::settings::INDEX_NAME;
use crate::settings::index_settings;

pub const ELASTICSEARCH_URL_ENV_VAR: &str = "ELASTICSEARCH_URL";
pub const ELASTICSEARCH_USERNAME_ENV_VAR: &str = "ELASTICSEARCH_USERNAME";
pub const ELASTICSEARCH_PASSWORD_ENV_VAR: &str = "ELASTICSEARCH_PASSWORD";

/// Page size used by [`SearchClient::iter_all`].
const SCAN_PAGE_SIZE: usize = 100;

/// Cluster location and credentials. Credentials are attached as HTTP basic
/// auth iff both username and password are present; this is the sole auth
/// mechanism.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SearchConfig {
    /// Read the cluster configuration from the environment. Returns `None`
    /// when no cluster URL is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ELASTICSEARCH_URL_ENV_VAR).ok()?;
        Some(Self {
            url,
            username: std::env::var(ELASTICSEARCH_USERNAME_ENV_VAR).ok(),
            password: std::env::var(ELASTICSEARCH_PASSWORD_ENV_VAR).ok(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Index,
    Create,
    Update,
    Delete,
}

impl BulkAction {
    fn as_str(self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Create => "create",
            BulkAction::Update => "update",
            BulkAction::Delete => "delete",
        }
    }
}

/// Thin, opinionated client for the failure-line index.
///
/// One client per process is the expected shape: it is cheap to clone and
/// reuses its HTTP connection pool across calls.
#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: String,
    http: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let mut base_url = config.url;
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let http = reqwest::Client::builder().build()?;
        // Partial credentials connect anonymously.
        let (username, password) = match (config.username, config.password) {
            (Some(username), Some(password)) => (Some(username), Some(password)),
            _ => (None, None),
        };
        Ok(Self {
            base_url,
            http,
            username,
            password,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let request = self.http.request(method, url);
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => request.basic_auth(username, Some(password)),
            _ => request,
        }
    }

    /// Delete the index if present (absence is ignored) and recreate it
    /// with the canonical settings. The same settings always yield the same
    /// mapping, so calling this repeatedly is idempotent.
    pub async fn reinit(&self) -> Result<(), SearchError> {
        let response = self
            .request(Method::DELETE, &format!("/{INDEX_NAME}"))
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::NOT_FOUND && !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_create(format!(
                "delete before create failed: {status}; body={body}"
            )));
        }

        let response = self
            .request(Method::PUT, &format!("/{INDEX_NAME}"))
            .json(&index_settings())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_create(format!(
                "{status}; body={body}"
            )));
        }
        debug!("reinitialized index {INDEX_NAME}");
        Ok(())
    }

    /// Apply `action` to every projected document in `items`, skipping
    /// `None` projections. Returns the number of successfully applied
    /// items. An empty action list returns 0 without a network call.
    /// Partial failures are not retried here; the count surfaces them.
    pub async fn bulk<I>(&self, items: I, action: BulkAction) -> Result<usize, SearchError>
    where
        I: IntoIterator<Item = Option<SearchDocument>>,
    {
        let mut body = String::new();
        let mut submitted = 0usize;
        for doc in items.into_iter().flatten() {
            let header = json!({
                action.as_str(): {"_index": INDEX_NAME, "_type": DOC_TYPE, "_id": doc.id}
            });
            body.push_str(&header.to_string());
            body.push('\n');
            match action {
                BulkAction::Delete => {}
                BulkAction::Update => {
                    let wrapped = json!({ "doc": doc });
                    body.push_str(&wrapped.to_string());
                    body.push('\n');
                }
                BulkAction::Index | BulkAction::Create => {
                    let encoded = serde_json::to_string(&doc)
                        .map_err(|err| SearchError::Decode(err.to_string()))?;
                    body.push_str(&encoded);
                    body.push('\n');
                }
            }
            submitted += 1;
        }
        if submitted == 0 {
            return Ok(0);
        }

        let response = self
            .request(Method::POST, "/_bulk")
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Decode(format!("bulk failed: {status}")));
        }
        let payload: Value = response.json().await?;
        let applied = payload["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        // Each item is a single-key object keyed by the action.
                        item.as_object()
                            .and_then(|op| op.values().next())
                            .and_then(|result| result["status"].as_u64())
                            .is_some_and(|code| code < 300)
                    })
                    .count()
            })
            .unwrap_or(0);
        debug!("bulk {}: {applied}/{submitted} applied", action.as_str());
        Ok(applied)
    }

    /// Single-document upsert by id. A `None` projection is a no-op.
    pub async fn index(&self, doc: Option<&SearchDocument>) -> Result<(), SearchError> {
        let Some(doc) = doc else {
            return Ok(());
        };
        let response = self
            .request(Method::PUT, &format!("/{INDEX_NAME}/{DOC_TYPE}/{}", doc.id))
            .json(doc)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Decode(format!(
                "index of document {} failed: {status}",
                doc.id
            )));
        }
        Ok(())
    }

    /// Force index visibility. Must be called before any read that has to
    /// reflect preceding writes in the same orchestration step.
    pub async fn refresh(&self) -> Result<(), SearchError> {
        let response = self
            .request(Method::POST, &format!("/{INDEX_NAME}/_refresh"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Decode(format!("refresh failed: {status}")));
        }
        Ok(())
    }

    /// Authoritative document count. Refreshes first so the count cannot
    /// lag behind writes issued earlier in the same step.
    pub async fn count(&self) -> Result<u64, SearchError> {
        self.refresh().await?;
        let response = self
            .request(Method::GET, &format!("/{INDEX_NAME}/_count"))
            .send()
            .await?;
        let payload: Value = response.json().await?;
        payload["count"]
            .as_u64()
            .ok_or_else(|| SearchError::Decode(format!("count envelope missing count: {payload}")))
    }

    /// Fetch one document by id. A missing document surfaces as
    /// [`SearchError::NotFound`].
    pub async fn get(&self, id: i64) -> Result<SearchDocument, SearchError> {
        let response = self
            .request(Method::GET, &format!("/{INDEX_NAME}/{DOC_TYPE}/{id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SearchError::NotFound { id });
        }
        let payload: Value = response.json().await?;
        serde_json::from_value(payload["_source"].clone())
            .map_err(|err| SearchError::Decode(format!("document {id}: {err}")))
    }

    /// Execute a structured query, returning the `_source` payloads with
    /// hit metadata stripped.
    pub async fn search(&self, query: Value) -> Result<Vec<Value>, SearchError> {
        let envelope = self.raw_query(query).await?;
        let hits = envelope["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(hits
            .into_iter()
            .map(|mut hit| hit["_source"].take())
            .collect())
    }

    /// Execute a structured query, returning the full hit envelope.
    pub async fn raw_query(&self, query: Value) -> Result<Value, SearchError> {
        let response = self
            .request(Method::POST, &format!("/{INDEX_NAME}/_search"))
            .json(&query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Decode(format!(
                "search failed: {status}; body={body}"
            )));
        }
        Ok(response.json().await?)
    }

    /// Lazy stream over every document in the index, in match-all order.
    pub fn iter_all(&self) -> impl Stream<Item = Result<SearchDocument, SearchError>> + '_ {
        try_stream! {
            let mut from = 0usize;
            loop {
                let query = json!({
                    "query": {"match_all": {}},
                    "from": from,
                    "size": SCAN_PAGE_SIZE,
                });
                let sources = self.search(query).await?;
                let fetched = sources.len();
                for source in sources {
                    let doc: SearchDocument = serde_json::from_value(source)
                        .map_err(|err| SearchError::Decode(err.to_string()))?;
                    yield doc;
                }
                if fetched < SCAN_PAGE_SIZE {
                    break;
                }
                from += fetched;
            }
        }
    }
}

/// Phrase-match query over `message`, truncated to the query excerpt
/// length. The analyzed query tokens must occur contiguously and in order.
pub fn phrase_query(message: &str) -> Value {
    json!({
        "query": {
            "match_phrase": {
                "message": query_excerpt(message),
            },
        },
    })
}

/// The retrieval query used to find an existing classified failure that
/// matches `line`: exact filters on test/status/expected (and subtest when
/// set), restricted to documents that carry a classification, with the
/// message as a phrase query. Returns `None` for lines that cannot be
/// matched (legacy test shape or empty message).
pub fn best_match_query(line: &FailureLine) -> Option<Value> {
    let test = line.test.as_str()?;
    if line.message.is_empty() {
        return None;
    }
    let mut filters = vec![
        json!({"term": {"test": test}}),
        json!({"term": {"status": line.status}}),
        json!({"term": {"expected": line.expected}}),
        json!({"exists": {"field": "best_classification"}}),
    ];
    if let Some(subtest) = line.subtest.as_option() {
        filters.push(json!({"term": {"subtest": subtest}}));
    }
    Some(json!({
        "query": {
            "bool": {
                "filter": filters,
                "must": [{
                    "match_phrase": {
                        "message": query_excerpt(&line.message),
                    },
                }],
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::document::Subtest;
    use pretty_assertions::assert_eq;

    fn line(test: Value, subtest: Subtest, message: &str) -> FailureLine {
        FailureLine {
            id: 1,
            job_guid: "g1".to_string(),
            test,
            subtest,
            status: "FAIL".to_string(),
            expected: "PASS".to_string(),
            message: message.to_string(),
            best_classification: None,
            best_is_verified: false,
        }
    }

    #[test]
    fn phrase_query_truncates_to_excerpt_length() {
        let message = "a".repeat(2000);
        let query = phrase_query(&message);
        let phrase = query["query"]["match_phrase"]["message"].as_str().unwrap();
        assert_eq!(phrase.len(), crate::document::QUERY_MESSAGE_CHARS);
    }

    #[test]
    fn best_match_query_includes_subtest_filter_only_when_set() {
        let without = best_match_query(&line(
            json!("t"),
            Subtest::Present(None),
            "boom",
        ))
        .unwrap();
        let filters = without["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 4);

        let with = best_match_query(&line(
            json!("t"),
            Subtest::Present(Some("sub".to_string())),
            "boom",
        ))
        .unwrap();
        let filters = with["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 5);
        assert_eq!(filters[4], json!({"term": {"subtest": "sub"}}));
    }

    #[test]
    fn best_match_query_rejects_unmatchable_lines() {
        assert!(best_match_query(&line(json!([0, "foo"]), Subtest::Absent, "boom")).is_none());
        assert!(best_match_query(&line(json!("t"), Subtest::Absent, "")).is_none());
    }
}
