//! Firestore over its REST v1 API.
//!
//! Documents are addressed as
//! `projects/{project}/databases/(default)/documents/news/{namespace}/{category}/{id}`.
//! JSON values are mapped onto Firestore's typed value envelopes
//! (`stringValue`, `integerValue`, `mapValue`, ...); timestamps travel as
//! RFC 3339 strings so that stored documents read back exactly as written.

use super::{DocumentStore, StoredDoc, parse_timestamp};
use crate::error::{PipelineError, Result};
use crate::utils::truncate_for_log;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: &str = "300";
const ROOT_COLLECTION: &str = "news";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(project: &str, token: Option<String>, base_url: Option<&str>) -> Result<Self> {
        if project.trim().is_empty() {
            return Err(PipelineError::Config("Firestore project id is required".into()));
        }
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let base = Url::parse(&format!(
            "{base}/projects/{project}/databases/(default)/documents/"
        ))?;
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, base, token })
    }

    fn collection_url(&self, namespace: &str, category: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::Store("Firestore base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend([ROOT_COLLECTION, namespace, category]);
        Ok(url)
    }

    fn document_url(&self, namespace: &str, category: &str, id: &str) -> Result<Url> {
        let mut url = self.collection_url(namespace, category)?;
        url.path_segments_mut()
            .map_err(|_| PipelineError::Store("Firestore base URL cannot hold a path".into()))?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PipelineError::Store(format!(
        "Firestore {what} failed ({status}): {}",
        truncate_for_log(&body, 300)
    )))
}

impl DocumentStore for FirestoreStore {
    #[instrument(level = "debug", skip(self))]
    async fn list(&self, namespace: &str, category: &str) -> Result<Vec<StoredDoc>> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.collection_url(namespace, category)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", PAGE_SIZE);
                query.append_pair("mask.fieldPaths", "publishedAt");
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let response = self.request(Method::GET, url).send().await?;
            let page: ListResponse = check(response, "list").await?.json().await?;

            docs.extend(page.documents.into_iter().map(|doc| StoredDoc {
                id: doc.name.rsplit('/').next().unwrap_or_default().to_string(),
                published_at: doc
                    .fields
                    .get("publishedAt")
                    .and_then(decode_value)
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(parse_timestamp),
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        debug!(count = docs.len(), "Listed Firestore documents");
        Ok(docs)
    }

    async fn set(&self, namespace: &str, category: &str, id: &str, doc: &Value) -> Result<()> {
        let Value::Object(fields) = doc else {
            return Err(PipelineError::Store("only JSON objects can be stored".into()));
        };
        let url = self.document_url(namespace, category, id)?;
        let body = json!({ "fields": encode_fields(fields) });
        let response = self.request(Method::PATCH, url).json(&body).send().await?;
        check(response, "write").await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, category: &str, id: &str) -> Result<()> {
        let url = self.document_url(namespace, category, id)?;
        let response = self.request(Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response, "delete").await?;
        Ok(())
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Wrap a JSON value in Firestore's typed envelope.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Inverse of [`encode_value`]. Timestamps decode to their RFC 3339 text.
pub fn decode_value(value: &Value) -> Option<Value> {
    let (kind, inner) = value.as_object()?.iter().next()?;
    Some(match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool()?),
        "integerValue" => {
            let n: i64 = match inner {
                Value::String(s) => s.parse().ok()?,
                other => other.as_i64()?,
            };
            Value::from(n)
        }
        "doubleValue" => Value::from(inner.as_f64()?),
        "stringValue" | "timestampValue" => Value::String(inner.as_str()?.to_string()),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|(k, v)| Some((k.clone(), decode_value(v)?)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_urls() {
        let store = FirestoreStore::new("news-app", None, None).unwrap();
        assert_eq!(
            store.collection_url("tamil", "cinema").unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/news-app/databases/(default)/documents/news/tamil/cinema"
        );
        assert_eq!(
            store.document_url("tamil", "cinema", "abc123").unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/news-app/databases/(default)/documents/news/tamil/cinema/abc123"
        );
    }

    #[test]
    fn test_custom_base_url_for_emulator() {
        let store = FirestoreStore::new("demo", None, Some("http://localhost:8080/v1/")).unwrap();
        assert!(
            store
                .collection_url("tamil", "sports")
                .unwrap()
                .as_str()
                .starts_with("http://localhost:8080/v1/projects/demo/")
        );
    }

    #[test]
    fn test_empty_project_rejected() {
        assert!(matches!(
            FirestoreStore::new(" ", None, None),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_encode_article_fields() {
        let doc = json!({
            "title": "சென்னையில் இன்று தங்கம் விலை உயர்வு",
            "count": 3,
            "score": 0.5,
            "tags": ["a"],
            "meta": { "ok": true, "none": null }
        });
        let encoded = encode_value(&doc);
        let fields = &encoded["mapValue"]["fields"];
        assert_eq!(fields["title"]["stringValue"], "சென்னையில் இன்று தங்கம் விலை உயர்வு");
        assert_eq!(fields["count"]["integerValue"], "3");
        assert_eq!(fields["score"]["doubleValue"], 0.5);
        assert_eq!(fields["tags"]["arrayValue"]["values"][0]["stringValue"], "a");
        assert_eq!(fields["meta"]["mapValue"]["fields"]["ok"]["booleanValue"], true);

        assert_eq!(decode_value(&encoded), Some(doc));
    }

    #[test]
    fn test_decode_timestamp_as_text() {
        let raw = json!({ "timestampValue": "2025-10-06T09:00:00Z" });
        assert_eq!(decode_value(&raw), Some(json!("2025-10-06T09:00:00Z")));
        assert_eq!(decode_value(&json!({ "geoPointValue": {} })), None);
    }
}
