//! Record sources shipped with the exporter.
//!
//! - [`JsonRecordSource`]: a content dump (`{"<content type>": [records...]}`)
//!   held in memory.
//! - [`HttpRecordSource`]: a content service answering paged record queries
//!   over HTTP.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info};

use crate::contract::{FilterSpec, Record, RecordSource, SourceError};

/// In-memory store, each content type sorted by title (ties by id).
#[derive(Debug, Clone, Default)]
pub struct JsonRecordSource {
    types: HashMap<String, Vec<Record>>,
}

impl JsonRecordSource {
    pub fn new(types: HashMap<String, Vec<Record>>) -> Self {
        let types = types
            .into_iter()
            .map(|(kind, mut records)| {
                records.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
                (kind, records)
            })
            .collect();
        Self { types }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading record dump");
        let content = fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read record dump");
            e
        })?;
        let types: HashMap<String, Vec<Record>> = serde_json::from_str(&content).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to parse record dump");
            e
        })?;
        info!(
            content_types = types.len(),
            records = types.values().map(Vec::len).sum::<usize>(),
            "Loaded record dump"
        );
        Ok(Self::new(types))
    }
}

#[async_trait]
impl RecordSource for JsonRecordSource {
    async fn query(
        &self,
        kind: &str,
        filter: &FilterSpec,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SourceError> {
        let Some(records) = self.types.get(kind) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn kind_exists(&self, kind: &str) -> Result<bool, SourceError> {
        Ok(self.types.contains_key(kind))
    }
}

/// Content service reached over HTTP.
///
/// `GET <base>/<kind>?offset=&limit=&orderby=title&order=asc[&hook_type=a,b]`
/// returns a JSON array of records; a `404` on `HEAD <base>/<kind>` means the
/// content type does not exist.
pub struct HttpRecordSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRecordSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn kind_url(&self, kind: &str) -> String {
        format!("{}/{}", self.base_url, kind)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Query string of a record query.
pub fn query_params(
    filter: &FilterSpec,
    offset: usize,
    limit: Option<usize>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("offset", offset.to_string())];
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params.push(("orderby", "title".to_string()));
    params.push(("order", "asc".to_string()));
    if let FilterSpec::HookTypes(values) = filter {
        params.push(("hook_type", values.join(",")));
    }
    params
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn query(
        &self,
        kind: &str,
        filter: &FilterSpec,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SourceError> {
        let url = self.kind_url(kind);
        let params = query_params(filter, offset, limit);
        debug!(url = %url, ?params, "Querying content service");

        let response = self
            .authorize(self.client.get(&url).query(&params))
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach content service");
                e
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, url = %url, "Content service returned error. Response body: {body}");
            return Err(format!("content service returned {status} for {url}").into());
        }
        Ok(response.json::<Vec<Record>>().await?)
    }

    async fn kind_exists(&self, kind: &str) -> Result<bool, SourceError> {
        let url = self.kind_url(kind);
        let response = self.authorize(self.client.head(&url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                error!(status = %status, url = %url, "Unexpected status probing content type");
                Err(format!("content service returned {status} for {url}").into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, title: &str, hook_type: Option<&str>) -> Record {
        Record {
            id,
            title: title.to_string(),
            permalink: format!("https://e.org/{}/", title.to_lowercase()),
            source_file: None,
            name: title.to_lowercase(),
            hook_type: hook_type.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn json_source_orders_by_title_and_pages() {
        let source = JsonRecordSource::new(HashMap::from([(
            "post".to_string(),
            vec![record(3, "Gamma", None), record(1, "Alpha", None), record(2, "Beta", None)],
        )]));

        let page = source.query("post", &FilterSpec::All, 1, Some(1)).await.unwrap();
        assert_eq!(page[0].title, "Beta");
        let all = source.query("post", &FilterSpec::All, 0, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(source.query("post", &FilterSpec::All, 3, Some(2)).await.unwrap().is_empty());
        assert!(source.kind_exists("post").await.unwrap());
        assert!(!source.kind_exists("page").await.unwrap());
    }

    #[tokio::test]
    async fn json_source_applies_hook_filter_before_paging() {
        let source = JsonRecordSource::new(HashMap::from([(
            "wp-parser-hook".to_string(),
            vec![
                record(1, "A", Some("filter")),
                record(2, "B", Some("action")),
                record(3, "C", Some("action_reference")),
            ],
        )]));
        let filter = FilterSpec::HookTypes(vec!["action".into(), "action_reference".into()]);
        let page = source.query("wp-parser-hook", &filter, 1, Some(5)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "C");
    }

    #[test]
    fn http_query_params() {
        let filter = FilterSpec::HookTypes(vec!["filter".into(), "filter_reference".into()]);
        assert_eq!(
            query_params(&filter, 20, Some(10)),
            vec![
                ("offset", "20".to_string()),
                ("limit", "10".to_string()),
                ("orderby", "title".to_string()),
                ("order", "asc".to_string()),
                ("hook_type", "filter,filter_reference".to_string()),
            ]
        );
        assert_eq!(query_params(&FilterSpec::All, 0, None).len(), 3);
    }
}
