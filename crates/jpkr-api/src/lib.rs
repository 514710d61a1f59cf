// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use jpkr_grid::{Column, ColumnKind, Row, RowId};
use log::info;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resource {
    #[default]
    Words,
    Examples,
}

impl Resource {
    pub const ALL: [Self; 2] = [Self::Words, Self::Examples];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Examples => "examples",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|resource| resource.as_str() == value)
    }

    /// Label of the bulk embedding action offered on selected rows.
    pub const fn action_label(self) -> &'static str {
        "임베딩 생성"
    }

    /// Columns shown for this resource, in display order.
    pub fn columns(self) -> Vec<Column> {
        match self {
            Self::Words => vec![
                Column::new("id", "ID").read_only().with_kind(ColumnKind::Number),
                Column::new("lemma_id", "원형 ID").with_kind(ColumnKind::Number),
                Column::new("lemma", "원형"),
                Column::new("jp_pron", "일본어 발음"),
                Column::new("kr_pron", "한국어 발음"),
                Column::new("kr_mean", "의미"),
                Column::new("level", "레벨"),
                Column::new("num_examples", "예문 수")
                    .read_only()
                    .with_kind(ColumnKind::Number),
                Column::new("has_embedding", "임베딩 보유")
                    .read_only()
                    .with_kind(ColumnKind::Bool),
            ],
            Self::Examples => vec![
                Column::new("id", "ID").read_only().with_kind(ColumnKind::Number),
                Column::new("tags", "태그"),
                Column::new("jp_text", "일본어 텍스트"),
                Column::new("kr_mean", "한국어 의미"),
                Column::new("en_prompt", "프롬프트"),
                Column::new("num_words", "단어 수")
                    .read_only()
                    .with_kind(ColumnKind::Number),
                Column::new("has_audio", "음성 보유")
                    .read_only()
                    .with_kind(ColumnKind::Bool),
                Column::new("has_image", "이미지 보유")
                    .read_only()
                    .with_kind(ColumnKind::Bool),
                Column::new("has_embedding", "임베딩 보유")
                    .read_only()
                    .with_kind(ColumnKind::Bool),
            ],
        }
    }
}

/// One page of rows plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<Row>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WordFilter {
    pub levels: Option<Vec<String>>,
    pub min_examples: Option<u32>,
    pub max_examples: Option<u32>,
    pub has_embedding: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExampleFilter {
    pub min_words: Option<u32>,
    pub max_words: Option<u32>,
    pub has_en_prompt: Option<bool>,
    pub has_embedding: Option<bool>,
    pub has_audio: Option<bool>,
    pub has_image: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterRequest {
    Words(WordFilter),
    Examples(ExampleFilter),
}

impl FilterRequest {
    const fn resource(&self) -> Resource {
        match self {
            Self::Words(_) => Resource::Words,
            Self::Examples(_) => Resource::Examples,
        }
    }
}

/// Blocking client for one vocabulary resource of the admin API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    resource: Resource,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, resource: Resource, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if parsed.cannot_be_a_base() {
            bail!("api.base_url {base_url:?} must be an http(s) URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            resource,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_page(&self, limit: usize, offset: usize) -> Result<Page> {
        info!(
            "list {} limit={limit} offset={offset}",
            self.resource.as_str()
        );
        let body = serde_json::json!({ "limit": limit, "offset": offset });
        let listing: Listing = self.send(self.http.post(self.url(&["all"])?).json(&body))?;
        Ok(listing.into_page())
    }

    pub fn filter(&self, request: &FilterRequest) -> Result<Page> {
        if request.resource() != self.resource {
            bail!(
                "{} filter sent to the {} client",
                request.resource().as_str(),
                self.resource.as_str()
            );
        }
        info!("filter {}", self.resource.as_str());
        let url = self.admin_url("filter")?;
        let listing: Listing = self.send(self.http.post(url).json(request))?;
        Ok(listing.into_page())
    }

    pub fn search(&self, term: &str) -> Result<Page> {
        let term = term.trim();
        if term.is_empty() {
            bail!("search term must not be empty");
        }
        info!("search {} for {term:?}", self.resource.as_str());
        let listing: Listing = self.send(self.http.get(self.url(&["search", term])?))?;
        Ok(listing.into_page())
    }

    pub fn create_batch(&self, rows: &[Row]) -> Result<()> {
        info!("create {} {}", rows.len(), self.resource.as_str());
        self.post_batch(self.url(&["create", "batch"])?, rows)
    }

    pub fn update_batch(&self, rows: &[Row]) -> Result<()> {
        info!("update {} {}", rows.len(), self.resource.as_str());
        self.post_batch(self.url(&["update", "batch"])?, rows)
    }

    pub fn delete_batch(&self, ids: &[RowId]) -> Result<()> {
        info!("delete {} {}", ids.len(), self.resource.as_str());
        self.post_batch(self.url(&["delete", "batch"])?, ids)
    }

    pub fn gen_embeddings(&self, ids: &[RowId]) -> Result<()> {
        info!(
            "generate embeddings for {} {}",
            ids.len(),
            self.resource.as_str()
        );
        self.post_batch(self.admin_url("gen-embeddings")?, ids)
    }

    fn post_batch<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<()> {
        let _: serde_json::Value = self.send(self.http.post(url).json(body))?;
        Ok(())
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let text = response.text().context("read response body")?;
        if text.trim().is_empty() {
            return serde_json::from_str("null").context("decode empty response");
        }
        serde_json::from_str(&text)
            .with_context(|| format!("decode {} response", self.resource.as_str()))
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut path = vec![self.resource.as_str()];
        path.extend_from_slice(segments);
        self.join(&path)
    }

    fn admin_url(&self, operation: &str) -> Result<Url> {
        self.join(&["admin", self.resource.as_str(), operation])
    }

    fn join(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("parse base url {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("base url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// List endpoints answer with an envelope keyed by resource name, or with a
/// bare array for searches.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Rows(Vec<Row>),
    Envelope(Envelope),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(alias = "words", alias = "examples", default)]
    items: Vec<Row>,
    total_count: Option<usize>,
}

impl Listing {
    fn into_page(self) -> Page {
        match self {
            Self::Rows(items) => Page {
                total_count: items.len(),
                items,
            },
            Self::Envelope(envelope) => Page {
                total_count: envelope.total_count.unwrap_or(envelope.items.len()),
                items: envelope.items,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<serde_json::Value>,
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check that the vocabulary API is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(detail) = parsed.detail
        && let Some(message) = detail_message(&detail)
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

// Validation failures carry a list of {loc, msg} objects instead of a string.
fn detail_message(detail: &serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(message) if !message.is_empty() => Some(message.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Listing, Resource, clean_error_response};
    use reqwest::StatusCode;

    #[test]
    fn resource_names_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(Resource::parse(resource.as_str()), Some(resource));
        }
        assert_eq!(Resource::parse("kanji"), None);
    }

    #[test]
    fn both_resources_lead_with_a_read_only_id() {
        for resource in Resource::ALL {
            let columns = resource.columns();
            assert_eq!(columns[0].key, "id");
            assert!(!columns[0].editable);
        }
    }

    #[test]
    fn listing_accepts_resource_keyed_envelopes_and_bare_arrays() -> anyhow::Result<()> {
        let words: Listing =
            serde_json::from_str(r#"{"words":[{"id":1,"lemma":"猫"}],"total_count":40}"#)?;
        let page = words.into_page();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 40);

        let bare: Listing = serde_json::from_str(r#"[{"id":2},{"id":3}]"#)?;
        assert_eq!(bare.into_page().total_count, 2);
        Ok(())
    }

    #[test]
    fn error_detail_is_surfaced() {
        let error = clean_error_response(StatusCode::NOT_FOUND, r#"{"detail":"Word not found"}"#);
        assert_eq!(error.to_string(), "server error (404): Word not found");

        let error = clean_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body",0],"msg":"field required"}]}"#,
        );
        assert!(error.to_string().contains("field required"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "");
        assert_eq!(error.to_string(), "server returned 502");
    }
}
