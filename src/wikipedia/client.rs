use std::time::Duration;

use futures::future::join_all;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::types::{ApiError, ExtractResponse, Passage, SearchResponse};

/// Upper bound on passages per question.
pub const MAX_RESULTS: usize = 5;
/// Upper bound on characters kept from each passage.
pub const MAX_PASSAGE_CHARS: usize = 2000;
/// Longer search strings are cut before they reach `srsearch`.
const MAX_QUERY_CHARS: usize = 300;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Characters to percent-encode in article titles when building page links.
const TITLE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>');

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("status {0}")]
    Status(u16),

    #[error("invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Bounds on what a single retrieval may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    pub max_results: usize,
    pub max_chars: usize,
}

impl RetrievalLimits {
    /// Values are clamped to `1..=MAX_RESULTS` and `1..=MAX_PASSAGE_CHARS`.
    pub fn new(max_results: usize, max_chars: usize) -> Self {
        Self {
            max_results: max_results.clamp(1, MAX_RESULTS),
            max_chars: max_chars.clamp(1, MAX_PASSAGE_CHARS),
        }
    }
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self::new(MAX_RESULTS, MAX_PASSAGE_CHARS)
    }
}

/// Keyword document search used for grounding context.
/// Implemented by `WikipediaClient` for production; mock implementations used in tests.
pub trait Retriever {
    async fn retrieve(
        &self,
        query: &str,
        limits: RetrievalLimits,
    ) -> Result<Vec<Passage>, RetrieveError>;
}

#[derive(Clone)]
pub struct WikipediaClient {
    http: Client,
    lang: String,
    endpoint: String,
}

impl WikipediaClient {
    pub fn new(http: Client, lang: &str) -> Self {
        let endpoint = format!("https://{lang}.wikipedia.org/w/api.php");
        Self::with_endpoint(http, lang, &endpoint)
    }

    pub fn with_endpoint(http: Client, lang: &str, endpoint: &str) -> Self {
        Self {
            http,
            lang: lang.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, RetrieveError> {
        let mut url = Url::parse_with_params(&self.endpoint, params)?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("formatversion", "2");

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Wikipedia API error");
            return Err(RetrieveError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, RetrieveError> {
        let limit = limit.to_string();
        let body: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("srprop", ""),
            ])
            .await?;

        if let Some(err) = body.error {
            return Err(classify_api_error(err));
        }

        Ok(body
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn fetch_extract(&self, title: &str) -> Result<Option<Passage>, RetrieveError> {
        let body: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        if let Some(err) = body.error {
            return Err(classify_api_error(err));
        }

        let passage = body
            .query
            .into_iter()
            .flat_map(|q| q.pages)
            .filter(|page| !page.missing)
            .find_map(|page| {
                let text = page.extract.filter(|t| !t.trim().is_empty())?;
                Some(Passage {
                    url: page_url(&self.lang, &page.title),
                    title: page.title,
                    text,
                })
            });

        Ok(passage)
    }
}

impl Retriever for WikipediaClient {
    async fn retrieve(
        &self,
        query: &str,
        limits: RetrievalLimits,
    ) -> Result<Vec<Passage>, RetrieveError> {
        let search = truncate_chars(query, MAX_QUERY_CHARS);
        let mut titles = self.search_titles(&search, limits.max_results).await?;
        titles.truncate(limits.max_results);

        if titles.is_empty() {
            debug!(query, "no Wikipedia results");
            return Ok(Vec::new());
        }

        let outcomes = join_all(titles.iter().map(|t| self.fetch_extract(t))).await;

        let mut passages = Vec::with_capacity(titles.len());
        for (title, outcome) in titles.iter().zip(outcomes) {
            match outcome {
                Ok(Some(mut passage)) => {
                    passage.text = truncate_chars(&passage.text, limits.max_chars);
                    passages.push(passage);
                }
                Ok(None) => debug!(%title, "page has no extract, skipping"),
                Err(e) => warn!(%title, error = %e, "failed to fetch page (continuing with other results)"),
            }
        }

        debug!(query, passages = passages.len(), "wikipedia retrieval complete");
        Ok(passages)
    }
}

fn classify_api_error(err: ApiError) -> RetrieveError {
    let code = err.code.unwrap_or_else(|| "unknown".to_string());
    let message = err.info.unwrap_or_else(|| "Unknown error".to_string());
    warn!(%code, %message, "Wikipedia API error in response body");
    RetrieveError::Api { code, message }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn page_url(lang: &str, title: &str) -> String {
    let slug = title.replace(' ', "_");
    format!(
        "https://{lang}.wikipedia.org/wiki/{}",
        utf8_percent_encode(&slug, TITLE_ENCODE_SET)
    )
}
