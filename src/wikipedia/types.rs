use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub query: Option<SearchQuery>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractResponse {
    pub query: Option<ExtractQuery>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub title: String,
    pub extract: Option<String>,
    #[serde(default)]
    pub missing: bool,
}

/// MediaWiki reports API errors in the body, usually with HTTP 200.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<String>,
    pub info: Option<String>,
}

/// A short text snippet retrieved as grounding context for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub title: String,
    pub url: String,
    pub text: String,
}
