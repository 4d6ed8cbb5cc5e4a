use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::cli::Args;
use crate::destination::{Destination, Destinations};
use crate::inference::GenerationParams;
use crate::inference::client::{API_BASE, MAX_OUTPUT_TOKENS};
use crate::revision::Revision;
use crate::wikipedia::RetrievalLimits;

/// Environment variables checked for the access token, in order.
const TOKEN_VARS: [&str; 2] = ["HF_TOKEN", "HUGGINGFACEHUB_API_TOKEN"];
const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown destination '{0}'. Run with --list-destinations to see valid names.")]
    UnknownDestination(String),

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must use http or https, got '{scheme}'")]
    UnsupportedScheme { name: &'static str, scheme: String },

    #[error("'{0}' is not a Wikipedia language code (letters, digits, or '-')")]
    InvalidWikiLang(String),

    #[error("cannot read secrets file {}: {source}", path.display())]
    SecretsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed secrets file {}: {source}", path.display())]
    SecretsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Bearer token for the inference endpoint. Never printed.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Settings for one session, resolved once at startup.
///
/// Sources, highest priority first:
/// - command-line flags
/// - `HF_TOKEN` / `HUGGINGFACEHUB_API_TOKEN`, `HF_MODEL`
/// - `HF_TOKEN` in a TOML secrets file
/// - the selected revision's defaults
///
/// `HF_INFERENCE_BASE_URL` and `WIKIPEDIA_BASE_URL` override the service endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<Token>,
    pub model: String,
    pub revision: Revision,
    pub destination: Destination,
    pub generation: GenerationParams,
    pub limits: RetrievalLimits,
    pub wiki_lang: String,
    pub wikipedia_endpoint: Option<String>,
    pub inference_base: String,
    pub show_context: bool,
}

impl Config {
    pub fn from_env(args: &Args, destinations: &Destinations) -> Result<Self, ConfigError> {
        Self::resolve(args, destinations, |key| env::var(key).ok())
    }

    fn resolve(
        args: &Args,
        destinations: &Destinations,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let destination = destinations
            .find(&args.destination)
            .ok_or_else(|| ConfigError::UnknownDestination(args.destination.clone()))?;

        let wiki_lang = validate_wiki_lang(&args.wiki_lang)?;
        let token = resolve_token(args, &lookup)?;

        let model = non_blank(args.model.clone())
            .or_else(|| non_blank(lookup("HF_MODEL")))
            .unwrap_or_else(|| args.revision.default_model().to_string());

        let generation = GenerationParams::new(
            args.max_tokens.unwrap_or(MAX_OUTPUT_TOKENS),
            args.temperature
                .unwrap_or_else(|| args.revision.temperature()),
        );

        let inference_base = match non_blank(lookup("HF_INFERENCE_BASE_URL")) {
            Some(raw) => validate_base_url("HF_INFERENCE_BASE_URL", &raw)?,
            None => API_BASE.to_string(),
        };
        let wikipedia_endpoint = non_blank(lookup("WIKIPEDIA_BASE_URL"))
            .map(|raw| validate_base_url("WIKIPEDIA_BASE_URL", &raw))
            .transpose()?;

        debug!(
            revision = ?args.revision,
            %model,
            %destination,
            has_token = token.is_some(),
            "configuration resolved"
        );

        Ok(Self {
            token,
            model,
            revision: args.revision,
            destination,
            generation,
            limits: RetrievalLimits::new(args.results, args.chars),
            wiki_lang,
            wikipedia_endpoint,
            inference_base,
            show_context: args.show_context,
        })
    }
}

fn resolve_token(
    args: &Args,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<Token>, ConfigError> {
    if let Some(token) = args.token.as_deref().and_then(Token::new) {
        debug!("token from command line");
        return Ok(Some(token));
    }

    for var in TOKEN_VARS {
        if let Some(token) = lookup(var).as_deref().and_then(Token::new) {
            debug!(source = var, "token from environment");
            return Ok(Some(token));
        }
    }

    let path = match &args.secrets {
        Some(path) => path.clone(),
        None => {
            let default = PathBuf::from(DEFAULT_SECRETS_PATH);
            if !default.is_file() {
                return Ok(None);
            }
            default
        }
    };
    read_secrets(&path)
}

#[derive(Deserialize)]
struct Secrets {
    #[serde(rename = "HF_TOKEN")]
    hf_token: Option<String>,
}

fn read_secrets(path: &Path) -> Result<Option<Token>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::SecretsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let secrets: Secrets = toml::from_str(&text).map_err(|source| ConfigError::SecretsParse {
        path: path.to_path_buf(),
        source,
    })?;
    let token = secrets.hf_token.as_deref().and_then(Token::new);
    if token.is_some() {
        debug!(path = %path.display(), "token from secrets file");
    }
    Ok(token)
}

fn validate_base_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source })?;
    match parsed.scheme() {
        "https" => {}
        "http" => warn!(name, "endpoint override is not HTTPS"),
        other => {
            return Err(ConfigError::UnsupportedScheme {
                name,
                scheme: other.to_string(),
            });
        }
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Language codes become part of the host name (`{lang}.wikipedia.org`).
fn validate_wiki_lang(raw: &str) -> Result<String, ConfigError> {
    let lang = raw.trim();
    let valid = !lang.is_empty()
        && !lang.starts_with('-')
        && !lang.ends_with('-')
        && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(ConfigError::InvalidWikiLang(raw.to_string()));
    }
    Ok(lang.to_ascii_lowercase())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
