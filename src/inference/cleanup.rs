/// Stray turn delimiters some instruction-tuned models leak into their output.
const STRAY_TOKENS: [&str; 2] = ["[/USER]", "[/ASS]"];

/// Post-processing applied to a completion before it is shown and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostProcess {
    #[default]
    Raw,
    Trim,
    StripStrayTokens,
}

impl PostProcess {
    pub fn apply(self, completion: String) -> String {
        match self {
            PostProcess::Raw => completion,
            PostProcess::Trim => completion.trim().to_string(),
            PostProcess::StripStrayTokens => strip_stray_tokens(&completion),
        }
    }
}

/// Removes every stray delimiter token, then trims the ends. Inner whitespace is kept.
pub fn strip_stray_tokens(text: &str) -> String {
    let mut cleaned = text.to_string();
    for token in STRAY_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_string()
}
