use clap::ValueEnum;

use crate::inference::PostProcess;
use crate::prompt::PromptTemplate;
use crate::query::QueryStyle;

/// One of the guide's historical configurations. Each bundles a choice for every
/// pipeline stage plus default generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Revision {
    /// Warm local-friend persona, plain query, zephyr.
    #[default]
    Warm,
    /// Short persona, "in <country>" query, Mistral with delimiter cleanup.
    Classic,
    /// Emoji and bullet-point answers, "in <country>" query.
    Emoji,
    /// System + user messages, Llama 3.
    Chat,
}

impl Revision {
    pub fn query_style(self) -> QueryStyle {
        match self {
            Revision::Warm | Revision::Chat => QueryStyle::Plain,
            Revision::Classic | Revision::Emoji => QueryStyle::Qualified,
        }
    }

    pub fn prompt_template(self) -> PromptTemplate {
        match self {
            Revision::Warm => PromptTemplate::Warm,
            Revision::Classic => PromptTemplate::Classic,
            Revision::Emoji => PromptTemplate::Emoji,
            Revision::Chat => PromptTemplate::Chat,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Revision::Warm | Revision::Emoji => "HuggingFaceH4/zephyr-7b-beta",
            Revision::Classic => "mistralai/Mistral-7B-Instruct-v0.2",
            Revision::Chat => "meta-llama/Meta-Llama-3-8B-Instruct",
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Revision::Warm => 0.5,
            Revision::Classic | Revision::Emoji => 0.7,
            Revision::Chat => 0.6,
        }
    }

    pub fn post_process(self) -> PostProcess {
        match self {
            Revision::Warm => PostProcess::Raw,
            Revision::Classic => PostProcess::StripStrayTokens,
            Revision::Emoji | Revision::Chat => PostProcess::Trim,
        }
    }
}
