use std::path::PathBuf;

use clap::Parser;
use clap::builder::RangedU64ValueParser;

use crate::destination::WORLDWIDE;
use crate::revision::Revision;

/// Ask a Wikipedia-grounded AI tour guide about any destination
#[derive(Parser, Debug)]
#[command(name = "tour-guide", author, version, about, long_about = None)]
pub struct Args {
    /// Question to ask. Omit to start an interactive session
    pub question: Vec<String>,

    /// Country to focus on, or "Worldwide"
    #[arg(short, long, default_value = WORLDWIDE)]
    pub destination: String,

    /// Prompt and model configuration to use
    #[arg(short, long, value_enum, default_value_t)]
    pub revision: Revision,

    /// Hugging Face model id (default: HF_MODEL or the revision's model)
    #[arg(long)]
    pub model: Option<String>,

    /// Hugging Face access token (default: HF_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// TOML secrets file containing HF_TOKEN (default: .streamlit/secrets.toml if present)
    #[arg(long)]
    pub secrets: Option<PathBuf>,

    /// Maximum tokens to generate (1-512)
    #[arg(long, value_parser = RangedU64ValueParser::<u32>::new().range(1..=512))]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0-2.0, default: the revision's value)
    #[arg(long, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// Number of Wikipedia passages to retrieve (1-5)
    #[arg(long, default_value_t = 5, value_parser = RangedU64ValueParser::<usize>::new().range(1..=5))]
    pub results: usize,

    /// Characters kept from each passage (1-2000)
    #[arg(long, default_value_t = 2000, value_parser = RangedU64ValueParser::<usize>::new().range(1..=2000))]
    pub chars: usize,

    /// Wikipedia language edition
    #[arg(long, default_value = "en")]
    pub wiki_lang: String,

    /// Load destinations from a file (one name per line)
    #[arg(long)]
    pub countries: Option<PathBuf>,

    /// Print the available destinations and exit
    #[arg(long, default_value_t = false)]
    pub list_destinations: bool,

    /// Print the retrieved Wikipedia text before each answer
    #[arg(long, default_value_t = false)]
    pub show_context: bool,
}

impl Args {
    /// The positional words joined back into one question, if any were given.
    pub fn one_shot_question(&self) -> Option<String> {
        let question = self.question.join(" ");
        let question = question.trim();
        (!question.is_empty()).then(|| question.to_string())
    }
}

fn parse_temperature(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=2.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0.0 and 2.0, got {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_without_arguments() {
        let args = Args::try_parse_from(["tour-guide"]).unwrap();
        assert_eq!(args.destination, "Worldwide");
        assert_eq!(args.revision, Revision::Warm);
        assert_eq!(args.results, 5);
        assert_eq!(args.chars, 2000);
        assert!(args.one_shot_question().is_none());
    }

    #[test]
    fn joins_question_words() {
        let args =
            Args::try_parse_from(["tour-guide", "-d", "Japan", "best", "ramen?"]).unwrap();
        assert_eq!(args.one_shot_question().as_deref(), Some("best ramen?"));
        assert_eq!(args.destination, "Japan");
    }

    #[test]
    fn rejects_out_of_range_bounds() {
        assert!(Args::try_parse_from(["tour-guide", "--max-tokens", "1024"]).is_err());
        assert!(Args::try_parse_from(["tour-guide", "--results", "6"]).is_err());
        assert!(Args::try_parse_from(["tour-guide", "--chars", "5000"]).is_err());
        assert!(Args::try_parse_from(["tour-guide", "--temperature", "3"]).is_err());
    }

    #[test]
    fn parses_revision_and_temperature() {
        let args = Args::try_parse_from([
            "tour-guide",
            "--revision",
            "classic",
            "--temperature",
            "0.6",
        ])
        .unwrap();
        assert_eq!(args.revision, Revision::Classic);
        assert_eq!(args.temperature, Some(0.6));
    }
}
