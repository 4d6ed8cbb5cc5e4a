mod cli;
mod config;
mod destination;
mod inference;
mod pipeline;
mod prompt;
mod query;
mod render;
mod repl;
mod revision;
mod session;
mod wikipedia;

pub const USER_AGENT: &str = concat!("tour-guide/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Args;
use config::Config;
use destination::Destinations;
use inference::InferenceClient;
use pipeline::{Pipeline, PipelineSettings};
use repl::Console;
use session::Session;
use wikipedia::WikipediaClient;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tour_guide=warn")),
        )
        .init();

    let args = Args::parse();

    let destinations = match &args.countries {
        Some(path) => Destinations::from_file(path),
        None => Destinations::builtin(),
    };
    if args.list_destinations {
        for name in destinations.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = Config::from_env(&args, &destinations)?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let model = InferenceClient::from_config(http.clone(), &config)
        .inspect_err(|e| warn!("model client not available: {e}"))
        .ok();
    let retriever = match &config.wikipedia_endpoint {
        Some(endpoint) => WikipediaClient::with_endpoint(http, &config.wiki_lang, endpoint),
        None => WikipediaClient::new(http, &config.wiki_lang),
    };

    let revision = config.revision;
    let pipeline = Pipeline::new(
        revision.query_style(),
        retriever,
        revision.prompt_template(),
        model,
        PipelineSettings {
            limits: config.limits,
            generation: config.generation,
            post_process: revision.post_process(),
        },
    );
    let mut session = Session::new(config.destination.clone());

    info!(?revision, model = %config.model, destination = %session.destination(), "session ready");

    match args.one_shot_question() {
        Some(question) => {
            let mut console = Console::new(std::io::stdout(), std::io::stderr(), config.show_context);
            if !console.turn(&pipeline, &mut session, &question).await? {
                std::process::exit(1);
            }
        }
        None => repl::run_interactive(&pipeline, &mut session, config.show_context).await?,
    }

    Ok(())
}
