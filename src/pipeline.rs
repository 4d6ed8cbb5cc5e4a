use std::fmt;

use tracing::{debug, info};

use crate::destination::Destination;
use crate::inference::{GenerationParams, ModelCaller, ModelError, PostProcess};
use crate::prompt::{GroundingContext, PromptBuilder, PromptInput};
use crate::query::QueryComposer;
use crate::wikipedia::{Passage, RetrievalLimits, RetrieveError, Retriever};

/// Steps of a single turn, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ComposingQuery,
    Retrieving,
    BuildingPrompt,
    CallingModel,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ComposingQuery => "composing-query",
            Stage::Retrieving => "retrieving",
            Stage::BuildingPrompt => "building-prompt",
            Stage::CallingModel => "calling-model",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Wikipedia search failed: {0}")]
    Retrieval(#[from] RetrieveError),

    #[error("{0}")]
    Model(#[from] ModelError),
}

/// Everything that can end a turn without an answer.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Missing Hugging Face token. Pass --token, set HF_TOKEN, or add it to the secrets file.")]
    MissingCredential,

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

/// Result of a successful turn.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub query: String,
    pub passages: Vec<Passage>,
    pub answer: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub limits: RetrievalLimits,
    pub generation: GenerationParams,
    pub post_process: PostProcess,
}

/// The four stages of a grounded answer. Each is swappable on its own.
///
/// `model` is `None` when no access token was configured; every turn then fails
/// with [`TurnError::MissingCredential`] before any stage runs.
pub struct Pipeline<Q, R, P, M> {
    composer: Q,
    retriever: R,
    builder: P,
    model: Option<M>,
    settings: PipelineSettings,
}

impl<Q, R, P, M> Pipeline<Q, R, P, M>
where
    Q: QueryComposer,
    R: Retriever,
    P: PromptBuilder,
    M: ModelCaller,
{
    pub fn new(composer: Q, retriever: R, builder: P, model: Option<M>, settings: PipelineSettings) -> Self {
        Self {
            composer,
            retriever,
            builder,
            model,
            settings,
        }
    }

    pub async fn run(&self, question: &str, destination: &Destination) -> Result<TurnOutput, TurnError> {
        let model = self.model.as_ref().ok_or(TurnError::MissingCredential)?;
        Ok(self.run_stages(model, question, destination).await?)
    }

    async fn run_stages(
        &self,
        model: &M,
        question: &str,
        destination: &Destination,
    ) -> Result<TurnOutput, PipelineError> {
        debug!(stage = %Stage::ComposingQuery);
        let query = self.composer.compose(question, destination);

        debug!(stage = %Stage::Retrieving, %query);
        let passages = self.retriever.retrieve(&query, self.settings.limits).await?;

        debug!(stage = %Stage::BuildingPrompt, passages = passages.len());
        let context = GroundingContext::from_passages(&passages);
        if context.is_empty() {
            info!(%query, "no grounding context, answering from model knowledge");
        }
        let messages = self.builder.build(&PromptInput {
            destination,
            question,
            context: &context,
        });

        debug!(stage = %Stage::CallingModel, messages = messages.len());
        let completion = model.complete(&messages, &self.settings.generation).await?;
        let answer = self.settings.post_process.apply(completion);
        if answer.trim().is_empty() {
            return Err(ModelError::EmptyResponse.into());
        }

        Ok(TurnOutput {
            query,
            passages,
            answer,
        })
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::inference::ChatMessage;

    pub struct MockRetriever {
        responses: Mutex<VecDeque<Result<Vec<Passage>, RetrieveError>>>,
        calls: Mutex<Vec<(String, RetrievalLimits)>>,
    }

    impl MockRetriever {
        pub fn with_passages(texts: &[&str]) -> Self {
            let passages = texts
                .iter()
                .enumerate()
                .map(|(i, text)| Passage {
                    title: format!("Article {i}"),
                    url: format!("https://en.wikipedia.org/wiki/Article_{i}"),
                    text: text.to_string(),
                })
                .collect();
            Self::with_responses(vec![Ok(passages)])
        }

        pub fn empty() -> Self {
            Self::with_responses(vec![Ok(Vec::new())])
        }

        pub fn failing(error: RetrieveError) -> Self {
            Self::with_responses(vec![Err(error)])
        }

        pub fn with_responses(responses: Vec<Result<Vec<Passage>, RetrieveError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(String, RetrievalLimits)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Retriever for MockRetriever {
        async fn retrieve(
            &self,
            query: &str,
            limits: RetrievalLimits,
        ) -> Result<Vec<Passage>, RetrieveError> {
            self.calls.lock().unwrap().push((query.to_string(), limits));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub struct MockModel {
        responses: Mutex<VecDeque<Result<String, ModelError>>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl MockModel {
        pub fn answering(answers: &[&str]) -> Self {
            Self::with_responses(answers.iter().map(|a| Ok(a.to_string())).collect())
        }

        pub fn failing(error: ModelError) -> Self {
            Self::with_responses(vec![Err(error)])
        }

        pub fn with_responses(responses: Vec<Result<String, ModelError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ModelCaller for MockModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String, ModelError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyResponse))
        }
    }

    pub fn settings(post_process: PostProcess) -> PipelineSettings {
        PipelineSettings {
            limits: RetrievalLimits::default(),
            generation: GenerationParams::new(512, 0.5),
            post_process,
        }
    }
}
