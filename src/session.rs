use tracing::{info, warn};

use crate::destination::Destination;
use crate::inference::{ModelCaller, Role};
use crate::pipeline::{Pipeline, TurnError, TurnOutput};
use crate::prompt::PromptBuilder;
use crate::query::QueryComposer;
use crate::wikipedia::Retriever;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Chronological user/assistant turns. Append-only, and only whole exchanges are recorded.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn record_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(Turn {
            role: Role::User,
            content: question.to_string(),
        });
        self.turns.push(Turn {
            role: Role::Assistant,
            content: answer.to_string(),
        });
    }
}

/// One conversation about one destination.
#[derive(Debug)]
pub struct Session {
    destination: Destination,
    transcript: Transcript,
    last_output: Option<TurnOutput>,
}

impl Session {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            transcript: Transcript::default(),
            last_output: None,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The most recent successful turn, for showing what was retrieved.
    pub fn last_output(&self) -> Option<&TurnOutput> {
        self.last_output.as_ref()
    }

    /// Runs one turn. On success the question and answer are appended to the
    /// transcript; on failure the transcript is left untouched.
    pub async fn ask<Q, R, P, M>(
        &mut self,
        pipeline: &Pipeline<Q, R, P, M>,
        question: &str,
    ) -> Result<&TurnOutput, TurnError>
    where
        Q: QueryComposer,
        R: Retriever,
        P: PromptBuilder,
        M: ModelCaller,
    {
        info!(destination = %self.destination, "turn started");

        match pipeline.run(question, &self.destination).await {
            Ok(output) => {
                self.transcript.record_exchange(question, &output.answer);
                info!(
                    passages = output.passages.len(),
                    turns = self.transcript.len(),
                    "turn complete"
                );
                Ok(self.last_output.insert(output))
            }
            Err(e) => {
                warn!(error = %e, "turn failed, transcript unchanged");
                Err(e)
            }
        }
    }
}
