use crate::destination::Destination;
use crate::inference::ChatMessage;
use crate::wikipedia::Passage;

/// Shown to the model in place of passages when retrieval found nothing.
pub const NO_CONTEXT: &str = "(No guidebook entries were found for this question.)";

/// Retrieved passages as they appear in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundingContext {
    Passages(String),
    Empty,
}

impl GroundingContext {
    pub fn from_passages(passages: &[Passage]) -> Self {
        let texts: Vec<&str> = passages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            GroundingContext::Empty
        } else {
            GroundingContext::Passages(texts.join("\n\n"))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, GroundingContext::Empty)
    }

    fn as_prompt_text(&self) -> &str {
        match self {
            GroundingContext::Passages(text) => text,
            GroundingContext::Empty => NO_CONTEXT,
        }
    }
}

pub struct PromptInput<'a> {
    pub destination: &'a Destination,
    pub question: &'a str,
    pub context: &'a GroundingContext,
}

/// Formats persona, grounding context, and question into chat messages.
pub trait PromptBuilder {
    fn build(&self, input: &PromptInput<'_>) -> Vec<ChatMessage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptTemplate {
    #[default]
    Warm,
    Classic,
    Emoji,
    /// Persona and rules go in a system message; context and question in the user message.
    Chat,
}

impl PromptBuilder for PromptTemplate {
    fn build(&self, input: &PromptInput<'_>) -> Vec<ChatMessage> {
        match self {
            PromptTemplate::Warm => vec![ChatMessage::user(warm(input))],
            PromptTemplate::Classic => vec![ChatMessage::user(classic(input))],
            PromptTemplate::Emoji => vec![ChatMessage::user(emoji(input))],
            PromptTemplate::Chat => {
                let (system, user) = chat(input);
                vec![ChatMessage::system(system), ChatMessage::user(user)]
            }
        }
    }
}

fn warm(input: &PromptInput<'_>) -> String {
    let place = input.destination.describe();
    let context = input.context.as_prompt_text();
    let question = input.question;
    format!(
        "You are a warm, enthusiastic, and knowledgeable tour guide specializing in {place}.
Your goal is to help the traveler have the best experience possible, whether they ask about history, logistics, culture, or hidden gems.

Here is some information retrieved from the guidebook (Wikipedia):
Context:
{context}

---
User's Question: {question}

Instructions:
1. Answer the question specifically for {place}.
2. Use a friendly, conversational tone (like a helpful local friend).
3. If the retrieved context contains the answer, summarize it clearly.
4. If the context is empty or irrelevant, use your general knowledge to help, but keep it grounded in reality.
5. Avoid technical jargon; speak like a human guide.

Guide's Answer:
"
    )
}

fn classic(input: &PromptInput<'_>) -> String {
    let place = input.destination.describe();
    let context = input.context.as_prompt_text();
    let question = input.question;
    let fallback = if input.context.is_empty() {
        "\nNo context was found, so answer from general knowledge and say so briefly.\n"
    } else {
        ""
    };
    format!(
        "You are an expert tour guide for {place}. Answer the traveler's question accurately and concisely, in at most three short paragraphs.

Context:
{context}
{fallback}
Question: {question}

Answer:"
    )
}

fn emoji(input: &PromptInput<'_>) -> String {
    let place = input.destination.describe();
    let context = input.context.as_prompt_text();
    let question = input.question;
    format!(
        "You are a cheerful tour guide for {place} 🌍.

Rules:
- Keep the answer under 150 words.
- Use bullet points for lists of places, dishes, or tips.
- Start each bullet with one fitting emoji, and use no more than one emoji per bullet.
- Use the context below when it is relevant; otherwise rely on general knowledge without inventing facts.

Context:
{context}

Question: {question}

Answer:"
    )
}

fn chat(input: &PromptInput<'_>) -> (String, String) {
    let place = input.destination.describe();
    let system = format!(
        "You are a friendly, knowledgeable tour guide specializing in {place}. \
Answer in a conversational tone, stay under 200 words, and use short bullet points for lists. \
Ground your answer in the provided context when it is relevant. \
If the context is empty or unrelated, answer from general knowledge and keep it factual."
    );
    let user = format!(
        "Context:\n{}\n\nQuestion: {}",
        input.context.as_prompt_text(),
        input.question
    );
    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Role;

    const ALL: [PromptTemplate; 4] = [
        PromptTemplate::Warm,
        PromptTemplate::Classic,
        PromptTemplate::Emoji,
        PromptTemplate::Chat,
    ];

    fn passage(text: &str) -> Passage {
        Passage {
            title: "T".into(),
            url: "https://en.wikipedia.org/wiki/T".into(),
            text: text.into(),
        }
    }

    fn joined(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn context_joins_passages_with_blank_lines() {
        let context = GroundingContext::from_passages(&[passage("First."), passage("Second.")]);
        assert_eq!(context, GroundingContext::Passages("First.\n\nSecond.".into()));
    }

    #[test]
    fn no_passages_is_explicit_empty_context() {
        assert_eq!(GroundingContext::from_passages(&[]), GroundingContext::Empty);
        assert_eq!(
            GroundingContext::from_passages(&[passage("  ")]),
            GroundingContext::Empty
        );
    }

    #[test]
    fn every_template_includes_context_question_and_place() {
        let destination = Destination::new("Japan");
        let context = GroundingContext::Passages("Kyoto has many temples.".into());
        let input = PromptInput {
            destination: &destination,
            question: "Which temples should I visit?",
            context: &context,
        };
        for template in ALL {
            let text = joined(&template.build(&input));
            assert!(text.contains("Kyoto has many temples."), "{template:?}");
            assert!(text.contains("Which temples should I visit?"), "{template:?}");
            assert!(text.contains("Japan"), "{template:?}");
            assert!(!text.contains(NO_CONTEXT), "{template:?}");
        }
    }

    #[test]
    fn empty_context_is_stated_in_every_template() {
        let destination = Destination::worldwide();
        let input = PromptInput {
            destination: &destination,
            question: "Where is the tallest waterfall?",
            context: &GroundingContext::Empty,
        };
        for template in ALL {
            assert!(joined(&template.build(&input)).contains(NO_CONTEXT), "{template:?}");
        }
    }

    #[test]
    fn blob_templates_send_one_user_message() {
        let destination = Destination::new("Italy");
        let input = PromptInput {
            destination: &destination,
            question: "q",
            context: &GroundingContext::Empty,
        };
        for template in [PromptTemplate::Warm, PromptTemplate::Classic, PromptTemplate::Emoji] {
            let messages = template.build(&input);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, Role::User);
        }
    }

    #[test]
    fn chat_template_sends_system_then_user() {
        let destination = Destination::new("Italy");
        let context = GroundingContext::Passages("Rome is old.".into());
        let input = PromptInput {
            destination: &destination,
            question: "How old is Rome?",
            context: &context,
        };
        let messages = PromptTemplate::Chat.build(&input);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Italy"));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.ends_with("Question: How old is Rome?"));
    }

    #[test]
    fn templates_are_deterministic() {
        let destination = Destination::new("Egypt");
        let context = GroundingContext::Passages("Giza.".into());
        let input = PromptInput {
            destination: &destination,
            question: "pyramids?",
            context: &context,
        };
        for template in ALL {
            assert_eq!(template.build(&input), template.build(&input));
        }
    }
}
