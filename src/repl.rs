//! Terminal front end: one-shot answers and the interactive chat loop.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::inference::ModelCaller;
use crate::pipeline::Pipeline;
use crate::prompt::PromptBuilder;
use crate::query::QueryComposer;
use crate::render::{format_context, format_transcript};
use crate::session::Session;
use crate::wikipedia::Retriever;

const HELP: &str = "Commands:
  /history   replay this session's conversation
  /context   show the Wikipedia text behind the last answer
  /help      show this help
  /quit      leave (also /exit or Ctrl-D)
  //text     send \"/text\" as a question
Anything else is sent to the guide as a question.";

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Question(String),
    History,
    Context,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        if let Some(escaped) = line.strip_prefix("//") {
            let question = escaped.trim();
            return if question.is_empty() {
                Input::Empty
            } else {
                Input::Question(format!("/{question}"))
            };
        }
        // Only a lone `/word` is a command; "/r/travel tips" is a question.
        let Some(command) = line
            .strip_prefix('/')
            .filter(|c| !c.is_empty() && !c.contains(|ch: char| ch == '/' || ch.is_whitespace()))
        else {
            return Input::Question(line.to_string());
        };
        match command.to_ascii_lowercase().as_str() {
            "history" => Input::History,
            "context" | "sources" => Input::Context,
            "help" | "?" => Input::Help,
            "quit" | "exit" | "q" => Input::Quit,
            _ => Input::Unknown(line.to_string()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Answers go to `out`; progress, errors, and prompts go to `err`.
pub struct Console<O, E> {
    out: O,
    err: E,
    show_context: bool,
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E, show_context: bool) -> Self {
        Self {
            out,
            err,
            show_context,
        }
    }

    /// Runs one turn and prints its outcome. Returns whether an answer was produced.
    pub async fn turn<Q, R, P, M>(
        &mut self,
        pipeline: &Pipeline<Q, R, P, M>,
        session: &mut Session,
        question: &str,
    ) -> io::Result<bool>
    where
        Q: QueryComposer,
        R: Retriever,
        P: PromptBuilder,
        M: ModelCaller,
    {
        writeln!(
            self.err,
            "Searching Wikipedia for info about {}...",
            session.destination()
        )?;
        self.err.flush()?;

        match session.ask(pipeline, question).await {
            Ok(output) => {
                if self.show_context {
                    write!(self.out, "{}---\n\n", format_context(output))?;
                }
                writeln!(self.out, "{}\n", output.answer)?;
                self.out.flush()?;
                Ok(true)
            }
            Err(e) => {
                writeln!(self.err, "Error: {e}")?;
                Ok(false)
            }
        }
    }

    pub async fn handle<Q, R, P, M>(
        &mut self,
        pipeline: &Pipeline<Q, R, P, M>,
        session: &mut Session,
        input: Input,
    ) -> io::Result<Flow>
    where
        Q: QueryComposer,
        R: Retriever,
        P: PromptBuilder,
        M: ModelCaller,
    {
        match input {
            Input::Question(question) => {
                self.turn(pipeline, session, &question).await?;
            }
            Input::History => write!(self.out, "{}", format_transcript(session.transcript()))?,
            Input::Context => match session.last_output() {
                Some(output) => write!(self.out, "{}", format_context(output))?,
                None => writeln!(self.out, "(No answer yet, so nothing was retrieved.)")?,
            },
            Input::Help => writeln!(self.out, "{HELP}")?,
            Input::Unknown(command) => {
                writeln!(self.err, "Unknown command: {command}. Type /help for commands.")?
            }
            Input::Empty => {}
            Input::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn banner(&mut self, session: &Session) -> io::Result<()> {
        writeln!(
            self.err,
            "AI Tour Guide | Focus: {}\nAsk a question, or type /help.\n",
            session.destination()
        )
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.err, "you> ")?;
        self.err.flush()
    }
}

/// Reads questions from stdin until EOF or `/quit`. Failed turns are reported and the loop continues.
pub async fn run_interactive<Q, R, P, M>(
    pipeline: &Pipeline<Q, R, P, M>,
    session: &mut Session,
    show_context: bool,
) -> io::Result<()>
where
    Q: QueryComposer,
    R: Retriever,
    P: PromptBuilder,
    M: ModelCaller,
{
    let mut console = Console::new(io::stdout(), io::stderr(), show_context);
    console.banner(session)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        console.prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if console.handle(pipeline, session, Input::parse(&line)).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::inference::{ModelError, PostProcess};
    use crate::pipeline::mocks::{MockModel, MockRetriever, settings};
    use crate::prompt::PromptTemplate;
    use crate::query::QueryStyle;

    type TestPipeline = Pipeline<QueryStyle, MockRetriever, PromptTemplate, MockModel>;

    fn pipeline(model: MockModel) -> TestPipeline {
        Pipeline::new(
            QueryStyle::Qualified,
            MockRetriever::with_passages(&["Machu Picchu is an Inca citadel."]),
            PromptTemplate::Emoji,
            Some(model),
            settings(PostProcess::Trim),
        )
    }

    fn text(buf: &[u8]) -> String {
        String::from_utf8_lossy(buf).into_owned()
    }

    #[test]
    fn parses_inputs() {
        assert_eq!(Input::parse("  "), Input::Empty);
        assert_eq!(
            Input::parse(" Best hikes? "),
            Input::Question("Best hikes?".into())
        );
        assert_eq!(Input::parse("/history"), Input::History);
        assert_eq!(Input::parse("/SOURCES"), Input::Context);
        assert_eq!(Input::parse("/exit"), Input::Quit);
        assert_eq!(Input::parse("/dance"), Input::Unknown("/dance".into()));
    }

    #[test]
    fn slash_questions_are_not_commands() {
        assert_eq!(
            Input::parse("/r/travel tips for Japan?"),
            Input::Question("/r/travel tips for Japan?".into())
        );
        assert_eq!(
            Input::parse("//history of Kyoto"),
            Input::Question("/history of Kyoto".into())
        );
        assert_eq!(Input::parse("//help"), Input::Question("/help".into()));
        assert_eq!(Input::parse("//"), Input::Empty);
        assert_eq!(Input::parse("/"), Input::Question("/".into()));
    }

    #[tokio::test]
    async fn question_prints_answer_and_busy_line() {
        let p = pipeline(MockModel::answering(&["🥾 Hike the Inca Trail."]));
        let mut session = Session::new(Destination::new("Peru"));
        let mut console = Console::new(Vec::new(), Vec::new(), false);

        let flow = console
            .handle(&p, &mut session, Input::parse("Best hikes?"))
            .await
            .unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(text(&console.out).contains("Hike the Inca Trail."));
        assert!(text(&console.err).contains("Searching Wikipedia for info about Peru..."));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn show_context_prints_sources_first() {
        let p = pipeline(MockModel::answering(&["Go early."]));
        let mut session = Session::new(Destination::new("Peru"));
        let mut console = Console::new(Vec::new(), Vec::new(), true);

        console.turn(&p, &mut session, "Machu Picchu?").await.unwrap();

        let out = text(&console.out);
        let context_at = out.find("Inca citadel").unwrap();
        let answer_at = out.find("Go early.").unwrap();
        assert!(context_at < answer_at);
    }

    #[tokio::test]
    async fn failed_question_reports_error_and_continues() {
        let p = pipeline(MockModel::failing(ModelError::RateLimited));
        let mut session = Session::new(Destination::new("Peru"));
        let mut console = Console::new(Vec::new(), Vec::new(), false);

        let flow = console
            .handle(&p, &mut session, Input::parse("Best hikes?"))
            .await
            .unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(text(&console.err).contains("Error: Inference API rate limit exceeded"));
        assert!(text(&console.out).is_empty());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn history_and_context_commands() {
        let p = pipeline(MockModel::answering(&["Take the train."]));
        let mut session = Session::new(Destination::new("Peru"));
        let mut console = Console::new(Vec::new(), Vec::new(), false);

        console.handle(&p, &mut session, Input::Context).await.unwrap();
        assert!(text(&console.out).contains("No answer yet"));

        console
            .handle(&p, &mut session, Input::Question("How to get there?".into()))
            .await
            .unwrap();
        console.out.clear();

        console.handle(&p, &mut session, Input::History).await.unwrap();
        let history = text(&console.out);
        assert!(history.contains("you> How to get there?"));
        assert!(history.contains("guide> Take the train."));

        console.out.clear();
        console.handle(&p, &mut session, Input::Context).await.unwrap();
        assert!(text(&console.out).contains("# Retrieved for: How to get there? in Peru"));
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let p = pipeline(MockModel::answering(&[]));
        let mut session = Session::new(Destination::worldwide());
        let mut console = Console::new(Vec::new(), Vec::new(), false);

        let flow = console.handle(&p, &mut session, Input::Quit).await.unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
