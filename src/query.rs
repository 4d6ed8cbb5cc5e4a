use crate::destination::Destination;

/// Turns a question and the selected destination into a search string.
pub trait QueryComposer {
    fn compose(&self, question: &str, destination: &Destination) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStyle {
    /// `"{question} {destination}"`, Worldwide included.
    #[default]
    Plain,
    /// `"{question} in {destination}"`, or the bare question for Worldwide.
    Qualified,
}

impl QueryComposer for QueryStyle {
    fn compose(&self, question: &str, destination: &Destination) -> String {
        match self {
            QueryStyle::Plain => format!("{question} {}", destination.name()),
            QueryStyle::Qualified if destination.is_worldwide() => question.to_string(),
            QueryStyle::Qualified => format!("{question} in {}", destination.name()),
        }
    }
}
