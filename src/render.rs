use crate::inference::Role;
use crate::pipeline::TurnOutput;
use crate::session::Transcript;

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '[' | ']' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "guide",
        Role::System => "system",
    }
}

pub fn format_transcript(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return "(No messages yet.)\n".to_string();
    }
    let mut output = String::new();
    for turn in transcript.turns() {
        output.push_str(&format!("{}> {}\n\n", speaker(turn.role), turn.content));
    }
    output
}

/// The retrieved source text behind an answer, followed by links to the articles.
pub fn format_context(output: &TurnOutput) -> String {
    let mut text = format!("# Retrieved for: {}\n\n", output.query.replace(['\n', '\r'], " "));

    if output.passages.is_empty() {
        text.push_str("(Wikipedia returned nothing; the guide answered from general knowledge.)\n");
        return text;
    }

    for passage in &output.passages {
        text.push_str(&format!("## {}\n\n{}\n\n", passage.title, passage.text.trim()));
    }

    text.push_str("## Sources\n\n");
    for passage in &output.passages {
        text.push_str(&format!(
            "- [{}]({})\n",
            escape_md_link(&passage.title),
            escape_md_link(&passage.url)
        ));
    }
    text
}
