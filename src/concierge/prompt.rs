use crate::db::{Conversation, Visitor};

pub const ROLE: &str = "You are an OSINT lab concierge helping researchers and investigators.";
pub const GUIDANCE: &str = "Provide helpful, accurate information about OSINT tools, techniques, and methodologies. \
     Be concise and terminal-appropriate.";

const HISTORY_SNIPPET_CHARS: usize = 200;

/// What the concierge knows about the visitor when it writes the system prompt.
#[derive(Debug, Clone, Default)]
pub struct SystemContext {
    visitor: Option<Visitor>,
    history: Vec<Conversation>,
}

impl SystemContext {
    /// Context for a visitor nothing is known about.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Keeps the `limit` newest exchanges, newest first, whatever order they arrive in.
    pub fn new(visitor: Option<Visitor>, mut history: Vec<Conversation>, limit: usize) -> Self {
        history.sort_by(|a, b| b.ts.cmp(&a.ts).then(b.id.cmp(&a.id)));
        history.truncate(limit);
        Self { visitor, history }
    }

    pub fn history(&self) -> &[Conversation] {
        &self.history
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    pub fn render(&self) -> String {
        let mut prompt = String::from(ROLE);
        prompt.push(' ');

        if let Some(visitor) = &self.visitor {
            prompt.push_str(&format!(
                "Visitor from {}, {} (lat {}, lon {}). ",
                visitor.city, visitor.country, visitor.latitude, visitor.longitude
            ));
            prompt.push_str(&format!("Previous conversations: {}.", self.history_count()));

            if !self.history.is_empty() {
                prompt.push_str(" Most recent first:");
                for exchange in &self.history {
                    prompt.push_str(&format!(
                        "\n- Q: {} | A: {}",
                        snippet(&exchange.prompt),
                        snippet(&exchange.answer)
                    ));
                }
                prompt.push('\n');
            } else {
                prompt.push(' ');
            }
        }

        prompt.push_str(GUIDANCE);
        prompt
    }
}

fn snippet(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= HISTORY_SNIPPET_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(HISTORY_SNIPPET_CHARS).collect();
    cut.push_str("...");
    cut
}
