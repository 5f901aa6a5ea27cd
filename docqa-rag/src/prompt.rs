//! Assembles retrieved context and the user's question into one instruction.

/// Default persona line placed at the top of every prompt.
pub const DEFAULT_PERSONA: &str = "You are a helpful and friendly internal company assistant.";

/// Separator placed between context chunks.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Builds grounded prompts for the generation model.
///
/// The prompt tells the model to answer only from the supplied documentation
/// and to say so when the answer is not there.
///
/// # Example
///
/// ```rust
/// use docqa_rag::PromptBuilder;
///
/// let prompt = PromptBuilder::new().build(&["Refunds take 5 days."], "How long do refunds take?");
/// assert!(prompt.contains("Refunds take 5 days."));
/// assert!(prompt.contains("User's question: How long do refunds take?"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    max_context_chars: Option<usize>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { persona: DEFAULT_PERSONA.to_string(), max_context_chars: None }
    }
}

impl PromptBuilder {
    /// Create a builder with the default persona and no context budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the persona line.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Cap the joined context at `max` characters.
    pub fn with_max_context_chars(mut self, max: Option<usize>) -> Self {
        self.max_context_chars = max;
        self
    }

    /// Join chunks with [`CONTEXT_SEPARATOR`], honouring the context budget.
    ///
    /// Whole chunks are taken in rank order while they fit. If not even the
    /// first chunk fits, it is truncated to the budget so the prompt is never
    /// left without context.
    pub fn join_context<S: AsRef<str>>(&self, chunks: &[S]) -> String {
        let Some(budget) = self.max_context_chars else {
            return chunks.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
        };

        let separator_len = CONTEXT_SEPARATOR.chars().count();
        let mut context = String::new();
        let mut used = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            let chunk = chunk.as_ref();
            let cost = chunk.chars().count() + if i == 0 { 0 } else { separator_len };
            if used + cost > budget {
                if i == 0 {
                    context.extend(chunk.chars().take(budget));
                }
                break;
            }
            if i > 0 {
                context.push_str(CONTEXT_SEPARATOR);
            }
            context.push_str(chunk);
            used += cost;
        }
        context
    }

    /// Build the full prompt for `question` grounded in `context_chunks`.
    pub fn build<S: AsRef<str>>(&self, context_chunks: &[S], question: &str) -> String {
        let context = self.join_context(context_chunks);
        format!(
            "{persona} Use the following company documentation to answer the user's question.\n\
             If you cannot find the answer in the provided documentation, politely state that you don't have that information.\n\
             \n\
             --- Company Documentation ---\n\
             {context}\n\
             --- End of Documentation ---\n\
             \n\
             User's question: {question}\n\
             \n\
             Your response should be based *only* on the provided documentation. Do not invent information.\n",
            persona = self.persona,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_chunks_with_separator() {
        let prompt = PromptBuilder::new().build(&["alpha", "beta"], "what?");
        assert!(prompt.contains("alpha\n---\nbeta"));
        assert!(prompt.starts_with(DEFAULT_PERSONA));
        assert!(prompt.contains("User's question: what?"));
        assert!(prompt.contains("Do not invent information."));
        assert!(prompt.contains("don't have that information"));
    }

    #[test]
    fn budget_drops_trailing_chunks() {
        let builder = PromptBuilder::new().with_max_context_chars(Some(12));
        // "aaaa" + "\n---\n" + "bbb" = 12, the third chunk would overflow.
        assert_eq!(builder.join_context(&["aaaa", "bbb", "cc"]), "aaaa\n---\nbbb");
    }

    #[test]
    fn budget_truncates_oversized_first_chunk() {
        let builder = PromptBuilder::new().with_max_context_chars(Some(3));
        assert_eq!(builder.join_context(&["ünïcode"]), "ünï");
    }

    #[test]
    fn custom_persona() {
        let prompt = PromptBuilder::new().with_persona("You are a legal clerk.").build(&["x"], "y");
        assert!(prompt.starts_with("You are a legal clerk."));
    }
}
