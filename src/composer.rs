//! Turns raw user text into a model turn.
//!
//! Plain messages go to the model as-is. Messages starting with `search:` or
//! `/search ` are answered from web results instead: the results are rendered
//! as a numbered reference block and wrapped, together with the query, in an
//! instruction asking the model to cite them inline.

use std::sync::Arc;
use thiserror::Error;

use crate::data_models::{ConversationState, SearchResult};
use crate::llm::{ChatModel, ModelError};
use crate::search::{MAX_RESULTS, WebSearch};

pub const NOT_CONFIGURED_REPLY: &str = "AI service is not configured correctly.";
pub const NO_RESULTS_REPLY: &str = "I could not retrieve web results right now. Please try again.";
pub const FAILURE_REPLY: &str =
    "I'm sorry, I encountered an error while processing your request.";

const SEARCH_INSTRUCTION: &str = "You are an AI research assistant. Use the provided web search results to answer the user query. \
Synthesize concisely, cite sources inline like [1], [2] where relevant, and include a brief summary.";

const COLON_TRIGGER: &str = "search:";
const SLASH_TRIGGER: &str = "/search ";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("no model configured")]
    NotConfigured,
    #[error(transparent)]
    Model(#[from] ModelError),
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Returns the search query when `text` starts with a trigger prefix.
///
/// Matching ignores case and surrounding whitespace. A trigger followed by
/// nothing yields `None`, so the text is handled as an ordinary message.
pub fn extract_search_query(text: &str) -> Option<&str> {
    let text = text.trim();
    let rest = if starts_with_ignore_case(text, COLON_TRIGGER) {
        text.split_once(':').map(|(_, rest)| rest)
    } else if starts_with_ignore_case(text, SLASH_TRIGGER) {
        text.split_once(' ').map(|(_, rest)| rest)
    } else {
        None
    };
    rest.map(str::trim).filter(|q| !q.is_empty())
}

/// Escapes literal square brackets so they cannot be mistaken for citation markers.
pub fn escape_brackets(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Renders results as `[n] title — href` followed by the body, one blank line apart.
pub fn build_references(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {} — {}\n{}",
                i + 1,
                escape_brackets(&r.title),
                r.href,
                escape_brackets(&r.body)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn compose_search_prompt(query: &str, results: &[SearchResult]) -> String {
    format!(
        "<system>\n{SEARCH_INSTRUCTION}\n</system>\n\
         <user_query>\n{query}\n</user_query>\n\
         <web_results>\n{}\n</web_results>",
        build_references(results)
    )
}

#[derive(Clone)]
pub struct Composer {
    model: Option<Arc<dyn ChatModel>>,
    search: Arc<dyn WebSearch>,
}

impl Composer {
    /// `model` is `None` when the generative model could not be configured.
    pub fn new(model: Option<Arc<dyn ChatModel>>, search: Arc<dyn WebSearch>) -> Composer {
        Composer { model, search }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Produces the reply for `text`, appending the exchange to `state` when
    /// the model answered.
    pub async fn respond(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> Result<String, ComposeError> {
        let model = self.model.as_ref().ok_or(ComposeError::NotConfigured)?;

        let turn = match extract_search_query(text) {
            Some(query) => {
                let results = match self.search.search(query, MAX_RESULTS).await {
                    Ok(results) => results,
                    Err(e) => {
                        log::error!("web search failed for {query:?}: {:#}", e);
                        Vec::new()
                    }
                };
                if results.is_empty() {
                    return Ok(NO_RESULTS_REPLY.to_string());
                }
                compose_search_prompt(query, &results)
            }
            None => text.to_string(),
        };

        let reply = model.send(state.turns(), &turn).await?;
        state.record_exchange(turn, reply.clone());
        Ok(reply)
    }

    /// Like [`Composer::respond`], but every failure becomes a fixed, user-facing reply.
    pub async fn generate_response(&self, state: &mut ConversationState, text: &str) -> String {
        match self.respond(state, text).await {
            Ok(reply) => reply,
            Err(ComposeError::NotConfigured) => NOT_CONFIGURED_REPLY.to_string(),
            Err(e) => {
                log::error!("error generating response: {:#}", e);
                FAILURE_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, href: &str, body: &str) -> SearchResult {
        SearchResult::new(title.into(), href.into(), body.into())
    }

    #[test]
    fn test_extract_search_query_triggers() {
        assert_eq!(extract_search_query("search: cats"), Some("cats"));
        assert_eq!(extract_search_query("/search cats"), Some("cats"));
        assert_eq!(extract_search_query("SEARCH:cats"), Some("cats"));
        assert_eq!(extract_search_query("  /Search   cats  "), Some("cats"));
        assert_eq!(
            extract_search_query("search: rust: the book"),
            Some("rust: the book")
        );
    }

    #[test]
    fn test_extract_search_query_non_triggers() {
        assert_eq!(extract_search_query("Hello"), None);
        assert_eq!(extract_search_query("/searchcats"), None);
        assert_eq!(extract_search_query("research: cats"), None);
        assert_eq!(extract_search_query("search:"), None);
        assert_eq!(extract_search_query("/search    "), None);
        assert_eq!(extract_search_query("sé"), None);
    }

    #[test]
    fn test_escape_brackets_single_pass() {
        assert_eq!(escape_brackets("[x]"), "\\[x\\]");
        assert_eq!(escape_brackets("no brackets"), "no brackets");
    }

    #[test]
    fn test_build_references_format() {
        let refs = build_references(&[
            result("First [draft]", "https://a.example", "body [1] one"),
            result("Second", "https://b.example", "body two"),
        ]);
        assert_eq!(
            refs,
            "[1] First \\[draft\\] — https://a.example\nbody \\[1\\] one\n\n\
             [2] Second — https://b.example\nbody two"
        );
    }

    #[test]
    fn test_references_escape_raw_input_once() {
        let refs = build_references(&[result("[x]", "https://x.example", "")]);
        assert!(refs.contains("\\[x\\]"));
        assert!(!refs.contains("\\\\["));
    }

    #[test]
    fn test_compose_search_prompt_sections() {
        let prompt = compose_search_prompt("cats", &[result("Cats", "https://c.example", "meow")]);
        assert!(prompt.starts_with("<system>\nYou are an AI research assistant."));
        assert!(prompt.contains("cite sources inline like [1], [2]"));
        assert!(prompt.contains("</system>\n<user_query>\ncats\n</user_query>\n"));
        assert!(prompt.ends_with(
            "<web_results>\n[1] Cats — https://c.example\nmeow\n</web_results>"
        ));
    }
}
