//! Built-in conversational tools.
//!
//! Memory tools read the session snapshot carried in [`ToolExecutionContext`].
//! Service-backed tools hold their clients; [`BuiltinServices`] wires them all
//! into a [`ToolRegistry`].
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use threadline::provider::ModelProvider;
//! # fn demo(provider: Arc<dyn ModelProvider>) {
//! use threadline::config::ThreadlineConfig;
//! use threadline::tools::builtin::BuiltinServices;
//!
//! let services = BuiltinServices::from_config(&ThreadlineConfig::new(), provider);
//! let registry = services.registry();
//! assert_eq!(registry.len(), 7);
//! # }
//! ```

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::ThreadlineConfig;
use crate::error::ThreadlineError;
use crate::generation::complete;
use crate::provider::ModelProvider;
use crate::services::{
    DuckDuckGoSearch, GoogleTranslator, SearchEngine, SentimentAnalyzer, Translator,
};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;
use crate::types::GenerationSettings;
use crate::util::random::choose;

pub const MEMORY_SEARCH: &str = "memory_search";
pub const MEMORY_HISTORY: &str = "memory_history";
pub const EMOTIONAL_RESPONSE: &str = "emotional_response";
pub const TRANSLATE: &str = "translate";
pub const SUMMARIZE: &str = "summarize";
pub const ANALYZE_SENTIMENT: &str = "analyze_sentiment";
pub const SEARCH_SUMMARY: &str = "search_summary";

const DEFAULT_TARGET_LANG: &str = "en";
const SUMMARIZE_SYSTEM: &str = "You are a helpful assistant that summarizes text.";
const SEARCH_SYSTEM: &str = "You are a helpful assistant that summarizes search results.";

/// `memory_search`: newest message in the session containing the query.
pub fn memory_search_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        MEMORY_SEARCH,
        "Search this user's earlier conversation for a message containing the query",
        AgentToolParameters::object()
            .string("query", "Text to look for, case-insensitive", true)
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let query = args.get_str("query")?;
            let hit = ctx.memory.as_deref().and_then(|m| m.search(query));
            Ok(match hit {
                Some(msg) => json!({
                    "found": true,
                    "role": msg.role.history_label(),
                    "content": msg.text(),
                }),
                None => json!({ "found": false }),
            })
        },
    ))
}

/// `memory_history`: the whole session as `{"history": [..]}`.
pub fn memory_history_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        MEMORY_HISTORY,
        "Return this user's earlier conversation as JSON so it can be continued naturally",
        AgentToolParameters::object()
            .string("query", "Unused; may be empty", false)
            .build(),
        |_args, ctx: ToolExecutionContext| async move {
            Ok(match ctx.memory.as_deref() {
                Some(memory) => memory.history_json(),
                None => json!({ "history": [] }),
            })
        },
    ))
}

struct EmotionFamily {
    keywords: &'static [&'static str],
    replies: &'static [&'static str],
}

// Checked in order; the first family with a matching keyword wins.
const EMOTION_FAMILIES: &[EmotionFamily] = &[
    EmotionFamily {
        keywords: &[
            "힘들어", "우울해", "슬퍼", "지쳤어", "짜증나", "속상해", "sad", "depressed", "exhausted",
            "tired", "lonely",
        ],
        replies: &[
            "오늘 무슨 일 있었어? 얘기해 줄래?",
            "괜찮아? 무슨 일 때문에 그런 기분이 들었어?",
            "음… 나한테 말해도 괜찮아. 무슨 일인데?",
            "Are you okay? Do you want to talk about what happened?",
        ],
    },
    EmotionFamily {
        keywords: &[
            "기뻐", "좋아", "행복해", "신나", "설레", "즐거워", "happy", "glad", "excited", "great news",
        ],
        replies: &[
            "오! 좋은 일이 있었구나! 나도 궁금한데, 무슨 일이야?",
            "그거 진짜 좋겠다! 어떤 일인데?",
            "들으니까 나도 기분이 좋아지네! 더 얘기해줄래?",
            "That sounds wonderful! What happened?",
        ],
    },
    EmotionFamily {
        keywords: &[
            "화나", "빡쳐", "짜증", "열받아", "답답해", "angry", "furious", "annoyed", "frustrated",
        ],
        replies: &[
            "그랬어? 많이 속상했겠다. 무슨 일 있었어?",
            "아... 그런 상황이면 진짜 답답할 것 같아. 좀 더 얘기해 줄래?",
            "괜찮아, 천천히 말해도 돼. 어떤 일이야?",
            "That sounds really frustrating. Want to tell me more?",
        ],
    },
    EmotionFamily {
        keywords: &[
            "걱정", "고민", "불안", "어떡하지", "worried", "anxious", "nervous", "afraid",
        ],
        replies: &[
            "뭔가 걱정되는 게 있구나. 어떤 일이야?",
            "괜찮아, 천천히 말해도 돼. 혹시 내가 도와줄 수 있을까?",
            "그런 고민이 있으면 정말 신경 쓰이겠네. 나랑 이야기해볼래?",
            "It sounds like something is on your mind. Want to think it through together?",
        ],
    },
];

/// Canned empathetic reply for the first emotion family `text` matches, or `""`.
pub fn emotional_reply(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    EMOTION_FAMILIES
        .iter()
        .find(|family| family.keywords.iter().any(|k| lowered.contains(k)))
        .and_then(|family| choose(family.replies))
        .copied()
        .unwrap_or("")
}

/// `emotional_response`: keyword-matched empathetic reply.
pub fn emotional_response_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        EMOTIONAL_RESPONSE,
        "React naturally to the user's feelings; returns an empty string when no emotion is detected",
        AgentToolParameters::object()
            .string("text", "The user's message", true)
            .build(),
        |args, _ctx: ToolExecutionContext| async move {
            let text = args.get_str("text")?;
            Ok(Value::String(emotional_reply(text).to_string()))
        },
    ))
}

/// `translate`: `text` into `target_lang` (default `en`).
pub fn translate_tool(translator: Arc<dyn Translator>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        TRANSLATE,
        "Translate text into another language (source language is detected)",
        AgentToolParameters::object()
            .string("text", "Text to translate", true)
            .string("target_lang", "Target language code, e.g. en, ko, ja (default en)", false)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let translator = translator.clone();
            async move {
                let text = args.get_str("text")?;
                let target = args.get_str_or("target_lang", DEFAULT_TARGET_LANG);
                let translated = translator
                    .translate(text, target)
                    .await
                    .map_err(|e| ThreadlineError::tool(TRANSLATE, e.to_string()))?;
                Ok(Value::String(translated))
            }
        },
    ))
}

/// `summarize`: ask the model for a short summary of `text`.
pub fn summarize_tool(
    provider: Arc<dyn ModelProvider>,
    settings: GenerationSettings,
) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        SUMMARIZE,
        "Summarize a piece of text briefly",
        AgentToolParameters::object()
            .string("text", "Text to summarize", true)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let provider = provider.clone();
            let settings = settings.clone();
            async move {
                let text = args.get_str("text")?;
                let prompt = format!("Summarize the following briefly:\n\n{text}");
                let summary = complete(provider.as_ref(), SUMMARIZE_SYSTEM, prompt, settings)
                    .await
                    .map_err(|e| ThreadlineError::tool(SUMMARIZE, e.to_string()))?;
                Ok(Value::String(summary))
            }
        },
    ))
}

/// `analyze_sentiment`: translate to English, then score it with VADER.
pub fn analyze_sentiment_tool(
    translator: Arc<dyn Translator>,
    analyzer: SentimentAnalyzer,
) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        ANALYZE_SENTIMENT,
        "Classify the sentiment of text as positive, negative, or neutral",
        AgentToolParameters::object()
            .string("text", "Text to analyze (any language)", true)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let translator = translator.clone();
            async move {
                let text = args.get_str("text")?;
                let english = translator
                    .translate(text, "en")
                    .await
                    .map_err(|e| ThreadlineError::tool(ANALYZE_SENTIMENT, e.to_string()))?;
                let score = analyzer.score(&english);
                Ok(json!({
                    "label": score.label,
                    "compound": score.compound,
                    "analyzed_text": english,
                }))
            }
        },
    ))
}

/// `search_summary`: web search, then a model-written summary of the results.
pub fn search_summary_tool(
    search: Arc<dyn SearchEngine>,
    provider: Arc<dyn ModelProvider>,
    settings: GenerationSettings,
) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        SEARCH_SUMMARY,
        "Search the web and summarize what was found",
        AgentToolParameters::object()
            .string("query", "Search query", true)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let search = search.clone();
            let provider = provider.clone();
            let settings = settings.clone();
            async move {
                let query = args.get_str("query")?;
                let results = search.search(query).await?;
                let prompt = format!("Summarize the following search results:\n\n{results}");
                let summary = complete(provider.as_ref(), SEARCH_SYSTEM, prompt, settings)
                    .await
                    .map_err(|e| ThreadlineError::tool(SEARCH_SUMMARY, e.to_string()))?;
                Ok(Value::String(summary))
            }
        },
    ))
}

/// Shared clients behind the built-in tools.
#[derive(Clone)]
pub struct BuiltinServices {
    pub provider: Arc<dyn ModelProvider>,
    pub settings: GenerationSettings,
    pub translator: Arc<dyn Translator>,
    pub search: Arc<dyn SearchEngine>,
    pub sentiment: SentimentAnalyzer,
}

impl BuiltinServices {
    pub fn from_config(config: &ThreadlineConfig, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            settings: config.generation_settings(),
            translator: Arc::new(GoogleTranslator::new(config.translate_url.clone())),
            search: Arc::new(DuckDuckGoSearch::new(config.search_url.clone())),
            sentiment: SentimentAnalyzer::new(),
        }
    }

    /// Every built-in tool.
    pub fn registry(&self) -> ToolRegistry {
        ToolRegistry::new()
            .with(memory_search_tool())
            .with(memory_history_tool())
            .with(emotional_response_tool())
            .with(search_summary_tool(
                self.search.clone(),
                self.provider.clone(),
                self.settings.clone(),
            ))
            .with(translate_tool(self.translator.clone()))
            .with(summarize_tool(self.provider.clone(), self.settings.clone()))
            .with(analyze_sentiment_tool(self.translator.clone(), self.sentiment))
    }
}

impl std::fmt::Debug for BuiltinServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinServices")
            .field("model", &self.provider.model_id())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConversationBuffer;
    use crate::tools::ToolArguments;
    use pretty_assertions::assert_eq;

    #[test]
    fn emotion_families_match_in_order() {
        let sad = EMOTION_FAMILIES[0].replies;
        let angry = EMOTION_FAMILIES[2].replies;
        assert!(sad.contains(&emotional_reply("오늘 너무 힘들어")));
        assert!(sad.contains(&emotional_reply("I feel SAD today")));
        assert!(angry.contains(&emotional_reply("진짜 열받아")));
        assert_eq!(emotional_reply("what time is it?"), "");
    }

    #[tokio::test]
    async fn memory_search_reads_context_snapshot() {
        let mut buffer = ConversationBuffer::new();
        buffer.save_context("my cat is called Miso", "Cute name!");
        let ctx = ToolExecutionContext::for_thread("alice", buffer);

        let out = memory_search_tool()
            .execute(&ToolArguments::new(json!({"query": "miso"})), &ctx)
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({"found": true, "role": "human", "content": "my cat is called Miso"})
        );
    }

    #[tokio::test]
    async fn memory_history_without_session_is_empty() {
        let out = memory_history_tool()
            .execute(&ToolArguments::default(), &ToolExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"history": []}));
    }
}
