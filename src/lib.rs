//! threadline: conversational agents with per-thread JSON memory.
//!
//! Provides a chat agent over a hosted chat-completion endpoint, a tool
//! registry with memory, translation, search and sentiment tools, a task
//! router driven by an explicit state graph, and two file formats for
//! persisting conversation history.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use threadline::prelude::*;
//!
//! # async fn example() -> threadline::error::Result<()> {
//! let config = ThreadlineConfig::from_env();
//! let provider: Arc<dyn ModelProvider> = create_provider(&config)?.into();
//! let tools = BuiltinServices::from_config(&config, provider.clone()).registry();
//! let agent = ChatAgent::new(provider, tools);
//!
//! let mut sessions = SessionStore::new(JsonTurnStore::new(&config.memory_file), 16);
//! let session = sessions.get_or_create("alice");
//! let reply = agent.respond(session, "Hello!").await?;
//! sessions.record("alice", "Hello!", &reply)?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod generation;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod router;
pub mod services;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
