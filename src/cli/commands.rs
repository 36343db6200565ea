//! Handlers behind each subcommand.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing::info;

use super::repl::{ChatRepl, LineSource, ReplOutcome};
use super::{AskArgs, ChatArgs, HistoryArgs, ModelArgs};
use crate::agent::{ChatAgent, UserInput};
use crate::config::ThreadlineConfig;
use crate::error::Result;
use crate::generation::{collect_stream, stream_text};
use crate::memory::{ConversationBuffer, JsonTurnStore, TranscriptStore, Turn};
use crate::provider::{create_provider, ModelProvider, OpenAiProvider};
use crate::router::{RouterEvent, TaskRouter};
use crate::session::SessionStore;
use crate::tools::{BuiltinServices, ToolRegistry};
use crate::types::ModelMessage;
use crate::util::url::resolve_image;

/// Defaults, then the config file, then the environment.
pub fn load_config(path: Option<&Path>) -> Result<ThreadlineConfig> {
    match path {
        Some(path) => ThreadlineConfig::load(path),
        None => Ok(ThreadlineConfig::from_env()),
    }
}

fn provider_for(config: &ThreadlineConfig) -> Result<Arc<dyn ModelProvider>> {
    Ok(Arc::from(create_provider(config)?))
}

/// `chat`: REPL over stdin with persistent memory.
pub async fn run_chat(mut config: ThreadlineConfig, args: ChatArgs) -> Result<ReplOutcome> {
    args.model.apply(&mut config);
    if let Some(path) = args.memory_file {
        config.memory_file = path;
    }

    let provider = provider_for(&config)?;
    let tools = if args.no_tools {
        ToolRegistry::new()
    } else {
        BuiltinServices::from_config(&config, provider.clone()).registry()
    };
    let mut agent = ChatAgent::new(provider, tools).with_settings(config.generation_settings());
    if let Some(ref system) = config.system_prompt {
        agent = agent.with_system_prompt(system.clone());
    }

    info!(memory_file = %config.memory_file.display(), model = %config.model, "starting chat");
    let mut sessions = SessionStore::new(
        JsonTurnStore::new(&config.memory_file),
        config.session_capacity,
    );
    let mut repl = ChatRepl::new(&agent, &mut sessions, &args.thread);
    if let Some(path) = args.transcript {
        info!(transcript = %path.display(), "chat history kept in transcript");
        repl = repl.with_transcript(TranscriptStore::new(path));
    }
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl.run(stdin, &mut stdout).await
}

/// `ask`: one question, optionally about an image, without memory.
pub async fn run_ask<W: Write>(
    mut config: ThreadlineConfig,
    args: AskArgs,
    out: &mut W,
) -> Result<()> {
    args.model.apply(&mut config);
    let provider = provider_for(&config)?;
    let mut agent = ChatAgent::new(provider.clone(), ToolRegistry::new())
        .with_settings(config.generation_settings());
    if let Some(ref system) = config.system_prompt {
        agent = agent.with_system_prompt(system.clone());
    }

    let input = match args.image {
        Some(ref image) => UserInput::with_image(args.prompt.clone(), resolve_image(image)?),
        None => agent.prepare_input(&args.prompt).await,
    };

    if args.stream {
        let mut messages = Vec::new();
        if let Some(ref system) = config.system_prompt {
            messages.push(ModelMessage::system(system.clone()));
        }
        messages.push(input.to_message());
        let stream = stream_text(provider.as_ref(), messages, config.generation_settings()).await?;
        let mut write_err = None;
        collect_stream(stream, |text| {
            if write_err.is_none() {
                if let Err(e) = write!(out, "{text}").and_then(|_| out.flush()) {
                    write_err = Some(e);
                }
            }
        })
        .await?;
        if let Some(e) = write_err {
            return Err(e.into());
        }
        writeln!(out)?;
    } else {
        let reply = agent
            .respond_to("ask", &ConversationBuffer::new(), &input)
            .await?;
        writeln!(out, "{reply}")?;
    }
    Ok(())
}

/// `route`: task-router REPL over stdin.
pub async fn run_route(mut config: ThreadlineConfig, args: ModelArgs) -> Result<()> {
    args.apply(&mut config);
    let provider = provider_for(&config)?;
    let tools = BuiltinServices::from_config(&config, provider.clone()).registry();
    let router = TaskRouter::new(provider, tools).with_settings(config.generation_settings());

    println!("translate, summarize, or analyze anything; type quit to stop");
    let mut input = LineSource::new(BufReader::new(tokio::io::stdin())).with_prompt("> ");
    router
        .run(&mut input, |event| match event {
            RouterEvent::Completed { output, .. } => println!("{output}"),
            RouterEvent::Rejected { message } => println!("{message}"),
            RouterEvent::Ended { message } => println!("{message}"),
        })
        .await;
    Ok(())
}

/// `history`: print stored turns.
pub fn run_history<W: Write>(
    mut config: ThreadlineConfig,
    args: HistoryArgs,
    out: &mut W,
) -> Result<()> {
    if let Some(path) = args.memory_file {
        config.memory_file = path;
    }
    let turns: Vec<Turn> = if args.transcript {
        TranscriptStore::new(&config.memory_file).load()
    } else {
        JsonTurnStore::new(&config.memory_file).load(&args.thread)
    };

    if turns.is_empty() {
        writeln!(out, "(no history)")?;
    }
    for turn in &turns {
        writeln!(out, "Human: {}", turn.user)?;
        writeln!(out, "AI: {}", turn.agent)?;
    }
    Ok(())
}

/// `tools`: names and descriptions of the built-in tools.
pub fn run_tools<W: Write>(config: &ThreadlineConfig, out: &mut W) -> Result<()> {
    // Listing needs no credentials; the provider is never called.
    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(
        config.model.clone(),
        config.api_key().unwrap_or_default().to_string(),
        config.base_url.clone(),
    ));
    let registry = BuiltinServices::from_config(config, provider).registry();
    for tool in registry.iter() {
        writeln!(out, "{:<20} {}", tool.name(), tool.description())?;
    }
    Ok(())
}
