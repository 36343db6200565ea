//! Line-oriented chat and router loops.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{info, warn};

use crate::agent::{ChatAgent, ControlCommand};
use crate::error::Result;
use crate::memory::{AppendOutcome, ConversationBuffer, TranscriptStore};
use crate::router::InputSource;
use crate::session::SessionStore;

/// Why a REPL stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplOutcome {
    /// An exit word.
    Exit,
    /// A shutdown word; the process should end.
    Shutdown,
    /// Input closed.
    Eof,
}

/// Chat loop bound to one agent and a session store.
///
/// With a transcript attached, the thread's history comes from and is saved
/// to the transcript file instead of the JSON turn store.
pub struct ChatRepl<'a> {
    agent: &'a ChatAgent,
    sessions: &'a mut SessionStore,
    thread_id: String,
    transcript: Option<TranscriptStore>,
}

impl<'a> ChatRepl<'a> {
    pub fn new(agent: &'a ChatAgent, sessions: &'a mut SessionStore, thread_id: &str) -> Self {
        Self {
            agent,
            sessions,
            thread_id: thread_id.to_string(),
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, transcript: TranscriptStore) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Read lines from `input` until an exit word or end of input.
    ///
    /// Model failures are printed and the loop continues; only write errors
    /// to `out` abort it.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<ReplOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let session = self.sessions.get_or_create(&self.thread_id);
        if let Some(ref transcript) = self.transcript {
            let turns = transcript.load();
            info!(path = %transcript.path().display(), turns = turns.len(), "loaded transcript");
            session.buffer = ConversationBuffer::from_turns(&turns);
        }
        let turns = session.buffer.turns().len();
        writeln!(out, "thread '{}' ({turns} stored turns)", self.thread_id)?;

        loop {
            write!(out, "[{}] > ", self.thread_id)?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                return Ok(ReplOutcome::Eof);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match ControlCommand::parse(line) {
                Some(ControlCommand::Exit) => {
                    writeln!(out, "bye")?;
                    return Ok(ReplOutcome::Exit);
                }
                Some(ControlCommand::Shutdown) => {
                    info!(thread_id = %self.thread_id, "shutdown requested");
                    writeln!(out, "shutting down; history is saved")?;
                    return Ok(ReplOutcome::Shutdown);
                }
                None => {}
            }

            if let Some(rest) = line.strip_prefix("/thread") {
                self.switch_thread(rest.trim(), out)?;
                continue;
            }
            if line == "/history" {
                self.print_history(out)?;
                continue;
            }

            self.exchange(line, out).await?;
        }
    }

    async fn exchange<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        let session = self.sessions.get_or_create(&self.thread_id);
        let reply = match self.agent.respond(session, line).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "exchange failed");
                writeln!(out, "error: {e} ({})", e.user_hint())?;
                return Ok(());
            }
        };
        writeln!(out, "{reply}")?;

        if let Some(ref transcript) = self.transcript {
            let session = self.sessions.get_or_create(&self.thread_id);
            if reply.is_empty() {
                info!(thread_id = %self.thread_id, "empty reply not stored");
                return Ok(());
            }
            session.buffer.save_context(line, &reply);
            if let Err(e) = transcript.save(&session.buffer.turns()) {
                warn!(error = %e, "failed to save transcript");
                writeln!(out, "warning: could not save this turn: {e}")?;
            }
            return Ok(());
        }

        match self.sessions.record(&self.thread_id, line, &reply) {
            Ok(AppendOutcome::Appended) => {}
            Ok(AppendOutcome::Duplicate) => info!(thread_id = %self.thread_id, "turn already stored"),
            Ok(AppendOutcome::Skipped) => info!(thread_id = %self.thread_id, "empty reply not stored"),
            Err(e) => {
                warn!(error = %e, "failed to persist turn");
                writeln!(out, "warning: could not save this turn: {e}")?;
            }
        }
        Ok(())
    }

    fn switch_thread<W: Write>(&mut self, thread_id: &str, out: &mut W) -> Result<()> {
        if thread_id.is_empty() {
            writeln!(out, "usage: /thread <id>")?;
            return Ok(());
        }
        if self.transcript.is_some() {
            writeln!(out, "a transcript holds one conversation; /thread is unavailable")?;
            return Ok(());
        }
        self.thread_id = thread_id.to_string();
        let turns = self.sessions.get_or_create(thread_id).buffer.turns().len();
        writeln!(out, "switched to thread '{thread_id}' ({turns} stored turns)")?;
        Ok(())
    }

    fn print_history<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let turns = self.sessions.get_or_create(&self.thread_id).buffer.turns();
        if turns.is_empty() {
            writeln!(out, "(no history)")?;
        }
        for turn in turns {
            writeln!(out, "Human: {}", turn.user)?;
            writeln!(out, "AI: {}", turn.agent)?;
        }
        Ok(())
    }
}

/// Router input read line by line, with an optional prompt on stdout.
pub struct LineSource<R> {
    lines: Lines<R>,
    prompt: Option<String>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InputSource for LineSource<R> {
    async fn next_line(&mut self) -> Option<String> {
        if let Some(ref prompt) = self.prompt {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{prompt}");
            let _ = stdout.flush();
        }
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read input");
                None
            }
        }
    }
}
