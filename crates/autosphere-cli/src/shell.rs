//! Interactive chat loop

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use autosphere_core::{Agent, AgentError, ChatTurn, ThreadId};
use rustyline::{DefaultEditor, error::ReadlineError};

pub const PROMPT: &str = "Question: ";
pub const QUIT_HINT: &str = "(Type 'exit' or 'end' to quit)";
pub const FAREWELL: &str = "Goodbye! Have a great day 🙂";
pub const INTERRUPTED: &str = "\n👋 Thank you for using AutoSphere AI!";

const EXIT_WORDS: [&str; 4] = ["exit", "end", "quit", "bye"];

/// What to do with one line of input
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction<'a> {
    Exit,
    Skip,
    Ask(&'a str),
}

pub fn classify(line: &str) -> LineAction<'_> {
    let trimmed = line.trim();
    if EXIT_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        LineAction::Exit
    } else if trimmed.is_empty() {
        LineAction::Skip
    } else {
        LineAction::Ask(trimmed)
    }
}

/// Result of asking the terminal for a line
#[derive(Debug)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D
    Eof,
}

pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

/// Terminal line editor with in-memory history
pub struct RustylineReader {
    editor: DefaultEditor,
}

impl RustylineReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match tokio::task::block_in_place(|| self.editor.readline(prompt)) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }
}

/// Produces replies for the shell
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, message: &str, history: &[ChatTurn]) -> autosphere_core::Result<String>;
}

/// Backend driving the shared agent under one thread id per process
pub struct AgentBackend {
    agent: Option<Arc<Agent>>,
    thread: ThreadId,
}

impl AgentBackend {
    pub fn new(agent: Option<Arc<Agent>>) -> Self {
        Self {
            agent,
            thread: ThreadId::new(),
        }
    }
}

#[async_trait]
impl ChatBackend for AgentBackend {
    async fn reply(&self, message: &str, history: &[ChatTurn]) -> autosphere_core::Result<String> {
        let agent = self.agent.as_ref().ok_or(AgentError::NotInitialized)?;
        agent.respond(message, history, Some(&self.thread)).await
    }
}

/// Fires once when the user asks to stop
type Interrupt = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Process-wide Ctrl-C, which never fires if no handler can be installed
fn ctrl_c() -> Interrupt {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
}

/// Whether a turn finished or was cut short
enum Turn {
    Done,
    Interrupted,
}

/// The read-ask-print loop
pub struct Shell<R, B, W> {
    reader: R,
    backend: B,
    out: W,
    history: Vec<ChatTurn>,
    interrupt: Interrupt,
}

impl<R: LineReader, B: ChatBackend, W: Write> Shell<R, B, W> {
    pub fn new(reader: R, backend: B, out: W) -> Self {
        Self {
            reader,
            backend,
            out,
            history: Vec::new(),
            interrupt: ctrl_c(),
        }
    }

    /// Replace the Ctrl-C listener that cancels an in-flight reply
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: impl Future<Output = ()> + Send + 'static) -> Self {
        self.interrupt = Box::pin(interrupt);
        self
    }

    #[cfg(test)]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Run until an exit word, Ctrl-C or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let line = match self.reader.read_line(PROMPT)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted | ReadOutcome::Eof => {
                    writeln!(self.out, "{INTERRUPTED}")?;
                    return Ok(());
                }
            };

            let question = match classify(&line) {
                LineAction::Exit => {
                    writeln!(self.out, "{FAREWELL}")?;
                    return Ok(());
                }
                LineAction::Skip => continue,
                LineAction::Ask(question) => question.to_string(),
            };

            if let Turn::Interrupted = self.ask(&question).await? {
                writeln!(self.out, "{INTERRUPTED}")?;
                return Ok(());
            }
        }
    }

    async fn ask(&mut self, question: &str) -> Result<Turn> {
        self.history.push(ChatTurn::user(question));

        let outcome = tokio::select! {
            outcome = self.backend.reply(question, &self.history) => Some(outcome),
            () = &mut self.interrupt => None,
        };
        let Some(outcome) = outcome else {
            self.history.pop();
            return Ok(Turn::Interrupted);
        };

        match outcome {
            Ok(reply) => {
                writeln!(self.out, "\nAutoSphere AI: {reply}\n")?;
                self.history.push(ChatTurn::assistant(reply));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                // An unanswered turn is not kept
                self.history.pop();
                writeln!(self.out, "\nAutoSphere AI: {}\n", e.user_message())?;
            }
        }

        Ok(Turn::Done)
    }
}
