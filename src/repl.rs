//! Line-oriented read-eval-print loop over a conversation.

use crate::error::Result;
use crate::session::{MessageOptions, Session};
use async_trait::async_trait;
use std::io::{BufRead, Write};
use tracing::debug;

pub const BANNER: &str = "Weather Agent (Type 'exit' to quit)";
pub const PROMPT: &str = "> ";

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Prompt(String),
}

impl ReplCommand {
    /// Parse one input line (without its line terminator).
    ///
    /// Only the exact words `exit` and `quit` end the loop; anything else, including
    /// `Exit` or ` exit`, is sent as a prompt.
    pub fn parse(line: &str) -> Self {
        match line {
            "exit" | "quit" => Self::Exit,
            other => Self::Prompt(other.to_string()),
        }
    }
}

/// Something that can answer a prompt, printing its reply through its own subscribers
#[async_trait]
pub trait Conversation: Send + Sync {
    async fn send_prompt(&self, prompt: &str) -> Result<()>;
}

#[async_trait]
impl Conversation for Session {
    async fn send_prompt(&self, prompt: &str) -> Result<()> {
        self.send_and_wait(MessageOptions::new(prompt), None).await?;
        Ok(())
    }
}

/// Run the loop until `exit`, `quit` or end of input.
///
/// Input bytes that are not valid UTF-8 are replaced rather than rejected. A failed
/// turn stops the loop and is returned to the caller.
pub async fn run_repl<R, W, C>(mut input: R, mut output: W, conversation: &C) -> Result<()>
where
    R: BufRead,
    W: Write,
    C: Conversation + ?Sized,
{
    writeln!(output, "{}", BANNER)?;
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    let mut raw = Vec::new();
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            debug!("End of input");
            return Ok(());
        }

        let line = String::from_utf8_lossy(&raw);
        let text = line.strip_suffix('\n').unwrap_or(&line);
        let text = text.strip_suffix('\r').unwrap_or(text);

        match ReplCommand::parse(text) {
            ReplCommand::Exit => return Ok(()),
            ReplCommand::Prompt(prompt) => {
                conversation.send_prompt(&prompt).await?;
                write!(output, "\n{}", PROMPT)?;
                output.flush()?;
            }
        }
    }
}
