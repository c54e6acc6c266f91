//! The operator console: one command per input line until something ends the session.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::{Bot, Command};

/// Why the console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// `!sw stop`.
    Quit,
    /// Input reached EOF or could not be read.
    InputClosed,
    /// Ctrl-C.
    Interrupted,
    /// The bot stopped on its own, usually because the connection closed.
    BotStopped,
    /// A command could not be applied.
    CommandFailed,
}

/// Feeds `input` to `bot` line by line, writing replies to `output`.
///
/// Never shuts the bot down itself, so the caller always gets to.
pub async fn run<R, W>(bot: &Bot, input: R, mut output: W) -> ConsoleExit
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stopped = bot.stopped();
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match bot.execute(Command::parse(&line)) {
                    Ok(reply) => {
                        if let Err(e) = write_lines(&mut output, &reply.lines).await {
                            warn!(error = %e, "console write failed");
                        }
                        if reply.quit {
                            return ConsoleExit::Quit;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, command = %line, "command failed");
                        return ConsoleExit::CommandFailed;
                    }
                },
                Ok(None) => return ConsoleExit::InputClosed,
                Err(e) => {
                    warn!(error = %e, "console read failed");
                    return ConsoleExit::InputClosed;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return ConsoleExit::Interrupted;
            }
            _ = stopped.wait() => return ConsoleExit::BotStopped,
        }
    }
}

async fn write_lines<W>(output: &mut W, lines: &[String]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for line in lines {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.flush().await
}
