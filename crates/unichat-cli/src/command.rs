//! Input line parsing.
//!
//! Lines starting with `/` are commands; anything else is a message for the
//! open conversation.

use thiserror::Error;
use unichat_proto::{ConversationId, MessageId, UserId, payloads::DeleteScope};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send text to the open conversation
    Say(String),
    /// Open a conversation
    Open(ConversationId),
    /// Close the open conversation
    Close,
    /// Keystroke for the typing indicator
    Typing,
    /// End the typing indicator now
    StopTyping,
    /// Report a peer's message as seen
    Seen {
        /// Message
        message_id: MessageId,
        /// Its author
        sender: UserId,
    },
    /// Delete a message
    Delete {
        /// Message
        message_id: MessageId,
        /// Who it is deleted for
        scope: DeleteScope,
    },
    /// Announce presence
    Presence(bool),
    /// Force a reconnect
    Reconnect,
    /// Print the open conversation's messages
    History,
    /// Print command help
    Help,
    /// Exit
    Quit,
}

/// Reasons a line is not a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command name
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    /// Wrong arguments
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Blank line
    #[error("nothing to send")]
    Empty,
}

pub const HELP: &str = "\
/open <conversation>          open a conversation
/close                        close it
/typing, /stop                typing indicator on, off
/seen <message> <sender>      mark a peer's message seen
/delete <message> [everyone]  delete for yourself or everyone
/online, /offline             announce presence
/history                      list messages
/reconnect                    force a reconnect
/quit                         exit
anything else is sent to the open conversation";

impl Command {
    /// Parse one input line.
    ///
    /// # Errors
    ///
    /// - `CommandError::Empty` for a blank line
    /// - `CommandError::Unknown` for an unrecognized `/command`
    /// - `CommandError::Usage` when arguments are missing or extra
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Say(line.to_owned()));
        };

        let parts: Vec<&str> = command.split_whitespace().collect();
        let name = parts.first().copied().unwrap_or("");
        let args = parts.get(1..).unwrap_or_default();

        match (name, args) {
            ("open", [conversation]) => Ok(Self::Open((*conversation).into())),
            ("open", _) => Err(CommandError::Usage("/open <conversation>")),
            ("close", []) => Ok(Self::Close),
            ("typing", []) => Ok(Self::Typing),
            ("stop", []) => Ok(Self::StopTyping),
            ("seen", [message, sender]) => {
                Ok(Self::Seen { message_id: (*message).into(), sender: (*sender).into() })
            },
            ("seen", _) => Err(CommandError::Usage("/seen <message> <sender>")),
            ("delete", [message]) => {
                Ok(Self::Delete { message_id: (*message).into(), scope: DeleteScope::ForMe })
            },
            ("delete", [message, "everyone"]) => {
                Ok(Self::Delete { message_id: (*message).into(), scope: DeleteScope::ForEveryone })
            },
            ("delete", _) => Err(CommandError::Usage("/delete <message> [everyone]")),
            ("online", []) => Ok(Self::Presence(true)),
            ("offline", []) => Ok(Self::Presence(false)),
            ("history", []) => Ok(Self::History),
            ("reconnect", []) => Ok(Self::Reconnect),
            ("help" | "h", _) => Ok(Self::Help),
            ("quit" | "q", _) => Ok(Self::Quit),
            (
                "close" | "typing" | "stop" | "online" | "offline" | "history" | "reconnect",
                _,
            ) => Err(CommandError::Usage("command takes no arguments")),
            (other, _) => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}
