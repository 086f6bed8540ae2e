//! Message protocol definitions
//!
//! Plain-text, `\n`-delimited protocol. Client lines are classified into
//! `ClientLine`; everything the server writes is a `ServerMessage` or an
//! `Envelope`, whose `Display` impls produce the exact wire bytes.

use std::fmt;

use crate::types::Timestamp;

/// Client → Server line
///
/// One trimmed line read from a session in the Active state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// Blank line, ignored
    Empty,
    /// `/exit`
    Exit,
    /// `/change <name>`, name may be empty
    Change(String),
    /// Any other text
    Chat(String),
}

impl ClientLine {
    /// Classify a raw line (line terminator included or not)
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            return ClientLine::Empty;
        }
        if line == "/exit" {
            return ClientLine::Exit;
        }
        if let Some(rest) = line.strip_prefix("/change") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return ClientLine::Change(rest.trim().to_string());
            }
        }
        ClientLine::Chat(line.to_string())
    }
}

/// Server → Client literal messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Name prompt, no line terminator
    NamePrompt,
    /// Empty display name at login
    InvalidName,
    /// Empty `/change` target
    RenameUsage,
    /// History resource missing
    NoHistory,
    /// Capacity reached at accept time
    ChatroomFull,
    /// Someone joined
    Joined { name: String },
    /// Someone renamed themselves
    Renamed { old: String, new: String },
    /// Someone left
    Left { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::NamePrompt => f.write_str("[ENTER YOUR NAME]: "),
            ServerMessage::InvalidName => f.write_str("Invalid name. Connection closed.\n"),
            ServerMessage::RenameUsage => {
                f.write_str("Invalid name. Usage: /change <new_name>\n")
            }
            ServerMessage::NoHistory => f.write_str("[No chat history available]\n"),
            ServerMessage::ChatroomFull => f.write_str("Chatroom full...\n"),
            ServerMessage::Joined { name } => writeln!(f, "{} has joined our chat...", name),
            ServerMessage::Renamed { old, new } => {
                writeln!(f, "{} has changed their name to {}", old, new)
            }
            ServerMessage::Left { name } => writeln!(f, "{} has left our chat.", name),
        }
    }
}

/// Formatted chat line queued for logging and fan-out
///
/// Rendered once at construction: `[<timestamp>][<name>]: <body>\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    text: String,
}

impl Envelope {
    pub fn new(timestamp: &Timestamp, name: &str, body: &str) -> Self {
        Self {
            text: format!("[{}][{}]: {}\n", timestamp, name, body),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
