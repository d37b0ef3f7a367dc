//! Conversation log and its display projection.

use super::entities::{Message, Role};

/// Side of the transcript a message is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Left,
    Right,
}

impl From<Role> for Position {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Position::Left,
            Role::Assistant => Position::Right,
        }
    }
}

/// Render-ready view of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRecord<'a> {
    pub position: Position,
    pub title: &'static str,
    pub text: &'a str,
}

impl<'a> From<&'a Message> for DisplayRecord<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            position: message.role().into(),
            title: message.role().as_str(),
            text: message.text(),
        }
    }
}

/// Ordered, append-only sequence of messages (Entity)
///
/// Insertion order is the only ordering guarantee. Messages are never
/// reordered, removed, or edited in place.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the end of the log
    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(Message::new(role, text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Lazy projection of the log into render-ready records.
    ///
    /// The iterator is `Clone`, so a caller can restart it without touching
    /// the log; calling this again gives a fresh sequence as well.
    pub fn display_sequence(
        &self,
    ) -> impl ExactSizeIterator<Item = DisplayRecord<'_>> + Clone + '_ {
        self.messages.iter().map(DisplayRecord::from)
    }
}
