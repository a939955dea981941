//! 记忆层：短期（对话历史）与长期（用户笔记）

pub mod conversation;
pub mod notes;

pub use conversation::{ContentBlock, Conversation, Message, MessageContent, Role};
pub use notes::{MemoryNotes, NotesError};
