//! 长期记忆笔记：关于用户的事实与偏好
//!
//! 纯文本文件，每行一条；加载时跳过空行并去掉行尾空白。非空时以 `<memory>` 块注入 system prompt。

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const MAX_NOTES: usize = 64;
/// 单条笔记最大字符数（含结尾位置，实际保留 255）
pub const MAX_NOTE_LEN: usize = 256;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Memory full")]
    Full,

    #[error("Empty memory entry")]
    Empty,

    #[error("Memory file error: {0}")]
    Io(#[from] std::io::Error),
}

/// 笔记集合；path 为 None 时只保存在内存中
#[derive(Debug, Clone, Default)]
pub struct MemoryNotes {
    path: Option<PathBuf>,
    entries: Vec<String>,
}

impl MemoryNotes {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// 从文件加载；文件不存在时返回空集合
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NotesError> {
        let path = path.as_ref().to_path_buf();
        let mut notes = Self {
            path: Some(path.clone()),
            entries: Vec::new(),
        };
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(notes),
            Err(e) => return Err(e.into()),
        };
        for line in data.lines() {
            if notes.entries.len() >= MAX_NOTES {
                break;
            }
            let line = line.trim_end();
            if !line.is_empty() {
                notes.entries.push(clip(line));
            }
        }
        tracing::debug!(path = %path.display(), count = notes.entries.len(), "memory notes loaded");
        Ok(notes)
    }

    /// 写回文件；父目录不存在时自动创建
    pub fn save(&self) -> Result<(), NotesError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    pub fn add(&mut self, entry: &str) -> Result<(), NotesError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(NotesError::Empty);
        }
        if self.entries.len() >= MAX_NOTES {
            return Err(NotesError::Full);
        }
        self.entries.push(clip(entry));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// system prompt 前缀；无条目时为 None
    pub fn format_block(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut block = String::from(
            "<memory>\nThe following are facts and preferences you remember about the user \
             from previous conversations. Use this knowledge naturally:\n",
        );
        for entry in &self.entries {
            block.push_str("- ");
            block.push_str(entry);
            block.push('\n');
        }
        block.push_str("</memory>\n\n");
        Some(block)
    }

    /// 编号列表（1. xxx），供 MEMORY 命令展示
    pub fn to_numbered(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {}\n", i + 1, e))
                .collect(),
        )
    }
}

fn clip(entry: &str) -> String {
    entry.chars().take(MAX_NOTE_LEN - 1).collect()
}
