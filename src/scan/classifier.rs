//! 文件类型识别：按文件头魔数分类
//!
//! 识别结果 = (类型名, 大类)。大类沿用 system / text / document / sound / instrument /
//! music / picture / animation / movie 九类。

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 文件大类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    System,
    Text,
    Document,
    Sound,
    Instrument,
    Music,
    Picture,
    Animation,
    Movie,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::System => "system",
            Category::Text => "text",
            Category::Document => "document",
            Category::Sound => "sound",
            Category::Instrument => "instrument",
            Category::Music => "music",
            Category::Picture => "picture",
            Category::Animation => "animation",
            Category::Movie => "movie",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub type_name: String,
    pub category: Category,
}

impl Classification {
    pub fn new(type_name: impl Into<String>, category: Category) -> Self {
        Self {
            type_name: type_name.into(),
            category,
        }
    }

    /// 过滤条件匹配大类名或类型名（ASCII 不区分大小写）
    pub fn matches_filter(&self, filter: &str) -> bool {
        filter.eq_ignore_ascii_case(self.category.as_str())
            || filter.eq_ignore_ascii_case(&self.type_name)
    }
}

/// 分类器：无法识别时返回 None
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &Path) -> Option<Classification>;
}

/// Protracker 模块的 "M.K." 标记位于偏移 1080
const HEADER_LEN: usize = 1084;

/// 基于魔数的默认分类器
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureClassifier;

impl Classifier for SignatureClassifier {
    fn classify(&self, path: &Path) -> Option<Classification> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        File::open(path)
            .ok()?
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .ok()?;
        identify(&header).map(|(name, category)| Classification::new(name, category))
    }
}

fn identify(h: &[u8]) -> Option<(&'static str, Category)> {
    use Category::*;

    if h.is_empty() {
        return None;
    }
    if h.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(("PNG", Picture));
    }
    if h.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(("JPEG", Picture));
    }
    if h.starts_with(b"GIF87a") || h.starts_with(b"GIF89a") {
        return Some(("GIF", Picture));
    }
    if h.starts_with(b"FORM") && h.len() >= 12 {
        return match &h[8..12] {
            b"ILBM" => Some(("ILBM", Picture)),
            b"8SVX" => Some(("8SVX", Sound)),
            b"AIFF" => Some(("AIFF", Sound)),
            b"ANIM" => Some(("ANIM", Animation)),
            b"SMUS" => Some(("SMUS", Music)),
            b"FTXT" => Some(("FTXT", Text)),
            _ => None,
        };
    }
    if h.starts_with(b"RIFF") && h.len() >= 12 {
        return match &h[8..12] {
            b"WAVE" => Some(("WAVE", Sound)),
            b"AVI " => Some(("AVI", Movie)),
            _ => None,
        };
    }
    if h.starts_with(b"MThd") {
        return Some(("MIDI", Music));
    }
    if h.starts_with(b"%PDF") {
        return Some(("PDF", Document));
    }
    if h.starts_with(b"\x7fELF") {
        return Some(("ELF", System));
    }
    if h.starts_with(&[0x00, 0x00, 0x03, 0xF3]) {
        return Some(("Executable", System));
    }
    if h.starts_with(b"ID3") || (h.len() >= 2 && h[0] == 0xFF && h[1] & 0xE0 == 0xE0) {
        return Some(("MP3", Sound));
    }
    if h.len() >= HEADER_LEN && &h[1080..1084] == b"M.K." {
        return Some(("ProTracker", Music));
    }
    if h.starts_with(b"BM") && h.len() >= 14 {
        return Some(("BMP", Picture));
    }
    if looks_like_text(h) {
        return Some(("ASCII", Text));
    }
    None
}

/// UTF-8（允许末尾字符被截断）且不含除制表、换行、回车、换页以外的控制字符
fn looks_like_text(h: &[u8]) -> bool {
    let text = match std::str::from_utf8(h) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&h[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return false,
        },
        Err(_) => return false,
    };
    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c'))
}
