//! 目录扫描：按文件名顺序深度优先遍历，逐个分类并回调匹配项
//!
//! - 深度上限 MAX_SCAN_DEPTH，防止环路与病态目录树
//! - 达到 max_matches 立即停止（整个遍历共用一个计数，深层命中也会终止上层）
//! - 每个目录项检查一次轮询钩子；中止返回 Interrupted 而不是 Completed

pub mod classifier;

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::core::PollHook;

pub use classifier::{Category, Classification, Classifier, SignatureClassifier};

/// 根目录之下最多进入的目录层数
pub const MAX_SCAN_DEPTH: usize = 20;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot list {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions<'a> {
    /// 大类名或类型名
    pub filter: Option<&'a str>,
    pub recursive: bool,
    /// 0 表示不限
    pub max_matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(usize),
    Interrupted(usize),
}

impl ScanOutcome {
    pub fn matches(&self) -> usize {
        match self {
            ScanOutcome::Completed(n) | ScanOutcome::Interrupted(n) => *n,
        }
    }
}

pub fn scan_dir(
    root: &Path,
    options: &ScanOptions<'_>,
    classifier: &dyn Classifier,
    poll: &dyn PollHook,
    mut on_match: impl FnMut(&Path, &Classification),
) -> Result<ScanOutcome, ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let max_depth = if options.recursive { MAX_SCAN_DEPTH + 1 } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();

    let mut count = 0usize;
    for entry in walker {
        if poll.abort_requested() {
            tracing::info!(root = %root.display(), matches = count, "scan interrupted");
            return Ok(ScanOutcome::Interrupted(count));
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "scan: skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let Some(class) = classifier.classify(entry.path()) else {
            continue;
        };
        if let Some(filter) = options.filter {
            if !class.matches_filter(filter) {
                continue;
            }
        }

        on_match(entry.path(), &class);
        count += 1;
        if options.max_matches > 0 && count >= options.max_matches {
            break;
        }
    }

    Ok(ScanOutcome::Completed(count))
}
