//! 文件类型识别工具：单个文件直接分类，目录交给扫描器
//!
//! 目录扫描在阻塞线程池中运行，取消令牌作为逐项轮询钩子；输出累计到 MAX_TOOL_OUTPUT 为止。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::MAX_TOOL_OUTPUT;
use crate::scan::{scan_dir, Classification, Classifier, ScanOptions, ScanOutcome};
use crate::tools::filesystem::PathBase;
use crate::tools::schema::{input_schema, parse_input, require};
use crate::tools::{Tool, ToolContext};

const TRUNCATED: &str = "\n[truncated, use max_results to limit]";

#[derive(Debug, Deserialize, JsonSchema)]
struct IdentifyInput {
    /// File or directory to identify
    path: String,
    /// Only list files whose category (e.g. picture, sound, text) or type name matches
    #[serde(default)]
    filter: String,
    /// Descend into subdirectories
    #[serde(default)]
    recursive: bool,
    /// Stop after this many matches (0 or less = unlimited)
    #[serde(default, deserialize_with = "match_limit")]
    #[schemars(with = "i64")]
    max_results: usize,
}

/// 任意数值都接受：小数截断取整，0 及负数表示不限
fn match_limit<'de, D: Deserializer<'de>>(de: D) -> Result<usize, D::Error> {
    let n = Option::<f64>::deserialize(de)?.unwrap_or(0.0);
    Ok(if n >= 1.0 { n as usize } else { 0 })
}

pub struct IdentifyFileTool {
    classifier: Arc<dyn Classifier>,
    paths: PathBase,
}

impl IdentifyFileTool {
    pub fn new(classifier: Arc<dyn Classifier>, paths: PathBase) -> Self {
        Self { classifier, paths }
    }
}

#[async_trait]
impl Tool for IdentifyFileTool {
    fn name(&self) -> &str {
        "identify_file"
    }

    fn description(&self) -> &str {
        "Identify the type of a file, or list files in a directory with their types. \
         Categories: system, text, document, sound, instrument, music, picture, animation, movie."
    }

    fn parameters_schema(&self) -> Value {
        input_schema::<IdentifyInput>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String, String> {
        let input: IdentifyInput = parse_input(self.name(), args)?;
        require("path", &input.path)?;
        tracing::info!(
            path = %input.path,
            filter = %input.filter,
            recursive = input.recursive,
            max = input.max_results,
            "identify_file"
        );

        let target = self.paths.resolve(&input.path);
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|_| format!("Cannot find: {}", input.path))?;

        let classifier = Arc::clone(&self.classifier);
        if !meta.is_dir() {
            let class = tokio::task::spawn_blocking(move || classifier.classify(&target))
                .await
                .map_err(|e| format!("Unknown file type: {} ({})", input.path, e))?;
            return match class {
                Some(c) => Ok(format!("{}: {} ({})", input.path, c.type_name, c.category)),
                None => Err(format!("Unknown file type: {}", input.path)),
            };
        }

        let poll = ctx.cancel.clone();
        let IdentifyInput {
            filter,
            recursive,
            max_results,
            ..
        } = input;
        let scanned = tokio::task::spawn_blocking(move || {
            let options = ScanOptions {
                filter: Some(filter.as_str()).filter(|f| !f.is_empty()),
                recursive,
                max_matches: max_results,
            };
            let mut listing = Listing::default();
            let outcome = scan_dir(&target, &options, classifier.as_ref(), &poll, |p, c| {
                listing.push(p, c)
            });
            outcome.map(|o| (o, listing))
        })
        .await
        .map_err(|e| format!("Error scanning directory: {}", e))?;

        match scanned {
            Err(e) => Err(format!("Error scanning directory: {}", e)),
            Ok((ScanOutcome::Interrupted(n), listing)) => {
                Err(format!("{}Scan interrupted after {} matches", listing.text, n))
            }
            Ok((ScanOutcome::Completed(0), _)) => Ok("No matching files found.".to_string()),
            Ok((ScanOutcome::Completed(_), listing)) => Ok(listing.finish()),
        }
    }
}

/// 扫描结果文本，超过上限后只记截断标记
#[derive(Default)]
struct Listing {
    text: String,
    truncated: bool,
}

impl Listing {
    fn push(&mut self, path: &Path, class: &Classification) {
        let shown = path.display().to_string();
        let line = if shown.contains(' ') {
            format!("\"{:<28}\" {:<16} {}\n", shown, class.type_name, class.category)
        } else {
            format!("{:<30} {:<16} {}\n", shown, class.type_name, class.category)
        };
        if self.truncated || self.text.len() + line.len() > MAX_TOOL_OUTPUT - TRUNCATED.len() {
            self.truncated = true;
            return;
        }
        self.text.push_str(&line);
    }

    fn finish(mut self) -> String {
        if self.truncated {
            self.text.push_str(TRUNCATED);
        }
        self.text
    }
}
