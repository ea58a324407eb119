//! Turn crawler output of any known shape into (url, content) documents

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

use crate::{JobError, Result};

/// One crawled page ready to be indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlDocument {
    pub url: String,
    pub content: String,
}

/// Recognized documents plus how many entries were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub documents: Vec<CrawlDocument>,
    pub skipped: usize,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn accept(&mut self, item: &Value, content_key: &str) {
        match document(item, content_key) {
            Some(doc) => self.documents.push(doc),
            None => self.skipped += 1,
        }
    }
}

fn has_keys(object: &Map<String, Value>, content_key: &str) -> bool {
    object.contains_key("url") && object.contains_key(content_key)
}

fn document(item: &Value, content_key: &str) -> Option<CrawlDocument> {
    let url = item.get("url")?.as_str()?;
    let content = match item.get(content_key)? {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    Some(CrawlDocument {
        url: url.to_string(),
        content,
    })
}

/// Accepted shapes, checked in order:
///
/// 1. a list of `{url, content}` objects
/// 2. a single `{url, content}` object
/// 3. `{result: [{url, content}, ...]}`
/// 4. `{data: [{url, markdown}, ...]}`
///
/// Anything else is skipped and counted.
pub fn normalize(data: &Value) -> Normalized {
    let mut normalized = Normalized::default();

    match data {
        Value::Array(items) => {
            for item in items {
                normalized.accept(item, "content");
            }
        }
        Value::Object(object) if has_keys(object, "content") => {
            normalized.accept(data, "content");
        }
        Value::Object(object) => {
            if let Some(Value::Array(items)) = object.get("result") {
                for item in items {
                    normalized.accept(item, "content");
                }
            } else if let Some(Value::Array(items)) = object.get("data") {
                for item in items {
                    normalized.accept(item, "markdown");
                }
            } else {
                normalized.skipped += 1;
            }
        }
        _ => normalized.skipped += 1,
    }

    if normalized.skipped > 0 {
        warn!(
            "Skipped {} crawler entries without a url and content",
            normalized.skipped
        );
    }
    normalized
}

/// Read a crawler output file and normalize it
pub async fn load_crawler_output(path: &Path) -> Result<Normalized> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::InputNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let data: Value = serde_json::from_str(&text).map_err(|source| JobError::InvalidInput {
        path: path.to_path_buf(),
        source,
    })?;

    let normalized = normalize(&data);
    debug!(
        "Loaded {} documents from {}",
        normalized.documents.len(),
        path.display()
    );
    Ok(normalized)
}
