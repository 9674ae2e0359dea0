//! Content formats for configuration payloads

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format of a configuration payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Json,
    Yaml,
    #[default]
    Text,
}

impl ContentFormat {
    /// Infer the format from a data file's extension.
    ///
    /// `.json` is JSON, `.yaml` and `.yml` are YAML, everything else is text.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => ContentFormat::Json,
            Some("yaml") | Some("yml") => ContentFormat::Yaml,
            _ => ContentFormat::Text,
        }
    }

    /// Infer the format from a MIME content type, ignoring parameters such as
    /// `; charset=utf-8`. Returns `None` for types that carry no format hint.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Some(ContentFormat::Json),
            "application/x-yaml" | "application/yaml" | "text/yaml" | "text/x-yaml" => {
                Some(ContentFormat::Yaml)
            }
            "text/plain" => Some(ContentFormat::Text),
            _ => None,
        }
    }

    /// MIME type sent when creating a hosted configuration version
    pub fn content_type(&self) -> &'static str {
        match self {
            ContentFormat::Json => "application/json",
            ContentFormat::Yaml => "application/x-yaml",
            ContentFormat::Text => "text/plain",
        }
    }

    /// File extension used when scaffolding a data file
    pub fn extension(&self) -> &'static str {
        match self {
            ContentFormat::Json => "json",
            ContentFormat::Yaml => "yaml",
            ContentFormat::Text => "txt",
        }
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentFormat::Json => write!(f, "json"),
            ContentFormat::Yaml => write!(f, "yaml"),
            ContentFormat::Text => write!(f, "text"),
        }
    }
}
