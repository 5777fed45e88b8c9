//! Format-dispatching document loader.
//!
//! [`DocumentLoader::load`] never fails: any problem is logged and reported
//! as empty text, which the pipeline treats as "this document yielded no
//! chunks".

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::StoreError;

/// Loaded text shorter than this many characters is logged as suspicious.
pub const SHORT_TEXT_CHARS: usize = 10;

const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Turns a document on disk into plain text.
pub trait DocumentLoader: Send + Sync {
    /// Load `path` as trimmed plain text; empty on any failure.
    fn load(&self, path: &Path) -> String;
}

/// Extracts text from one binary document format (PDF, DOCX, ...).
pub trait FormatParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Loads plain text directly and delegates other formats to registered parsers.
#[derive(Default)]
pub struct FileLoader {
    parsers: HashMap<String, Box<dyn FormatParser>>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser for an extension (case-insensitive, leading dot optional).
    pub fn with_parser(mut self, extension: &str, parser: Box<dyn FormatParser>) -> Self {
        self.parsers.insert(normalize_extension(extension), parser);
        self
    }

    /// Extensions this loader can read.
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = PLAIN_TEXT_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .chain(self.parsers.keys().cloned())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// Like [`DocumentLoader::load`] but reports why nothing was loaded.
    pub fn try_load(&self, path: &Path) -> Result<String, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        let text = if PLAIN_TEXT_EXTENSIONS.contains(&ext.as_str()) {
            decode_text(std::fs::read(path)?)
        } else if let Some(parser) = self.parsers.get(&ext) {
            let bytes = std::fs::read(path)?;
            parser.parse(&bytes).map_err(|e| StoreError::Parse {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })?
        } else {
            return Err(StoreError::UnsupportedFormat(ext));
        };

        Ok(text.trim().to_string())
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> String {
        match self.try_load(path) {
            Ok(text) => {
                let chars = text.chars().count();
                debug!(path = %path.display(), chars, "loaded document");
                if chars < SHORT_TEXT_CHARS {
                    warn!(path = %path.display(), text = %text, "document text is suspiciously short");
                }
                text
            }
            Err(StoreError::UnsupportedFormat(ext)) => {
                warn!(
                    path = %path.display(),
                    extension = %ext,
                    supported = ?self.supported_extensions(),
                    "unsupported document format"
                );
                String::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load document");
                String::new()
            }
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// UTF-8, falling back to Latin-1 (every byte is a valid Latin-1 code point).
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("not valid UTF-8, decoding as Latin-1");
            e.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}
