//! Composing one outgoing user turn from prompt text and attached content.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::api::ChatMessage;

const IMAGE_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

#[derive(Debug)]
pub struct AttachmentError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to read {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for AttachmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn read_error(path: &Path) -> impl FnOnce(std::io::Error) -> AttachmentError + '_ {
    move |source| AttachmentError {
        path: path.to_path_buf(),
        source,
    }
}

/// Whether an uploaded part with this content type is sent as an image.
pub fn is_image_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    IMAGE_CONTENT_TYPES
        .iter()
        .any(|known| essence.eq_ignore_ascii_case(known))
}

/// Accumulates text and images for a single user turn.
///
/// Each text attachment is appended after a newline; images are stored
/// base64-encoded (standard alphabet) in attachment order.
#[derive(Debug, Clone, Default)]
pub struct TurnBuilder {
    content: String,
    images: Vec<String>,
}

impl TurnBuilder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            content: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn add_text_part(&mut self, text: &str) -> &mut Self {
        self.content.push('\n');
        self.content.push_str(text);
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, AttachmentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(read_error(path))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Attaching file");
        Ok(self.add_text_part(&String::from_utf8_lossy(&bytes)))
    }

    /// Appends every file under `root`, recursively, in path order.
    pub fn add_directory(&mut self, root: impl AsRef<Path>) -> Result<&mut Self, AttachmentError> {
        let text = directory_content(root.as_ref())?;
        Ok(self.add_text_part(&text))
    }

    pub fn add_image(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, AttachmentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(read_error(path))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Attaching image");
        Ok(self.add_image_bytes(&bytes))
    }

    pub fn add_image_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.images.push(STANDARD.encode(bytes));
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn has_prompt(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn build(self) -> ChatMessage {
        ChatMessage::user(self.content, self.images)
    }
}

/// Concatenates every file below `root` as `File: <name>\n<content>\n\n`.
pub fn directory_content(root: &Path) -> Result<String, AttachmentError> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut text = String::new();
    for path in files {
        let bytes = fs::read(&path).map_err(read_error(&path))?;
        debug!(path = %path.display(), "Attaching directory entry");
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        text.push_str("File: ");
        text.push_str(&name);
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&bytes));
        text.push_str("\n\n");
    }
    Ok(text)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), AttachmentError> {
    let mut entries = fs::read_dir(dir)
        .map_err(read_error(dir))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error(dir))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
