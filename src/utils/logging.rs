use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::api::{ChatMessage, Role};

/// Plain-text transcript of an interactive session, appended as it happens.
pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    /// Starts logging immediately when a file is given.
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut logging = LoggingState {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            logging.set_log_file(path)?;
        }
        Ok(logging)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;
        self.log_message(&format!(
            "## Session started {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))?;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                let path = path.clone();
                if self.is_active {
                    self.log_message(&format!(
                        "## Logging paused {}",
                        Local::now().format("%Y-%m-%d %H:%M:%S")
                    ))?;
                    self.is_active = false;
                    Ok(format!("Logging paused (file: {path})"))
                } else {
                    self.is_active = true;
                    Ok(format!("Logging resumed to: {path}"))
                }
            }
            None => Err("No log file specified. Start the shell with --log <file>.".into()),
        }
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        match (&self.file_path, self.is_active) {
            (Some(path), true) => write_to_log(path, content),
            _ => Ok(()),
        }
    }

    /// Appends one turn. User turns are prefixed; attached images are noted
    /// by count rather than dumped.
    pub fn log_turn(&self, message: &ChatMessage) -> Result<(), Box<dyn std::error::Error>> {
        match message.role {
            Role::User => {
                let mut entry = format!("You: {}", message.content);
                if !message.images.is_empty() {
                    entry.push_str(&format!("\n[{} image(s) attached]", message.images.len()));
                }
                self.log_message(&entry)
            }
            Role::Assistant if !message.content.is_empty() => self.log_message(&message.content),
            _ => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), active) => format!(
                "{} ({})",
                if active { "active" } else { "paused" },
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

fn write_to_log(file_path: &str, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);

    for line in content.lines() {
        writeln!(writer, "{line}")?;
    }
    // Blank line between entries
    writeln!(writer)?;

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disabled_logging_writes_nothing() {
        let logging = LoggingState::new(None).unwrap();
        assert!(!logging.is_active());
        assert_eq!(logging.get_status_string(), "disabled");
        logging.log_message("ignored").unwrap();
    }

    #[test]
    fn transcript_records_turns_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.log");
        let logging = LoggingState::new(Some(path.to_string_lossy().into_owned())).unwrap();

        logging
            .log_turn(&ChatMessage::user("Hi", vec!["aW1n".to_string()]))
            .unwrap();
        logging
            .log_turn(&ChatMessage::assistant("Hello!\nHow can I help?"))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("## Session started "));
        let body = content.split_once("\n\n").unwrap().1;
        assert_eq!(
            body,
            "You: Hi\n[1 image(s) attached]\n\nHello!\nHow can I help?\n\n"
        );
        assert_eq!(logging.get_status_string(), "active (session.log)");
    }

    #[test]
    fn toggling_pauses_and_resumes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.log");
        let mut logging = LoggingState::new(Some(path.to_string_lossy().into_owned())).unwrap();

        logging.toggle_logging().unwrap();
        assert!(!logging.is_active());
        logging.log_message("while paused").unwrap();
        logging.toggle_logging().unwrap();
        logging.log_message("after resume").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Logging paused"));
        assert!(!content.contains("while paused"));
        assert!(content.contains("after resume"));
    }

    #[test]
    fn toggle_without_file_is_an_error() {
        let mut logging = LoggingState::new(None).unwrap();
        assert!(logging.toggle_logging().is_err());
    }
}
