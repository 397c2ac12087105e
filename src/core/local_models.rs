//! The locally installed model inventory, read through the `ollama` binary.

use std::fmt;
use std::process::Output;

use tokio::process::Command;
use tracing::debug;

use crate::core::model_id::ModelIdentifier;

pub const DEFAULT_PROGRAM: &str = "ollama";
pub const LOCAL_TABLE_WIDTH: usize = 65;

#[derive(Debug)]
pub enum LocalModelsError {
    Spawn {
        command: String,
        source: std::io::Error,
    },
    Failed {
        command: String,
        output: String,
    },
    NoInformation(String),
}

impl fmt::Display for LocalModelsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalModelsError::Spawn { command, source } => {
                write!(f, "Could not run '{command}': {source}")
            }
            LocalModelsError::Failed { command, output } => {
                let output = output.trim();
                if output.is_empty() {
                    write!(f, "'{command}' failed")
                } else {
                    write!(f, "'{command}' failed: {output}")
                }
            }
            LocalModelsError::NoInformation(model) => {
                write!(f, "No information found for model {model}")
            }
        }
    }
}

impl std::error::Error for LocalModelsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocalModelsError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Runs `ollama` subcommands and interprets their text output.
#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: String,
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl OllamaCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, LocalModelsError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command, "Running local model command");
        let output: Output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| LocalModelsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(LocalModelsError::Failed {
                command,
                output: combined,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Raw `ollama list` output.
    pub async fn list(&self) -> Result<String, LocalModelsError> {
        self.run(&["list"]).await
    }

    pub async fn local_model_names(&self) -> Result<Vec<String>, LocalModelsError> {
        Ok(parse_model_names(&self.list().await?))
    }

    pub async fn is_model_present(&self, model: &ModelIdentifier) -> Result<bool, LocalModelsError> {
        Ok(listing_contains(&self.list().await?, &model.canonical()))
    }

    pub async fn show(&self, model: &ModelIdentifier) -> Result<String, LocalModelsError> {
        let output = self.run(&["show", &model.canonical()]).await?;
        compact_show_output(&output)
            .ok_or_else(|| LocalModelsError::NoInformation(model.canonical()))
    }

    pub async fn remove(&self, model: &ModelIdentifier) -> Result<(), LocalModelsError> {
        self.run(&["rm", &model.canonical()]).await.map(|_| ())
    }
}

fn listing_rows(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
}

/// Substring match against every row after the header.
pub fn listing_contains(listing: &str, canonical: &str) -> bool {
    listing_rows(listing).any(|row| row.contains(canonical))
}

pub fn parse_model_names(listing: &str) -> Vec<String> {
    listing_rows(listing)
        .filter_map(|row| row.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// `ollama show` output without blank lines; `None` when there is nothing
/// to show.
pub fn compact_show_output(output: &str) -> Option<String> {
    if output.lines().count() < 2 {
        return None;
    }
    let info: Vec<&str> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    Some(info.join("\n"))
}

/// Pads the header and each row to the table width, with a dashed divider
/// under the header. `None` when the listing holds no models.
pub fn format_local_table(listing: &str) -> Option<String> {
    let mut lines = listing.lines();
    let header = lines.next()?;
    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
    if rows.is_empty() {
        return None;
    }

    let mut table = vec![
        format!("{header:<LOCAL_TABLE_WIDTH$}"),
        "-".repeat(LOCAL_TABLE_WIDTH),
    ];
    table.extend(rows.into_iter().map(|row| format!("{row:<LOCAL_TABLE_WIDTH$}")));
    Some(table.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "NAME                    ID              SIZE      MODIFIED\n\
llama3:latest           365c0bd3c000    4.7 GB    2 days ago\n\
qwen2.5-coder:7b        2b0496514337    4.7 GB    3 weeks ago\n\
\n";

    #[test]
    fn presence_skips_header_and_matches_substrings() {
        assert!(listing_contains(LISTING, "llama3:latest"));
        assert!(listing_contains(LISTING, "qwen2.5-coder:7b"));
        assert!(!listing_contains(LISTING, "NAME"));
        assert!(!listing_contains(LISTING, "mistral:latest"));
    }

    #[test]
    fn names_come_from_first_column() {
        assert_eq!(
            parse_model_names(LISTING),
            vec!["llama3:latest".to_string(), "qwen2.5-coder:7b".to_string()]
        );
        assert!(parse_model_names("NAME ID SIZE MODIFIED\n").is_empty());
    }

    #[test]
    fn local_table_is_padded_with_divider() {
        let table = format_local_table(LISTING).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "-".repeat(LOCAL_TABLE_WIDTH));
        assert!(lines.iter().all(|line| line.len() >= LOCAL_TABLE_WIDTH));
        assert!(lines[2].starts_with("llama3:latest"));
    }

    #[test]
    fn empty_listing_has_no_table() {
        assert_eq!(format_local_table(""), None);
        assert_eq!(format_local_table("NAME ID SIZE MODIFIED\n\n"), None);
    }

    #[test]
    fn show_output_drops_blank_lines() {
        let output = "  Model\n    architecture    llama\n\n  License\n    META LLAMA 3\n";
        assert_eq!(
            compact_show_output(output).unwrap(),
            "  Model\n    architecture    llama\n  License\n    META LLAMA 3"
        );
        assert_eq!(compact_show_output(""), None);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let cli = OllamaCli::new("llamash-test-no-such-binary");
        match cli.list().await {
            Err(LocalModelsError::Spawn { command, .. }) => {
                assert_eq!(command, "llamash-test-no-such-binary list")
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }
}
