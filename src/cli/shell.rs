//! Interactive `run` shell

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::api::ChatMessage;
use crate::cli::models::resolve_local;
use crate::cli::Context;
use crate::core::attachments::{AttachmentError, TurnBuilder};
use crate::core::conversation::Conversation;
use crate::core::model_id::ModelIdentifier;
use crate::core::progress::response_indicator;
use crate::utils::logging::LoggingState;

const PROMPT: &str = ">>> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    File(PathBuf),
    Directory(PathBuf),
    Image(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Empty,
    Help,
    Exit,
    ToggleLog,
    Turn {
        text: String,
        attachments: Vec<Attachment>,
    },
}

const ATTACHMENT_FLAGS: [&str; 3] = ["file", "directory", "images"];

/// Splits a shell line into prompt text and `--file`, `--directory`, or
/// `--images` suffixes. Each suffix takes the rest of its segment as a path;
/// any other `--word` stays part of the text before it.
pub fn parse_shell_line(line: &str) -> Result<ShellInput, String> {
    match line.trim() {
        "" => return Ok(ShellInput::Empty),
        "help" | "?" => return Ok(ShellInput::Help),
        "exit" => return Ok(ShellInput::Exit),
        "/log" => return Ok(ShellInput::ToggleLog),
        _ => {}
    }

    let padded = format!(" {line}");
    let mut segments = padded.split(" --");
    let mut pieces: Vec<(Option<&str>, String)> =
        vec![(None, segments.next().unwrap_or_default().to_string())];

    for segment in segments {
        let (kind, path) = segment.split_once(' ').unwrap_or((segment, ""));
        match ATTACHMENT_FLAGS.iter().find(|flag| **flag == kind) {
            Some(flag) => pieces.push((Some(*flag), path.to_string())),
            None => {
                if let Some((_, last)) = pieces.last_mut() {
                    last.push_str(" --");
                    last.push_str(segment);
                }
            }
        }
    }

    let mut pieces = pieces.into_iter();
    let text = pieces
        .next()
        .map(|(_, text)| text.trim().to_string())
        .unwrap_or_default();

    let mut attachments = Vec::new();
    for (kind, path) in pieces {
        let path = path.trim();
        let kind = kind.unwrap_or_default();
        if path.is_empty() {
            return Err(format!("Please provide a valid path after --{kind}."));
        }
        let path = PathBuf::from(path);
        attachments.push(match kind {
            "file" => Attachment::File(path),
            "directory" => Attachment::Directory(path),
            _ => Attachment::Image(path),
        });
    }

    if text.is_empty() && attachments.is_empty() {
        return Ok(ShellInput::Empty);
    }
    Ok(ShellInput::Turn { text, attachments })
}

fn compose_turn(text: &str, attachments: &[Attachment]) -> Result<ChatMessage, AttachmentError> {
    let mut turn = TurnBuilder::new(text);
    for attachment in attachments {
        match attachment {
            Attachment::File(path) => {
                println!("💡 Reading file: {}", path.display());
                turn.add_file(path)?;
            }
            Attachment::Directory(path) => {
                println!("💡 Reading directory: {}", path.display());
                turn.add_directory(path)?;
            }
            Attachment::Image(path) => {
                println!("💡 Reading image: {}", path.display());
                turn.add_image(path)?;
            }
        }
    }
    Ok(turn.build())
}

fn print_help() {
    println!("Ask something, or attach content with:");
    println!("  --file <path>        Append the content of a file");
    println!("  --directory <path>   Append every file under a directory");
    println!("  --images <path>      Attach an image (multimodal models only)");
    println!("  /log                 Pause or resume the transcript log");
    println!("Type 'exit' to leave the session.");
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>, Box<dyn Error>> {
    print!("{PROMPT}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

/// Asks until the user names an installed model. `None` means they quit.
async fn choose_model(
    ctx: &Context,
    initial: &str,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<Option<ModelIdentifier>, Box<dyn Error>> {
    let mut candidate = initial.to_string();
    loop {
        let (model, present) = resolve_local(ctx, &candidate).await?;
        if present {
            return Ok(Some(model));
        }
        eprintln!("❌ Model {model} not found. Enter a downloaded model, or 'exit'.");

        match read_line(lines).await? {
            Some(line) if line.trim() != "exit" => candidate = line,
            _ => return Ok(None),
        }
    }
}

pub async fn run_shell(ctx: &Context, model: &str, log: Option<String>) -> Result<(), Box<dyn Error>> {
    println!("Starting interactive shell session...");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut logging = LoggingState::new(log)?;

    let Some(model) = choose_model(ctx, model, &mut lines).await? else {
        println!("Exiting interactive shell session. Bye!");
        return Ok(());
    };
    let canonical = model.canonical();

    println!("💡 Type 'help' or '?' for available flags.");
    println!("Hello, how can I assist you? ({canonical})");

    let mut conversation = Conversation::new();
    while let Some(line) = read_line(&mut lines).await? {
        let input = match parse_shell_line(&line) {
            Ok(input) => input,
            Err(message) => {
                eprintln!("❌ {message}");
                eprintln!("💡 Use 'help' or '?' to see available commands.");
                continue;
            }
        };

        let (text, attachments) = match input {
            ShellInput::Empty => continue,
            ShellInput::Help => {
                print_help();
                continue;
            }
            ShellInput::Exit => break,
            ShellInput::ToggleLog => {
                match logging.toggle_logging() {
                    Ok(message) => println!("{message}"),
                    Err(err) => eprintln!("⚠️  {err}"),
                }
                continue;
            }
            ShellInput::Turn { text, attachments } => (text, attachments),
        };

        let pending = match compose_turn(&text, &attachments) {
            Ok(pending) => pending,
            Err(err) => {
                eprintln!("❌ {err}");
                continue;
            }
        };

        let payload = conversation.snapshot_with(&pending);
        let mut progress = response_indicator();
        match ctx.client.chat(&canonical, &payload, &mut progress).await {
            Ok(answer) => {
                println!("\n{answer}\n");
                let reply = ChatMessage::assistant(answer.as_str());
                for turn in [&pending, &reply] {
                    if let Err(err) = logging.log_turn(turn) {
                        eprintln!("⚠️  Transcript write failed: {err}");
                    }
                }
                conversation.record_exchange(pending, answer);
                debug!(turns = conversation.len(), "Conversation grew");
            }
            Err(err) => eprintln!("❌ Failed to get a response: {err}"),
        }
    }

    println!("Exiting interactive shell session.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(parse_shell_line("  "), Ok(ShellInput::Empty));
        assert_eq!(parse_shell_line("help"), Ok(ShellInput::Help));
        assert_eq!(parse_shell_line("?"), Ok(ShellInput::Help));
        assert_eq!(parse_shell_line("exit"), Ok(ShellInput::Exit));
        assert_eq!(parse_shell_line("/log"), Ok(ShellInput::ToggleLog));
    }

    #[test]
    fn plain_text_is_a_turn() {
        assert_eq!(
            parse_shell_line("why is the sky blue?"),
            Ok(ShellInput::Turn {
                text: "why is the sky blue?".to_string(),
                attachments: Vec::new(),
            })
        );
    }

    #[test]
    fn suffixes_become_attachments() {
        assert_eq!(
            parse_shell_line("explain this --file src/main.rs --images shot one.png"),
            Ok(ShellInput::Turn {
                text: "explain this".to_string(),
                attachments: vec![
                    Attachment::File(PathBuf::from("src/main.rs")),
                    Attachment::Image(PathBuf::from("shot one.png")),
                ],
            })
        );
        assert_eq!(
            parse_shell_line("--directory ./docs"),
            Ok(ShellInput::Turn {
                text: String::new(),
                attachments: vec![Attachment::Directory(PathBuf::from("./docs"))],
            })
        );
    }

    #[test]
    fn bad_suffixes_are_errors() {
        assert_eq!(
            parse_shell_line("hi --file"),
            Err("Please provide a valid path after --file.".to_string())
        );
    }

    #[test]
    fn other_double_dash_words_stay_in_the_text() {
        assert_eq!(
            parse_shell_line("what does the --verbose flag do?"),
            Ok(ShellInput::Turn {
                text: "what does the --verbose flag do?".to_string(),
                attachments: Vec::new(),
            })
        );
        assert_eq!(
            parse_shell_line("compare --files and --file notes.txt"),
            Ok(ShellInput::Turn {
                text: "compare --files and".to_string(),
                attachments: vec![Attachment::File(PathBuf::from("notes.txt"))],
            })
        );
        assert_eq!(
            parse_shell_line("read --file my --odd name.txt"),
            Ok(ShellInput::Turn {
                text: "read".to_string(),
                attachments: vec![Attachment::File(PathBuf::from("my --odd name.txt"))],
            })
        );
    }

    #[test]
    fn attachments_are_composed_into_one_turn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "contents").unwrap();

        let message = compose_turn("read", &[Attachment::File(path)]).unwrap();
        assert_eq!(message.content, "read\ncontents");

        let missing = dir.path().join("missing.png");
        assert!(compose_turn("x", &[Attachment::Image(missing)]).is_err());
    }
}
