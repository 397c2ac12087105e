//! One-shot `prompt` command

use std::error::Error;
use std::path::PathBuf;

use crate::cli::Context;
use crate::core::attachments::TurnBuilder;
use crate::core::progress::response_indicator;

#[derive(Debug, Default)]
pub struct PromptAttachments {
    pub file: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub images: Vec<PathBuf>,
}

/// Builds the single user turn for a prompt, in file, directory, image order.
pub fn compose_prompt(
    prompt: &str,
    attachments: &PromptAttachments,
) -> Result<TurnBuilder, Box<dyn Error>> {
    let mut turn = TurnBuilder::new(prompt);
    if let Some(file) = &attachments.file {
        eprintln!("💡 Reading file: {}", file.display());
        turn.add_file(file)?;
    }
    if let Some(directory) = &attachments.directory {
        eprintln!("💡 Reading directory: {}", directory.display());
        turn.add_directory(directory)?;
    }
    for image in &attachments.images {
        eprintln!("💡 Reading image: {}", image.display());
        turn.add_image(image)?;
    }
    Ok(turn)
}

pub async fn run_prompt(
    ctx: &Context,
    prompt: &str,
    attachments: &PromptAttachments,
) -> Result<(), Box<dyn Error>> {
    let Some(model) = ctx.config.current_model() else {
        eprintln!("💡 No model selected. Set one with: llamash select <model>");
        std::process::exit(1);
    };

    let turn = match compose_prompt(prompt, attachments) {
        Ok(turn) => turn,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };
    let messages = vec![turn.build()];

    let mut progress = response_indicator();
    match ctx
        .client
        .chat(&model.canonical(), &messages, &mut progress)
        .await
    {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ Error: {err}");
            std::process::exit(1);
        }
    }
}
