use std::error::Error;

use tracing::{debug, warn};

use crate::cli::models::resolve_local;
use crate::cli::Context;
use crate::core::catalog::{fetch_catalog, format_catalog_table, DEFAULT_LIMIT};
use crate::core::config::Config;
use crate::core::progress::pull_indicator;

/// Pulls a model unless it is already installed, then makes it current.
pub async fn pull_model(ctx: &Context, raw: &str) -> Result<(), Box<dyn Error>> {
    let (model, present) = resolve_local(ctx, raw).await?;
    if present {
        println!("💡 Model {model} is already present locally. No need to pull again.");
        return Ok(());
    }

    println!("Pulling model {model}...");
    let mut progress = pull_indicator(&model.canonical());
    match ctx.client.pull(&model.canonical(), &mut progress).await {
        Ok(state) => {
            debug!(model = %model, total = ?state.total, "Pull finished");
            Config::update_at(&ctx.config_path, |config| {
                config.set_model(&model);
                Ok(())
            })?;
            println!("✅ {model} pulled successfully.");
            println!("Current model: {model}");
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ Failed to pull {model}: {err}");
            print_catalog_hint(ctx).await;
            std::process::exit(1);
        }
    }
}

async fn print_catalog_hint(ctx: &Context) {
    match fetch_catalog(ctx.config.catalog_url()).await {
        Ok(models) if !models.is_empty() => {
            eprintln!("💡 Here is a short list of available models:");
            eprintln!("{}", format_catalog_table(&models, DEFAULT_LIMIT));
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "Could not fetch the model library for the hint"),
    }
}
