//! Model inventory commands: list, show, rm, select, model.

use std::error::Error;

use tracing::debug;

use crate::cli::Context;
use crate::core::catalog::{fetch_catalog, format_catalog_table};
use crate::core::config::Config;
use crate::core::local_models::format_local_table;
use crate::core::model_id::{ModelIdentifier, PatternParser};
use crate::core::progress::Spinner;

/// Normalizes `raw` and reports whether it is installed, telling the user
/// about anything the normalizer had to drop.
pub(crate) async fn resolve_local(
    ctx: &Context,
    raw: &str,
) -> Result<(ModelIdentifier, bool), Box<dyn Error>> {
    let normalized = ModelIdentifier::normalize_with(&PatternParser, raw);
    if let Some(discarded) = &normalized.discarded {
        eprintln!("⚠️  Ignoring '{discarded}' in model name; using {}", normalized.id);
    }

    let spinner = Spinner::start("Checking local models");
    let present = ctx.inventory.is_model_present(&normalized.id).await;
    spinner.stop().await;

    let present = present?;
    debug!(model = %normalized.id, present, "Checked local inventory");
    Ok((normalized.id, present))
}

pub async fn list_models(ctx: &Context, limit: usize, local: bool) -> Result<(), Box<dyn Error>> {
    if local {
        let listing = ctx.inventory.list().await?;
        match format_local_table(&listing) {
            Some(table) => println!("{table}"),
            None => println!("💡 No models found. Pull one with: llamash pull <model>"),
        }
        return Ok(());
    }

    let spinner = Spinner::start("Fetching the model library");
    let models = fetch_catalog(ctx.config.catalog_url()).await;
    spinner.stop().await;

    match models {
        Ok(models) if models.is_empty() => {
            eprintln!("⚠️  The model library page listed no models.");
        }
        Ok(models) => println!("{}", format_catalog_table(&models, limit)),
        Err(err) => {
            eprintln!("❌ Could not fetch {}: {err}", ctx.config.catalog_url());
            std::process::exit(1);
        }
    }
    Ok(())
}

pub async fn show_model(ctx: &Context, raw: &str) -> Result<(), Box<dyn Error>> {
    let (model, present) = resolve_local(ctx, raw).await?;
    if !present {
        eprintln!("❌ Model {model} not found. No information available.");
        std::process::exit(1);
    }

    match ctx.inventory.show(&model).await {
        Ok(info) => println!("{info}"),
        Err(err) => {
            eprintln!("❌ Unable to retrieve model information: {err}");
            std::process::exit(1);
        }
    }
    Ok(())
}

pub async fn remove_model(ctx: &Context, raw: &str) -> Result<(), Box<dyn Error>> {
    let (model, present) = resolve_local(ctx, raw).await?;
    if !present {
        eprintln!("❌ Model {model} not found locally. Cannot remove a model that does not exist.");
        std::process::exit(1);
    }

    println!("Removing model {model}...");
    let spinner = Spinner::start(format!("Removing {model}"));
    let result = ctx.inventory.remove(&model).await;
    spinner.stop().await;

    match result {
        Ok(()) => {
            println!("✅ Model {model} removed.");
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    }
}

pub async fn select_model(ctx: &Context, raw: &str) -> Result<(), Box<dyn Error>> {
    let (model, present) = resolve_local(ctx, raw).await?;
    if !present {
        eprintln!("❌ Model {model} not found. Pull it first with: llamash pull {model}");
        std::process::exit(1);
    }

    Config::update_at(&ctx.config_path, |config| {
        config.set_model(&model);
        Ok(())
    })?;
    println!("✅ Current model: {model}");
    Ok(())
}

pub fn show_current_model(ctx: &Context) -> Result<(), Box<dyn Error>> {
    match ctx.config.current_model() {
        Some(model) => println!("Current model: {model}"),
        None => println!("💡 No model selected. Choose one with: llamash select <model>"),
    }
    Ok(())
}
