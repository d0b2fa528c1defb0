// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley models list` and `parley models sync`.

use parley_completion::{ModelCatalog, OpenAiCompatProvider, discover_models};
use parley_config::ParleyConfig;
use parley_core::ParleyError;
use tracing::info;

async fn open_catalog(config: &ParleyConfig) -> Result<ModelCatalog, ParleyError> {
    ModelCatalog::load_or_seed(
        &config.completion.model_catalog_path,
        &config.completion.catalog_seeds(),
    )
    .await
}

pub async fn run_list(config: &ParleyConfig) -> Result<(), ParleyError> {
    let catalog = open_catalog(config).await?;
    let models = catalog.list();
    if models.is_empty() {
        println!("catalog is empty: run `parley models sync`");
        return Ok(());
    }
    for (i, model) in models.iter().enumerate() {
        let marker = if model.id == config.completion.default_model {
            "  (default)"
        } else {
            ""
        };
        println!("{:>3}. {}{marker}", i + 1, model.id);
    }
    Ok(())
}

/// Probes every seed model and replaces the catalog with the ones that answered.
pub async fn run_sync(config: &ParleyConfig) -> Result<(), ParleyError> {
    let catalog = open_catalog(config).await?;
    let provider = OpenAiCompatProvider::new(&config.completion)?;
    let seeds = config.completion.catalog_seeds();

    let found = match discover_models(&provider, &seeds, config.completion.request_timeout()).await {
        Err(ParleyError::Disabled) => {
            return Err(ParleyError::Config(
                "model sync needs completion.api_key (or PARLEY_COMPLETION_API_KEY)".into(),
            ));
        }
        other => other?,
    };

    if found.is_empty() {
        println!("no model answered; catalog unchanged ({})", catalog.path().display());
        return Ok(());
    }

    for model in &found {
        println!("  ok  {}", model.id);
    }
    let count = found.len();
    catalog.replace(found).await?;
    info!(count, path = %catalog.path().display(), "model catalog replaced");
    println!("{count} model(s) written to {}", catalog.path().display());
    Ok(())
}
