//! Model listing for the `models` command.

use std::error::Error;
use std::io::Write;

use crate::api::models::fetch_models;
use crate::api::ModelInfo;

use super::context::ChatContext;

pub async fn list_models(ctx: &ChatContext) -> Result<(), Box<dyn Error>> {
    ctx.ensure_session().await?;
    let models = fetch_models(ctx.client()).await?;
    let preferred = ctx
        .requested_model
        .clone()
        .or_else(|| ctx.config.preferences.model.clone());
    print_models(
        &mut std::io::stdout(),
        ctx.client().base_url(),
        &models,
        preferred.as_deref(),
    )?;
    Ok(())
}

fn print_models(
    out: &mut impl Write,
    server: &str,
    models: &[ModelInfo],
    preferred: Option<&str>,
) -> std::io::Result<()> {
    writeln!(out, "🤖 Available models on {server}")?;
    writeln!(out)?;
    if models.is_empty() {
        writeln!(out, "No models available on the server")?;
        return Ok(());
    }
    for model in models {
        let marker = if Some(model.name.as_str()) == preferred {
            " (default)"
        } else {
            ""
        };
        writeln!(out, "  • {}{marker}", model.label())?;
    }
    Ok(())
}
