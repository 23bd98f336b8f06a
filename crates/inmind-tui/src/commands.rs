//! One-shot commands that print to stdout

use anyhow::{Context, Result};
use colored::*;
use inmind_core::{ApiClient, ChatBackend, Config, ConversationId};

pub async fn health(client: &ApiClient) -> Result<()> {
    println!("\n{}", "🩺 Backend Health".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("API: {}", client.base_url().cyan());

    match client.health().await {
        Ok(health) => println!(
            "  • backend: {} ({})",
            health.status.green(),
            health.timestamp.dimmed()
        ),
        Err(e) => println!("  • backend: {} {}", "unreachable".red(), e),
    }

    match client.model_health().await {
        Ok(models) => {
            println!("  • models: {}", models.status.green());
            if models.models.is_empty() {
                println!("    {}", "No models reported".yellow());
            }
            for model in models.models {
                println!("    - {}", model);
            }
        }
        Err(e) => println!("  • models: {} {}", "unavailable".red(), e),
    }

    Ok(())
}

pub async fn conversation(client: &ApiClient, id: &str) -> Result<()> {
    let summary = client
        .get_conversation(&ConversationId::new(id))
        .await
        .context("Failed to fetch conversation")?;

    println!("\n{}", format!("💬 Conversation {}", summary.conversation_id).bold().blue());
    println!("{}", "=".repeat(40).dimmed());
    println!("  user:     {}", summary.user_id);
    println!("  state:    {}", summary.state.green());
    println!("  messages: {}", summary.message_count.to_string().bold());
    println!("  created:  {}", summary.created_at.dimmed());
    println!("  updated:  {}", summary.updated_at.dimmed());

    Ok(())
}

pub async fn end(client: &ApiClient, id: &str) -> Result<()> {
    let ack = client
        .end_conversation(&ConversationId::new(id))
        .await
        .context("Failed to end conversation")?;

    println!("{} {}", "✓".green(), ack);
    Ok(())
}

/// Print the resolved config; with `save`, persist the explicit values first.
/// The file config with flag values applied, or `None` when no value flag
/// was given and there is nothing to write.
fn persisted_config(
    file_config: Config,
    api_url: Option<String>,
    user_id: Option<String>,
) -> Option<Config> {
    if api_url.is_none() && user_id.is_none() {
        return None;
    }
    Some(file_config.with_overrides(api_url, user_id))
}

/// Print the resolved configuration. `--api-url`/`--user-id` are written
/// to the config file first.
pub fn show_config(api_url: Option<String>, user_id: Option<String>) -> Result<()> {
    let file_config = Config::load().context("Failed to load config")?;

    if let Some(updated) = persisted_config(file_config, api_url.clone(), user_id.clone()) {
        let path = updated.save().context("Failed to save config")?;
        println!("{} {}", "Saved".green(), path.display());
    }

    let resolved = Config::load()
        .context("Failed to load config")?
        .with_env()
        .with_overrides(api_url, user_id);

    let path = Config::get_config_path()?;
    println!("\n{}", "⚙️  Configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  file:    {}", path.display().to_string().dimmed());
    println!("  api url: {}", resolved.api_url().cyan());
    println!("  user id: {}", resolved.user_id().cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_without_value_flags_is_not_persisted() {
        assert_eq!(persisted_config(Config::default(), None, None), None);
    }

    #[test]
    fn test_config_value_flags_are_persisted() {
        let file_config = Config::default().with_overrides(None, Some("user-042".to_string()));

        let updated =
            persisted_config(file_config, Some("http://backend:9000/api".to_string()), None)
                .unwrap();
        assert_eq!(updated.api_url(), "http://backend:9000/api");
        assert_eq!(updated.user_id(), "user-042");
    }
}
