//! AutoSphere AI interactive shell
//!
//! Authenticates against IBM Cloud, builds the agent and runs a chat loop in
//! the terminal.

mod shell;

use std::process::ExitCode;
use std::sync::Arc;

use console::style;
use dialoguer::Password;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autosphere_runtime::{
    AgentError, GREETING, WatsonxSettings, connect, require_project_id, validate_api_key,
};

use crate::shell::{AgentBackend, QUIT_HINT, RustylineReader, Shell};

const RULE: &str = "==================================================";

fn print_banner() {
    println!("{}", style("🚀 AutoSphere AI: Automate, Assist, Achieve").bold());
    println!("{RULE}");
    println!("India-Centric AI Automation Platform");
    println!("Built with IBM watsonx.ai & Rust");
    println!("{RULE}");
}

fn prompt_secret(prompt: &str) -> anyhow::Result<String> {
    Ok(Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?)
}

/// Fill in missing credentials from the terminal, validating the key before
/// asking for the project.
async fn authenticate(settings: &mut WatsonxSettings) -> anyhow::Result<Option<(String, String)>> {
    if settings.api_key.is_none() {
        println!("🔐 AutoSphere AI - IBM Cloud Authentication");
        println!("{RULE}");
        settings.api_key = Some(prompt_secret("Please enter your IBM Cloud API key")?);
    }

    let api_key = match validate_api_key(settings).await {
        Ok(key) => key,
        Err(AgentError::InvalidApiKey) => {
            println!("{}", style("❌ Invalid API Key. Please check and try again.").red());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    println!("✅ API Key is valid. Token generated successfully.");

    if settings.project_id.is_none() {
        settings.project_id = Some(prompt_secret("Please enter your project ID")?);
    }

    let Ok(project_id) = require_project_id(settings) else {
        println!("{}", style("❌ Project ID is required.").red());
        return Ok(None);
    };
    println!("✅ Project ID set successfully");

    Ok(Some((api_key, project_id)))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::from_filename("config.env").ok();
    dotenvy::dotenv().ok();

    // Logs go to stderr so the chat stays readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    print_banner();

    let mut settings = WatsonxSettings::from_env();

    let (api_key, project_id) = match authenticate(&mut settings).await {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return Ok(ExitCode::FAILURE),
        Err(e) => {
            println!("{}", style(format!("❌ Failed to initialize AutoSphere AI: {e}")).red());
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("🤖 Creating AutoSphere AI Agent...");
    let agent = match connect(&settings, api_key, project_id).await {
        Ok(agent) => agent,
        Err(e) => {
            println!("{}", style(format!("❌ Failed to initialize AutoSphere AI: {e}")).red());
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("✅ AutoSphere AI Agent created successfully!");

    println!("🎯 Ready to assist with automation, assistance, and achievement!");
    println!("{RULE}");
    println!("{GREETING}");
    println!("{QUIT_HINT}\n");

    let backend = AgentBackend::new(Some(Arc::new(agent)));
    let mut shell = Shell::new(RustylineReader::new()?, backend, std::io::stdout());
    shell.run().await?;

    Ok(ExitCode::SUCCESS)
}
