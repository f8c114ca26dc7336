//! Subcommands and the shared session bootstrap.

pub mod ask;
pub mod chat;
pub mod config_cmd;

use std::sync::Arc;

use kbchat_agent::{ConversationOrchestrator, PromptAssembler, TurnResult};
use kbchat_config::{ConfigError, ConfigResolver, EffectiveConfig, Settings};
use kbchat_core::message::ConversationMemory;
use kbchat_providers::BedrockProvider;
use kbchat_retrieval::KnowledgeBaseRetriever;
use kbchat_security::CredentialBroker;
use tracing::info;

/// Flags shared by every subcommand.
pub struct GlobalOpts {
    pub strict_config: bool,
    pub environment: Option<String>,
}

pub fn resolve_config(opts: &GlobalOpts) -> Result<EffectiveConfig, ConfigError> {
    let resolver = match &opts.environment {
        Some(env) => ConfigResolver::for_environment(env.clone()),
        None => ConfigResolver::from_env(),
    };
    resolver.strict(opts.strict_config).resolve()
}

pub fn load_settings(opts: &GlobalOpts) -> Result<Settings, ConfigError> {
    Settings::from_config(&resolve_config(opts)?)
}

/// Build a ready orchestrator: role exchange, service clients, templates.
///
/// Any failure here is fatal to the session; nothing is offered to the user
/// until this succeeds.
pub async fn bootstrap(
    settings: &Settings,
    memory: ConversationMemory,
) -> kbchat_core::Result<ConversationOrchestrator> {
    let broker = CredentialBroker::from_settings(settings)?;
    let session = Arc::new(broker.establish(settings).await?);

    let retriever = KnowledgeBaseRetriever::from_settings(settings, session.clone())?;
    let provider = BedrockProvider::from_settings(settings, session)?;
    let assembler = PromptAssembler::load(&settings.templates_dir)?;

    info!(
        environment = %settings.environment,
        model = %settings.model_id,
        knowledge_base_id = %settings.knowledge_base_id,
        "Session ready"
    );

    Ok(ConversationOrchestrator::new(
        Arc::new(provider),
        Arc::new(retriever),
        assembler,
        memory,
    ))
}

/// Print an answer with its cited sources, or the turn's error.
pub fn print_turn(result: &TurnResult) {
    if let Some(err) = &result.error {
        eprintln!("  [Error] {err}");
        eprintln!("  Please try again.");
        return;
    }

    println!();
    for line in result.answer.lines() {
        println!("  Assistant > {line}");
    }

    if !result.sources.is_empty() {
        println!();
        println!("  Source Documents");
        for doc in &result.sources {
            println!("  Source: {}", doc.source_url().unwrap_or_else(|| "N/A".into()));
            println!("  Number: {}", doc.identifier().unwrap_or_else(|| "N/A".into()));
            println!("  {}", doc.payload);
            println!("  ---");
        }
    }
    println!();
}
