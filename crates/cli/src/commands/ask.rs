//! `kbchat ask` — Answer a single question.

use kbchat_core::message::ConversationMemory;

use super::GlobalOpts;

pub async fn run(opts: &GlobalOpts, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let settings = super::load_settings(opts).map_err(|e| format!("Failed to load config: {e}"))?;
    let mut orchestrator = super::bootstrap(&settings, ConversationMemory::empty())
        .await
        .map_err(|e| format!("Failed to start session: {e}"))?;

    eprint!("  Thinking...");
    let result = orchestrator.submit(question).await;
    eprint!("\r              \r");

    super::print_turn(&result);
    match result.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
