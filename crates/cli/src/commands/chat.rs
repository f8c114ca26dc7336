//! `kbchat chat` — Interactive conversation.
//!
//! Reads questions from stdin, one per line. `/clear` resets the
//! conversation, `/reconnect` re-runs the session bootstrap while keeping
//! the conversation, and `exit` or `quit` leaves.

use std::io::Write;

use kbchat_core::message::ConversationMemory;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::warn;

use super::GlobalOpts;

enum Input<'a> {
    Question(&'a str),
    Clear,
    Reconnect,
    Exit,
    Blank,
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        "exit" | "quit" | "/exit" | "/quit" | ":q" => Input::Exit,
        "/clear" => Input::Clear,
        "/reconnect" => Input::Reconnect,
        question => Input::Question(question),
    }
}

pub async fn run(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let settings = super::load_settings(opts).map_err(|e| format!("Failed to load config: {e}"))?;
    let memory = ConversationMemory::new(settings.welcome_message.clone());
    let mut orchestrator = super::bootstrap(&settings, memory)
        .await
        .map_err(|e| format!("Failed to start session: {e}"))?;

    println!();
    println!("  kbchat — Interactive Mode");
    println!();
    println!("  Environment:     {}", settings.environment);
    println!("  Model:           {}", settings.model_id);
    println!("  Knowledge base:  {}", settings.knowledge_base_id);
    println!();
    println!("  Type your question and press Enter.");
    println!("  /clear resets the conversation, /reconnect renews credentials,");
    println!("  'exit' or Ctrl+C quits.");
    println!();

    for turn in orchestrator.memory().turns() {
        println!("  Assistant > {}", turn.text);
    }
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match classify(&line) {
            Input::Blank => continue,
            Input::Exit => break,
            Input::Clear => {
                orchestrator.clear();
                println!("  Chat history cleared.");
                println!();
                for turn in orchestrator.memory().turns() {
                    println!("  Assistant > {}", turn.text);
                }
                println!();
            }
            Input::Reconnect => {
                let memory = orchestrator.memory().clone();
                match super::bootstrap(&settings, memory).await {
                    Ok(renewed) => {
                        orchestrator = renewed;
                        println!("  Session renewed.");
                    }
                    Err(e) => {
                        warn!(error = %e, "Reconnect failed; keeping the current session");
                        eprintln!("  [Error] Reconnect failed: {e}");
                    }
                }
                println!();
            }
            Input::Question(question) => {
                eprint!("  Generating response...");
                let result = orchestrator.submit(question).await;
                eprint!("\r                         \r");
                super::print_turn(&result);
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
