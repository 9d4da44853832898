use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;

use manualbot_rag::pipeline::Pipeline;
use manualbot_types::Conversation;

/// Run the interactive chat REPL.
///
/// History accumulates for the life of the session and is forwarded with
/// every question, so follow-ups can refer to earlier turns.
pub async fn run_chat(pipeline: Arc<Pipeline>) -> Result<()> {
    println!("manualbot chat");
    println!("Type your question and press Enter. Type 'exit' or Ctrl+D to quit.\n");

    let mut conversation = Conversation::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line)?;
        if bytes == 0 {
            // EOF (Ctrl+D)
            println!();
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match pipeline.answer(&mut conversation, input).await {
            Ok(reply) => println!("{reply}\n"),
            Err(e) => eprintln!("[error: {e}]\n"),
        }
    }

    println!("Goodbye!");
    Ok(())
}
