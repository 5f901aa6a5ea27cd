//! Interactive question loop.

use anyhow::Result;
use docqa_rag::{Assistant, UploadOutcome};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

const PROMPT: &str = "You: ";

/// Read questions until `q`, `quit`, `exit`, Ctrl-C or Ctrl-D.
///
/// Lines starting with `:` are commands: `:upload <path>`, `:history`,
/// `:reindex`, `:help`.
pub async fn run(assistant: &Assistant) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    if assistant.has_index().await {
        println!("Ready. Ask a question about your documents ('q' to quit, ':help' for commands).");
    } else {
        println!(
            "No documents indexed yet. Add PDFs to {} or use ':upload <path>'.",
            assistant.docs_dir().display()
        );
    }

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(input) {
            debug!(error = %e, "failed to record line in editor history");
        }

        if matches!(input.to_lowercase().as_str(), "q" | "quit" | "exit") {
            break;
        }

        match input.strip_prefix(':') {
            Some(command) => handle_command(assistant, command).await,
            None => {
                let exchange = assistant.ask(input).await;
                println!("\nAssistant: {}\n", exchange.answer);
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

async fn handle_command(assistant: &Assistant, command: &str) {
    let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "upload" if !arg.trim().is_empty() => match assistant.upload_file(arg.trim()).await {
            Ok(outcome) => println!("{}", describe_upload(&outcome)),
            Err(e) => println!("{}", e.user_message()),
        },
        "upload" => println!("Usage: :upload <path-to-pdf>"),
        "history" => {
            let history = assistant.history().await;
            if history.is_empty() {
                println!("No questions asked yet.");
            }
            for (i, turn) in history.iter().enumerate() {
                println!("{}. You: {}\n   Assistant: {}", i + 1, turn.question, turn.answer);
            }
        }
        "reindex" => match assistant.rebuild().await {
            Ok(true) => println!("Index rebuilt."),
            Ok(false) => println!("No PDF documents found in {}.", assistant.docs_dir().display()),
            Err(e) => println!("Re-indexing failed: {e}"),
        },
        "help" => {
            println!(":upload <path>  add a PDF and re-index");
            println!(":history        show this session's questions");
            println!(":reindex        rebuild the index from scratch");
            println!("q | quit | exit end the session");
        }
        other => println!("Unknown command ':{other}'. Try ':help'."),
    }
}

/// One-line summary of an upload for the terminal.
pub fn describe_upload(outcome: &UploadOutcome) -> String {
    if outcome.indexed {
        format!("File '{}' uploaded and indexed. Chat history cleared.", outcome.file_name)
    } else {
        format!("File '{}' uploaded, but it contains no indexable text.", outcome.file_name)
    }
}
