use anyhow::Result;
use console::style;
use relay::agent::{Agent, CancelToken};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::input::{parse_input, Input};

const PROMPT: &str = "\nQuery: ";

/// Answer one query; Ctrl+C stops it at the next step boundary
pub async fn ask(agent: &Agent, query: &str) {
    let cancel = CancelToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    match agent.reply_with_cancel(query, &cancel).await {
        Ok(answer) => println!("\n{}", answer.text),
        Err(e) => eprintln!("\n{} {}", style("Error:").red().bold(), e),
    }
    watcher.abort();
}

/// Read queries until the user quits; a failed query is reported and the loop goes on
pub async fn chat_loop(agent: &Agent) -> Result<()> {
    println!("{}", style("relay client started").bold());
    println!("{}", style("Type your queries or 'quit' to exit.").dim());

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            Input::Exit => break,
            Input::AskAgain => continue,
            Input::Query(query) => {
                let _ = editor.add_history_entry(query.as_str());
                ask(agent, &query).await;
            }
        }
    }
    Ok(())
}
