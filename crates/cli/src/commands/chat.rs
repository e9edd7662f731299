//! `gridline chat`: interactive conversation.

use std::io::Write;

use gridline_agent::Session;
use tracing::{info, warn};

use super::Options;
use super::console::{self, Input};

pub async fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, config) = super::open_session(options).await?;

    println!();
    println!("  Gridline: Interactive Mode");
    println!();
    println!("  Server:  {}", session.server_name());
    println!("  Model:   {}", config.model);
    println!("  Tools:   {}", session.tools().names().join(", "));
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'clear context' to start over, 'quit' or 'exit' to leave.");
    println!();

    let result = chat_loop(&mut session).await;
    info!("Chat ended");
    session.shutdown().await;

    println!();
    println!("  Goodbye!");
    println!();
    result
}

async fn chat_loop(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    print_reply(&session.greet().await);

    let mut rx = console::start();
    prompt()?;

    while let Some(input) = rx.recv().await {
        match input {
            Ok(Input::Quit) => break,
            Ok(Input::ClearContext) => {
                session.clear();
                println!();
                println!("  Context cleared.");
                print_reply(&session.greet().await);
            }
            Ok(Input::Query(query)) => {
                eprint!("  ...");
                let result = session.ask(&query).await;
                eprint!("\r     \r");
                match result {
                    Ok(response) => print_reply(&response),
                    Err(e) => {
                        warn!(error = %e, "Query failed");
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                eprintln!("  [Input Error] {e}");
                break;
            }
        }
        prompt()?;
    }

    Ok(())
}

fn print_reply(text: &str) {
    println!();
    for line in text.lines() {
        println!("  Assistant > {line}");
    }
    println!();
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
