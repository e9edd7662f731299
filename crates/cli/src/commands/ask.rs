//! `gridline ask`: one question, one answer.

use super::Options;

pub async fn run(options: &Options, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _config) = super::open_session(options).await?;

    eprint!("  Thinking...");
    let result = session.ask(message).await;
    eprint!("\r              \r");
    session.shutdown().await;

    println!("{}", result?);
    Ok(())
}
