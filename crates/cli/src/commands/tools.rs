//! `gridline tools`: print the server's tool catalog.

use gridline_core::tool::Tool;

use super::Options;

pub async fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let (session, _config) = super::open_session(options).await?;

    println!();
    println!("  Tools on {} ({}):", session.server_name(), session.tools().len());
    println!();
    for tool in session.tools().tools() {
        print!("{}", describe(tool));
    }

    session.shutdown().await;
    Ok(())
}

fn describe(tool: &Tool) -> String {
    let schema = tool.object_schema();
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut out = format!("  {}\n", tool.name);
    if !tool.description.is_empty() {
        out.push_str(&format!("      {}\n", tool.description));
    }
    if !required.is_empty() {
        out.push_str(&format!("      required: {}\n", required.join(", ")));
    }
    out.push('\n');
    out
}
