//! `boardroom extract`: show what the tool-call extractor finds.

use std::io::Read;

pub fn run(text: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    match boardroom_agent::extract_tool_call(&text) {
        Some(call) => {
            let shown = serde_json::json!({ "tool": call.name, "payload": call.payload });
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        None => println!("No tool call found."),
    }
    Ok(())
}
