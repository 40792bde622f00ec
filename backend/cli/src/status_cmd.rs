//! CLI Status Command
//!
//! Fetches `/health` from a local server and prints the report.

use anyhow::Result;
use serde_json::Value;

pub async fn run(port: u16) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("http://localhost:{}/health", port);

    let resp = match client.get(&url).send().await {
        Ok(resp) => resp,
        Err(_) => {
            println!("Liime is not running on port {}", port);
            return Ok(());
        }
    };

    let body: Value = resp.json().await?;
    println!("\nLiime server status\n");
    println!("  Status:  {}", body["status"].as_str().unwrap_or("unknown"));
    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
    println!("  Uptime:  {}s", body["uptime_seconds"].as_u64().unwrap_or(0));
    println!("  Online:  {}", body["online"].as_u64().unwrap_or(0));

    if let Some(delivery) = body.get("delivery") {
        println!("\nDelivery:");
        println!("{}", serde_json::to_string_pretty(delivery)?);
    }

    Ok(())
}
