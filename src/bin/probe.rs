//! musicalert-probe: liveness check and test alert sender.
//!
//! Without `--fire`, exits 0 when `/healthz` answers and 1 otherwise, for
//! use by service supervision. With `--fire <rule name>`, posts a synthetic
//! firing alert in Grafana's unified alerting format and prints the reply.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "musicalert-probe", about = "Check or exercise a running musicalert-rs")]
struct Args {
    /// Base URL of the receiver
    #[arg(long, default_value = "http://127.0.0.1:8333")]
    url: String,

    /// Post a firing alert with this rule name
    #[arg(long)]
    fire: Option<String>,

    /// Value string to attach to the fired alert
    #[arg(long, default_value = "")]
    value: String,

    /// User-Agent to send, for receivers that require one
    #[arg(long, default_value = "Grafana")]
    user_agent: String,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/').to_string();

    // Short timeouts: supervision calls this often
    let client = Client::builder()
        .connect_timeout(Duration::from_millis(300))
        .timeout(Duration::from_secs(3))
        .user_agent(args.user_agent.clone())
        .build()
        .unwrap_or_else(|_| Client::new());

    let healthy = match client.get(format!("{base}/healthz")).send().await {
        Ok(resp) => resp
            .json::<HealthResponse>()
            .await
            .ok()
            .and_then(|h| h.status)
            .is_some_and(|s| s == "ok"),
        Err(e) => {
            eprintln!("musicalert unreachable at {base}: {e}");
            false
        }
    };

    if !healthy {
        return ExitCode::FAILURE;
    }

    let Some(rule_name) = args.fire else {
        println!("ok");
        return ExitCode::SUCCESS;
    };

    let payload = json!({
        "receiver": "musicalert-probe",
        "status": "firing",
        "alerts": [{
            "status": "firing",
            "labels": { "alertname": rule_name },
            "valueString": args.value,
        }],
    });

    match client.post(format!("{base}/alert")).json(&payload).send().await {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            println!("{status}: {body}");
            if status.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Failed to post alert: {e}");
            ExitCode::FAILURE
        }
    }
}
