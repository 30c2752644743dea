//! cirkl-cli: command-line client for the Cirkl memory server
//!
//! # Subcommands
//! - `add --user-id <id> --name <name> ...`: record a connection
//! - `status`: show server health

use clap::{Parser, Subcommand};
use cirkl_core::ConnectionRequest;
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "cirkl-cli",
    version,
    about = "Record connections in the Cirkl memory server"
)]
struct Cli {
    /// Cirkl HTTP server URL (overrides CIRKL_HTTP_URL env var)
    #[arg(long, env = "CIRKL_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Record a new connection for a user
    Add {
        #[arg(long)]
        user_id: String,

        /// Name of the person met
        #[arg(long)]
        name: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        location: String,

        /// Where or how the meeting happened
        #[arg(long)]
        context: String,

        #[arg(long)]
        score: f64,

        /// What was said during the meeting
        #[arg(long)]
        conversation: String,

        /// ISO-8601 time of the meeting; the server uses its clock if omitted
        #[arg(long)]
        timestamp: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show Cirkl server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddConnectionResponse {
    pub status: String,
    pub message: String,
    pub connection_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

/// Pull a readable message out of a `{detail}` error body. 422 bodies may
/// carry a list of field errors instead of a string.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match &v["detail"] {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => body.to_string(),
            other => other.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

pub fn format_added(resp: &AddConnectionResponse) -> String {
    format!("{}\nConnection id: {}", resp.message, resp.connection_id)
}

pub fn format_status(resp: &HealthResponse) -> String {
    format!(
        "Service:   {}\nStatus:    {}\nTimestamp: {}",
        resp.service, resp.status, resp.timestamp
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn do_add(server: &str, request: &ConnectionRequest, json_output: bool) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let url = format!("{}/api/connection/add", server);
    let resp = match client.post(&url).json(request).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("cirkl-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("cirkl-cli: server returned {}: {}", status, error_detail(&body));
        std::process::exit(1);
    }

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let added: AddConnectionResponse = resp.json()?;
        println!("{}", format_added(&added));
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let health: HealthResponse = r.json()?;
            println!("{}", format_status(&health));
        }
        Ok(r) => {
            eprintln!("cirkl-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("cirkl-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Add {
            user_id,
            name,
            role,
            company,
            location,
            context,
            score,
            conversation,
            timestamp,
            json,
        } => {
            let request = ConnectionRequest {
                user_id,
                connection_name: name,
                role,
                company,
                location,
                meeting_context: context,
                authenticity_score: score,
                conversation,
                timestamp,
            };
            do_add(&server, &request, json)
        }
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("cirkl-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
