//! Command-line client for the pastelite API.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pastelite_core::DEFAULT_CLI_SERVER_URL;
use serde_json::{json, Value};
use std::io::{self, Read};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "lpaste", about = "pastelite CLI", version)]
struct Cli {
    /// Server URL (can also be set via LP_SERVER env var)
    #[arg(short, long, env = "LP_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Print timing for API requests
    #[arg(long, global = true)]
    timing: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Create a paste from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<String>,
        /// Seconds until the paste expires
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        ttl: Option<u64>,
        /// Number of views before the paste is deleted
        #[arg(short = 'm', long, value_parser = clap::value_parser!(u64).range(1..))]
        max_views: Option<u64>,
    },
    /// Print a paste (consumes one view)
    Get { id: String },
    /// Check server and storage health
    Health,
}

fn log_timing(timing: bool, label: &str, duration: Duration) {
    if timing {
        eprintln!(
            "[timing] {}: {:.1} ms",
            label,
            duration.as_secs_f64() * 1000.0
        );
    }
}

fn log_timing_parts(timing: bool, label: &str, request: Duration, parse: Duration) {
    if !timing {
        return;
    }
    eprintln!(
        "[timing] {}: request {:.1} ms, parse {:.1} ms, total {:.1} ms",
        label,
        request.as_secs_f64() * 1000.0,
        parse.as_secs_f64() * 1000.0,
        (request + parse).as_secs_f64() * 1000.0
    );
}

/// Human-readable failure text for an error response body.
///
/// Prefers the server's `details`, then its `error`, then the raw body.
fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        if let Some(message) = field("details").or_else(|| field("error")) {
            return message;
        }
    }

    body.to_string()
}

async fn ensure_success_or_exit(res: reqwest::Response, action: &str) -> reqwest::Response {
    let status = res.status();
    if status.is_success() {
        return res;
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    let message = error_message_for_response(status, &body);
    eprintln!("{} failed ({}): {}", action, status, message);
    std::process::exit(1);
}

fn create_body(content: String, ttl: Option<u64>, max_views: Option<u64>) -> Value {
    let mut body = json!({ "content": content });
    if let Some(ttl) = ttl {
        body["ttl_seconds"] = ttl.into();
    }
    if let Some(max_views) = max_views {
        body["max_views"] = max_views.into();
    }
    body
}

fn render_json(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("response encoding error: {}", err))
}

fn format_new_output(created: &Value, json: bool) -> Result<String, String> {
    if json {
        return render_json(created);
    }
    created
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "response missing 'url' field".to_string())
}

fn format_get_output(paste: &Value, json: bool) -> Result<String, String> {
    if json {
        return render_json(paste);
    }

    paste
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "response missing 'content' field".to_string())
}

/// Footer describing the limits left on a fetched paste, if any.
fn describe_limits(paste: &Value) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(remaining) = paste.get("remaining_views").and_then(Value::as_u64) {
        parts.push(format!("{} view(s) left", remaining));
    }
    if let Some(expires_at) = paste.get("expires_at").and_then(Value::as_str) {
        parts.push(format!("expires {}", expires_at));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    let mut path = url
        .path_segments_mut()
        .map_err(|_| "Server URL cannot be used as an API base".to_string())?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

fn api_url_or_exit(server: &str, action: &str, segments: &[&str]) -> reqwest::Url {
    match api_url(server, segments) {
        Ok(url) => url,
        Err(message) => {
            eprintln!("{} failed: {}", action, message);
            std::process::exit(1);
        }
    }
}

fn normalize_server(server: String) -> String {
    if let Ok(mut url) = reqwest::Url::parse(&server) {
        let should_normalize_localhost =
            url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
        if should_normalize_localhost && url.set_host(Some("127.0.0.1")).is_err() {
            return server;
        }
        let mut normalized = url.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        return normalized;
    }
    server
}

fn resolve_server(server: Option<String>) -> String {
    server
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CLI_SERVER_URL.to_string())
}

fn read_content(file: Option<String>) -> anyhow::Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn exit_with(action: &str, message: String) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        server,
        json,
        timing,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    let server = normalize_server(resolve_server(server));

    match command {
        Commands::Completions { .. } => unreachable!("completions handled before client setup"),
        Commands::New {
            file,
            ttl,
            max_views,
        } => {
            let endpoint = api_url_or_exit(&server, "New", &["api", "pastes"]);
            let body = create_body(read_content(file)?, ttl, max_views);

            let request_start = Instant::now();
            let res = client.post(endpoint).json(&body).send().await?;
            let request_elapsed = request_start.elapsed();
            let res = ensure_success_or_exit(res, "New").await;

            let parse_start = Instant::now();
            let created: Value = res.json().await?;
            log_timing_parts(timing, "new", request_elapsed, parse_start.elapsed());

            let output = format_new_output(&created, json).unwrap_or_else(|m| exit_with("New", m));
            println!("{}", output);
        }
        Commands::Get { id } => {
            let endpoint = api_url_or_exit(&server, "Get", &["api", "pastes", id.as_str()]);
            let request_start = Instant::now();
            let res = client.get(endpoint).send().await?;
            let request_elapsed = request_start.elapsed();
            let res = ensure_success_or_exit(res, "Get").await;

            let parse_start = Instant::now();
            let paste: Value = res.json().await?;
            log_timing_parts(timing, "get", request_elapsed, parse_start.elapsed());

            let output = format_get_output(&paste, json).unwrap_or_else(|m| exit_with("Get", m));
            println!("{}", output);
            if !json {
                if let Some(limits) = describe_limits(&paste) {
                    eprintln!("({})", limits);
                }
            }
        }
        Commands::Health => {
            let endpoint = api_url_or_exit(&server, "Health", &["api", "healthz"]);
            let request_start = Instant::now();
            let res = client.get(endpoint).send().await?;
            log_timing(timing, "health", request_start.elapsed());
            let status = res.status();
            let body: Value = res.json().await.unwrap_or(Value::Null);

            if json {
                println!("{}", render_json(&body).unwrap_or_else(|m| exit_with("Health", m)));
            } else if status.is_success() {
                println!("ok");
            } else {
                let reason = body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                println!("unhealthy ({}): {}", status, reason);
            }
            if !status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
