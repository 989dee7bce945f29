//! Unit tests for the `lpaste` CLI entrypoint module.

use super::{
    api_url, create_body, describe_limits, error_message_for_response, format_get_output,
    format_new_output, normalize_server, resolve_server,
};
use super::{Cli, Commands};
use clap::Parser;
use pastelite_core::env::{env_lock, EnvGuard};
use pastelite_core::{DEFAULT_CLI_SERVER_URL, DEFAULT_PORT};
use serde_json::json;

#[test]
fn normalize_server_matrix() {
    let cases = [
        (
            DEFAULT_CLI_SERVER_URL.to_string(),
            format!("http://127.0.0.1:{}", DEFAULT_PORT),
        ),
        (
            format!("https://localhost:{}", DEFAULT_PORT),
            format!("https://localhost:{}", DEFAULT_PORT),
        ),
        (
            format!("http://127.0.0.1:{}/", DEFAULT_PORT),
            format!("http://127.0.0.1:{}", DEFAULT_PORT),
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(normalize_server(input), expected);
    }
}

#[test]
fn default_cli_server_url_uses_default_port_constant() {
    assert_eq!(
        DEFAULT_CLI_SERVER_URL,
        format!("http://localhost:{}", DEFAULT_PORT)
    );
}

#[test]
fn error_message_prefers_details_then_error() {
    let status = reqwest::StatusCode::BAD_REQUEST;
    assert_eq!(
        error_message_for_response(
            status,
            r#"{"error":"Invalid input","details":"max_views must be an integer >= 1"}"#
        ),
        "max_views must be an integer >= 1"
    );
    assert_eq!(
        error_message_for_response(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"Paste not found or unavailable"}"#
        ),
        "Paste not found or unavailable"
    );
    assert_eq!(error_message_for_response(status, "plain failure"), "plain failure");
}

#[test]
fn error_message_uses_reason_for_empty_body() {
    let message = error_message_for_response(reqwest::StatusCode::BAD_REQUEST, "   ");
    assert_eq!(message, "Bad Request");
}

#[test]
fn create_body_omits_unset_limits() {
    assert_eq!(
        create_body("hi".to_string(), None, None),
        json!({ "content": "hi" })
    );
    assert_eq!(
        create_body("hi".to_string(), Some(60), Some(3)),
        json!({ "content": "hi", "ttl_seconds": 60, "max_views": 3 })
    );
}

#[test]
fn output_helpers_render_plain_and_json() {
    let created = json!({ "id": "abc123", "url": "http://127.0.0.1/p/abc123" });
    assert_eq!(
        format_new_output(&created, false).expect("plain"),
        "http://127.0.0.1/p/abc123"
    );
    let rendered = format_new_output(&created, true).expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
    assert_eq!(parsed["id"], "abc123");

    let paste = json!({ "content": "hello", "remaining_views": 2, "expires_at": null });
    assert_eq!(format_get_output(&paste, false).expect("plain"), "hello");
    assert!(format_get_output(&json!({}), false).is_err());
    assert!(format_new_output(&json!({ "id": "x" }), false).is_err());
}

#[test]
fn describe_limits_lists_only_present_limits() {
    assert_eq!(
        describe_limits(&json!({ "remaining_views": null, "expires_at": null })),
        None
    );
    assert_eq!(
        describe_limits(&json!({
            "remaining_views": 0,
            "expires_at": "2026-01-01T00:00:00.000Z"
        })),
        Some("0 view(s) left, expires 2026-01-01T00:00:00.000Z".to_string())
    );
}

#[test]
fn api_url_encodes_path_segments() {
    let url = api_url(
        &format!("http://127.0.0.1:{}", DEFAULT_PORT),
        &["api", "pastes", "id/with?reserved#chars"],
    )
    .expect("api_url should build");
    assert_eq!(
        url.as_str(),
        &format!(
            "http://127.0.0.1:{}/api/pastes/id%2Fwith%3Freserved%23chars",
            DEFAULT_PORT
        )
    );
}

#[test]
fn api_url_appends_segments_to_existing_base_path() {
    let url = api_url(
        &format!("http://127.0.0.1:{}/base", DEFAULT_PORT),
        &["api", "pastes", "abc123"],
    )
    .expect("api_url should build");
    assert_eq!(
        url.as_str(),
        &format!("http://127.0.0.1:{}/base/api/pastes/abc123", DEFAULT_PORT)
    );
}

#[test]
fn resolve_server_treats_blank_override_as_absent() {
    assert_eq!(resolve_server(None), DEFAULT_CLI_SERVER_URL);
    assert_eq!(resolve_server(Some("   ".to_string())), DEFAULT_CLI_SERVER_URL);
    assert_eq!(
        resolve_server(Some(" http://127.0.0.1:45556 ".to_string())),
        "http://127.0.0.1:45556"
    );
}

#[test]
fn lp_server_env_value_is_used() {
    let _lock = env_lock().lock().expect("env lock");
    let _server = EnvGuard::set("LP_SERVER", "http://127.0.0.1:47777");
    let cli = Cli::parse_from(["lpaste", "health"]);
    assert_eq!(resolve_server(cli.server), "http://127.0.0.1:47777");
}

#[test]
fn cli_parses_new_with_limits() {
    let cli = Cli::try_parse_from(["lpaste", "new", "--ttl", "60", "--max-views", "3"])
        .expect("cli should parse new");
    match cli.command {
        Commands::New {
            file,
            ttl,
            max_views,
        } => {
            assert_eq!(file, None);
            assert_eq!(ttl, Some(60));
            assert_eq!(max_views, Some(3));
        }
        _ => panic!("expected new command"),
    }
}

#[test]
fn cli_rejects_zero_limits() {
    assert!(Cli::try_parse_from(["lpaste", "new", "--ttl", "0"]).is_err());
    assert!(Cli::try_parse_from(["lpaste", "new", "--max-views", "0"]).is_err());
}

#[test]
fn cli_parses_get_and_global_json_flag() {
    let cli = Cli::try_parse_from(["lpaste", "get", "abc123", "--json"]).expect("cli parse");
    assert!(cli.json);
    match cli.command {
        Commands::Get { id } => assert_eq!(id, "abc123"),
        _ => panic!("expected get command"),
    }
}
