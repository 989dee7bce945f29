//! Server-rendered HTML pages.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Html,
};
use pastelite_core::view::{expiry_timestamp, format_timestamp, remaining_views};

use crate::request::request_now;
use crate::AppState;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#222}\
pre{white-space:pre-wrap;word-break:break-word;background:#f5f5f5;padding:1rem;border-radius:6px}\
textarea{width:100%;min-height:14rem;font-family:monospace}\
label{display:block;margin-top:1rem;font-weight:600}\
.info{color:#555}.error{color:#a00}";

const INDEX_BODY: &str = r#"<h1>pastelite</h1>
<p>Create a paste and share the link. Time and view limits are optional.</p>
<form id="paste-form">
  <label for="content">Content</label>
  <textarea id="content" required placeholder="Enter your text here..."></textarea>
  <label for="ttl">Time to live (seconds)</label>
  <input id="ttl" type="number" min="1" placeholder="e.g. 3600">
  <label for="views">Max views</label>
  <input id="views" type="number" min="1" placeholder="e.g. 5">
  <p><button type="submit">Create paste</button></p>
</form>
<p id="result"></p>
<script>
document.getElementById('paste-form').addEventListener('submit', async (event) => {
  event.preventDefault();
  const out = document.getElementById('result');
  const body = { content: document.getElementById('content').value };
  const ttl = document.getElementById('ttl').value;
  const views = document.getElementById('views').value;
  if (ttl) body.ttl_seconds = parseInt(ttl, 10);
  if (views) body.max_views = parseInt(views, 10);
  out.className = '';
  out.textContent = 'Creating...';
  try {
    const response = await fetch('/api/pastes', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(body),
    });
    const data = await response.json();
    if (!response.ok) {
      out.className = 'error';
      out.textContent = data.details || data.error || 'Failed to create paste';
      return;
    }
    out.textContent = '';
    const link = document.createElement('a');
    link.href = data.url;
    link.textContent = data.url;
    out.append('Share this link: ', link);
    event.target.reset();
  } catch (err) {
    out.className = 'error';
    out.textContent = 'Network error, please try again.';
  }
});
</script>"#;

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

/// Paste creation form.
pub async fn index() -> Html<String> {
    Html(layout("pastelite", INDEX_BODY))
}

/// Render a paste, consuming one view exactly like the JSON API.
pub async fn view_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Html<String>) {
    let now = request_now(&state, &headers);
    match state.store.fetch_and_consume(&id, now).await {
        Ok(Some(paste)) => {
            let mut info = String::new();
            if let Some(remaining) = remaining_views(&paste) {
                info.push_str(&format!("<p>Remaining views: {}</p>\n", remaining));
            }
            if let Some(expiry) = expiry_timestamp(&paste) {
                let stamp = format_timestamp(expiry);
                info.push_str(&format!(
                    "<p>Expires at: <time datetime=\"{0}\">{0}</time></p>\n",
                    stamp
                ));
            }
            let body = format!(
                "<h1>Paste</h1>\n<pre>{}</pre>\n<div class=\"info\">\n{}</div>\n\
                 <p><a href=\"/\">Create a new paste</a></p>",
                escape_html(&paste.content),
                info
            );
            (StatusCode::OK, Html(layout("Paste", &body)))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Html(layout(
                "Paste not found",
                "<h1>404</h1>\n<p>This paste does not exist, has expired, or has no views left.</p>\n\
                 <p><a href=\"/\">Create a new paste</a></p>",
            )),
        ),
        Err(err) => {
            tracing::error!(error = %err, id = %id, "Failed to render paste");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(layout(
                    "Error",
                    "<h1>Something went wrong</h1>\n<p>Please try again later.</p>",
                )),
            )
        }
    }
}
