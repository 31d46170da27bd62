//! HTML served to the browser.

use therapist_core::persona::{GREETING, HEADING, INPUT_PLACEHOLDER, PAGE_TITLE, THINKING};

const CHAT_TEMPLATE: &str = include_str!("../static/index.html");

/// The chat widget with the persona copy filled in.
pub fn chat_page() -> String {
    CHAT_TEMPLATE
        .replace("{{title}}", &escape_html(PAGE_TITLE))
        .replace("{{heading}}", &escape_html(HEADING))
        .replace("{{greeting}}", &escape_html(GREETING))
        .replace("{{placeholder}}", &escape_html(INPUT_PLACEHOLDER))
        .replace("{{thinking}}", &escape_html(THINKING))
}

/// Shown instead of the chat when startup configuration is incomplete.
pub fn error_page(message: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 720px; margin: 3rem auto; padding: 0 1rem; }}
  .error {{ background: #fdecea; color: #8b0000; border: 1px solid #f5c2c0; border-radius: 8px; padding: 1rem; }}
</style>
</head>
<body>
<h1 style="color:#8B0000;">🧠 {heading}</h1>
<div class="error" role="alert">❌ {message}</div>
</body>
</html>
"#,
        title = escape_html(PAGE_TITLE),
        heading = escape_html(HEADING),
        message = escape_html(message),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
