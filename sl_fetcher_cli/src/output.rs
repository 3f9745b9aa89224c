use std::io::Write;

use anyhow::Result;
use sl_fetcher::{FetcherError, ResponseBody};

/// Renders a decoded body the way it is written to stdout: JSON
/// pretty-printed, text verbatim, binary bodies as raw bytes.
pub fn render_body(body: &ResponseBody) -> Result<Vec<u8>> {
    let rendered = match body {
        ResponseBody::Json(value) => {
            let mut out = serde_json::to_vec_pretty(value)?;
            out.push(b'\n');
            out
        }
        ResponseBody::Text(text) => text.as_bytes().to_vec(),
        ResponseBody::ArrayBuffer(bytes) => bytes.to_vec(),
        ResponseBody::Blob(blob) => blob.bytes.to_vec(),
    };
    Ok(rendered)
}

/// Writes the body to stdout. No body prints nothing.
pub fn print_body(body: Option<&ResponseBody>) -> Result<()> {
    let Some(body) = body else {
        return Ok(());
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&render_body(body)?)?;
    stdout.flush()?;
    Ok(())
}

/// Status line plus the JSON error body, if the server sent one.
pub fn render_fetcher_error(err: &FetcherError) -> String {
    let mut out = format!("HTTP {} {}", err.status().as_u16(), err.message());
    if let Some(data) = err.data() {
        match serde_json::to_string_pretty(data) {
            Ok(json) => {
                out.push('\n');
                out.push_str(&json);
            }
            Err(e) => eprintln!("Failed to serialize error body: {}", e),
        }
    }
    out
}

pub fn print_fetcher_error(err: &FetcherError) {
    eprintln!("{}", render_fetcher_error(err));
}
