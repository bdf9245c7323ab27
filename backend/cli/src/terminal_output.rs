//! Terminal output: status coloring and notes.

use fnrelay_core::{FunctionResponse, ResponseBody};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

fn status_color(status: u16) -> &'static str {
    match status {
        200..=299 => GREEN,
        400..=499 => YELLOW,
        _ => RED,
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

/// Status line on stderr, body on stdout so it can be piped.
pub fn print_response(response: &FunctionResponse) {
    if supports_color() {
        let color = status_color(response.status);
        eprintln!("{color}{BOLD}{}{RESET} {}", response.status, response.content_type());
    } else {
        eprintln!("{} {}", response.status, response.content_type());
    }

    match &response.body {
        ResponseBody::Json(value) => match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{value}"),
        },
        ResponseBody::Text(text) => println!("{text}"),
    }
}
