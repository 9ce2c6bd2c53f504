//! Terminal text rendering: listings, help, prompt, errors, links.

use crate::tree::NodeRecord;
use owo_colors::OwoColorize;

/// Full terminal reset
pub const CLEAR_SCREEN: &str = "\x1bc";

pub const HELP_TEXT: &str = "Available commands:
  Virtual File System:
    ls              - List directory contents
    cd <path>       - Change directory or navigate to file
    pwd             - Print working directory
    clear           - Clear terminal screen
    help            - Show this help message

  NPM Commands:
    npm init        - Initialize a new Node.js project
    npm install     - Install dependencies
    npm run         - Run scripts

  Git Commands:
    git init        - Initialize a repository
    git add         - Add files to staging
    git commit      - Commit changes
    git push        - Push to remote repository
    git status      - Check repository status
\r\n";

/// Directories in blue with a trailing `/`, files in green, two spaces apart.
pub fn render_listing(children: &[&NodeRecord]) -> String {
    let entries: Vec<String> = children
        .iter()
        .map(|child| {
            if child.is_directory() {
                format!("{}/", child.name).blue().to_string()
            } else {
                child.name.green().to_string()
            }
        })
        .collect();
    format!("{}\r\n", entries.join("  "))
}

/// `$ > ` at the root, `$ src/lib > ` below it.
pub fn prompt(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        "$ > ".to_string()
    } else {
        format!("$ {} > ", trimmed)
    }
}

/// Error line for a failed virtual command
pub fn error_line(message: &str) -> String {
    format!("Error: {}\r\n", message)
}

/// Error line for an error reported by the backend shell
pub fn backend_error_line(message: &str) -> String {
    format!("{}\n", format!("Error: {}", message).red())
}

/// `http://` and `https://` URLs found in an output chunk, in order.
pub fn find_urls(data: &str) -> Vec<&str> {
    data.split_whitespace()
        .filter_map(|token| {
            let start = match (token.find("http://"), token.find("https://")) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => return None,
            };
            Some(&token[start..])
        })
        .collect()
}

/// A URL echoed on its own line in blue
pub fn link_line(url: &str) -> String {
    format!("\r\n{}\r\n", url.blue())
}
