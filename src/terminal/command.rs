//! Terminal command grammar
//!
//! `ls`, `cd [path]`, `pwd`, `help` and `clear` are virtual and resolved
//! against the local tree. Any other first token makes the whole line a
//! remote command for the backend shell.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ChangeDir(String),
    PrintDir,
    Help,
    Clear,
    /// Forwarded verbatim
    Remote(String),
}

impl Command {
    /// Parse one input line; `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let command = match head.to_ascii_lowercase().as_str() {
            "ls" => Command::List,
            "cd" => Command::ChangeDir(rest.to_string()),
            "pwd" => Command::PrintDir,
            "help" => Command::Help,
            "clear" => Command::Clear,
            _ => Command::Remote(line.to_string()),
        };
        Some(command)
    }

    pub fn is_virtual(&self) -> bool {
        !matches!(self, Command::Remote(_))
    }
}
