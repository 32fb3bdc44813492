//! User-facing output.
//!
//! Everything the user is meant to read goes to stdout through [`Output`];
//! logs and the progress bar go to stderr.

use console::style;

/// Kind of a status line, shown as a short marker before the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Error,
    Step,
}

impl Status {
    /// Marker printed before the message.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Success => "[+]",
            Self::Warning | Self::Error => "[!]",
            Self::Step => "[*]",
        }
    }
}

/// Sink for user-facing messages.
pub trait Output {
    /// Print a plain line.
    fn println(&self, msg: &str);

    /// Print a line prefixed with a status marker.
    fn status(&self, status: Status, msg: &str);

    /// Print an empty line.
    fn newline(&self) {
        self.println("");
    }

    /// Print an indented line.
    fn indented(&self, msg: &str) {
        self.println(&format!("    {}", msg));
    }

    /// Print a separator line.
    fn separator(&self) {
        self.println(&"-".repeat(50));
    }
}

/// Writes to stdout, colouring markers when stdout is a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn println(&self, msg: &str) {
        println!("{}", msg);
    }

    fn status(&self, status: Status, msg: &str) {
        let marker = match status {
            Status::Success => style(status.marker()).green().bold(),
            Status::Warning => style(status.marker()).yellow().bold(),
            Status::Error => style(status.marker()).red().bold(),
            Status::Step => style(status.marker()).cyan(),
        };
        println!("{} {}", marker, msg);
    }
}

/// Output captured in memory, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingOutput {
    lines: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingOutput {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

#[cfg(test)]
impl Output for RecordingOutput {
    fn println(&self, msg: &str) {
        self.lines.borrow_mut().push(msg.to_string());
    }

    fn status(&self, status: Status, msg: &str) {
        self.println(&format!("{} {}", status.marker(), msg));
    }
}
