use std::io::{self, Write};

/// Where `print`, `println` and `load` write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    /// Collected in memory, for embedding and tests
    Buffer(String),
}

impl Default for Output {
    fn default() -> Self {
        Output::Stdout
    }
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(String::new())
    }
    pub fn print(&mut self, text: &str) {
        match self {
            Output::Stdout => {
                let mut stdout = io::stdout();
                // Write errors on stdout are ignored
                let _ = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush());
            }
            Output::Buffer(buffer) => buffer.push_str(text),
        }
    }
    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }
    /// Take everything collected so far
    ///
    /// Always empty for stdout.
    pub fn take(&mut self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buffer) => std::mem::take(buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_collects_until_taken() {
        let mut output = Output::buffer();
        output.print("a");
        output.println("b");
        assert_eq!(output.take(), "ab\n");
        assert_eq!(output.take(), "");
    }

    #[test]
    fn stdout_captures_nothing() {
        let mut output = Output::default();
        assert_eq!(output.take(), "");
    }
}
