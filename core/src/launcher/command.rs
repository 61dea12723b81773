//! Rendered command lines

use std::fmt;

/// Program plus arguments, exactly as handed to the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
}

impl CommandLine {
    /// Create a command line
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Space-joined, as written to the first line of each log
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_with_spaces() {
        let cmd = CommandLine::new("ib_write_bw", vec!["-d".into(), "mlx5_0".into()]);
        assert_eq!(cmd.to_string(), "ib_write_bw -d mlx5_0");
    }

    #[test]
    fn test_display_without_args() {
        assert_eq!(CommandLine::new("true", vec![]).to_string(), "true");
    }
}
