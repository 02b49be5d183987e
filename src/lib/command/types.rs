use std::{fmt, str::FromStr};

/// How an external tool is launched, e.g. `docker`, `podman` or `sudo docker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand {
            program: program.to_string(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args(program: &str, leading_args: &[&str]) -> Self {
        ToolCommand {
            program: program.to_string(),
            leading_args: leading_args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Full argument vector for one invocation, program first.
    pub fn argv<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = Vec::with_capacity(1 + self.leading_args.len());
        argv.push(self.program.clone());
        argv.extend(self.leading_args.iter().cloned());
        argv.extend(args.into_iter().map(Into::into));
        argv
    }
}

impl FromStr for ToolCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| "tool command must not be empty".to_string())?;
        Ok(ToolCommand {
            program: program.to_string(),
            leading_args: words.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.leading_args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of one external command: exit-status success plus the merged
/// stdout/stderr text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

impl CommandOutput {
    pub fn failed(output: String) -> Self {
        CommandOutput {
            success: false,
            output,
        }
    }
}
