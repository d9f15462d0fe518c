use std::fmt;

/// Log threshold selected by the first process argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogVerbosity {
    #[default]
    Info,
    Error,
    Debug,
}

impl LogVerbosity {
    /// Parse `info|error|debug` (any case). Absent or unrecognized values fall back to `Info`.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
            Some("error") => Self::Error,
            Some("debug") => Self::Debug,
            _ => Self::Info,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}
