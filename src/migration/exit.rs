//! Process exit status for migrate and undo runs

/// Outcome of a migrate or undo invocation, as a process exit code
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExitStatus {
    /// Everything requested completed
    #[default]
    Ok = 0,
    /// Arguments, configuration, connection, a migration or an undo step failed
    Usage = 2,
}

impl ExitStatus {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Worst-result-wins reduction: any non-OK status beats OK
    #[must_use]
    pub fn combine(self, next: Self) -> Self {
        if next.is_ok() {
            self
        } else {
            next
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status as u8)
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Usage => write!(f, "USAGE"),
        }
    }
}
