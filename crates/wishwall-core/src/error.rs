use std::fmt;

/// Machine-readable error codes for the wall and its presentation shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    IdentityRequired,
    EmptyWish,
    CorruptPersistedData,
    UnreadablePersistedData,
    PersistenceFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::IdentityRequired => "E2001",
            Self::EmptyWish => "E2002",
            Self::CorruptPersistedData => "E3001",
            Self::UnreadablePersistedData => "E3002",
            Self::PersistenceFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Wish store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::IdentityRequired => "Please connect your wallet first!",
            Self::EmptyWish => "Please enter a wish!",
            Self::CorruptPersistedData => "Persisted wishes are corrupt",
            Self::UnreadablePersistedData => "Persisted wishes could not be read",
            Self::PersistenceFailed => "Failed to save wishes",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `wish init` to set up this wall."),
            Self::ConfigParseError => Some("Fix syntax in .wishwall/config.toml and retry."),
            Self::IdentityRequired => {
                Some("Run `wish connect <IDENTITY>` or pass --identity, then retry.")
            }
            Self::EmptyWish => Some("Wish text must contain at least one non-space character."),
            Self::CorruptPersistedData => {
                Some("The unparseable copy was kept next to the slot as `wishes.json.corrupt-<time>`.")
            }
            Self::UnreadablePersistedData => Some(
                "Submissions are refused until the slot can be read. Check permissions and locks, then retry.",
            ),
            Self::PersistenceFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `wish` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
