//! Lifecycle state of a fetch task.

/// State of a fetch task.
///
/// `Pending -> Running -> {Completed, Failed, Cancelled}`. Terminal states
/// never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FetchState {
    /// Created, not started.
    #[default]
    Pending = 0,
    /// Transfer in flight.
    Running = 1,
    /// Payload fetched and decoded.
    Completed = 2,
    /// Request, transfer or decode failed.
    Failed = 3,
    /// Cancelled before a result was delivered.
    Cancelled = 4,
}

impl FetchState {
    /// Returns true for Completed, Failed and Cancelled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true while the task may still produce a result.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Raw representation for atomic storage.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes the raw representation. Unknown values map to `Failed`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            4 => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for FetchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
