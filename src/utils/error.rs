use serde::Serialize;
use thiserror::Error;

/// Numeric classification of every pool outcome, stable across releases so
/// callers can log or export it as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    PoolEmpty = 1,
    PoolFull = 2,
    PoolIdle = 3,
    PoolClosed = 4,
    TransportError = 5,
    ConnClosed = 6,
    ConnUnavailable = 7,
    ConnDeadlineExceeded = 8,
    /// Local failure outside the pool: config parsing or local I/O.
    LocalError = 9,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error(
        "pool for {endpoint} is empty (used:{used}, idle:{idle}, init:{init_size}, idle_size:{idle_size}, peak:{peak_size})"
    )]
    PoolEmpty {
        endpoint: String,
        used: usize,
        idle: usize,
        init_size: usize,
        idle_size: usize,
        peak_size: usize,
    },

    #[error("pool for {endpoint} is full (used:{used}, peak:{peak_size})")]
    PoolFull {
        endpoint: String,
        used: usize,
        peak_size: usize,
    },

    #[error("pool for {0} is closed")]
    PoolClosed(String),

    #[error("connect {endpoint} refused (used:{used}): {reason}")]
    ConnUnavailable {
        endpoint: String,
        used: usize,
        reason: String,
    },

    #[error("connect {endpoint} timed out (used:{used})")]
    ConnDeadlineExceeded { endpoint: String, used: usize },

    #[error("connect {endpoint} failed (used:{used}): {reason}")]
    Transport {
        endpoint: String,
        used: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PoolError {
    /// Pool and dial outcomes map onto codes 1-8. `Io` and `Config` never
    /// come from the endpoint, so they get `LocalError`.
    pub fn code(&self) -> ErrorCode {
        match self {
            PoolError::PoolEmpty { .. } => ErrorCode::PoolEmpty,
            PoolError::PoolFull { .. } => ErrorCode::PoolFull,
            PoolError::PoolClosed(_) => ErrorCode::PoolClosed,
            PoolError::ConnUnavailable { .. } => ErrorCode::ConnUnavailable,
            PoolError::ConnDeadlineExceeded { .. } => ErrorCode::ConnDeadlineExceeded,
            PoolError::Transport { .. } => ErrorCode::TransportError,
            PoolError::Io(_) | PoolError::Config(_) => ErrorCode::LocalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_keep_their_numeric_values() {
        assert_eq!(ErrorCode::Success.as_u32(), 0);
        assert_eq!(ErrorCode::PoolEmpty.as_u32(), 1);
        assert_eq!(ErrorCode::ConnClosed.as_u32(), 6);
        assert_eq!(ErrorCode::ConnDeadlineExceeded.as_u32(), 8);
        assert_eq!(ErrorCode::LocalError.as_u32(), 9);
    }

    #[test]
    fn local_failures_are_not_transport_errors() {
        let err = PoolError::Config("bad toml".to_string());
        assert_eq!(err.code(), ErrorCode::LocalError);

        let err: PoolError = std::io::Error::other("disk").into();
        assert_eq!(err.code(), ErrorCode::LocalError);

        let err = PoolError::Transport {
            endpoint: "127.0.0.1:2020".to_string(),
            used: 1,
            reason: "reset".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::TransportError);
    }

    #[test]
    fn pool_empty_message_carries_diagnostics() {
        let err = PoolError::PoolEmpty {
            endpoint: "127.0.0.1:2020".to_string(),
            used: 3,
            idle: 0,
            init_size: 1,
            idle_size: 2,
            peak_size: 3,
        };
        assert_eq!(err.code(), ErrorCode::PoolEmpty);
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:2020"));
        assert!(msg.contains("peak:3"));
    }
}
