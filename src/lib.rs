// rpcpool - Bounded client-side pool of reusable RPC connections

pub mod config;
pub mod dial;
pub mod loadgen;
pub mod metrics;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use dial::{DialError, Dialer, TcpDialer};
pub use pool::{Connection, Eviction, Pool, PutOutcome, TcpPool};
pub use utils::error::{ErrorCode, PoolError, Result};
