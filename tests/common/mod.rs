//! In-memory dialer shared by the pool integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rpcpool::config::PoolConfig;
use rpcpool::{DialError, Dialer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Accept,
    Refuse,
    Fail,
    /// Never completes within any reasonable deadline
    Hang,
    /// Completes after the given delay
    Slow(Duration),
}

/// Fake transport. Tracks how many are alive so tests can assert that
/// closing really released the session.
#[derive(Debug)]
pub struct MockConn {
    pub id: usize,
    live: Arc<AtomicUsize>,
}

impl Drop for MockConn {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct MockDialer {
    pub dials: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    mode: Arc<Mutex<Mode>>,
}

impl MockDialer {
    pub fn new() -> Self {
        Self {
            dials: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            mode: Arc::new(Mutex::new(Mode::Accept)),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    type Conn = MockConn;

    async fn dial(&self, endpoint: &str) -> Result<MockConn, DialError> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Accept => {}
            Mode::Refuse => return Err(DialError::Refused(format!("{} refused", endpoint))),
            Mode::Fail => return Err(DialError::Other("handshake failed".to_string())),
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Mode::Slow(delay) => tokio::time::sleep(delay).await,
        }

        let id = self.dials.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockConn {
            id,
            live: Arc::clone(&self.live),
        })
    }
}

pub fn config(init: usize, idle: usize, peak: usize) -> PoolConfig {
    PoolConfig::new("mock:2020", init, idle, peak)
}
