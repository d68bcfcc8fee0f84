//! Concurrent load driver for a TCP pool
//!
//! Workers share a countdown of requests. Each request checks a connection
//! out, performs one echo call, and returns the connection. A failed call
//! closes the connection before returning it so it is never reused.

mod echo;

pub use echo::{call, serve_echo, MAX_LINE};

use crate::config::BenchConfig;
use crate::pool::TcpPool;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Totals of one `run`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub requests: u64,
    pub finished: u64,
    pub pool_failed: u64,
    pub call_failed: u64,
    pub elapsed_ms: u128,
    pub qps: u64,
    pub used: usize,
    pub idle: usize,
}

#[derive(Default)]
struct Counters {
    pending: AtomicI64,
    finished: AtomicU64,
    pool_failed: AtomicU64,
    call_failed: AtomicU64,
}

pub async fn run(pool: Arc<TcpPool>, config: &BenchConfig) -> LoadReport {
    let counters = Arc::new(Counters {
        pending: AtomicI64::new(config.requests as i64),
        ..Default::default()
    });

    info!(
        "Driving {} requests over {} workers against {}",
        config.requests,
        config.concurrency,
        pool.endpoint()
    );

    let start = Instant::now();
    let workers: Vec<_> = (0..config.concurrency.max(1))
        .map(|index| {
            let pool = Arc::clone(&pool);
            let counters = Arc::clone(&counters);
            let request_timeout = config.timeout();
            let tick = config.tick;
            tokio::spawn(async move {
                worker(index, pool, counters, request_timeout, tick).await;
            })
        })
        .collect();

    for result in futures::future::join_all(workers).await {
        if let Err(e) = result {
            warn!("Load worker failed: {}", e);
        }
    }
    let elapsed = start.elapsed();

    let finished = counters.finished.load(Ordering::Relaxed);
    let secs = elapsed.as_secs();
    LoadReport {
        requests: config.requests,
        finished,
        pool_failed: counters.pool_failed.load(Ordering::Relaxed),
        call_failed: counters.call_failed.load(Ordering::Relaxed),
        elapsed_ms: elapsed.as_millis(),
        qps: if secs > 0 { finished / secs } else { 0 },
        used: pool.used(),
        idle: pool.idle(),
    }
}

async fn worker(
    index: usize,
    pool: Arc<TcpPool>,
    counters: Arc<Counters>,
    request_timeout: Duration,
    tick: u64,
) {
    while counters.pending.fetch_sub(1, Ordering::AcqRel) > 0 {
        let finished = counters.finished.fetch_add(1, Ordering::AcqRel) + 1;
        request(index, &pool, &counters, request_timeout).await;

        if tick > 0 && finished % tick == 0 {
            info!(
                used = pool.used(),
                idle = pool.idle(),
                finished,
                pool_failed = counters.pool_failed.load(Ordering::Relaxed),
                call_failed = counters.call_failed.load(Ordering::Relaxed),
                "progress"
            );
        }
    }
}

async fn request(index: usize, pool: &TcpPool, counters: &Counters, request_timeout: Duration) {
    let mut conn = match pool.get_timeout(request_timeout).await {
        Ok(conn) => conn,
        Err(e) => {
            counters.pool_failed.fetch_add(1, Ordering::Relaxed);
            debug!("Get a connection from pool failed: ({}) {}", e.code().as_u32(), e);
            return;
        }
    };

    let outcome = match conn.client_mut() {
        Some(stream) => timeout(request_timeout, call(stream, "Hello"))
            .await
            .unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "call deadline exceeded",
                ))
            }),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "connection already closed",
        )),
    };

    if let Err(e) = outcome {
        conn.close();
        counters.call_failed.fetch_add(1, Ordering::Relaxed);
        if index == 0 {
            debug!("Call on pooled connection failed: {}", e);
        }
    }

    if let Err(e) = pool.put(conn) {
        debug!("Return to pool failed: ({}) {}", e.code().as_u32(), e);
    }
}
