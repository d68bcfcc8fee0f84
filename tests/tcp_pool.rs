/// TCP pool tests against a live echo endpoint
///
/// Exercises the real dialer, pooled stream reuse and the load driver.
use rpcpool::config::{BenchConfig, PoolConfig};
use rpcpool::loadgen;
use rpcpool::{ErrorCode, PutOutcome, TcpPool};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(loadgen::serve_echo(listener));
    addr
}

fn pool_config(addr: SocketAddr, init: usize, idle: usize, peak: usize) -> PoolConfig {
    PoolConfig {
        dial_timeout_ms: 2000,
        ..PoolConfig::new(addr.to_string(), init, idle, peak)
    }
}

#[tokio::test]
async fn pooled_stream_survives_reuse() {
    let addr = spawn_echo_server().await;
    let pool = TcpPool::from_config(pool_config(addr, 1, 2, 4));

    let mut conn = pool.get().await.unwrap();
    let local = conn.client().unwrap().local_addr().unwrap();
    let reply = loadgen::call(conn.client_mut().unwrap(), "first").await.unwrap();
    assert_eq!(reply, "first");
    assert_eq!(pool.put(conn).unwrap(), PutOutcome::Pooled);

    let mut conn = pool.get().await.unwrap();
    assert_eq!(conn.client().unwrap().local_addr().unwrap(), local);
    let reply = loadgen::call(conn.client_mut().unwrap(), "second").await.unwrap();
    assert_eq!(reply, "second");
    pool.put(conn).unwrap();

    pool.close().await;
}

#[tokio::test]
async fn refused_endpoint_maps_to_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let pool = TcpPool::from_config(pool_config(addr, 1, 2, 4));
    let err = pool.get().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConnUnavailable);
    assert_eq!(pool.used(), 0);
}

#[tokio::test]
async fn load_driver_completes_all_requests() {
    let addr = spawn_echo_server().await;
    let pool = Arc::new(TcpPool::from_config(pool_config(addr, 1, 4, 8)));

    let bench = BenchConfig {
        requests: 200,
        concurrency: 4,
        tick: 50,
        timeout_ms: 2000,
    };
    let report = loadgen::run(Arc::clone(&pool), &bench).await;

    assert_eq!(report.finished, 200);
    assert_eq!(report.pool_failed, 0);
    assert_eq!(report.call_failed, 0);
    assert_eq!(report.used, 0);
    assert!(report.idle >= 1 && report.idle <= 8);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["finished"], 200);

    pool.close().await;
    assert_eq!(pool.idle(), 0);
}

#[tokio::test]
async fn failed_call_closes_connection_before_return() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and immediately hang up.
    tokio::spawn(async move {
        loop {
            if let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        }
    });

    let pool = TcpPool::from_config(pool_config(addr, 1, 2, 4));
    let mut conn = pool.get().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = loadgen::call(conn.client_mut().unwrap(), "ping").await;
    assert!(result.is_err());

    conn.close();
    assert_eq!(pool.put(conn).unwrap(), PutOutcome::AlreadyClosed);
    assert_eq!(pool.idle(), 0);
}
