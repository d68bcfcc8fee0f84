use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, trace};

/// Longest request line the echo endpoint accepts.
pub const MAX_LINE: usize = 64 * 1024;

/// Serve newline-delimited echo requests until the listener fails.
///
/// Each line is answered with the same line, one connection per task; a
/// connection stays open for any number of requests, which is what makes
/// pooling it worthwhile.
pub async fn serve_echo(listener: TcpListener) -> std::io::Result<()> {
    info!("Echo endpoint listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        trace!("Accepted connection from {}", peer);
        tokio::spawn(async move {
            if let Err(e) = handle(stream).await {
                debug!("Echo session with {} ended: {}", peer, e);
            }
        });
    }
}

async fn handle(stream: TcpStream) -> Result<(), tokio_util::codec::LinesCodecError> {
    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE));
    while let Some(line) = lines.next().await {
        lines.send(line?).await?;
    }
    Ok(())
}

/// Send one line and wait for its echo.
pub async fn call(stream: &mut TcpStream, text: &str) -> std::io::Result<String> {
    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE));
    lines.send(text).await.map_err(into_io)?;
    match lines.next().await {
        Some(reply) => reply.map_err(into_io),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "endpoint closed the connection",
        )),
    }
}

fn into_io(err: tokio_util::codec::LinesCodecError) -> std::io::Error {
    match err {
        tokio_util::codec::LinesCodecError::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
    }
}
