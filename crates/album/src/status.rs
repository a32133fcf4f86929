//! Minimal status page served after a run.

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Accept Go-style `:8080` as "all interfaces, port 8080".
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Bind `addr` and answer every request with the photo count. Runs forever.
pub async fn serve(addr: &str, photos: usize) -> anyhow::Result<()> {
    let listener = TcpListener::bind(normalize_addr(addr)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    serve_on(listener, photos).await
}

/// Serve the status page on an already-bound listener.
pub async fn serve_on(listener: TcpListener, photos: usize) -> anyhow::Result<()> {
    let body: Arc<str> = page(photos).into();
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                continue;
            }
        };
        let body = body.clone();
        tokio::spawn(async move {
            // The request itself is irrelevant; read what's there and answer.
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;

            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/html; charset=utf-8\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                body.len(),
                body
            );
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                tracing::debug!("Could not answer {}: {}", peer, e);
            }
            let _ = stream.shutdown().await;
        });
    }
}

fn page(photos: usize) -> String {
    format!(
        "<!doctype html><html><body>Hi, you have {} photos</body></html>",
        photos
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[test]
    fn test_normalize_addr() {
        assert_eq!(normalize_addr(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_addr("127.0.0.1:9000"), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_serves_photo_count() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_on(listener, 7));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /anything HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Hi, you have 7 photos"));
    }
}
