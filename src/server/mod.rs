// Server module entry
// Listener setup, accept loop, connection handling, signal handling

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::AppState;
use crate::logger;

/// Run the accept loop until shutdown is signalled.
///
/// Each accepted connection is served concurrently in its own task;
/// accept errors are logged and the loop continues. When the shutdown
/// notification fires the loop exits cleanly; in-flight connections
/// finish in their background tasks.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LoggingConfig, PerformanceConfig, ServerConfig};
    use crate::handler;
    use crate::router::Router;
    use hyper::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn test_state() -> Arc<AppState> {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: false,
                access_log_format: "common".to_string(),
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
        };
        let router = Router::new().route(Method::GET, "/", handler::hello);
        Arc::new(AppState::new(config, router))
    }

    async fn start_test_server() -> (std::net::SocketAddr, Arc<Notify>) {
        let listener = listener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let state = test_state();
        let connections = Arc::new(AtomicUsize::new(0));
        let shutdown_clone = Arc::clone(&shutdown);
        tokio::spawn(async move {
            run(listener, state, connections, shutdown_clone)
                .await
                .unwrap();
        });

        (addr, shutdown)
    }

    async fn send_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    #[tokio::test]
    async fn test_get_root_returns_hello_world() {
        let (addr, shutdown) = start_test_server().await;

        let response = send_request(
            addr,
            "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("text/plain"));
        assert!(response.ends_with("Hello World"));

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_response_is_byte_stable() {
        let (addr, shutdown) = start_test_server().await;

        let request = "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
        let first = send_request(addr, request).await;
        let second = send_request(addr, request).await;

        // Bodies must be identical; no hidden counters or timestamps
        let first_body = first.split("\r\n\r\n").nth(1).unwrap();
        let second_body = second.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(first_body, "Hello World");
        assert_eq!(first_body, second_body);

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_post_root_returns_405() {
        let (addr, shutdown) = start_test_server().await;

        let response = send_request(
            addr,
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 405 "));
        assert!(response.to_lowercase().contains("allow: get, head"));

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let (addr, shutdown) = start_test_server().await;

        let response = send_request(
            addr,
            "GET /nonexistent HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 404 "));

        shutdown.notify_one();
    }
}
