use hyper::Method;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod handler;
mod logger;
mod response;
mod router;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    // Build the Tokio runtime, honoring the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;

    // Bind before anything else: a port in use or a privileged port is a
    // fatal startup error, reported and never retried
    let listener = server::listener::bind(addr).map_err(|e| {
        logger::log_bind_failed(&addr, &e);
        e
    })?;

    // Explicit route registration: (method, path) -> handler
    let router = router::Router::new().route(Method::GET, "/", handler::hello);
    let state = Arc::new(config::AppState::new(cfg, router));

    let signals = Arc::new(server::signal::SignalHandler::new());
    let shutdown = Arc::clone(&signals.shutdown);
    server::signal::start_signal_handler(signals);

    logger::log_server_start(&addr, &state.config);

    let active_connections = Arc::new(AtomicUsize::new(0));
    server::run(listener, state, active_connections, shutdown).await?;
    Ok(())
}
