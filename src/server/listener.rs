use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::{Config, ParserConfig};
use crate::http::connection::Connection;
use crate::http::group::ParserGroup;

/// Builds a group whose callbacks log each request milestone.
pub fn inspector_group(cfg: &ParserConfig) -> anyhow::Result<ParserGroup> {
    ParserGroup::builder()
        .config(cfg)
        .on_headers(|p| {
            info!(
                peer = ?p.tag::<SocketAddr>(),
                method = %p.method(),
                uri = %p.uri(),
                protocol = %p.protocol(),
                headers = p.headers().count(),
                "Headers received"
            );
        })
        .on_request_end(|p, body| {
            info!(
                peer = ?p.tag::<SocketAddr>(),
                method = %p.method(),
                uri = %p.uri(),
                body_len = body.len(),
                elapsed = ?p.elapsed(),
                "Request received"
            );
        })
        .on_parsing_error(|p, err| {
            tracing::warn!(peer = ?p.tag::<SocketAddr>(), error = %err, "Bad request");
        })
        .build()
        .map_err(anyhow::Error::msg)
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let group = inspector_group(&cfg.parser)?;
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let group = group.clone();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, group).with_peer(peer);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
