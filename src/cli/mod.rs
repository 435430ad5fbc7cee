//! CLI for s-talk using clap.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::core::Session;
use crate::pipeline;
use crate::terminal::StdinLines;
use crate::transport::{resolve_peer, UdpTransport};

/// Lowest port a user may pick.
const MIN_PORT: i64 = 1024;

/// s-talk - chat with one peer over UDP. Type `!` on its own line to quit.
#[derive(Parser, Debug)]
#[command(name = "s-talk")]
#[command(version)]
#[command(about = "s-talk - two-party terminal chat over UDP", long_about = None)]
pub struct Commands {
    /// My port number (1024-65535)
    #[arg(value_parser = clap::value_parser!(u16).range(MIN_PORT..))]
    pub local_port: u16,

    /// Remote machine name
    pub remote_host: String,

    /// Remote port number (1024-65535)
    #[arg(value_parser = clap::value_parser!(u16).range(MIN_PORT..))]
    pub remote_port: u16,

    /// Settings file (defaults to ~/.s-talk/settings.json)
    #[arg(long, env = "STALK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Commands {
    /// Set up the socket and run the chat until either side ends it.
    pub async fn run(&self, settings: Settings) -> Result<()> {
        let peer = resolve_peer(&self.remote_host, self.remote_port)
            .await
            .context("Getting remote address failed")?;
        let local = SocketAddr::new(settings.bind_address, self.local_port);

        let transport = UdpTransport::bind(local, peer)
            .await
            .context("Socket setup failed")?;
        tracing::info!(%local, %peer, "Chat ready");

        let session = Arc::new(Session::new(Arc::new(transport), settings.queue_capacity));
        let input = StdinLines::spawn().context("Failed to start terminal reader")?;

        let report = pipeline::run(session, input, tokio::io::stdout()).await?;
        tracing::info!(origin = ?report.origin, "Chat ended");

        println!("Terminating......");
        println!("End of Program!");
        Ok(())
    }
}
