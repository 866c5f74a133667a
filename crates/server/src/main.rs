mod config;
mod listener;
mod players;
mod server;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;

use autumn::net::DEFAULT_PORT;

use config::ServerConfig;
use listener::Listener;
use server::{Processor, SocketResponder};

#[derive(Parser, Debug)]
#[command(about = "Authoritative race server")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// UDP port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Processing tick interval in milliseconds
    #[arg(long, default_value_t = 25)]
    tick_interval_ms: u64,

    /// Datagrams handled per tick before the rest are deferred
    #[arg(long, default_value_t = 10)]
    max_packages_per_tick: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let listener =
        Listener::bind((args.bind.as_str(), args.port)).context("failed to bind server socket")?;
    log::info!("server started on {}", listener.local_addr()?);

    let config = ServerConfig {
        tick_interval_ms: args.tick_interval_ms,
        max_packages_per_tick: args.max_packages_per_tick,
    };
    let responder = SocketResponder::new(listener.socket());
    let running = listener.running();
    let mut processor = Processor::new(responder, config, running);

    let (queue_tx, queue_rx) = mpsc::channel();
    let listener = Arc::new(listener);
    let listener_handle = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.run(queue_tx))
    };
    let processor_handle = thread::spawn(move || processor.run(&queue_rx));

    listener_handle
        .join()
        .map_err(|_| anyhow::anyhow!("listener thread panicked"))?;
    processor_handle
        .join()
        .map_err(|_| anyhow::anyhow!("processor thread panicked"))?;
    Ok(())
}
