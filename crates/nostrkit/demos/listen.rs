//! Print text notes from a relay for a while, then unsubscribe.
//!
//! ```text
//! cargo run -p nostrkit --example listen -- wss://relay.example.com 30
//! ```

use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nostrkit::relay::MessageHandler;
use nostrkit::{Client, Event, Filter, Keypair, Kind, WebSocketConnector};

struct Printer {
    seen: usize,
}

impl MessageHandler for Printer {
    fn on_event(&mut self, event: Event) {
        self.seen += 1;
        let author = event
            .pubkey
            .map(|pk| pk.to_bech32())
            .unwrap_or_default();
        println!("[{}] {author}\n{}\n", self.seen, event.content_str());
    }

    fn on_message(&mut self, frame: Value) {
        if frame[0] == "EOSE" {
            info!(stored = self.seen, "end of stored events");
        } else {
            info!(%frame, "relay message");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: listen <relay url> [seconds]")?;
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().context("seconds must be a number")?,
        None => 30,
    };

    let connector = WebSocketConnector::new(&url)?;
    let mut client = Client::new(Keypair::generate(), connector);
    info!(npub = %client.npub(), %url, "listening");

    let filter = Filter::new().kind(Kind::TEXT_NOTE).limit(20);
    let id = client.subscribe(&filter, Printer { seen: 0 })?;
    info!(subscription = %id, "subscribed");

    tokio::time::sleep(Duration::from_secs(seconds)).await;
    client.unsubscribe().await?;
    Ok(())
}
