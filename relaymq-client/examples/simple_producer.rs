//! Reads lines from stdin and publishes each one to the broker.
//!
//! ```sh
//! cargo run --example simple_producer -- localhost:9080
//! ```

use relaymq_client::{ClientConfig, ProducerClient};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> relaymq_client::Result<()> {
    tracing_subscriber::fmt().init();

    let broker = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "localhost:9080".to_string());

    let mut producer = ProducerClient::connect(ClientConfig::new(&broker)).await?;
    println!("connected to {}; type messages, one per line (Ctrl+D to quit)", broker);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sent = 0u64;
    while let Some(line) = lines.next_line().await? {
        producer.send(line.into_bytes()).await?;
        sent += 1;
    }

    producer.close().await?;
    println!("done, sent {} messages", sent);
    Ok(())
}
