//! Subscribes to the broker and prints every received payload.
//!
//! ```sh
//! cargo run --example simple_consumer -- localhost:9080
//! ```

use relaymq_client::{ClientConfig, ConsumerClient};

#[tokio::main]
async fn main() -> relaymq_client::Result<()> {
    tracing_subscriber::fmt().init();

    let broker = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "localhost:9080".to_string());

    let mut consumer = ConsumerClient::connect(ClientConfig::new(&broker)).await?;
    println!("connected to {}; waiting for messages", broker);

    let mut received = 0u64;
    while let Some(payload) = consumer.next().await? {
        received += 1;
        println!("[{}] {}", received, String::from_utf8_lossy(&payload));
    }

    println!("broker closed the connection after {} messages", received);
    Ok(())
}
