//! linekv CLI Client
//!
//! Interactive console: reads commands from stdin, sends each one to the
//! server and prints the response line.

use clap::Parser;
use linekv::client::Client;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

/// linekv console
#[derive(Parser, Debug)]
#[command(name = "linekv-cli")]
#[command(about = "Interactive console for the linekv key-value store")]
struct Args {
    /// Server address
    #[arg(long, default_value = "localhost:3223")]
    hostname: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut client = Client::connect(args.hostname.as_str()).await?;
    info!(server = %args.hostname, "Connected");

    let mut stdin = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b">> ").await?;
        stdout.flush().await?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match client.send_line(&line).await {
            Ok(response) => {
                stdout.write_all(format!("->: {}\n", response).as_bytes()).await?;
            }
            Err(e) => {
                error!(error = %e, "Request failed");
                break;
            }
        }
    }

    Ok(())
}
