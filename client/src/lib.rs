mod config;

pub use config::configure_client;

use anyhow::{Context, Result, bail};
use clap::Parser;
use quinn::{Connection, Endpoint};
use std::path::PathBuf;

use common::{
    config::DEFAULT_CERT_PATH,
    io::MessageStream,
    protocol::{CGenerateLevel, CLogoff, ClientMessage, SError, SLevel, ServerMessage},
    tilemap::LevelDocument,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch a generated maze level", long_about = None)]
pub struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub server: String,

    /// Server name checked against the certificate
    #[arg(long, default_value = "localhost")]
    pub server_name: String,

    /// Certificate (PEM) to trust for the server
    #[arg(long, default_value = DEFAULT_CERT_PATH)]
    pub cert: PathBuf,

    /// Level height in tiles
    #[arg(long, default_value_t = 10)]
    pub height: i32,

    /// Level width in tiles
    #[arg(long, default_value_t = 10)]
    pub width: i32,

    /// Corridor width in tiles
    #[arg(long)]
    pub hall_width: Option<i32>,

    /// Seed for a reproducible level
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the level JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Args {
    #[must_use]
    pub const fn request(&self) -> CGenerateLevel {
        CGenerateLevel {
            height: self.height,
            width: self.width,
            hall_width: self.hall_width,
            seed: self.seed,
        }
    }
}

// ============================================================================
// Level Request
// ============================================================================

pub async fn request_level(connection: &Connection, request: CGenerateLevel) -> Result<LevelDocument> {
    let stream = MessageStream::new(connection);
    stream.send(&ClientMessage::GenerateLevel(request)).await?;

    match stream.recv::<ServerMessage>().await.context("No response from server")? {
        ServerMessage::Level(SLevel { level }) => Ok(level),
        ServerMessage::Error(SError { message }) => bail!("Server rejected request: {message}"),
    }
}

// ============================================================================
// Main Client Flow
// ============================================================================

pub async fn run_client() -> Result<()> {
    let args = Args::parse();

    // Create connection to the server
    eprintln!("Connecting to server...");
    let mut endpoint = Endpoint::client("0.0.0.0:0".parse()?)?;
    endpoint.set_default_client_config(configure_client(&args.cert)?);
    let connection = endpoint
        .connect(args.server.parse()?, &args.server_name)?
        .await
        .context("Failed to connect to server")?;
    eprintln!("Connected to server at {}", args.server);

    let level = request_level(&connection, args.request()).await?;
    eprintln!(
        "Received {}x{} level with {} objects",
        level.height,
        level.width,
        level.object_count()
    );

    let json = serde_json::to_string_pretty(&level)?;
    match &args.output {
        Some(path) => std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    // Graceful logoff; the server closes the connection in response
    let _ = MessageStream::new(&connection).send(&ClientMessage::Logoff(CLogoff {})).await;
    connection.close(0u32.into(), b"done");
    endpoint.wait_idle().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_request_from_args() {
        let args = Args::try_parse_from(["client", "--height", "12", "--width", "8", "--hall-width", "2", "--seed", "7"])
            .unwrap();
        assert_eq!(
            args.request(),
            CGenerateLevel {
                height: 12,
                width: 8,
                hall_width: Some(2),
                seed: Some(7),
            }
        );
    }

    #[test]
    fn hall_width_and_seed_are_optional() {
        let args = Args::try_parse_from(["client"]).unwrap();
        let request = args.request();
        assert_eq!((request.height, request.width), (10, 10));
        assert_eq!(request.hall_width, None);
        assert_eq!(request.seed, None);
        assert!(args.output.is_none());
    }
}
