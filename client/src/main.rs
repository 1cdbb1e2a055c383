use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    client::run_client().await
}
