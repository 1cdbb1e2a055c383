use anyhow::Result;
use quinn::Connection;

#[cfg(feature = "json")]
use serde::{Serialize, de::DeserializeOwned};

#[cfg(all(feature = "bincode", not(feature = "json")))]
use bincode::{Decode, Encode};

// A generated level is a few hundred KB at most
const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// Message Stream Abstraction
// ============================================================================

// One message per unidirectional stream. The `json` feature takes precedence
// over `bincode` when both are enabled.
pub struct MessageStream<'a> {
    connection: &'a Connection,
}

impl<'a> MessageStream<'a> {
    #[must_use]
    pub const fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    #[cfg(feature = "json")]
    pub async fn send<T: Serialize + Send + Sync>(&self, msg: &T) -> Result<()> {
        let data = serde_json::to_vec(msg)?;
        self.write(&data).await
    }

    #[cfg(all(feature = "bincode", not(feature = "json")))]
    pub async fn send<T: Encode + Send + Sync>(&self, msg: &T) -> Result<()> {
        let data = bincode::encode_to_vec(msg, bincode::config::standard())?;
        self.write(&data).await
    }

    #[cfg(feature = "json")]
    pub async fn recv<T: DeserializeOwned + Send>(&self) -> Result<T> {
        let data = self.read().await?;
        Ok(serde_json::from_slice(&data)?)
    }

    #[cfg(all(feature = "bincode", not(feature = "json")))]
    pub async fn recv<T: Decode<()> + Send>(&self) -> Result<T> {
        let data = self.read().await?;
        Ok(bincode::decode_from_slice(&data, bincode::config::standard())?.0)
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        let mut stream = self.connection.open_uni().await?;
        stream.write_all(data).await?;
        stream.finish()?;
        Ok(())
    }

    async fn read(&self) -> Result<Vec<u8>> {
        let mut stream = self.connection.accept_uni().await?;
        Ok(stream.read_to_end(MAX_MESSAGE_BYTES).await?)
    }
}
