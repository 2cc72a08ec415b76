use std::sync::Arc;

use crate::client::OsmClient;
use crate::config::OsmConfig;
use crate::error::Result;

/// Process-wide state shared by every tool invocation.
///
/// Created once at startup and torn down at shutdown; handlers borrow the
/// client through the `Arc` and never mutate it.
#[derive(Clone)]
pub struct AppContext {
    client: Arc<OsmClient>,
}

impl AppContext {
    /// Build and connect the upstream client.
    pub async fn start(config: OsmConfig) -> Result<Self> {
        let client = OsmClient::new(config);
        client.connect().await?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> &OsmClient {
        &self.client
    }

    pub fn shared_client(&self) -> Arc<OsmClient> {
        Arc::clone(&self.client)
    }

    /// Release the upstream session. Later calls fail with `NotConnected`.
    pub async fn shutdown(&self) {
        self.client.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn start_connects_and_shutdown_disconnects() {
        let ctx = AppContext::start(OsmConfig::default()).await.unwrap();
        assert!(ctx.client().is_connected().await);

        let clone = ctx.clone();
        ctx.shutdown().await;
        assert!(!clone.client().is_connected().await);
        assert!(matches!(
            clone.client().geocode("Paris").await,
            Err(Error::NotConnected)
        ));
    }
}
