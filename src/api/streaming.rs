use std::path::Path;
use std::time::Instant;

use crate::client::ApiRequest;
use crate::models::image::SnapshotRate;
use crate::{IsapiClient, IsapiResult};

fn picture_endpoint(channel: u32) -> String {
    format!("/ISAPI/Streaming/channels/{channel}/picture")
}

/// Provides JPEG snapshot capture.
#[derive(Debug, Clone)]
pub struct StreamingHandler {
    client: IsapiClient,
}

impl StreamingHandler {
    pub(crate) fn new(client: IsapiClient) -> Self {
        Self { client }
    }

    /// Captures one JPEG picture from `channel`.
    pub async fn snapshot(&self, channel: u32) -> IsapiResult<Vec<u8>> {
        self.client.fetch_bytes(ApiRequest::get(picture_endpoint(channel))).await
    }

    /// Captures one picture and writes it to `path`.
    pub async fn save_snapshot(&self, channel: u32, path: impl AsRef<Path>) -> IsapiResult<()> {
        let path = path.as_ref();
        let picture = self.snapshot(channel).await?;
        tokio::fs::write(path, picture).await?;
        log::info!("snapshot saved to {}", path.display());
        Ok(())
    }

    /// Times `count` sequential captures and reports the implied frame rates.
    ///
    /// Failed captures are logged and left out of the statistics. Returns
    /// `None` if no capture succeeded.
    pub async fn measure_snapshot_rate(
        &self,
        channel: u32,
        count: usize,
    ) -> IsapiResult<Option<SnapshotRate>> {
        let mut durations = Vec::with_capacity(count);
        for attempt in 0..count {
            let started = Instant::now();
            match self.snapshot(channel).await {
                Ok(_) => durations.push(started.elapsed()),
                Err(e) => log::warn!("snapshot {attempt} failed: {e}"),
            }
        }
        Ok(SnapshotRate::from_durations(&durations))
    }
}
