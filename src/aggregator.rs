use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{DatasetRecord, MediaManifest, ResolvedDataset};
use crate::error::DiveError;
use crate::gateway::DatasetGateway;
use crate::store::{DATASET, LOCATION, Payload, SET, SET_LOCATION, Store};

const MEDIA_KEYS: &[&str] = &["imageData", "video", "videoUrl"];

/// Merges a dataset record with its media manifest. `videoUrl` mirrors the
/// video resource when there is one.
///
/// Unmodeled record keys pass through, except those the media fields replace.
pub fn compose(mut record: DatasetRecord, media: MediaManifest) -> ResolvedDataset {
    for key in MEDIA_KEYS {
        record.extra.remove(*key);
    }
    let video_url = media.video.as_ref().map(|video| video.url.clone());
    ResolvedDataset {
        record,
        media,
        video_url,
    }
}

/// Resolves dataset `folder_id` and publishes it.
///
/// The folder, dataset and media reads run concurrently and all three must
/// succeed; on any failure nothing is committed and the error is returned.
/// On success the dataset partition is committed first, then the folder's
/// parent becomes the current location.
pub async fn load_dataset<G: DatasetGateway>(
    gateway: &G,
    store: &Store,
    folder_id: &str,
) -> Result<Arc<ResolvedDataset>, DiveError> {
    debug!(folder_id, "resolving dataset");
    let (folder, record, media) = tokio::try_join!(
        gateway.fetch_folder(folder_id),
        gateway.fetch_dataset(folder_id),
        gateway.fetch_media(folder_id),
    )?;

    let dataset = Arc::new(compose(record, media));
    store.commit_local(DATASET, SET, Payload::Dataset(Arc::clone(&dataset)))?;
    store.commit_local(
        LOCATION,
        SET_LOCATION,
        Payload::Location(folder.parent_location()),
    )?;
    info!(
        folder_id,
        location = %folder.parent_location(),
        "dataset resolved"
    );
    Ok(dataset)
}
