use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::aggregator;
use crate::domain::{
    AttributeUpdate, AttributeUpdateResult, DatasetMetaMutable, FolderRecord, Location,
    ResolvedDataset, ValidationResult,
};
use crate::error::DiveError;
use crate::gateway::{CloneRequest, DatasetGateway, NewDatasetFolder};
use crate::ingest::{self, AnnotationFile};
use crate::media;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub dataset: Arc<ResolvedDataset>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub parent_id: String,
    pub path: String,
    pub file: Option<String>,
    pub imported: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigateResult {
    pub location: Option<Location>,
}

/// Entry point for UI-level actions: wires the gateway to the shared store.
pub struct App<G: DatasetGateway> {
    gateway: G,
    store: Arc<Store>,
}

impl<G: DatasetGateway> App<G> {
    pub fn new(gateway: G, store: Arc<Store>) -> Self {
        Self { gateway, store }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn load(&self, folder_id: &str) -> Result<LoadResult, DiveError> {
        let dataset = aggregator::load_dataset(&self.gateway, &self.store, folder_id).await?;
        Ok(LoadResult {
            dataset,
            location: self.store.location(),
        })
    }

    pub async fn import(
        &self,
        parent_id: &str,
        path: &str,
        file: Option<&AnnotationFile>,
    ) -> ImportResult {
        let imported = ingest::import_annotation_file(&self.gateway, parent_id, path, file).await;
        ImportResult {
            parent_id: parent_id.to_string(),
            path: path.to_string(),
            file: file.map(|file| file.name.clone()),
            imported,
        }
    }

    pub async fn clone_dataset(&self, request: &CloneRequest) -> Result<FolderRecord, DiveError> {
        let folder = self.gateway.clone_dataset(request).await?;
        info!(source = %request.folder_id, clone = %folder.id, "dataset cloned");
        Ok(folder)
    }

    pub async fn create_dataset_folder(
        &self,
        request: &NewDatasetFolder,
    ) -> Result<FolderRecord, DiveError> {
        self.gateway.create_dataset_folder(request).await
    }

    pub async fn save_metadata(
        &self,
        folder_id: &str,
        metadata: &DatasetMetaMutable,
    ) -> Result<Value, DiveError> {
        self.gateway.save_metadata(folder_id, metadata).await
    }

    pub async fn save_attributes(
        &self,
        folder_id: &str,
        update: &AttributeUpdate,
    ) -> Result<AttributeUpdateResult, DiveError> {
        self.gateway.save_attributes(folder_id, update).await
    }

    pub async fn validate(
        &self,
        names: &[String],
        offline: bool,
    ) -> Result<ValidationResult, DiveError> {
        if offline {
            return Ok(media::classify_upload_group(names));
        }
        self.gateway.validate_files(names).await
    }

    /// Moves the browsing location to the container named by `route`
    /// (`:modelType/:id`). An empty route leaves the location untouched.
    pub fn navigate(&self, route: &str) -> Result<NavigateResult, DiveError> {
        if let Some(location) = Location::from_route(route)? {
            self.store.set_location(location)?;
        }
        Ok(NavigateResult {
            location: self.store.location(),
        })
    }
}
