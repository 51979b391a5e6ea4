#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::{Value, json};

use dive_client::domain::{
    AttributeUpdate, AttributeUpdateResult, DatasetMetaMutable, DatasetRecord, DatasetType,
    FolderRecord, MediaManifest, MediaResource, ModelType, UploadRecord, ValidationResult,
};
use dive_client::error::DiveError;
use dive_client::gateway::{CloneRequest, DatasetGateway, FileRegistration, NewDatasetFolder};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchFolder(String),
    FetchDataset(String),
    FetchMedia(String),
    ReadFinished(&'static str),
    Clone(CloneRequest),
    CreateFolder(NewDatasetFolder),
    Register(FileRegistration),
    Chunk {
        upload_id: String,
        offset: u64,
        len: usize,
    },
    Postprocess {
        folder_id: String,
        skip_jobs: bool,
    },
    SaveMetadata(String),
    SaveAttributes(String),
    Validate(Vec<String>),
}

#[derive(Default)]
pub struct MockGateway {
    pub calls: Mutex<Vec<Call>>,
    pub folder: Option<FolderRecord>,
    pub dataset: Option<DatasetRecord>,
    pub media: Option<MediaManifest>,
    pub register_status: Option<u16>,
    pub chunk_status: Option<u16>,
    pub postprocess_status: Option<u16>,
}

impl MockGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Lets the other reads get issued before this one resolves.
    async fn finish_read(&self, name: &'static str) {
        tokio::task::yield_now().await;
        self.record(Call::ReadFinished(name));
    }
}

pub fn status(status: u16) -> DiveError {
    DiveError::BackendStatus {
        status,
        message: format!("mock status {status}"),
    }
}

fn reply<T: Clone>(value: &Option<T>) -> Result<T, DiveError> {
    value.clone().ok_or_else(|| status(404))
}

fn gate(configured: Option<u16>) -> Result<(), DiveError> {
    match configured {
        Some(code) if code != 200 => Err(status(code)),
        _ => Ok(()),
    }
}

impl DatasetGateway for MockGateway {
    async fn fetch_folder(&self, folder_id: &str) -> Result<FolderRecord, DiveError> {
        self.record(Call::FetchFolder(folder_id.to_string()));
        self.finish_read("folder").await;
        reply(&self.folder)
    }

    async fn fetch_dataset(&self, folder_id: &str) -> Result<DatasetRecord, DiveError> {
        self.record(Call::FetchDataset(folder_id.to_string()));
        self.finish_read("dataset").await;
        reply(&self.dataset)
    }

    async fn fetch_media(&self, folder_id: &str) -> Result<MediaManifest, DiveError> {
        self.record(Call::FetchMedia(folder_id.to_string()));
        self.finish_read("media").await;
        reply(&self.media)
    }

    async fn clone_dataset(&self, request: &CloneRequest) -> Result<FolderRecord, DiveError> {
        self.record(Call::Clone(request.clone()));
        Ok(folder(
            "clone-1",
            &request.parent_folder_id,
            ModelType::Folder,
        ))
    }

    async fn create_dataset_folder(
        &self,
        request: &NewDatasetFolder,
    ) -> Result<FolderRecord, DiveError> {
        self.record(Call::CreateFolder(request.clone()));
        Ok(folder("new-1", &request.parent_id, ModelType::Folder))
    }

    async fn register_file(
        &self,
        registration: &FileRegistration,
    ) -> Result<UploadRecord, DiveError> {
        self.record(Call::Register(registration.clone()));
        gate(self.register_status)?;
        Ok(UploadRecord {
            id: "upload-1".to_string(),
            name: Some(registration.name.clone()),
            size: Some(registration.size),
        })
    }

    async fn upload_chunk(
        &self,
        upload_id: &str,
        offset: u64,
        bytes: &[u8],
    ) -> Result<Value, DiveError> {
        self.record(Call::Chunk {
            upload_id: upload_id.to_string(),
            offset,
            len: bytes.len(),
        });
        gate(self.chunk_status)?;
        Ok(json!({ "_id": "file-1" }))
    }

    async fn postprocess(&self, folder_id: &str, skip_jobs: bool) -> Result<Value, DiveError> {
        self.record(Call::Postprocess {
            folder_id: folder_id.to_string(),
            skip_jobs,
        });
        gate(self.postprocess_status)?;
        Ok(json!({ "_id": folder_id }))
    }

    async fn save_metadata(
        &self,
        folder_id: &str,
        metadata: &DatasetMetaMutable,
    ) -> Result<Value, DiveError> {
        self.record(Call::SaveMetadata(folder_id.to_string()));
        serde_json::to_value(metadata).map_err(|err| DiveError::Decode(err.to_string()))
    }

    async fn save_attributes(
        &self,
        folder_id: &str,
        update: &AttributeUpdate,
    ) -> Result<AttributeUpdateResult, DiveError> {
        self.record(Call::SaveAttributes(folder_id.to_string()));
        Ok(AttributeUpdateResult {
            updated: update.upsert.len() as u64,
            deleted: update.delete.len() as u64,
        })
    }

    async fn validate_files(&self, names: &[String]) -> Result<ValidationResult, DiveError> {
        self.record(Call::Validate(names.to_vec()));
        Ok(ValidationResult {
            ok: true,
            dataset_type: Some(DatasetType::Video),
            media: names.to_vec(),
            annotations: Vec::new(),
            message: String::new(),
        })
    }
}

pub fn folder(id: &str, parent_id: &str, parent_collection: ModelType) -> FolderRecord {
    FolderRecord {
        id: id.to_string(),
        name: format!("folder {id}"),
        parent_id: parent_id.to_string(),
        parent_collection,
        meta: None,
    }
}

pub fn record(id: &str, dataset_type: DatasetType, fps: f64) -> DatasetRecord {
    DatasetRecord {
        id: id.to_string(),
        name: format!("dataset {id}"),
        created_at: "2021-03-04T12:00:00".to_string(),
        dataset_type,
        fps,
        annotate: true,
        original_fps: None,
        ffprobe_info: None,
        foreign_media_id: None,
        attributes: None,
        mutable: DatasetMetaMutable::default(),
        extra: serde_json::Map::new(),
    }
}

pub fn video_manifest(id: &str, url: &str) -> MediaManifest {
    MediaManifest {
        image_data: Vec::new(),
        video: Some(MediaResource {
            id: id.to_string(),
            url: url.to_string(),
            filename: String::new(),
        }),
    }
}

pub fn image_manifest(count: usize) -> MediaManifest {
    MediaManifest {
        image_data: (0..count)
            .map(|idx| MediaResource {
                id: format!("img-{idx}"),
                url: format!("api/v1/item/img-{idx}/download"),
                filename: format!("{idx:04}.png"),
            })
            .collect(),
        video: None,
    }
}

/// Backend with a resolvable video dataset `X` under collection `P`.
pub fn resolvable() -> MockGateway {
    MockGateway {
        folder: Some(folder("X", "P", ModelType::Collection)),
        dataset: Some(record("X", DatasetType::Video, 30.0)),
        media: Some(video_manifest("V", "u1")),
        ..MockGateway::default()
    }
}
