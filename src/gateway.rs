use std::future::Future;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::{
    AttributeUpdate, AttributeUpdateResult, DatasetMetaMutable, DatasetRecord, DatasetType,
    FolderRecord, MediaManifest, UploadRecord, ValidationResult,
};
use crate::error::DiveError;

pub const DATASET_PATH: &str = "dive_dataset";
pub const VALIDATE_FILES_PATH: &str = "dive_dataset/validate_files";
pub const FOLDER_PATH: &str = "folder";
pub const FILE_PATH: &str = "file";
pub const FILE_CHUNK_PATH: &str = "file/chunk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub folder_id: String,
    pub parent_folder_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDatasetFolder {
    pub parent_id: String,
    pub name: String,
    pub fps: f64,
    pub dataset_type: DatasetType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRegistration {
    pub parent_id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Typed access to the dataset, folder, file and job endpoints.
///
/// Implementations shape requests only: no retries, no caching, and any
/// non-2xx response comes back as [`DiveError::BackendStatus`].
/// Every 2xx status counts as success, not only 200.
pub trait DatasetGateway: Send + Sync {
    fn fetch_folder(
        &self,
        folder_id: &str,
    ) -> impl Future<Output = Result<FolderRecord, DiveError>> + Send;

    fn fetch_dataset(
        &self,
        folder_id: &str,
    ) -> impl Future<Output = Result<DatasetRecord, DiveError>> + Send;

    fn fetch_media(
        &self,
        folder_id: &str,
    ) -> impl Future<Output = Result<MediaManifest, DiveError>> + Send;

    fn clone_dataset(
        &self,
        request: &CloneRequest,
    ) -> impl Future<Output = Result<FolderRecord, DiveError>> + Send;

    fn create_dataset_folder(
        &self,
        request: &NewDatasetFolder,
    ) -> impl Future<Output = Result<FolderRecord, DiveError>> + Send;

    fn register_file(
        &self,
        registration: &FileRegistration,
    ) -> impl Future<Output = Result<UploadRecord, DiveError>> + Send;

    fn upload_chunk(
        &self,
        upload_id: &str,
        offset: u64,
        bytes: &[u8],
    ) -> impl Future<Output = Result<Value, DiveError>> + Send;

    fn postprocess(
        &self,
        folder_id: &str,
        skip_jobs: bool,
    ) -> impl Future<Output = Result<Value, DiveError>> + Send;

    fn save_metadata(
        &self,
        folder_id: &str,
        metadata: &DatasetMetaMutable,
    ) -> impl Future<Output = Result<Value, DiveError>> + Send;

    fn save_attributes(
        &self,
        folder_id: &str,
        update: &AttributeUpdate,
    ) -> impl Future<Output = Result<AttributeUpdateResult, DiveError>> + Send;

    fn validate_files(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<ValidationResult, DiveError>> + Send;
}

pub fn dataset_path(folder_id: &str) -> String {
    format!("{DATASET_PATH}/{folder_id}")
}

pub fn media_path(folder_id: &str) -> String {
    format!("{DATASET_PATH}/{folder_id}/media")
}

pub fn attributes_path(folder_id: &str) -> String {
    format!("{DATASET_PATH}/{folder_id}/attributes")
}

pub fn folder_path(folder_id: &str) -> String {
    format!("{FOLDER_PATH}/{folder_id}")
}

pub fn postprocess_path(folder_id: &str) -> String {
    format!("viame/postprocess/{folder_id}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloneQuery<'a> {
    clone_id: &'a str,
    parent_folder_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterQuery<'a> {
    parent_type: &'static str,
    parent_id: &'a str,
    name: &'a str,
    size: u64,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkQuery<'a> {
    upload_id: &'a str,
    offset: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostprocessQuery {
    skip_jobs: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderQuery<'a> {
    parent_id: &'a str,
    name: &'a str,
}

/// Form body the folder endpoint expects for dataset metadata.
pub fn dataset_folder_metadata(fps: f64, dataset_type: DatasetType) -> String {
    serde_json::json!({ "fps": fps, "type": dataset_type }).to_string()
}

#[derive(Clone)]
pub struct GirderHttpGateway {
    client: Client,
    api_root: String,
}

impl GirderHttpGateway {
    pub fn new(config: &ResolvedConfig) -> Result<Self, DiveError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|err| DiveError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| DiveError::Http(err.to_string()))?;
        Ok(Self {
            client,
            api_root: config.api_root.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    fn clone_request(&self, request: &CloneRequest) -> RequestBuilder {
        let query = CloneQuery {
            clone_id: &request.folder_id,
            parent_folder_id: &request.parent_folder_id,
            name: request.name.as_deref(),
        };
        self.client.post(self.url(DATASET_PATH)).query(&query)
    }

    fn create_folder_request(&self, request: &NewDatasetFolder) -> RequestBuilder {
        let query = FolderQuery {
            parent_id: &request.parent_id,
            name: &request.name,
        };
        let metadata = dataset_folder_metadata(request.fps, request.dataset_type);
        self.client
            .post(self.url(FOLDER_PATH))
            .query(&query)
            .form(&[("metadata", metadata)])
    }

    fn register_request(&self, registration: &FileRegistration) -> RequestBuilder {
        let query = RegisterQuery {
            parent_type: "folder",
            parent_id: &registration.parent_id,
            name: &registration.name,
            size: registration.size,
            mime_type: &registration.mime_type,
        };
        self.client.post(self.url(FILE_PATH)).query(&query)
    }

    /// The chunk is always declared as an octet stream, whatever the file's
    /// own MIME type.
    fn chunk_request(&self, upload_id: &str, offset: u64, bytes: &[u8]) -> RequestBuilder {
        self.client
            .post(self.url(FILE_CHUNK_PATH))
            .query(&ChunkQuery { upload_id, offset })
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
    }

    fn postprocess_request(&self, folder_id: &str, skip_jobs: bool) -> RequestBuilder {
        self.client
            .post(self.url(&postprocess_path(folder_id)))
            .query(&PostprocessQuery { skip_jobs })
    }

    async fn handle_status(response: Response) -> Result<Response, DiveError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "backend request failed".to_string());
        Err(DiveError::BackendStatus { status, message })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, DiveError> {
        debug!(method, path, "backend request");
        let response = request
            .send()
            .await
            .map_err(|err| DiveError::Http(err.to_string()))?;
        let response = Self::handle_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| DiveError::Decode(err.to_string()))
    }
}

impl DatasetGateway for GirderHttpGateway {
    async fn fetch_folder(&self, folder_id: &str) -> Result<FolderRecord, DiveError> {
        let path = folder_path(folder_id);
        let request = self.client.get(self.url(&path));
        self.send_json("GET", &path, request).await
    }

    async fn fetch_dataset(&self, folder_id: &str) -> Result<DatasetRecord, DiveError> {
        let path = dataset_path(folder_id);
        let request = self.client.get(self.url(&path));
        self.send_json("GET", &path, request).await
    }

    async fn fetch_media(&self, folder_id: &str) -> Result<MediaManifest, DiveError> {
        let path = media_path(folder_id);
        let request = self.client.get(self.url(&path));
        self.send_json("GET", &path, request).await
    }

    async fn clone_dataset(&self, request: &CloneRequest) -> Result<FolderRecord, DiveError> {
        let builder = self.clone_request(request);
        self.send_json("POST", DATASET_PATH, builder).await
    }

    async fn create_dataset_folder(
        &self,
        request: &NewDatasetFolder,
    ) -> Result<FolderRecord, DiveError> {
        let builder = self.create_folder_request(request);
        self.send_json("POST", FOLDER_PATH, builder).await
    }

    async fn register_file(
        &self,
        registration: &FileRegistration,
    ) -> Result<UploadRecord, DiveError> {
        let builder = self.register_request(registration);
        self.send_json("POST", FILE_PATH, builder).await
    }

    async fn upload_chunk(
        &self,
        upload_id: &str,
        offset: u64,
        bytes: &[u8],
    ) -> Result<Value, DiveError> {
        let builder = self.chunk_request(upload_id, offset, bytes);
        self.send_json("POST", FILE_CHUNK_PATH, builder).await
    }

    async fn postprocess(&self, folder_id: &str, skip_jobs: bool) -> Result<Value, DiveError> {
        let path = postprocess_path(folder_id);
        let builder = self.postprocess_request(folder_id, skip_jobs);
        self.send_json("POST", &path, builder).await
    }

    async fn save_metadata(
        &self,
        folder_id: &str,
        metadata: &DatasetMetaMutable,
    ) -> Result<Value, DiveError> {
        let path = dataset_path(folder_id);
        let builder = self.client.patch(self.url(&path)).json(metadata);
        self.send_json("PATCH", &path, builder).await
    }

    async fn save_attributes(
        &self,
        folder_id: &str,
        update: &AttributeUpdate,
    ) -> Result<AttributeUpdateResult, DiveError> {
        let path = attributes_path(folder_id);
        let builder = self.client.patch(self.url(&path)).json(update);
        self.send_json("PATCH", &path, builder).await
    }

    async fn validate_files(&self, names: &[String]) -> Result<ValidationResult, DiveError> {
        let builder = self.client.post(self.url(VALIDATE_FILES_PATH)).json(names);
        self.send_json("POST", VALIDATE_FILES_PATH, builder).await
    }
}
