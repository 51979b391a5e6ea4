use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetType {
    Video,
    ImageSequence,
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetType::Video => write!(f, "video"),
            DatasetType::ImageSequence => write!(f, "image-sequence"),
        }
    }
}

/// Tag the backend attaches to every node of its hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Folder,
    Collection,
    User,
    Item,
    File,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Folder => write!(f, "folder"),
            ModelType::Collection => write!(f, "collection"),
            ModelType::User => write!(f, "user"),
            ModelType::Item => write!(f, "item"),
            ModelType::File => write!(f, "file"),
        }
    }
}

impl FromStr for ModelType {
    type Err = DiveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "folder" => Ok(ModelType::Folder),
            "collection" => Ok(ModelType::Collection),
            "user" => Ok(ModelType::User),
            "item" => Ok(ModelType::Item),
            "file" => Ok(ModelType::File),
            other => Err(DiveError::UnknownModelType(other.to_string())),
        }
    }
}

/// Mutable metadata fields a client may patch on a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetaMutable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type_styling: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_filters: Option<BTreeMap<String, f64>>,
}

/// Static dataset description owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    pub fps: f64,
    #[serde(default)]
    pub annotate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_fps: Option<f64>,
    #[serde(
        rename = "ffprobe_info",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ffprobe_info: Option<BTreeMap<String, Value>>,
    #[serde(
        rename = "foreign_media_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub foreign_media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(flatten)]
    pub mutable: DatasetMetaMutable,
    /// Metadata keys the client does not model, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResource {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaManifest {
    #[serde(rename = "imageData", default)]
    pub image_data: Vec<MediaResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaResource>,
}

/// Dataset record and media manifest composed into the view consumers read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDataset {
    #[serde(flatten)]
    pub record: DatasetRecord,
    #[serde(flatten)]
    pub media: MediaManifest,
    #[serde(rename = "videoUrl", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl ResolvedDataset {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: String,
    #[serde(rename = "parentCollection")]
    pub parent_collection: ModelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl FolderRecord {
    pub fn parent_location(&self) -> Location {
        Location {
            id: self.parent_id.clone(),
            model_type: self.parent_collection,
        }
    }
}

/// Upload session returned by file registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A container in the backend hierarchy, as addressed by the browser route
/// `:_modelType/:_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_modelType")]
    pub model_type: ModelType,
}

impl Location {
    pub fn new(id: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            id: id.into(),
            model_type,
        }
    }

    /// An empty route means no location is selected.
    pub fn from_route(route: &str) -> Result<Option<Self>, DiveError> {
        let trimmed = route.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model_type, self.id)
    }
}

impl FromStr for Location {
    type Err = DiveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_matches('/');
        let (kind, id) = trimmed
            .split_once('/')
            .ok_or_else(|| DiveError::InvalidLocation(value.to_string()))?;
        if id.is_empty() || id.contains('/') {
            return Err(DiveError::InvalidLocation(value.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            model_type: kind.parse()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    #[serde(rename = "type", default)]
    pub dataset_type: Option<DatasetType>,
    #[serde(default)]
    pub media: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeTarget {
    Track,
    Detection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    Number,
    Text,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub belongs: AttributeTarget,
    pub datatype: AttributeDataType,
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// Upsert/delete batch for custom attribute definitions. The backend rejects
/// any other top-level key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeUpdate {
    #[serde(default)]
    pub upsert: Vec<Attribute>,
    #[serde(default)]
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUpdateResult {
    pub updated: u64,
    pub deleted: u64,
}
