use std::fs;
use std::future::Future;

use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::error::DiveError;
use crate::gateway::{DatasetGateway, FileRegistration};

/// An annotation file chosen for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AnnotationFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, DiveError> {
        let name = path
            .file_name()
            .ok_or_else(|| DiveError::Filesystem(format!("not a file: {path}")))?;
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| DiveError::Filesystem(format!("read {path}: {err}")))?;
        let mime_type = mime_guess::from_path(path.as_std_path())
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, mime_type, bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Register,
    Transfer,
    PostProcess,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Register => "register",
            Stage::Transfer => "transfer",
            Stage::PostProcess => "post-process",
        }
    }
}

/// Progress of a single import attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStage {
    Start,
    Registered { upload_id: String },
    Uploaded,
    Completed,
    Failed(Stage),
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Completed | ImportStage::Failed(_))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, ImportStage::Completed)
    }

    /// The stage that runs next from this state.
    pub fn pending(&self) -> Option<Stage> {
        match self {
            ImportStage::Start => Some(Stage::Register),
            ImportStage::Registered { .. } => Some(Stage::Transfer),
            ImportStage::Uploaded => Some(Stage::PostProcess),
            ImportStage::Completed | ImportStage::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Registered { upload_id: String },
    Uploaded,
    PostProcessed,
    Failed,
}

pub fn step(state: ImportStage, outcome: StageOutcome) -> ImportStage {
    match (state, outcome) {
        (terminal, _) if terminal.is_terminal() => terminal,
        (ImportStage::Start, StageOutcome::Registered { upload_id }) => {
            ImportStage::Registered { upload_id }
        }
        (ImportStage::Registered { .. }, StageOutcome::Uploaded) => ImportStage::Uploaded,
        (ImportStage::Uploaded, StageOutcome::PostProcessed) => ImportStage::Completed,
        // A failure, or an outcome belonging to another stage, stops here.
        (state, _) => match state.pending() {
            Some(stage) => ImportStage::Failed(stage),
            None => state,
        },
    }
}

/// Runs stages until a terminal state. Stage N+1 is only requested after
/// stage N's outcome has been folded in.
pub async fn drive<F, Fut>(mut run_stage: F) -> ImportStage
where
    F: FnMut(ImportStage) -> Fut,
    Fut: Future<Output = StageOutcome>,
{
    let mut state = ImportStage::Start;
    while !state.is_terminal() {
        let outcome = run_stage(state.clone()).await;
        state = step(state, outcome);
    }
    state
}

/// Imports one annotation file into `parent_id`: register, transfer the
/// bytes, then trigger post-processing. Returns `true` only when all three
/// succeed. No stage is retried and nothing is rolled back.
pub async fn import_annotation_file<G: DatasetGateway>(
    gateway: &G,
    parent_id: &str,
    path: &str,
    file: Option<&AnnotationFile>,
) -> bool {
    let Some(file) = file else {
        debug!(parent_id, path, "no annotation file supplied");
        return false;
    };
    run_import(gateway, parent_id, path, file).await.succeeded()
}

pub async fn run_import<G: DatasetGateway>(
    gateway: &G,
    parent_id: &str,
    path: &str,
    file: &AnnotationFile,
) -> ImportStage {
    let state = drive(|state| run_stage(gateway, parent_id, file, state)).await;
    match &state {
        ImportStage::Failed(stage) => warn!(
            parent_id,
            path,
            file = %file.name,
            stage = stage.as_str(),
            "annotation import failed"
        ),
        _ => info!(parent_id, path, file = %file.name, "annotation import complete"),
    }
    state
}

async fn run_stage<G: DatasetGateway>(
    gateway: &G,
    parent_id: &str,
    file: &AnnotationFile,
    state: ImportStage,
) -> StageOutcome {
    match state {
        ImportStage::Start => {
            let registration = FileRegistration {
                parent_id: parent_id.to_string(),
                name: file.name.clone(),
                size: file.size,
                mime_type: file.mime_type.clone(),
            };
            match gateway.register_file(&registration).await {
                Ok(upload) => StageOutcome::Registered {
                    upload_id: upload.id,
                },
                Err(err) => stage_failed(Stage::Register, &err),
            }
        }
        ImportStage::Registered { upload_id } => {
            match gateway.upload_chunk(&upload_id, 0, &file.bytes).await {
                Ok(_) => StageOutcome::Uploaded,
                Err(err) => stage_failed(Stage::Transfer, &err),
            }
        }
        ImportStage::Uploaded => match gateway.postprocess(parent_id, true).await {
            Ok(_) => StageOutcome::PostProcessed,
            Err(err) => stage_failed(Stage::PostProcess, &err),
        },
        // drive() never runs a terminal state
        ImportStage::Completed | ImportStage::Failed(_) => StageOutcome::Failed,
    }
}

fn stage_failed(stage: Stage, err: &DiveError) -> StageOutcome {
    debug!(stage = stage.as_str(), error = %err, "import stage rejected");
    StageOutcome::Failed
}
