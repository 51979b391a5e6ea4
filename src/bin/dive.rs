use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dive_client::app::App;
use dive_client::config::ConfigLoader;
use dive_client::domain::{AttributeUpdate, DatasetMetaMutable, DatasetType};
use dive_client::error::DiveError;
use dive_client::gateway::{CloneRequest, GirderHttpGateway, NewDatasetFolder};
use dive_client::ingest::AnnotationFile;
use dive_client::output::JsonOutput;
use dive_client::store::Store;

#[derive(Parser)]
#[command(name = "dive")]
#[command(about = "Manage DIVE annotation datasets on a Girder backend")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Resolve a dataset and its parent location")]
    Load { id: String },
    #[command(about = "Import an annotation file into a dataset")]
    Import {
        parent_id: String,
        file: Option<String>,
        #[arg(long, default_value = "")]
        path: String,
    },
    #[command(about = "Clone a dataset into another folder")]
    Clone {
        id: String,
        #[arg(long)]
        parent: String,
        #[arg(long)]
        name: Option<String>,
    },
    #[command(about = "Create a dataset folder")]
    CreateFolder {
        parent_id: String,
        name: String,
        #[arg(long)]
        fps: f64,
        #[arg(long = "type", value_enum)]
        dataset_type: DatasetType,
    },
    #[command(about = "Classify a group of filenames for upload")]
    Validate {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        offline: bool,
    },
    #[command(about = "Patch mutable dataset metadata (JSON)")]
    SaveMetadata { id: String, json: String },
    #[command(about = "Upsert or delete attribute definitions (JSON)")]
    SaveAttributes { id: String, json: String },
    #[command(about = "Set the browsing location from a route (modelType/id)")]
    Navigate { route: String },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(dive) = report.downcast_ref::<DiveError>() {
            return ExitCode::from(map_exit_code(dive));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DiveError) -> u8 {
    match error {
        DiveError::ConfigRead(_) | DiveError::ConfigParse(_) | DiveError::InvalidApiRoot(_) => 2,
        DiveError::Http(_) | DiveError::BackendStatus { .. } | DiveError::Decode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let gateway = GirderHttpGateway::new(&config)?;
    let app = App::new(gateway, Arc::new(Store::new()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(run_command(cli.command, &app))
}

async fn run_command(command: Command, app: &App<GirderHttpGateway>) -> miette::Result<()> {
    match command {
        Command::Load { id } => {
            let result = app.load(&id).await?;
            JsonOutput::print_load(&result).into_diagnostic()?;
        }
        Command::Import {
            parent_id,
            file,
            path,
        } => {
            let file = file
                .map(|file| AnnotationFile::from_path(&Utf8PathBuf::from(file)))
                .transpose()?;
            let result = app.import(&parent_id, &path, file.as_ref()).await;
            JsonOutput::print_import(&result).into_diagnostic()?;
            if file.is_some() && !result.imported {
                return Err(miette::Report::msg("annotation import did not complete"));
            }
        }
        Command::Clone { id, parent, name } => {
            let request = CloneRequest {
                folder_id: id,
                parent_folder_id: parent,
                name,
            };
            let folder = app.clone_dataset(&request).await?;
            JsonOutput::print_json(&folder).into_diagnostic()?;
        }
        Command::CreateFolder {
            parent_id,
            name,
            fps,
            dataset_type,
        } => {
            let request = NewDatasetFolder {
                parent_id,
                name,
                fps,
                dataset_type,
            };
            let folder = app.create_dataset_folder(&request).await?;
            JsonOutput::print_json(&folder).into_diagnostic()?;
        }
        Command::Validate { names, offline } => {
            let result = app.validate(&names, offline).await?;
            JsonOutput::print_json(&result).into_diagnostic()?;
        }
        Command::SaveMetadata { id, json } => {
            let metadata: DatasetMetaMutable = parse_payload(&json)?;
            let saved = app.save_metadata(&id, &metadata).await?;
            JsonOutput::print_json(&saved).into_diagnostic()?;
        }
        Command::SaveAttributes { id, json } => {
            let update: AttributeUpdate = parse_payload(&json)?;
            let saved = app.save_attributes(&id, &update).await?;
            JsonOutput::print_json(&saved).into_diagnostic()?;
        }
        Command::Navigate { route } => {
            let result = app.navigate(&route)?;
            JsonOutput::print_navigate(&result).into_diagnostic()?;
        }
    }
    Ok(())
}

fn parse_payload<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, DiveError> {
    serde_json::from_str(json).map_err(|err| DiveError::InvalidPayload(err.to_string()))
}
