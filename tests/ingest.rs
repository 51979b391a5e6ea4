mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use common::{Call, MockGateway};
use dive_client::gateway::FileRegistration;
use dive_client::ingest::{AnnotationFile, ImportStage, Stage, import_annotation_file, run_import};

fn csv(name: &str, body: &[u8]) -> AnnotationFile {
    AnnotationFile::new(name, "text/csv", body.to_vec())
}

#[tokio::test]
async fn missing_file_makes_no_calls() {
    let gateway = MockGateway::default();
    let imported = import_annotation_file(&gateway, "parent", "/data/a", None).await;
    assert!(!imported);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn register_failure_stops_pipeline() {
    let gateway = MockGateway {
        register_status: Some(500),
        ..MockGateway::default()
    };
    let file = csv("empty.csv", b"");
    let imported = import_annotation_file(&gateway, "parent", "", Some(&file)).await;

    assert!(!imported);
    assert_eq!(
        gateway.calls(),
        vec![Call::Register(FileRegistration {
            parent_id: "parent".to_string(),
            name: "empty.csv".to_string(),
            size: 0,
            mime_type: "text/csv".to_string(),
        })]
    );
}

#[tokio::test]
async fn transfer_failure_skips_postprocess() {
    let gateway = MockGateway {
        chunk_status: Some(413),
        ..MockGateway::default()
    };
    let file = csv("tracks.csv", b"1,2,3\n");
    let state = run_import(&gateway, "parent", "", &file).await;

    assert_eq!(state, ImportStage::Failed(Stage::Transfer));
    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_matches!(calls[0], Call::Register(_));
    assert_matches!(calls[1], Call::Chunk { .. });
}

#[tokio::test]
async fn postprocess_failure_is_false_after_two_calls() {
    let gateway = MockGateway {
        postprocess_status: Some(500),
        ..MockGateway::default()
    };
    let file = csv("tracks.csv", b"1,2,3\n");
    let imported = import_annotation_file(&gateway, "parent", "", Some(&file)).await;

    assert!(!imported);
    let calls = gateway.calls();
    assert_eq!(calls.len(), 3);
    assert_matches!(calls[0], Call::Register(_));
    assert_matches!(calls[1], Call::Chunk { .. });
    assert_matches!(calls[2], Call::Postprocess { .. });
}

#[tokio::test]
async fn successful_import_runs_stages_in_order() {
    let gateway = MockGateway::default();
    let file = AnnotationFile::new("tracks.json", "application/json", b"{}".to_vec());
    let imported = import_annotation_file(&gateway, "parent", "a/b", Some(&file)).await;

    assert!(imported);
    assert_eq!(
        gateway.calls(),
        vec![
            Call::Register(FileRegistration {
                parent_id: "parent".to_string(),
                name: "tracks.json".to_string(),
                size: 2,
                mime_type: "application/json".to_string(),
            }),
            Call::Chunk {
                upload_id: "upload-1".to_string(),
                offset: 0,
                len: 2,
            },
            Call::Postprocess {
                folder_id: "parent".to_string(),
                skip_jobs: true,
            },
        ]
    );
}

#[test]
fn file_from_path_guesses_mime() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("tracks.csv")).unwrap();
    std::fs::write(path.as_std_path(), b"id,frame\n").unwrap();

    let file = AnnotationFile::from_path(&path).unwrap();
    assert_eq!(file.name, "tracks.csv");
    assert_eq!(file.size, 9);
    assert_eq!(file.mime_type, "text/csv");
}

#[test]
fn file_from_missing_path_is_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("missing.csv")).unwrap();
    assert!(AnnotationFile::from_path(&path).is_err());
}
