use std::sync::Arc;

use grid_engine::{EngineConfig, GridEngine, LayoutStore};
use shared::{domain::ProgramId, error::ErrorCode};
use storage::Storage;

#[tokio::test]
async fn layouts_survive_a_restart() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        temp_root
            .path()
            .join("grid.db")
            .to_string_lossy()
            .replace('\\', "/")
    );

    {
        let storage = Arc::new(Storage::new(&database_url).await.expect("db"));
        let engine = GridEngine::new(EngineConfig::immediate(), storage);
        for command in [
            "open patient info on the left side",
            "open dicom across c and d bottom",
            "save layout as Spine Case",
        ] {
            let outcome = engine.process_command(command).await;
            assert!(outcome.success, "{command}: {}", outcome.message);
        }
    }

    let storage = Arc::new(Storage::new(&database_url).await.expect("reopen db"));
    assert!(storage.get("Spine Case").await.expect("get").is_some());

    let engine = GridEngine::new(EngineConfig::immediate(), storage);
    let outcome = engine.process_command("load layout Spine Case").await;
    assert!(outcome.success, "{}", outcome.message);

    let patient = ProgramId::from("patient-info");
    let dicom = ProgramId::from("dicom-viewer");
    let groups = engine.groups().await;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].program, patient);
    assert_eq!(groups[0].positions.len(), 2);
    assert_eq!(groups[1].program, dicom);
    assert_eq!(groups[1].positions.len(), 2);

    let outcome = engine.process_command("delete layout Spine Case").await;
    assert!(outcome.success, "{}", outcome.message);
    let outcome = engine.process_command("load layout Spine Case").await;
    assert_eq!(outcome.error, Some(ErrorCode::LayoutNotFound));
}
