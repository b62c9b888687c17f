//! Integration tests for the built-in stores and the command helpers.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use serde_json::json;
use stagehand::AppError;
use stagehand::builtins::{RecordStore, builtin_registry, default_manifest, install};
use stagehand::cli::{context_summary, plan_summary, with_deadline};
use stagehand_core::{
    Bootstrapper, ExtensionEntry, LoadedExtension, ModuleLoader, Stage, StagehandError, StoreSlot,
    render_manifest,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn bootstrapper(root: &std::path::Path) -> Bootstrapper {
    Bootstrapper::new(root, Arc::new(builtin_registry()))
}

// =============================================================================
// INIT + RUN
// =============================================================================

#[tokio::test]
async fn installed_defaults_bootstrap_every_slot() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();

    let context = bootstrapper(dir.path()).run().await.unwrap();
    assert_eq!(context.filled_slots(), StoreSlot::ALL.to_vec());

    let summary = context_summary(&context);
    assert_eq!(
        summary["slots"],
        json!(["factStore", "eventStore", "entityStore", "relationshipStore"])
    );
    assert_eq!(summary["loaders"], 0);
    assert_eq!(summary["hooks"], json!({}));
}

#[tokio::test]
async fn default_manifest_survives_a_run_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();
    let expected = render_manifest(&default_manifest()).unwrap();

    bootstrapper(dir.path()).run().await.unwrap();
    let written = std::fs::read_to_string(dir.path().join("extensions.json")).unwrap();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn disabling_entity_store_blocks_relationships() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();

    let path = dir.path().join("extensions.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    manifest["stores"][2]["status"] = json!("off");
    std::fs::write(&path, manifest.to_string()).unwrap();

    let err = bootstrapper(dir.path()).run().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Bootstrap error: missing required store slots: entityStore."
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["stores"][3]["status"], "needs:@stagehand/entity-store");
}

#[tokio::test]
async fn seeded_records_reach_the_store() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();

    let path = dir.path().join("extensions.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    manifest["stores"][0]["options"] = json!({ "records": [{ "fact": "sky is blue" }] });
    std::fs::write(&path, manifest.to_string()).unwrap();

    let context = bootstrapper(dir.path()).run().await.unwrap();
    let facts = context.store_as::<RecordStore>(StoreSlot::Fact).unwrap();
    assert_eq!(facts.records(), vec![json!({ "fact": "sky is blue" })]);
}

#[tokio::test]
async fn plan_summary_lists_waves() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();

    let plan = bootstrapper(dir.path()).plan().await.unwrap();
    let summary = plan_summary(&plan);
    assert_eq!(summary["activations"], 4);
    assert_eq!(
        summary["stages"][Stage::Stores.key()]["waves"],
        json!([
            ["@stagehand/fact-store", "@stagehand/event-store", "@stagehand/entity-store"],
            ["@stagehand/relationship-store"]
        ])
    );
    assert_eq!(
        summary["stages"]["stores"]["statuses"]["@stagehand/fact-store"],
        "on"
    );
}

// =============================================================================
// DEADLINE
// =============================================================================

#[tokio::test]
async fn deadline_times_out_a_stuck_bootstrap() {
    let stuck = std::future::pending::<Result<(), StagehandError>>();
    let err = with_deadline(stuck, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
}

#[tokio::test]
async fn deadline_passes_core_errors_through() {
    let failing = async { Err::<(), _>(StagehandError::EmptyNeeds) };
    let err = with_deadline(failing, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Config invalid: needs list cannot be empty.");
}

/// A loader whose modules never finish resolving.
struct StuckLoader;

#[async_trait]
impl ModuleLoader for StuckLoader {
    async fn load(
        &self,
        _root: &Path,
        _entry: &ExtensionEntry,
    ) -> Result<LoadedExtension, StagehandError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn deadline_during_resolution_leaves_manifest_untouched() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), "extensions.json", false).unwrap();
    let path = dir.path().join("extensions.json");
    let raw = r#"{"stores":[{"name":"@stagehand/fact-store","path":".\\extensions\\stores\\fact-store.ext","status":"on"}],"loaders":[],"validators":[],"contextBuilders":[],"senders":[],"ui":[]}"#;
    std::fs::write(&path, raw).unwrap();

    let bootstrapper = Bootstrapper::new(dir.path(), Arc::new(StuckLoader));
    let err = with_deadline(bootstrapper.run(), Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
}
