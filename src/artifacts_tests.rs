use super::*;
use crate::testing::write_file;

const MANIFEST: &str = r#"{
  "metadata": {"dbt_version": "1.7.4"},
  "nodes": {"model.proj.a": {}, "model.proj.b": {}}
}"#;

const RUN_RESULTS: &str = r#"{
  "elapsed_time": 1.5,
  "results": [{"status": "success"}, {"status": "success"}, {"status": "error"}]
}"#;

#[test]
fn collects_both_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join(MANIFEST_FILE), MANIFEST);
    write_file(&dir.path().join(RUN_RESULTS_FILE), RUN_RESULTS);

    let mut artifacts = Artifacts::default();
    collect_target(dir.path(), &mut artifacts).expect("collect");

    let manifest = artifacts.manifest.expect("manifest");
    assert_eq!(manifest.dbt_version(), Some("1.7.4"));
    assert_eq!(manifest.node_count(), 2);
    let run_result = artifacts.run_result.expect("run result");
    assert_eq!(run_result.elapsed_time(), Some(1.5));
    let counts = run_result.status_counts();
    assert_eq!(counts.get("success"), Some(&2));
    assert_eq!(counts.get("error"), Some(&1));
}

#[test]
fn unparseable_run_results_are_tolerated() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join(MANIFEST_FILE), MANIFEST);
    write_file(&dir.path().join(RUN_RESULTS_FILE), "{ truncated");

    let mut artifacts = Artifacts::default();
    collect_target(dir.path(), &mut artifacts).expect("collect");

    assert!(artifacts.manifest.is_some());
    assert!(artifacts.run_result.is_none());
}

#[test]
fn unparseable_manifest_keeps_previous_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join(MANIFEST_FILE), "not json");
    write_file(&dir.path().join(RUN_RESULTS_FILE), RUN_RESULTS);

    let previous = Manifest(serde_json::json!({"nodes": {}}));
    let mut artifacts = Artifacts {
        manifest: Some(previous.clone()),
        run_result: None,
    };
    collect_target(dir.path(), &mut artifacts).expect("collect");

    assert_eq!(artifacts.manifest, Some(previous));
    assert!(artifacts.run_result.is_some());
}

#[test]
fn missing_manifest_fails_before_run_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A directory in place of run_results.json would fail to read too; the
    // error must still name the manifest.
    std::fs::create_dir_all(dir.path().join(RUN_RESULTS_FILE)).expect("mkdir");

    let mut artifacts = Artifacts::default();
    let err = collect_target(dir.path(), &mut artifacts).unwrap_err();

    match DbtError::find(&err) {
        Some(DbtError::ArtifactRead { path, .. }) => {
            assert_eq!(path, &dir.path().join(MANIFEST_FILE));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(artifacts, Artifacts::default());
}

#[test]
fn missing_run_results_fails_after_manifest_update() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join(MANIFEST_FILE), MANIFEST);

    let mut artifacts = Artifacts::default();
    let err = collect_target(dir.path(), &mut artifacts).unwrap_err();

    assert!(matches!(
        DbtError::find(&err),
        Some(DbtError::ArtifactRead { .. })
    ));
    assert!(artifacts.manifest.is_some());
}
