//! Workspace staging: fixture materialization into workspaces, the
//! protected-set sweep between test cases, and release semantics.

mod common;

use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;

use codeforge::models::FixtureKind;
use codeforge::sandbox::workspace;

use common::test_env;

#[tokio::test]
async fn file_fixture_is_staged_with_recorded_permissions() {
    let env = test_env().await;
    env.state
        .fixtures
        .put(
            "runner.sh",
            FixtureKind::File,
            Some(b"#!/bin/sh\n"),
            Some("rwxr-xr-x"),
        )
        .await
        .unwrap();

    let ws = workspace::create(&env.state.config.temp_root).await.unwrap();
    let staged = env
        .state
        .fixtures
        .stage_into(&ws, "runner.sh")
        .await
        .unwrap();
    assert_eq!(staged.as_deref(), Some("runner.sh"));

    let staged_path = ws.join("runner.sh");
    assert!(staged_path.is_file());
    let mode = std::fs::metadata(&staged_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    workspace::release(&ws).await;
}

#[tokio::test]
async fn nested_fixture_preserves_relative_layout() {
    let env = test_env().await;
    env.state
        .fixtures
        .put("data", FixtureKind::Folder, None, None)
        .await
        .unwrap();
    env.state
        .fixtures
        .put_in_folder("data", "sample.txt", b"1 2 3\n")
        .await
        .unwrap();

    let ws = workspace::create(&env.state.config.temp_root).await.unwrap();

    // Staging the file by its folder/file address lands it at that path.
    let staged = env
        .state
        .fixtures
        .stage_into(&ws, "data/sample.txt")
        .await
        .unwrap();
    assert_eq!(staged.as_deref(), Some("data"));
    assert_eq!(
        std::fs::read(ws.join("data/sample.txt")).unwrap(),
        b"1 2 3\n"
    );

    workspace::release(&ws).await;
}

#[tokio::test]
async fn folder_fixture_is_copied_recursively() {
    let env = test_env().await;
    env.state
        .fixtures
        .put("bundle", FixtureKind::Folder, None, Some("rwxrwxr-x"))
        .await
        .unwrap();
    env.state
        .fixtures
        .put_in_folder("bundle", "a.txt", b"a")
        .await
        .unwrap();
    env.state
        .fixtures
        .put_in_folder("bundle", "b.txt", b"b")
        .await
        .unwrap();

    let ws = workspace::create(&env.state.config.temp_root).await.unwrap();
    let staged = env.state.fixtures.stage_into(&ws, "bundle").await.unwrap();
    assert_eq!(staged.as_deref(), Some("bundle"));

    assert_eq!(std::fs::read(ws.join("bundle/a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(ws.join("bundle/b.txt")).unwrap(), b"b");

    // The folder's own mode comes from the recorded permission string.
    let mode = std::fs::metadata(ws.join("bundle")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o775);

    workspace::release(&ws).await;
}

#[tokio::test]
async fn missing_fixture_is_skipped_not_fatal() {
    let env = test_env().await;
    let ws = workspace::create(&env.state.config.temp_root).await.unwrap();

    let staged = env.state.fixtures.stage_into(&ws, "ghost.txt").await.unwrap();
    assert!(staged.is_none());

    workspace::release(&ws).await;
}

#[tokio::test]
async fn sweep_between_cases_keeps_script_and_fixtures() {
    let env = test_env().await;
    env.state
        .fixtures
        .put("input.txt", FixtureKind::File, Some(b"fixture"), None)
        .await
        .unwrap();

    let ws = workspace::create(&env.state.config.temp_root).await.unwrap();
    workspace::write_script(&ws, "script.sh", "cat input.txt > copy.txt")
        .await
        .unwrap();
    env.state
        .fixtures
        .stage_into(&ws, "input.txt")
        .await
        .unwrap();

    // Simulate output-file residue from the previous case.
    tokio::fs::write(ws.join("copy.txt"), b"residue").await.unwrap();

    let protected: HashSet<String> =
        HashSet::from(["script.sh".to_string(), "input.txt".to_string()]);
    workspace::sweep(&ws, &protected).await.unwrap();

    assert!(ws.join("script.sh").exists());
    assert!(ws.join("input.txt").exists());
    assert!(!ws.join("copy.txt").exists());

    workspace::release(&ws).await;
    assert!(!ws.exists());
}

#[tokio::test]
async fn workspaces_are_independent_per_submission() {
    let env = test_env().await;
    let ws_a = workspace::create(&env.state.config.temp_root).await.unwrap();
    let ws_b = workspace::create(&env.state.config.temp_root).await.unwrap();
    assert_ne!(ws_a, ws_b);

    workspace::write_script(&ws_a, "script.sh", "echo a").await.unwrap();
    workspace::write_script(&ws_b, "script.sh", "echo b").await.unwrap();

    assert_eq!(
        std::fs::read_to_string(ws_a.join("script.sh")).unwrap(),
        "echo a"
    );
    assert_eq!(
        std::fs::read_to_string(ws_b.join("script.sh")).unwrap(),
        "echo b"
    );

    workspace::release(&ws_a).await;
    workspace::release(&ws_b).await;
}
