use crate::api::AgentFilesClient;
use crate::error::api::ApiError;
use crate::tests::support::{FakeLink, Harness};

use serde_json::{Value, json};

async fn answer(link: &mut FakeLink, payload: Value) -> Value {
    let frame = link.recv_frame().await;
    link.respond_ok(frame["id"].as_str().unwrap(), payload);
    frame
}

fn listing() -> Value {
    json!({
        "agentId": "main",
        "workspace": "/srv/agents/main",
        "files": [
            { "name": "AGENTS.md", "path": "/srv/agents/main/AGENTS.md", "missing": false, "size": 120, "updatedAtMs": 1700000000000u64 },
            { "name": "MEMORY.md", "path": "/srv/agents/main/MEMORY.md", "missing": true }
        ]
    })
}

/// **VALUE**: Verifies listings decode with optional fields and workspace names skip
/// missing files.
///
/// **BUG THIS CATCHES**: Would catch missing files being offered for reading, or
/// `updatedAtMs` failing to decode.
#[tokio::test(start_paused = true)]
async fn given_listing_with_missing_file_when_listed_then_entries_and_existing_names() {
    // GIVEN: A connected session
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let client = AgentFilesClient::new(harness.session.clone());

    // WHEN: Listing all files, then workspace files
    let lister = client.clone();
    let all = tokio::spawn(async move { lister.list_files("main").await });
    let frame = answer(&mut link, listing()).await;
    let all = all.await.unwrap().unwrap();
    let names = tokio::spawn(async move { client.list_workspace_files("main").await });
    answer(&mut link, listing()).await;
    let names = names.await.unwrap().unwrap();

    // THEN: Request params and decoded results are right
    assert_eq!(frame["method"], "agents.files.list");
    assert_eq!(frame["params"], json!({ "agentId": "main" }));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].size, Some(120));
    assert_eq!(all[0].updated_at_ms, Some(1_700_000_000_000));
    assert!(all[1].missing);
    assert_eq!(names, ["AGENTS.md"]);
}

/// **VALUE**: Verifies `read_file` returns content, and the empty string for a missing
/// file.
///
/// **WHY THIS MATTERS**: Editors open missing files as new, empty documents.
///
/// **BUG THIS CATCHES**: Would catch a missing file surfacing as an error.
#[tokio::test(start_paused = true)]
async fn given_existing_and_missing_files_when_read_then_content_or_empty() {
    // GIVEN: A connected session
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let client = AgentFilesClient::new(harness.session.clone());

    // WHEN: Reading an existing file, then a missing one
    let reader = client.clone();
    let existing = tokio::spawn(async move { reader.read_file("main", "AGENTS.md").await });
    let frame = answer(
        &mut link,
        json!({ "agentId": "main", "workspace": "/w", "file": { "name": "AGENTS.md", "path": "/w/AGENTS.md", "missing": false, "content": "# Agents" } }),
    )
    .await;
    let existing = existing.await.unwrap().unwrap();

    let missing = tokio::spawn(async move { client.read_file("main", "MEMORY.md").await });
    answer(
        &mut link,
        json!({ "agentId": "main", "workspace": "/w", "file": { "name": "MEMORY.md", "path": "/w/MEMORY.md", "missing": true } }),
    )
    .await;
    let missing = missing.await.unwrap().unwrap();

    // THEN
    assert_eq!(frame["method"], "agents.files.get");
    assert_eq!(frame["params"], json!({ "agentId": "main", "name": "AGENTS.md" }));
    assert_eq!(existing, "# Agents");
    assert_eq!(missing, "");
}

/// **VALUE**: Verifies `set_file` sends the content and returns the saved entry.
///
/// **BUG THIS CATCHES**: Would catch the content parameter being dropped.
#[tokio::test(start_paused = true)]
async fn given_content_when_set_file_then_sent_and_entry_returned() {
    // GIVEN: A connected session
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let client = AgentFilesClient::new(harness.session.clone());

    // WHEN: Saving a file
    let call = tokio::spawn(async move { client.set_file("main", "NOTES.md", "hello").await });
    let frame = answer(
        &mut link,
        json!({ "ok": true, "agentId": "main", "workspace": "/w", "file": { "name": "NOTES.md", "path": "/w/NOTES.md", "missing": false, "size": 5 } }),
    )
    .await;

    // THEN
    assert_eq!(frame["method"], "agents.files.set");
    assert_eq!(
        frame["params"],
        json!({ "agentId": "main", "name": "NOTES.md", "content": "hello" })
    );
    let entry = call.await.unwrap().unwrap();
    assert_eq!(entry.size, Some(5));
    assert!(!entry.missing);
}

/// **VALUE**: Verifies an unexpected payload shape is a decode error, and a refusal
/// without message uses the per-file default.
///
/// **BUG THIS CATCHES**: Would catch shape mismatches panicking or passing as empty.
#[tokio::test(start_paused = true)]
async fn given_bad_payload_or_refusal_when_get_file_then_decode_or_rejected() {
    // GIVEN: A connected session
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let client = AgentFilesClient::new(harness.session.clone());

    // WHEN: The payload lacks `file`, then the gateway refuses
    let getter = client.clone();
    let bad = tokio::spawn(async move { getter.get_file("main", "X.md").await });
    answer(&mut link, json!({ "unexpected": true })).await;
    let bad = bad.await.unwrap();

    let refused = tokio::spawn(async move { client.get_file("main", "X.md").await });
    let frame = link.recv_frame().await;
    link.respond_error(frame["id"].as_str().unwrap(), "not_found", "");
    let refused = refused.await.unwrap();

    // THEN
    assert!(matches!(bad, Err(ApiError::Decode { .. })));
    match refused {
        Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "Failed to get file: X.md"),
        other => panic!("expected rejection, got {other:?}"),
    }
}
