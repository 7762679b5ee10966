// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end planner tests over the mock harness.

use std::sync::Arc;

use querychain_core::{ErrorKind, QueryChainError, Role, SessionMemory};
use querychain_test_utils::TestHarness;
use querychain_tools::GUARD_MESSAGE;
use serde_json::json;

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

async fn john_doe_harness() -> TestHarness {
    TestHarness::builder()
        .with_document(
            "managers",
            json!({"Name": "John Doe", "Branch": "Computer Science", "Role": "Manager", "Company": "Acme", "CTC": 60}),
        )
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn calculator_turn_uses_classified_expression() {
    let h = harness().await;
    h.script_turn(
        json!({"tool": "calculator", "expression": "0.2 * 500"}),
        "20% of 500 is 100.",
    )
    .await;

    let response = h.ask("s1", "Calculate 20% of 500").await.unwrap();

    assert_eq!(response.tool_used, "calculator");
    assert_eq!(response.tool_result.result, Some(100.0));
    assert_eq!(response.confidence, 0.9);
    assert_eq!(response.answer, "20% of 500 is 100.");

    let turns = h.memory.recent_history("s1", 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "Calculate 20% of 500");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "20% of 500 is 100.");
}

#[tokio::test]
async fn hedging_narration_does_not_lower_confidence() {
    let h = harness().await;
    h.script_turn(
        json!({"tool": "calculator", "expression": "12 * 12"}),
        "I'm not sure, but I think it might be 144. I could be wrong.",
    )
    .await;

    let response = h.ask("s1", "what is 12 times 12").await.unwrap();

    assert!(response.tool_result.success);
    assert_eq!(response.tool_result.result, Some(144.0));
    assert_eq!(response.confidence, 0.9);
}

#[tokio::test]
async fn calculator_falls_back_to_raw_input() {
    let h = harness().await;
    h.script_turn(json!({"tool": "calculator"}), "4").await;

    let response = h.ask("s1", "2+2").await.unwrap();

    assert_eq!(response.tool_result.result, Some(4.0));
}

#[tokio::test]
async fn unknown_tool_is_narrated_and_committed() {
    let h = harness().await;
    h.script_turn(json!({"tool": "web_search"}), "I cannot do that.").await;

    let response = h.ask("s1", "search the web").await.unwrap();

    assert_eq!(response.tool_used, "web_search");
    assert!(!response.tool_result.success);
    assert_eq!(response.tool_result.error.as_deref(), Some("unknown tool"));
    assert_eq!(response.tool_result.error_kind, Some(ErrorKind::ToolUnknown));
    assert_eq!(response.confidence, 0.3);
    assert_eq!(h.memory.recent_history("s1", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_classification_aborts_without_commit() {
    let h = harness().await;
    h.model.add_response("I think you want the calculator").await;

    let err = h.ask("s1", "2+2").await.unwrap_err();

    assert!(matches!(err, QueryChainError::Parse { .. }));
    assert!(h.memory.recent_history("s1", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn narration_failure_aborts_without_commit() {
    let h = harness().await;
    h.model
        .add_response(json!({"tool": "calculator", "expression": "1+1"}).to_string())
        .await;
    h.model.add_failure("narration quota exhausted").await;

    let err = h.ask("s1", "1+1").await.unwrap_err();

    assert!(matches!(err, QueryChainError::Model { .. }));
    assert!(h.memory.recent_history("s1", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn recall_feeds_history_into_prompts() {
    let h = harness().await;
    h.script_turn(json!({"tool": "calculator", "expression": "2+2"}), "Four.")
        .await;
    h.ask("s1", "what is 2+2").await.unwrap();
    h.script_turn(json!({"tool": "calculator", "expression": "4*2"}), "Eight.")
        .await;
    h.ask("s1", "double it").await.unwrap();

    let prompts = h.model.prompts().await;
    assert!(prompts[0].contains("No previous conversation."));
    assert!(prompts[2].contains("user: what is 2+2\nassistant: Four."));
    assert!(prompts[3].contains("user: what is 2+2\nassistant: Four."));
}

#[tokio::test]
async fn recall_window_limits_history() {
    let h = TestHarness::builder()
        .with_config(|c| c.memory.recall_window = 2)
        .build()
        .await
        .unwrap();
    for (i, expr) in ["1+1", "2+2", "3+3"].into_iter().enumerate() {
        h.script_turn(json!({"tool": "calculator", "expression": expr}), &format!("answer {i}"))
            .await;
        h.ask("s1", &format!("question {i}")).await.unwrap();
    }

    let prompts = h.model.prompts().await;
    let last_classification = &prompts[4];
    assert!(last_classification.contains("user: question 1\nassistant: answer 1"));
    assert!(!last_classification.contains("question 0"));
}

#[tokio::test]
async fn classified_limit_is_clamped() {
    let h = john_doe_harness().await;
    h.script_turn(
        json!({"tool": "vector_search", "collection": "managers", "limit": 500}),
        "Here are the closest matches.",
    )
    .await;

    let response = h.ask("s1", "engineering managers").await.unwrap();

    assert!(response.tool_result.success);
    let query = h.store.last_vector_query().unwrap();
    assert_eq!(query.limit, 50);
    assert_eq!(query.num_candidates, 50);
}

#[tokio::test]
async fn update_turn_rejected_by_guard_is_narrated() {
    let h = john_doe_harness().await;
    h.model
        .add_response(json!({"tool": "update_database"}).to_string())
        .await;
    h.model
        .add_response(r#"{"filter": {}, "update": {"$set": {"CTC": 0}}}"#)
        .await;
    h.model.add_response("Please be more specific.").await;

    let response = h.ask("s1", "set everyone's CTC to 0").await.unwrap();

    assert_eq!(response.tool_used, "update_database");
    assert_eq!(response.tool_result.error.as_deref(), Some(GUARD_MESSAGE));
    assert_eq!(response.confidence, 0.3);
    assert_eq!(h.store.documents("managers")[0]["CTC"], 60);
}

#[tokio::test]
async fn direct_update_reports_and_commits() {
    let h = john_doe_harness().await;
    h.model
        .add_response(
            r#"{"filter": {"Name": {"$regex": "John Doe", "$options": "i"}}, "update": {"$set": {"CTC": 70}}}"#,
        )
        .await;

    let summary = h
        .runtime
        .run_update("Change the CTC for John Doe to 70", None, "s1", "u1")
        .await
        .unwrap();

    assert_eq!(summary.message, "Successfully updated 1 record(s).");
    assert_eq!(summary.modified_count, 1);
    assert_eq!(summary.matched_count, 1);
    assert_eq!(summary.tool_result.reembedded, Some(1));

    let turns = h.memory.recent_history("s1", 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].content, "Successfully updated 1 record(s).");
}

#[tokio::test]
async fn direct_update_without_match() {
    let h = john_doe_harness().await;
    h.model
        .add_response(r#"{"filter": {"Name": "Jane Roe"}, "update": {"$set": {"CTC": 70}}}"#)
        .await;

    let summary = h
        .runtime
        .run_update("Change the CTC for Jane Roe to 70", Some("managers"), "s1", "u1")
        .await
        .unwrap();

    assert_eq!(summary.message, "No matching records found.");
    assert_eq!(summary.modified_count, 0);
}

#[tokio::test]
async fn direct_update_unchanged_match() {
    let h = john_doe_harness().await;
    h.model
        .add_response(r#"{"filter": {"Name": "John Doe"}, "update": {"$set": {"CTC": 60}}}"#)
        .await;

    let summary = h
        .runtime
        .run_update("Set John Doe's CTC to 60", None, "s1", "u1")
        .await
        .unwrap();

    assert_eq!(
        summary.message,
        "Found 1 matching record(s) but no changes were needed."
    );
}

#[tokio::test]
async fn direct_update_guard_commits_nothing() {
    let h = john_doe_harness().await;
    h.model.add_response("not json at all").await;

    let err = h
        .runtime
        .run_update("update someone", None, "s1", "u1")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryChainError::GuardRejected { .. }));
    assert_eq!(err.to_string(), GUARD_MESSAGE);
    assert!(h.memory.recent_history("s1", 10).await.unwrap().is_empty());
    assert_eq!(h.store.call_count(), 0);
}

#[tokio::test]
async fn clear_session_is_scoped_and_idempotent() {
    let h = harness().await;
    for session in ["a", "b"] {
        h.script_turn(json!({"tool": "calculator", "expression": "1"}), "one")
            .await;
        h.ask(session, "1").await.unwrap();
    }

    assert_eq!(h.runtime.clear_session("a").await.unwrap(), 2);
    assert_eq!(h.runtime.clear_session("a").await.unwrap(), 0);
    assert!(h.runtime.history("a", None).await.unwrap().is_empty());
    assert_eq!(h.runtime.history("b", None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn history_uses_page_size_by_default() {
    let h = TestHarness::builder()
        .with_config(|c| c.memory.history_page_size = 3)
        .build()
        .await
        .unwrap();
    for i in 0..3 {
        h.script_turn(json!({"tool": "calculator", "expression": "1"}), &format!("a{i}"))
            .await;
        h.ask("s1", &format!("q{i}")).await.unwrap();
    }

    let page = h.runtime.history("s1", None).await.unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page[2].content, "a2");
    assert_eq!(h.runtime.history("s1", Some(6)).await.unwrap().len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_session_turns_do_not_interleave() {
    let h = Arc::new(harness().await);
    for _ in 0..2 {
        h.script_turn(json!({"tool": "calculator", "expression": "1+1"}), "two")
            .await;
    }

    let mut tasks = Vec::new();
    for i in 0..2 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            h.ask("shared", &format!("q{i}")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let turns = h.memory.recent_history("shared", 10).await.unwrap();
    let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}
