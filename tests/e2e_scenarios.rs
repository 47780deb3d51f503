//! End-to-end scenario tests (spec.md §8) against the public `sentryai-core`
//! API, using in-memory fakes for the LLM and the tool sandbox — no network,
//! no real containers (spec.md §10.4).

mod common;

use std::sync::Arc;
use std::time::Duration;

use sentryai_core::types::{BudgetPolicy, LogPayload, MissionStatus, ScopePattern, ScopePolicy, StepId, TerminalCause};

use common::{complete_json, plan_json, test_runtime, tool_call_json, wait_for_status, wait_for_terminal, FakeSandbox, ScriptedInference};

fn scope(patterns: &[&str]) -> ScopePolicy {
    ScopePolicy::new(patterns.iter().map(|p| ScopePattern::Hostname(p.to_string())).collect())
}

/// Scenario 1: in-scope happy path. A single admitted step dispatches and
/// the mission completes.
#[tokio::test]
async fn in_scope_happy_path_completes() {
    let inference = ScriptedInference::new([
        plan_json("enumerate subdomains", &[("step-1", "subfinder", "example.com")]),
        complete_json("nothing left to do"),
    ]);
    let sandbox = Arc::new(FakeSandbox::new([("subfinder", "www.example.com\napi.example.com\n")]));
    let runtime = test_runtime(inference, sandbox, 64);

    let mission_id = runtime.start_mission(
        "subdomain enumeration on example.com".to_string(),
        scope(&["example.com", "*.example.com"]),
        BudgetPolicy { max_steps: 3, max_cost_cents: 10_000, max_wall_clock: Duration::from_secs(600) },
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime.approve_plan(mission_id, vec![StepId("step-1".to_string())]).await.unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::Completed);

    let log = runtime.log(mission_id, 0).await.unwrap();
    assert!(matches!(log[0].payload, LogPayload::Status(MissionStatus::Planning)));
    assert!(log.iter().any(|r| matches!(&r.payload, LogPayload::Plan { step_count, .. } if *step_count == 1)));

    let admission_idx = log
        .iter()
        .position(|r| matches!(&r.payload, LogPayload::Control(c) if c.contains("admission") && c.contains("Allow")))
        .expect("admission-allow record present");
    let dispatch_idx = log
        .iter()
        .position(|r| matches!(&r.payload, LogPayload::ToolDispatch { .. }))
        .expect("tool-dispatch record present");
    assert!(admission_idx < dispatch_idx, "admission must precede dispatch");

    let output = log
        .iter()
        .find_map(|r| match &r.payload {
            LogPayload::ToolOutput { summary, .. } => Some(summary.clone()),
            _ => None,
        })
        .expect("tool-output record present");
    assert!(output.contains("hosts=2"));

    assert!(matches!(log.last().unwrap().payload, LogPayload::Status(MissionStatus::Completed)));
}

/// Scenario 2: a plan step targeting a host outside the declared scope is
/// denied and skipped; the mission still completes.
#[tokio::test]
async fn out_of_scope_step_is_denied_and_skipped() {
    let inference = ScriptedInference::new([
        plan_json(
            "enumerate then probe",
            &[("step-1", "subfinder", "example.com"), ("step-2", "naabu", "scanme.other.net")],
        ),
        complete_json("done"),
    ]);
    let sandbox = Arc::new(FakeSandbox::new([("subfinder", "www.example.com\n"), ("naabu", "scanme.other.net:80\n")]));
    let runtime = test_runtime(inference, sandbox.clone(), 64);

    let mission_id = runtime.start_mission(
        "subdomain enumeration on example.com".to_string(),
        scope(&["example.com", "*.example.com"]),
        BudgetPolicy::default(),
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime
        .approve_plan(mission_id, vec![StepId("step-1".to_string()), StepId("step-2".to_string())])
        .await
        .unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::Completed);

    // Only the in-scope step actually dispatched to the sandbox.
    assert_eq!(sandbox.dispatch_count.load(std::sync::atomic::Ordering::SeqCst), 1);

    let log = runtime.log(mission_id, 0).await.unwrap();
    assert!(log.iter().any(|r| matches!(&r.payload, LogPayload::Error { code, .. } if code == "scope-violation")));
}

/// Scenario 3: a step budget smaller than the plan's step count caps
/// dispatches exactly at the budget and terminates budget-exhausted.
#[tokio::test]
async fn budget_exhaustion_caps_dispatch_count() {
    let steps: Vec<(&str, &str, &str)> = vec![
        ("s1", "subfinder", "a.example.com"),
        ("s2", "subfinder", "b.example.com"),
        ("s3", "subfinder", "c.example.com"),
        ("s4", "subfinder", "d.example.com"),
        ("s5", "subfinder", "e.example.com"),
    ];
    let inference = ScriptedInference::new([plan_json("enumerate", &steps)]);
    let sandbox = Arc::new(FakeSandbox::new([("subfinder", "found.example.com\n")]));
    let runtime = test_runtime(inference, sandbox.clone(), 64);

    let mission_id = runtime.start_mission(
        "enumerate many subdomains".to_string(),
        scope(&["*.example.com"]),
        BudgetPolicy { max_steps: 2, max_cost_cents: 10_000, max_wall_clock: Duration::from_secs(600) },
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    let all_steps = steps.iter().map(|(id, ..)| StepId(id.to_string())).collect();
    runtime.approve_plan(mission_id, all_steps).await.unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::BudgetExhausted { cause: TerminalCause::Steps });
    assert_eq!(sandbox.dispatch_count.load(std::sync::atomic::Ordering::SeqCst), 2);
}

/// Scenario 4: the cognitive engine proposes the same tool call three times
/// in a row; the third is caught by the loop detector and fails the mission.
#[tokio::test]
async fn repeated_identical_action_fails_as_loop() {
    let repeat = tool_call_json("subfinder", "domain", "example.com", "trying again");
    let inference = ScriptedInference::new([
        plan_json("no steps, think instead", &[]),
        repeat.clone(),
        repeat.clone(),
        repeat,
    ]);
    let sandbox = Arc::new(FakeSandbox::new([("subfinder", "a.example.com\n")]));
    let runtime = test_runtime(inference, sandbox.clone(), 64);

    let mission_id = runtime.start_mission(
        "enumerate example.com".to_string(),
        scope(&["*.example.com", "example.com"]),
        BudgetPolicy::default(),
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime.approve_plan(mission_id, vec![]).await.unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::Failed { cause: TerminalCause::Loop });

    // First two identical proposals are still novel by the kernel's
    // "3 identical occurrences" threshold (spec.md §4.1) and dispatch;
    // the loop verdict on the third fails the mission before a third dispatch.
    assert_eq!(sandbox.dispatch_count.load(std::sync::atomic::Ordering::SeqCst), 2);

    let log = runtime.log(mission_id, 0).await.unwrap();
    assert!(log.iter().any(|r| matches!(&r.payload, LogPayload::Control(c) if c.contains("loop detected"))));
}

/// Scenario 5: pause suspends the mission with no further log growth;
/// resume lets it complete normally.
#[tokio::test]
async fn pause_then_resume_completes_normally() {
    let inference = ScriptedInference::new([
        plan_json("enumerate", &[("step-1", "subfinder", "a.example.com"), ("step-2", "subfinder", "b.example.com")]),
        complete_json("done"),
    ]);
    let sandbox = Arc::new(
        FakeSandbox::new([("subfinder", "found.example.com\n")]).with_delay(Duration::from_millis(50)),
    );
    let runtime = test_runtime(inference, sandbox, 64);

    let mission_id = runtime.start_mission(
        "subdomain enumeration on example.com".to_string(),
        scope(&["example.com", "*.example.com"]),
        BudgetPolicy::default(),
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime
        .approve_plan(mission_id, vec![StepId("step-1".to_string()), StepId("step-2".to_string())])
        .await
        .unwrap();

    // Wait for the first tool-output record (step 1 done, step 2 not yet
    // dispatched), then pause — the signal is drained before step 2 starts.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let log = runtime.log(mission_id, 0).await.unwrap();
        if log.iter().any(|r| matches!(&r.payload, LogPayload::ToolOutput { .. })) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for first tool-output");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    runtime.pause(mission_id).await.unwrap();
    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::Paused), Duration::from_secs(2)).await;

    let log_at_pause = runtime.log(mission_id, 0).await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let log_after_wait = runtime.log(mission_id, 0).await.unwrap().len();
    assert_eq!(log_at_pause, log_after_wait, "no new log records while paused");

    runtime.resume(mission_id).await.unwrap();
    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::Completed);
}

/// Scenario 6: a subscriber that never reads overflows and is closed
/// without affecting the mission or other subscribers.
#[tokio::test]
async fn slow_subscriber_overflows_without_affecting_mission() {
    let steps: Vec<(&str, &str, &str)> = (0..6)
        .map(|i| (Box::leak(format!("s{i}").into_boxed_str()) as &str, "subfinder", Box::leak(format!("{i}.example.com").into_boxed_str()) as &str))
        .collect();
    let inference = ScriptedInference::new([plan_json("enumerate", &steps), complete_json("done")]);
    let sandbox = Arc::new(FakeSandbox::new([("subfinder", "found.example.com\n")]));
    let runtime = test_runtime(inference, sandbox, 4);

    let mission_id = runtime.start_mission(
        "enumerate subdomains".to_string(),
        scope(&["*.example.com"]),
        BudgetPolicy { max_steps: 20, max_cost_cents: 10_000, max_wall_clock: Duration::from_secs(600) },
    );

    let mut slow = runtime.subscribe(mission_id);
    let mut fast = runtime.subscribe(mission_id);

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    let all_steps = steps.iter().map(|(id, ..)| StepId(id.to_string())).collect();
    runtime.approve_plan(mission_id, all_steps).await.unwrap();

    // `fast` keeps draining; `slow` never reads until the mission is done.
    let fast_count = tokio::spawn(async move {
        let mut n = 0usize;
        while let Some(frame) = fast.receiver.recv().await {
            if matches!(frame, sentryai_core::events::EventFrame::Log(_)) {
                n += 1;
            }
        }
        n
    });

    wait_for_terminal(&runtime, mission_id, Duration::from_secs(3)).await;
    assert!(fast_count.await.unwrap() > 0, "fast subscriber should have kept receiving frames");

    let mut saw_overflow_close = false;
    while let Ok(frame) = slow.receiver.try_recv() {
        if matches!(frame, sentryai_core::events::EventFrame::Closed(sentryai_core::events::CloseCause::Overflow)) {
            saw_overflow_close = true;
        }
    }
    assert!(saw_overflow_close, "slow subscriber should have been closed with overflow");

    // Mission log is unaffected and fully retrievable regardless of subscriber fate.
    let log = runtime.log(mission_id, 0).await.unwrap();
    assert!(log.iter().any(|r| matches!(&r.payload, LogPayload::Status(MissionStatus::Completed))));
}

/// A tool yielding more than one finding must have every finding reachable
/// via the mission log, each at its own index (spec.md §8 universal
/// invariant: log findings are a superset of sink-persisted findings).
#[tokio::test]
async fn multiple_findings_from_one_step_are_all_logged() {
    let inference = ScriptedInference::new([
        plan_json("scan for vulnerabilities", &[("step-1", "nuclei", "example.com")]),
        complete_json("done"),
    ]);
    let nuclei_output = "high|exposed-panel|https://example.com/admin|login form present\n\
                          medium|missing-header|https://example.com/|no CSP header\n\
                          low|verbose-error|https://example.com/debug|stack trace leaked\n";
    let sandbox = Arc::new(FakeSandbox::new([("nuclei", nuclei_output)]));
    let runtime = test_runtime(inference, sandbox, 64);

    let mission_id = runtime.start_mission(
        "vulnerability scan on example.com".to_string(),
        scope(&["example.com", "*.example.com"]),
        BudgetPolicy::default(),
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime.approve_plan(mission_id, vec![StepId("step-1".to_string())]).await.unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::Completed);

    let log = runtime.log(mission_id, 0).await.unwrap();
    let finding_indices: Vec<u64> = log
        .iter()
        .filter(|r| matches!(&r.payload, LogPayload::Finding(_)))
        .map(|r| r.index)
        .collect();
    assert_eq!(finding_indices.len(), 3, "all three findings must reach the log");
    let unique: std::collections::HashSet<_> = finding_indices.iter().collect();
    assert_eq!(unique.len(), 3, "each finding must have a distinct log index");
}

/// Scenario 2b: the mission's very first admitted target failing admission
/// is fatal (spec.md §4.4: `running -scope-fatal-> scope-violation`, "only
/// if initial target fails admission"), unlike a later denial.
#[tokio::test]
async fn initial_target_out_of_scope_is_fatal() {
    let inference = ScriptedInference::new([plan_json("probe out of scope host", &[("step-1", "naabu", "scanme.other.net")])]);
    let sandbox = Arc::new(FakeSandbox::new([("naabu", "scanme.other.net:80\n")]));
    let runtime = test_runtime(inference, sandbox.clone(), 64);

    let mission_id = runtime.start_mission(
        "port scan example.com".to_string(),
        scope(&["example.com", "*.example.com"]),
        BudgetPolicy::default(),
    );

    wait_for_status(&runtime, mission_id, |s| matches!(s, MissionStatus::AwaitingApproval), Duration::from_secs(2)).await;
    runtime.approve_plan(mission_id, vec![StepId("step-1".to_string())]).await.unwrap();

    let snapshot = wait_for_terminal(&runtime, mission_id, Duration::from_secs(2)).await;
    assert_eq!(snapshot.status, MissionStatus::ScopeViolation);
    assert_eq!(sandbox.dispatch_count.load(std::sync::atomic::Ordering::SeqCst), 0);
}
