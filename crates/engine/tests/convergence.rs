//! Multi-pass reconciliation against the in-memory backend.
//!
//! The backend's `items()` is the observed snapshot for the next pass, so
//! these tests exercise the full loop an outer controller runs.

use converge_core::{CorrelationKey, PortError};
use converge_engine::{
    correlate, reconcile, sync, sync_with, Phase, ReconcileConfig, ReconcileError, SyncError,
};
use converge_kinds::{
    ConditionObservation, ConditionSpec, GateCondition, MemoryBackend, PortCall, ProfileRule,
    RuleObservation, RuleSpec,
};

async fn pass(
    backend: &MemoryBackend<GateCondition>,
    desired: &mut [ConditionSpec],
) -> converge_engine::ReconcileOutcome<converge_kinds::ConditionKey> {
    let observed = backend.items();
    reconcile::<GateCondition, _>(
        "gate-1",
        desired,
        &observed,
        backend,
        &ReconcileConfig::default(),
    )
    .await
    .expect("pass should succeed")
}

#[tokio::test]
async fn second_pass_is_a_no_op() {
    let backend = MemoryBackend::<GateCondition>::with_items(vec![
        ConditionObservation::new("c1", "coverage", "LT", "70"),
        ConditionObservation::new("c2", "code_smells", "GT", "100"),
    ]);
    let mut desired = vec![
        ConditionSpec::new("coverage", "80").with_op("LT"),
        ConditionSpec::new("bugs", "0").with_op("GT"),
    ];

    let first = pass(&backend, &mut desired).await;
    let sync = first.sync.expect("first pass has work");
    assert_eq!(sync.deleted, vec!["c2".to_string()]);
    assert_eq!(sync.updated, vec!["c1".to_string()]);
    assert_eq!(sync.created.len(), 1);
    assert!(first.desired_changed);
    assert_eq!(desired[0].id.as_deref(), Some("c1"));
    assert_eq!(desired[1].id.as_deref(), Some("cond-1"));

    let calls_after_first = backend.calls().len();
    let second = pass(&backend, &mut desired).await;
    assert!(second.report.resource_up_to_date);
    assert!(second.sync.is_none());
    assert!(!second.desired_changed);
    assert_eq!(backend.calls().len(), calls_after_first);
}

#[tokio::test]
async fn two_of_five_failures_are_reported_and_the_rest_applied() {
    let observed = vec![
        ConditionObservation::new("d1", "code_smells", "GT", "100"),
        ConditionObservation::new("d2", "vulnerabilities", "GT", "0"),
        ConditionObservation::new("u1", "coverage", "LT", "70"),
        ConditionObservation::new("u2", "duplicated_lines", "GT", "5"),
    ];
    let backend = MemoryBackend::<GateCondition>::with_items(observed.clone());
    backend.fail_id("d1", PortError::Backend("503 Service Unavailable".to_string()));
    backend.fail_id(
        "u2",
        PortError::Rejected {
            message: "threshold must be a number".to_string(),
        },
    );

    let desired = vec![
        ConditionSpec::new("coverage", "80").with_id("u1"),
        ConditionSpec::new("duplicated_lines", "three").with_id("u2"),
        ConditionSpec::new("bugs", "0").with_op("GT"),
    ];
    let mut map = correlate::<GateCondition>(&desired, &observed);

    let failures = match sync("gate-1", &mut map, &backend).await {
        Err(SyncError::Partial(failures)) => failures,
        other => panic!("expected partial failure, got {:?}", other),
    };

    assert_eq!(backend.calls().len(), 5, "every item must be attempted");
    assert_eq!(failures.attempted, 5);
    assert_eq!(failures.failures.len(), 2);
    assert_eq!(failures.failures[0].phase, Phase::Delete);
    assert_eq!(failures.failures[0].key, CorrelationKey::Stable("d1".to_string()));
    assert_eq!(failures.failures[1].phase, Phase::Update);
    assert_eq!(failures.failures[1].key, CorrelationKey::Stable("u2".to_string()));

    let message = failures.to_string();
    assert!(message.contains("503 Service Unavailable"), "{}", message);
    assert!(message.contains("threshold must be a number"), "{}", message);

    // The three successes are reflected in the map.
    assert_eq!(failures.completed.deleted, vec!["d2".to_string()]);
    assert_eq!(failures.completed.updated, vec!["u1".to_string()]);
    assert_eq!(failures.completed.created.len(), 1);
    assert!(map.get_stable("d2").is_none());
    assert!(map.get_stable("u1").unwrap().is_up_to_date());
    let (_, new_id) = failures.completed.created_ids().next().unwrap();
    assert!(map.get_stable(new_id).unwrap().is_up_to_date());

    // The two failures are still outstanding for the next pass.
    assert_eq!(map.to_delete(), vec![&CorrelationKey::Stable("d1".to_string())]);
    assert_eq!(map.to_update(), vec![&CorrelationKey::Stable("u2".to_string())]);
}

#[tokio::test]
async fn partial_failure_still_writes_back_created_ids() {
    let backend = MemoryBackend::<GateCondition>::with_items(vec![ConditionObservation::new(
        "c1", "coverage", "LT", "70",
    )]);
    backend.fail_id("c1", PortError::Backend("timeout".to_string()));
    let mut desired = vec![
        ConditionSpec::new("coverage", "80").with_id("c1"),
        ConditionSpec::new("bugs", "0").with_op("GT"),
    ];
    let observed = backend.items();

    let err = reconcile::<GateCondition, _>(
        "gate-1",
        &mut desired,
        &observed,
        &backend,
        &ReconcileConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReconcileError::Sync(SyncError::Partial(_))));
    assert_eq!(desired[1].id.as_deref(), Some("cond-1"));
}

#[tokio::test]
async fn missing_parent_attempts_nothing() {
    let backend = MemoryBackend::<GateCondition>::new();
    let mut desired = vec![ConditionSpec::new("coverage", "80")];

    let err = reconcile::<GateCondition, _>(
        "",
        &mut desired,
        &[],
        &backend,
        &ReconcileConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Sync(SyncError::MissingParent { .. })
    ));
    assert!(err.to_string().contains("parent identifier is empty"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn delete_frees_the_metric_before_create() {
    // Same metric, different operator: the old condition must go first or
    // the backend refuses the new one.
    let backend = MemoryBackend::<GateCondition>::with_items(vec![ConditionObservation::new(
        "c1", "coverage", "GT", "10",
    )]);
    let mut desired = vec![ConditionSpec::new("coverage", "80").with_op("LT")];

    let outcome = pass(&backend, &mut desired).await;
    let sync = outcome.sync.unwrap();
    assert_eq!(sync.deleted, vec!["c1".to_string()]);
    assert_eq!(sync.created.len(), 1);
    assert!(matches!(backend.calls()[0], PortCall::Delete { .. }));
    assert_eq!(backend.items().len(), 1);
    assert_eq!(backend.items()[0].op, "LT");
}

#[tokio::test]
async fn prune_off_keeps_unmanaged_items() {
    let backend = MemoryBackend::<GateCondition>::with_items(vec![ConditionObservation::new(
        "manual", "bugs", "GT", "0",
    )]);
    let mut desired = vec![ConditionSpec::new("coverage", "80").with_op("LT")];
    let observed = backend.items();
    let config = ReconcileConfig {
        prune: false,
        ..ReconcileConfig::default()
    };

    let outcome = reconcile::<GateCondition, _>(
        "gate-1",
        &mut desired,
        &observed,
        &backend,
        &config,
    )
    .await
    .unwrap();

    let sync = outcome.sync.unwrap();
    assert_eq!(sync.skipped, vec!["manual".to_string()]);
    assert_eq!(sync.created.len(), 1);
    assert_eq!(backend.items().len(), 2);
}

#[tokio::test]
async fn rule_activations_converge() {
    let backend = MemoryBackend::<ProfileRule>::with_items(vec![
        RuleObservation::new("java:S1144", "MAJOR"),
        RuleObservation::new("java:S100", "MINOR"),
    ]);
    let mut desired = vec![
        RuleSpec::new("java:S1144").with_severity("CRITICAL"),
        RuleSpec::new("java:S107").with_param("max", "9"),
    ];

    let observed = backend.items();
    let outcome = reconcile::<ProfileRule, _>(
        "profile-1",
        &mut desired,
        &observed,
        &backend,
        &ReconcileConfig::default(),
    )
    .await
    .unwrap();

    let sync = outcome.sync.unwrap();
    assert_eq!(sync.deleted, vec!["java:S100".to_string()]);
    assert_eq!(sync.updated, vec!["java:S1144".to_string()]);
    assert_eq!(sync.created.len(), 1);
    assert_eq!(sync.created[0].id, "java:S107");

    let observed = backend.items();
    let second = reconcile::<ProfileRule, _>(
        "profile-1",
        &mut desired,
        &observed,
        &backend,
        &ReconcileConfig::default(),
    )
    .await
    .unwrap();
    assert!(second.report.resource_up_to_date);
    assert!(second.sync.is_none());
}

#[tokio::test]
async fn skipped_orphan_survives_creation_next_to_it() {
    let backend = MemoryBackend::<GateCondition>::with_items(vec![ConditionObservation::new(
        "cond-1", "bugs", "GT", "0",
    )]);
    let observed = backend.items();
    let desired = vec![ConditionSpec::new("coverage", "80").with_op("LT")];
    let mut map = correlate::<GateCondition>(&desired, &observed);

    let summary = sync_with("gate-1", &mut map, &backend, false).await.unwrap();

    assert_eq!(summary.skipped, vec!["cond-1".to_string()]);
    assert_eq!(summary.created[0].id, "cond-2");
    assert_eq!(map.len(), 2);
    assert_eq!(map.get_stable("cond-1").unwrap().observed().unwrap().metric, "bugs");
    assert!(map.get_stable("cond-2").unwrap().is_up_to_date());

    let remote: Vec<_> = backend.items().into_iter().map(|o| (o.id, o.metric)).collect();
    assert_eq!(
        remote,
        vec![
            ("cond-1".to_string(), "bugs".to_string()),
            ("cond-2".to_string(), "coverage".to_string()),
        ]
    );
}
