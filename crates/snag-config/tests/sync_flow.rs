//! End-to-end edit sessions against the in-memory plugin backend.

use serde_json::json;
use snag_config::{
    AdminClient, AdminSession, ApiPaths, CHANNEL_RULES_KEY, CatalogKind, InMemoryBackend,
    MappingStore, Method, SAVE_FAILED_MESSAGE, SyncError, SyncState, toggle_set_member,
};
use snag_proto::{
    ChannelEntity, ChannelId, ChannelRule, EventAttributes, EventKind, Filter, Organization,
    PlatformUserId, ProjectChannelMappings, ProjectEntity, ProjectId, RuleField, Severity,
    UserField, UserMapping,
};
use test_case::test_case;

fn backend() -> InMemoryBackend {
    InMemoryBackend::default()
        .with_api_token("tok")
        .with_organizations(vec![Organization {
            id: "o1".into(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
        }])
        .with_projects(vec![ProjectEntity {
            id: ProjectId::new("p1"),
            name: "Checkout".to_string(),
        }])
        .with_channels(vec![ChannelEntity {
            id: ChannelId::new("c1"),
            display_name: "Alerts".to_string(),
            name: "alerts".to_string(),
        }])
}

fn session(backend: &InMemoryBackend) -> AdminSession<InMemoryBackend> {
    AdminSession::new(AdminClient::new(backend.clone(), ApiPaths::default()))
}

fn last_post_body(backend: &InMemoryBackend) -> serde_json::Value {
    backend
        .requests()
        .into_iter()
        .rev()
        .find(|r| r.method == Method::Post)
        .and_then(|r| r.body)
        .unwrap()
}

#[tokio::test]
async fn bind_project_and_save_payload() {
    let backend = backend();
    let session = session(&backend);

    session.hydrate(&CatalogKind::RULES_VIEW).await.unwrap();
    assert_eq!(session.catalogs().projects.items[0].name, "Checkout");
    assert!(session.snapshot().channel_mappings.is_empty());

    session.edit(|s| s.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("c1")));
    session.save_channel_rules().await.unwrap();

    assert_eq!(
        last_post_body(&backend),
        json!({"mappings": {"p1": [{"channel_id": "c1"}]}})
    );
    assert_eq!(
        serde_json::to_string(&session.snapshot().channel_mappings).unwrap(),
        r#"{"p1":[{"channel_id":"c1"}]}"#
    );
}

#[tokio::test]
async fn failed_save_reports_server_error_and_keeps_state() {
    let backend = backend();
    let session = session(&backend);
    session.edit(|s| s.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("c1")));
    let before = session.snapshot();

    backend.fail_next(500, json!({"error": "db down"}));
    let err = session.save_channel_rules().await.unwrap_err();

    assert!(matches!(err, SyncError::Server { status: 500, .. }));
    let status = session.status();
    assert_eq!(status.error.as_deref(), Some("db down"));
    assert_eq!(status.state, SyncState::Idle);
    assert_eq!(session.snapshot(), before);
    assert!(backend.stored_channel_mappings().is_none());
}

#[test_case(199 ; "informational")]
#[test_case(300 ; "redirect")]
#[test_case(404 ; "not found")]
#[test_case(409 ; "conflict")]
#[test_case(500 ; "internal error")]
#[test_case(503 ; "unavailable")]
#[tokio::test]
async fn non_success_status_leaves_state_untouched(status: u16) {
    let backend = backend();
    let session = session(&backend);
    session.edit(|s| s.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("c1")));
    let before = session.snapshot();

    backend.fail_next(status, json!({"error": "rejected"}));
    let err = session.save_channel_rules().await.unwrap_err();

    assert!(matches!(err, SyncError::Server { status: s, .. } if s == status));
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.status().state, SyncState::Idle);
    assert_eq!(session.status().error.as_deref(), Some("rejected"));
    assert!(backend.stored_channel_mappings().is_none());
}

#[tokio::test]
async fn transport_failure_surfaces_its_own_message() {
    let backend = backend();
    let session = session(&backend);

    backend.fail_next_transport("connection refused");
    assert!(session.save_user_mappings().await.unwrap_err().is_transport());
    assert_eq!(session.status().error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn failed_save_without_body_uses_default() {
    let backend = backend();
    let session = session(&backend);

    backend.fail_next(500, json!(null));
    assert!(session.save_channel_rules().await.is_err());
    assert_eq!(session.status().error.as_deref(), Some(SAVE_FAILED_MESSAGE));
}

#[tokio::test]
async fn blank_rows_and_rules_never_submitted() {
    let backend = backend();
    let session = session(&backend);

    session.edit(|s| {
        s.add_user_mapping();
        let key = s.add_user_mapping();
        s.update_user_mapping_by_key(key, UserField::PlatformUser, "u1");
        s.update_user_mapping_by_key(key, UserField::ProviderEmail, "ann@example.com");

        s.add_rule(ProjectId::new("p1"), ChannelId::new(""));
        s.add_rule(ProjectId::new("p2"), ChannelId::new("c2"));
    });

    let users = session.save_user_mappings().await.unwrap();
    assert_eq!(users.dropped, 1);
    assert_eq!(
        last_post_body(&backend),
        json!({"mappings": [{"mm_user_id": "u1", "bugsnag_email": "ann@example.com"}]})
    );

    let rules = session.save_channel_rules().await.unwrap();
    assert_eq!(rules.dropped, 1);
    assert_eq!(rules.pruned, 1);
    assert_eq!(
        last_post_body(&backend),
        json!({"mappings": {"p2": [{"channel_id": "c2"}]}})
    );
    assert_eq!(session.snapshot().user_mappings.len(), 1);
}

#[tokio::test]
async fn filters_round_trip_through_the_server() {
    let backend = backend();
    let writer = session(&backend);

    writer.edit(|s| {
        let project = ProjectId::new("p1");
        s.set_channel_for_project(project.clone(), ChannelId::new("c1"));
        let severities = toggle_set_member(&Filter::Unfiltered, Severity::Warning, true);
        let severities = toggle_set_member(&severities, Severity::Error, true);
        s.update_rule_field(&project, 0, RuleField::Severities(severities));
        s.update_rule_field(
            &project,
            0,
            RuleField::Environments(snag_proto::parse_environments("production")),
        );
    });
    writer.save_channel_rules().await.unwrap();

    let reader = session(&backend);
    reader.load().await.unwrap();
    let mappings = reader.snapshot().channel_mappings;
    let rule = &mappings.rules(&ProjectId::new("p1"))[0];
    assert_eq!(rule.severities.values(), &[Severity::Error, Severity::Warning]);

    let event = EventAttributes {
        environment: "production".to_string(),
        severity: "warning".to_string(),
        event: "exception".to_string(),
    };
    assert_eq!(
        mappings.routes_for(&ProjectId::new("p1"), &event),
        vec![ChannelId::new("c1")]
    );
}

#[tokio::test]
async fn load_is_all_or_nothing() {
    let backend = backend();
    let mut stored = ProjectChannelMappings::new();
    stored.set(ProjectId::new("p1"), vec![ChannelRule::new(ChannelId::new("c1"))]);
    backend.seed_channel_mappings(&stored);
    backend.seed_user_mappings(&[UserMapping::new(PlatformUserId::new("u1"))]);

    let session = session(&backend);
    session.load().await.unwrap();
    let loaded = session.snapshot();
    assert_eq!(loaded.user_mappings.len(), 1);

    backend.seed_channel_mappings(&ProjectChannelMappings::new());
    backend.fail_path(&ApiPaths::default().user_mappings(), 500, json!({"error": "kv offline"}));

    assert!(session.load().await.is_err());
    assert_eq!(session.snapshot(), loaded);
    assert_eq!(session.status().error.as_deref(), Some("kv offline"));
}

#[tokio::test]
async fn load_accepts_stored_members_in_any_case() {
    let backend = backend();
    backend.seed_raw(
        CHANNEL_RULES_KEY,
        r#"{"p1":[{"channel_id":"c1","severities":["Error"],"events":["FirstException"]}]}"#,
    );
    backend.seed_user_mappings(&[UserMapping::new(PlatformUserId::new("u1"))]);

    let session = session(&backend);
    session.load().await.unwrap();

    let loaded = session.snapshot();
    let rule = &loaded.channel_mappings.rules(&ProjectId::new("p1"))[0];
    assert_eq!(rule.severities.values(), &[Severity::Error]);
    assert_eq!(rule.events.values(), &[EventKind::FirstException]);
    assert_eq!(loaded.user_mappings.len(), 1);
    assert!(session.status().error.is_none());
}

#[tokio::test]
async fn load_accepts_null_rule_list() {
    let backend = backend();
    backend.seed_raw(CHANNEL_RULES_KEY, r#"{"p1":null}"#);
    backend.seed_user_mappings(&[UserMapping::new(PlatformUserId::new("u1"))]);

    let session = session(&backend);
    session.load().await.unwrap();

    let loaded = session.snapshot();
    assert!(loaded.channel_mappings.rules(&ProjectId::new("p1")).is_empty());
    assert_eq!(loaded.user_mappings.len(), 1);
}

#[tokio::test]
async fn catalog_failure_does_not_block_mappings() {
    let backend = backend();
    backend.fail_path(&ApiPaths::default().projects(), 502, json!({"error": "bugsnag down"}));
    backend.seed_user_mappings(&[UserMapping::new(PlatformUserId::new("u1"))]);

    let session = session(&backend);
    session.hydrate(&CatalogKind::ALL).await.unwrap();

    let catalogs = session.catalogs();
    assert!(catalogs.projects.is_empty());
    assert!(catalogs.projects.error.is_some());
    assert_eq!(catalogs.channels.len(), 1);
    assert_eq!(session.snapshot().user_mappings.len(), 1);
}

#[tokio::test]
async fn second_save_rejected_while_first_in_flight() {
    let backend = backend();
    let session = session(&backend);
    session.edit(|s| s.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("c1")));

    let gate = backend.hold();
    let first = session.save_channel_rules();
    let second = async {
        let result = session.save_user_mappings().await;
        assert!(session.is_saving());
        gate.release();
        result
    };
    let (first, second) = futures::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(SyncError::SaveInFlight)));
    assert!(!session.is_saving());
    assert_eq!(
        backend.request_count(Method::Post, &ApiPaths::default().user_mappings()),
        0
    );
}

#[tokio::test]
async fn concurrent_sessions_last_write_wins() {
    let backend = backend();
    let alice = session(&backend);
    let bob = session(&backend);
    alice.load().await.unwrap();
    bob.load().await.unwrap();

    alice.edit(|s| s.set_channel_for_project(ProjectId::new("p1"), ChannelId::new("a")));
    bob.edit(|s| s.set_channel_for_project(ProjectId::new("p2"), ChannelId::new("b")));
    alice.save_channel_rules().await.unwrap();
    bob.save_channel_rules().await.unwrap();

    let stored = backend.stored_channel_mappings().unwrap();
    assert!(stored.rules(&ProjectId::new("p1")).is_empty());
    assert_eq!(stored.rules(&ProjectId::new("p2")).len(), 1);
}

#[tokio::test]
async fn accepted_save_is_not_refetched() {
    let backend = backend();
    let session = session(&backend);
    session.edit(MappingStore::add_user_mapping);
    session.save_user_mappings().await.unwrap();

    assert_eq!(
        backend.request_count(Method::Get, &ApiPaths::default().user_mappings()),
        0
    );
    assert!(session.snapshot().user_mappings.is_empty());
}
