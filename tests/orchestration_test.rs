//! End-to-end orchestration tests over the in-memory and SQLite stores
//! Run with: cargo test --test orchestration_test

mod common;

use chrono::Duration as ChronoDuration;
use std::sync::Arc;

use arena_core::application::services::{
    AnalyticsService, AuthService, BattleService, BotCommandService, CreateGroup, GroupService,
    LeaderboardService, StartBattle, SubmitCommand, SubmitScore, TournamentService,
};
use arena_core::domain::entities::{
    Battle, Group, Participant, PlayerAccount, Role, Season, Session, Tournament, TournamentDraft,
    TournamentState,
};
use arena_core::domain::traits::{DeviceCredentials, Repository};
use arena_core::domain::DomainError;
use arena_core::infrastructure::adapters::ConsoleBackend;
use arena_core::infrastructure::config::Config;
use arena_core::infrastructure::database::SqliteCommandRepository;
use arena_core::infrastructure::storage::{
    MemoryCommandRepository, MemoryLeaderboard, MemoryRepository,
};
use arena_core::ServiceError;

use common::{clock, ensure_init, start, RecordingBackend};

struct Tournaments {
    service: TournamentService,
    store: Arc<MemoryRepository<Tournament>>,
    participants: Arc<MemoryRepository<Participant>>,
    backend: Arc<RecordingBackend>,
    clock: Arc<arena_core::domain::traits::ManualClock>,
}

fn tournaments() -> Tournaments {
    ensure_init();
    let store = Arc::new(MemoryRepository::<Tournament>::new());
    let participants = Arc::new(MemoryRepository::<Participant>::new());
    let backend = RecordingBackend::new();
    let clock = clock();
    let service = TournamentService::new(store.clone(), participants.clone(), backend.clone())
        .with_clock(clock.clone());
    Tournaments {
        service,
        store,
        participants,
        backend,
        clock,
    }
}

fn cup() -> TournamentDraft {
    TournamentDraft {
        id: "t1".into(),
        title: "Cup".to_string(),
        start_time: Some(start()),
        ..Default::default()
    }
}

#[tokio::test]
async fn tournament_ends_once() {
    let t = tournaments();
    let created = t.service.create_tournament(cup()).await.unwrap();
    assert_eq!(created.state, TournamentState::Active);
    assert!(!created.sync_pending);

    t.clock.advance(ChronoDuration::hours(25));
    let ended = t.service.end_tournament(&"t1".into()).await.unwrap();
    assert_eq!(ended.state, TournamentState::Ended);
    assert_eq!(ended.end_time, Some(start() + ChronoDuration::hours(25)));

    t.clock.advance(ChronoDuration::hours(1));
    let err = t.service.end_tournament(&"t1".into()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(DomainError::AlreadyEnded(_))));

    let stored = t.service.get_tournament(&"t1".into()).await.unwrap();
    assert_eq!(stored.end_time, Some(start() + ChronoDuration::hours(25)));
}

#[tokio::test]
async fn attempts_accumulate() {
    let t = tournaments();
    t.service.create_tournament(cup()).await.unwrap();

    t.service.add_attempt(&"t1".into(), &"p1".into(), 5).await.unwrap();
    let participant = t.service.add_attempt(&"t1".into(), &"p1".into(), 10).await.unwrap();
    assert_eq!(participant.attempts, 15);
    assert_eq!(t.participants.len().await, 1);
    assert_eq!(
        t.backend.log(),
        vec!["create_tournament:t1", "add_attempt:t1/p1/5", "add_attempt:t1/p1/10"]
    );

    let err = t.service.add_attempt(&"t1".into(), &"p1".into(), 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn failed_create_keeps_local_record_and_retries() {
    let t = tournaments();
    t.backend.break_op("create_tournament");

    let err = t.service.create_tournament(cup()).await.unwrap_err();
    assert!(matches!(err, ServiceError::SyncFailed(_)));
    assert!(err.local_state_changed());
    assert!(err.is_retryable());
    assert_eq!(t.service.pending_sync().await.unwrap().len(), 1);

    t.backend.fix_op("create_tournament");
    let synced = t.service.create_tournament(cup()).await.unwrap();
    assert!(!synced.sync_pending);
    assert!(t.service.pending_sync().await.unwrap().is_empty());

    // a third call touches nothing
    t.service.create_tournament(cup()).await.unwrap();
    assert_eq!(t.backend.ops("create_tournament"), 2);
}

#[tokio::test]
async fn delete_waits_for_backend() {
    let t = tournaments();
    t.service.create_tournament(cup()).await.unwrap();

    t.backend.break_op("delete_tournament");
    let err = t.service.delete_tournament(&"t1".into()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Provider(_)));
    assert!(!err.local_state_changed());
    assert!(t.store.get(&"t1".into()).await.unwrap().is_some());

    t.backend.fix_op("delete_tournament");
    t.service.delete_tournament(&"t1".into()).await.unwrap();
    assert!(t.store.get(&"t1".into()).await.unwrap().is_none());
    assert!(matches!(
        t.service.get_tournament(&"t1".into()).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));
}

#[tokio::test]
async fn reset_zeroes_attempts() {
    let t = tournaments();
    t.service.create_tournament(cup()).await.unwrap();
    t.service.add_attempt(&"t1".into(), &"p1".into(), 3).await.unwrap();
    t.service.add_attempt(&"t1".into(), &"p2".into(), 4).await.unwrap();

    let reset = t.service.reset_tournament(&"t1".into()).await.unwrap();
    assert_eq!(reset.state, TournamentState::Reset);
    for participant in t.participants.list(10, 0).await.unwrap() {
        assert_eq!(participant.attempts, 0);
    }
}

fn commands() -> (BotCommandService, Arc<MemoryCommandRepository>, Arc<RecordingBackend>) {
    ensure_init();
    let repo = Arc::new(MemoryCommandRepository::new());
    let backend = RecordingBackend::new();
    let service = BotCommandService::new(repo.clone(), backend.clone())
        .with_notifier(backend.clone())
        .with_clock(clock());
    (service, repo, backend)
}

fn submit(key: &str) -> SubmitCommand {
    SubmitCommand {
        idempotency_key: key.into(),
        channel: "discord".to_string(),
        payload: b"/duel p2".to_vec(),
        player_id: Some("p1".into()),
    }
}

#[tokio::test]
async fn completed_key_is_acknowledged_without_reprocessing() {
    let (service, repo, backend) = commands();

    let first = service.handle(submit("k1")).await.unwrap();
    assert!(first.accepted && !first.replayed);
    service.record_attempt(&first.command_id, Ok(())).await.unwrap();

    let again = service.handle(submit("k1")).await.unwrap();
    assert!(again.accepted && again.replayed);
    assert_eq!(again.command_id, first.command_id);

    assert_eq!(repo.len().await, 1);
    assert_eq!(backend.ops("enqueue"), 1);
    assert_eq!(backend.ops("notify"), 1);
}

#[tokio::test]
async fn pending_key_is_a_duplicate() {
    let (service, _, backend) = commands();
    service.handle(submit("k1")).await.unwrap();

    let err = service.handle(submit("k1")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Duplicate(ref key) if key.as_str() == "k1"));
    assert!(err.is_retryable());
    assert_eq!(backend.ops("enqueue"), 1);
}

#[tokio::test]
async fn concurrent_deliveries_enqueue_once() {
    let (service, repo, backend) = commands();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.handle(submit("burst")).await }));
    }

    let mut accepted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(ServiceError::Duplicate(_)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!((accepted, duplicates), (1, 5));
    assert_eq!(repo.len().await, 1);
    assert_eq!(backend.ops("enqueue"), 1);
}

#[tokio::test]
async fn failed_enqueue_can_be_retried() {
    let (service, repo, backend) = commands();
    backend.break_op("enqueue");

    let err = service.handle(submit("k9")).await.unwrap_err();
    assert!(matches!(err, ServiceError::SyncFailed(_)));
    let stored = repo.find_by_key(&"k9".into()).await.unwrap();
    assert!(stored.is_failed());
    assert_eq!(stored.retry_count, 1);
    assert_eq!(backend.ops("notify"), 0);

    backend.fix_op("enqueue");
    let requeued = service.retry(&stored.id).await.unwrap();
    assert_eq!(requeued.id, stored.id);
    assert!(!requeued.is_failed());
    assert_eq!(backend.ops("enqueue"), 2);

    let err = service.retry(&stored.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(backend.ops("enqueue"), 2);
}

#[tokio::test]
async fn sqlite_store_dedupes_across_service_instances() {
    ensure_init();
    let repo = Arc::new(SqliteCommandRepository::in_memory().unwrap());
    let backend = RecordingBackend::new();

    let first = BotCommandService::new(repo.clone(), backend.clone());
    let accepted = first.handle(submit("k1")).await.unwrap();
    first.record_attempt(&accepted.command_id, Ok(())).await.unwrap();

    // a fresh service shares nothing but the database
    let second = BotCommandService::new(repo.clone(), backend.clone());
    let replay = second.handle(submit("k1")).await.unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.command_id, accepted.command_id);

    let listed = second.list_commands(10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_completed());
    assert_eq!(backend.ops("enqueue"), 1);
}

fn analytics() -> (AnalyticsService, Arc<MemoryRepository<Session>>, Arc<RecordingBackend>) {
    ensure_init();
    let sessions = Arc::new(MemoryRepository::<Session>::new());
    let backend = RecordingBackend::new();
    let service = AnalyticsService::new(sessions.clone(), backend.clone())
        .with_context(Config::default().event_context())
        .with_clock(clock());
    (service, sessions, backend)
}

#[tokio::test]
async fn session_lifecycle_dispatches_three_events() {
    let (service, sessions, backend) = analytics();

    let session = service.start_session("p1".into(), "1.4.0", "steam").await.unwrap();
    assert!(session.is_active());
    assert_eq!(backend.log(), vec!["dispatch:2"]);

    service.end_session(&"p1".into()).await.unwrap();
    assert!(sessions.is_empty().await);

    let names: Vec<_> = backend
        .events()
        .iter()
        .map(|e| e.name.as_ref().map(|n| n.as_str().to_string()))
        .collect();
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], None);
}

#[tokio::test]
async fn session_is_removed_even_when_end_dispatch_fails() {
    let (service, sessions, backend) = analytics();
    service.start_session("p1".into(), "1.4.0", "steam").await.unwrap();

    backend.break_op("dispatch");
    let err = service.end_session(&"p1".into()).await.unwrap_err();
    assert!(matches!(err, ServiceError::DispatchFailed(_)));
    assert!(err.local_state_changed());
    assert!(sessions.is_empty().await);

    assert!(matches!(
        service.end_session(&"p1".into()).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));
}

#[tokio::test]
async fn suspended_leader_cannot_start_battle() {
    ensure_init();
    let accounts = Arc::new(MemoryRepository::<PlayerAccount>::new());
    let battles = Arc::new(MemoryRepository::<Battle>::new());
    let backend = RecordingBackend::new();
    let auth = AuthService::new(accounts.clone(), backend.clone()).with_clock(clock());
    let service = BattleService::new(battles.clone(), backend.clone())
        .with_accounts(accounts.clone())
        .with_clock(clock());

    let signed_in = auth
        .authenticate_device(DeviceCredentials {
            device_id: "dev-1".to_string(),
            username: "ace".to_string(),
            email: None,
            platform: Some("android".to_string()),
        })
        .await
        .unwrap();
    let leader = signed_in.user_id.clone();

    let started = service
        .start_battle(StartBattle {
            leader_id: leader.clone(),
            idempotency_key: "b-k1".into(),
            preset: "duel".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let battle = service.join_battle(&started.battle_id, "p2".into()).await.unwrap();
    assert_eq!(battle.slots.len(), 2);
    assert_eq!(battle.match_id, started.match_id);

    auth.suspend_account(&leader, "chargeback").await.unwrap();
    let err = service
        .start_battle(StartBattle {
            leader_id: leader,
            idempotency_key: "b-k2".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Suspended(_)));
    assert_eq!(backend.ops("create_match"), 1);
    assert_eq!(battles.len().await, 1);
}

#[tokio::test]
async fn group_role_change_survives_sync_failure() {
    ensure_init();
    let groups = Arc::new(MemoryRepository::<Group>::new());
    let backend = RecordingBackend::new();
    let service = GroupService::new(groups.clone(), backend.clone()).with_clock(clock());

    let created = service
        .create_group(CreateGroup {
            creator_id: "owner".into(),
            name: "Night Owls".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    service.add_member(&created.group_id, "p2".into(), Role::Member).await.unwrap();

    backend.break_op("update_member_role");
    let err = service.assign_role(&created.group_id, &"p2".into(), Role::Admin).await.unwrap_err();
    assert!(matches!(err, ServiceError::SyncFailed(_)));

    let group = service.get_group(&created.group_id).await.unwrap();
    assert_eq!(group.role_of(&"p2".into()), Some(Role::Admin));
}

#[tokio::test]
async fn leaderboard_keeps_first_submission_per_key() {
    ensure_init();
    let store = Arc::new(MemoryLeaderboard::new());
    let clock = clock();
    store
        .add_season(Season::new("s1".into(), start(), start() + ChronoDuration::days(30)).unwrap())
        .await;
    let service = LeaderboardService::new(store.clone()).with_clock(clock.clone());

    for value in [100, 250] {
        service
            .submit(SubmitScore {
                player_id: "p1".into(),
                season_id: "s1".into(),
                value,
                idempotency_key: "score-1".into(),
            })
            .await
            .unwrap();
    }
    let kept = store.submissions().await;
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].value, 100);

    clock.advance(ChronoDuration::days(1));
    assert!(service.season(&"s1".into()).await.unwrap().active);
    clock.advance(ChronoDuration::days(40));
    assert!(!service.season(&"s1".into()).await.unwrap().active);
}

#[tokio::test]
async fn console_backend_serves_configured_services() {
    ensure_init();
    let config = Config::from_yaml(&Config::default().to_yaml().unwrap()).unwrap();
    let backend = Arc::new(ConsoleBackend::new(config.service.name.clone()));

    let service = TournamentService::new(
        Arc::new(MemoryRepository::<Tournament>::new()),
        Arc::new(MemoryRepository::<Participant>::new()),
        backend.clone(),
    )
    .with_provider_timeout(config.provider_timeout())
    .with_default_list_limit(config.tournaments.default_list_limit);

    service.create_tournament(cup()).await.unwrap();
    service.add_attempt(&"t1".into(), &"p1".into(), 1).await.unwrap();
    assert_eq!(service.list_tournaments(0, 0).await.unwrap().len(), 1);
    assert_eq!(backend.calls(), 2);
}
