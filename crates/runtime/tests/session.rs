//! Session runtime driven on a paused tokio clock.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use game_content::ContentFactory;
use game_core::{
    ApplyOutcome, ClickOutcome, EffectId, EngineError, ExpiryReason, GameEvent, ResourceKind,
    ScriptedRng, SessionSnapshot, SnapshotError,
};
use runtime::{Event, Runtime, RuntimeError, SessionEvent, Topic};
use tokio::sync::broadcast;

async fn quiet_runtime() -> Runtime {
    Runtime::builder()
        .rng(Arc::new(ScriptedRng::never()))
        .build()
        .await
        .expect("runtime should build")
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Some(game) = event.game() {
            events.push(game.clone());
        }
    }
    events
}

#[tokio::test(start_paused = true)]
async fn click_on_target_pays_and_publishes() {
    let runtime = quiet_runtime().await;
    let handle = runtime.handle();
    let mut input = handle.subscribe(Topic::Input);
    let mut economy = handle.subscribe(Topic::Economy);

    let target = handle.query_status().await.unwrap().target;
    let outcome = handle.click_region(target).await.unwrap();
    assert_eq!(outcome.reward(), 1);

    let input_events = drain(&mut input);
    assert!(input_events.contains(&GameEvent::ComboChanged {
        previous: 0,
        count: 1
    }));
    assert!(
        input_events
            .iter()
            .any(|e| matches!(e, GameEvent::TargetHit { combo: 1, reward: 1, .. }))
    );
    assert!(drain(&mut economy).contains(&GameEvent::ResourceChanged {
        kind: ResourceKind::Gold,
        delta: 1,
        total: 1,
    }));

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_expires_effects_without_input() {
    let runtime = quiet_runtime().await;
    let handle = runtime.handle();
    let mut effects = handle.subscribe(Topic::Effects);

    let applied = handle.apply_effect(EffectId::Lock).await.unwrap();
    assert_eq!(
        applied,
        ApplyOutcome::Applied {
            duration_ms: Some(1_000)
        }
    );
    let target = handle.query_status().await.unwrap().target;
    assert_eq!(
        handle.click_region(target).await.unwrap(),
        ClickOutcome::Rejected(game_core::RejectReason::Locked)
    );

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    let events = drain(&mut effects);
    assert!(events.contains(&GameEvent::EffectExpired {
        id: EffectId::Lock,
        reason: ExpiryReason::Timer,
    }));
    let status = handle.query_status().await.unwrap();
    assert!(status.active.is_empty());
    assert!(handle.click_region(target).await.unwrap().is_hit());

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn invalid_restore_is_refused_and_session_survives() {
    let runtime = quiet_runtime().await;
    let handle = runtime.handle();

    let snapshot = SessionSnapshot {
        target_index: 999,
        ..SessionSnapshot::default()
    };
    let err = handle.restore(snapshot, false).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Engine(EngineError::Snapshot(SnapshotError::TargetOutOfRange {
            index: 999,
            ..
        }))
    ));

    let status = handle.query_status().await.unwrap();
    assert!(!status.destroyed);

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn resumed_session_keeps_holdings_and_drops_streak() {
    let runtime = quiet_runtime().await;
    let handle = runtime.handle();
    let target = handle.query_status().await.unwrap().target;
    handle.click_region(target).await.unwrap();
    handle.click_region(target).await.unwrap();
    let saved = handle.snapshot().await.unwrap();
    assert_eq!(saved.combo.count, 2);
    runtime.shutdown().await.unwrap();

    let resumed = Runtime::builder()
        .rng(Arc::new(ScriptedRng::never()))
        .resume(saved.clone())
        .build()
        .await
        .unwrap();
    let status = resumed.handle().query_status().await.unwrap();
    assert_eq!(status.gold, saved.resources[&ResourceKind::Gold]);
    assert_eq!(status.combo, 0);
    assert_eq!(status.target, saved.target_index);

    resumed.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn skill_levels_feed_the_reward() {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../game/content/data");
    let content = ContentFactory::new(data).load_all().unwrap();
    let runtime = Runtime::builder()
        .content(content)
        .rng(Arc::new(ScriptedRng::never()))
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    let mut session = handle.subscribe(Topic::Session);

    assert_eq!(handle.set_skill_level("golden_fingers", 99).await.unwrap(), 10);
    assert!(matches!(
        handle.set_skill_level("no_such_line", 1).await,
        Err(RuntimeError::UnknownSkill(name)) if name == "no_such_line"
    ));
    assert_eq!(
        session.recv().await.unwrap(),
        Event::Session(SessionEvent::SkillChanged {
            name: "golden_fingers".into(),
            level: 10
        })
    );

    // 1 × 1.5 accuracy × 2.0 skill
    let target = handle.query_status().await.unwrap().target;
    assert_eq!(handle.click_region(target).await.unwrap().reward(), 3);

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_tears_down_and_closes_handles() {
    let runtime = quiet_runtime().await;
    let handle = runtime.handle();
    let mut session = handle.subscribe(Topic::Session);
    handle.apply_effect(EffectId::Waterfall).await.unwrap();

    runtime.shutdown().await.unwrap();

    assert!(matches!(
        session.recv().await.unwrap(),
        Event::Session(SessionEvent::Stopped { .. })
    ));
    assert!(matches!(
        handle.query_status().await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}
