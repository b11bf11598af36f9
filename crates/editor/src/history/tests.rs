use std::rc::Rc;
use std::time::Duration;

use shared::Feature;

use super::*;
use crate::error::EditorError;
use crate::fixtures;
use crate::harness::{ApiCall, RecordingSurface, ScriptedApi};
use crate::scene::{FeatureStore, Scene};
use crate::settings::HighlightSettings;

fn engine_with(api: ScriptedApi, policy: RemoteFailurePolicy) -> (Rc<Scene>, CommandEngine<ScriptedApi>) {
    let (surface, _log) = RecordingSurface::new();
    let scene = Rc::new(Scene::new(Box::new(surface), HighlightSettings::default()));
    let engine = CommandEngine::new(scene.clone(), api, policy);
    (scene, engine)
}

fn engine() -> (Rc<Scene>, CommandEngine<ScriptedApi>) {
    engine_with(ScriptedApi::new(), RemoteFailurePolicy::RollBack)
}

fn snapshot(scene: &Scene) -> FeatureStore {
    scene.store().clone()
}

fn triangle(id: &str) -> Feature {
    fixtures::building(id, fixtures::triangle_ring(), 10.0)
}

fn taller(feature: &Feature, height: f64) -> Feature {
    Feature {
        height,
        ..feature.clone()
    }
}

// ── Stack bookkeeping ───────────────────────────────────────────

#[test]
fn test_push_clears_redo() {
    let mut history = CommandHistory::default();
    history.push(EditCommand::Create {
        feature: triangle("a"),
    });
    let undone = history.pop_undo().unwrap();
    history.push_redo(undone);
    assert!(history.can_redo());

    history.push(EditCommand::Create {
        feature: triangle("b"),
    });
    assert!(!history.can_redo());
    assert_eq!(history.undo_count(), 1);
}

#[test]
fn test_inverse_round_trip() {
    let before = triangle("a");
    let after = taller(&before, 20.0);
    let update = EditCommand::Update {
        id: "a".into(),
        before,
        after,
    };
    assert_eq!(update.inverse().inverse(), update);
    assert_eq!(update.inverse().kind(), CommandKind::Update);

    let create = EditCommand::Create {
        feature: triangle("a"),
    };
    assert_eq!(create.inverse().kind(), CommandKind::Delete);
}

#[test]
fn test_rekey_only_touches_matching_commands() {
    let mut history = CommandHistory::default();
    history.push(EditCommand::Create {
        feature: triangle("tmp"),
    });
    history.push(EditCommand::Update {
        id: "tmp".into(),
        before: triangle("tmp"),
        after: taller(&triangle("tmp"), 12.0),
    });
    history.push(EditCommand::Delete {
        feature: triangle("other"),
    });
    history.rekey("tmp", "srv-1");

    let ids: Vec<String> = std::iter::from_fn(|| history.pop_undo())
        .map(|c| c.feature_id().to_string())
        .collect();
    assert_eq!(ids, vec!["other", "srv-1", "srv-1"]);
}

// ── Engine ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_execute_then_undo_all_restores_store() {
    let (scene, engine) = engine();
    scene.upsert(triangle("existing"));
    let initial = snapshot(&scene);

    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();
    let before = scene.feature("existing").unwrap();
    engine
        .execute_and_record(EditCommand::Update {
            id: "existing".into(),
            after: taller(&before, 30.0),
            before,
        })
        .await
        .unwrap();
    engine
        .execute_and_record(EditCommand::Delete {
            feature: scene.feature("a").unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(engine.undo_count(), 3);

    for _ in 0..3 {
        assert!(engine.undo().await.unwrap().is_some());
    }
    assert_eq!(snapshot(&scene), initial);
    assert!(engine.undo().await.unwrap().is_none());
}

#[tokio::test]
async fn test_redo_reproduces_post_command_state() {
    let (scene, engine) = engine();
    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();
    let after_create = snapshot(&scene);

    assert_eq!(engine.undo().await.unwrap(), Some(CommandKind::Create));
    assert!(scene.store().is_empty());
    assert_eq!(engine.redo().await.unwrap(), Some(CommandKind::Create));
    assert_eq!(snapshot(&scene), after_create);
    assert!(!engine.can_redo());
}

#[tokio::test]
async fn test_new_command_after_undo_clears_redo() {
    let (_scene, engine) = engine();
    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();
    engine.undo().await.unwrap();
    assert!(engine.can_redo());

    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("b"),
        })
        .await
        .unwrap();
    assert!(!engine.can_redo());
    assert!(engine.redo().await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_swaps_temporary_id() {
    let (scene, engine) = engine_with(ScriptedApi::assigning_ids("srv"), RemoteFailurePolicy::RollBack);
    let id = engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("tmp"),
        })
        .await
        .unwrap();
    assert_eq!(id, "srv-1");
    assert!(!scene.contains("tmp"));
    assert_eq!(scene.store().len(), 1);
    let stored = scene.feature("srv-1").unwrap();
    assert_eq!(stored.geometry, fixtures::triangle_ring());
    assert_eq!(stored.meta, triangle("tmp").meta);

    engine.api().clear_calls();
    engine.undo().await.unwrap();
    assert_eq!(
        engine.api().calls(),
        vec![ApiCall::Delete("srv-1".into(), true)]
    );
}

#[tokio::test]
async fn test_undo_of_delete_rekeys_redo() {
    let (scene, engine) = engine_with(ScriptedApi::assigning_ids("srv"), RemoteFailurePolicy::RollBack);
    scene.upsert(triangle("old"));
    engine
        .execute_and_record(EditCommand::Delete {
            feature: triangle("old"),
        })
        .await
        .unwrap();

    // recreated under a fresh permanent id
    engine.undo().await.unwrap();
    assert!(scene.contains("srv-1"));
    assert!(!scene.contains("old"));

    engine.api().clear_calls();
    engine.redo().await.unwrap();
    assert_eq!(
        engine.api().calls(),
        vec![ApiCall::Delete("srv-1".into(), true)]
    );
    assert!(scene.store().is_empty());
}

#[tokio::test]
async fn test_failed_create_rolls_back() {
    let (scene, engine) = engine();
    engine.api().fail_next(1);
    let err = engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::RemoteRejected {
            operation: CommandKind::Create,
            ..
        }
    ));
    assert!(scene.store().is_empty());
    assert!(!engine.can_undo());
}

#[tokio::test]
async fn test_failed_create_keep_local() {
    let (scene, engine) = engine_with(ScriptedApi::new(), RemoteFailurePolicy::KeepLocal);
    engine.api().fail_next(1);
    assert!(engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .is_err());
    assert!(scene.contains("a"));
    assert!(!engine.can_undo());
}

#[tokio::test]
async fn test_failed_undo_rolls_back_and_keeps_command() {
    let (scene, engine) = engine();
    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();
    let after_create = snapshot(&scene);

    engine.api().fail_next(1);
    assert!(engine.undo().await.is_err());
    assert_eq!(snapshot(&scene), after_create);
    assert_eq!(engine.undo_count(), 1);
    assert!(!engine.can_redo());

    assert!(engine.undo().await.unwrap().is_some());
    assert!(scene.store().is_empty());
}

#[tokio::test]
async fn test_failed_undo_keep_local_moves_command() {
    let (scene, engine) = engine_with(ScriptedApi::new(), RemoteFailurePolicy::KeepLocal);
    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();

    engine.api().fail_next(1);
    assert!(engine.undo().await.is_err());
    assert!(scene.store().is_empty());
    assert_eq!(engine.undo_count(), 0);
    assert_eq!(engine.redo_count(), 1);
}

#[tokio::test]
async fn test_failed_redo_rolls_back() {
    let (scene, engine) = engine();
    engine
        .execute_and_record(EditCommand::Create {
            feature: triangle("a"),
        })
        .await
        .unwrap();
    engine.undo().await.unwrap();

    engine.api().fail_next(1);
    assert!(engine.redo().await.is_err());
    assert!(scene.store().is_empty());
    assert_eq!(engine.redo_count(), 1);
}

#[tokio::test]
async fn test_record_already_applied_skips_backend() {
    let (scene, engine) = engine();
    let before = triangle("a");
    scene.upsert(taller(&before, 40.0));
    engine.record_already_applied(EditCommand::Update {
        id: "a".into(),
        before: before.clone(),
        after: taller(&before, 40.0),
    });
    assert!(engine.api().calls().is_empty());

    engine.undo().await.unwrap();
    assert_eq!(scene.feature("a").unwrap().height, 10.0);
    assert_eq!(engine.api().updates().len(), 1);
}

#[tokio::test]
async fn test_persist_leaves_local_state() {
    let (scene, engine) = engine();
    scene.upsert(triangle("a"));
    let mut command = EditCommand::Update {
        id: "a".into(),
        before: triangle("a"),
        after: taller(&triangle("a"), 15.0),
    };
    engine.api().fail_next(1);
    assert!(engine.persist(&mut command).await.is_err());
    assert_eq!(scene.feature("a").unwrap().height, 10.0);
    assert!(!engine.can_undo());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_undo_is_rejected() {
    let (scene, engine) = engine();
    for id in ["a", "b"] {
        engine
            .execute_and_record(EditCommand::Create {
                feature: triangle(id),
            })
            .await
            .unwrap();
    }
    engine.api().set_latency(Some(Duration::from_millis(50)));

    let (first, second) = tokio::join!(engine.undo(), engine.undo());
    assert_eq!(first.unwrap(), Some(CommandKind::Create));
    assert!(matches!(second, Err(EditorError::StaleUndoRedo)));
    assert!(!engine.is_busy());
    assert_eq!(scene.store().len(), 1);
    assert_eq!(engine.undo_count(), 1);
}
