//! JSON action protocol for driving an editor without a UI.
//!
//! Each action maps onto one editor entry point. Screen coordinates are in
//! the pixel space of the surface the editor was built with.

use std::time::Duration;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::api::{CatalogApi, FeatureApi};
use crate::collaborators::DescriptionPrompt;
use crate::drawing::EditorMode;
use crate::editor::{Editor, FeatureUpdate, KeyInput};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditorAction {
    SetMode {
        mode: EditorMode,
    },
    Click {
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    SecondaryClick {
        x: f64,
        y: f64,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    /// Finish the shape being drawn
    Finish,
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    /// Let timers run (rotation ticks)
    Wait {
        ms: u64,
    },
    Select {
        id: String,
    },
    ClearSelection,
    UpdateSelected(FeatureUpdate),
    DeleteSelected,
    Undo,
    Redo,
    /// Fetch features and catalog from the backend
    Load,
    /// Mode, selection, history and a report per feature
    Inspect,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

impl<E: std::fmt::Display> From<Result<serde_json::Value, E>> for ActionResponse {
    fn from(result: Result<serde_json::Value, E>) -> Self {
        match result {
            Ok(serde_json::Value::Null) => Self::ok(),
            Ok(data) => Self::ok_with_data(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Execute a single action. Rotation needs a `LocalSet` around the caller.
pub async fn execute_action<A, P>(editor: &Editor<A, P>, action: EditorAction) -> ActionResponse
where
    A: FeatureApi + CatalogApi,
    P: DescriptionPrompt,
{
    use serde_json::{json, Value};

    match action {
        EditorAction::SetMode { mode } => editor.set_mode(mode).await.map(|_| Value::Null).into(),
        EditorAction::Click { x, y } => editor
            .pointer_click(DVec2::new(x, y))
            .await
            .map(|_| json!({ "selected": editor.selected(), "points": editor.drawing_points() }))
            .into(),
        EditorAction::Move { x, y } => {
            editor.pointer_move(DVec2::new(x, y));
            ActionResponse::ok()
        }
        EditorAction::SecondaryClick { x, y } => editor
            .secondary_click(DVec2::new(x, y))
            .await
            .map(|id| json!({ "created": id }))
            .into(),
        EditorAction::DoubleClick { x, y } => editor
            .double_click(DVec2::new(x, y))
            .await
            .map(|id| json!({ "created": id }))
            .into(),
        EditorAction::Finish => editor
            .finish_drawing()
            .await
            .map(|id| json!({ "created": id }))
            .into(),
        EditorAction::KeyDown(input) => editor.key_down(&input).await.map(|_| Value::Null).into(),
        EditorAction::KeyUp(input) => editor.key_up(&input).await.map(|_| Value::Null).into(),
        EditorAction::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ActionResponse::ok_with_data(json!({ "rotation_ticks": editor.rotation_ticks() }))
        }
        EditorAction::Select { id } => editor
            .select(&id)
            .await
            .map(|_| json!({ "selected": editor.selected() }))
            .into(),
        EditorAction::ClearSelection => editor.clear_selection().await.map(|_| Value::Null).into(),
        EditorAction::UpdateSelected(update) => editor
            .update_selected(&update)
            .await
            .map(|_| Value::Null)
            .into(),
        EditorAction::DeleteSelected => editor
            .delete_selected()
            .await
            .map(|id| json!({ "deleted": id }))
            .into(),
        EditorAction::Undo => editor
            .undo()
            .await
            .map(|undone| json!({ "undone": undone }))
            .into(),
        EditorAction::Redo => editor
            .redo()
            .await
            .map(|redone| json!({ "redone": redone }))
            .into(),
        EditorAction::Load => {
            let catalog = match editor.load_catalog().await {
                Ok(count) => count,
                Err(e) => return ActionResponse::err(e.to_string()),
            };
            editor
                .load_features()
                .await
                .map(|features| json!({ "features": features, "building_types": catalog }))
                .into()
        }
        EditorAction::Inspect => ActionResponse::ok_with_data(inspect(editor)),
    }
}

fn inspect<A, P>(editor: &Editor<A, P>) -> serde_json::Value
where
    A: FeatureApi + CatalogApi,
    P: DescriptionPrompt,
{
    let ids = editor.scene().store().ids();
    let features: Vec<_> = ids.iter().filter_map(|id| editor.report(id)).collect();
    let (undo, redo) = editor.history_counts();
    serde_json::json!({
        "mode": editor.mode(),
        "selected": editor.selected(),
        "feature_count": features.len(),
        "features": features,
        "undo_count": undo,
        "redo_count": redo,
        "rotating": editor.is_rotating(),
    })
}

/// Parse and execute a single JSON action string.
pub async fn execute_json<A, P>(editor: &Editor<A, P>, json: &str) -> Result<ActionResponse, String>
where
    A: FeatureApi + CatalogApi,
    P: DescriptionPrompt,
{
    let action: EditorAction =
        serde_json::from_str(json).map_err(|e| format!("Invalid action JSON: {e}"))?;
    Ok(execute_action(editor, action).await)
}

/// Parse and execute a JSON array of actions, in order.
pub async fn execute_json_batch<A, P>(
    editor: &Editor<A, P>,
    json: &str,
) -> Result<Vec<ActionResponse>, String>
where
    A: FeatureApi + CatalogApi,
    P: DescriptionPrompt,
{
    let actions: Vec<EditorAction> =
        serde_json::from_str(json).map_err(|e| format!("Invalid actions JSON: {e}"))?;
    let mut responses = Vec::with_capacity(actions.len());
    for action in actions {
        responses.push(execute_action(editor, action).await);
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{screen_at, TestHarness};
    use tokio::task::LocalSet;

    fn click_json(lon: f64, lat: f64) -> String {
        let p = screen_at(lon, lat);
        format!(r#"{{"action": "click", "x": {}, "y": {}}}"#, p.x, p.y)
    }

    #[test]
    fn test_action_serde_set_mode() {
        let json = r#"{"action": "set_mode", "mode": "draw_road"}"#;
        let action: EditorAction = serde_json::from_str(json).unwrap();
        assert!(matches!(
            action,
            EditorAction::SetMode {
                mode: EditorMode::DrawRoad
            }
        ));
    }

    #[test]
    fn test_action_serde_key_down() {
        let json = r#"{"action": "key_down", "key": "z", "ctrl": true}"#;
        let action: EditorAction = serde_json::from_str(json).unwrap();
        match action {
            EditorAction::KeyDown(input) => {
                assert_eq!(input, KeyInput::ctrl("z"));
            }
            _ => panic!("Expected KeyDown"),
        }
    }

    #[test]
    fn test_action_serde_update_selected() {
        let json = r#"{"action": "update_selected", "extent": 25.0, "name": "Tower"}"#;
        let action: EditorAction = serde_json::from_str(json).unwrap();
        match action {
            EditorAction::UpdateSelected(update) => {
                assert_eq!(update.extent, Some(25.0));
                assert_eq!(update.name.as_deref(), Some("Tower"));
                assert!(update.type_id.is_none());
            }
            _ => panic!("Expected UpdateSelected"),
        }
    }

    #[tokio::test]
    async fn test_execute_draw_and_inspect() {
        let h = TestHarness::new();
        let mut script = vec![r#"{"action": "set_mode", "mode": "draw"}"#.to_string()];
        for [lon, lat] in [[0.0, 0.0], [0.0, 0.001], [0.001, 0.0]] {
            script.push(click_json(lon, lat));
        }
        script.push(r#"{"action": "finish"}"#.to_string());
        script.push(r#"{"action": "inspect"}"#.to_string());
        let batch = format!("[{}]", script.join(","));

        let responses = execute_json_batch(&h.editor, &batch).await.unwrap();
        assert!(responses.iter().all(|r| r.success));
        let created = &responses[4].data.as_ref().unwrap()["created"];
        assert!(created.is_string());

        let data = responses[5].data.as_ref().unwrap();
        assert_eq!(data["feature_count"], 1);
        assert_eq!(data["mode"], "idle");
        assert_eq!(data["selected"], *created);
        assert!(data["features"][0]["metrics"]["area_m2"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_execute_undo_redo() {
        let h = TestHarness::new();
        h.draw_road(&[[0.0, 0.0], [0.001, 0.0]]).await.unwrap();

        let resp = execute_json(&h.editor, r#"{"action": "undo"}"#).await.unwrap();
        assert_eq!(resp.data.unwrap()["undone"], true);
        assert!(h.store().is_empty());

        let resp = execute_json(&h.editor, r#"{"action": "redo"}"#).await.unwrap();
        assert_eq!(resp.data.unwrap()["redone"], true);
        assert_eq!(h.store().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_failure_reports_error() {
        let h = TestHarness::new();
        h.api().fail_next(1);
        let responses = execute_json_batch(
            &h.editor,
            &format!(
                r#"[{{"action": "set_mode", "mode": "draw_road"}}, {}, {}, {{"action": "finish"}}]"#,
                click_json(0.0, 0.0),
                click_json(0.001, 0.0)
            ),
        )
        .await
        .unwrap();
        let last = responses.last().unwrap();
        assert!(!last.success);
        assert!(last.error.as_ref().unwrap().contains("create"));
        assert!(h.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_rotation_hold() {
        LocalSet::new()
            .run_until(async {
                let h = TestHarness::new();
                let id = h
                    .draw_polygon(&[[0.0, 0.0], [0.0, 0.001], [0.001, 0.0]])
                    .await
                    .unwrap()
                    .unwrap();
                h.api().clear_calls();

                let batch = r#"[
                    {"action": "set_mode", "mode": "edit"},
                    {"action": "key_down", "key": "d"},
                    {"action": "wait", "ms": 100},
                    {"action": "key_up", "key": "d"}
                ]"#;
                let responses = execute_json_batch(&h.editor, batch).await.unwrap();
                assert!(responses.iter().all(|r| r.success));
                assert!(responses[2].data.as_ref().unwrap()["rotation_ticks"].as_u64().unwrap() > 0);

                let updates = h.api().updates();
                assert_eq!(updates.len(), 1);
                assert_eq!(updates[0].0, id);
            })
            .await;
    }

    #[tokio::test]
    async fn test_execute_invalid_json() {
        let h = TestHarness::new();
        assert!(execute_json(&h.editor, "not valid json").await.is_err());
        assert!(execute_json(&h.editor, r#"{"action": "fly"}"#).await.is_err());
    }
}
