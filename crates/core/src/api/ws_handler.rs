//! Streaming API WebSocket handler (spec.md §6.2): `GET /ws`.
//!
//! Each connection holds at most one active mission. Submitting a
//! `client:message` starts a mission and forwards its event-bridge
//! subscription back to the socket as `server:*` frames, following the
//! grounding codebase's writer-task/heartbeat-task/reader-loop shape.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::events::{CloseCause, EventFrame};
use crate::runtime::Runtime;
use crate::types::{BudgetPolicy, MissionId};

use super::routes::scope_from_prompt;
use super::ws_types::{ClientMessage, PlanStepView, ServerMessage};

pub async fn ws_handler(ws: WebSocketUpgrade, State(runtime): State<Arc<Runtime>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, runtime))
}

async fn handle_socket(socket: WebSocket, runtime: Arc<Runtime>) {
    let (mut ws_writer, mut ws_reader) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);

    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_writer.send(WsMessage::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to serialize ServerMessage"),
            }
        }
    });

    let heartbeat_tx = out_tx.clone();
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            if heartbeat_tx.send(ServerMessage::Pong).await.is_err() {
                break;
            }
        }
    });

    let _ = out_tx.send(ServerMessage::Connected).await;

    let mut active_mission: Option<MissionId> = None;

    while let Some(msg) = ws_reader.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "websocket read error");
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Message { content }) => {
                    let scope = scope_from_prompt(&content);
                    let mission_id = runtime.start_mission(content, scope, BudgetPolicy::default());
                    active_mission = Some(mission_id);
                    spawn_forwarder(runtime.clone(), mission_id, out_tx.clone());
                }
                Ok(ClientMessage::ConfirmPlan { approved_step_ids, .. }) => {
                    if let Some(mission_id) = active_mission {
                        if let Err(e) = runtime.approve_plan(mission_id, approved_step_ids).await {
                            let _ = out_tx.send(ServerMessage::Error { message: e.to_string() }).await;
                        }
                    }
                }
                Ok(ClientMessage::Stop { mission_id, .. }) => {
                    if let Err(e) = runtime.cancel(mission_id).await {
                        let _ = out_tx.send(ServerMessage::Error { message: e.to_string() }).await;
                    }
                }
                Ok(ClientMessage::Ping) => {
                    let _ = out_tx.send(ServerMessage::Pong).await;
                }
                Err(e) => {
                    let _ = out_tx
                        .send(ServerMessage::Error { message: format!("invalid message: {e}") })
                        .await;
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    heartbeat_handle.abort();
    drop(out_tx);
    let _ = writer_handle.await;

    tracing::info!("websocket connection closed");
}

/// Forward a mission's event-bridge subscription to the socket's writer task,
/// rendering a `server:plan_proposal` frame the first time the mission's
/// plan becomes available.
fn spawn_forwarder(runtime: Arc<Runtime>, mission_id: MissionId, out_tx: mpsc::Sender<ServerMessage>) {
    tokio::spawn(async move {
        let mut subscription = runtime.subscribe(mission_id);
        let mut plan_sent = false;

        while let Some(frame) = subscription.receiver.recv().await {
            match frame {
                EventFrame::Log(log) => {
                    if !plan_sent {
                        if let Ok(Some(plan)) = runtime.plan(mission_id).await {
                            plan_sent = true;
                            let steps = plan
                                .steps
                                .iter()
                                .map(|s| PlanStepView::Step {
                                    id: s.id.clone(),
                                    tool: s.tool.clone(),
                                    args: s.argument.clone(),
                                    enabled: s.enabled,
                                })
                                .collect();
                            let _ = out_tx
                                .send(ServerMessage::PlanProposal {
                                    plan_id: mission_id.to_string(),
                                    intent: plan.reasoning.clone(),
                                    steps,
                                })
                                .await;
                        }
                    }
                    if out_tx.send(ServerMessage::JobLog { mission_id, log }).await.is_err() {
                        break;
                    }
                }
                EventFrame::Status(status) => {
                    if out_tx
                        .send(ServerMessage::JobStatus { mission_id, run_id: Some(mission_id), status })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                EventFrame::Closed(CloseCause::Overflow) => {
                    let _ = out_tx
                        .send(ServerMessage::Error { message: "subscriber overflow: falling behind the mission log".to_string() })
                        .await;
                    break;
                }
                EventFrame::Closed(_) => break,
            }
        }
    });
}
