//! WebSocket module for live form updates
//!
//! Each session observes the shared form: it pushes a fresh snapshot whenever
//! the form revision changes and accepts form actions from the client.

use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{FormAction, WsMessage};
use crate::state::AppState;

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the form revision is checked
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a snapshot at `revision` still has to be pushed to a session
/// that last saw `last_seen`
fn is_newer(last_seen: Option<u64>, revision: u64) -> bool {
    last_seen.map_or(true, |seen| revision > seen)
}

/// WebSocket session actor
pub struct WsSession {
    client_id: String,
    last_heartbeat: Instant,
    state: Arc<RwLock<AppState>>,
    last_revision: Option<u64>,
}

impl WsSession {
    pub fn new(client_id: String, state: Arc<RwLock<AppState>>) -> Self {
        Self {
            client_id,
            last_heartbeat: Instant::now(),
            state,
            last_revision: None,
        }
    }

    fn send(&self, ctx: &mut ws::WebsocketContext<Self>, msg: &WsMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => ctx.text(json),
            Err(e) => warn!(client_id = %self.client_id, error = %e, "Failed to encode message"),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    client_id = %act.client_id,
                    "WebSocket heartbeat timeout"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn poll_form(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let state = self.state.clone();
        let last_revision = self.last_revision;

        let fut = async move {
            let state = state.read().await;
            if last_revision == Some(state.revision()) {
                None
            } else {
                Some(state.snapshot())
            }
        };

        let fut = actix::fut::wrap_future::<_, Self>(fut);

        ctx.spawn(fut.map(|snapshot, act, ctx| {
            if let Some(snapshot) = snapshot {
                // a concurrent action may already have pushed a newer one
                if is_newer(act.last_revision, snapshot.revision) {
                    act.last_revision = Some(snapshot.revision);
                    act.send(ctx, &WsMessage::FormUpdate(snapshot));
                }
            }
        }));
    }

    fn start_form_polling(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(POLL_INTERVAL, |act, ctx| act.poll_form(ctx));
    }

    fn handle_action(&self, action: FormAction, ctx: &mut ws::WebsocketContext<Self>) {
        let state = self.state.clone();

        let fut = async move {
            let mut state = state.write().await;
            state.apply(action).map(|_| state.snapshot())
        };

        let fut = actix::fut::wrap_future::<_, Self>(fut);

        ctx.spawn(fut.map(|result, act, ctx| match result {
            Ok(snapshot) => {
                act.last_revision = Some(snapshot.revision);
                act.send(ctx, &WsMessage::FormUpdate(snapshot));
            }
            Err(e) => {
                warn!(client_id = %act.client_id, error = %e, "Rejected form action");
                act.send(
                    ctx,
                    &WsMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        }));
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(client_id = %self.client_id, "WebSocket connected");

        self.start_heartbeat(ctx);
        self.start_form_polling(ctx);

        let msg = WsMessage::Connected {
            client_id: self.client_id.clone(),
        };
        self.send(ctx, &msg);

        self.poll_form(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        info!(client_id = %self.client_id, "WebSocket disconnected");

        let state = self.state.clone();
        let client_id = self.client_id.clone();

        // IMPORTANT: Actix runtime spawn (not Tokio)
        actix_rt::spawn(async move {
            let mut state = state.write().await;
            state.remove_client(&client_id);
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                debug!(client_id = %self.client_id, message = %text);

                match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Ping) => {
                        self.last_heartbeat = Instant::now();
                        self.send(ctx, &WsMessage::Pong);
                    }
                    Ok(WsMessage::Action(action)) => {
                        self.last_heartbeat = Instant::now();
                        self.handle_action(action, ctx);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(client_id = %self.client_id, error = %e);
                        let err = WsMessage::Error {
                            message: "Invalid message format".into(),
                        };
                        self.send(ctx, &err);
                    }
                }
            }
            Ok(ws::Message::Close(reason)) => {
                info!(client_id = %self.client_id, reason = ?reason);
                ctx.stop();
            }
            Err(e) => {
                warn!(client_id = %self.client_id, error = %e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_newer;
    use crate::bedtime::ClockFormat;
    use crate::estimator::testing::FixedEstimator;
    use crate::form::BedtimeForm;
    use crate::handlers::configure_routes;
    use crate::models::{FormAction, WakeTime, WsMessage};
    use crate::state::AppState;
    use actix_web::{web, App};
    use actix_web_actors::ws;
    use futures::{SinkExt, StreamExt};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Next JSON message from the server, skipping control frames
    async fn next_message<S>(framed: &mut S) -> WsMessage
    where
        S: StreamExt<Item = Result<ws::Frame, ws::ProtocolError>> + Unpin,
    {
        loop {
            match framed.next().await {
                Some(Ok(ws::Frame::Text(bytes))) => return serde_json::from_slice(&bytes).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {:?}", other),
            }
        }
    }

    #[test]
    fn test_push_only_newer_revisions() {
        assert!(is_newer(None, 0));
        assert!(is_newer(Some(0), 1));
        assert!(!is_newer(Some(1), 1));
        assert!(!is_newer(Some(2), 1));
    }

    #[actix_web::test]
    async fn test_session_pushes_form_and_applies_actions() {
        let state = Arc::new(RwLock::new(AppState::new(
            Arc::new(FixedEstimator(27_000.0)),
            ClockFormat::TwentyFourHour,
        )));
        let app_state = state.clone();
        let mut srv = actix_test::start(move || {
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .configure(configure_routes)
        });

        let mut framed = srv.ws_at("/ws").await.unwrap();

        assert!(matches!(next_message(&mut framed).await, WsMessage::Connected { .. }));
        match next_message(&mut framed).await {
            WsMessage::FormUpdate(snapshot) => {
                assert_eq!(snapshot.revision, 0);
                assert_eq!(snapshot.coffee_amount, 1);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(state.read().await.client_count(), 1);

        framed
            .send(ws::Message::Text(
                r#"{"type":"Action","data":{"action":"increment_coffee"}}"#.into(),
            ))
            .await
            .unwrap();

        match next_message(&mut framed).await {
            WsMessage::FormUpdate(snapshot) => {
                assert_eq!(snapshot.revision, 1);
                assert_eq!(snapshot.coffee_amount, 2);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(state.read().await.snapshot().coffee_amount, 2);
    }

    #[actix_web::test]
    async fn test_session_reports_rejected_action() {
        let state = Arc::new(RwLock::new(AppState::new(
            Arc::new(FixedEstimator(27_000.0)),
            ClockFormat::TwentyFourHour,
        )));
        let app_state = state.clone();
        let mut srv = actix_test::start(move || {
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .configure(configure_routes)
        });

        let mut framed = srv.ws_at("/ws").await.unwrap();
        next_message(&mut framed).await;
        next_message(&mut framed).await;

        framed
            .send(ws::Message::Text(
                r#"{"type":"Action","data":{"action":"set_coffee_amount","value":25}}"#.into(),
            ))
            .await
            .unwrap();

        assert!(matches!(next_message(&mut framed).await, WsMessage::Error { .. }));
        assert_eq!(state.read().await.snapshot().coffee_amount, 1);
    }

    #[test]
    fn test_client_action_message_format() {
        let text = r#"{"type":"Action","data":{"action":"set_wake_time","value":"05:30"}}"#;
        let msg: WsMessage = serde_json::from_str(text).unwrap();

        match msg {
            WsMessage::Action(action) => {
                assert_eq!(action, FormAction::SetWakeTime(WakeTime::new(5, 30).unwrap()))
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_form_update_round_trip() {
        let snapshot = BedtimeForm::new().snapshot(ClockFormat::TwentyFourHour);
        let json = serde_json::to_string(&WsMessage::FormUpdate(snapshot.clone())).unwrap();
        assert!(json.starts_with(r#"{"type":"FormUpdate""#));

        match serde_json::from_str::<WsMessage>(&json).unwrap() {
            WsMessage::FormUpdate(decoded) => assert_eq!(decoded, snapshot),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_ping_message_format() {
        let msg: WsMessage = serde_json::from_str(r#"{"type":"Ping"}"#).unwrap();
        assert!(matches!(msg, WsMessage::Ping));
    }
}
