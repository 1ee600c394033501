use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, interval};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{BackendError, ChangeEvent, ChangeFilter, ChangeKind, Subscription};

const HEARTBEAT_EVERY: Duration = Duration::from_secs(25);

pub struct SocketConfig {
    pub url: String,
    pub channel: String,
    pub filter: ChangeFilter,
    pub access_token: String,
    pub buffer: usize,
}

fn topic(channel: &str) -> String {
    format!("realtime:{channel}")
}

pub(crate) fn join_message(config: &SocketConfig) -> Value {
    let mut change = json!({
        "event": config.filter.event.wire_name(),
        "schema": config.filter.schema,
        "table": config.filter.table,
    });
    if let Some(filter) = config.filter.wire_filter() {
        change["filter"] = Value::String(filter);
    }

    json!({
        "topic": topic(&config.channel),
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            },
            "access_token": config.access_token,
        },
        "ref": "1",
    })
}

/// Extracts a row change from a `postgres_changes` frame; other frames yield `None`.
pub(crate) fn parse_change(frame: &Value) -> Option<ChangeEvent> {
    if frame.get("event")?.as_str()? != "postgres_changes" {
        return None;
    }

    let data = frame.get("payload")?.get("data")?;
    let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;

    Some(ChangeEvent {
        kind,
        schema: data
            .get("schema")
            .and_then(Value::as_str)
            .unwrap_or("public")
            .to_string(),
        table: data.get("table")?.as_str()?.to_string(),
        record: data.get("record").cloned().unwrap_or(Value::Null),
        old_record: data.get("old_record").cloned().unwrap_or(Value::Null),
    })
}

pub async fn open_channel(config: SocketConfig) -> Result<Subscription, BackendError> {
    let (ws_stream, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|err| BackendError::Transport(format!("realtime connect failed: {err}")))?;

    let (mut sink, mut stream) = ws_stream.split();

    sink.send(Message::Text(join_message(&config).to_string()))
        .await
        .map_err(|err| BackendError::Transport(format!("realtime join failed: {err}")))?;

    info!(channel = %config.channel, table = %config.filter.table, "realtime channel joined");

    let (events_tx, events_rx) = mpsc::channel(config.buffer);
    let (release_tx, mut release_rx) = oneshot::channel::<()>();
    let channel = config.channel.clone();
    let topic_name = topic(&config.channel);

    tokio::spawn(async move {
        let mut heartbeat = interval(HEARTBEAT_EVERY);
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = &mut release_rx => {
                    let leave = json!({
                        "topic": topic_name,
                        "event": "phx_leave",
                        "payload": {},
                        "ref": next_ref.to_string(),
                    });
                    let _ = sink.send(Message::Text(leave.to_string())).await;
                    let _ = sink.close().await;
                    break;
                }
                _ = heartbeat.tick() => {
                    let beat = json!({
                        "topic": "phoenix",
                        "event": "heartbeat",
                        "payload": {},
                        "ref": next_ref.to_string(),
                    });
                    next_ref += 1;
                    if sink.send(Message::Text(beat.to_string())).await.is_err() {
                        warn!(channel = %channel, "realtime heartbeat failed");
                        break;
                    }
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => {
                            warn!(channel = %channel, "realtime socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            warn!(channel = %channel, error = %err, "realtime socket error");
                            break;
                        }
                    };

                    let Ok(value) = serde_json::from_str::<Value>(&text) else {
                        debug!(channel = %channel, "ignoring non-json realtime frame");
                        continue;
                    };

                    if let Some(event) = parse_change(&value) {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        debug!(channel = %channel, "realtime socket task finished");
    });

    Ok(Subscription::new(config.channel, events_rx, release_tx))
}
