use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use crate::cache::CachedCollection;
use crate::error::AppError;
use crate::models::Record;
use crate::realtime::ListenerHandle;
use crate::screens::driver_notifications::DriverNotificationsScreen;
use crate::screens::my_rides::MyRidesScreen;
use crate::screens::user_notifications::UserNotificationsScreen;
use crate::state::AppContext;

pub async fn rides_feed(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<AppContext>>,
) -> Result<Response, AppError> {
    let screen = MyRidesScreen::new(ctx)?;

    Ok(ws.on_upgrade(|socket| async move {
        screen.load().await;
        let listener = match screen.listen().await {
            Ok(listener) => listener,
            Err(err) => {
                warn!(error = %err, "ride feed could not subscribe");
                return;
            }
        };
        let reconnect = screen.reload_on_reconnect();

        forward(socket, screen.rides(), listener).await;
        reconnect.abort();
    }))
}

pub async fn driver_feed(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<AppContext>>,
) -> Result<Response, AppError> {
    let screen = DriverNotificationsScreen::new(ctx)?;

    Ok(ws.on_upgrade(|socket| async move {
        screen.load().await;
        match screen.listen().await {
            Ok(listener) => forward(socket, screen.requests(), listener).await,
            Err(err) => warn!(error = %err, "driver feed could not subscribe"),
        }
    }))
}

pub async fn user_feed(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<AppContext>>,
) -> Result<Response, AppError> {
    let screen = UserNotificationsScreen::new(ctx)?;

    Ok(ws.on_upgrade(|socket| async move {
        screen.load().await;
        match screen.listen().await {
            Ok(listener) => forward(socket, screen.alerts(), listener).await,
            Err(err) => warn!(error = %err, "user feed could not subscribe"),
        }
    }))
}

/// Streams every version of `rows` to the client until either side closes,
/// then releases the change-feed listener.
async fn forward<T: Record>(
    socket: WebSocket,
    rows: Arc<CachedCollection<T>>,
    listener: ListenerHandle,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = WatchStream::new(rows.subscribe());
    let channel = listener.channel().to_string();

    info!(channel = %channel, "feed client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = updates.next().await {
            let json = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize feed snapshot");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    listener.release();
    info!(channel = %channel, "feed client disconnected");
}
