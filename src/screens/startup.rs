use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::APP_INITIALIZED_KEY;
use crate::state::AppContext;

pub const IDLE_TEXT: &str = "TAP TO START ENGINE";

/// Loader caption for a progress percentage once the engine is started.
pub fn status_text(progress: u8) -> &'static str {
    match progress {
        100.. => "JOURNEY STARTED",
        80.. => "FULL THROTTLE...",
        50.. => "REVVING ENGINE...",
        20.. => "CHECKING FLUIDS...",
        _ => "INITIALIZING SYSTEMS...",
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartupView {
    pub show_loader: bool,
    pub status_text: &'static str,
    pub theme: &'static str,
}

/// The loader plays once per session.
pub fn view(ctx: &AppContext) -> StartupView {
    StartupView {
        show_loader: ctx.session.get(APP_INITIALIZED_KEY).is_none(),
        status_text: IDLE_TEXT,
        theme: ctx.theme.current().body_class(),
    }
}

pub fn finish(ctx: &AppContext) -> StartupView {
    match ctx.session.set(APP_INITIALIZED_KEY, "true") {
        Ok(()) => debug!("loader finished for this session"),
        Err(err) => warn!(error = %err, "could not record loader completion"),
    }
    StartupView {
        show_loader: false,
        status_text: status_text(100),
        theme: ctx.theme.current().body_class(),
    }
}
