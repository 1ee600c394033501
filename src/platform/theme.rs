use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn body_class(&self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
        }
    }
}

#[derive(Clone)]
pub struct ThemeState {
    current: watch::Sender<Theme>,
}

impl ThemeState {
    pub fn new(theme: Theme) -> Self {
        let (current, _unused_rx) = watch::channel(theme);
        Self { current }
    }

    pub fn current(&self) -> Theme {
        *self.current.borrow()
    }

    pub fn set(&self, theme: Theme) {
        self.current.send_replace(theme);
    }

    pub fn toggle(&self) -> Theme {
        let next = match self.current() {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        self.set(next);
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.current.subscribe()
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}
