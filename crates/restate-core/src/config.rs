//! Per-store settings.

/// What happens when a listener panics during a notification pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListenerPanic {
    /// Unwind out of `set_state` immediately. Later listeners in the pass are
    /// not called. The new state is already committed.
    #[default]
    Propagate,
    /// Keep notifying the remaining listeners, then re-raise the first panic
    /// once the pass is complete.
    Isolate,
}

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub name: Option<String>,
    pub listener_panic: ListenerPanic,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used as a prefix in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn listener_panic(mut self, policy: ListenerPanic) -> Self {
        self.listener_panic = policy;
        self
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("store")
    }
}
