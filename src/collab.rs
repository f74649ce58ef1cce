//! Seams to the third-party pieces the shell talks to.

use std::sync::Mutex;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    OverlayOpen,
    OverlayClose,
    EndpointReceived,
}

impl AnalyticsEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::OverlayOpen => "OverlayOpen",
            Self::OverlayClose => "OverlayClose",
            Self::EndpointReceived => "EndpointReceived",
        }
    }
}

/// Fire-and-forget event sink.
pub trait AnalyticsSink: Send + Sync {
    fn event(&self, event: AnalyticsEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn event(&self, event: AnalyticsEvent) {
        tracing::info!(event = event.name(), "analytics event");
    }
}

#[async_trait]
pub trait ChatWidget: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Toggles the `inactive` class on the widget's launcher button.
    fn set_button_inactive(&self, inactive: bool);
}

/// Stand-in widget for headless runs: logs what a browser would see.
#[derive(Debug, Default)]
pub struct HeadlessChatWidget {
    state: Mutex<HeadlessChatState>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessChatState {
    pub initialized: u32,
    pub button_inactive: Option<bool>,
}

impl HeadlessChatWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HeadlessChatState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }
}

#[async_trait]
impl ChatWidget for HeadlessChatWidget {
    async fn initialize(&self) -> anyhow::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("chat widget state lock poisoned"))?;
        state.initialized += 1;
        tracing::debug!(times = state.initialized, "chat widget initialized");
        Ok(())
    }

    fn set_button_inactive(&self, inactive: bool) {
        if let Ok(mut state) = self.state.lock() {
            if state.button_inactive != Some(inactive) {
                tracing::debug!(inactive, "chat button class toggled");
            }
            state.button_inactive = Some(inactive);
        }
    }
}

/// Keeps every emitted event.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

#[cfg(test)]
impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl AnalyticsSink for RecordingAnalytics {
    fn event(&self, event: AnalyticsEvent) {
        tracing::debug!(event = event.name(), "analytics event recorded");
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
