use crate::config::DryRunConfig;
use crate::error::Result;
use crate::events::{DisplayEvent, WindowId};
use crate::rwm_error;
use crate::services::tiling::{Frame, Screen};
use std::collections::VecDeque;
use tracing::info;

/// First identifier handed out to fake pre-existing windows
const FIRST_FAKE_WINDOW: WindowId = 0x0040_0001;

/// Requests the session sent to the display, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRequest {
    Map(WindowId),
    WatchProperties(WindowId),
    Configure(WindowId, Frame),
    Flush,
}

/// Display without a server: events come from a script, requests are
/// recorded and logged.
#[derive(Debug)]
pub struct DryRunDisplay {
    screen: Screen,
    existing: Vec<WindowId>,
    events: VecDeque<DisplayEvent>,
    requests: Vec<DisplayRequest>,
    subscription_taken: bool,
    connected: bool,
}

impl DryRunDisplay {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            existing: Vec::new(),
            events: VecDeque::new(),
            requests: Vec::new(),
            subscription_taken: false,
            connected: true,
        }
    }

    pub fn from_config(config: &DryRunConfig) -> Self {
        let existing = (0..config.windows).map(|i| FIRST_FAKE_WINDOW + i).collect();
        Self::new(Screen::new(config.screen_width, config.screen_height))
            .with_existing_windows(existing)
    }

    pub fn with_existing_windows(mut self, windows: Vec<WindowId>) -> Self {
        self.existing = windows;
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = DisplayEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Pretend another manager already owns the root window
    pub fn with_subscription_taken(mut self) -> Self {
        self.subscription_taken = true;
        self
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn requests(&self) -> &[DisplayRequest] {
        &self.requests
    }

    pub fn take_requests(&mut self) -> Vec<DisplayRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn configures(&self) -> Vec<(WindowId, Frame)> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                DisplayRequest::Configure(window, frame) => Some((*window, *frame)),
                _ => None,
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn record(&mut self, request: DisplayRequest) -> Result<()> {
        if !self.connected {
            return Err(rwm_error!(internal, "dry-run display already disconnected"));
        }
        if !matches!(request, DisplayRequest::Flush) {
            info!("[DRY RUN] {:?}", request);
        }
        self.requests.push(request);
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::DisplayServer for DryRunDisplay {
    fn screen(&self) -> Screen {
        self.screen
    }

    fn subscribe(&mut self) -> Result<()> {
        if self.subscription_taken {
            return Err(rwm_error!(another_instance, "dry-run subscription rejected"));
        }
        Ok(())
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowId>> {
        Ok(self.existing.clone())
    }

    fn map_window(&mut self, window: WindowId) -> Result<()> {
        self.record(DisplayRequest::Map(window))
    }

    fn watch_properties(&mut self, window: WindowId) -> Result<()> {
        self.record(DisplayRequest::WatchProperties(window))
    }

    fn configure(&mut self, window: WindowId, frame: Frame) -> Result<()> {
        self.record(DisplayRequest::Configure(window, frame))
    }

    fn flush(&mut self) -> Result<()> {
        self.record(DisplayRequest::Flush)
    }

    fn poll_event(&mut self) -> Result<Option<DisplayEvent>> {
        Ok(self.events.pop_front())
    }

    async fn wait_readable(&self) -> Result<()> {
        if self.events.is_empty() {
            // A script never grows while the session is waiting
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            info!("[DRY RUN] disconnected");
            self.connected = false;
        }
    }
}
