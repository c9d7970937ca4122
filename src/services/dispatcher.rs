use crate::error::Result;
use crate::events::{DisplayEvent, WindowId};
use crate::services::display::DisplayServer;
use crate::services::registry::WindowRegistry;
use crate::services::tiling::{apply_layout, Screen};
use crate::trace_if_enabled;
use tracing::debug;

/// Everything event handlers touch: the registry, the display and the
/// screen it was connected with. Owned by the run loop, lent to handlers.
pub struct SessionState<D> {
    pub registry: WindowRegistry,
    pub display: D,
    screen: Screen,
}

/// What dispatching one event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The registry changed and a tiling pass ran
    Retiled,
    /// Handled, nothing to re-tile
    Unchanged,
    /// No handler for this kind of event
    Discarded,
}

impl<D: DisplayServer> SessionState<D> {
    pub fn new(display: D) -> Self {
        let screen = display.screen();
        Self {
            registry: WindowRegistry::new(),
            display,
            screen,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn retile(&mut self) -> Result<usize> {
        trace_if_enabled!("Registry before tiling: {}", self.registry);
        apply_layout(&mut self.display, &self.registry, self.screen)
    }

    /// Manage every window that existed before startup, then tile once.
    pub fn adopt_existing_windows(&mut self) -> Result<usize> {
        let mut adopted = 0;
        for window in self.display.top_level_windows()? {
            if self.registry.add(window) {
                adopted += 1;
            }
        }
        debug!("Found {} existing window(s)", adopted);
        self.retile()?;
        Ok(adopted)
    }

    /// Route one event to its handler. Unhandled kinds are logged and dropped.
    pub fn dispatch(&mut self, event: DisplayEvent) -> Result<Outcome> {
        match event {
            DisplayEvent::MapRequest { window } => self.handle_map_request(window),
            DisplayEvent::Destroyed { window } => self.handle_destroyed(window),
            DisplayEvent::Ignored(kind) => {
                debug!("Ignoring {}", kind);
                Ok(Outcome::Discarded)
            }
            DisplayEvent::Unknown(code) => {
                debug!("Ignoring unknown event {}", code);
                Ok(Outcome::Discarded)
            }
        }
    }

    fn handle_map_request(&mut self, window: WindowId) -> Result<Outcome> {
        debug!("Handling MapRequest for 0x{:x}", window);
        self.display.map_window(window)?;

        if !self.registry.add(window) {
            debug!("Window 0x{:x} is already managed", window);
            return Ok(Outcome::Unchanged);
        }

        self.display.watch_properties(window)?;
        self.retile()?;
        Ok(Outcome::Retiled)
    }

    fn handle_destroyed(&mut self, window: WindowId) -> Result<Outcome> {
        debug!("Handling DestroyNotify for 0x{:x}", window);

        // Override-redirect and never-mapped windows are not tracked
        let Some(managed) = self.registry.find(window).copied() else {
            debug!("Window 0x{:x} was not managed", window);
            return Ok(Outcome::Unchanged);
        };

        self.registry.remove(managed.id());
        self.retile()?;
        Ok(Outcome::Retiled)
    }
}
