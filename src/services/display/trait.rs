use crate::config::Config;
use crate::error::Result;
use crate::events::{DisplayEvent, WindowId};
use crate::services::tiling::{Frame, Screen};
use tracing::info;

/// What the session needs from a display server connection
#[async_trait::async_trait]
pub trait DisplayServer: Send + Sync {
    /// Root screen geometry
    fn screen(&self) -> Screen;

    /// Take over structural events of the root window. Fails with
    /// `RwmError::AnotherInstance` when another manager already holds them.
    fn subscribe(&mut self) -> Result<()>;

    /// Existing top-level windows, in server order
    fn top_level_windows(&mut self) -> Result<Vec<WindowId>>;

    fn map_window(&mut self, window: WindowId) -> Result<()>;

    /// Ask for property-change notifications on `window` (fire and forget)
    fn watch_properties(&mut self, window: WindowId) -> Result<()>;

    fn configure(&mut self, window: WindowId, frame: Frame) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Next pending event, without blocking
    fn poll_event(&mut self) -> Result<Option<DisplayEvent>>;

    /// Resolve once the event source may have something to read
    async fn wait_readable(&self) -> Result<()>;

    /// Best-effort teardown; safe to call more than once
    fn disconnect(&mut self);
}

#[async_trait::async_trait]
impl<T: DisplayServer + ?Sized> DisplayServer for Box<T> {
    fn screen(&self) -> Screen {
        (**self).screen()
    }

    fn subscribe(&mut self) -> Result<()> {
        (**self).subscribe()
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowId>> {
        (**self).top_level_windows()
    }

    fn map_window(&mut self, window: WindowId) -> Result<()> {
        (**self).map_window(window)
    }

    fn watch_properties(&mut self, window: WindowId) -> Result<()> {
        (**self).watch_properties(window)
    }

    fn configure(&mut self, window: WindowId, frame: Frame) -> Result<()> {
        (**self).configure(window, frame)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn poll_event(&mut self) -> Result<Option<DisplayEvent>> {
        (**self).poll_event()
    }

    async fn wait_readable(&self) -> Result<()> {
        (**self).wait_readable().await
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// Factory function to create the display backend based on the dry_run flag
pub fn create_display(config: &Config, dry_run: bool) -> Result<Box<dyn DisplayServer>> {
    if dry_run {
        info!("Using the scripted dry-run display");
        Ok(Box::new(super::dry_run::DryRunDisplay::from_config(
            &config.dry_run,
        )))
    } else {
        Ok(Box::new(super::x11::X11Display::connect(&config.display)?))
    }
}
