use crate::config::DisplayConfig;
use crate::error::Result;
use crate::events::{DisplayEvent, IgnoredEvent, WindowId};
use crate::rwm_error;
use crate::services::tiling::{Frame, Screen};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt as _, EventMask, MapState,
    Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// Register a duplicate of `fd` with the reactor; the original stays with its owner
fn watch_readable(fd: BorrowedFd<'_>) -> std::io::Result<AsyncFd<OwnedFd>> {
    AsyncFd::new(fd.try_clone_to_owned()?)
}

pub struct X11Display {
    // Duplicate of the connection descriptor, registered for readiness only
    readiness: Option<AsyncFd<OwnedFd>>,
    conn: Option<RustConnection>,
    root: Window,
    screen: Screen,
}

impl X11Display {
    /// Connect to the X server. Must be called from within the tokio runtime.
    pub fn connect(config: &DisplayConfig) -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(config.name.as_deref())?;

        let (root, screen) = {
            let setup_screen = conn
                .setup()
                .roots
                .get(screen_num)
                .ok_or_else(|| rwm_error!(internal, "screen {} missing from setup", screen_num))?;
            (
                setup_screen.root,
                Screen::new(
                    setup_screen.width_in_pixels as u32,
                    setup_screen.height_in_pixels as u32,
                ),
            )
        };

        info!(
            "Connected to X11, screen {}, root window 0x{:x}, {}x{}",
            screen_num, root, screen.width, screen.height
        );

        let readiness = watch_readable(conn.stream().as_fd())?;

        Ok(Self {
            readiness: Some(readiness),
            conn: Some(conn),
            root,
            screen,
        })
    }

    fn conn(&self) -> Result<&RustConnection> {
        self.conn
            .as_ref()
            .ok_or_else(|| rwm_error!(internal, "display connection already closed"))
    }

    fn classify(event: Event) -> DisplayEvent {
        match event {
            Event::MapRequest(e) => DisplayEvent::MapRequest { window: e.window },
            Event::DestroyNotify(e) => DisplayEvent::Destroyed { window: e.window },
            Event::Expose(_) => DisplayEvent::Ignored(IgnoredEvent::Expose),
            Event::ButtonPress(_) => DisplayEvent::Ignored(IgnoredEvent::ButtonPress),
            Event::ConfigureRequest(_) => DisplayEvent::Ignored(IgnoredEvent::ConfigureRequest),
            Event::ClientMessage(_) => DisplayEvent::Ignored(IgnoredEvent::ClientMessage),
            Event::CreateNotify(_) => DisplayEvent::Ignored(IgnoredEvent::CreateNotify),
            Event::ConfigureNotify(_) => DisplayEvent::Ignored(IgnoredEvent::ConfigureNotify),
            Event::MapNotify(_) => DisplayEvent::Ignored(IgnoredEvent::MapNotify),
            Event::UnmapNotify(_) => DisplayEvent::Ignored(IgnoredEvent::UnmapNotify),
            Event::PropertyNotify(_) => DisplayEvent::Ignored(IgnoredEvent::PropertyNotify),
            Event::Error(e) => {
                warn!(
                    "X11 error {:?} (sequence {}, value 0x{:x})",
                    e.error_kind, e.sequence, e.bad_value
                );
                DisplayEvent::Ignored(IgnoredEvent::ProtocolError)
            }
            other => DisplayEvent::Unknown(other.raw_response_type() & 0x7f),
        }
    }
}

#[async_trait::async_trait]
impl super::DisplayServer for X11Display {
    fn screen(&self) -> Screen {
        self.screen
    }

    fn subscribe(&mut self) -> Result<()> {
        let conn = self.conn()?;
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;

        match conn
            .change_window_attributes(self.root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
        {
            Ok(()) => {}
            Err(ReplyError::X11Error(e)) => {
                return Err(rwm_error!(
                    another_instance,
                    "root window rejected substructure redirect ({:?})",
                    e.error_kind
                ));
            }
            Err(e) => return Err(e.into()),
        }

        conn.flush()?;
        Ok(())
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowId>> {
        let conn = self.conn()?;
        let tree = conn.query_tree(self.root)?.reply()?;

        let cookies = tree
            .children
            .iter()
            .map(|&child| conn.get_window_attributes(child).map(|cookie| (child, cookie)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut windows = Vec::with_capacity(cookies.len());
        for (child, cookie) in cookies {
            match cookie.reply() {
                // Windows that will never send a map request do not get a tile
                Ok(attrs) if attrs.override_redirect || attrs.map_state == MapState::UNMAPPED => {
                    debug!("Skipping existing window 0x{:x}", child);
                }
                Ok(_) => windows.push(child),
                Err(ReplyError::X11Error(e)) => {
                    debug!("Existing window 0x{:x} vanished: {:?}", child, e.error_kind);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(windows)
    }

    fn map_window(&mut self, window: WindowId) -> Result<()> {
        self.conn()?.map_window(window)?;
        Ok(())
    }

    fn watch_properties(&mut self, window: WindowId) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE);
        self.conn()?.change_window_attributes(window, &aux)?;
        Ok(())
    }

    fn configure(&mut self, window: WindowId, frame: Frame) -> Result<()> {
        // The server rejects zero-sized windows
        let aux = ConfigureWindowAux::new()
            .x(frame.x)
            .y(frame.y)
            .width(frame.width.max(1))
            .height(frame.height.max(1));
        self.conn()?.configure_window(window, &aux)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.conn()?.flush()?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<DisplayEvent>> {
        Ok(self.conn()?.poll_for_event()?.map(Self::classify))
    }

    async fn wait_readable(&self) -> Result<()> {
        let readiness = self
            .readiness
            .as_ref()
            .ok_or_else(|| rwm_error!(internal, "display connection already closed"))?;
        let mut guard = readiness.readable().await?;
        // Events are drained right after this returns; data arriving later re-arms readiness
        guard.clear_ready();
        Ok(())
    }

    fn disconnect(&mut self) {
        self.readiness = None;
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.flush() {
                debug!("Flush before disconnect failed: {}", e);
            }
            info!("Disconnected from X11");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        DestroyNotifyEvent, GravityNotifyEvent, MapRequestEvent, UnmapNotifyEvent,
        DESTROY_NOTIFY_EVENT, GRAVITY_NOTIFY_EVENT, MAP_REQUEST_EVENT, UNMAP_NOTIFY_EVENT,
    };

    const ROOT: Window = 0x0000_01e0;

    #[tokio::test]
    async fn test_watch_readable_sees_incoming_data() {
        use std::io::Write;

        let (mut writer, reader) = std::os::unix::net::UnixStream::pair().unwrap();
        let readiness = watch_readable(reader.as_fd()).unwrap();

        writer.write_all(&[1]).unwrap();
        let mut guard = readiness.readable().await.unwrap();
        guard.clear_ready();

        // Dropping the registration leaves the original descriptor open
        drop(readiness);
        writer.write_all(&[2]).unwrap();
        let mut buf = [0u8; 2];
        std::io::Read::read_exact(&mut &reader, &mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
    }

    #[test]
    fn test_classify_handled_events() {
        let map = Event::MapRequest(MapRequestEvent {
            response_type: MAP_REQUEST_EVENT,
            sequence: 7,
            parent: ROOT,
            window: 0x0040_0001,
        });
        assert_eq!(
            X11Display::classify(map),
            DisplayEvent::MapRequest { window: 0x0040_0001 }
        );

        let destroy = Event::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 8,
            event: ROOT,
            window: 0x0040_0002,
        });
        assert_eq!(
            X11Display::classify(destroy),
            DisplayEvent::Destroyed { window: 0x0040_0002 }
        );
    }

    #[test]
    fn test_classify_ignored_event() {
        let unmap = Event::UnmapNotify(UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 9,
            event: ROOT,
            window: 0x0040_0003,
            from_configure: false,
        });
        assert_eq!(
            X11Display::classify(unmap),
            DisplayEvent::Ignored(IgnoredEvent::UnmapNotify)
        );
    }

    #[test]
    fn test_classify_unknown_strips_sent_event_bit() {
        // SendEvent sets the high bit of the response type
        let gravity = Event::GravityNotify(GravityNotifyEvent {
            response_type: GRAVITY_NOTIFY_EVENT | 0x80,
            sequence: 10,
            event: ROOT,
            window: 0x0040_0004,
            x: 0,
            y: 0,
        });
        assert_eq!(
            X11Display::classify(gravity),
            DisplayEvent::Unknown(GRAVITY_NOTIFY_EVENT)
        );
    }
}
