use std::fmt;

/// Opaque identifier the display server assigns to a window
pub type WindowId = u32;

/// A display-server event, already decoded and classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A client asked for its top-level window to be shown
    MapRequest { window: WindowId },
    /// A window was destroyed
    Destroyed { window: WindowId },
    /// Recognized, deliberately not handled
    Ignored(IgnoredEvent),
    /// Unrecognized response type
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoredEvent {
    Expose,
    ButtonPress,
    ConfigureRequest,
    ClientMessage,
    CreateNotify,
    ConfigureNotify,
    MapNotify,
    UnmapNotify,
    PropertyNotify,
    ProtocolError,
}

impl fmt::Display for IgnoredEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IgnoredEvent::Expose => "Expose",
            IgnoredEvent::ButtonPress => "ButtonPress",
            IgnoredEvent::ConfigureRequest => "ConfigureRequest",
            IgnoredEvent::ClientMessage => "ClientMessage",
            IgnoredEvent::CreateNotify => "CreateNotify",
            IgnoredEvent::ConfigureNotify => "ConfigureNotify",
            IgnoredEvent::MapNotify => "MapNotify",
            IgnoredEvent::UnmapNotify => "UnmapNotify",
            IgnoredEvent::PropertyNotify => "PropertyNotify",
            IgnoredEvent::ProtocolError => "ProtocolError",
        };
        f.write_str(name)
    }
}

impl fmt::Display for DisplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayEvent::MapRequest { window } => write!(f, "MapRequest(0x{:x})", window),
            DisplayEvent::Destroyed { window } => write!(f, "DestroyNotify(0x{:x})", window),
            DisplayEvent::Ignored(kind) => write!(f, "{}", kind),
            DisplayEvent::Unknown(code) => write!(f, "Unknown({})", code),
        }
    }
}
