//! Display server backends: responsibility and boundaries
//!
//! This module owns everything that talks to the display server. It turns
//! protocol events into `DisplayEvent`s and geometry into configure
//! requests. It MUST NOT decide which windows are managed or where they go;
//! that belongs to the registry and the tiling engine.

mod dry_run;
mod r#trait;
mod x11;

pub use self::dry_run::{DisplayRequest, DryRunDisplay};
pub use self::r#trait::{create_display, DisplayServer};
pub use self::x11::X11Display;
