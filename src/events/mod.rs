pub mod display;

pub use display::{DisplayEvent, IgnoredEvent, WindowId};
