pub mod control;
pub mod dispatcher;
pub mod display;
pub mod registry;
pub mod session;
pub mod tiling;

pub use control::{send_command, ControlCommand, ControlServer, RunState};
pub use dispatcher::{Outcome, SessionState};
pub use display::{create_display, DisplayServer, DryRunDisplay, X11Display};
pub use registry::{ManagedWindow, WindowRegistry};
pub use session::{LoopExit, Session};
pub use tiling::{Frame, Screen};
