use crate::config::ControlConfig;
use crate::error::{Result, RwmError};
use crate::services::control::{ControlServer, RunState};
use crate::services::dispatcher::SessionState;
use crate::services::display::DisplayServer;
use crate::utils::step;
use std::future::Future;
use tracing::{debug, info, warn};

/// Why the run loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A shutdown command arrived on the control channel
    Shutdown,
    /// The interrupt future completed
    Interrupted,
}

/// The run loop: one task owning the display, the registry and the
/// control channel.
pub struct Session<D: DisplayServer> {
    state: SessionState<D>,
    control: ControlServer,
    run_state: RunState,
}

impl<D: DisplayServer> Session<D> {
    /// Take over the display, adopt existing windows and open the control
    /// channel. On failure the display is disconnected before returning.
    pub fn start(display: D, control: &ControlConfig) -> Result<Self> {
        let mut state = SessionState::new(display);

        let prepared = step("Screens", || {
            let screen = state.screen();
            info!("Screen is {}x{}", screen.width, screen.height);
            Ok::<_, RwmError>(())
        })
        .and_then(|()| step("Subscribing", || state.display.subscribe()))
        .and_then(|()| step("Windows", || state.adopt_existing_windows()))
        .and_then(|_| step("Control channel", || ControlServer::bind(control)));

        match prepared {
            Ok(control) => Ok(Self {
                state,
                control,
                run_state: RunState::new(),
            }),
            Err(e) => {
                state.display.disconnect();
                Err(e)
            }
        }
    }

    pub fn state(&self) -> &SessionState<D> {
        &self.state
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn control(&self) -> &ControlServer {
        &self.control
    }

    /// Multiplex display events and control connections until a shutdown
    /// command is served or `interrupt` completes. Display failures are
    /// fatal; control connection failures are absorbed.
    pub async fn run<F: Future>(&mut self, interrupt: F) -> Result<LoopExit> {
        tokio::pin!(interrupt);
        info!("Entering event loop");

        loop {
            // x11rb may already hold events read while waiting for a reply;
            // those never show up as descriptor readiness
            self.drain_display()?;
            self.state.display.flush()?;

            if !self.run_state.is_running() {
                info!("Leaving event loop");
                return Ok(LoopExit::Shutdown);
            }

            tokio::select! {
                biased;

                _ = &mut interrupt => {
                    info!("Interrupted, leaving event loop");
                    return Ok(LoopExit::Interrupted);
                }
                ready = self.state.display.wait_readable() => {
                    ready?;
                }
                accepted = self.control.accept() => match accepted {
                    Ok(stream) => {
                        debug!("Control client connected");
                        self.control.serve(stream, &mut self.run_state).await;
                    }
                    Err(e) => warn!("Could not accept control connection: {}", e),
                },
            }
        }
    }

    fn drain_display(&mut self) -> Result<usize> {
        let mut drained = 0;
        while let Some(event) = self.state.display.poll_event()? {
            self.state.dispatch(event)?;
            drained += 1;
        }
        if drained > 0 {
            debug!("Processed {} display event(s)", drained);
        }
        Ok(drained)
    }

    /// Disconnect from the display and remove the control endpoint.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        self.state.display.disconnect();
        self.control.remove_endpoint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RwmError;
    use crate::events::{DisplayEvent, IgnoredEvent};
    use crate::services::control::{send_command, ACK_REPLY, QUIT_REPLY};
    use crate::services::display::{DisplayRequest, DryRunDisplay};
    use crate::services::tiling::{Frame, Screen};
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn control_config(dir: &tempfile::TempDir) -> ControlConfig {
        ControlConfig {
            socket_path: dir.path().join("rwm.sock"),
            read_timeout_ms: 1000,
            socket_mode: 0o600,
        }
    }

    fn display() -> DryRunDisplay {
        DryRunDisplay::new(Screen::new(1920, 1080))
    }

    /// Collects the "<step>..." lines logged while it is the default subscriber
    #[derive(Clone, Default)]
    struct StepLog(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for StepLog {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Message(Option<String>);

            impl Visit for Message {
                fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{:?}", value));
                    }
                }
            }

            let mut message = Message(None);
            event.record(&mut message);
            if let Some(text) = message.0.and_then(|m| m.strip_suffix("...").map(str::to_string)) {
                self.0.lock().unwrap().push(text);
            }
        }
    }

    #[tokio::test]
    async fn test_start_adopts_existing_windows_with_one_tiling_pass() {
        let dir = tempfile::tempdir().unwrap();
        let display = display().with_existing_windows(vec![4, 5, 6]);

        let mut session = Session::start(display, &control_config(&dir)).unwrap();
        assert_eq!(session.state().registry.ids(), vec![4, 5, 6]);

        let requests = session.state().display.requests();
        let flushes = requests.iter().filter(|r| **r == DisplayRequest::Flush).count();
        assert_eq!(flushes, 1);
        assert_eq!(
            session.state().display.configures(),
            vec![
                (4, Frame::new(0, 0, 960, 1080)),
                (5, Frame::new(960, 0, 960, 540)),
                (6, Frame::new(960, 540, 960, 540)),
            ]
        );

        session.teardown();
    }

    #[tokio::test]
    async fn test_start_logs_each_step_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = StepLog::default();
        let subscriber = tracing_subscriber::registry().with(log.clone());

        let mut session = tracing::subscriber::with_default(subscriber, || {
            Session::start(display().with_existing_windows(vec![4]), &control_config(&dir))
        })
        .unwrap();

        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["Screens", "Subscribing", "Windows", "Control channel"]
        );

        session.teardown();
    }

    #[tokio::test]
    async fn test_start_fails_when_another_instance_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = control_config(&dir);
        let display = display().with_subscription_taken();

        let result = Session::start(display, &config);
        assert!(matches!(result, Err(RwmError::AnotherInstance(_))));
        assert!(!config.socket_path.exists());
    }

    #[tokio::test]
    async fn test_quit_command_ends_loop_after_events() {
        let dir = tempfile::tempdir().unwrap();
        let config = control_config(&dir);
        let display = display().with_events([
            DisplayEvent::MapRequest { window: 1 },
            DisplayEvent::Ignored(IgnoredEvent::MapNotify),
            DisplayEvent::MapRequest { window: 2 },
            DisplayEvent::Destroyed { window: 99 },
            DisplayEvent::MapRequest { window: 3 },
        ]);
        let mut session = Session::start(display, &config).unwrap();

        let path = session.control().path().to_path_buf();
        let client = tokio::spawn(async move { send_command(&path, "quit").await });

        let exit = session.run(std::future::pending::<()>()).await.unwrap();
        assert_eq!(exit, LoopExit::Shutdown);
        assert!(!session.run_state().is_running());
        assert_eq!(client.await.unwrap().unwrap(), QUIT_REPLY);

        assert_eq!(session.state().registry.ids(), vec![1, 2, 3]);
        assert_eq!(session.state().display.pending_events(), 0);

        let configures = session.state().display.configures();
        assert_eq!(
            &configures[configures.len() - 3..],
            &[
                (1, Frame::new(0, 0, 960, 1080)),
                (2, Frame::new(960, 0, 960, 540)),
                (3, Frame::new(960, 540, 960, 540)),
            ]
        );

        session.teardown();
        assert!(!config.socket_path.exists());
        assert!(!session.state().display.is_connected());
    }

    #[tokio::test]
    async fn test_other_commands_keep_loop_running() {
        let dir = tempfile::tempdir().unwrap();
        let config = control_config(&dir);
        let mut session = Session::start(display(), &config).unwrap();

        let path = config.socket_path.clone();
        let client = tokio::spawn(async move {
            let first = send_command(&path, "status").await?;
            let second = send_command(&path, "ping").await?;
            let last = send_command(&path, "quit").await?;
            Ok::<_, std::io::Error>(vec![first, second, last])
        });

        let exit = session.run(std::future::pending::<()>()).await.unwrap();
        assert_eq!(exit, LoopExit::Shutdown);
        assert_eq!(
            client.await.unwrap().unwrap(),
            vec![ACK_REPLY.to_string(), ACK_REPLY.to_string(), QUIT_REPLY.to_string()]
        );

        session.teardown();
    }

    #[tokio::test]
    async fn test_interrupt_bypasses_run_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(display(), &control_config(&dir)).unwrap();

        let exit = session.run(async {}).await.unwrap();
        assert_eq!(exit, LoopExit::Interrupted);
        assert!(session.run_state().is_running());

        session.teardown();
        session.teardown();
    }

    #[tokio::test]
    async fn test_untracked_destroy_does_not_retile() {
        let dir = tempfile::tempdir().unwrap();
        let display = display().with_events([DisplayEvent::Destroyed { window: 42 }]);
        let mut session = Session::start(display, &control_config(&dir)).unwrap();

        // Display events are drained before the interrupt is looked at
        let exit = session.run(async {}).await.unwrap();
        assert_eq!(exit, LoopExit::Interrupted);
        assert!(session.state().registry.is_empty());
        assert_eq!(session.state().display.requests(), &[DisplayRequest::Flush]);

        session.teardown();
    }
}
