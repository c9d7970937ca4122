use crate::events::WindowId;
use std::fmt;

/// A top-level window under management. Geometry is never cached here;
/// the tiling engine derives it on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagedWindow {
    window: WindowId,
}

impl ManagedWindow {
    pub fn new(window: WindowId) -> Self {
        Self { window }
    }

    pub fn id(&self) -> WindowId {
        self.window
    }
}

/// Insertion-ordered set of managed windows. The head is the master.
///
/// Mutation happens only by appending at the tail and by removing a given
/// identifier; identifiers are unique.
#[derive(Debug, Default, Clone)]
pub struct WindowRegistry {
    windows: Vec<ManagedWindow>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `window` at the tail. Returns `false` without touching the
    /// registry when the identifier is already managed.
    pub fn add(&mut self, window: WindowId) -> bool {
        if self.find(window).is_some() {
            return false;
        }
        self.windows.push(ManagedWindow::new(window));
        true
    }

    /// Remove the entry for `window`. Returns `false` ("not found") and
    /// leaves the registry unchanged if it is not managed.
    pub fn remove(&mut self, window: WindowId) -> bool {
        match self.position(window) {
            Some(index) => {
                // `remove`, not `swap_remove`: the order decides master and stack
                self.windows.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn find(&self, window: WindowId) -> Option<&ManagedWindow> {
        self.windows.iter().find(|managed| managed.window == window)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.find(window).is_some()
    }

    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Lazy traversal in insertion order; call again to restart.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ManagedWindow> + '_ {
        self.windows.iter()
    }

    pub fn windows(&self) -> &[ManagedWindow] {
        &self.windows
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(ManagedWindow::id).collect()
    }

    fn position(&self, window: WindowId) -> Option<usize> {
        self.windows.iter().position(|managed| managed.window == window)
    }
}

impl<'a> IntoIterator for &'a WindowRegistry {
    type Item = &'a ManagedWindow;
    type IntoIter = std::slice::Iter<'a, ManagedWindow>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}

impl fmt::Display for WindowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} window(s)", self.windows.len())?;
        for (index, managed) in self.windows.iter().enumerate() {
            write!(f, "\n{} - 0x{:x}", index + 1, managed.window)?;
        }
        Ok(())
    }
}
