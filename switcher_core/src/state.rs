use crate::ports::Port;

/// Which port is active, and which one was active before the last change.
///
/// Lives only in memory: a new controller starts with both unset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    current: Option<Port>,
    last: Option<Port>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Port> {
        self.current
    }

    pub fn last(&self) -> Option<Port> {
        self.last
    }

    /// Make `port` current, remembering the previous one.
    pub(crate) fn assign(&mut self, port: Port) {
        self.last = self.current;
        self.current = Some(port);
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
