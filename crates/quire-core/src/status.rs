//! The status message shown under the text area.

/// A message that disappears after a few key presses.
#[derive(Debug, Clone, Default)]
pub struct Status {
    message: Option<String>,
    ticks_left: u32,
    ticks: u32,
}

impl Status {
    /// A status that keeps messages for `ticks` key presses.
    pub fn new(ticks: u32) -> Self {
        Self {
            message: None,
            ticks_left: 0,
            ticks: ticks.max(1),
        }
    }

    pub fn set(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%message, "status");
        self.message = Some(message);
        self.ticks_left = self.ticks;
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Counts one key press, dropping the message when it has run out.
    pub fn tick(&mut self) {
        if self.message.is_none() {
            return;
        }
        self.ticks_left = self.ticks_left.saturating_sub(1);
        if self.ticks_left == 0 {
            self.message = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_expires() {
        let mut status = Status::new(2);
        status.set("saved!");
        status.tick();
        assert_eq!(status.message(), Some("saved!"));
        status.tick();
        assert_eq!(status.message(), None);
    }

    #[test]
    fn test_set_restarts_countdown() {
        let mut status = Status::new(2);
        status.set("a");
        status.tick();
        status.set("b");
        status.tick();
        assert_eq!(status.message(), Some("b"));
    }
}
