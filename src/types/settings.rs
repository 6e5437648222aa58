/// Engine-wide behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    exception_as_error_message: bool,
    format_error_messages: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exception_as_error_message: false,
            format_error_messages: true,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When a rule cannot be evaluated, report the evaluation error text as
    /// the result's error message instead of the rule's own message.
    #[must_use]
    pub fn exception_as_error_message(mut self, enabled: bool) -> Self {
        self.exception_as_error_message = enabled;
        self
    }

    /// Replace `$(Name)` placeholders in error messages with parameter values.
    #[must_use]
    pub fn format_error_messages(mut self, enabled: bool) -> Self {
        self.format_error_messages = enabled;
        self
    }

    #[must_use]
    pub fn exception_as_error_message_enabled(&self) -> bool {
        self.exception_as_error_message
    }

    #[must_use]
    pub fn format_error_messages_enabled(&self) -> bool {
        self.format_error_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(!settings.exception_as_error_message_enabled());
        assert!(settings.format_error_messages_enabled());
    }

    #[test]
    fn builder_toggles() {
        let settings = Settings::new()
            .exception_as_error_message(true)
            .format_error_messages(false);
        assert!(settings.exception_as_error_message_enabled());
        assert!(!settings.format_error_messages_enabled());
    }
}
