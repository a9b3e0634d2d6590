//! User-facing surfaces the tool talks to: the clipboard and blocking
//! alert / prompt dialogs.

use crate::error::LiveStyleError;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[async_trait(?Send)]
pub trait Clipboard {
    async fn write_text(&self, text: &str) -> Result<(), LiveStyleError>;
}

/// Blocking dialogs, like `alert()` and `prompt()`.
pub trait Notifier {
    fn alert(&self, message: &str);

    /// `None` when the user cancels.
    fn prompt(&self, message: &str) -> Option<String>;
}

/// Keeps the last written text. Clones share it.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Rc<RefCell<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.text.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), LiveStyleError> {
        *self.text.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

/// Records alerts and answers prompts from a queue. An empty queue answers
/// like a cancelled prompt.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    alerts: Rc<RefCell<Vec<String>>>,
    answers: Rc<RefCell<VecDeque<Option<String>>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_answer(&self, answer: Option<&str>) {
        self.answers
            .borrow_mut()
            .push_back(answer.map(str::to_string));
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub fn last_alert(&self) -> Option<String> {
        self.alerts.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }

    fn prompt(&self, _message: &str) -> Option<String> {
        self.answers.borrow_mut().pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_clipboard_keeps_last_text() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.contents(), None);
        block_on(clipboard.clone().write_text("one")).unwrap();
        block_on(clipboard.write_text("two")).unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some("two"));
    }

    #[test]
    fn test_recording_notifier_answers_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.queue_answer(Some("{}"));
        notifier.queue_answer(None);
        assert_eq!(notifier.prompt("?").as_deref(), Some("{}"));
        assert_eq!(notifier.prompt("?"), None);
        assert_eq!(notifier.prompt("?"), None);

        notifier.alert("hello");
        assert_eq!(notifier.alerts(), vec!["hello".to_string()]);
    }
}
