use async_trait::async_trait;
use livestyle_lib::host::{Clipboard, Notifier};
use livestyle_lib::LiveStyleError;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

/// Alerts go to stderr; the one prompt the CLI can answer is answered with
/// text read up front.
pub struct TerminalNotifier {
    answer: RefCell<Option<String>>,
}

impl TerminalNotifier {
    pub fn new(answer: Option<String>) -> Self {
        TerminalNotifier {
            answer: RefCell::new(answer),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    fn prompt(&self, message: &str) -> Option<String> {
        log::debug!("prompt {message:?} answered from input");
        self.answer.borrow_mut().take()
    }
}

/// Writes clipboard text to a file, or to stdout when no file is given.
pub struct OutputClipboard {
    path: Option<PathBuf>,
}

impl OutputClipboard {
    pub fn new(path: Option<PathBuf>) -> Self {
        OutputClipboard { path }
    }
}

#[async_trait(?Send)]
impl Clipboard for OutputClipboard {
    async fn write_text(&self, text: &str) -> Result<(), LiveStyleError> {
        match &self.path {
            Some(path) => fs::write(path, text)
                .map_err(|err| LiveStyleError::Clipboard(format!("{}: {err}", path.display()))),
            None => {
                println!("{text}");
                Ok(())
            }
        }
    }
}
