// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use jpkr_grid::{Clipboard, ClipboardError};
use log::debug;
use std::fmt;

/// The desktop clipboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClipboard")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl SystemClipboard {
    fn open(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(map_error)?;
            debug!("clipboard opened");
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("clipboard not open".to_owned()))
    }
}

impl Clipboard for SystemClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        match self.open()?.get_text() {
            Ok(text) => Ok(text),
            // Nothing textual on the clipboard; the grid reports it as empty.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(error) => Err(map_error(error)),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.open()?.set_text(text).map_err(map_error)
    }
}

fn map_error(error: arboard::Error) -> ClipboardError {
    match error {
        arboard::Error::ConversionFailure => {
            ClipboardError::Unavailable("clipboard content is not valid UTF-8 text".to_owned())
        }
        arboard::Error::ClipboardOccupied => {
            ClipboardError::Unavailable("clipboard is busy; try again".to_owned())
        }
        other => {
            let message = other.to_string();
            let lower = message.to_ascii_lowercase();
            if lower.contains("denied") || lower.contains("permission") {
                ClipboardError::Denied
            } else {
                ClipboardError::Unavailable(message)
            }
        }
    }
}
