use crate::notes::{Vault, VaultError};
use crate::theme::{HINT_STYLE, TITLE_STYLE};
use log::info;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Text},
    widgets::{Paragraph, Widget, Wrap},
};

/// A single free-form note kept in the vault, edited in place
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ScratchPad {
    path: String,
    text: String,
    dirty: bool,
}

impl ScratchPad {
    pub(crate) fn new(path: String) -> ScratchPad {
        ScratchPad {
            path,
            text: String::new(),
            dirty: false,
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read the pad from the vault.  A pad that does not exist yet is empty.
    pub(crate) fn load<V: Vault + ?Sized>(&mut self, vault: &V) -> Result<(), VaultError> {
        self.text = match vault.read_note(&self.path) {
            Ok(text) => text,
            Err(VaultError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                String::new()
            }
            Err(e) => return Err(e),
        };
        self.dirty = false;
        Ok(())
    }

    /// Write the pad back to the vault if it has unsaved edits
    pub(crate) fn save<V: Vault + ?Sized>(&mut self, vault: &V) -> Result<bool, VaultError> {
        if !self.dirty {
            return Ok(false);
        }
        vault.write_note(&self.path, &self.text)?;
        self.dirty = false;
        info!(
            "event=scratch_save module=scratch status=ok path={:?} bytes={}",
            self.path,
            self.text.len()
        );
        Ok(true)
    }

    pub(crate) fn insert(&mut self, ch: char) {
        self.text.push(ch);
        self.dirty = true;
    }

    pub(crate) fn backspace(&mut self) -> bool {
        let popped = self.text.pop().is_some();
        self.dirty |= popped;
        popped
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct ScratchView<'a> {
    pad: &'a ScratchPad,
    style: Style,
}

impl<'a> ScratchView<'a> {
    pub(crate) fn new(pad: &'a ScratchPad, style: Style) -> ScratchView<'a> {
        ScratchView { pad, style }
    }
}

impl Widget for ScratchView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [heading_area, body_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(area);
        let heading = if self.pad.is_dirty() {
            format!("{} [+]", self.pad.path())
        } else {
            self.pad.path().to_owned()
        };
        Paragraph::new(Line::styled(heading, TITLE_STYLE)).render(heading_area, buf);
        if self.pad.text().is_empty() {
            Paragraph::new(Line::styled(
                "Type to jot something down. Saved when you leave this tab.",
                HINT_STYLE,
            ))
            .render(body_area, buf);
            return;
        }
        let mut text = Text::styled(self.pad.text().to_owned(), self.style);
        text.push_span("_");
        // Keep the end of the pad, where typing happens, in view
        let lines = u16::try_from(text.height()).unwrap_or(u16::MAX);
        let scroll = lines.saturating_sub(body_area.height);
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(body_area, buf);
    }
}
