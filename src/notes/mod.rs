mod index;
mod vault;
pub(crate) use self::index::NoteIndex;
pub(crate) use self::vault::{FileEvent, FsVault, NoteFile, Subscription, Vault, VaultError};
#[cfg(test)]
pub(crate) use self::vault::testing;
use std::collections::BTreeSet;
use time::Date;

/// What is known about the canonical daily note of a date
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub(crate) enum NoteState {
    #[default]
    None,
    Created,
    Modified,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct NoteStatus {
    pub(crate) state: NoteState,
    pub(crate) daily_path: Option<String>,
    pub(crate) other_notes: BTreeSet<String>,
}

/// Source of note status for calendar cells
pub(crate) trait NoteLookup {
    fn state(&self, date: Date) -> NoteState;

    fn other_count(&self, date: Date) -> usize;
}

impl<T: NoteLookup + ?Sized> NoteLookup for &T {
    fn state(&self, date: Date) -> NoteState {
        (**self).state(date)
    }

    fn other_count(&self, date: Date) -> usize {
        (**self).other_count(date)
    }
}

/// Fill in a new daily note's template.  `{{date}}` and `{{title}}` are
/// replaced with the formatted date and the note's file name.
pub(crate) fn render_template(template: &str, date: &str, title: &str) -> String {
    template
        .replace("{{date}}", date)
        .replace("{{title}}", title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        assert_eq!(
            render_template("# {{title}}\n\nWritten {{date}}.\n", "2025-03-02", "Sunday"),
            "# Sunday\n\nWritten 2025-03-02.\n"
        );
        assert_eq!(render_template("", "2025-03-02", "x"), "");
    }
}
