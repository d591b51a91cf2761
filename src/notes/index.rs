use super::vault::in_any_folder;
use super::{FileEvent, NoteFile, NoteLookup, NoteState, NoteStatus, Vault, VaultError};
use crate::config::Config;
use crate::datefmt::{strip_folder, DailyNotePaths, NOTE_EXTENSION};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use time::{Date, Duration, Month, UtcOffset};

static EMBEDDED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("embedded date regex should compile")
});

#[derive(Clone, Debug, Eq, PartialEq)]
struct DailyEntry {
    path: String,
    state: NoteState,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Placement {
    Daily(Date),
    Other(Date),
}

impl Placement {
    fn date(self) -> Date {
        match self {
            Placement::Daily(d) | Placement::Other(d) => d,
        }
    }
}

/// Which notes exist for which dates.
///
/// Each date has at most one canonical daily note.  When several files
/// parse as the daily note for the same date, the first in path order wins
/// and the rest are listed as other notes for that date until the winner
/// goes away.
#[derive(Clone, Debug)]
pub(crate) struct NoteIndex {
    paths: DailyNotePaths,
    note_folders: Vec<String>,
    ignore_folders: Vec<String>,
    modified_threshold: Duration,
    offset: UtcOffset,
    daily: HashMap<Date, DailyEntry>,
    others: HashMap<Date, BTreeSet<String>>,
    // Daily-note candidates currently listed among the other notes, with the
    // state they would have if promoted
    shadowed: HashMap<String, NoteState>,
    placements: HashMap<String, Placement>,
}

impl NoteIndex {
    pub(crate) fn new(config: &Config, offset: UtcOffset) -> NoteIndex {
        NoteIndex {
            paths: config.daily.clone(),
            note_folders: config.note_folders.clone(),
            ignore_folders: config.ignore_folders.clone(),
            modified_threshold: config.modified_threshold,
            offset,
            daily: HashMap::new(),
            others: HashMap::new(),
            shadowed: HashMap::new(),
            placements: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.placements.len()
    }

    /// Discard everything and index the vault from scratch.
    ///
    /// A folder that cannot be listed is skipped, leaving its notes out of
    /// the index; the failures are returned for the caller to report.
    pub(crate) fn rebuild<V: Vault + ?Sized>(&mut self, vault: &V) -> Vec<VaultError> {
        self.daily.clear();
        self.others.clear();
        self.shadowed.clear();
        self.placements.clear();
        let mut failures = Vec::new();
        let mut files = Vec::new();
        for folder in self.scan_roots() {
            match vault.list_files(&folder) {
                Ok(listed) => files.extend(listed),
                Err(e) => {
                    warn!("event=scan module=index status=failed folder={folder:?} error={e}");
                    failures.push(e);
                }
            }
        }
        // Sort so that "first match wins" does not depend on listing order
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        for file in files {
            self.insert(file, None);
        }
        info!(
            "event=scan module=index status=ok notes={} daily={}",
            self.placements.len(),
            self.daily.len()
        );
        failures
    }

    /// The folders to list so that every indexable note is seen exactly once
    fn scan_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        let candidates = std::iter::once(self.paths.folder().to_owned())
            .chain(self.note_folders.iter().cloned());
        for folder in candidates {
            if roots.iter().any(|r| strip_folder(&folder, r).is_some() || *r == folder) {
                continue;
            }
            roots.retain(|r| strip_folder(r, &folder).is_none());
            roots.push(folder);
        }
        roots
    }

    pub(crate) fn lookup(&self, date: Date) -> NoteStatus {
        let daily = self.daily.get(&date);
        NoteStatus {
            state: daily.map_or(NoteState::None, |e| e.state),
            daily_path: daily.map(|e| e.path.clone()),
            other_notes: self.others.get(&date).cloned().unwrap_or_default(),
        }
    }

    /// Apply a change reported by the vault.  Returns the dates whose status
    /// may have changed.
    pub(crate) fn on_file_event(&mut self, event: FileEvent) -> BTreeSet<Date> {
        debug!(
            "event=file_event module=index kind={} path={:?}",
            event.kind(),
            event.path()
        );
        let mut dates = BTreeSet::new();
        match event {
            FileEvent::Created(file) => {
                let state = self.classify(&file);
                dates.extend(self.update(file, state));
            }
            FileEvent::Modified(file) => {
                dates.extend(self.update(file, NoteState::Modified));
            }
            FileEvent::Deleted { path } => {
                dates.extend(self.remove(&path).0);
            }
            FileEvent::FolderRemoved { folder } => {
                dates.extend(self.remove_folder(&folder));
            }
            FileEvent::Renamed { old_path, file } => {
                let (old_date, prior) = self.remove(&old_path);
                dates.extend(old_date);
                dates.extend(self.remove(&file.path).0);
                dates.extend(self.insert(file, prior));
            }
        }
        dates
    }

    fn accepts(&self, path: &str) -> bool {
        path.ends_with(NOTE_EXTENSION)
            && !in_any_folder(path, &self.ignore_folders)
            && (strip_folder(path, self.paths.folder()).is_some()
                || in_any_folder(path, &self.note_folders))
    }

    fn classify(&self, file: &NoteFile) -> NoteState {
        if file.modified - file.created > self.modified_threshold {
            NoteState::Modified
        } else {
            NoteState::Created
        }
    }

    /// Date for a note that is not a daily note: a `YYYY-MM-DD` in its file
    /// name, else the day it was last modified
    fn heuristic_date(&self, file: &NoteFile) -> Date {
        let stem = file.path.rsplit('/').next().unwrap_or(&file.path);
        EMBEDDED_DATE
            .captures_iter(stem)
            .find_map(|caps| {
                let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
                let month = caps.get(2)?.as_str().parse::<u8>().ok()?;
                let day = caps.get(3)?.as_str().parse::<u8>().ok()?;
                Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
            })
            .unwrap_or_else(|| file.modified.to_offset(self.offset).date())
    }

    fn insert(&mut self, file: NoteFile, state: Option<NoteState>) -> Option<Date> {
        if !self.accepts(&file.path) {
            return None;
        }
        if let Some(date) = self.paths.date_for_path(&file.path) {
            let state = state.unwrap_or_else(|| self.classify(&file));
            let loses = self.daily.get(&date).is_some_and(|w| w.path < file.path);
            if loses {
                self.shadow(date, file.path, state);
            } else {
                let entry = DailyEntry {
                    path: file.path.clone(),
                    state,
                };
                if let Some(displaced) = self.daily.insert(date, entry) {
                    self.shadow(date, displaced.path, displaced.state);
                }
                self.placements.insert(file.path, Placement::Daily(date));
            }
            Some(date)
        } else {
            // Anything in scope that is not a daily note is an other note,
            // including undated files in the daily folder
            let date = self.heuristic_date(&file);
            self.others.entry(date).or_default().insert(file.path.clone());
            self.placements.insert(file.path, Placement::Other(date));
            Some(date)
        }
    }

    /// List a daily-note candidate that lost to the canonical note for `date`
    fn shadow(&mut self, date: Date, path: String, state: NoteState) {
        self.shadowed.insert(path.clone(), state);
        self.others.entry(date).or_default().insert(path.clone());
        self.placements.insert(path, Placement::Other(date));
    }

    /// Give the note at `file.path` the state `state`, indexing it if it is
    /// new.  Daily-note candidates keep their place; other notes are filed
    /// again since their date may follow their modification time.
    fn update(&mut self, file: NoteFile, state: NoteState) -> BTreeSet<Date> {
        match self.placements.get(&file.path).copied() {
            Some(Placement::Daily(date)) => {
                if let Some(entry) = self.daily.get_mut(&date) {
                    entry.state = state;
                }
                BTreeSet::from([date])
            }
            Some(Placement::Other(date)) if self.shadowed.contains_key(&file.path) => {
                self.shadowed.insert(file.path, state);
                BTreeSet::from([date])
            }
            _ => {
                let mut dates = BTreeSet::new();
                dates.extend(self.remove(&file.path).0);
                dates.extend(self.insert(file, Some(state)));
                dates
            }
        }
    }

    /// Forget every note at or below `folder`
    fn remove_folder(&mut self, folder: &str) -> BTreeSet<Date> {
        let paths = self
            .placements
            .keys()
            .filter(|p| strip_folder(p, folder).is_some())
            .cloned()
            .collect::<Vec<_>>();
        let mut dates = BTreeSet::new();
        for path in paths {
            dates.extend(self.remove(&path).0);
        }
        dates
    }

    /// Forget the note at `path`.  Returns the date it was filed under and,
    /// if it was a daily note, its state.
    fn remove(&mut self, path: &str) -> (Option<Date>, Option<NoteState>) {
        let Some(placement) = self.placements.remove(path) else {
            return (None, None);
        };
        let date = placement.date();
        let state = match placement {
            Placement::Daily(_) => {
                let state = self.daily.remove(&date).map(|e| e.state);
                self.promote_shadowed(date);
                state
            }
            Placement::Other(_) => {
                self.remove_other(date, path);
                self.shadowed.remove(path)
            }
        };
        (Some(date), state)
    }

    fn remove_other(&mut self, date: Date, path: &str) {
        if let Some(set) = self.others.get_mut(&date) {
            set.remove(path);
            if set.is_empty() {
                self.others.remove(&date);
            }
        }
    }

    fn promote_shadowed(&mut self, date: Date) {
        let Some(path) = self
            .others
            .get(&date)
            .and_then(|set| set.iter().find(|p| self.shadowed.contains_key(*p)))
            .cloned()
        else {
            return;
        };
        let state = self.shadowed.remove(&path).unwrap_or_default();
        self.remove_other(date, &path);
        self.placements.insert(path.clone(), Placement::Daily(date));
        self.daily.insert(date, DailyEntry { path, state });
    }
}

impl NoteLookup for NoteIndex {
    fn state(&self, date: Date) -> NoteState {
        self.daily.get(&date).map_or(NoteState::None, |e| e.state)
    }

    fn other_count(&self, date: Date) -> usize {
        self.others.get(&date).map_or(0, BTreeSet::len)
    }
}
