//! Access to the folder of notes on disk
use crate::datefmt::{strip_folder, NOTE_EXTENSION};
use log::{debug, info, warn};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use time::OffsetDateTime;
use walkdir::{DirEntry, WalkDir};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct NoteFile {
    /// Path relative to the vault root, with `/` separators
    pub(crate) path: String,
    pub(crate) created: OffsetDateTime,
    pub(crate) modified: OffsetDateTime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum FileEvent {
    Created(NoteFile),
    Modified(NoteFile),
    Deleted { path: String },
    Renamed { old_path: String, file: NoteFile },
    /// A folder was deleted or moved away, taking every note below it
    FolderRemoved { folder: String },
}

impl FileEvent {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            FileEvent::Created(_) => "created",
            FileEvent::Modified(_) => "modified",
            FileEvent::Deleted { .. } => "deleted",
            FileEvent::Renamed { .. } => "renamed",
            FileEvent::FolderRemoved { .. } => "folder_removed",
        }
    }

    pub(crate) fn path(&self) -> &str {
        match self {
            FileEvent::Created(file) | FileEvent::Modified(file) => &file.path,
            FileEvent::Renamed { file, .. } => &file.path,
            FileEvent::Deleted { path } => path,
            FileEvent::FolderRemoved { folder } => folder,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum VaultError {
    #[error("failed to list notes in {}", .path.display())]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to read {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid note path {0:?}")]
    InvalidPath(String),
    #[error("failed to watch vault for changes")]
    Watch(#[from] notify::Error),
}

/// The file system that notes live in
pub(crate) trait Vault {
    /// List every note at or below `folder`.  Fails if `folder` itself
    /// cannot be read.
    fn list_files(&self, folder: &str) -> Result<Vec<NoteFile>, VaultError>;

    fn read_note(&self, path: &str) -> Result<String, VaultError>;

    /// Write `contents` to the note at `path`, replacing it if it exists
    fn write_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError>;

    /// Create the note at `path` with `contents` unless it already exists,
    /// in which case the existing note is left untouched.
    fn create_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError>;

    /// Send an event to `sink` for every change to a note until the returned
    /// [`Subscription`] is dropped
    fn subscribe(&self, sink: Sender<FileEvent>) -> Result<Subscription, VaultError>;

    fn absolute_path(&self, path: &str) -> PathBuf;
}

/// Live subscription to vault changes.  Dropping it stops the watcher.
#[derive(Debug)]
pub(crate) struct Subscription {
    watcher: Option<RecommendedWatcher>,
}

impl Subscription {
    #[cfg(test)]
    pub(crate) fn detached() -> Subscription {
        Subscription { watcher: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.watcher.take().is_some() {
            info!("event=unsubscribe module=vault");
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub(crate) fn new<P: Into<PathBuf>>(root: P) -> FsVault {
        FsVault { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let rel = Path::new(path);
        if path.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(VaultError::InvalidPath(path.to_owned()));
        }
        Ok(self.root.join(rel))
    }

    fn note_file(&self, rel: String, abs: &Path) -> Result<NoteFile, VaultError> {
        stat(rel, abs).map_err(|source| VaultError::Read {
            path: abs.to_path_buf(),
            source,
        })
    }
}

impl Vault for FsVault {
    fn list_files(&self, folder: &str) -> Result<Vec<NoteFile>, VaultError> {
        let dir = if folder.is_empty() {
            self.root.clone()
        } else {
            self.resolve(folder)?
        };
        let files = walk_notes(&self.root, &dir).map_err(|source| VaultError::List {
            path: dir.clone(),
            source,
        })?;
        debug!(
            "event=list module=vault folder={folder:?} files={}",
            files.len()
        );
        Ok(files)
    }

    fn read_note(&self, path: &str) -> Result<String, VaultError> {
        let abs = self.resolve(path)?;
        fs::read_to_string(&abs).map_err(|source| VaultError::Read { path: abs, source })
    }

    fn write_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError> {
        let abs = self.resolve(path)?;
        let write_err = |source: io::Error| VaultError::Write {
            path: abs.clone(),
            source,
        };
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&abs, contents).map_err(write_err)?;
        self.note_file(path.to_owned(), &abs)
    }

    fn create_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError> {
        let abs = self.resolve(path)?;
        let write_err = |source: io::Error| VaultError::Write {
            path: abs.clone(),
            source,
        };
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&abs) {
            Ok(mut fp) => {
                fp.write_all(contents.as_bytes()).map_err(write_err)?;
                info!("event=create_note module=vault path={path:?}");
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => (),
            Err(e) => return Err(write_err(e)),
        }
        self.note_file(path.to_owned(), &abs)
    }

    fn subscribe(&self, sink: Sender<FileEvent>) -> Result<Subscription, VaultError> {
        let root = self.root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for ev in translate(&root, &event) {
                        if sink.send(ev).is_err() {
                            // Receiver is gone; the subscription is being torn
                            // down.
                            return;
                        }
                    }
                }
                Err(e) => warn!("event=watch_error module=vault error={e}"),
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(
            "event=subscribe module=vault root={}",
            self.root.display()
        );
        Ok(Subscription {
            watcher: Some(watcher),
        })
    }

    fn absolute_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Every note at or below `dir`.  Only a failure to read `dir` itself is an
/// error; unreadable entries below it are logged and skipped.
fn walk_notes(root: &Path, dir: &Path) -> Result<Vec<NoteFile>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e),
            Err(e) => {
                warn!("event=list_skip module=vault error={e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_note_path(root, entry.path()) else {
            continue;
        };
        match stat(rel, entry.path()) {
            Ok(file) => files.push(file),
            Err(e) => warn!(
                "event=list_skip module=vault path={} error={e}",
                entry.path().display()
            ),
        }
    }
    Ok(files)
}

fn stat(rel: String, abs: &Path) -> io::Result<NoteFile> {
    let md = fs::metadata(abs)?;
    let modified = OffsetDateTime::from(md.modified()?);
    // Not every platform records creation times
    let created = md.created().map_or(modified, OffsetDateTime::from);
    Ok(NoteFile {
        path: rel,
        created,
        modified,
    })
}

/// Convert an absolute path to a vault-relative note path.  Returns `None`
/// for paths outside the vault, inside hidden directories, or that are not
/// Markdown notes.
fn relative_note_path(root: &Path, path: &Path) -> Option<String> {
    relative_path(root, path).filter(|rel| rel.ends_with(NOTE_EXTENSION))
}

/// Vault-relative path of something that may have been a folder of notes
fn relative_folder(root: &Path, path: &Path) -> Option<String> {
    relative_path(root, path).filter(|rel| !rel.is_empty() && !rel.ends_with(NOTE_EXTENSION))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for c in rel.components() {
        let Component::Normal(part) = c else {
            return None;
        };
        let part = part.to_str()?;
        if part.starts_with('.') {
            return None;
        }
        parts.push(part);
    }
    Some(parts.join("/"))
}

/// A creation event for every note below the folder `dir`
fn notes_below(root: &Path, dir: &Path) -> Vec<FileEvent> {
    match walk_notes(root, dir) {
        Ok(files) => files.into_iter().map(FileEvent::Created).collect(),
        Err(e) => {
            warn!("event=watch_walk module=vault status=failed error={e}");
            Vec::new()
        }
    }
}

/// Translate a raw watcher event into note events
fn translate(root: &Path, event: &notify::Event) -> Vec<FileEvent> {
    let rel = |p: &PathBuf| relative_note_path(root, p);
    let existing = |p: &PathBuf| {
        let r = rel(p)?;
        stat(r, p).ok()
    };
    // A folder that appears brings its notes along
    let arrived = |p: &PathBuf| {
        if p.is_dir() {
            notes_below(root, p)
        } else {
            existing(p).map(FileEvent::Created).into_iter().collect()
        }
    };
    // A vanished path that was not a note may have been a folder
    let departed = |p: &PathBuf| {
        rel(p).map(|path| FileEvent::Deleted { path }).or_else(|| {
            relative_folder(root, p).map(|folder| FileEvent::FolderRemoved { folder })
        })
    };
    match (&event.kind, event.paths.as_slice()) {
        (EventKind::Create(_), paths) => paths.iter().flat_map(arrived).collect(),
        (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, to]) if to.is_dir() => {
            relative_folder(root, from)
                .map(|folder| FileEvent::FolderRemoved { folder })
                .into_iter()
                .chain(notes_below(root, to))
                .collect()
        }
        (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, to]) => {
            match (rel(from), existing(to)) {
                (Some(old_path), Some(file)) => vec![FileEvent::Renamed { old_path, file }],
                (Some(path), None) => vec![FileEvent::Deleted { path }],
                (None, Some(file)) => vec![FileEvent::Created(file)],
                (None, None) => Vec::new(),
            }
        }
        (EventKind::Modify(ModifyKind::Name(RenameMode::From)), paths)
        | (EventKind::Remove(_), paths) => paths.iter().filter_map(departed).collect(),
        (EventKind::Modify(ModifyKind::Name(RenameMode::To)), paths) => {
            paths.iter().flat_map(arrived).collect()
        }
        (EventKind::Modify(ModifyKind::Name(_)), paths) => paths
            .iter()
            .flat_map(|p| {
                if p.exists() {
                    arrived(p)
                } else {
                    departed(p).into_iter().collect()
                }
            })
            .collect(),
        (EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other), paths) => {
            paths
                .iter()
                .filter_map(existing)
                .map(FileEvent::Modified)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Returns whether `path` lies within any of `folders`
pub(crate) fn in_any_folder(path: &str, folders: &[String]) -> bool {
    folders.iter().any(|f| strip_folder(path, f).is_some())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory vault for exercising code that consumes a [`Vault`]
    #[derive(Debug, Default)]
    pub(crate) struct MemoryVault {
        pub(crate) files: RefCell<BTreeMap<String, (NoteFile, String)>>,
        pub(crate) unreadable: Vec<String>,
    }

    impl MemoryVault {
        pub(crate) fn with_files<I: IntoIterator<Item = NoteFile>>(files: I) -> MemoryVault {
            let vault = MemoryVault::default();
            for f in files {
                vault
                    .files
                    .borrow_mut()
                    .insert(f.path.clone(), (f, String::new()));
            }
            vault
        }
    }

    impl Vault for MemoryVault {
        fn list_files(&self, folder: &str) -> Result<Vec<NoteFile>, VaultError> {
            if self.unreadable.iter().any(|f| f == folder) {
                return Err(VaultError::Read {
                    path: PathBuf::from(folder),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            Ok(self
                .files
                .borrow()
                .values()
                .filter(|(f, _)| strip_folder(&f.path, folder).is_some())
                .map(|(f, _)| f.clone())
                .collect())
        }

        fn read_note(&self, path: &str) -> Result<String, VaultError> {
            self.files
                .borrow()
                .get(path)
                .map(|(_, text)| text.clone())
                .ok_or_else(|| VaultError::Read {
                    path: PathBuf::from(path),
                    source: io::Error::from(io::ErrorKind::NotFound),
                })
        }

        fn write_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError> {
            let now = OffsetDateTime::UNIX_EPOCH;
            let file = NoteFile {
                path: path.to_owned(),
                created: now,
                modified: now,
            };
            self.files
                .borrow_mut()
                .insert(path.to_owned(), (file.clone(), contents.to_owned()));
            Ok(file)
        }

        fn create_note(&self, path: &str, contents: &str) -> Result<NoteFile, VaultError> {
            if let Some((file, _)) = self.files.borrow().get(path) {
                return Ok(file.clone());
            }
            self.write_note(path, contents)
        }

        fn subscribe(&self, _sink: Sender<FileEvent>) -> Result<Subscription, VaultError> {
            Ok(Subscription::detached())
        }

        fn absolute_path(&self, path: &str) -> PathBuf {
            PathBuf::from("/vault").join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_list_files() {
        let tmp = tempdir().unwrap();
        touch(tmp.path(), "Daily Notes/2025-03-02.md");
        touch(tmp.path(), "Daily Notes/2025-03-03.md");
        touch(tmp.path(), "Projects/Plan.md");
        touch(tmp.path(), "Projects/image.png");
        touch(tmp.path(), ".dailycal/scratch.md");
        let vault = FsVault::new(tmp.path());
        let mut paths = vault
            .list_files("")
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(
            paths,
            [
                "Daily Notes/2025-03-02.md",
                "Daily Notes/2025-03-03.md",
                "Projects/Plan.md"
            ]
        );
        let daily = vault.list_files("Daily Notes").unwrap();
        assert_eq!(daily.len(), 2);
        assert!(daily.iter().all(|f| f.created <= f.modified));
    }

    #[test]
    fn test_list_missing_folder() {
        let tmp = tempdir().unwrap();
        let vault = FsVault::new(tmp.path());
        assert!(matches!(
            vault.list_files("Nowhere"),
            Err(VaultError::List { .. })
        ));
    }

    #[test]
    fn test_create_note_keeps_existing() {
        let tmp = tempdir().unwrap();
        let vault = FsVault::new(tmp.path());
        let file = vault
            .create_note("Daily Notes/2025-03-02.md", "# New\n")
            .unwrap();
        assert_eq!(file.path, "Daily Notes/2025-03-02.md");
        assert_eq!(
            vault.read_note("Daily Notes/2025-03-02.md").unwrap(),
            "# New\n"
        );
        vault
            .create_note("Daily Notes/2025-03-02.md", "# Replaced\n")
            .unwrap();
        assert_eq!(
            vault.read_note("Daily Notes/2025-03-02.md").unwrap(),
            "# New\n"
        );
    }

    #[test]
    fn test_write_note() {
        let tmp = tempdir().unwrap();
        let vault = FsVault::new(tmp.path());
        vault.write_note("a/b.md", "one").unwrap();
        vault.write_note("a/b.md", "two").unwrap();
        assert_eq!(vault.read_note("a/b.md").unwrap(), "two");
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let tmp = tempdir().unwrap();
        let vault = FsVault::new(tmp.path());
        assert!(matches!(
            vault.create_note("../outside.md", ""),
            Err(VaultError::InvalidPath(_))
        ));
        assert!(matches!(
            vault.read_note(""),
            Err(VaultError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_relative_note_path() {
        let root = Path::new("/vault");
        assert_eq!(
            relative_note_path(root, Path::new("/vault/Daily/2025-03-02.md")),
            Some(String::from("Daily/2025-03-02.md"))
        );
        assert_eq!(relative_note_path(root, Path::new("/vault/x.txt")), None);
        assert_eq!(
            relative_note_path(root, Path::new("/vault/.trash/x.md")),
            None
        );
        assert_eq!(relative_note_path(root, Path::new("/elsewhere/x.md")), None);
        assert_eq!(
            relative_folder(root, Path::new("/vault/Daily Notes")),
            Some(String::from("Daily Notes"))
        );
        assert_eq!(relative_folder(root, Path::new("/vault")), None);
        assert_eq!(relative_folder(root, Path::new("/vault/x.md")), None);
    }

    #[test]
    fn test_translate() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        touch(root, "2025-03-03.md");
        let created = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(root.join("2025-03-03.md"));
        assert!(matches!(
            translate(root, &created).as_slice(),
            [FileEvent::Created(f)] if f.path == "2025-03-03.md"
        ));
        let modified = notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(root.join("2025-03-03.md"));
        assert!(matches!(
            translate(root, &modified).as_slice(),
            [FileEvent::Modified(f)] if f.path == "2025-03-03.md"
        ));
        let removed = notify::Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(root.join("gone.md"));
        assert_eq!(
            translate(root, &removed),
            [FileEvent::Deleted {
                path: String::from("gone.md")
            }]
        );
        let renamed = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("2025-03-02.md"))
            .add_path(root.join("2025-03-03.md"));
        assert!(matches!(
            translate(root, &renamed).as_slice(),
            [FileEvent::Renamed { old_path, file }]
                if old_path == "2025-03-02.md" && file.path == "2025-03-03.md"
        ));
        let ignored = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(root.join("picture.png"));
        assert!(translate(root, &ignored).is_empty());
    }

    #[test]
    fn test_translate_folder_moves() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        touch(root, "Journal/2025-03-02.md");
        touch(root, "Journal/cover.png");
        touch(root, "Journal/.trash/2025-03-01.md");
        let renamed = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("Daily Notes"))
            .add_path(root.join("Journal"));
        let events = translate(root, &renamed);
        assert_eq!(
            events[0],
            FileEvent::FolderRemoved {
                folder: String::from("Daily Notes")
            }
        );
        assert!(matches!(
            &events[1..],
            [FileEvent::Created(f)] if f.path == "Journal/2025-03-02.md"
        ));
        let moved_out = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(root.join("Old/Sub"));
        assert_eq!(
            translate(root, &moved_out),
            [FileEvent::FolderRemoved {
                folder: String::from("Old/Sub")
            }]
        );
        let moved_in = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(root.join("Journal"));
        assert!(matches!(
            translate(root, &moved_in).as_slice(),
            [FileEvent::Created(f)] if f.path == "Journal/2025-03-02.md"
        ));
        let hidden = notify::Event::new(EventKind::Remove(RemoveKind::Folder))
            .add_path(root.join(".dailycal"));
        assert!(translate(root, &hidden).is_empty());
    }
}
