//! User settings.
//!
//! [`Settings`] is the raw contents of the TOML settings file.  Resolving it
//! produces an immutable [`Config`] snapshot that the rest of the program is
//! built from; a setting that does not validate falls back to its default
//! and is reported as a [`ConfigError`] rather than aborting.
use crate::datefmt::{
    normalize_folder, DailyNotePaths, DatePattern, PatternError, DEFAULT_DAILY_FORMAT,
    DEFAULT_TITLE_FORMAT,
};
use crate::theme::Theme;
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

pub(crate) static YMD_FMT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Directory within the vault holding the settings file, logs, and the
/// scratch pad
pub(crate) const STATE_DIR: &str = ".dailycal";

pub(crate) const CONFIG_FILE: &str = "config.toml";

const DEFAULT_PERIOD_REFERENCE: &str = "2023-01-01";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) daily_format: String,
    pub(crate) title_format: String,
    pub(crate) daily_folder: String,
    pub(crate) note_folders: Vec<String>,
    pub(crate) ignore_folders: Vec<String>,
    pub(crate) template: Option<String>,
    pub(crate) scratch_file: String,
    pub(crate) reload_interval_ms: u64,
    pub(crate) max_wait_ms: u64,
    pub(crate) modified_threshold_secs: u32,
    pub(crate) period_reference: String,
    pub(crate) log_level: String,
    pub(crate) theme: ThemeSettings,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            daily_format: String::from(DEFAULT_DAILY_FORMAT),
            title_format: String::from(DEFAULT_TITLE_FORMAT),
            daily_folder: String::new(),
            note_folders: vec![String::new()],
            ignore_folders: Vec::new(),
            template: None,
            scratch_file: format!("{STATE_DIR}/scratch.md"),
            reload_interval_ms: 500,
            max_wait_ms: 3000,
            modified_threshold_secs: 60,
            period_reference: String::from(DEFAULT_PERIOD_REFERENCE),
            log_level: String::from("info"),
            theme: ThemeSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub(crate) struct ThemeSettings {
    pub(crate) created: String,
    pub(crate) modified: String,
    pub(crate) other: String,
    pub(crate) today: String,
    pub(crate) show_period_numbers: bool,
    pub(crate) show_other_notes: bool,
}

impl Default for ThemeSettings {
    fn default() -> ThemeSettings {
        ThemeSettings {
            created: String::from("green"),
            modified: String::from("yellow"),
            other: String::from("lightblue"),
            today: String::from("lightmagenta"),
            show_period_numbers: true,
            show_other_notes: true,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read settings from {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings in {}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid daily_format {value:?}, using {:?}", DEFAULT_DAILY_FORMAT)]
    DailyFormat { value: String, source: PatternError },
    #[error("invalid title_format {value:?}, using {:?}", DEFAULT_TITLE_FORMAT)]
    TitleFormat { value: String, source: PatternError },
    #[error("invalid period_reference {value:?}, using {:?}", DEFAULT_PERIOD_REFERENCE)]
    PeriodReference {
        value: String,
        source: time::error::Parse,
    },
    #[error("invalid color {value:?} for theme.{key}")]
    Color { key: &'static str, value: String },
}

impl Settings {
    /// Read settings from `path`.  A missing file means all defaults.
    pub(crate) fn load(path: &Path) -> Result<Settings, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the settings into a [`Config`], substituting defaults for
    /// invalid values
    pub(crate) fn resolve(&self) -> (Config, Vec<ConfigError>) {
        let mut errors = Vec::new();
        let daily_pattern = DatePattern::daily(&self.daily_format).unwrap_or_else(|source| {
            errors.push(ConfigError::DailyFormat {
                value: self.daily_format.clone(),
                source,
            });
            DatePattern::default()
        });
        let title = DatePattern::compile(&self.title_format)
            .or_else(|source| {
                errors.push(ConfigError::TitleFormat {
                    value: self.title_format.clone(),
                    source,
                });
                DatePattern::compile(DEFAULT_TITLE_FORMAT)
            })
            .unwrap_or_default();
        let period_reference =
            Date::parse(&self.period_reference, &YMD_FMT).unwrap_or_else(|source| {
                errors.push(ConfigError::PeriodReference {
                    value: self.period_reference.clone(),
                    source,
                });
                default_period_reference()
            });
        let theme = self.theme.resolve(&mut errors);
        let config = Config {
            daily: DailyNotePaths::new(&self.daily_folder, daily_pattern),
            title,
            note_folders: self
                .note_folders
                .iter()
                .map(|f| normalize_folder(f))
                .collect(),
            ignore_folders: self
                .ignore_folders
                .iter()
                .map(|f| normalize_folder(f))
                .filter(|f| !f.is_empty())
                .collect(),
            template: self
                .template
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(with_note_extension),
            scratch_file: with_note_extension(self.scratch_file.trim_matches('/')),
            debounce: Duration::from_millis(self.reload_interval_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
            modified_threshold: time::Duration::seconds(i64::from(self.modified_threshold_secs)),
            period_reference,
            log_level: self.log_level.clone(),
            theme,
        };
        (config, errors)
    }
}

impl ThemeSettings {
    fn resolve(&self, errors: &mut Vec<ConfigError>) -> Theme {
        let defaults = ThemeSettings::default();
        let mut color = |key: &'static str, value: &str, default: &str| {
            value.parse::<Color>().unwrap_or_else(|_| {
                errors.push(ConfigError::Color {
                    key,
                    value: value.to_owned(),
                });
                default.parse::<Color>().unwrap_or(Color::Reset)
            })
        };
        Theme {
            created: color("created", &self.created, &defaults.created),
            modified: color("modified", &self.modified, &defaults.modified),
            other: color("other", &self.other, &defaults.other),
            today: color("today", &self.today, &defaults.today),
            show_period_numbers: self.show_period_numbers,
            show_other_notes: self.show_other_notes,
        }
    }
}

fn default_period_reference() -> Date {
    Date::parse(DEFAULT_PERIOD_REFERENCE, &YMD_FMT).unwrap_or(Date::MIN)
}

fn with_note_extension(path: &str) -> String {
    if path.ends_with(".md") {
        path.to_owned()
    } else {
        format!("{path}.md")
    }
}

/// Resolved, validated settings
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Config {
    pub(crate) daily: DailyNotePaths,
    pub(crate) title: DatePattern,
    pub(crate) note_folders: Vec<String>,
    pub(crate) ignore_folders: Vec<String>,
    pub(crate) template: Option<String>,
    pub(crate) scratch_file: String,
    pub(crate) debounce: Duration,
    pub(crate) max_wait: Duration,
    pub(crate) modified_threshold: time::Duration,
    pub(crate) period_reference: Date,
    pub(crate) log_level: String,
    pub(crate) theme: Theme,
}

impl Default for Config {
    fn default() -> Config {
        Settings::default().resolve().0
    }
}
