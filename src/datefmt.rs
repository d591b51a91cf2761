//! Conversion between calendar dates and note paths.
//!
//! Patterns use a small token language:
//!
//! | token  | meaning                              |
//! |--------|--------------------------------------|
//! | `YYYY` | four-digit year                      |
//! | `MMMM` | full month name (`March`)            |
//! | `MMM`  | abbreviated month name (`Mar`)       |
//! | `MM`   | two-digit month                      |
//! | `M`    | month without padding                |
//! | `DD`   | two-digit day of month               |
//! | `D`    | day of month without padding         |
//! | `dddd` | full weekday name (`Sunday`)         |
//! | `ddd`  | abbreviated weekday name (`Sun`)     |
//! | `[..]` | literal text                         |
//!
//! Any other non-letter character stands for itself, so `/` places daily
//! notes in sub-folders.
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;
use time::{Date, Month, Weekday};

pub(crate) const DEFAULT_DAILY_FORMAT: &str = "YYYY-MM-DD";

pub(crate) const DEFAULT_TITLE_FORMAT: &str = "MMMM YYYY";

pub(crate) const NOTE_EXTENSION: &str = ".md";

static MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

static WEEKDAYS: [Weekday; 7] = [
    Weekday::Sunday,
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Year,
    MonthName,
    MonthAbbrev,
    MonthPadded,
    MonthNumber,
    DayPadded,
    DayNumber,
    WeekdayName,
    WeekdayAbbrev,
    Literal(String),
}

impl Token {
    fn component(&self) -> Option<Component> {
        match self {
            Token::Year => Some(Component::Year),
            Token::MonthName | Token::MonthAbbrev | Token::MonthPadded | Token::MonthNumber => {
                Some(Component::Month)
            }
            Token::DayPadded | Token::DayNumber => Some(Component::Day),
            Token::WeekdayName | Token::WeekdayAbbrev | Token::Literal(_) => None,
        }
    }

    fn is_variable_width_number(&self) -> bool {
        matches!(self, Token::MonthNumber | Token::DayNumber)
    }

    fn starts_with_digit(&self) -> bool {
        match self {
            Token::Literal(s) => s.starts_with(|c: char| c.is_ascii_digit()),
            Token::Year
            | Token::MonthPadded
            | Token::MonthNumber
            | Token::DayPadded
            | Token::DayNumber => true,
            Token::MonthName | Token::MonthAbbrev | Token::WeekdayName | Token::WeekdayAbbrev => {
                false
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Component {
    Year,
    Month,
    Day,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Year => write!(f, "year"),
            Component::Month => write!(f, "month"),
            Component::Day => write!(f, "day"),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum PatternError {
    #[error("unsupported token {0:?} in date pattern")]
    Unsupported(String),
    #[error("unterminated literal in date pattern")]
    UnterminatedLiteral,
    #[error("date pattern has no {0} token")]
    Missing(Component),
    #[error("date pattern has more than one {0} token")]
    Duplicate(Component),
    #[error("date pattern is ambiguous: unpadded number is followed by a digit")]
    Ambiguous,
    #[error("date pattern is empty")]
    Empty,
}

/// Failure to read a date out of text with a [`DatePattern`]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ParseDateError {
    #[error("expected {expected} at offset {offset}")]
    Expected {
        expected: &'static str,
        offset: usize,
    },
    #[error("unexpected trailing text {0:?}")]
    Trailing(String),
    #[error("pattern cannot produce a {0}")]
    Missing(Component),
    #[error("weekday does not match the date")]
    WeekdayMismatch,
    #[error(transparent)]
    Range(#[from] time::error::ComponentRange),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct DatePattern {
    source: String,
    tokens: Vec<Token>,
}

impl DatePattern {
    /// Compile a pattern that is only ever used for display, such as the
    /// month title.
    pub(crate) fn compile(source: &str) -> Result<DatePattern, PatternError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut chars = source.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '[' {
                let mut lit = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => lit.push(c),
                        None => return Err(PatternError::UnterminatedLiteral),
                    }
                }
                push_literal(&mut tokens, &lit);
            } else if ch.is_alphabetic() {
                let run = 1 + take_run(&mut chars, ch);
                let token = match (ch, run) {
                    ('Y', 4) => Token::Year,
                    ('M', 4) => Token::MonthName,
                    ('M', 3) => Token::MonthAbbrev,
                    ('M', 2) => Token::MonthPadded,
                    ('M', 1) => Token::MonthNumber,
                    ('D', 2) => Token::DayPadded,
                    ('D', 1) => Token::DayNumber,
                    ('d', 4) => Token::WeekdayName,
                    ('d', 3) => Token::WeekdayAbbrev,
                    _ => return Err(PatternError::Unsupported(ch.to_string().repeat(run))),
                };
                tokens.push(token);
            } else {
                push_literal(&mut tokens, ch.encode_utf8(&mut [0; 4]));
            }
        }
        if tokens.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(DatePattern {
            source: source.to_owned(),
            tokens,
        })
    }

    /// Compile a pattern used for daily-note file names.  Such patterns must
    /// identify a date unambiguously so that formatting and parsing
    /// round-trip.
    pub(crate) fn daily(source: &str) -> Result<DatePattern, PatternError> {
        let pattern = DatePattern::compile(source)?;
        for comp in [Component::Year, Component::Month, Component::Day] {
            match pattern
                .tokens
                .iter()
                .filter(|t| t.component() == Some(comp))
                .count()
            {
                0 => return Err(PatternError::Missing(comp)),
                1 => (),
                _ => return Err(PatternError::Duplicate(comp)),
            }
        }
        if pattern
            .tokens
            .windows(2)
            .any(|w| matches!(w, [a, b] if a.is_variable_width_number() && b.starts_with_digit()))
        {
            return Err(PatternError::Ambiguous);
        }
        Ok(pattern)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn format(&self, date: Date) -> String {
        Formatted {
            tokens: &self.tokens,
            date,
        }
        .to_string()
    }

    pub(crate) fn parse(&self, text: &str) -> Result<Date, ParseDateError> {
        let mut cursor = Cursor { text, offset: 0 };
        let mut year = None;
        let mut month = None;
        let mut day = None;
        let mut weekday = None;
        for token in &self.tokens {
            match token {
                Token::Year => year = Some(cursor.year()?),
                Token::MonthName => month = Some(cursor.month_name(false)?),
                Token::MonthAbbrev => month = Some(cursor.month_name(true)?),
                Token::MonthPadded => {
                    month = Some(Month::try_from(cursor.number(2, 2, "two-digit month")?)?);
                }
                Token::MonthNumber => {
                    month = Some(Month::try_from(cursor.number(1, 2, "month")?)?);
                }
                Token::DayPadded => day = Some(cursor.number(2, 2, "two-digit day")?),
                Token::DayNumber => day = Some(cursor.number(1, 2, "day")?),
                Token::WeekdayName => weekday = Some(cursor.weekday_name(false)?),
                Token::WeekdayAbbrev => weekday = Some(cursor.weekday_name(true)?),
                Token::Literal(lit) => cursor.literal(lit)?,
            }
        }
        if !cursor.rest().is_empty() {
            return Err(ParseDateError::Trailing(cursor.rest().to_owned()));
        }
        let year = year.ok_or(ParseDateError::Missing(Component::Year))?;
        let month = month.ok_or(ParseDateError::Missing(Component::Month))?;
        let day = day.ok_or(ParseDateError::Missing(Component::Day))?;
        let date = Date::from_calendar_date(year, month, day)?;
        if weekday.is_some_and(|wd| wd != date.weekday()) {
            return Err(ParseDateError::WeekdayMismatch);
        }
        Ok(date)
    }
}

impl Default for DatePattern {
    fn default() -> DatePattern {
        DatePattern {
            source: String::from(DEFAULT_DAILY_FORMAT),
            tokens: vec![
                Token::Year,
                Token::Literal(String::from("-")),
                Token::MonthPadded,
                Token::Literal(String::from("-")),
                Token::DayPadded,
            ],
        }
    }
}

impl fmt::Display for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn push_literal(tokens: &mut Vec<Token>, s: &str) {
    if let Some(Token::Literal(prev)) = tokens.last_mut() {
        prev.push_str(s);
    } else {
        tokens.push(Token::Literal(s.to_owned()));
    }
}

fn take_run(chars: &mut Peekable<Chars<'_>>, ch: char) -> usize {
    let mut qty = 0;
    while chars.next_if_eq(&ch).is_some() {
        qty += 1;
    }
    qty
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Formatted<'a> {
    tokens: &'a [Token],
    date: Date,
}

impl fmt::Display for Formatted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date;
        for token in self.tokens {
            match token {
                Token::Year => {
                    if date.year() < 0 {
                        write!(f, "-{:04}", date.year().unsigned_abs())?;
                    } else {
                        write!(f, "{:04}", date.year())?;
                    }
                }
                Token::MonthName => write!(f, "{}", date.month())?,
                Token::MonthAbbrev => write!(f, "{}", abbreviate(&date.month().to_string()))?,
                Token::MonthPadded => write!(f, "{:02}", u8::from(date.month()))?,
                Token::MonthNumber => write!(f, "{}", u8::from(date.month()))?,
                Token::DayPadded => write!(f, "{:02}", date.day())?,
                Token::DayNumber => write!(f, "{}", date.day())?,
                Token::WeekdayName => write!(f, "{}", date.weekday())?,
                Token::WeekdayAbbrev => {
                    write!(f, "{}", abbreviate(&date.weekday().to_string()))?;
                }
                Token::Literal(s) => write!(f, "{s}")?,
            }
        }
        Ok(())
    }
}

fn abbreviate(name: &str) -> &str {
    name.get(..3).unwrap_or(name)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Cursor<'a> {
    text: &'a str,
    offset: usize,
}

impl Cursor<'_> {
    fn rest(&self) -> &str {
        self.text.get(self.offset..).unwrap_or_default()
    }

    fn expected(&self, expected: &'static str) -> ParseDateError {
        ParseDateError::Expected {
            expected,
            offset: self.offset,
        }
    }

    fn digits(&self) -> usize {
        self.rest().bytes().take_while(u8::is_ascii_digit).count()
    }

    fn number(&mut self, min: usize, max: usize, what: &'static str) -> Result<u8, ParseDateError> {
        let len = self.digits().min(max);
        if len < min {
            return Err(self.expected(what));
        }
        let value = self
            .rest()
            .get(..len)
            .and_then(|s| s.parse::<u8>().ok())
            .ok_or_else(|| self.expected(what))?;
        self.offset += len;
        Ok(value)
    }

    fn year(&mut self) -> Result<i32, ParseDateError> {
        let negative = self.rest().starts_with('-');
        if negative {
            self.offset += 1;
        }
        if self.digits() < 4 {
            return Err(self.expected("four-digit year"));
        }
        let year = self
            .rest()
            .get(..4)
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| self.expected("four-digit year"))?;
        self.offset += 4;
        Ok(if negative { -year } else { year })
    }

    fn month_name(&mut self, abbreviated: bool) -> Result<Month, ParseDateError> {
        let found = MONTHS.iter().copied().find_map(|m| {
            let name = m.to_string();
            let name = if abbreviated {
                abbreviate(&name).to_owned()
            } else {
                name
            };
            self.match_word(&name).map(|len| (m, len))
        });
        let (month, len) = found.ok_or_else(|| self.expected("month name"))?;
        self.offset += len;
        Ok(month)
    }

    fn weekday_name(&mut self, abbreviated: bool) -> Result<Weekday, ParseDateError> {
        let found = WEEKDAYS.iter().copied().find_map(|wd| {
            let name = wd.to_string();
            let name = if abbreviated {
                abbreviate(&name).to_owned()
            } else {
                name
            };
            self.match_word(&name).map(|len| (wd, len))
        });
        let (weekday, len) = found.ok_or_else(|| self.expected("weekday name"))?;
        self.offset += len;
        Ok(weekday)
    }

    // Case-insensitive prefix match; returns the matched byte length
    fn match_word(&self, word: &str) -> Option<usize> {
        let candidate = self.rest().get(..word.len())?;
        candidate.eq_ignore_ascii_case(word).then_some(word.len())
    }

    fn literal(&mut self, lit: &str) -> Result<(), ParseDateError> {
        if self.rest().starts_with(lit) {
            self.offset += lit.len();
            Ok(())
        } else {
            Err(self.expected("literal text"))
        }
    }
}

/// Maps dates to canonical daily-note paths within a folder of the vault
/// and back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct DailyNotePaths {
    folder: String,
    pattern: DatePattern,
}

impl DailyNotePaths {
    pub(crate) fn new(folder: &str, pattern: DatePattern) -> DailyNotePaths {
        DailyNotePaths {
            folder: normalize_folder(folder),
            pattern,
        }
    }

    pub(crate) fn folder(&self) -> &str {
        &self.folder
    }

    pub(crate) fn pattern(&self) -> &DatePattern {
        &self.pattern
    }

    pub(crate) fn canonical_path(&self, date: Date) -> String {
        let name = self.pattern.format(date);
        if self.folder.is_empty() {
            format!("{name}{NOTE_EXTENSION}")
        } else {
            format!("{}/{name}{NOTE_EXTENSION}", self.folder)
        }
    }

    /// Returns the date that the note at `path` is the daily note for, if
    /// any.  Paths outside the daily folder never map to a date.
    pub(crate) fn date_for_path(&self, path: &str) -> Option<Date> {
        let rel = strip_folder(path, &self.folder)?;
        let stem = rel.strip_suffix(NOTE_EXTENSION)?;
        self.pattern.parse(stem).ok()
    }
}

/// Strip leading and trailing slashes so that folders compare as plain
/// prefixes.
pub(crate) fn normalize_folder(folder: &str) -> String {
    folder.trim_matches('/').to_owned()
}

/// Returns the part of `path` inside `folder`, or `None` if `path` is not
/// inside it.  The empty folder is the vault root and contains everything.
pub(crate) fn strip_folder<'a>(path: &'a str, folder: &str) -> Option<&'a str> {
    if folder.is_empty() {
        Some(path)
    } else {
        path.strip_prefix(folder)?.strip_prefix('/')
    }
}
