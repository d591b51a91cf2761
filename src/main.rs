mod app;
mod calendar;
mod config;
mod datefmt;
mod editor;
mod help;
mod jumpto;
mod logging;
mod notelist;
mod notes;
mod refresh;
mod scratch;
mod theme;
use crate::app::App;
use crate::config::{Settings, CONFIG_FILE, STATE_DIR, YMD_FMT};
use crate::logging::init_logging;
use crate::notes::FsVault;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use time::{Date, OffsetDateTime};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run(RunOptions),
    Help,
    Version,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct RunOptions {
    vault: Option<PathBuf>,
    config: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    date: Option<Date>,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut opts = RunOptions::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Long("vault") => opts.vault = Some(PathBuf::from(parser.value()?)),
                Arg::Long("config") => opts.config = Some(PathBuf::from(parser.value()?)),
                Arg::Long("log-dir") => opts.log_dir = Some(PathBuf::from(parser.value()?)),
                Arg::Value(value) if opts.date.is_none() => {
                    let value = value.string()?;
                    match Date::parse(&value, &YMD_FMT) {
                        Ok(d) => opts.date = Some(d),
                        Err(e) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: Box::new(e),
                            })
                        }
                    }
                }
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run(opts))
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run(opts) => run(opts),
            Command::Help => {
                println!("Usage: dailycal [<options>] [YYYY-MM-DD]");
                println!();
                println!("Terminal calendar for browsing and creating daily Markdown notes");
                println!();
                println!("Options:");
                println!("  --vault DIR       Folder of notes [default: current directory]");
                println!("  --config FILE     Settings file");
                println!("                    [default: <vault>/.dailycal/config.toml]");
                println!("  --log-dir DIR     Log folder [default: <vault>/.dailycal/logs]");
                println!("  -h, --help        Display this help message and exit");
                println!("  -V, --version     Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn run(opts: RunOptions) -> anyhow::Result<()> {
    let vault_root = opts.vault.unwrap_or_else(|| PathBuf::from("."));
    let vault_root = vault_root
        .canonicalize()
        .with_context(|| format!("failed to open vault {}", vault_root.display()))?;
    let state_dir = vault_root.join(STATE_DIR);
    let config_path = opts.config.unwrap_or_else(|| state_dir.join(CONFIG_FILE));
    // An unreadable settings file is reported in the UI like any other
    // settings problem
    let (settings, load_error) = match Settings::load(&config_path) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    let (config, errors) = settings.resolve();
    let log_dir = opts.log_dir.unwrap_or_else(|| state_dir.join("logs"));
    // Logging problems are shown in the UI; the calendar runs without a log
    // if even the default level cannot be set up
    let (_logger, log_error) = match init_logging(&config.log_level, &log_dir) {
        Ok(handle) => (Some(handle), None),
        Err(e) => (
            init_logging(&Settings::default().log_level, &log_dir).ok(),
            Some(e),
        ),
    };
    let now = OffsetDateTime::now_local().context("failed to determine local date")?;
    let mut app = App::new(
        FsVault::new(vault_root),
        config,
        config_path,
        now.date(),
        now.offset(),
    );
    if let Some(date) = opts.date {
        app = app.start_date(date);
    }
    for e in load_error.iter().chain(&errors) {
        app.notice(e);
    }
    if let Some(e) = log_error {
        app.notice(&e);
    }
    with_terminal(|mut terminal| {
        terminal.hide_cursor().context("failed to hide cursor")?;
        app.run(terminal)?;
        Ok(())
    })
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}
