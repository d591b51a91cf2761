use crate::calendar::{Calendar, CalendarView, Moved, OutOfTimeError};
use crate::config::{Config, Settings};
use crate::datefmt::DatePattern;
use crate::editor::{editor_command, launch_editor};
use crate::help::Help;
use crate::jumpto::{JumpTo, JumpToInput, JumpToOutput, JumpToState};
use crate::notelist::{NoteList, NoteListState};
use crate::notes::{render_template, FileEvent, NoteIndex, NoteState, Subscription, Vault};
use crate::refresh::{Redraw, RefreshCoordinator};
use crate::scratch::{ScratchPad, ScratchView};
use crate::theme::{ACTIVE_TAB_STYLE, BASE_STYLE, HINT_STYLE, NOTICE_STYLE};
use crossterm::event::{self, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{enable_raw_mode, EnterAlternateScreen};
use log::{debug, info, warn};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Paragraph, StatefulWidget, Tabs, Widget},
    Terminal,
};
use std::collections::VecDeque;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};
use time::{Date, OffsetDateTime, UtcOffset};

/// How long to block on terminal input when no redraw is pending.  File
/// events are drained at least this often.
const IDLE_TICK: Duration = Duration::from_millis(250);

const TAB_TITLES: [&str; 3] = ["Calendar", "Notes", "Scratch"];

#[derive(Debug)]
pub(crate) struct App<V> {
    vault: V,
    config: Config,
    config_path: PathBuf,
    offset: UtcOffset,
    index: NoteIndex,
    calendar: CalendarView,
    notelist: NoteListState,
    scratch: ScratchPad,
    refresh: RefreshCoordinator,
    sender: Sender<FileEvent>,
    events: Receiver<FileEvent>,
    subscription: Option<Subscription>,
    tab: Tab,
    state: AppState,
    notices: VecDeque<String>,
    pending_edit: Option<String>,
}

impl<V: Vault> App<V> {
    pub(crate) fn new(
        vault: V,
        config: Config,
        config_path: PathBuf,
        today: Date,
        offset: UtcOffset,
    ) -> App<V> {
        let (sender, events) = channel();
        App {
            index: NoteIndex::new(&config, offset),
            calendar: CalendarView::new(today, config.period_reference),
            notelist: NoteListState::new(),
            scratch: ScratchPad::new(config.scratch_file.clone()),
            refresh: RefreshCoordinator::new(config.debounce, config.max_wait),
            vault,
            config,
            config_path,
            offset,
            sender,
            events,
            subscription: None,
            tab: Tab::Calendar,
            state: AppState::Normal,
            notices: VecDeque::new(),
            pending_edit: None,
        }
    }

    pub(crate) fn start_date(mut self, date: Date) -> App<V> {
        self.calendar = self.calendar.start_date(date);
        self
    }

    /// Queue a message for the status line
    pub(crate) fn notice<E: Error + ?Sized>(&mut self, err: &E) {
        let msg = describe(err);
        warn!("event=notice module=app message={msg:?}");
        self.notices.push_back(msg);
    }

    /// Index the vault, start watching it, and load the scratch pad
    pub(crate) fn activate(&mut self) {
        self.rebuild_index();
        match self.vault.subscribe(self.sender.clone()) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => self.notice(&e),
        }
        if let Err(e) = self.scratch.load(&self.vault) {
            self.notice(&e);
        }
        self.refresh.on_navigate(Instant::now());
    }

    fn rebuild_index(&mut self) {
        for e in self.index.rebuild(&self.vault) {
            self.notice(&e);
        }
    }

    pub(crate) fn run<B: Backend>(mut self, mut terminal: Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        self.activate();
        while !self.quitting() {
            self.tick(Instant::now());
            self.draw(&mut terminal)?;
            let timeout = self.poll_timeout(Instant::now());
            if event::poll(timeout)? {
                self.handle_input()?;
            }
            if let Some(path) = self.pending_edit.take() {
                self.edit(&mut terminal, &path)?;
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Process everything that has happened since the last pass: file events,
    /// a change of date, and any redraw that has come due
    fn tick(&mut self, now: Instant) {
        self.drain_file_events(now);
        let today = OffsetDateTime::now_utc().to_offset(self.offset).date();
        if self.calendar.set_today(today) {
            info!("event=day_change module=app today={today}");
            self.refresh.on_navigate(now);
        }
        self.flush_redraw(now);
    }

    fn drain_file_events(&mut self, now: Instant) {
        while let Ok(ev) = self.events.try_recv() {
            let dates = self.index.on_file_event(ev);
            self.refresh.schedule(dates, now);
        }
    }

    fn flush_redraw(&mut self, now: Instant) {
        if let Some(redraw) = self.refresh.poll(now) {
            let touched = self.calendar.apply(&redraw, &self.index);
            let scope = match redraw {
                Redraw::Full => "full",
                Redraw::Cells(_) => "cells",
            };
            debug!("event=redraw module=app scope={scope} cells={touched}");
        }
        let selected = self.calendar.selected();
        self.notelist.refresh(selected, &self.index.lookup(selected));
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        self.refresh
            .next_deadline()
            .map_or(IDLE_TICK, |d| d.saturating_duration_since(now).min(IDLE_TICK))
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        terminal.draw(|frame| frame.render_widget(self, frame.area()))?;
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = event::read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize, and we might as well redraw on other stuff
        // too
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        self.notices.pop_front();
        match &mut self.state {
            AppState::Normal => match self.tab {
                Tab::Calendar => self.handle_calendar_key(key),
                Tab::Notes => self.handle_notes_key(key),
                Tab::Scratch => self.handle_scratch_key(key),
            },
            AppState::Helping => {
                self.state = AppState::Normal;
                true
            }
            AppState::Jumping(state) => {
                let input = match key {
                    KeyCode::Esc => {
                        self.state = AppState::Normal;
                        return true;
                    }
                    KeyCode::Char(c) => JumpToInput::Char(c),
                    KeyCode::Backspace | KeyCode::Delete => JumpToInput::Backspace,
                    KeyCode::Enter => JumpToInput::Enter,
                    _ => return false,
                };
                match state.handle_input(input, self.config.daily.pattern()) {
                    JumpToOutput::Ok => true,
                    JumpToOutput::Invalid => false,
                    JumpToOutput::Jump(date) => {
                        self.state = AppState::Normal;
                        let moved = self.calendar.jump_to_date(date);
                        self.moved(moved);
                        true
                    }
                }
            }
            AppState::Quitting => false,
        }
    }

    fn handle_calendar_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => self.open_selected_day(),
            KeyCode::Char('z') | KeyCode::PageDown => {
                let r = self.calendar.next_period();
                self.navigated(r)
            }
            KeyCode::Char('w') | KeyCode::PageUp => {
                let r = self.calendar.previous_period();
                self.navigated(r)
            }
            KeyCode::Char('0') | KeyCode::Home => {
                let moved = self.calendar.jump_to_today();
                self.moved(moved);
                true
            }
            KeyCode::Char('v') => {
                let moved = self.calendar.toggle_kind();
                self.moved(moved);
                true
            }
            KeyCode::Char('g') => {
                self.state = AppState::Jumping(JumpToState::new());
                true
            }
            _ => self.handle_common_key(key),
        }
    }

    fn handle_notes_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('j') | KeyCode::Down => self.notelist.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.notelist.select_previous(),
            KeyCode::Enter => match self.notelist.selected() {
                Some(entry) => {
                    self.pending_edit = Some(entry.path.clone());
                    true
                }
                None => self.open_selected_day(),
            },
            _ => self.handle_common_key(key),
        }
    }

    fn handle_scratch_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char(c) => {
                self.scratch.insert(c);
                true
            }
            KeyCode::Enter => {
                self.scratch.insert('\n');
                true
            }
            KeyCode::Backspace => self.scratch.backspace(),
            KeyCode::Esc => {
                self.switch_tab(Tab::Calendar);
                true
            }
            KeyCode::Tab => {
                self.switch_tab(self.tab.next());
                true
            }
            KeyCode::BackTab => {
                self.switch_tab(self.tab.previous());
                true
            }
            _ => false,
        }
    }

    /// Keys that mean the same on the calendar and the notes list
    fn handle_common_key(&mut self, key: KeyCode) -> bool {
        let days = match key {
            KeyCode::Char('h') | KeyCode::Left => -1,
            KeyCode::Char('l') | KeyCode::Right => 1,
            KeyCode::Char('j') | KeyCode::Down => 7,
            KeyCode::Char('k') | KeyCode::Up => -7,
            KeyCode::Tab => {
                self.switch_tab(self.tab.next());
                return true;
            }
            KeyCode::BackTab => {
                self.switch_tab(self.tab.previous());
                return true;
            }
            KeyCode::Char('r') => {
                self.reload();
                return true;
            }
            KeyCode::Char('?') => {
                self.state = AppState::Helping;
                return true;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.state = AppState::Quitting;
                return true;
            }
            _ => return false,
        };
        let r = self.calendar.move_days(days);
        self.navigated(r)
    }

    fn navigated(&mut self, r: Result<Moved, OutOfTimeError>) -> bool {
        match r {
            Ok(moved) => {
                self.moved(moved);
                true
            }
            Err(e) => {
                debug!("event=navigate module=app status=failed error={e}");
                false
            }
        }
    }

    fn moved(&mut self, moved: Moved) {
        if moved == Moved::Period {
            self.refresh.on_navigate(Instant::now());
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.tab == Tab::Scratch && tab != Tab::Scratch {
            self.save_scratch();
        }
        self.tab = tab;
    }

    fn save_scratch(&mut self) {
        if let Err(e) = self.scratch.save(&self.vault) {
            self.notice(&e);
        }
    }

    /// Create the selected day's daily note if it does not exist yet, then
    /// queue it for editing
    fn open_selected_day(&mut self) -> bool {
        let date = self.calendar.selected();
        if let Some(path) = self.index.lookup(date).daily_path {
            self.pending_edit = Some(path);
            return true;
        }
        let path = self.config.daily.canonical_path(date);
        let contents = self.new_note_contents(date);
        match self.vault.create_note(&path, &contents) {
            Ok(file) => {
                info!("event=open_daily module=app date={date} path={path:?}");
                let dates = self.index.on_file_event(FileEvent::Created(file));
                self.refresh.schedule(dates, Instant::now());
                self.pending_edit = Some(path);
                true
            }
            Err(e) => {
                self.notice(&e);
                false
            }
        }
    }

    fn new_note_contents(&mut self, date: Date) -> String {
        let Some(template_path) = self.config.template.clone() else {
            return String::new();
        };
        match self.vault.read_note(&template_path) {
            Ok(template) => {
                let iso = DatePattern::default().format(date);
                let title = self.config.daily.pattern().format(date);
                render_template(&template, &iso, &title)
            }
            Err(e) => {
                self.notice(&e);
                String::new()
            }
        }
    }

    /// Hand the terminal to the user's editor for the note at `path`
    fn edit<B: Backend>(&mut self, terminal: &mut Terminal<B>, path: &str) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        let command = editor_command();
        let abs = self.vault.absolute_path(path);
        info!("event=editor module=app command={command:?} path={path:?}");
        ratatui::restore();
        let r = launch_editor(&command, &abs);
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        if let Err(e) = r {
            self.notice(&e);
        }
        Ok(())
    }

    /// Re-read the settings file and rebuild everything derived from it
    fn reload(&mut self) {
        let settings = match Settings::load(&self.config_path) {
            Ok(settings) => settings,
            Err(e) => {
                self.notice(&e);
                return;
            }
        };
        let (config, errors) = settings.resolve();
        for e in &errors {
            self.notice(e);
        }
        info!(
            "event=reload module=app path={} errors={}",
            self.config_path.display(),
            errors.len()
        );
        self.apply_config(config);
    }

    fn apply_config(&mut self, config: Config) {
        self.refresh.set_timing(config.debounce, config.max_wait);
        self.calendar.set_reference(config.period_reference);
        if config.scratch_file != self.config.scratch_file {
            self.save_scratch();
            self.scratch = ScratchPad::new(config.scratch_file.clone());
            if let Err(e) = self.scratch.load(&self.vault) {
                self.notice(&e);
            }
        }
        self.index = NoteIndex::new(&config, self.offset);
        self.config = config;
        self.rebuild_index();
        self.refresh.on_navigate(Instant::now());
    }

    fn shutdown(&mut self) {
        self.save_scratch();
        self.subscription = None;
        info!("event=app_stop module=app status=ok");
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        self.state == AppState::Quitting
    }

    fn status_line(&self) -> Line<'_> {
        match self.notices.front() {
            Some(msg) => Line::styled(msg.as_str(), NOTICE_STYLE),
            None => {
                let selected = self.calendar.selected();
                let state = match self.index.lookup(selected).state {
                    NoteState::None => "no daily note",
                    NoteState::Created => "created",
                    NoteState::Modified => "modified",
                };
                Line::styled(
                    format!(
                        "{}  {state}  ({} notes indexed)  ? for help",
                        self.config.daily.pattern().format(selected),
                        self.index.len()
                    ),
                    HINT_STYLE,
                )
            }
        }
    }
}

impl<V: Vault> Widget for &mut App<V> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        let [tabs_area, main_area, status_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);
        Tabs::new(TAB_TITLES)
            .style(BASE_STYLE)
            .highlight_style(ACTIVE_TAB_STYLE)
            .select(self.tab.index())
            .render(tabs_area, buf);
        match self.tab {
            Tab::Calendar => {
                Calendar::new(self.config.theme, &self.config.title).render(
                    main_area,
                    buf,
                    &mut self.calendar,
                );
            }
            Tab::Notes => {
                let heading = self.config.daily.pattern().format(self.calendar.selected());
                NoteList::new(&self.config.theme, &heading).render(
                    main_area,
                    buf,
                    &mut self.notelist,
                );
            }
            Tab::Scratch => ScratchView::new(&self.scratch, BASE_STYLE).render(main_area, buf),
        }
        Paragraph::new(self.status_line()).render(status_area, buf);
        if self.state == AppState::Helping {
            Help(BASE_STYLE).render(area, buf);
        } else if let AppState::Jumping(ref mut state) = self.state {
            JumpTo::new(self.config.daily.pattern()).render(area, buf, state);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Tab {
    Calendar,
    Notes,
    Scratch,
}

impl Tab {
    fn index(self) -> usize {
        match self {
            Tab::Calendar => 0,
            Tab::Notes => 1,
            Tab::Scratch => 2,
        }
    }

    fn next(self) -> Tab {
        match self {
            Tab::Calendar => Tab::Notes,
            Tab::Notes => Tab::Scratch,
            Tab::Scratch => Tab::Calendar,
        }
    }

    fn previous(self) -> Tab {
        match self {
            Tab::Calendar => Tab::Scratch,
            Tab::Notes => Tab::Calendar,
            Tab::Scratch => Tab::Notes,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum AppState {
    Normal,
    Helping,
    Jumping(JumpToState),
    Quitting,
}

/// Render an error and its chain of causes on one line
fn describe<E: Error + ?Sized>(err: &E) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        msg.push_str(": ");
        msg.push_str(&e.to_string());
        source = e.source();
    }
    msg
}
