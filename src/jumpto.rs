use crate::datefmt::DatePattern;
use crate::theme::{
    jumpto::{ERROR_STYLE, PLACEHOLDER_STYLE},
    BASE_STYLE,
};
use ratatui::{
    buffer::Buffer,
    layout::{Flex, HorizontalAlignment, Layout, Margin, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Clear, StatefulWidget, Widget},
};

const MIN_INNER_WIDTH: u16 = 13;
const OUTER_HEIGHT: u16 = 8;

const MAX_INPUT_LEN: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct JumpTo<'a> {
    pattern: &'a DatePattern,
}

impl<'a> JumpTo<'a> {
    pub(crate) fn new(pattern: &'a DatePattern) -> JumpTo<'a> {
        JumpTo { pattern }
    }
}

impl StatefulWidget for JumpTo<'_> {
    type State = JumpToState;

    /*
     * .................
     * .┌─ Jump To… ──┐.
     * .│             │.
     * .│ YYYY-MM-DD  │.
     * .│             │.
     * .│ bad date    │.
     * .└─────────────┘.
     * .................
     */

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let text = state.to_text(self.pattern);
        let inner = u16::try_from(text.width())
            .unwrap_or(u16::MAX)
            .max(MIN_INNER_WIDTH);
        let outer_width = inner.saturating_add(4).min(area.width);
        let [outer_area] = Layout::horizontal([outer_width])
            .flex(Flex::Center)
            .areas(area);
        let [outer_area] = Layout::vertical([OUTER_HEIGHT])
            .flex(Flex::Center)
            .areas(outer_area);
        Clear.render(outer_area, buf);
        Block::new().style(BASE_STYLE).render(outer_area, buf);
        let block_area = outer_area.inner(Margin::new(1, 1));
        Block::bordered()
            .title(" Jump To… ")
            .title_alignment(HorizontalAlignment::Center)
            .render(block_area, buf);
        let text_area = block_area.inner(Margin::new(1, 1));
        text.render(text_area, buf);
    }
}

/// Date typed so far in the jump-to dialog
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct JumpToState {
    input: String,
    error: Option<String>,
}

impl JumpToState {
    pub(crate) fn new() -> JumpToState {
        JumpToState::default()
    }

    fn to_text(&self, pattern: &DatePattern) -> Text<'static> {
        let entry = if self.input.is_empty() {
            Line::styled(pattern.as_str().to_owned(), PLACEHOLDER_STYLE)
        } else {
            Line::from_iter([
                Span::styled(self.input.clone(), BASE_STYLE),
                Span::styled("_", PLACEHOLDER_STYLE),
            ])
        };
        let status = match &self.error {
            Some(e) => Line::styled(e.clone(), ERROR_STYLE),
            None => Line::styled("[ENTER]", BASE_STYLE),
        };
        Text::from_iter([
            Line::styled("", BASE_STYLE),
            entry,
            Line::styled("", BASE_STYLE),
            status,
        ])
        .centered()
    }

    pub(crate) fn handle_input(
        &mut self,
        input: JumpToInput,
        pattern: &DatePattern,
    ) -> JumpToOutput {
        match input {
            JumpToInput::Char(c) if !c.is_control() && self.input.len() < MAX_INPUT_LEN => {
                self.input.push(c);
                self.error = None;
                JumpToOutput::Ok
            }
            JumpToInput::Backspace if self.input.pop().is_some() => {
                self.error = None;
                JumpToOutput::Ok
            }
            JumpToInput::Enter if !self.input.is_empty() => {
                match pattern.parse(self.input.trim()) {
                    Ok(date) => JumpToOutput::Jump(date),
                    Err(e) => {
                        self.error = Some(e.to_string());
                        JumpToOutput::Invalid
                    }
                }
            }
            _ => JumpToOutput::Invalid,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum JumpToInput {
    Char(char),
    Backspace,
    Enter,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum JumpToOutput {
    Ok,
    Invalid,
    Jump(time::Date),
}
