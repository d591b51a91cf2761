use crate::theme::{HINT_STYLE, TITLE_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Flex, HorizontalAlignment, Layout, Rect},
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Padding, Paragraph, Widget},
};

/// Width of the key column
const KEYS_WIDTH: usize = 20;

/// Key bindings per panel, in the order the panels are listed in the tab bar
static SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Calendar",
        &[
            ("h, l, LEFT, RIGHT", "Previous/next day"),
            ("j, k, DOWN, UP", "Next/previous week"),
            ("w, PAGE UP", "Previous month or week"),
            ("z, PAGE DOWN", "Next month or week"),
            ("0, HOME", "Jump to today"),
            ("g", "Input date to jump to"),
            ("v", "Toggle month/week view"),
            ("ENTER", "Open or create the daily note"),
        ],
    ),
    (
        "Notes",
        &[
            ("j, k, DOWN, UP", "Select a note"),
            ("h, l, LEFT, RIGHT", "Previous/next day"),
            ("ENTER", "Open the selected note"),
        ],
    ),
    (
        "Scratch",
        &[
            ("BACKSPACE", "Delete the last character"),
            ("ESC", "Save and return to the calendar"),
        ],
    ),
    (
        "Anywhere else",
        &[
            ("TAB, SHIFT-TAB", "Switch panel"),
            ("r", "Reload settings and notes"),
            ("?", "Show this help"),
            ("q, ESC", "Quit"),
        ],
    ),
];

const DISMISS: &str = "Press the Any Key to dismiss.";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Help(pub(crate) Style);

impl Help {
    fn text(self) -> Text<'static> {
        let mut lines = Vec::new();
        for &(panel, keys) in SECTIONS {
            lines.push(Line::styled(panel, TITLE_STYLE));
            lines.extend(keys.iter().map(|&(key, action)| {
                Line::from_iter([
                    Span::raw(format!("  {key:<KEYS_WIDTH$}")),
                    Span::raw(action),
                ])
            }));
            lines.push(Line::default());
        }
        lines.push(Line::styled(DISMISS, HINT_STYLE));
        Text::from(lines).style(self.0)
    }
}

impl Widget for Help {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = self.text();
        let height = u16::try_from(text.height())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .min(area.height);
        let width = u16::try_from(text.width())
            .unwrap_or(u16::MAX)
            .saturating_add(4)
            .min(area.width);
        let [help_area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
        let [help_area] = Layout::vertical([height])
            .flex(Flex::Center)
            .areas(help_area);
        Clear.render(help_area, buf);
        Paragraph::new(text)
            .block(
                Block::bordered()
                    .title(" Keys ")
                    .title_alignment(HorizontalAlignment::Center)
                    .padding(Padding::horizontal(1)),
            )
            .style(self.0)
            .render(help_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::BASE_STYLE;

    fn render(width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        Help(BASE_STYLE).render(area, &mut buffer);
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_help_box() {
        let rows = render(80, 40);
        let top = rows.iter().position(|r| r.contains(" Keys ")).unwrap();
        assert!(rows[top].trim().starts_with('┌'));
        // The widest line is the ESC binding of the scratch pad
        let inner = 2 + KEYS_WIDTH + "Save and return to the calendar".len();
        assert_eq!(rows[top + 1].trim(), format!("│ {:<inner$} │", "Calendar"));
        assert!(rows[top + 2].contains("  h, l, LEFT, RIGHT   Previous/next day"));
        let dismiss = rows.iter().position(|r| r.contains(DISMISS)).unwrap();
        assert!(rows[dismiss + 1].trim().starts_with('└'));
        for (panel, _) in SECTIONS {
            assert!(rows.iter().any(|r| r.contains(panel)), "{panel} missing");
        }
    }

    #[test]
    fn test_help_is_clipped_to_area() {
        let rows = render(30, 8);
        assert_eq!(rows.len(), 8);
        assert!(rows[0].starts_with('┌'));
        assert!(rows[7].starts_with('└'));
    }
}
