//! `/` command completion over the format toolbar.

use crate::completion::{CompletionAction, CompletionItem, CompletionKind, CompletionList};
use crate::extension::hooks::{flatten_buttons, ToolbarItem};
use crate::rank::similarity::{confidence_filter, jaro_winkler};
use crate::surface::{EditorSurface, TextPosition};

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Char span of the word touching `ch`, preferring the char before it.
///
/// A word is a run of word chars, a run of whitespace, or a run of other
/// non-space symbols.
pub fn word_at(line: &[char], ch: usize) -> (usize, usize) {
    let ch = ch.min(line.len());
    let (mut start, mut end) = (ch, ch);
    if ch > 0 {
        start -= 1;
    } else if ch < line.len() {
        end += 1;
    } else {
        return (ch, ch);
    }

    let anchor = line[start];
    let same_class = |other: char| {
        if is_word_char(anchor) {
            is_word_char(other)
        } else if anchor.is_whitespace() {
            other.is_whitespace()
        } else {
            !other.is_whitespace() && !is_word_char(other)
        }
    };
    while start > 0 && same_class(line[start - 1]) {
        start -= 1;
    }
    while end < line.len() && same_class(line[end]) {
        end += 1;
    }
    (start, end)
}

/// Enabled toolbar buttons matching the word at the cursor.
pub fn complete(surface: &dyn EditorSurface, toolbar: &[ToolbarItem]) -> Option<CompletionList> {
    let cursor = surface.cursor();
    let line: Vec<char> = surface.line(cursor.line)?.chars().collect();
    let (start, end) = word_at(&line, cursor.ch);
    let word: String = line[start..end].iter().collect::<String>().to_lowercase();
    let bare_slash = word == "/";

    let buttons: Vec<_> = flatten_buttons(toolbar)
        .into_iter()
        .filter(|button| !button.disabled)
        .collect();

    let buttons = if bare_slash {
        buttons
    } else {
        let scored = buttons
            .into_iter()
            .map(|button| {
                let score = button
                    .label
                    .to_lowercase()
                    .split(' ')
                    .map(|part| jaro_winkler(&word, part))
                    .fold(0.0_f64, f64::max);
                (button, score)
            })
            .collect();
        confidence_filter(scored)
    };

    let items = buttons
        .into_iter()
        .map(|button| CompletionItem {
            text: button.label.clone(),
            action: CompletionAction::RunCommand {
                command: button.command.clone(),
                consume_slash: !bare_slash,
            },
        })
        .collect();

    Some(CompletionList {
        kind: CompletionKind::Command,
        from: TextPosition::new(cursor.line, start),
        to: TextPosition::new(cursor.line, end),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::{complete, word_at};
    use crate::completion::apply_pick;
    use crate::extension::hooks::ToolbarItem;
    use crate::surface::memory::MemorySurface;
    use crate::surface::{EditorSurface, TextPosition};

    fn toolbar() -> Vec<ToolbarItem> {
        ToolbarItem::list_from_json(
            r#"[
                {"type": "button", "command": "bold", "label": "Bold"},
                {"type": "button", "command": "italic", "label": "Italic"},
                {"type": "separator"},
                {"type": "menu", "label": "Insert", "items": [
                    {"type": "button", "command": "link", "label": "Insert Link"},
                    {"type": "button", "command": "hidden", "label": "Hidden", "disabled": true}
                ]}
            ]"#,
        )
        .expect("toolbar json")
    }

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn finds_word_and_symbol_runs() {
        assert_eq!(word_at(&chars("/"), 1), (0, 1));
        assert_eq!(word_at(&chars("/bol"), 4), (1, 4));
        assert_eq!(word_at(&chars("/bol x"), 2), (1, 4));
        assert_eq!(word_at(&chars(""), 0), (0, 0));
    }

    #[test]
    fn bare_slash_lists_every_enabled_button_unranked() {
        let mut surface = MemorySurface::new("/");
        surface.set_cursor(TextPosition::new(0, 1));
        let list = complete(&surface, &toolbar()).expect("command list");
        assert_eq!(list.labels(), vec!["Bold", "Italic", "Insert Link"]);
    }

    #[test]
    fn typed_word_narrows_and_pick_consumes_slash() {
        let mut surface = MemorySurface::new("/bol");
        surface.set_cursor(TextPosition::new(0, 4));
        let list = complete(&surface, &toolbar()).expect("command list");
        assert_eq!(list.labels(), vec!["Bold"]);

        let command = apply_pick(&mut surface, &list, 0).expect("pick");
        assert_eq!(command.as_deref(), Some("bold"));
        assert_eq!(surface.text(), "");
    }
}
