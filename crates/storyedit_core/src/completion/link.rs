//! Passage-name completion inside links.

use crate::completion::{CompletionAction, CompletionItem, CompletionKind, CompletionList};
use crate::model::passage::Story;
use crate::rank::similarity::rank;
use crate::surface::{EditorSurface, TextPosition};

/// Char index of the last occurrence of `needle` in `haystack`.
fn last_index_of(haystack: &[char], needle: [char; 2]) -> Option<usize> {
    haystack.windows(2).rposition(|pair| pair == needle)
}

fn index_of(haystack: &[char], needle: [char; 2]) -> Option<usize> {
    haystack.windows(2).position(|pair| pair == needle)
}

/// Whether an empty cursor at `ch` sits inside a closed link that has no
/// `->` after it, where moving the cursor reopens passage completion.
pub fn cursor_in_link(line: &str, ch: usize) -> bool {
    let chars: Vec<char> = line.chars().collect();
    let ch = ch.min(chars.len());
    let opens_before = (ch + 2).min(chars.len());
    last_index_of(&chars[..opens_before], ['[', '[']).is_some()
        && index_of(&chars[ch..], [']', ']']).is_some()
        && index_of(&chars[ch..], ['-', '>']).is_none()
}

/// Ranks passage names against the link text around the cursor.
pub fn complete(surface: &dyn EditorSurface, story: &Story) -> Option<CompletionList> {
    let cursor = surface.cursor();
    let line: Vec<char> = surface.line(cursor.line)?.chars().collect();
    let split = cursor.ch.min(line.len());
    let (preceding, following) = line.split_at(split);

    let link_index = last_index_of(preceding, ['[', '[']);
    let pointer_index = last_index_of(preceding, ['-', '>']);
    let trigger = link_index.max(pointer_index)?;

    let other_link = index_of(following, ['[', '[']);
    let link_close = index_of(following, [']', ']']);
    let closed = match (link_close, other_link) {
        (Some(close), Some(other)) => close < other,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let query_start = trigger + 2;
    let mut query: String = preceding[query_start..].iter().collect();
    if let (true, Some(close)) = (closed, link_close) {
        query.extend(&following[..close]);
    }

    // A passage named exactly like the typed link is most likely the one
    // this link is about to create.
    let content_start = link_index.map_or(1, |index| index + 2).min(preceding.len());
    let link_content: String = preceding[content_start..].iter().collect();

    let names: Vec<&str> = story
        .passages
        .iter()
        .filter(|passage| passage.name != link_content)
        .map(|passage| passage.name.as_str())
        .collect();

    let items = rank(&names, &query, false)
        .into_iter()
        .map(|name| CompletionItem {
            text: name,
            action: CompletionAction::InsertLink { closed },
        })
        .collect();

    Some(CompletionList {
        kind: CompletionKind::Link,
        from: TextPosition::new(cursor.line, query_start),
        to: cursor,
        items,
    })
}
