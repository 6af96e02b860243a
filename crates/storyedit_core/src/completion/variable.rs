//! `@` variable completion.

use crate::completion::{
    CompletionAction, CompletionError, CompletionItem, CompletionKind, CompletionList,
};
use crate::extension::guard::HookKind;
use crate::model::passage::PassageId;
use crate::rank::similarity::rank;
use crate::surface::{EditorSurface, TextPosition};
use crate::variables::tracker::VariableTracker;
use once_cell::sync::Lazy;
use regex::Regex;

static AT_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([^\s]+)?$").expect("valid variable query regex"));

/// Variable names visible from `passage_id`, ordered for `@query`.
///
/// `None` when the text before the cursor is not a valid `@name` prefix.
pub fn complete(
    surface: &dyn EditorSurface,
    tracker: &VariableTracker,
    passage_id: PassageId,
    default_pattern: &Regex,
) -> Result<Option<CompletionList>, CompletionError> {
    let cursor = surface.cursor();
    let Some(line) = surface.line(cursor.line) else {
        return Ok(None);
    };
    let preceding: String = line.chars().take(cursor.ch).collect();
    let Some(caps) = AT_QUERY_RE.captures(&preceding) else {
        return Ok(None);
    };
    let matched_chars = caps
        .get(0)
        .map_or(0, |whole| whole.as_str().chars().count());
    let query = caps.get(1).map_or("", |name| name.as_str());

    let hooks = tracker.hooks();
    let pattern = hooks.valid_name_pattern.as_ref().unwrap_or(default_pattern);
    // A bare `@` offers every variable.
    if !query.is_empty() && !pattern.is_match(query) {
        return Ok(None);
    }

    let mut names = tracker.index().variable_names_for_passage(passage_id)?;
    names.retain(|name| !hooks.reserved_words.contains(name));
    let ordered = match &hooks.suggest_variable_name {
        Some(suggest) => tracker
            .guard()
            .call(HookKind::SuggestVariableName, || suggest(&names, query))
            .unwrap_or_else(|_| rank(&names, query, false)),
        None => rank(&names, query, false),
    };

    Ok(Some(CompletionList {
        kind: CompletionKind::Variable,
        from: TextPosition::new(cursor.line, cursor.ch.saturating_sub(matched_chars)),
        to: cursor,
        items: ordered
            .into_iter()
            .map(|name| CompletionItem {
                text: name,
                action: CompletionAction::Insert,
            })
            .collect(),
    }))
}
