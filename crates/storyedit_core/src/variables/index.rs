//! Three-tier variable registry.
//!
//! # Responsibility
//! - Track variables defined in passage text as natives, globals and
//!   per-passage locals.
//! - Answer "which variables can this passage see" in relevance order.
//!
//! # Invariants
//! - A `Variable` is shared by `Rc` between `globals` and every locals list
//!   that references it; its `definitions` are visible through all of them.
//! - After `reset_passage(p, tokens)` no variable holds a definition from
//!   `p` unless `tokens` re-added it.
//! - A variable left without definitions after a re-scan is dropped from
//!   `globals`, but only if `globals` still maps its name to that object.
//! - Re-scanning a passage keeps variable identity for unchanged names.

use crate::model::passage::{Passage, PassageId};
use crate::surface::TextPosition;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// One token reported by a format's variable parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedToken {
    /// Identifier built into the format.
    Native(String),
    Token(VariableToken),
}

/// A variable reference, or a definition when `expression` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableToken {
    pub name: String,
    pub position: TextPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default)]
    pub local: bool,
}

impl VariableToken {
    pub fn is_definition(&self) -> bool {
        self.expression
            .as_deref()
            .is_some_and(|expression| !expression.is_empty())
    }
}

/// A definition site, tagged with the passage it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: String,
    pub position: TextPosition,
    pub expression: String,
    pub local: bool,
    pub passage_id: PassageId,
    pub passage_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Empty for natives.
    pub definitions: Vec<VariableDefinition>,
}

pub type VariableRef = Rc<RefCell<Variable>>;

fn new_variable(name: &str) -> VariableRef {
    Rc::new(RefCell::new(Variable {
        name: name.to_string(),
        definitions: Vec::new(),
    }))
}

/// Variable registry owned by one story-edit session.
#[derive(Debug, Default)]
pub struct VariableIndex {
    natives: BTreeMap<String, VariableRef>,
    globals: BTreeMap<String, VariableRef>,
    locals: BTreeMap<PassageId, Vec<VariableRef>>,
}

impl VariableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives `passage`'s variables from a fresh token scan.
    pub fn reset_passage(&mut self, passage: &Passage, tokens: &[ParsedToken]) {
        let previous = self.locals.remove(&passage.id).unwrap_or_default();

        // Strip first; definitions the new scan still has are re-added below.
        for variable in &previous {
            variable
                .borrow_mut()
                .definitions
                .retain(|definition| definition.passage_id != passage.id);
        }

        let mut next: Vec<VariableRef> = Vec::new();
        for token in tokens {
            let token = match token {
                ParsedToken::Native(name) => {
                    self.natives
                        .entry(name.clone())
                        .or_insert_with(|| new_variable(name));
                    continue;
                }
                ParsedToken::Token(token) => token,
            };
            let Some(expression) = token.expression.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };

            let variable = self
                .globals
                .get(&token.name)
                .or_else(|| find_named(&next, &token.name))
                .or_else(|| find_named(&previous, &token.name))
                .cloned()
                .unwrap_or_else(|| new_variable(&token.name));

            variable.borrow_mut().definitions.push(VariableDefinition {
                name: token.name.clone(),
                position: token.position,
                expression: expression.to_string(),
                local: token.local,
                passage_id: passage.id,
                passage_name: passage.name.clone(),
            });
            if !next.iter().any(|existing| Rc::ptr_eq(existing, &variable)) {
                next.push(Rc::clone(&variable));
            }
            if !token.local {
                self.globals
                    .entry(token.name.clone())
                    .or_insert_with(|| Rc::clone(&variable));
            }
        }

        let mut collected = 0_usize;
        for variable in &previous {
            if next.iter().any(|kept| Rc::ptr_eq(kept, variable)) {
                continue;
            }
            if !variable.borrow().definitions.is_empty() {
                continue;
            }
            let name = variable.borrow().name.clone();
            if self
                .globals
                .get(&name)
                .is_some_and(|global| Rc::ptr_eq(global, variable))
            {
                self.globals.remove(&name);
                collected += 1;
            }
        }

        debug!(
            "event=variables_reset module=variables status=ok passage_id={} tokens={} locals={} collected={}",
            passage.id,
            tokens.len(),
            next.len(),
            collected
        );
        self.locals.insert(passage.id, next);
    }

    /// Variables visible from a passage: locals, then unshadowed globals,
    /// then natives, each group alphabetical.
    pub fn variables_for_passage(
        &self,
        passage_id: PassageId,
    ) -> Result<Vec<VariableRef>, VariableIndexError> {
        let locals = self
            .locals
            .get(&passage_id)
            .ok_or(VariableIndexError::PassageNotScanned(passage_id))?;

        let mut local_list: Vec<VariableRef> = locals.clone();
        sort_by_name(&mut local_list);

        let mut global_list: Vec<VariableRef> = self
            .globals
            .values()
            .filter(|global| {
                let name = global.borrow().name.clone();
                !locals.iter().any(|local| local.borrow().name == name)
            })
            .cloned()
            .collect();
        sort_by_name(&mut global_list);

        let mut native_list: Vec<VariableRef> = self.natives.values().cloned().collect();
        sort_by_name(&mut native_list);

        local_list.extend(global_list);
        local_list.extend(native_list);
        Ok(local_list)
    }

    /// Names of `variables_for_passage`, in the same order.
    pub fn variable_names_for_passage(
        &self,
        passage_id: PassageId,
    ) -> Result<Vec<String>, VariableIndexError> {
        Ok(self
            .variables_for_passage(passage_id)?
            .iter()
            .map(|variable| variable.borrow().name.clone())
            .collect())
    }

    /// Releases a deleted passage's definitions and locals entry.
    pub fn remove_passage(&mut self, passage: &Passage) {
        self.reset_passage(passage, &[]);
        self.locals.remove(&passage.id);
    }

    pub fn is_scanned(&self, passage_id: PassageId) -> bool {
        self.locals.contains_key(&passage_id)
    }

    pub fn global(&self, name: &str) -> Option<VariableRef> {
        self.globals.get(name).cloned()
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn native_count(&self) -> usize {
        self.natives.len()
    }
}

fn find_named<'a>(variables: &'a [VariableRef], name: &str) -> Option<&'a VariableRef> {
    variables
        .iter()
        .find(|variable| variable.borrow().name == name)
}

fn sort_by_name(variables: &mut [VariableRef]) {
    variables.sort_by(|left, right| compare_names(&left.borrow().name, &right.borrow().name));
}

fn compare_names(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableIndexError {
    /// Lookup for a passage `reset_passage` never ran on.
    PassageNotScanned(PassageId),
}

impl Display for VariableIndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassageNotScanned(id) => {
                write!(f, "variables requested for unscanned passage {id}")
            }
        }
    }
}

impl Error for VariableIndexError {}

#[cfg(test)]
mod tests {
    use super::{ParsedToken, VariableIndex, VariableIndexError, VariableToken};
    use crate::model::passage::Passage;
    use crate::surface::TextPosition;
    use std::rc::Rc;

    fn define(name: &str, expression: &str, local: bool) -> ParsedToken {
        ParsedToken::Token(VariableToken {
            name: name.to_string(),
            position: TextPosition::new(0, 0),
            expression: Some(expression.to_string()),
            local,
        })
    }

    fn reference(name: &str) -> ParsedToken {
        ParsedToken::Token(VariableToken {
            name: name.to_string(),
            position: TextPosition::new(0, 4),
            expression: None,
            local: false,
        })
    }

    fn names(index: &VariableIndex, passage: &Passage) -> Vec<String> {
        index
            .variable_names_for_passage(passage.id)
            .expect("passage scanned")
    }

    #[test]
    fn lookup_before_scan_fails_loudly() {
        let index = VariableIndex::new();
        let passage = Passage::new("Start", "");
        assert_eq!(
            index.variables_for_passage(passage.id).map(|list| list.len()),
            Err(VariableIndexError::PassageNotScanned(passage.id))
        );
    }

    #[test]
    fn empty_scan_yields_no_locals() {
        let mut index = VariableIndex::new();
        let passage = Passage::new("Start", "");
        index.reset_passage(&passage, &[]);
        assert!(names(&index, &passage).is_empty());
    }

    #[test]
    fn orders_locals_then_globals_then_natives() {
        let mut index = VariableIndex::new();
        let first = Passage::new("First", "");
        let second = Passage::new("Second", "");
        index.reset_passage(
            &first,
            &[define("zeta", "1", false), define("Alpha", "2", false)],
        );
        index.reset_passage(
            &second,
            &[
                ParsedToken::Native("it".to_string()),
                define("temp", "3", true),
                define("zeta", "4", false),
                reference("Alpha"),
            ],
        );

        assert_eq!(names(&index, &second), vec!["temp", "zeta", "Alpha", "it"]);
        assert_eq!(names(&index, &first), vec!["Alpha", "zeta", "it"]);
    }

    #[test]
    fn rescan_preserves_identity_and_replaces_definitions() {
        let mut index = VariableIndex::new();
        let passage = Passage::new("Start", "");
        index.reset_passage(&passage, &[define("gold", "5", false)]);
        let before = index.global("gold").expect("global");

        index.reset_passage(&passage, &[define("gold", "6", false)]);
        let after = index.global("gold").expect("global");

        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(after.borrow().definitions.len(), 1);
        assert_eq!(after.borrow().definitions[0].expression, "6");
        assert_eq!(index.global_count(), 1);
    }

    #[test]
    fn shared_variable_aggregates_definitions_across_passages() {
        let mut index = VariableIndex::new();
        let first = Passage::new("First", "");
        let second = Passage::new("Second", "");
        index.reset_passage(&first, &[define("gold", "5", false)]);
        index.reset_passage(&second, &[define("gold", "7", false)]);

        let gold = index.global("gold").expect("global");
        assert_eq!(gold.borrow().definitions.len(), 2);

        index.reset_passage(&first, &[]);
        assert_eq!(gold.borrow().definitions.len(), 1);
        assert_eq!(gold.borrow().definitions[0].passage_name, "Second");
        assert!(index.global("gold").is_some());
    }

    #[test]
    fn variable_without_definitions_is_collected() {
        let mut index = VariableIndex::new();
        let passage = Passage::new("Start", "");
        index.reset_passage(&passage, &[define("gold", "5", false)]);
        index.reset_passage(&passage, &[reference("gold")]);

        assert!(index.global("gold").is_none());
        assert!(names(&index, &passage).is_empty());
    }

    #[test]
    fn removed_passage_releases_everything() {
        let mut index = VariableIndex::new();
        let passage = Passage::new("Start", "");
        index.reset_passage(&passage, &[define("gold", "5", false)]);
        index.remove_passage(&passage);

        assert!(index.global("gold").is_none());
        assert!(!index.is_scanned(passage.id));
    }

    #[test]
    fn decodes_parser_output_json() {
        let tokens: Vec<ParsedToken> = serde_json::from_str(
            r#"["it", {"name": "gold", "position": {"line": 0, "ch": 5}, "expression": "5"}]"#,
        )
        .expect("token json");
        assert_eq!(tokens[0], ParsedToken::Native("it".to_string()));
        assert_eq!(tokens[1], define_at("gold", "5", TextPosition::new(0, 5)));
    }

    fn define_at(name: &str, expression: &str, position: TextPosition) -> ParsedToken {
        ParsedToken::Token(VariableToken {
            name: name.to_string(),
            position,
            expression: Some(expression.to_string()),
            local: false,
        })
    }
}
