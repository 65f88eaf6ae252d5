//! Usage pattern compilation.
//!
//! Walks a [`UsageTree`] and produces a [`CompiledPattern`]: one anchored
//! regular expression with synthetic named capture groups, plus an ordered
//! slot table mapping each placeholder/literal occurrence back to its
//! logical name. [`PatternCompiler`] caches compiled patterns by usage
//! string so repeated parses of the same usage are free.
//!
//! # Matching semantics
//!
//! - Consecutive terms match with exactly one run of whitespace between
//!   them; the whole pattern is anchored at both ends, so no leading or
//!   trailing whitespace is tolerated.
//! - A literal matches its text verbatim and captures under the text
//!   itself as name; a placeholder matches one run of non-whitespace; a
//!   trailing placeholder matches all remaining text, newlines included,
//!   but never matches empty input.
//! - Optional groups compile by branch expansion: the present branch and
//!   the absent branch each carry their own copy of the rest of the
//!   enclosing sequence, so the single-separator rule holds for every
//!   combination of present and absent optionals. The present branch is
//!   listed first and therefore preferred when both readings match.
//! - Alternatives branches are emitted in declaration order; the regex
//!   engine's leftmost-first semantics make the first branch that permits
//!   an overall match win.
//!
//! One known constraint: an alternatives branch consisting solely of
//! optional content still occupies a separator position in its enclosing
//! sequence. Write `[(<a> | <b>)]` rather than `(<a> | [<b>])`.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use log::debug;
use regex::Regex;

use crate::{
    params::Parameters,
    usage::{
        UsageError,
        ast::{UsageNode, UsageTree},
        parser::parse_usage,
    },
};

/// What a capture slot was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A `'text'` literal; the slot name is the literal text.
    Literal,
    /// A `<name>` placeholder.
    Placeholder,
    /// A `<name...>` trailing placeholder.
    Trailing,
}

/// One placeholder or literal occurrence of a compiled usage.
///
/// Slots are ordered left-to-right, depth-first over the usage tree. A
/// name may own several slots (`<foo> <foo>`), and one slot may be backed
/// by several synthetic regex groups when optional-branch expansion
/// rendered its occurrence more than once; at most one of those groups
/// participates in any given match.
#[derive(Debug, Clone)]
pub struct Slot {
    name: String,
    kind: SlotKind,
    groups: Vec<String>,
}

impl Slot {
    /// The logical name values captured by this slot are filed under.
    ///
    /// Placeholder names are verbatim, including any `:type` suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What this slot was compiled from.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }
}

/// An executable matcher for one usage string.
///
/// Immutable once built and safe to share across concurrent parses of
/// different input; [`PatternCompiler`] hands them out as [`Arc`]s.
#[derive(Debug)]
pub struct CompiledPattern {
    usage: String,
    regex: Regex,
    slots: Vec<Slot>,
    name_to_slots: HashMap<String, Vec<usize>>,
}

impl CompiledPattern {
    /// The usage string this pattern was compiled from, verbatim.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The capture slots in left-to-right, depth-first order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot indices owned by `name`, in order of appearance. Empty for
    /// unknown names.
    pub fn slot_indices(&self, name: &str) -> &[usize] {
        self.name_to_slots
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Matches `input` against the whole pattern and returns the values of
    /// the participating slots, in slot order.
    pub(crate) fn captures<'i>(&self, input: &'i str) -> Option<Vec<(usize, &'i str)>> {
        let captures = self.regex.captures(input)?;

        let mut values = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            // At most one of a slot's groups can participate: the groups
            // live in mutually exclusive alternation branches.
            for group in &slot.groups {
                if let Some(matched) = captures.name(group) {
                    values.push((index, matched.as_str()));
                    break;
                }
            }
        }
        Some(values)
    }

    /// Matches `input` against the whole pattern, anchored at both ends.
    ///
    /// Returns the captured name→value(s) structure, or `None` when the
    /// input does not match. Names inside unmatched optional groups are
    /// absent from the result, never present-but-empty.
    pub fn match_text(&self, input: &str) -> Option<Parameters> {
        let captures = self.captures(input)?;

        let mut parameters = Parameters::new();
        for (slot_index, value) in captures {
            parameters.push(self.slots[slot_index].name.clone(), value);
        }
        Some(parameters)
    }
}

/// Mirror of the usage tree with every leaf replaced by its slot index,
/// so branch expansion can render one occurrence several times without
/// re-registering it.
enum Indexed {
    Sequence(Vec<Indexed>),
    Alternatives(Vec<Indexed>),
    Optional(Box<Indexed>),
    Leaf(usize),
}

/// Registers the slots of a subtree in depth-first order and returns the
/// indexed mirror of the tree.
fn index_node(node: &UsageNode, slots: &mut Vec<Slot>) -> Indexed {
    match node {
        UsageNode::Sequence(children) => {
            Indexed::Sequence(children.iter().map(|c| index_node(c, slots)).collect())
        }
        UsageNode::Alternatives(branches) => {
            Indexed::Alternatives(branches.iter().map(|b| index_node(b, slots)).collect())
        }
        UsageNode::Optional(child) => Indexed::Optional(Box::new(index_node(child, slots))),
        UsageNode::Literal(text) => leaf(slots, text, SlotKind::Literal),
        UsageNode::Placeholder(name) => leaf(slots, name, SlotKind::Placeholder),
        UsageNode::TrailingPlaceholder(name) => leaf(slots, name, SlotKind::Trailing),
    }
}

fn leaf(slots: &mut Vec<Slot>, name: &str, kind: SlotKind) -> Indexed {
    slots.push(Slot {
        name: name.to_owned(),
        kind,
        groups: Vec::new(),
    });
    Indexed::Leaf(slots.len() - 1)
}

/// Per-compilation scratch state: the group counter and the slot table
/// under construction. Dropped when compilation returns, so repeated
/// compilations share nothing.
struct Renderer<'s> {
    slots: &'s mut Vec<Slot>,
    next_group: usize,
}

impl Renderer<'_> {
    /// Renders a run of sequence items. `sep` states whether a whitespace
    /// separator is required before the first atom this run emits.
    fn render_seq(&mut self, items: &[Indexed], sep: bool, out: &mut String) {
        let Some((head, tail)) = items.split_first() else {
            return;
        };

        if let Indexed::Optional(inner) = head {
            // Present and absent branches each carry their own copy of the
            // rest of the sequence; the separator bookkeeping then stays
            // local to each branch.
            out.push_str("(?:");
            self.render_item(inner, sep, out);
            self.render_seq(tail, true, out);
            out.push('|');
            self.render_seq(tail, sep, out);
            out.push(')');
        } else {
            self.render_item(head, sep, out);
            self.render_seq(tail, true, out);
        }
    }

    fn render_item(&mut self, item: &Indexed, sep: bool, out: &mut String) {
        match item {
            Indexed::Sequence(children) => self.render_seq(children, sep, out),
            Indexed::Optional(_) => self.render_seq(std::slice::from_ref(item), sep, out),
            Indexed::Alternatives(branches) => {
                if sep {
                    out.push_str(r"\s+");
                }
                out.push_str("(?:");
                for (index, branch) in branches.iter().enumerate() {
                    if index > 0 {
                        out.push('|');
                    }
                    self.render_item(branch, false, out);
                }
                out.push(')');
            }
            Indexed::Leaf(slot_index) => {
                if sep {
                    out.push_str(r"\s+");
                }
                let group = format!("g{}", self.next_group);
                self.next_group += 1;

                let slot = &mut self.slots[*slot_index];
                match slot.kind {
                    SlotKind::Literal => {
                        out.push_str(&format!("(?P<{group}>{})", regex::escape(&slot.name)));
                    }
                    SlotKind::Placeholder => {
                        out.push_str(&format!(r"(?P<{group}>\S+)"));
                    }
                    SlotKind::Trailing => {
                        out.push_str(&format!("(?P<{group}>(?s:.+))"));
                    }
                }
                slot.groups.push(group);
            }
        }
    }
}

/// Compiles a parsed usage tree into an executable pattern.
pub(crate) fn compile_tree(tree: &UsageTree) -> Result<CompiledPattern, UsageError> {
    let mut slots = Vec::new();
    let indexed = index_node(tree.root(), &mut slots);

    let mut body = String::from(r"\A");
    let mut renderer = Renderer {
        slots: &mut slots,
        next_group: 0,
    };
    renderer.render_item(&indexed, false, &mut body);
    body.push_str(r"\z");

    debug!("compiled usage {:?} into pattern {body:?}", tree.source());

    let regex = Regex::new(&body).map_err(|source| UsageError::Matcher {
        usage: tree.source().to_owned(),
        source,
    })?;

    let mut name_to_slots: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, slot) in slots.iter().enumerate() {
        name_to_slots.entry(slot.name.clone()).or_default().push(index);
    }

    Ok(CompiledPattern {
        usage: tree.source().to_owned(),
        regex,
        slots,
        name_to_slots,
    })
}

/// Compiles usage strings and caches the results.
///
/// The cache is keyed by the usage **string**, not by tree identity:
/// parsing is only reachable through this compiler, so string-level
/// caching subsumes tree-level caching, and the same string handed in
/// twice yields the same shared pattern. Lookups are read-mostly after
/// warm-up and safe from concurrent message-handling threads; first
/// compilation of a usage publishes once via a re-checked write lock.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use magpie::usage::PatternCompiler;
///
/// let compiler = PatternCompiler::new();
/// let first = compiler.compile("<foo> <bar>").unwrap();
/// let second = compiler.compile("<foo> <bar>").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug, Default)]
pub struct PatternCompiler {
    cache: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCompiler {
    pub fn new() -> Self {
        PatternCompiler {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the compiled pattern for `usage`, compiling and caching it
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] when the usage string is malformed. Syntax
    /// errors are configuration faults; callers should surface them at
    /// registration time.
    pub fn compile(&self, usage: &str) -> Result<Arc<CompiledPattern>, UsageError> {
        if let Some(pattern) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(usage)
        {
            return Ok(Arc::clone(pattern));
        }

        // Parse and compile outside the write lock; on a race the first
        // published pattern wins and this one is dropped.
        let tree = parse_usage(usage)?;
        let compiled = compile_tree(&tree)?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let pattern = cache
            .entry(usage.to_owned())
            .or_insert_with(|| Arc::new(compiled));
        Ok(Arc::clone(pattern))
    }
}
