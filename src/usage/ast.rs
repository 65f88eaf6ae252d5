//! Usage grammar syntax tree.
//!
//! This module defines the node types produced by parsing a usage string.
//! The tree is plain data: the parser builds it, the pattern compiler walks
//! it, and nothing mutates it afterwards.

/// A single node of a parsed usage grammar.
///
/// Usage strings such as `register <game_id> <player:number> [<note...>]`
/// parse into a tree of these nodes. Leaf nodes ([`Literal`],
/// [`Placeholder`], [`TrailingPlaceholder`]) produce capture slots when
/// compiled; the structural nodes ([`Sequence`], [`Alternatives`],
/// [`Optional`]) control how those slots combine.
///
/// [`Literal`]: UsageNode::Literal
/// [`Placeholder`]: UsageNode::Placeholder
/// [`TrailingPlaceholder`]: UsageNode::TrailingPlaceholder
/// [`Sequence`]: UsageNode::Sequence
/// [`Alternatives`]: UsageNode::Alternatives
/// [`Optional`]: UsageNode::Optional
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageNode {
    /// Two or more terms matched in order, separated by one run of
    /// whitespace in the input.
    Sequence(Vec<UsageNode>),
    /// `(a | b | ...)` — exactly one branch matches; branches are tried in
    /// declaration order and the first branch that permits an overall
    /// match wins.
    Alternatives(Vec<UsageNode>),
    /// `[a]` — the child matches, or nothing does; when nothing matches,
    /// no name inside the child appears in the result.
    Optional(Box<UsageNode>),
    /// `'text'` — matches the text verbatim and captures it under the
    /// text itself as name.
    Literal(String),
    /// `<name>` — matches one run of non-whitespace characters.
    ///
    /// The name is kept verbatim, including any `:type` suffix; the
    /// suffix is only split off by the typed parameter parser.
    Placeholder(String),
    /// `<name...>` — matches all remaining text, including embedded
    /// whitespace, but never matches empty input. Only legal in tail
    /// position.
    TrailingPlaceholder(String),
}

impl UsageNode {
    /// Collects the placeholder names of this subtree in left-to-right,
    /// depth-first order. Literal names are not included.
    ///
    /// Names are returned verbatim, so a `<delay:number>` placeholder
    /// contributes `"delay:number"`.
    pub fn placeholder_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_placeholder_names(&mut names);
        names
    }

    fn collect_placeholder_names<'n>(&'n self, names: &mut Vec<&'n str>) {
        match self {
            UsageNode::Sequence(children) | UsageNode::Alternatives(children) => {
                for child in children {
                    child.collect_placeholder_names(names);
                }
            }
            UsageNode::Optional(child) => child.collect_placeholder_names(names),
            UsageNode::Placeholder(name) | UsageNode::TrailingPlaceholder(name) => {
                names.push(name);
            }
            UsageNode::Literal(_) => {}
        }
    }
}

/// A parsed usage grammar together with its verbatim source string.
///
/// The source is retained for two reasons: parameter-mismatch errors embed
/// it unmodified so it can be shown to an end user, and the pattern
/// compiler uses it as its cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageTree {
    root: UsageNode,
    source: String,
}

impl UsageTree {
    pub(crate) fn new(root: UsageNode, source: impl Into<String>) -> Self {
        UsageTree {
            root,
            source: source.into(),
        }
    }

    /// The root node of the grammar.
    pub fn root(&self) -> &UsageNode {
        &self.root
    }

    /// The usage string this tree was parsed from, verbatim.
    pub fn source(&self) -> &str {
        &self.source
    }
}
