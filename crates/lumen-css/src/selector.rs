//! CSS Selector parsing and matching
//!
//! This module implements the compound subset of
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/): type, class, ID,
//! universal and structural pseudo-class selectors, optionally followed by a
//! pseudo-element. Selectors with combinators are rejected.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use lumen_dom::{DomTree, ElementData, NodeId, PseudoId};

/// [§ 5 Elemental selectors](https://www.w3.org/TR/selectors-4/#elemental-selectors)
///
/// A simple selector is a single condition on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    /// "A type selector is the name of a document language element type,
    /// and represents an instance of that element type in the document tree."
    ///
    /// Examples: `div`, `p`, `span`
    Type(String),

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    /// "The class selector is given as a full stop (. U+002E) immediately
    /// followed by an identifier."
    Class(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    /// "An ID selector is a hash (#, U+0023) immediately followed by the
    /// ID value, which is an identifier."
    Id(String),

    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    /// "The universal selector is a single asterisk (*)"
    Universal,

    /// Pseudo-class that always fails to match.
    /// Used for interactive states (`:hover`, `:focus`, ...) that are
    /// irrelevant to a static document but whose presence should not cause
    /// the entire rule to be dropped.
    NeverMatch,

    /// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    /// Structural pseudo-class that requires DOM tree context to match.
    PseudoClass(PseudoClass),
}

/// Structural pseudo-classes per [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// [§ 4.4 :root](https://www.w3.org/TR/selectors-4/#the-root-pseudo)
    /// "The :root pseudo-class represents an element that is the root of the document."
    Root,
    /// [§ 4.12 :first-child](https://www.w3.org/TR/selectors-4/#the-first-child-pseudo)
    FirstChild,
    /// [§ 4.12 :last-child](https://www.w3.org/TR/selectors-4/#the-last-child-pseudo)
    LastChild,
    /// [§ 4.12 :only-child](https://www.w3.org/TR/selectors-4/#the-only-child-pseudo)
    OnlyChild,
    /// [§ 4.5 :empty](https://www.w3.org/TR/selectors-4/#the-empty-pseudo)
    /// "The :empty pseudo-class represents an element that has no children
    /// except, optionally, document white space characters."
    ///
    /// Matching it makes the element's style depend on its children.
    Empty,
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A compound selector is a sequence of simple selectors that are not
/// separated by a combinator, and represents a set of simultaneous
/// conditions on a single element."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    /// The list of simple selectors that make up this compound selector.
    pub simple_selectors: Vec<SimpleSelector>,
}

/// [§ 17 Calculating a selector's specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
///
/// (A, B, C): IDs, classes and pseudo-classes, types. Compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    /// Create a new specificity with (A, B, C) components.
    #[must_use]
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self(a, b, c)
    }
}

/// Side effects of matching that feed back into the element's style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchingContext {
    /// A `:empty` condition was evaluated against the element.
    pub affected_by_empty: bool,
    /// The outcome of the last `:empty` evaluation.
    pub empty_state: bool,
}

/// A parsed compound selector with an optional trailing pseudo-element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelector {
    /// The conditions on the subject element.
    pub compound: CompoundSelector,
    /// [§ 3.6 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
    /// The pseudo-element this selector styles, or `NoPseudo`.
    pub pseudo_element: PseudoId,
    /// Cached specificity.
    pub specificity: Specificity,
    text: String,
}

impl ParsedSelector {
    /// The selector text, whitespace-trimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Check if the compound part matches `node`.
    ///
    /// The pseudo-element part is not checked here; callers decide which
    /// pseudo-element they are resolving.
    #[must_use]
    pub fn matches(&self, tree: &DomTree, node: NodeId, context: &mut MatchingContext) -> bool {
        let Some(element) = tree.as_element(node) else {
            return false;
        };
        self.compound
            .simple_selectors
            .iter()
            .all(|simple| match simple {
                SimpleSelector::PseudoClass(pc) => pseudo_class_matches(*pc, tree, node, context),
                _ => simple.matches(element),
            })
    }
}

impl fmt::Display for ParsedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl SimpleSelector {
    /// Check if this simple selector matches the given element.
    ///
    /// Pseudo-classes need tree context and never match here.
    #[must_use]
    pub fn matches(&self, element: &ElementData) -> bool {
        match self {
            // "A type selector ... represents an instance of that element type"
            // HTML element names are ASCII case-insensitive.
            SimpleSelector::Type(name) => element.tag_name.eq_ignore_ascii_case(name),
            SimpleSelector::Class(class) => element.classes().contains(class.as_str()),
            SimpleSelector::Id(id) => element.id().is_some_and(|value| value == id),
            SimpleSelector::Universal => true,
            SimpleSelector::NeverMatch | SimpleSelector::PseudoClass(_) => false,
        }
    }

    fn specificity(&self) -> Specificity {
        match self {
            SimpleSelector::Id(_) => Specificity(1, 0, 0),
            SimpleSelector::Class(_) | SimpleSelector::PseudoClass(_) | SimpleSelector::NeverMatch => {
                Specificity(0, 1, 0)
            }
            SimpleSelector::Type(_) => Specificity(0, 0, 1),
            SimpleSelector::Universal => Specificity::default(),
        }
    }
}

fn element_children(tree: &DomTree, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.children(parent)
        .iter()
        .copied()
        .filter(move |&child| tree.is_element(child))
}

fn pseudo_class_matches(
    pseudo_class: PseudoClass,
    tree: &DomTree,
    node: NodeId,
    context: &mut MatchingContext,
) -> bool {
    match pseudo_class {
        PseudoClass::Root => tree.document_element() == Some(node),
        PseudoClass::FirstChild | PseudoClass::LastChild | PseudoClass::OnlyChild => {
            let Some(parent) = tree.parent(node).filter(|&p| tree.is_element(p)) else {
                return false;
            };
            let first = element_children(tree, parent).next();
            let last = element_children(tree, parent).last();
            match pseudo_class {
                PseudoClass::FirstChild => first == Some(node),
                PseudoClass::LastChild => last == Some(node),
                _ => first == Some(node) && last == Some(node),
            }
        }
        PseudoClass::Empty => {
            // "...no children except, optionally, document white space characters."
            let empty = tree.children(node).iter().all(|&child| {
                !tree.is_element(child)
                    && tree
                        .as_text(child)
                        .is_none_or(|text| text.chars().all(char::is_whitespace))
            });
            context.affected_by_empty = true;
            context.empty_state = empty;
            empty
        }
    }
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(ch) = chars.next_if(|&ch| is_ident_char(ch)) {
        ident.push(ch);
    }
    ident
}

fn pseudo_element_from_name(name: &str) -> Option<PseudoId> {
    match name {
        "before" => Some(PseudoId::Before),
        "after" => Some(PseudoId::After),
        "backdrop" => Some(PseudoId::Backdrop),
        "first-letter" => Some(PseudoId::FirstLetter),
        "first-line" => Some(PseudoId::FirstLine),
        _ => None,
    }
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// Parse a compound selector such as `p.intro:empty::first-letter`.
///
/// Returns None for empty input, selectors with combinators, unknown
/// pseudo-elements, or anything following a pseudo-element.
#[must_use]
pub fn parse_selector(raw: &str) -> Option<ParsedSelector> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut simple_selectors = Vec::new();
    let mut pseudo_element = PseudoId::NoPseudo;
    let mut chars = trimmed.chars().peekable();

    while let Some(&c) = chars.peek() {
        // "A pseudo-element may only be followed by ..." nothing, in this subset.
        if pseudo_element != PseudoId::NoPseudo {
            return None;
        }
        match c {
            '.' => {
                let _ = chars.next();
                let ident = read_ident(&mut chars);
                if ident.is_empty() {
                    return None;
                }
                simple_selectors.push(SimpleSelector::Class(ident));
            }
            '#' => {
                let _ = chars.next();
                let ident = read_ident(&mut chars);
                if ident.is_empty() {
                    return None;
                }
                simple_selectors.push(SimpleSelector::Id(ident));
            }
            '*' => {
                let _ = chars.next();
                simple_selectors.push(SimpleSelector::Universal);
            }
            ':' => {
                let _ = chars.next();
                let double = chars.peek() == Some(&':');
                if double {
                    let _ = chars.next();
                }
                let name = read_ident(&mut chars).to_ascii_lowercase();
                if name.is_empty() {
                    return None;
                }
                // [§ 3.6.2 Legacy pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-element)
                // ":before, :after, :first-line and :first-letter ... may also be
                // written with a single colon."
                let legacy = matches!(
                    name.as_str(),
                    "before" | "after" | "first-line" | "first-letter"
                );
                if double || legacy {
                    pseudo_element = pseudo_element_from_name(&name)?;
                    continue;
                }
                simple_selectors.push(match name.as_str() {
                    "root" => SimpleSelector::PseudoClass(PseudoClass::Root),
                    "first-child" => SimpleSelector::PseudoClass(PseudoClass::FirstChild),
                    "last-child" => SimpleSelector::PseudoClass(PseudoClass::LastChild),
                    "only-child" => SimpleSelector::PseudoClass(PseudoClass::OnlyChild),
                    "empty" => SimpleSelector::PseudoClass(PseudoClass::Empty),
                    _ => SimpleSelector::NeverMatch,
                });
            }
            c if is_ident_char(c) => {
                // A type selector must come first in a compound.
                if !simple_selectors.is_empty() {
                    return None;
                }
                simple_selectors.push(SimpleSelector::Type(read_ident(&mut chars)));
            }
            // [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators):
            // whitespace, '>', '+', '~' and anything else end the subset.
            _ => return None,
        }
    }

    if simple_selectors.is_empty() {
        // `::before` alone means `*::before`.
        if pseudo_element == PseudoId::NoPseudo {
            return None;
        }
        simple_selectors.push(SimpleSelector::Universal);
    }

    let mut specificity = simple_selectors
        .iter()
        .map(SimpleSelector::specificity)
        .fold(Specificity::default(), |acc, s| {
            Specificity(acc.0 + s.0, acc.1 + s.1, acc.2 + s.2)
        });
    // "Pseudo-elements count as type selectors."
    if pseudo_element != PseudoId::NoPseudo {
        specificity.2 += 1;
    }

    Some(ParsedSelector {
        compound: CompoundSelector { simple_selectors },
        pseudo_element,
        specificity,
        text: trimmed.to_string(),
    })
}
