//! Scenario files: a document, the rules that style it and a script of
//! mutations to replay against it.
//!
//! ```json
//! {
//!   "rules": [{ "selector": "p", "pseudo": "first-letter", "declaration": { "color": "red" } }],
//!   "document": {
//!     "tag": "html",
//!     "children": [{ "tag": "p", "children": [{ "text": "Hello", "name": "greeting" }] }]
//!   },
//!   "steps": [{ "op": "set_text", "node": "greeting", "text": "World" }]
//! }
//! ```
//!
//! Nodes are referred to by their `name`, or by their `id` attribute.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lumen_common::warning::clear_warnings;
use lumen_css::{
    DeclaredStyleResolver, Document, ManualTimer, SelectorMatchBatch, SelectorMatchClient,
    StyleDeclaration,
};
use lumen_dom::{AttributesMap, ElementData, NodeId};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading or replaying a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("cannot read scenario '{}': {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The scenario is not valid JSON or does not have the expected shape.
    #[error("malformed scenario: {0}")]
    Parse(#[from] serde_json::Error),
    /// A step names a node the scenario never declared.
    #[error("no node named '{0}'")]
    UnknownNode(String),
    /// Two nodes share a name.
    #[error("node name '{0}' is used twice")]
    DuplicateName(String),
    /// The resolver refused a rule's selector.
    #[error("unsupported selector '{0}'")]
    UnsupportedSelector(String),
    /// `set_text` on something that is not a text node.
    #[error("'{0}' is not a text node")]
    NotText(String),
    /// An element step on a text node.
    #[error("'{0}' is not an element")]
    NotElement(String),
    /// `remove` on a node that is not in the tree.
    #[error("'{0}' has no parent")]
    Detached(String),
}

/// A complete scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Rules the document starts with.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// The document element and its subtree.
    pub document: ElementSpec,
    /// Names of elements placed in the top layer before the first recalc.
    #[serde(default)]
    pub top_layer: Vec<String>,
    /// Name of the element that starts out fullscreen.
    #[serde(default)]
    pub fullscreen: Option<String>,
    /// Mutations replayed after the first recalc.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Reads and parses the scenario at `path`.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses a scenario from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A style rule: a compound selector, optionally targeting a
/// pseudo-element, and its declaration block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Compound selector, e.g. `div.note`.
    pub selector: String,
    /// Pseudo-element name without colons, e.g. `before`.
    #[serde(default)]
    pub pseudo: Option<String>,
    /// Declared values.
    #[serde(default)]
    pub declaration: StyleDeclaration,
}

impl RuleSpec {
    fn selector_text(&self) -> String {
        match &self.pseudo {
            Some(pseudo) => format!("{}::{}", self.selector, pseudo.trim_start_matches(':')),
            None => self.selector.clone(),
        }
    }
}

/// A text or element node.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// `{ "text": "..." }`
    Text(TextSpec),
    /// `{ "tag": "..." }`
    Element(ElementSpec),
}

/// A text node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextSpec {
    /// Character data.
    pub text: String,
    /// Name steps use to refer to this node.
    #[serde(default)]
    pub name: Option<String>,
}

/// An element and its subtree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    /// Local name.
    pub tag: String,
    /// Name steps use to refer to this node. Defaults to the `id` attribute.
    #[serde(default)]
    pub name: Option<String>,
    /// Attributes.
    #[serde(default)]
    pub attributes: AttributesMap,
    /// An element in the SVG namespace.
    #[serde(default)]
    pub svg: bool,
    /// Light tree children.
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    /// Children of an attached shadow root.
    #[serde(default)]
    pub shadow: Option<Vec<NodeSpec>>,
}

/// One scripted mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Replaces a text node's data.
    SetText {
        /// Target text node.
        node: String,
        /// New data.
        text: String,
    },
    /// Removes a node from its parent.
    Remove {
        /// Node to remove.
        node: String,
    },
    /// Adds a rule and restyles the document.
    AddRule(RuleSpec),
    /// Adds a class to an element.
    AddClass {
        /// Target element.
        element: String,
        /// Class to add.
        class: String,
    },
    /// Sets an attribute on an element.
    SetAttribute {
        /// Target element.
        element: String,
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: String,
    },
    /// Appends a new subtree.
    Append {
        /// Parent element.
        parent: String,
        /// Subtree to build.
        node: NodeSpec,
    },
    /// Makes an element the fullscreen element.
    EnterFullscreen {
        /// Target element.
        element: String,
    },
    /// Leaves fullscreen.
    ExitFullscreen,
    /// Puts an element in the top layer.
    AddToTopLayer {
        /// Target element.
        element: String,
    },
    /// Takes an element out of the top layer.
    RemoveFromTopLayer {
        /// Target element.
        element: String,
    },
}

impl Step {
    /// Short human-readable form, e.g. `set_text greeting`.
    pub fn describe(&self) -> String {
        match self {
            Self::SetText { node, .. } => format!("set_text {node}"),
            Self::Remove { node } => format!("remove {node}"),
            Self::AddRule(rule) => format!("add_rule {}", rule.selector_text()),
            Self::AddClass { element, class } => format!("add_class {element} .{class}"),
            Self::SetAttribute { element, name, .. } => format!("set_attribute {element} {name}"),
            Self::Append { parent, .. } => format!("append under {parent}"),
            Self::EnterFullscreen { element } => format!("enter_fullscreen {element}"),
            Self::ExitFullscreen => "exit_fullscreen".to_string(),
            Self::AddToTopLayer { element } => format!("add_to_top_layer {element}"),
            Self::RemoveFromTopLayer { element } => format!("remove_from_top_layer {element}"),
        }
    }
}

/// Frame client that logs every batch it receives.
struct LoggingFrameClient;

impl SelectorMatchClient for LoggingFrameClient {
    fn selector_match_changed(&mut self, added: &[String], removed: &[String]) {
        log::info!("selector matches changed: added {added:?}, removed {removed:?}");
    }
}

/// A scenario being replayed against a live document.
pub struct ScenarioRun {
    doc: Document,
    names: HashMap<String, NodeId>,
    timer: Option<ManualTimer>,
}

impl ScenarioRun {
    /// Builds the scenario's document. Nothing is styled yet.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        clear_warnings();
        let mut resolver = DeclaredStyleResolver::new();
        for rule in &scenario.rules {
            add_rule(&mut resolver, rule)?;
        }
        let mut run = ScenarioRun {
            doc: Document::new(resolver),
            names: HashMap::new(),
            timer: None,
        };

        let document_element = run.build_element(&scenario.document)?;
        run.doc.append_child(NodeId::ROOT, document_element);
        for name in &scenario.top_layer {
            let element = run.element(name)?;
            run.doc.add_to_top_layer(element);
        }
        if let Some(name) = &scenario.fullscreen {
            let element = run.element(name)?;
            run.doc.request_fullscreen(element);
        }
        Ok(run)
    }

    /// The document.
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the document.
    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Watches `selectors` through a manually driven timer. Returns how many
    /// selectors were accepted.
    pub fn watch(&mut self, selectors: &[&str]) -> usize {
        let timer = ManualTimer::new();
        self.doc.install_selector_watch_timer(Box::new(timer.clone()));
        self.doc.set_frame_client(Some(Box::new(LoggingFrameClient)));
        self.timer = Some(timer);
        self.doc.watch_css_selectors(selectors)
    }

    /// Runs the selector watch timer until it stops re-arming and returns
    /// the batches it delivered.
    pub fn drain_selector_batches(&mut self) -> Vec<SelectorMatchBatch> {
        let Some(timer) = self.timer.clone() else {
            return Vec::new();
        };
        let mut batches = Vec::new();
        while timer.expire() {
            if let Some(batch) = self.doc.callback_selector_change_timer_fired() {
                batches.push(batch);
            }
        }
        batches
    }

    /// Applies one step. The document is left dirty; the caller decides when
    /// to recalc.
    pub fn apply(&mut self, step: &Step) -> Result<(), ScenarioError> {
        log::debug!("applying {}", step.describe());
        match step {
            Step::SetText { node, text } => {
                let id = self.node(node)?;
                if !self.doc.set_text(id, text) {
                    return Err(ScenarioError::NotText(node.clone()));
                }
            }
            Step::Remove { node } => {
                let id = self.node(node)?;
                let parent = self
                    .doc
                    .dom()
                    .parent(id)
                    .ok_or_else(|| ScenarioError::Detached(node.clone()))?;
                let _ = self.doc.remove_child(parent, id);
            }
            Step::AddRule(rule) => {
                add_rule(self.doc.resolver_mut(), rule)?;
                self.doc.style_sheets_changed();
            }
            Step::AddClass { element, class } => {
                let id = self.element(element)?;
                let _ = self.doc.add_class(id, class);
            }
            Step::SetAttribute {
                element,
                name,
                value,
            } => {
                let id = self.element(element)?;
                let _ = self.doc.set_attribute(id, name, value);
            }
            Step::Append { parent, node } => {
                let parent = self.element(parent)?;
                let child = self.build(node)?;
                self.doc.append_child(parent, child);
            }
            Step::EnterFullscreen { element } => {
                let id = self.element(element)?;
                self.doc.request_fullscreen(id);
            }
            Step::ExitFullscreen => self.doc.exit_fullscreen(),
            Step::AddToTopLayer { element } => {
                let id = self.element(element)?;
                self.doc.add_to_top_layer(id);
            }
            Step::RemoveFromTopLayer { element } => {
                let id = self.element(element)?;
                self.doc.remove_from_top_layer(id);
            }
        }
        Ok(())
    }

    fn node(&self, name: &str) -> Result<NodeId, ScenarioError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownNode(name.to_string()))
    }

    fn element(&self, name: &str) -> Result<NodeId, ScenarioError> {
        let id = self.node(name)?;
        if self.doc.dom().is_element(id) {
            Ok(id)
        } else {
            Err(ScenarioError::NotElement(name.to_string()))
        }
    }

    fn register(&mut self, name: Option<&String>, id: NodeId) -> Result<(), ScenarioError> {
        let Some(name) = name else {
            return Ok(());
        };
        if self.names.insert(name.clone(), id).is_some() {
            return Err(ScenarioError::DuplicateName(name.clone()));
        }
        Ok(())
    }

    fn build(&mut self, spec: &NodeSpec) -> Result<NodeId, ScenarioError> {
        match spec {
            NodeSpec::Text(text) => {
                let id = self.doc.create_text(&text.text);
                self.register(text.name.as_ref(), id)?;
                Ok(id)
            }
            NodeSpec::Element(element) => self.build_element(element),
        }
    }

    fn build_element(&mut self, spec: &ElementSpec) -> Result<NodeId, ScenarioError> {
        let data = if spec.svg {
            ElementData::svg(&spec.tag)
        } else {
            ElementData::new(&spec.tag)
        };
        let data = spec
            .attributes
            .iter()
            .fold(data, |data, (name, value)| data.with_attribute(name, value));
        let id = self.doc.create_element(data);
        self.register(spec.name.as_ref().or_else(|| spec.attributes.get("id")), id)?;

        for child in &spec.children {
            let child = self.build(child)?;
            self.doc.append_child(id, child);
        }
        if let Some(shadow) = &spec.shadow {
            let root = self.doc.attach_shadow(id);
            for child in shadow {
                let child = self.build(child)?;
                self.doc.append_child(root, child);
            }
        }
        Ok(id)
    }
}

fn add_rule(resolver: &mut DeclaredStyleResolver, rule: &RuleSpec) -> Result<(), ScenarioError> {
    let selector = rule.selector_text();
    if resolver.add_rule(&selector, rule.declaration.clone()) {
        Ok(())
    } else {
        Err(ScenarioError::UnsupportedSelector(selector))
    }
}

#[cfg(test)]
mod tests {
    use lumen_css::StyleRecalcChange;
    use lumen_dom::PseudoId;

    use super::*;

    const FIRST_LETTER: &str = r#"{
        "rules": [
            { "selector": "p", "pseudo": "first-letter", "declaration": { "color": "red" } }
        ],
        "document": {
            "tag": "html",
            "children": [
                { "tag": "p", "name": "para", "children": [{ "text": "Hello", "name": "greeting" }] }
            ]
        },
        "steps": [
            { "op": "set_text", "node": "greeting", "text": "World" },
            { "op": "add_class", "element": "para", "class": "big" }
        ]
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json(FIRST_LETTER).unwrap();
        assert_eq!(scenario.rules.len(), 1);
        assert_eq!(scenario.rules[0].selector_text(), "p::first-letter");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[0].describe(), "set_text greeting");
        assert!(matches!(
            &scenario.document.children[0],
            NodeSpec::Element(p) if p.tag == "p"
        ));
    }

    #[test]
    fn test_replay_scenario() {
        let scenario = Scenario::from_json(FIRST_LETTER).unwrap();
        let mut run = ScenarioRun::new(&scenario).unwrap();
        assert_eq!(run.document_mut().recalc_style(), StyleRecalcChange::Reattach);

        let para = run.element("para").unwrap();
        assert!(
            run.document()
                .pseudo_element(para, PseudoId::FirstLetter)
                .is_some()
        );
        for step in &scenario.steps {
            run.apply(step).unwrap();
        }
        let _ = run.document_mut().recalc_style();
        assert!(run.document().dump_layout_tree().contains("\"W\""));
    }

    #[test]
    fn test_unknown_node_is_reported() {
        let scenario = Scenario::from_json(FIRST_LETTER).unwrap();
        let mut run = ScenarioRun::new(&scenario).unwrap();
        let step = Step::Remove {
            node: "missing".to_string(),
        };
        assert!(matches!(
            run.apply(&step),
            Err(ScenarioError::UnknownNode(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_set_text_on_element_is_an_error() {
        let scenario = Scenario::from_json(FIRST_LETTER).unwrap();
        let mut run = ScenarioRun::new(&scenario).unwrap();
        let step = Step::SetText {
            node: "para".to_string(),
            text: "x".to_string(),
        };
        assert!(matches!(run.apply(&step), Err(ScenarioError::NotText(_))));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let json = r#"{
            "document": {
                "tag": "html",
                "children": [
                    { "tag": "div", "attributes": { "id": "a" } },
                    { "text": "x", "name": "a" }
                ]
            }
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert!(matches!(
            ScenarioRun::new(&scenario),
            Err(ScenarioError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn test_unknown_step_is_a_parse_error() {
        let json = r#"{ "document": { "tag": "html" }, "steps": [{ "op": "explode" }] }"#;
        assert!(matches!(
            Scenario::from_json(json),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn test_watched_selector_batches_are_drained() {
        let json = r#"{
            "document": { "tag": "html", "children": [{ "tag": "div", "attributes": { "class": "x" } }] }
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        let mut run = ScenarioRun::new(&scenario).unwrap();
        assert_eq!(run.watch(&[".x", "div span"]), 1);
        let _ = run.document_mut().recalc_style();

        let batches = run.drain_selector_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].added, vec![".x".to_string()]);
        assert!(run.drain_selector_batches().is_empty());
    }
}
