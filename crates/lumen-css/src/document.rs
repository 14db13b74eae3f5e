//! The document: DOM tree, layout tree and the style state that ties them
//! together.
//!
//! [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
//!
//! [`Document`] wraps a [`DomTree`] with the engine side of rendering. DOM
//! mutations go through it so that layout objects are torn down and style is
//! invalidated as the tree changes; [`Document::recalc_style`] then brings
//! styles and the layout tree back in sync.

use std::collections::HashMap;
use std::rc::Rc;

use lumen_dom::{DomTree, ElementData, NodeId, NodeType, StyleChangeType};
use serde::Serialize;
use strum_macros::Display;

use crate::animation::{Animation, AnimationOrigin, AnimationPhase, ElementAnimations};
use crate::layout::{LayoutId, LayoutSnapshot, LayoutTree, traversal};
use crate::resolver::{DeclaredStyleResolver, ElementStyleRequest, StyleResolver};
use crate::selector_watch::{
    CssSelectorWatch, ManualTimer, OneShotTimer, SelectorMatchBatch, SelectorMatchClient,
};
use crate::style::{ComputedStyle, StyleRecalcChange};

/// Engine state of one node that the DOM itself does not carry.
#[derive(Debug, Clone, Default)]
pub struct NodeStyleData {
    /// Style of a node without a layout object. Nodes with one read their
    /// style from it.
    pub computed_style: Option<Rc<ComputedStyle>>,
    /// Animation bookkeeping, created by the first animation.
    pub animations: Option<ElementAnimations>,
    /// For `::first-letter` pseudo-elements: the remaining-text fragment.
    /// Not an owning reference.
    pub remaining_text: Option<LayoutId>,
}

impl NodeStyleData {
    /// True if nothing here survives the node leaving the document: no
    /// style, no first-letter link, and no script animation (CSS ones were
    /// cancelled by detach).
    fn is_disposable(&self) -> bool {
        self.computed_style.is_none()
            && self.remaining_text.is_none()
            && self.animations.as_ref().is_none_or(|animations| {
                animations
                    .animations()
                    .iter()
                    .all(|animation| animation.origin == AnimationOrigin::Css)
            })
    }
}

/// [§ Rendering](https://html.spec.whatwg.org/multipage/webappapis.html#update-the-rendering)
///
/// Where the document is in its update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
pub enum LifecycleState {
    /// Nothing has been styled yet.
    #[default]
    Inactive,
    /// Something changed since the last recalc.
    VisualUpdatePending,
    /// A recalc is running. Recalc must not be re-entered.
    InStyleRecalc,
    /// Styles and layout tree are up to date.
    StyleClean,
}

/// Counters of style engine work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StyleEngineStats {
    /// Calls into the style resolver.
    pub resolver_invocations: usize,
    /// Own-style recalcs whose style changed.
    pub styles_changed: usize,
    /// Own-style recalcs whose style did not change.
    pub styles_unchanged: usize,
    /// Recalcs that reused an animation base style instead of resolving.
    pub base_styles_reused: usize,
}

/// A document and its rendering state.
pub struct Document<R: StyleResolver = DeclaredStyleResolver> {
    pub(crate) dom: DomTree,
    pub(crate) layout: LayoutTree,
    pub(crate) style_data: HashMap<NodeId, NodeStyleData>,
    pub(crate) resolver: R,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) selector_watch: Option<CssSelectorWatch>,
    pending_timer: Option<Box<dyn OneShotTimer>>,
    frame_client: Option<Box<dyn SelectorMatchClient>>,
    pub(crate) stats: StyleEngineStats,
}

impl<R: StyleResolver + std::fmt::Debug> std::fmt::Debug for Document<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("dom", &self.dom)
            .field("layout", &self.layout)
            .field("resolver", &self.resolver)
            .field("lifecycle", &self.lifecycle)
            .field("selector_watch", &self.selector_watch)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: StyleResolver> Document<R> {
    /// An empty document styled by `resolver`.
    pub fn new(mut resolver: R) -> Self {
        let view_style = Rc::new(resolver.style_for_document());
        Document {
            dom: DomTree::new(),
            layout: LayoutTree::new(view_style),
            style_data: HashMap::new(),
            resolver,
            lifecycle: LifecycleState::Inactive,
            selector_watch: None,
            pending_timer: None,
            frame_client: None,
            stats: StyleEngineStats::default(),
        }
    }

    /// The DOM tree.
    #[must_use]
    pub const fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// The layout tree.
    #[must_use]
    pub const fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    /// The style resolver.
    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access to the style resolver. Call
    /// [`Document::style_sheets_changed`] after changing its rules.
    pub const fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Work counters since the document was created.
    #[must_use]
    pub const fn stats(&self) -> StyleEngineStats {
        self.stats
    }

    /// The layout object of `node`.
    #[must_use]
    pub fn layout_object(&self, node: NodeId) -> Option<LayoutId> {
        self.layout.layout_object(node)
    }

    /// Serializable snapshot of the layout tree.
    #[must_use]
    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        self.layout.snapshot(&self.dom)
    }

    /// Indented text dump of the layout tree.
    #[must_use]
    pub fn dump_layout_tree(&self) -> String {
        self.layout.dump(&self.dom)
    }

    // --- Style data -------------------------------------------------------

    pub(crate) fn style_data(&self, node: NodeId) -> Option<&NodeStyleData> {
        self.style_data.get(&node)
    }

    pub(crate) fn style_data_mut(&mut self, node: NodeId) -> &mut NodeStyleData {
        self.style_data.entry(node).or_default()
    }

    pub(crate) fn store_style(&mut self, node: NodeId, style: Rc<ComputedStyle>) {
        self.style_data_mut(node).computed_style = Some(style);
    }

    pub(crate) fn clear_stored_style(&mut self, node: NodeId) {
        let _ = self.take_stored_style(node);
    }

    pub(crate) fn take_stored_style(&mut self, node: NodeId) -> Option<Rc<ComputedStyle>> {
        self.style_data.get_mut(&node)?.computed_style.take()
    }

    /// The current style of `node`: its layout object's style, or the style
    /// stored for it when it has no layout object.
    #[must_use]
    pub fn computed_style(&self, node: NodeId) -> Option<Rc<ComputedStyle>> {
        if let Some(style) = self
            .layout
            .layout_object(node)
            .and_then(|object| self.layout.style(object))
        {
            return Some(Rc::clone(style));
        }
        self.style_data(node)?.computed_style.clone()
    }

    /// The style `node` inherits from: its flat tree parent's style.
    ///
    /// `None` when the parent is not rendered, in which case `node` is not
    /// styled at all.
    #[must_use]
    pub fn parent_computed_style(&self, node: NodeId) -> Option<Rc<ComputedStyle>> {
        let parent = traversal::parent(&self.dom, node)?;
        let style = self.computed_style(parent)?;
        (!style.is_display_none()).then_some(style)
    }

    /// Animation bookkeeping of `element`.
    #[must_use]
    pub fn element_animations(&self, element: NodeId) -> Option<&ElementAnimations> {
        self.style_data(element)?.animations.as_ref()
    }

    pub(crate) fn element_animations_mut(&mut self, element: NodeId) -> Option<&mut ElementAnimations> {
        self.style_data.get_mut(&element)?.animations.as_mut()
    }

    /// Asks the resolver for `element`'s style.
    pub(crate) fn resolve_element_style(
        &mut self,
        element: NodeId,
        parent_style: Option<&ComputedStyle>,
    ) -> ComputedStyle {
        self.stats.resolver_invocations += 1;
        let watched_selectors = self
            .selector_watch
            .as_ref()
            .map(CssSelectorWatch::watched_selectors)
            .unwrap_or_default();
        let request = ElementStyleRequest {
            dom: &self.dom,
            element,
            parent_style,
            watched_selectors,
        };
        self.resolver.style_for_element(&request)
    }

    // --- Invalidation -----------------------------------------------------

    /// Raises `node`'s pending style change and schedules a visual update.
    ///
    /// Any pending animation-only style change becomes a full one.
    pub fn set_needs_style_recalc(&mut self, node: NodeId, change: StyleChangeType) {
        self.dom.set_needs_style_recalc(node, change);
        if let Some(animations) = self.element_animations_mut(node) {
            animations.set_animation_style_change(false);
        }
        self.schedule_visual_update();
    }

    /// Restyles the whole document, e.g. after the resolver's rules changed.
    pub fn style_sheets_changed(&mut self) {
        self.set_needs_style_recalc(NodeId::ROOT, StyleChangeType::SubtreeStyleChange);
    }

    pub(crate) fn schedule_visual_update(&mut self) {
        if self.lifecycle != LifecycleState::InStyleRecalc {
            self.lifecycle = LifecycleState::VisualUpdatePending;
        }
    }

    /// Detaches `node` now and marks it for attach in the next recalc.
    pub(crate) fn lazy_reattach_if_attached(&mut self, node: NodeId) {
        if self.dom.needs_attach(node) || !self.dom.is_connected(node) {
            return;
        }
        if self.dom.is_text(node) {
            self.detach_text(node);
        } else {
            self.detach(node, true);
        }
        self.dom.mark_ancestors_with_child_needs_style_recalc(node);
        self.schedule_visual_update();
    }

    // --- DOM mutation -----------------------------------------------------

    /// Allocates a detached element.
    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.dom.alloc(NodeType::Element(data))
    }

    /// Allocates a detached text node.
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.dom.alloc(NodeType::Text(data.to_string()))
    }

    /// Appends `child` to `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.dom.append_child(parent, child);
        self.children_changed(parent);
    }

    /// Inserts `child` into `parent` before `reference`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.dom.insert_before(parent, child, reference);
        self.children_changed(parent);
    }

    /// Detaches `child`'s subtree from the layout tree and removes it from
    /// `parent`. Returns false if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.dom.parent(child) != Some(parent) {
            return false;
        }
        if self.dom.is_text(child) {
            self.detach_text(child);
        } else if self.dom.is_element(child) {
            self.detach(child, false);
        }
        let mut removed = self.dom.descendants(child);
        removed.push(child);
        for node in removed {
            if self.dom.fullscreen_element() == Some(node) {
                let _ = self.dom.set_fullscreen_element(None);
            }
            if self.dom.is_in_top_layer(node) {
                self.dom.remove_from_top_layer(node);
            }
            if self
                .style_data
                .get(&node)
                .is_some_and(NodeStyleData::is_disposable)
            {
                let _ = self.style_data.remove(&node);
            }
        }
        let removed = self.dom.remove_child(parent, child);
        self.children_changed(parent);
        removed
    }

    fn children_changed(&mut self, parent: NodeId) {
        // [§ 14.2 :empty](https://www.w3.org/TR/selectors-4/#empty-pseudo)
        if self
            .computed_style(parent)
            .is_some_and(|style| style.affected_by_empty)
        {
            self.set_needs_style_recalc(parent, StyleChangeType::SubtreeStyleChange);
        }
        self.schedule_visual_update();
    }

    /// Replaces a text node's data. Returns false for non-text nodes.
    pub fn set_text(&mut self, node: NodeId, data: &str) -> bool {
        if !self.dom.set_text_data(node, data) {
            return false;
        }
        self.set_needs_style_recalc(node, StyleChangeType::LocalStyleChange);
        true
    }

    /// Sets an attribute and restyles the element's subtree.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> bool {
        let Some(data) = self.dom.as_element_mut(element) else {
            return false;
        };
        let _ = data.attrs.insert(name.to_string(), value.to_string());
        self.set_needs_style_recalc(element, StyleChangeType::SubtreeStyleChange);
        true
    }

    /// Adds `class` to the element's class list.
    pub fn add_class(&mut self, element: NodeId, class: &str) -> bool {
        let Some(data) = self.dom.as_element(element) else {
            return false;
        };
        if data.classes().contains(class) {
            return true;
        }
        let value = match data.attrs.get("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(element, "class", &value)
    }

    /// Attaches a shadow root to `host`. The host is reattached so that the
    /// shadow tree replaces its light children in the layout tree.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        let root = self.dom.attach_shadow(host);
        self.lazy_reattach_if_attached(host);
        root
    }

    // --- Top layer and fullscreen ------------------------------------------

    /// [§ 2.1 Top layer](https://fullscreen.spec.whatwg.org/#top-layer-add)
    pub fn add_to_top_layer(&mut self, element: NodeId) {
        if self.dom.is_in_top_layer(element) {
            return;
        }
        self.dom.add_to_top_layer(element);
        self.lazy_reattach_if_attached(element);
    }

    /// Removes `element` from the top layer; its box goes back to its usual
    /// place.
    pub fn remove_from_top_layer(&mut self, element: NodeId) {
        if !self.dom.is_in_top_layer(element) {
            return;
        }
        self.dom.remove_from_top_layer(element);
        self.lazy_reattach_if_attached(element);
    }

    /// [§ 3 requestFullscreen()](https://fullscreen.spec.whatwg.org/#dom-element-requestfullscreen)
    ///
    /// Makes `element` the fullscreen element. It joins the top layer and its
    /// box gets wrapped in a fullscreen wrapper.
    pub fn request_fullscreen(&mut self, element: NodeId) {
        if let Some(previous) = self.dom.set_fullscreen_element(Some(element))
            && previous != element
        {
            self.remove_from_top_layer(previous);
            self.lazy_reattach_if_attached(previous);
        }
        self.add_to_top_layer(element);
        self.lazy_reattach_if_attached(element);
    }

    /// [§ 3 exitFullscreen()](https://fullscreen.spec.whatwg.org/#dom-document-exitfullscreen)
    pub fn exit_fullscreen(&mut self) {
        if let Some(element) = self.dom.set_fullscreen_element(None) {
            self.remove_from_top_layer(element);
            self.lazy_reattach_if_attached(element);
        }
    }

    // --- Animations -------------------------------------------------------

    /// Adds an animation to `element` and returns its index.
    pub fn add_animation(&mut self, element: NodeId, animation: Animation) -> usize {
        let index = self
            .style_data_mut(element)
            .animations
            .get_or_insert_with(ElementAnimations::new)
            .add_animation(animation);
        self.set_needs_animation_style_recalc(element);
        index
    }

    /// Moves an animation to another phase. Returns false if there is no
    /// such animation.
    pub fn set_animation_phase(&mut self, element: NodeId, index: usize, phase: AnimationPhase) -> bool {
        let Some(animation) = self
            .element_animations_mut(element)
            .and_then(|a| a.animation_mut(index))
        else {
            return false;
        };
        animation.phase = phase;
        self.set_needs_animation_style_recalc(element);
        true
    }

    /// Records whether an animation runs on the compositor.
    pub fn set_animation_running_on_compositor(
        &mut self,
        element: NodeId,
        index: usize,
        running: bool,
    ) -> bool {
        let Some(animation) = self
            .element_animations_mut(element)
            .and_then(|a| a.animation_mut(index))
        else {
            return false;
        };
        animation.running_on_compositor = running;
        self.set_needs_animation_style_recalc(element);
        true
    }

    /// Schedules an animation-only style change, unless a full one is
    /// already pending.
    fn set_needs_animation_style_recalc(&mut self, element: NodeId) {
        if self.dom.needs_style_recalc(element) {
            return;
        }
        self.dom
            .set_needs_style_recalc(element, StyleChangeType::LocalStyleChange);
        if let Some(animations) = self.element_animations_mut(element) {
            animations.set_animation_style_change(true);
        }
        self.schedule_visual_update();
    }

    // --- Callback selectors -----------------------------------------------

    /// Replaces the selectors the embedder watches and restyles the document
    /// so current matches are counted. Returns how many were accepted.
    pub fn watch_css_selectors(&mut self, selectors: &[&str]) -> usize {
        let watch = self.selector_watch.get_or_insert_with(|| {
            let timer = self
                .pending_timer
                .take()
                .unwrap_or_else(|| Box::new(ManualTimer::new()));
            CssSelectorWatch::new(timer)
        });
        let accepted = watch.watch_css_selectors(selectors);
        self.style_sheets_changed();
        accepted
    }

    /// The selector watch, once selectors have been watched.
    #[must_use]
    pub const fn selector_watch(&self) -> Option<&CssSelectorWatch> {
        self.selector_watch.as_ref()
    }

    /// Sets the timer that drives selector match batching.
    pub fn install_selector_watch_timer(&mut self, timer: Box<dyn OneShotTimer>) {
        match &mut self.selector_watch {
            Some(watch) => watch.set_timer(timer),
            None => self.pending_timer = Some(timer),
        }
    }

    /// Sets (or removes) the embedder that receives selector match batches.
    pub fn set_frame_client(&mut self, client: Option<Box<dyn SelectorMatchClient>>) {
        self.frame_client = client;
    }

    /// Fire handler of the selector watch timer.
    ///
    /// Returns the batch if one was delivered to the frame client. Without a
    /// frame client a due batch is dropped.
    pub fn callback_selector_change_timer_fired(&mut self) -> Option<SelectorMatchBatch> {
        let batch = self.selector_watch.as_mut()?.timer_fired()?;
        let Some(client) = self.frame_client.as_mut() else {
            log::debug!("no frame client, dropping selector match batch");
            return None;
        };
        client.selector_match_changed(&batch.added, &batch.removed);
        Some(batch)
    }

    /// Reports the change in matched callback selectors between two styles
    /// of one element.
    pub(crate) fn update_callback_selectors(
        &mut self,
        old: Option<&ComputedStyle>,
        new: Option<&ComputedStyle>,
    ) {
        let old = old.map_or(&[][..], |s| s.callback_selectors.as_slice());
        let new = new.map_or(&[][..], |s| s.callback_selectors.as_slice());
        if old.is_empty() && new.is_empty() {
            return;
        }
        if old != new
            && let Some(watch) = self.selector_watch.as_mut()
        {
            watch.update_selector_matches(old, new);
        }
    }

    pub(crate) fn add_callback_selectors(&mut self, element: NodeId) {
        let style = self.computed_style(element);
        self.update_callback_selectors(None, style.as_deref());
    }

    pub(crate) fn remove_callback_selectors(&mut self, element: NodeId) {
        let style = self.computed_style(element);
        self.update_callback_selectors(style.as_deref(), None);
    }

    /// Runs a full style recalc. See [`Document::recalc_style_from`].
    pub fn recalc_style(&mut self) -> StyleRecalcChange {
        self.recalc_style_from(StyleRecalcChange::NoChange)
    }
}

impl Default for Document<DeclaredStyleResolver> {
    fn default() -> Self {
        Self::new(DeclaredStyleResolver::new())
    }
}
