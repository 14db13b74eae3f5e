//! The layout tree.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! "Each box is associated with its generating element." Layout objects live
//! in an arena and refer to their DOM node (if any) by [`NodeId`]. The tree
//! does not mirror the DOM: `display: none` subtrees have no objects, while
//! generated content, list markers, multi-column flow threads and fullscreen
//! wrappers add objects no DOM node owns.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use bitflags::bitflags;
use lumen_dom::{DomTree, NodeId, NodeType, PseudoId};
use serde::Serialize;
use strum_macros::Display;

use crate::style::ComputedStyle;

/// Index of a layout object in the [`LayoutTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LayoutId(pub usize);

impl LayoutId {
    /// The layout view, root of every layout tree.
    pub const VIEW: Self = Self(0);
}

/// Rendered text: a window onto a shared UTF-16 buffer.
///
/// A plain text object's window covers its whole buffer. `::first-letter`
/// splits a text object into two *fragments* that share the buffer and
/// cover disjoint windows of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutText {
    text: Rc<[u16]>,
    start: usize,
    len: usize,
    is_fragment: bool,
    /// The `::first-letter` pseudo-element this fragment belongs to. Not an
    /// owning reference.
    pub first_letter: Option<NodeId>,
    /// This fragment holds the text after the first letter.
    pub is_remaining_text: bool,
}

impl LayoutText {
    /// Text covering all of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let text: Rc<[u16]> = text.encode_utf16().collect();
        let len = text.len();
        LayoutText {
            text,
            start: 0,
            len,
            is_fragment: false,
            first_letter: None,
            is_remaining_text: false,
        }
    }

    /// A fragment covering `start..start + len` of `text`.
    #[must_use]
    pub fn fragment(text: Rc<[u16]>, start: usize, len: usize) -> Self {
        debug_assert!(start + len <= text.len());
        LayoutText {
            text,
            start,
            len,
            is_fragment: true,
            first_letter: None,
            is_remaining_text: false,
        }
    }

    /// The whole underlying string, whatever window this object renders.
    #[must_use]
    pub const fn complete_text(&self) -> &Rc<[u16]> {
        &self.text
    }

    /// The code units this object renders.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.text[self.start..self.start + self.len]
    }

    /// The rendered text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf16_lossy(self.units())
    }

    /// Offset of the window into the complete text.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Length of the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True for first-letter fragments.
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    /// Replaces the complete text and widens the window over all of it.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.encode_utf16().collect();
        self.start = 0;
        self.len = self.text.len();
    }

    /// Points the window at `start..start + len` of `text`.
    pub fn set_text_fragment(&mut self, text: Rc<[u16]>, start: usize, len: usize) {
        debug_assert!(start + len <= text.len());
        self.text = text;
        self.start = start;
        self.len = len;
    }
}

/// Concrete layout object types.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum LayoutObjectKind {
    /// Root of the layout tree, standing for the viewport.
    View,
    /// Block container: `block`, `inline-block`, `flow-root`.
    BlockFlow,
    /// Inline box.
    Inline,
    /// `display: list-item`.
    ListItem,
    /// Anonymous marker box of a list item.
    ListMarker,
    /// `display: flex`.
    FlexibleBox,
    /// `display: grid`.
    Grid,
    /// `<button>`.
    Button,
    /// `<select>`.
    MenuList,
    /// `<img>`.
    Image,
    /// `<br>`.
    Br,
    /// Outermost `<svg>` element.
    SvgRoot,
    /// Any other SVG element.
    SvgContainer,
    /// A text run or text fragment.
    Text(LayoutText),
    /// Anonymous wrapper around the fullscreen element's box.
    FullScreen,
    /// Anonymous flow thread holding the content of a multi-column container.
    FlowThread,
}

impl LayoutObjectKind {
    /// Name used in tree dumps.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Text(text) if text.is_fragment() => "LayoutTextFragment".to_string(),
            _ => format!("Layout{self}"),
        }
    }

    const fn is_svg(&self) -> bool {
        matches!(self, Self::SvgRoot | Self::SvgContainer)
    }

    /// Block containers whose content can be split into columns.
    const fn is_block_container(&self) -> bool {
        matches!(self, Self::BlockFlow | Self::ListItem)
    }
}

bitflags! {
    /// State bits of one layout object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct LayoutFlags: u8 {
        /// The object lives inside a multi-column flow thread.
        const INSIDE_FLOW_THREAD = 1 << 0;
        /// Geometry must be recomputed.
        const NEEDS_LAYOUT = 1 << 1;
        /// Painted output must be refreshed.
        const NEEDS_PAINT_INVALIDATION = 1 << 2;
        /// [§ 6 'column-span'](https://www.w3.org/TR/css-multicol-1/#column-span)
        /// The object spans all columns of its multi-column container.
        const COLUMN_SPANNER = 1 << 3;
        /// No DOM node generated this object.
        const ANONYMOUS = 1 << 4;
    }
}

bitflags! {
    /// What a style update invalidates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleDifference: u8 {
        /// Geometry changes.
        const LAYOUT = 1 << 0;
        /// Only painted output changes.
        const PAINT = 1 << 1;
    }
}

impl StyleDifference {
    /// Compares two styles of the same object.
    #[must_use]
    pub fn between(old: &ComputedStyle, new: &ComputedStyle) -> Self {
        let mut diff = Self::empty();
        if old.display != new.display
            || old.display_none != new.display_none
            || old.float != new.float
            || old.position != new.position
            || old.content != new.content
            || old.inherited.font_size.to_bits() != new.inherited.font_size.to_bits()
            || old.inherited.text_transform != new.inherited.text_transform
            || old.column_count != new.column_count
            || old.column_span_all != new.column_span_all
        {
            diff.insert(Self::LAYOUT);
        }
        if old.inherited.color != new.inherited.color
            || old.inherited.visibility != new.inherited.visibility
            || old.opacity.to_bits() != new.opacity.to_bits()
            || old.animation_flags != new.animation_flags
        {
            diff.insert(Self::PAINT);
        }
        diff
    }
}

/// One object of the layout tree.
#[derive(Debug, Clone)]
pub struct LayoutObject {
    /// Concrete type.
    pub kind: LayoutObjectKind,
    /// Generating DOM node, `None` for anonymous objects.
    pub node: Option<NodeId>,
    style: Option<Rc<ComputedStyle>>,
    /// Parent object, `None` for the view and for detached objects.
    pub parent: Option<LayoutId>,
    /// Children in order.
    pub children: Vec<LayoutId>,
    /// State bits.
    pub flags: LayoutFlags,
}

impl LayoutObject {
    fn new(kind: LayoutObjectKind, node: Option<NodeId>) -> Self {
        LayoutObject {
            kind,
            node,
            style: None,
            parent: None,
            children: Vec::new(),
            flags: LayoutFlags::empty(),
        }
    }

    /// The object's style; `None` until the first `set_style`.
    #[must_use]
    pub const fn style(&self) -> Option<&Rc<ComputedStyle>> {
        self.style.as_ref()
    }

    /// Pseudo-element type of the object's style.
    #[must_use]
    pub fn style_type(&self) -> PseudoId {
        self.style.as_ref().map_or(PseudoId::NoPseudo, |s| s.style_type)
    }

    /// The text payload of text objects.
    #[must_use]
    pub const fn as_text(&self) -> Option<&LayoutText> {
        match &self.kind {
            LayoutObjectKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for text objects and fragments.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Text(_))
    }

    /// True for floats and absolutely or fixed positioned boxes.
    #[must_use]
    pub fn is_floating_or_out_of_flow_positioned(&self) -> bool {
        !self.is_text()
            && self
                .style
                .as_ref()
                .is_some_and(|s| s.is_floating() || s.is_out_of_flow_positioned())
    }

    /// [§ 2.4 Atomic inlines](https://www.w3.org/TR/css-display-3/#atomic-inline)
    ///
    /// Replaced elements and inline-level block containers.
    #[must_use]
    pub fn is_atomic_inline_level(&self) -> bool {
        match self.kind {
            LayoutObjectKind::Image | LayoutObjectKind::SvgRoot => true,
            LayoutObjectKind::BlockFlow => self
                .style
                .as_ref()
                .is_some_and(|s| s.display.is_atomic_inline()),
            _ => false,
        }
    }

    /// True for block flows, list items and the view.
    #[must_use]
    pub const fn is_block_flow(&self) -> bool {
        matches!(
            self.kind,
            LayoutObjectKind::View | LayoutObjectKind::BlockFlow | LayoutObjectKind::ListItem
        )
    }
}

/// Serializable view of a layout subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    /// Object type name.
    pub kind: String,
    /// Generating node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    /// Short description of the generating node.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Rendered text of text objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Pseudo-element type of the object's style.
    pub style_type: PseudoId,
    /// State bits.
    pub flags: LayoutFlags,
    /// Children.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutSnapshot>,
}

/// Arena of layout objects rooted at a view.
#[derive(Debug, Clone)]
pub struct LayoutTree {
    objects: Vec<Option<LayoutObject>>,
    /// Slots of destroyed objects, reused by `create`.
    free: Vec<LayoutId>,
    node_map: HashMap<NodeId, LayoutId>,
}

impl LayoutTree {
    /// A tree holding only the view, styled with `view_style`.
    #[must_use]
    pub fn new(view_style: Rc<ComputedStyle>) -> Self {
        let mut view = LayoutObject::new(LayoutObjectKind::View, Some(NodeId::ROOT));
        view.style = Some(view_style);
        let mut node_map = HashMap::new();
        let _ = node_map.insert(NodeId::ROOT, LayoutId::VIEW);
        LayoutTree {
            objects: vec![Some(view)],
            free: Vec::new(),
            node_map,
        }
    }

    /// The view.
    #[must_use]
    pub const fn view(&self) -> LayoutId {
        LayoutId::VIEW
    }

    /// The object with `id`, if it is alive.
    #[must_use]
    pub fn get(&self, id: LayoutId) -> Option<&LayoutObject> {
        self.objects.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to the object with `id`.
    pub fn get_mut(&mut self, id: LayoutId) -> Option<&mut LayoutObject> {
        self.objects.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of allocated slots, live or free.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live objects, the view included.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    /// Allocates a detached, unstyled object.
    pub fn create(&mut self, kind: LayoutObjectKind, node: Option<NodeId>) -> LayoutId {
        let object = Some(LayoutObject::new(kind, node));
        if let Some(id) = self.free.pop() {
            self.objects[id.0] = object;
            return id;
        }
        let id = LayoutId(self.objects.len());
        self.objects.push(object);
        id
    }

    /// Allocates a detached anonymous object styled with `style`.
    pub fn create_anonymous(&mut self, kind: LayoutObjectKind, style: Rc<ComputedStyle>) -> LayoutId {
        let id = self.create(kind, None);
        if let Some(object) = self.get_mut(id) {
            object.style = Some(style);
            object.flags.insert(LayoutFlags::ANONYMOUS);
        }
        id
    }

    /// The object `node` is mapped to.
    #[must_use]
    pub fn layout_object(&self, node: NodeId) -> Option<LayoutId> {
        self.node_map.get(&node).copied()
    }

    /// Maps `node` to `object`, or unmaps it.
    pub fn set_layout_object(&mut self, node: NodeId, object: Option<LayoutId>) {
        match object {
            Some(object) => {
                let _ = self.node_map.insert(node, object);
            }
            None => {
                let _ = self.node_map.remove(&node);
            }
        }
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: LayoutId) -> Option<LayoutId> {
        self.get(id)?.parent
    }

    /// Children of `id`.
    #[must_use]
    pub fn children(&self, id: LayoutId) -> &[LayoutId] {
        self.get(id).map_or(&[], |o| o.children.as_slice())
    }

    /// First child of `id`.
    #[must_use]
    pub fn first_child(&self, id: LayoutId) -> Option<LayoutId> {
        self.children(id).first().copied()
    }

    /// Next sibling of `id`.
    #[must_use]
    pub fn next_sibling(&self, id: LayoutId) -> Option<LayoutId> {
        let siblings = self.children(self.parent(id)?);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Style of `id`.
    #[must_use]
    pub fn style(&self, id: LayoutId) -> Option<&Rc<ComputedStyle>> {
        self.get(id)?.style()
    }

    /// Descendants of `id` in pre-order, `id` excluded.
    #[must_use]
    pub fn descendants(&self, id: LayoutId) -> Vec<LayoutId> {
        let mut result = Vec::new();
        let mut stack: Vec<LayoutId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// The flow thread of a multi-column container.
    #[must_use]
    pub fn flow_thread(&self, id: LayoutId) -> Option<LayoutId> {
        self.children(id).iter().copied().find(|&child| {
            self.get(child)
                .is_some_and(|o| o.kind == LayoutObjectKind::FlowThread)
        })
    }

    /// True if `id` lives inside a flow thread.
    #[must_use]
    pub fn is_inside_flow_thread(&self, id: LayoutId) -> bool {
        self.get(id)
            .is_some_and(|o| o.flags.contains(LayoutFlags::INSIDE_FLOW_THREAD))
    }

    /// True if objects added under `parent` end up inside a flow thread.
    #[must_use]
    pub fn children_inside_flow_thread(&self, parent: LayoutId) -> bool {
        self.is_inside_flow_thread(parent) || self.flow_thread(parent).is_some()
    }

    /// Sets or clears [`LayoutFlags::INSIDE_FLOW_THREAD`] on `id` alone.
    pub fn set_inside_flow_thread(&mut self, id: LayoutId, inside: bool) {
        if let Some(object) = self.get_mut(id) {
            object.flags.set(LayoutFlags::INSIDE_FLOW_THREAD, inside);
        }
    }

    fn set_inside_flow_thread_including_descendants(&mut self, id: LayoutId, inside: bool) {
        self.set_inside_flow_thread(id, inside);
        for descendant in self.descendants(id) {
            self.set_inside_flow_thread(descendant, inside);
        }
    }

    /// Inserts `child` under `parent` before `before`, or last.
    ///
    /// Content of a multi-column container is redirected into its flow
    /// thread. If `before` is not a direct child of the insertion parent,
    /// the ancestor of `before` that is one is used instead.
    pub fn add_child(&mut self, parent: LayoutId, child: LayoutId, before: Option<LayoutId>) {
        let parent = match self.flow_thread(parent) {
            Some(flow_thread) if before != Some(flow_thread) => flow_thread,
            _ => parent,
        };
        let before = before.and_then(|b| self.insertion_point(parent, b));
        let index = before
            .and_then(|b| self.children(parent).iter().position(|&c| c == b))
            .unwrap_or(self.children(parent).len());
        self.insert_child_at(parent, child, index);
    }

    fn insertion_point(&self, parent: LayoutId, mut before: LayoutId) -> Option<LayoutId> {
        loop {
            let before_parent = self.parent(before)?;
            if before_parent == parent {
                return Some(before);
            }
            before = before_parent;
        }
    }

    fn insert_child_at(&mut self, parent: LayoutId, child: LayoutId, index: usize) {
        debug_assert!(self.parent(child).is_none(), "layout object inserted twice");
        if let Some(object) = self.get_mut(child) {
            object.parent = Some(parent);
        }
        if let Some(object) = self.get_mut(parent) {
            object.children.insert(index.min(object.children.len()), child);
            object.flags.insert(LayoutFlags::NEEDS_LAYOUT);
        }
    }

    fn remove_from_parent(&mut self, child: LayoutId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(object) = self.get_mut(parent) {
            object.children.retain(|&c| c != child);
            object.flags.insert(LayoutFlags::NEEDS_LAYOUT);
        }
        if let Some(object) = self.get_mut(child) {
            object.parent = None;
        }
    }

    /// Destroys `id` and its remaining descendants.
    ///
    /// Returns the first-letter pseudo-elements whose remaining-text fragment
    /// was destroyed; their back-reference must be cleared. A fullscreen
    /// wrapper left empty is destroyed as well.
    pub fn destroy(&mut self, id: LayoutId) -> Vec<NodeId> {
        debug_assert!(id != LayoutId::VIEW, "the view is never destroyed");
        let parent = self.parent(id);
        self.remove_from_parent(id);
        let mut orphaned = Vec::new();
        self.destroy_subtree(id, &mut orphaned);

        if let Some(parent) = parent
            && self.get(parent).is_some_and(|p| {
                p.kind == LayoutObjectKind::FullScreen && p.children.is_empty()
            })
        {
            orphaned.extend(self.destroy(parent));
        }
        orphaned
    }

    fn destroy_subtree(&mut self, id: LayoutId, orphaned: &mut Vec<NodeId>) {
        let Some(object) = self.objects.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.free.push(id);
        for child in object.children {
            self.destroy_subtree(child, orphaned);
        }
        if let Some(node) = object.node
            && self.node_map.get(&node) == Some(&id)
        {
            let _ = self.node_map.remove(&node);
        }
        if let LayoutObjectKind::Text(text) = object.kind
            && text.is_remaining_text
            && let Some(pseudo) = text.first_letter
        {
            orphaned.push(pseudo);
        }
    }

    /// Gives `id` a new style, diffing against the old one.
    ///
    /// The first style is a full difference. Style-change hooks run after
    /// the style is stored: list items get their marker, multi-column
    /// containers get (or lose) their flow thread, and column spanners are
    /// recognised inside flow threads.
    pub fn set_style(&mut self, id: LayoutId, style: Rc<ComputedStyle>) -> StyleDifference {
        let Some(object) = self.get_mut(id) else {
            return StyleDifference::empty();
        };
        let old = object.style.replace(Rc::clone(&style));
        let diff = old
            .as_ref()
            .map_or(StyleDifference::all(), |old| StyleDifference::between(old, &style));
        if diff.contains(StyleDifference::LAYOUT) {
            object.flags.insert(LayoutFlags::NEEDS_LAYOUT);
        }
        if !diff.is_empty() {
            object.flags.insert(LayoutFlags::NEEDS_PAINT_INVALIDATION);
        }
        self.style_did_change(id, &style);
        diff
    }

    /// Replaces the style of `id` without diffing or hooks.
    pub fn set_style_internal(&mut self, id: LayoutId, style: Rc<ComputedStyle>) {
        if let Some(object) = self.get_mut(id) {
            object.style = Some(style);
        }
    }

    fn style_did_change(&mut self, id: LayoutId, style: &Rc<ComputedStyle>) {
        let Some(object) = self.get(id) else {
            return;
        };
        let kind = object.kind.clone();
        let inside_flow_thread = object.flags.contains(LayoutFlags::INSIDE_FLOW_THREAD);

        // [CSS Lists § 3](https://www.w3.org/TR/css-lists-3/#markers)
        // "list items ... generate a ::marker pseudo-element"
        if kind == LayoutObjectKind::ListItem && self.list_marker(id).is_none() {
            let marker = self.create_anonymous(LayoutObjectKind::ListMarker, Rc::clone(style));
            self.insert_child_at(id, marker, 0);
        }

        // [§ 3 The Multi-column Model](https://www.w3.org/TR/css-multicol-1/#the-multi-column-model)
        if kind.is_block_container() {
            match (style.specifies_columns(), self.flow_thread(id)) {
                (true, None) => self.create_flow_thread(id, style),
                (false, Some(flow_thread)) => self.evacuate_flow_thread(id, flow_thread),
                _ => {}
            }
        }

        // [§ 6 'column-span'](https://www.w3.org/TR/css-multicol-1/#column-span)
        // "column-span: all" only means something inside a multicol container.
        let is_spanner = inside_flow_thread
            && style.column_span_all
            && kind.is_block_container()
            && !style.is_floating()
            && !style.is_out_of_flow_positioned();
        if let Some(object) = self.get_mut(id) {
            object.flags.set(LayoutFlags::COLUMN_SPANNER, is_spanner);
        }

        let anonymous: Vec<LayoutId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|&child| {
                self.get(child).is_some_and(|o| {
                    matches!(
                        o.kind,
                        LayoutObjectKind::ListMarker | LayoutObjectKind::FlowThread
                    )
                })
            })
            .collect();
        for child in anonymous {
            self.set_style_internal(child, Rc::clone(style));
        }
    }

    fn list_marker(&self, id: LayoutId) -> Option<LayoutId> {
        self.children(id).iter().copied().find(|&child| {
            self.get(child)
                .is_some_and(|o| o.kind == LayoutObjectKind::ListMarker)
        })
    }

    fn create_flow_thread(&mut self, block: LayoutId, style: &Rc<ComputedStyle>) {
        let flow_thread = self.create_anonymous(LayoutObjectKind::FlowThread, Rc::clone(style));
        self.set_inside_flow_thread(flow_thread, true);
        let content: Vec<LayoutId> = self
            .children(block)
            .iter()
            .copied()
            .filter(|&child| {
                self.get(child)
                    .is_some_and(|o| o.kind != LayoutObjectKind::ListMarker)
            })
            .collect();
        for child in content {
            self.remove_from_parent(child);
            let index = self.children(flow_thread).len();
            self.insert_child_at(flow_thread, child, index);
            self.set_inside_flow_thread_including_descendants(child, true);
        }
        let index = self.children(block).len();
        self.insert_child_at(block, flow_thread, index);
    }

    fn evacuate_flow_thread(&mut self, block: LayoutId, flow_thread: LayoutId) {
        let inside = self.is_inside_flow_thread(block);
        let content = self.children(flow_thread).to_vec();
        for child in content {
            self.remove_from_parent(child);
            let index = self
                .children(block)
                .iter()
                .position(|&c| c == flow_thread)
                .unwrap_or(self.children(block).len());
            self.insert_child_at(block, child, index);
            self.set_inside_flow_thread_including_descendants(child, inside);
        }
        let _ = self.destroy(flow_thread);
    }

    /// Wraps `content` in a fullscreen wrapper and returns the wrapper.
    pub fn wrap_in_full_screen(&mut self, content: LayoutId) -> LayoutId {
        let style = self
            .style(content)
            .cloned()
            .unwrap_or_else(|| Rc::new(ComputedStyle::for_document()));
        let wrapper = self.create_anonymous(LayoutObjectKind::FullScreen, style);
        let inside = self.is_inside_flow_thread(content);
        self.set_inside_flow_thread(wrapper, inside);
        self.insert_child_at(wrapper, content, 0);
        wrapper
    }

    /// Replaces the complete text of a text object.
    ///
    /// Returns the first-letter pseudo-element to refresh if `id` is a
    /// remaining-text fragment.
    pub fn set_text(&mut self, id: LayoutId, text: &str) -> Option<NodeId> {
        let object = self.get_mut(id)?;
        let LayoutObjectKind::Text(layout_text) = &mut object.kind else {
            return None;
        };
        layout_text.set_text(text);
        object.flags.insert(LayoutFlags::NEEDS_LAYOUT);
        if layout_text.is_remaining_text {
            return layout_text.first_letter;
        }
        None
    }

    /// Re-points the window of a text object.
    pub fn set_text_fragment(&mut self, id: LayoutId, text: Rc<[u16]>, start: usize, len: usize) {
        if let Some(object) = self.get_mut(id)
            && let LayoutObjectKind::Text(layout_text) = &mut object.kind
        {
            layout_text.set_text_fragment(text, start, len);
            object.flags.insert(LayoutFlags::NEEDS_LAYOUT);
        }
    }

    /// Mutable access to the text payload of `id`.
    pub fn text_mut(&mut self, id: LayoutId) -> Option<&mut LayoutText> {
        match &mut self.get_mut(id)?.kind {
            LayoutObjectKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True if `parent` accepts `child`.
    ///
    /// Menu lists only take `<option>` and `<optgroup>` boxes, SVG
    /// containers only take SVG boxes.
    #[must_use]
    pub fn is_child_allowed(&self, parent: LayoutId, child: LayoutId, dom: &DomTree) -> bool {
        let (Some(parent), Some(child)) = (self.get(parent), self.get(child)) else {
            return false;
        };
        match parent.kind {
            LayoutObjectKind::MenuList => child
                .node
                .and_then(|n| dom.as_element(n))
                .is_some_and(|e| {
                    e.tag_name.eq_ignore_ascii_case("option")
                        || e.tag_name.eq_ignore_ascii_case("optgroup")
                }),
            LayoutObjectKind::SvgRoot | LayoutObjectKind::SvgContainer => child.kind.is_svg(),
            _ => true,
        }
    }

    /// True if `id` may have children at all.
    #[must_use]
    pub fn can_have_children(&self, id: LayoutId) -> bool {
        self.get(id).is_some_and(|o| {
            !matches!(
                o.kind,
                LayoutObjectKind::Text(_)
                    | LayoutObjectKind::Image
                    | LayoutObjectKind::Br
                    | LayoutObjectKind::ListMarker
            )
        })
    }

    /// True if `id` may host `::before`, `::after`, `::backdrop` or
    /// `::first-letter` boxes.
    #[must_use]
    pub fn can_have_generated_children(&self, id: LayoutId) -> bool {
        self.can_have_children(id)
            && self
                .get(id)
                .is_some_and(|o| o.kind != LayoutObjectKind::MenuList)
    }

    /// Serializable snapshot of the whole tree.
    #[must_use]
    pub fn snapshot(&self, dom: &DomTree) -> LayoutSnapshot {
        self.snapshot_of(LayoutId::VIEW, dom)
    }

    fn snapshot_of(&self, id: LayoutId, dom: &DomTree) -> LayoutSnapshot {
        let Some(object) = self.get(id) else {
            return LayoutSnapshot {
                kind: String::new(),
                node: None,
                label: String::new(),
                text: None,
                style_type: PseudoId::NoPseudo,
                flags: LayoutFlags::empty(),
                children: Vec::new(),
            };
        };
        LayoutSnapshot {
            kind: object.kind.name(),
            node: object.node,
            label: object.node.map(|n| describe_node(dom, n)).unwrap_or_default(),
            text: object.as_text().map(LayoutText::text),
            style_type: object.style_type(),
            flags: object.flags,
            children: object
                .children
                .iter()
                .map(|&child| self.snapshot_of(child, dom))
                .collect(),
        }
    }

    /// Indented text rendering of the tree, one object per line.
    #[must_use]
    pub fn dump(&self, dom: &DomTree) -> String {
        let mut out = String::new();
        self.dump_object(LayoutId::VIEW, dom, 0, &mut out);
        out
    }

    fn dump_object(&self, id: LayoutId, dom: &DomTree, depth: usize, out: &mut String) {
        let Some(object) = self.get(id) else {
            return;
        };
        let _ = write!(out, "{}{}", "  ".repeat(depth), object.kind.name());
        if let Some(node) = object.node {
            let _ = write!(out, " {}", describe_node(dom, node));
        } else if object.style_type() != PseudoId::NoPseudo {
            let _ = write!(out, " (anonymous {})", object.style_type());
        }
        if let Some(text) = object.as_text() {
            let _ = write!(out, " {:?}", text.text());
        }
        if object.flags.contains(LayoutFlags::INSIDE_FLOW_THREAD) {
            out.push_str(" [in-flow-thread]");
        }
        if object.flags.contains(LayoutFlags::COLUMN_SPANNER) {
            out.push_str(" [column-spanner]");
        }
        out.push('\n');
        for &child in &object.children {
            self.dump_object(child, dom, depth + 1, out);
        }
    }
}

/// `<tag#id.class>`, `#text`, `::before`, `#document`.
fn describe_node(dom: &DomTree, node: NodeId) -> String {
    let Some(n) = dom.get(node) else {
        return String::new();
    };
    match &n.node_type {
        NodeType::Document => "#document".to_string(),
        NodeType::Element(data) => {
            let mut label = format!("<{}", data.tag_name);
            if let Some(id) = data.id() {
                let _ = write!(label, "#{id}");
            }
            let mut classes: Vec<&str> = data.classes().into_iter().collect();
            classes.sort_unstable();
            for class in classes {
                let _ = write!(label, ".{class}");
            }
            label.push('>');
            label
        }
        NodeType::Text(_) => "#text".to_string(),
        NodeType::Comment(_) => "#comment".to_string(),
        NodeType::ShadowRoot => "#shadow-root".to_string(),
        NodeType::PseudoElement(pseudo) => pseudo.to_string(),
    }
}
