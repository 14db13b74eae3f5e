//! CSS Display property types
//!
//! [§ 2 Box Layout Modes: the display property](https://www.w3.org/TR/css-display-3/#the-display-properties)

use serde::{Deserialize, Serialize};

// [§ 2 Box Layout Modes: the display property](https://www.w3.org/TR/css-display-3/#the-display-properties)
//
// "The display property defines an element's display type, which consists of
// the two basic qualities of how an element generates boxes:
//   - the inner display type, which defines the kind of formatting context
//     it generates, dictating how its descendant boxes are laid out.
//   - the outer display type, which dictates how the principal box itself
//     participates in flow layout."

/// [§ 2.1 Outer Display Roles](https://www.w3.org/TR/css-display-3/#outer-role)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OuterDisplayType {
    /// "The element generates a block-level box when placed in flow layout."
    Block,
    /// "The element generates an inline-level box when placed in flow layout."
    Inline,
}

/// [§ 2.2 Inner Display Layout Models](https://www.w3.org/TR/css-display-3/#inner-model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InnerDisplayType {
    /// "The element lays out its contents using flow layout (block-and-inline layout)."
    Flow,
    /// Same as Flow but establishes a new block formatting context.
    FlowRoot,
    /// "The element lays out its contents using flex layout."
    Flex,
    /// "The element lays out its contents using grid layout."
    Grid,
}

/// Combined display value
/// [§ 2 Box Layout Modes](https://www.w3.org/TR/css-display-3/#the-display-properties)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayValue {
    /// "The outer display type, which dictates how the box participates in flow layout."
    pub outer: OuterDisplayType,
    /// "The inner display type, which dictates how its descendant boxes are laid out."
    pub inner: InnerDisplayType,
    /// [§ 2.3 Generating Marker Boxes](https://www.w3.org/TR/css-display-3/#list-items)
    ///
    /// "The list-item keyword causes the element to generate a ::marker
    /// pseudo-element box."
    pub list_item: bool,
}

impl DisplayValue {
    /// `display: block` - block outer, flow inner
    #[must_use]
    pub const fn block() -> Self {
        Self {
            outer: OuterDisplayType::Block,
            inner: InnerDisplayType::Flow,
            list_item: false,
        }
    }

    /// `display: inline` - inline outer, flow inner
    #[must_use]
    pub const fn inline() -> Self {
        Self {
            outer: OuterDisplayType::Inline,
            inner: InnerDisplayType::Flow,
            list_item: false,
        }
    }

    /// `display: inline-block` - inline outer, flow-root inner
    #[must_use]
    pub const fn inline_block() -> Self {
        Self {
            outer: OuterDisplayType::Inline,
            inner: InnerDisplayType::FlowRoot,
            list_item: false,
        }
    }

    /// `display: flex` - block outer, flex inner
    #[must_use]
    pub const fn flex() -> Self {
        Self {
            outer: OuterDisplayType::Block,
            inner: InnerDisplayType::Flex,
            list_item: false,
        }
    }

    /// `display: grid` - block outer, grid inner
    #[must_use]
    pub const fn grid() -> Self {
        Self {
            outer: OuterDisplayType::Block,
            inner: InnerDisplayType::Grid,
            list_item: false,
        }
    }

    /// `display: list-item` - block outer, flow inner, with a marker
    #[must_use]
    pub const fn list_item() -> Self {
        Self {
            outer: OuterDisplayType::Block,
            inner: InnerDisplayType::Flow,
            list_item: true,
        }
    }

    /// [§ 2.4 Atomic inlines](https://www.w3.org/TR/css-display-3/#atomic-inline)
    ///
    /// "An inline-level box that is replaced or that establishes a new
    /// formatting context" (inline-block, inline-flex, ...).
    #[must_use]
    pub fn is_atomic_inline(self) -> bool {
        self.outer == OuterDisplayType::Inline && self.inner != InnerDisplayType::Flow
    }
}

/// The `display` keywords a declaration can carry.
///
/// `none` is kept apart from [`DisplayValue`], see
/// [`ComputedStyle::display_none`](super::ComputedStyle::display_none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayKeyword {
    /// [§ 2.6 display: none](https://www.w3.org/TR/css-display-3/#valdef-display-none)
    None,
    /// `display: block`
    Block,
    /// `display: inline`
    Inline,
    /// `display: inline-block`
    InlineBlock,
    /// `display: flex`
    Flex,
    /// `display: grid`
    Grid,
    /// `display: list-item`
    ListItem,
}

impl DisplayKeyword {
    /// The display value for this keyword, or `None` for `display: none`.
    #[must_use]
    pub const fn to_value(self) -> Option<DisplayValue> {
        match self {
            Self::None => None,
            Self::Block => Some(DisplayValue::block()),
            Self::Inline => Some(DisplayValue::inline()),
            Self::InlineBlock => Some(DisplayValue::inline_block()),
            Self::Flex => Some(DisplayValue::flex()),
            Self::Grid => Some(DisplayValue::grid()),
            Self::ListItem => Some(DisplayValue::list_item()),
        }
    }
}

/// [§ 15.3 Non-replaced elements](https://html.spec.whatwg.org/multipage/rendering.html#non-replaced-elements)
///
/// User-agent default display for an HTML element. `None` means `display: none`.
#[must_use]
pub fn default_display_for_element(tag_name: &str) -> Option<DisplayValue> {
    // [§ 15.3.1 Hidden elements]
    // "The following elements must have their display set to none:"
    let hidden = [
        "area", "base", "basefont", "datalist", "head", "link", "meta", "noembed", "noframes",
        "param", "rp", "script", "style", "template", "title",
    ];
    if hidden.contains(&tag_name) {
        return None;
    }

    // [§ 15.3.3 Flow content]
    let block_elements = [
        "address",
        "article",
        "aside",
        "blockquote",
        "body",
        "center",
        "dd",
        "details",
        "dialog",
        "div",
        "dl",
        "dt",
        "fieldset",
        "figcaption",
        "figure",
        "footer",
        "form",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "header",
        "hr",
        "html",
        "legend",
        "main",
        "menu",
        "nav",
        "ol",
        "p",
        "pre",
        "section",
        "summary",
        "ul",
    ];
    if block_elements.contains(&tag_name) {
        return Some(DisplayValue::block());
    }

    // [§ 15.3.7 Lists](https://html.spec.whatwg.org/multipage/rendering.html#lists)
    // "li { display: list-item; }"
    if tag_name == "li" {
        return Some(DisplayValue::list_item());
    }

    // Form controls are inline-block by default.
    if matches!(tag_name, "input" | "button" | "textarea" | "select") {
        return Some(DisplayValue::inline_block());
    }

    Some(DisplayValue::inline())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display_for_element() {
        assert_eq!(default_display_for_element("div"), Some(DisplayValue::block()));
        assert_eq!(default_display_for_element("span"), Some(DisplayValue::inline()));
        assert_eq!(
            default_display_for_element("li"),
            Some(DisplayValue::list_item())
        );
        assert_eq!(default_display_for_element("script"), None);
    }

    #[test]
    fn test_atomic_inline() {
        assert!(DisplayValue::inline_block().is_atomic_inline());
        assert!(!DisplayValue::inline().is_atomic_inline());
        assert!(!DisplayValue::block().is_atomic_inline());
    }
}
