//! Declared property values, as written in a rule's declaration block.
//!
//! Declarations arrive pre-parsed (as JSON in scenarios), so each property is
//! an optional typed value rather than a token stream.

use serde::{Deserialize, Serialize};

use super::computed::ComputedStyle;
use super::display::DisplayKeyword;
use super::values::{ColumnSpan, Float, Position, TextTransform, Visibility};

/// The `inherit` keyword, accepted for `color`.
pub const INHERIT_KEYWORD: &str = "inherit";

/// [§ 4.1 Declared Values](https://www.w3.org/TR/css-cascade-4/#declared)
///
/// "Each property can receive zero or more declared values."
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StyleDeclaration {
    /// `display`
    pub display: Option<DisplayKeyword>,
    /// `float`
    pub float: Option<Float>,
    /// `position`
    pub position: Option<Position>,
    /// `content`: a string, or absent for `content: none`.
    pub content: Option<String>,
    /// `color`, or `"inherit"`.
    pub color: Option<String>,
    /// `font-size` in px.
    pub font_size: Option<f32>,
    /// `text-transform`
    pub text_transform: Option<TextTransform>,
    /// `visibility`
    pub visibility: Option<Visibility>,
    /// `opacity`
    pub opacity: Option<f32>,
    /// `column-count`
    pub column_count: Option<u32>,
    /// `column-span`
    pub column_span: Option<ColumnSpan>,
}

impl StyleDeclaration {
    /// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
    ///
    /// Applies every declared property over `style`. Later calls win, so the
    /// caller applies declarations in ascending cascade order.
    pub fn apply_to(&self, style: &mut ComputedStyle, parent: Option<&ComputedStyle>) {
        if let Some(display) = self.display {
            match display.to_value() {
                Some(value) => {
                    style.display = value;
                    style.display_none = false;
                }
                None => style.display_none = true,
            }
        }
        if let Some(float) = self.float {
            style.float = float;
        }
        if let Some(position) = self.position {
            style.position = position;
        }
        if let Some(content) = &self.content {
            style.content = Some(content.clone());
        }
        if let Some(color) = &self.color {
            if color.eq_ignore_ascii_case(INHERIT_KEYWORD) {
                // [§ 7.3.3 Explicit Inheritance](https://www.w3.org/TR/css-cascade-4/#inherit)
                style.has_explicitly_inherited = true;
                if let Some(parent) = parent {
                    style.inherited.color.clone_from(&parent.inherited.color);
                }
            } else {
                style.inherited.color.clone_from(color);
            }
        }
        if let Some(font_size) = self.font_size {
            style.inherited.font_size = font_size;
        }
        if let Some(text_transform) = self.text_transform {
            style.inherited.text_transform = text_transform;
        }
        if let Some(visibility) = self.visibility {
            style.inherited.visibility = visibility;
        }
        if let Some(opacity) = self.opacity {
            style.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(column_count) = self.column_count {
            style.column_count = Some(column_count);
        }
        if let Some(column_span) = self.column_span {
            style.column_span_all = column_span == ColumnSpan::All;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::DisplayValue;

    #[test]
    fn test_apply_display_none_and_back() {
        let mut style = ComputedStyle::default();
        let none = StyleDeclaration {
            display: Some(DisplayKeyword::None),
            ..StyleDeclaration::default()
        };
        none.apply_to(&mut style, None);
        assert!(style.is_display_none());

        let block = StyleDeclaration {
            display: Some(DisplayKeyword::Block),
            ..StyleDeclaration::default()
        };
        block.apply_to(&mut style, None);
        assert!(!style.is_display_none());
        assert_eq!(style.display, DisplayValue::block());
    }

    #[test]
    fn test_inherit_keyword_marks_style() {
        let mut parent = ComputedStyle::default();
        parent.inherited.color = "green".to_string();
        let mut style = ComputedStyle::default();
        let decl = StyleDeclaration {
            color: Some("inherit".to_string()),
            ..StyleDeclaration::default()
        };
        decl.apply_to(&mut style, Some(&parent));
        assert!(style.has_explicitly_inherited);
        assert_eq!(style.inherited.color, "green");
    }
}
