#![forbid(unsafe_code)]

//! Marker icon values.
//!
//! An [`Icon`] is an immutable HTML snippet plus anchor offsets, the shape a
//! DOM-backed map surface turns into a div icon. Two icons are the same
//! visual when their [`Icon::key`] matches; the icon cache in `verdant-map`
//! relies on that to share allocations.

use std::fmt;

/// Pixel offset of an icon's anchor relative to its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IconAnchor {
    pub x: i32,
    pub y: i32,
}

impl IconAnchor {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for IconAnchor {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// A rendered marker icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Icon {
    key: String,
    html: String,
    anchor: IconAnchor,
    popup_anchor: Option<IconAnchor>,
}

impl Icon {
    /// Create an icon identified by `key`.
    pub fn new(key: impl Into<String>, html: impl Into<String>, anchor: IconAnchor) -> Self {
        Self {
            key: key.into(),
            html: html.into(),
            anchor,
            popup_anchor: None,
        }
    }

    /// Set the anchor popups open from.
    #[must_use]
    pub fn with_popup_anchor(mut self, anchor: IconAnchor) -> Self {
        self.popup_anchor = Some(anchor);
        self
    }

    /// Identity of the visual; equal keys render identically.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn anchor(&self) -> IconAnchor {
        self.anchor
    }

    pub fn popup_anchor(&self) -> Option<IconAnchor> {
        self.popup_anchor
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
