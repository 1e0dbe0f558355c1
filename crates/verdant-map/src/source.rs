#![forbid(unsafe_code)]

//! Icon and tooltip sources for a marker list.
//!
//! Both come in two shapes: a fixed value shared by every marker, or a
//! function evaluated per entity. Functions are held as `Rc<dyn Fn>` so a
//! source's identity is the allocation it points to; installing a clone of
//! the same source is a no-op, installing a freshly built closure is a
//! change. This is how layers signal "the inputs of the icon function
//! changed" (a new selection, a new highlight) without the engine having to
//! compare closures.

use std::fmt;
use std::rc::Rc;

use verdant_backend::{Tooltip, TooltipOptions};
use verdant_core::icon::Icon;

/// Per-entity icon function.
pub type IconFn<T> = Rc<dyn Fn(&T) -> Rc<Icon>>;

/// Per-entity tooltip text function.
pub type TooltipFn<T> = Rc<dyn Fn(&T) -> String>;

/// Callback invoked with the entity behind a clicked marker.
pub type ClickHandler<T> = Rc<dyn Fn(&T)>;

/// Where marker icons come from.
pub enum IconSource<T> {
    /// One icon for every marker.
    Static(Rc<Icon>),
    /// An icon computed from each entity.
    PerEntity(IconFn<T>),
}

impl<T> IconSource<T> {
    /// Wrap a per-entity function.
    pub fn from_fn(f: impl Fn(&T) -> Rc<Icon> + 'static) -> Self {
        Self::PerEntity(Rc::new(f))
    }

    /// Wrap a fixed icon.
    pub fn fixed(icon: impl Into<Rc<Icon>>) -> Self {
        Self::Static(icon.into())
    }

    /// Icon for `item`.
    pub fn icon_for(&self, item: &T) -> Rc<Icon> {
        match self {
            Self::Static(icon) => Rc::clone(icon),
            Self::PerEntity(f) => f(item),
        }
    }

    /// Whether `other` is the same source.
    ///
    /// Functions compare by allocation, static icons by value.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::PerEntity(a), Self::PerEntity(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_per_entity(&self) -> bool {
        matches!(self, Self::PerEntity(_))
    }
}

impl<T> Clone for IconSource<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(icon) => Self::Static(Rc::clone(icon)),
            Self::PerEntity(f) => Self::PerEntity(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for IconSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(icon) => f.debug_tuple("Static").field(&icon.key()).finish(),
            Self::PerEntity(func) => f
                .debug_tuple("PerEntity")
                .field(&Rc::as_ptr(func).cast::<()>())
                .finish(),
        }
    }
}

/// What a marker's tooltip says.
pub enum TooltipContent<T> {
    /// The same text for every marker.
    Static(String),
    /// Text computed from each entity.
    PerEntity(TooltipFn<T>),
}

impl<T> Clone for TooltipContent<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(text) => Self::Static(text.clone()),
            Self::PerEntity(f) => Self::PerEntity(Rc::clone(f)),
        }
    }
}

/// Tooltip content plus presentation options.
pub struct TooltipSource<T> {
    pub content: TooltipContent<T>,
    pub options: TooltipOptions,
}

impl<T> TooltipSource<T> {
    /// Per-entity text with the given options.
    pub fn from_fn(f: impl Fn(&T) -> String + 'static, options: TooltipOptions) -> Self {
        Self {
            content: TooltipContent::PerEntity(Rc::new(f)),
            options,
        }
    }

    /// Fixed text with the given options.
    pub fn text(text: impl Into<String>, options: TooltipOptions) -> Self {
        Self {
            content: TooltipContent::Static(text.into()),
            options,
        }
    }

    /// Bound tooltip for `item`.
    pub fn tooltip_for(&self, item: &T) -> Tooltip {
        let content = match &self.content {
            TooltipContent::Static(text) => text.clone(),
            TooltipContent::PerEntity(f) => f(item),
        };
        Tooltip {
            content,
            options: self.options.clone(),
        }
    }
}

impl<T> Clone for TooltipSource<T> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T> fmt::Debug for TooltipSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = match &self.content {
            TooltipContent::Static(text) => text.as_str(),
            TooltipContent::PerEntity(_) => "<fn>",
        };
        f.debug_struct("TooltipSource")
            .field("content", &content)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::icon::IconAnchor;

    fn icon(key: &str) -> Rc<Icon> {
        Rc::new(Icon::new(key, "", IconAnchor::default()))
    }

    #[test]
    fn per_entity_identity_is_the_allocation() {
        let a: IconSource<u32> = IconSource::from_fn(|_| icon("a"));
        let b: IconSource<u32> = IconSource::from_fn(|_| icon("a"));
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn static_icons_compare_by_value() {
        let a: IconSource<u32> = IconSource::fixed(icon("sensor"));
        let b: IconSource<u32> = IconSource::fixed(icon("sensor"));
        let c: IconSource<u32> = IconSource::fixed(icon("refill"));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(!a.same_as(&IconSource::from_fn(|_| icon("sensor"))));
    }

    #[test]
    fn icon_for_evaluates_function() {
        let src: IconSource<u32> = IconSource::from_fn(|n| icon(&format!("n{n}")));
        assert_eq!(src.icon_for(&7).key(), "n7");
        assert!(src.is_per_entity());
    }

    #[test]
    fn tooltips_bind_content_and_options() {
        let opts = TooltipOptions::above_marker();
        let by_fn: TooltipSource<u32> = TooltipSource::from_fn(|n| format!("Baum {n}"), opts.clone());
        let fixed: TooltipSource<u32> = TooltipSource::text("Sensor", opts.clone());

        let t = by_fn.tooltip_for(&3);
        assert_eq!(t.content, "Baum 3");
        assert_eq!(t.options, opts);
        assert_eq!(fixed.tooltip_for(&3).content, "Sensor");
    }
}
