//! Point-in-time views of the rendered page.
//!
//! A [`Snapshot`] is owned by whoever asked the driver for it; the engine only
//! reads it. Element identity across snapshots is carried by [`ElementRef`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, driver-assigned element identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    /// Create a reference from a driver id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw driver id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box has a non-zero area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Whether the box lies entirely before the document origin
    #[must_use]
    pub fn is_offscreen(&self) -> bool {
        self.x + self.width <= 0.0 || self.y + self.height <= 0.0
    }
}

/// Element data read from a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identity
    pub reference: ElementRef,
    /// Lower-case tag name
    pub tag: String,
    /// Rendered text
    #[serde(default)]
    pub text: String,
    /// Attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Current form value, if the element has one
    #[serde(default)]
    pub value: Option<String>,
    /// Layout box; `None` when the element is not laid out
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    /// Computed `display: none` (self or inherited)
    #[serde(default)]
    pub display_none: bool,
    /// Computed `visibility: hidden`
    #[serde(default)]
    pub visibility_hidden: bool,
}

impl ElementHandle {
    /// Create a visible element handle with a unit-sized box
    #[must_use]
    pub fn new(reference: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            reference: ElementRef::new(reference),
            tag: tag.into(),
            text: String::new(),
            attributes: BTreeMap::new(),
            value: None,
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            display_none: false,
            visibility_hidden: false,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Read an attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Rendered and laid out: non-zero size, not `display:none`,
    /// not `visibility:hidden`, not positioned off-screen
    #[must_use]
    pub fn is_visible(&self) -> bool {
        if self.display_none || self.visibility_hidden {
            return false;
        }
        match self.bounding_box {
            Some(b) => b.has_area() && !b.is_offscreen(),
            None => false,
        }
    }

    /// Text used for matching: rendered text, else `aria-label`, else value
    #[must_use]
    pub fn label(&self) -> &str {
        let text = self.text.trim();
        if !text.is_empty() {
            return text;
        }
        self.attribute("aria-label")
            .or(self.value.as_deref())
            .unwrap_or("")
    }
}

/// Elements returned by one driver query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Page URL at the time of the query
    pub url: String,
    /// Matching elements in document order
    pub elements: Vec<ElementHandle>,
    /// Clock reading when the snapshot was taken (ms)
    pub taken_at_ms: u64,
}

impl Snapshot {
    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Visible elements only
    pub fn visible(&self) -> impl Iterator<Item = &ElementHandle> {
        self.elements.iter().filter(|e| e.is_visible())
    }

    /// Look up an element by reference
    #[must_use]
    pub fn get(&self, reference: &ElementRef) -> Option<&ElementHandle> {
        self.elements.iter().find(|e| &e.reference == reference)
    }
}
