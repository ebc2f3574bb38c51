//! Retained-mode drawing
//!
//! The renderer builds the gauge out of a handful of primitives on a
//! [`DrawSurface`]. Primitives are added once and addressed by id afterwards,
//! so a frame update is "remove these ids, add these primitives" and nothing
//! else on the surface is touched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::angle::ArcSpan;

/// Surface coordinates, y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// 24-bit RGB colour, written as `#rrggbb` (or the short `#rgb` form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{}' must start with '#'", s))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("colour '{}' is not hex", s));
        }
        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|_| format!("colour '{}' is not hex", s))
        };
        match hex.len() {
            3 => {
                // #abc is #aabbcc
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(format!("colour '{}' must have 3 or 6 hex digits", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Line end style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
}

/// Something drawn on the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
        cap: LineCap,
    },
    /// Text centred on `at`
    Text {
        at: Point,
        text: String,
        color: Color,
        size: f64,
        bold: bool,
    },
    /// Stroked arc around `center`
    Arc {
        center: Point,
        radius: f64,
        span: ArcSpan,
        color: Color,
        width: f64,
    },
    /// Circle, optionally filled
    Oval {
        center: Point,
        radius: f64,
        fill: Option<Color>,
        outline: Option<Color>,
        width: f64,
    },
}

impl Primitive {
    pub fn text(&self) -> Option<&str> {
        match self {
            Primitive::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Handle to a primitive on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimitiveId(pub u64);

/// A retained-mode drawing target
pub trait DrawSurface {
    fn add(&mut self, primitive: Primitive) -> PrimitiveId;

    /// Remove a primitive; unknown ids are ignored
    fn remove(&mut self, id: PrimitiveId);

    /// Make the current contents visible
    fn present(&mut self) {}
}

/// In-memory surface that keeps the display list and counts mutations
#[derive(Debug, Default, Serialize)]
pub struct RecordingSurface {
    items: BTreeMap<PrimitiveId, Primitive>,
    #[serde(skip)]
    next_id: u64,
    #[serde(skip)]
    adds: u64,
    #[serde(skip)]
    removes: u64,
    #[serde(skip)]
    presents: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.items.contains_key(&id)
    }

    /// Primitives in drawing order
    pub fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.items.iter().map(|(id, p)| (*id, p))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn adds(&self) -> u64 {
        self.adds
    }

    pub fn removes(&self) -> u64 {
        self.removes
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    pub fn reset_counters(&mut self) {
        self.adds = 0;
        self.removes = 0;
        self.presents = 0;
    }

    /// Display list as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.items.values().collect::<Vec<_>>())
    }
}

impl DrawSurface for RecordingSurface {
    fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.adds += 1;
        self.items.insert(id, primitive);
        id
    }

    fn remove(&mut self, id: PrimitiveId) {
        if self.items.remove(&id).is_some() {
            self.removes += 1;
        }
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
