use std::collections::BTreeMap;

use directory::Entity;
use serde::{Deserialize, Serialize};

/// Marker tint as a CSS hex color.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerColor(pub String);

impl MarkerColor {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub const DEFAULT_MARKER_COLOR: &str = "#3388ff";

/// Department to marker color mapping.
///
/// A marker takes the color of its entity's first department; entities
/// without departments, or with an unmapped first department, get the
/// fallback color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentPalette {
    pub colors: BTreeMap<String, MarkerColor>,
    pub fallback: MarkerColor,
}

impl Default for DepartmentPalette {
    fn default() -> Self {
        Self::reference()
    }
}

impl DepartmentPalette {
    pub fn empty() -> Self {
        Self {
            colors: BTreeMap::new(),
            fallback: MarkerColor::new(DEFAULT_MARKER_COLOR),
        }
    }

    /// The eight stock departments and their pin colors.
    pub fn reference() -> Self {
        let mut palette = Self::empty();
        for (department, hex) in [
            ("Department A", "#ed6622"),
            ("Department B", "#dc31f3"),
            ("Department C", "#3460ed"),
            ("Department D", "#ed2222"),
            ("Department E", "#34c761"),
            ("Department F", "#2ee6e1"),
            ("Department G", "#e6e62e"),
            ("Department H", "#6c757d"),
        ] {
            palette.set(department, hex);
        }
        palette
    }

    pub fn set(&mut self, department: impl Into<String>, hex: impl Into<String>) {
        self.colors.insert(department.into(), MarkerColor::new(hex));
    }

    pub fn color_for_department(&self, department: &str) -> &MarkerColor {
        self.colors.get(department).unwrap_or(&self.fallback)
    }

    pub fn color_for(&self, entity: &Entity) -> &MarkerColor {
        match entity.primary_department() {
            Some(d) => self.color_for_department(d),
            None => &self.fallback,
        }
    }
}
