//! Built-in card style templates
//!
//! A template is a named style patch merged onto the selected card.

use serde_json::Value;

use crate::document::{fields, CardDocument};

/// A named style preset
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub bg_color: &'static str,
    pub border_color: &'static str,
    pub border_width: u32,
    pub border_radius: u32,
    pub text_color: &'static str,
    pub font_family: &'static str,
    pub symbol_size: u32,
    pub text_shadow: u32,
}

impl Template {
    /// The style patch this template applies
    pub fn patch(&self) -> CardDocument {
        CardDocument::from_pairs([
            (fields::BG_COLOR, Value::from(self.bg_color)),
            (fields::BORDER_COLOR, Value::from(self.border_color)),
            (fields::BORDER_WIDTH, Value::from(self.border_width)),
            (fields::BORDER_RADIUS, Value::from(self.border_radius)),
            (fields::TEXT_COLOR, Value::from(self.text_color)),
            (fields::FONT_FAMILY, Value::from(self.font_family)),
            (fields::SYMBOL_SIZE, Value::from(self.symbol_size)),
            (fields::TEXT_SHADOW, Value::from(self.text_shadow)),
        ])
    }
}

pub const TEMPLATES: [Template; 6] = [
    Template {
        id: "classic",
        name: "Classic",
        bg_color: "#FFFFFF",
        border_color: "#000000",
        border_width: 2,
        border_radius: 8,
        text_color: "#000000",
        font_family: "serif",
        symbol_size: 18,
        text_shadow: 0,
    },
    Template {
        id: "modern",
        name: "Modern",
        bg_color: "#2D2A4A",
        border_color: "#FF7E67",
        border_width: 4,
        border_radius: 12,
        text_color: "#FFFFFF",
        font_family: "sans-serif",
        symbol_size: 16,
        text_shadow: 2,
    },
    Template {
        id: "neon",
        name: "Neon",
        bg_color: "#121212",
        border_color: "#00FF99",
        border_width: 3,
        border_radius: 10,
        text_color: "#00FF99",
        font_family: "monospace",
        symbol_size: 16,
        text_shadow: 5,
    },
    Template {
        id: "vintage",
        name: "Vintage",
        bg_color: "#E8D0A9",
        border_color: "#B45309",
        border_width: 5,
        border_radius: 0,
        text_color: "#78350F",
        font_family: "'Times New Roman', serif",
        symbol_size: 18,
        text_shadow: 1,
    },
    Template {
        id: "minimalist",
        name: "Minimalist",
        bg_color: "#F9FAFB",
        border_color: "#E5E7EB",
        border_width: 1,
        border_radius: 16,
        text_color: "#111827",
        font_family: "Arial, sans-serif",
        symbol_size: 14,
        text_shadow: 0,
    },
    Template {
        id: "dark",
        name: "Dark Mode",
        bg_color: "#1F2937",
        border_color: "#4B5563",
        border_width: 2,
        border_radius: 8,
        text_color: "#F3F4F6",
        font_family: "sans-serif",
        symbol_size: 16,
        text_shadow: 3,
    },
];

/// Look up a built-in template by id (case-insensitive)
pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}
