use serde::Serialize;

use switchboard_core::{DomainResult, require_non_blank};

/// Icons seeded on first run, in display order.
pub const DEFAULT_ICONS: [&str; 12] = [
    "📊", "👤", "✏️", "💻", "🗂️", "⚙️", "📄", "📝", "📁", "📈", "🔧", "⭐",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub glyph: String,
    pub icon_order: i64,
}

/// Trim and validate a glyph supplied by an operator.
pub fn validate_glyph(raw: &str) -> DomainResult<String> {
    require_non_blank("icon", raw).map(str::to_string)
}
