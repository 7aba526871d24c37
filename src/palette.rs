// Color palettes for rendered charts

use plotters::style::RGBColor;

/// Fill and stroke color of bar and line series (amber)
pub const SERIES_COLOR: RGBColor = RGBColor(0xf5, 0x9e, 0x0b);

const PIE_COLORS: [&str; 11] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#9b59b6", "#34495e", "#38a86f", "#e74c3c",
    "#f39c12", "#1abc9c", "#2e78d2",
];

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex(hex: &str) -> Option<RGBColor> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Color palette for categorical slices
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// The eleven-color palette used for pie slices
    pub fn pie() -> Self {
        ColorPalette {
            colors: PIE_COLORS.iter().filter_map(|hex| parse_hex(hex)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get color for a specific index (wraps around if index > palette size)
    pub fn get_color(&self, index: usize) -> RGBColor {
        if self.colors.is_empty() {
            return SERIES_COLOR;
        }
        self.colors[index % self.colors.len()]
    }
}
