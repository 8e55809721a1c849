use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

/// Line colour of the trend and forecast charts.
pub const PRIMARY: Color32 = Color32::from_rgb(0x2E, 0x86, 0xAB);
/// Markers and historical values.
pub const ACCENT: Color32 = Color32::from_rgb(0xA2, 0x3B, 0x72);
/// Histogram bars.
pub const TEAL: Color32 = Color32::from_rgb(0x4E, 0xCD, 0xC4);
/// Box plot fill.
pub const CORAL: Color32 = Color32::from_rgb(0xFF, 0x6B, 0x6B);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// Anchor colours of the viridis scale.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3B, 0x52, 0x8B),
    (0x21, 0x90, 0x8C),
    (0x5D, 0xC8, 0x63),
    (0xFD, 0xE7, 0x25),
];

/// Sequential colour for `t` in `[0, 1]`, interpolated in linear RGB.
pub fn sequential(t: f64) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f32;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lo as f32;

    let anchor = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = anchor(VIRIDIS[lo]).mix(anchor(VIRIDIS[lo + 1]), frac);
    to_color32(Srgb::from_linear(mixed))
}

// ---------------------------------------------------------------------------
// Color mapping: region code → Color32
// ---------------------------------------------------------------------------

/// Maps region codes to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the known region codes.
    pub fn new(codes: &[String]) -> Self {
        let palette = generate_palette(codes.len());
        let mapping = codes.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a region code.
    pub fn color_for(&self, code: &str) -> Color32 {
        self.mapping.get(code).copied().unwrap_or(self.default_color)
    }
}
