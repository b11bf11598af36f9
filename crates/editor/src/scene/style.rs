//! Entity colors and outlines for features, with and without highlight.

use shared::{Catalog, Feature};

use crate::settings::HighlightSettings;

/// Fallback corridor width when a line has none (m)
const FALLBACK_LINE_WIDTH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::rgb(0.0, 0.0, 0.0);
    pub const YELLOW: Rgba = Rgba::rgb(1.0, 1.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb` or `#rgb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match digits.len() {
            6 => Some(Self::rgb(
                channel(digits.get(0..2)?)?,
                channel(digits.get(2..4)?)?,
                channel(digits.get(4..6)?)?,
            )),
            3 => {
                let short = |i: usize| {
                    let c = digits.get(i..i + 1)?;
                    channel(&format!("{c}{c}"))
                };
                Some(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => None,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub color: Rgba,
    pub width: f64,
}

/// What the surface needs to draw a feature entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStyle {
    pub material: Rgba,
    /// Polygons only
    pub outline: Option<Outline>,
    /// Corridor width for lines, 0 for polygons
    pub width: f64,
}

/// Explicit meta color, then catalog color, then the type default
pub fn base_color(feature: &Feature, catalog: &Catalog) -> Rgba {
    let catalog_color = || {
        feature
            .feature_type
            .building_type_id()
            .and_then(|id| catalog.get(id))
            .and_then(|t| Rgba::from_hex(&t.color))
    };
    feature
        .meta
        .color
        .as_deref()
        .and_then(Rgba::from_hex)
        .or_else(catalog_color)
        .unwrap_or(if feature.feature_type.is_road() {
            Rgba::YELLOW
        } else {
            Rgba::WHITE
        })
}

pub fn style_for(
    feature: &Feature,
    catalog: &Catalog,
    highlighted: bool,
    settings: &HighlightSettings,
) -> EntityStyle {
    let alpha = if highlighted {
        settings.highlighted_alpha
    } else {
        settings.normal_alpha
    };
    let material = base_color(feature, catalog).with_alpha(alpha);

    if feature.is_polygon() {
        let outline = if highlighted {
            Outline {
                color: Rgba::WHITE,
                width: settings.highlighted_outline_width,
            }
        } else {
            Outline {
                color: Rgba::BLACK,
                width: settings.outline_width,
            }
        };
        EntityStyle {
            material,
            outline: Some(outline),
            width: 0.0,
        }
    } else {
        let base = if feature.width > 0.0 {
            feature.width
        } else {
            FALLBACK_LINE_WIDTH
        };
        EntityStyle {
            material,
            outline: None,
            width: if highlighted {
                base + settings.line_width_bump
            } else {
                base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgba::from_hex("#ffffff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::from_hex("ff0"), Some(Rgba::YELLOW));
        assert_eq!(Rgba::from_hex("#12"), None);
        assert_eq!(Rgba::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_color_precedence() {
        let catalog = fixtures::catalog();
        let mut feature = fixtures::building("b", fixtures::triangle_ring(), 10.0);
        feature.feature_type = shared::FeatureType::Building(fixtures::HOUSING_TYPE.into());
        let from_catalog = base_color(&feature, &catalog);
        assert_eq!(from_catalog, Rgba::from_hex("#34d399").unwrap());

        feature.meta.color = Some("#000000".into());
        assert_eq!(base_color(&feature, &catalog), Rgba::BLACK);

        let road = fixtures::road("r", fixtures::short_line());
        assert_eq!(base_color(&road, &Catalog::default()), Rgba::YELLOW);
    }

    #[test]
    fn test_polygon_highlight() {
        let settings = HighlightSettings::default();
        let feature = fixtures::building("b", fixtures::triangle_ring(), 10.0);
        let on = style_for(&feature, &Catalog::default(), true, &settings);
        let off = style_for(&feature, &Catalog::default(), false, &settings);
        assert!((on.material.a - 0.9).abs() < 1e-6);
        assert!((off.material.a - 0.6).abs() < 1e-6);
        assert_eq!(on.outline.unwrap().color, Rgba::WHITE);
        assert_eq!(on.outline.unwrap().width, 3.0);
        assert_eq!(off.outline.unwrap().color, Rgba::BLACK);
        assert_eq!(off.outline.unwrap().width, 1.0);
    }

    #[test]
    fn test_line_width_bump() {
        let settings = HighlightSettings::default();
        let mut road = fixtures::road("r", fixtures::short_line());
        road.width = 0.0;
        assert_eq!(style_for(&road, &Catalog::default(), false, &settings).width, 5.0);
        road.width = 8.0;
        assert_eq!(style_for(&road, &Catalog::default(), true, &settings).width, 11.0);
        assert!(style_for(&road, &Catalog::default(), true, &settings).outline.is_none());
    }
}
