//! System font lookup and glyph outlines.
//!
//! Fonts are resolved from CSS family lists (`"Arial, sans-serif"`) through a
//! process-wide fontdb database. When no face matches, text is measured with
//! an approximate advance and not drawn.

use ab_glyph::{Font, FontArc, FontVec, OutlineCurve};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use inkroom_core::shapes::Text;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tiny_skia::PathBuilder;

/// Advance per character, in ems, used when no font is available.
const FALLBACK_ADVANCE: f64 = 0.6;
/// Ascent, in ems, used when no font is available.
const FALLBACK_ASCENT: f64 = 0.8;

#[derive(Clone, Eq, PartialEq, Hash)]
struct FontKey {
    family: String,
    bold: bool,
    italic: bool,
}

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} font faces", db.len());
        db
    })
}

/// Map a CSS font-family list to fontdb families. Generic sans-serif is
/// always appended as a last resort.
fn css_families(list: &str) -> Vec<Family<'_>> {
    let mut families: Vec<Family<'_>> = list
        .split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
        .map(|name| match name.to_ascii_lowercase().as_str() {
            "sans-serif" => Family::SansSerif,
            "serif" => Family::Serif,
            "monospace" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            _ => Family::Name(name),
        })
        .collect();
    families.push(Family::SansSerif);
    families
}

fn load_font(family: &str, bold: bool, italic: bool) -> Option<FontArc> {
    let families = css_families(family);
    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: if italic { Style::Italic } else { Style::Normal },
    };

    let id = db().query(&query)?;
    let font = db()
        .with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index))?
        .ok()?;
    Some(FontArc::new(font))
}

/// Resolve a font, caching both hits and misses.
fn font_for(family: &str, bold: bool, italic: bool) -> Option<FontArc> {
    static CACHE: OnceLock<Mutex<HashMap<FontKey, Option<FontArc>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let key = FontKey {
        family: family.to_string(),
        bold,
        italic,
    };
    if let Some(font) = cache.lock().unwrap_or_else(|p| p.into_inner()).get(&key) {
        return font.clone();
    }

    let font = load_font(family, bold, italic);
    if font.is_none() {
        log::warn!("No font found for '{}', text will not be drawn", family);
    }
    cache
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(key, font.clone());
    font
}

/// A font at a pixel size.
#[derive(Clone)]
pub struct TextFace {
    font: Option<FontArc>,
    /// Font size in pixels (1 em).
    size: f64,
}

impl TextFace {
    /// The face a text element is drawn with.
    pub fn for_text(text: &Text) -> Self {
        Self {
            font: font_for(&text.font_family, text.font_style.bold, text.font_style.italic),
            size: text.font_size,
        }
    }

    /// A face with no font, measured by approximation.
    pub fn approximate(size: f64) -> Self {
        Self { font: None, size }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Pixels per font unit.
    fn units_scale(font: &FontArc, size: f64) -> f64 {
        let units_per_em = font.units_per_em().unwrap_or(1000.0) as f64;
        size / units_per_em
    }

    /// Advance width of `s` in pixels.
    pub fn measure(&self, s: &str) -> f64 {
        let Some(font) = &self.font else {
            return s.chars().count() as f64 * self.size * FALLBACK_ADVANCE;
        };
        let scale = Self::units_scale(font, self.size);
        let mut width = 0.0;
        let mut previous = None;
        for c in s.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                width += font.kern_unscaled(prev, id) as f64 * scale;
            }
            width += font.h_advance_unscaled(id) as f64 * scale;
            previous = Some(id);
        }
        width
    }

    /// Distance from the top of a line to its baseline.
    pub fn ascent(&self) -> f64 {
        match &self.font {
            Some(font) => font.ascent_unscaled() as f64 * Self::units_scale(font, self.size),
            None => self.size * FALLBACK_ASCENT,
        }
    }

    /// Append the glyph outlines of `s`, with the baseline starting at
    /// (`x`, `baseline`), to `pb`. Returns false when there is no font.
    pub fn outline(&self, s: &str, x: f64, baseline: f64, pb: &mut PathBuilder) -> bool {
        let Some(font) = &self.font else {
            return false;
        };
        let scale = Self::units_scale(font, self.size);
        let mut pen_x = x;
        let mut previous = None;

        for c in s.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                pen_x += font.kern_unscaled(prev, id) as f64 * scale;
            }
            if let Some(outline) = font.outline(id) {
                // Font units are y-up
                let map = |p: ab_glyph::Point| (
                    (pen_x + p.x as f64 * scale) as f32,
                    (baseline - p.y as f64 * scale) as f32,
                );
                let mut last = None;
                for curve in &outline.curves {
                    let (start, end) = match curve {
                        OutlineCurve::Line(p0, p1) => (*p0, *p1),
                        OutlineCurve::Quad(p0, _, p2) => (*p0, *p2),
                        OutlineCurve::Cubic(p0, _, _, p3) => (*p0, *p3),
                    };
                    if last != Some(start) {
                        if last.is_some() {
                            pb.close();
                        }
                        let (sx, sy) = map(start);
                        pb.move_to(sx, sy);
                    }
                    match curve {
                        OutlineCurve::Line(_, p1) => {
                            let (x1, y1) = map(*p1);
                            pb.line_to(x1, y1);
                        }
                        OutlineCurve::Quad(_, p1, p2) => {
                            let (x1, y1) = map(*p1);
                            let (x2, y2) = map(*p2);
                            pb.quad_to(x1, y1, x2, y2);
                        }
                        OutlineCurve::Cubic(_, p1, p2, p3) => {
                            let (x1, y1) = map(*p1);
                            let (x2, y2) = map(*p2);
                            let (x3, y3) = map(*p3);
                            pb.cubic_to(x1, y1, x2, y2, x3, y3);
                        }
                    }
                    last = Some(end);
                }
                if last.is_some() {
                    pb.close();
                }
            }
            pen_x += font.h_advance_unscaled(id) as f64 * scale;
            previous = Some(id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_family_list() {
        let families = css_families("\"Helvetica Neue\", Arial, sans-serif");
        assert_eq!(families.len(), 4);
        assert!(matches!(families[0], Family::Name("Helvetica Neue")));
        assert!(matches!(families[1], Family::Name("Arial")));
        assert!(matches!(families[2], Family::SansSerif));
    }

    #[test]
    fn test_approximate_metrics() {
        let face = TextFace::approximate(10.0);
        assert!((face.measure("abcd") - 24.0).abs() < 1e-9);
        assert!((face.ascent() - 8.0).abs() < 1e-9);
        let mut pb = PathBuilder::new();
        assert!(!face.outline("abcd", 0.0, 0.0, &mut pb));
    }

    #[test]
    fn test_measure_grows_with_text() {
        let text = Text::new(kurbo::Point::ZERO, "", inkroom_core::SerializableColor::black());
        let face = TextFace::for_text(&text);
        assert!(face.measure("hello world") > face.measure("hello"));
        assert_eq!(face.measure(""), 0.0);
    }
}
