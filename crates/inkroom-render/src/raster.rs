//! CPU raster renderer backed by tiny-skia.

use crate::fonts::TextFace;
use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use crate::text::TextLayout;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use inkroom_core::geometry;
use inkroom_core::overlay::{EraserPreview, Overlay, ShapePreview, StrokePreview};
use inkroom_core::shapes::{Element, SerializableColor, Text};
use kurbo::{Point, Rect};
use tiny_skia::{
    BlendMode, Color, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

/// Prefix of the data URLs produced and accepted by the renderer.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Color of dashed previews.
const PREVIEW_COLOR: SerializableColor = SerializableColor::rgb(0x88, 0x88, 0x88);
const PREVIEW_DASH: [f32; 2] = [6.0, 4.0];
const SHAPE_PREVIEW_WIDTH: f64 = 1.5;
const ERASER_PREVIEW_WIDTH: f64 = 2.0;
const UNDERLINE_WIDTH: f64 = 1.0;

fn paint_for(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn solid_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

fn dashed_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        dash: StrokeDash::new(PREVIEW_DASH.to_vec(), 0.0),
        ..Stroke::default()
    }
}

fn polyline(points: &[Point]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.finish()
}

fn rect_path(rect: Rect) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(rect.x0 as f32, rect.y0 as f32);
    pb.line_to(rect.x1 as f32, rect.y0 as f32);
    pb.line_to(rect.x1 as f32, rect.y1 as f32);
    pb.line_to(rect.x0 as f32, rect.y1 as f32);
    pb.close();
    pb.finish()
}

fn circle_path(center: Point, radius: f64) -> Option<Path> {
    PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32)
}

/// Closed arrowhead triangle at `end`.
fn arrow_head_path(start: Point, end: Point) -> Option<Path> {
    let [left, right] = geometry::arrow_head(start, end);
    let mut pb = PathBuilder::new();
    pb.move_to(end.x as f32, end.y as f32);
    pb.line_to(left.x as f32, left.y as f32);
    pb.line_to(right.x as f32, right.y as f32);
    pb.close();
    pb.finish()
}

/// Renders a board into an RGBA pixmap.
pub struct RasterRenderer {
    pixmap: Pixmap,
}

impl RasterRenderer {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            pixmap: Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?,
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Paint a `data:image/png;base64,` image over the current pixels.
    ///
    /// The image is not retained: the next full render replaces it.
    pub fn paint_data_url(&mut self, data_url: &str) -> RenderResult<()> {
        let image = decode_data_url(data_url)?;
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Encode the surface as PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        self.pixmap.encode_png().map_err(|e| RendererError::Encode(e.to_string()))
    }

    /// Encode the surface as a PNG data URL.
    pub fn to_data_url(&self) -> RenderResult<String> {
        Ok(format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(self.encode_png()?)))
    }

    /// PNG of the surface composited over an opaque background, for download.
    pub fn export_png(&self, background: SerializableColor) -> RenderResult<Vec<u8>> {
        let mut flattened = self.pixmap.clone();
        flattened.fill(Color::from_rgba8(background.r, background.g, background.b, 255));
        flattened.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        flattened.encode_png().map_err(|e| RendererError::Encode(e.to_string()))
    }

    fn stroke_path(&mut self, path: Option<Path>, color: SerializableColor, stroke: &Stroke) {
        if let Some(path) = path {
            self.pixmap
                .stroke_path(&path, &paint_for(color), stroke, Transform::identity(), None);
        }
    }

    fn fill_path(&mut self, path: Option<&Path>, color: SerializableColor) {
        if let Some(path) = path {
            self.pixmap
                .fill_path(path, &paint_for(color), FillRule::Winding, Transform::identity(), None);
        }
    }

    fn draw_element(&mut self, element: &Element) {
        match element {
            Element::Path(path) => {
                if path.is_drawable() {
                    self.stroke_path(polyline(&path.points), path.color, &solid_stroke(path.width));
                }
            }
            Element::Rectangle(rect) => {
                let shape = rect_path(rect.as_rect());
                if let Some(fill) = rect.fill {
                    self.fill_path(shape.as_ref(), fill);
                }
                self.stroke_path(shape, rect.color, &solid_stroke(rect.line_width));
            }
            Element::Circle(circle) => {
                let shape = circle_path(circle.center(), circle.radius);
                if let Some(fill) = circle.fill {
                    self.fill_path(shape.as_ref(), fill);
                }
                self.stroke_path(shape, circle.color, &solid_stroke(circle.line_width));
            }
            Element::Line(seg) => {
                self.stroke_path(polyline(&[seg.start(), seg.end()]), seg.color, &solid_stroke(seg.width));
            }
            Element::Arrow(seg) => self.draw_arrow(seg.start(), seg.end(), seg.color, seg.width),
            Element::EraseRect(erase) => {
                if let Some(path) = rect_path(erase.as_rect()) {
                    let mut paint = paint_for(SerializableColor::black());
                    paint.blend_mode = BlendMode::Clear;
                    self.pixmap
                        .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
            Element::Text(text) => self.draw_text(text),
        }
    }

    /// Stroked shaft with a filled head.
    fn draw_arrow(&mut self, start: Point, end: Point, color: SerializableColor, width: f64) {
        self.stroke_path(polyline(&[start, end]), color, &solid_stroke(width));
        self.fill_path(arrow_head_path(start, end).as_ref(), color);
    }

    fn draw_text(&mut self, text: &Text) {
        let face = TextFace::for_text(text);
        let layout = TextLayout::new(text, &face);
        let ascent = face.ascent();

        let mut pb = PathBuilder::new();
        for line in &layout.lines {
            face.outline(&line.text, line.origin.x, line.origin.y + ascent, &mut pb);
        }
        self.fill_path(pb.finish().as_ref(), text.color);

        if text.font_style.underline {
            let underline = solid_stroke(UNDERLINE_WIDTH);
            for line in &layout.lines {
                let (from, to) = layout.underline(line);
                self.stroke_path(polyline(&[from, to]), text.color, &underline);
            }
        }
    }

    fn draw_stroke_preview(&mut self, stroke: &StrokePreview) {
        if stroke.points.len() > 1 {
            self.stroke_path(polyline(&stroke.points), stroke.color, &solid_stroke(stroke.width));
        }
    }

    fn draw_overlay(&mut self, overlay: &Overlay) {
        if let Some(stroke) = &overlay.stroke {
            self.draw_stroke_preview(stroke);
        }
        for stroke in &overlay.remote_strokes {
            self.draw_stroke_preview(stroke);
        }

        match &overlay.shape {
            Some(ShapePreview::Rectangle { anchor, current } | ShapePreview::TextArea { anchor, current }) => {
                let dashed = dashed_stroke(SHAPE_PREVIEW_WIDTH);
                self.stroke_path(rect_path(geometry::normalized_rect(*anchor, *current)), PREVIEW_COLOR, &dashed);
            }
            Some(ShapePreview::Circle { anchor, current }) => {
                let dashed = dashed_stroke(SHAPE_PREVIEW_WIDTH);
                let radius = (*current - *anchor).hypot() / 2.0;
                self.stroke_path(circle_path(anchor.midpoint(*current), radius), PREVIEW_COLOR, &dashed);
            }
            Some(ShapePreview::Line {
                start,
                end,
                color,
                width,
            }) => {
                self.stroke_path(polyline(&[*start, *end]), *color, &solid_stroke(*width));
            }
            Some(ShapePreview::Arrow {
                start,
                end,
                color,
                width,
            }) => self.draw_arrow(*start, *end, *color, *width),
            None => {}
        }

        let dashed = dashed_stroke(ERASER_PREVIEW_WIDTH);
        match overlay.eraser {
            Some(EraserPreview::Cursor { center, radius }) => {
                self.stroke_path(circle_path(center, radius), PREVIEW_COLOR, &dashed);
            }
            Some(EraserPreview::Area(area)) => {
                self.stroke_path(rect_path(area), PREVIEW_COLOR, &dashed);
            }
            None => {}
        }
    }
}

impl Renderer for RasterRenderer {
    fn render(&mut self, ctx: &RenderContext) {
        self.pixmap.fill(Color::TRANSPARENT);

        let working = ctx.overlay.working.as_ref();
        let mut working_drawn = false;
        for element in ctx.elements {
            match working {
                Some(copy) if copy.element.same_id(element) => {
                    if !copy.raised {
                        self.draw_element(&copy.element);
                        working_drawn = true;
                    }
                }
                _ => self.draw_element(element),
            }
        }
        // Raised copies and elements not yet committed go on top
        if let Some(copy) = working.filter(|_| !working_drawn) {
            self.draw_element(&copy.element);
        }

        self.draw_overlay(ctx.overlay);
    }

    fn draw_segment(&mut self, from: Point, to: Point, color: SerializableColor, width: f64) {
        self.stroke_path(polyline(&[from, to]), color, &solid_stroke(width));
    }

    fn resize(&mut self, width: u32, height: u32, ctx: &RenderContext) -> RenderResult<()> {
        if (width, height) == self.size() {
            return Ok(());
        }
        // The full redraw below restores the content; old pixels are not copied
        self.pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
        log::debug!("Surface resized to {}x{}", width, height);
        self.render(ctx);
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }
}

/// Decode a PNG data URL into a pixmap.
pub fn decode_data_url(data_url: &str) -> RenderResult<Pixmap> {
    let encoded = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| RendererError::Decode("expected a PNG data URL".to_string()))?;
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| RendererError::Decode(e.to_string()))?;
    Pixmap::decode_png(&bytes).map_err(|e| RendererError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkroom_core::overlay::WorkingCopy;
    use inkroom_core::shapes::{Circle, EraseRect, Rectangle, Segment};

    fn alpha_at(renderer: &RasterRenderer, x: u32, y: u32) -> u8 {
        renderer.pixmap().pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    fn render(renderer: &mut RasterRenderer, elements: &[Element], overlay: &Overlay) {
        renderer.render(&RenderContext::new(elements, overlay));
    }

    fn red() -> SerializableColor {
        SerializableColor::rgb(255, 0, 0)
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(RasterRenderer::new(0, 10), Err(RendererError::InvalidSize { .. })));
    }

    #[test]
    fn test_filled_rectangle() {
        let mut renderer = RasterRenderer::new(100, 100).unwrap();
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 50.0, 50.0, SerializableColor::black(), 2.0);
        rect.fill = Some(red());
        render(&mut renderer, &[rect.into()], &Overlay::default());

        let inside = renderer.pixmap().pixel(35, 35).unwrap();
        assert_eq!((inside.red(), inside.green(), inside.alpha()), (255, 0, 255));
        // Stroke drawn over the fill
        let edge = renderer.pixmap().pixel(10, 35).unwrap();
        assert_eq!(edge.red(), 0);
        assert_eq!(alpha_at(&renderer, 80, 80), 0);
    }

    #[test]
    fn test_erase_rect_clears() {
        let mut renderer = RasterRenderer::new(100, 100).unwrap();
        let mut circle = Circle::new(Point::new(50.0, 50.0), 30.0, SerializableColor::black(), 2.0);
        circle.fill = Some(red());
        let erase = EraseRect::new(Rect::new(40.0, 40.0, 60.0, 60.0));
        render(&mut renderer, &[circle.into(), erase.into()], &Overlay::default());

        assert_eq!(alpha_at(&renderer, 50, 50), 0);
        assert_eq!(alpha_at(&renderer, 30, 50), 255);
    }

    #[test]
    fn test_working_copy_substitutes() {
        let mut renderer = RasterRenderer::new(200, 100).unwrap();
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 30.0, 30.0, SerializableColor::black(), 2.0);
        rect.fill = Some(red());
        let element: Element = rect.into();
        let moved = geometry::translate(&element, kurbo::Vec2::new(100.0, 0.0));
        let overlay = Overlay {
            working: Some(WorkingCopy {
                element: moved,
                raised: true,
            }),
            ..Overlay::default()
        };
        render(&mut renderer, &[element], &overlay);

        assert_eq!(alpha_at(&renderer, 25, 25), 0);
        assert_eq!(alpha_at(&renderer, 125, 25), 255);
    }

    #[test]
    fn test_dashed_previews() {
        let mut renderer = RasterRenderer::new(100, 100).unwrap();
        let overlay = Overlay {
            eraser: Some(EraserPreview::Cursor {
                center: Point::new(50.0, 50.0),
                radius: 18.0,
            }),
            ..Overlay::default()
        };
        render(&mut renderer, &[], &overlay);
        assert_eq!(alpha_at(&renderer, 50, 50), 0);
        let on_ring = (0..100)
            .flat_map(|x| (0..100).map(move |y| (x, y)))
            .filter(|&(x, y)| alpha_at(&renderer, x, y) > 0)
            .count();
        assert!(on_ring > 0);
    }

    #[test]
    fn test_segment_draws_incrementally() {
        let mut renderer = RasterRenderer::new(50, 50).unwrap();
        renderer.draw_segment(Point::new(5.0, 25.0), Point::new(45.0, 25.0), SerializableColor::black(), 4.0);
        assert_eq!(alpha_at(&renderer, 25, 25), 255);
    }

    #[test]
    fn test_arrow_has_head() {
        let mut renderer = RasterRenderer::new(100, 100).unwrap();
        let arrow = Element::Arrow(Segment::new(Point::new(10.0, 50.0), Point::new(90.0, 50.0), SerializableColor::black(), 2.0));
        render(&mut renderer, &[arrow], &Overlay::default());
        // Head reaches back 15 units at 30 degrees from the shaft
        assert!(alpha_at(&renderer, 80, 45) > 0);
        assert!(alpha_at(&renderer, 80, 55) > 0);
        // Filled between the wings, clear outside them
        assert_eq!(alpha_at(&renderer, 82, 47), 255);
        assert_eq!(alpha_at(&renderer, 82, 53), 255);
        assert_eq!(alpha_at(&renderer, 82, 40), 0);
    }

    #[test]
    fn test_arrow_preview_head_filled() {
        let mut renderer = RasterRenderer::new(100, 100).unwrap();
        let overlay = Overlay {
            shape: Some(ShapePreview::Arrow {
                start: Point::new(10.0, 50.0),
                end: Point::new(90.0, 50.0),
                color: SerializableColor::black(),
                width: 2.0,
            }),
            ..Overlay::default()
        };
        render(&mut renderer, &[], &overlay);
        assert_eq!(alpha_at(&renderer, 82, 47), 255);
    }

    #[test]
    fn test_painted_image_dropped_on_next_render() {
        let mut source = RasterRenderer::new(40, 40).unwrap();
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 20.0, 20.0, SerializableColor::black(), 1.0);
        rect.fill = Some(red());
        render(&mut source, &[rect.into()], &Overlay::default());
        let url = source.to_data_url().unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let mut target = RasterRenderer::new(40, 40).unwrap();
        target.paint_data_url(&url).unwrap();
        assert_eq!(target.pixmap().pixel(10, 10), source.pixmap().pixel(10, 10));

        render(&mut target, &[], &Overlay::default());
        assert_eq!(alpha_at(&target, 10, 10), 0);

        assert!(matches!(target.paint_data_url("data:text/plain,hi"), Err(RendererError::Decode(_))));
    }

    #[test]
    fn test_resize_keeps_content() {
        let mut renderer = RasterRenderer::new(50, 50).unwrap();
        let mut rect = Rectangle::new(Point::new(5.0, 5.0), 20.0, 20.0, SerializableColor::black(), 1.0);
        rect.fill = Some(red());
        let elements = vec![Element::from(rect)];
        let overlay = Overlay::default();
        render(&mut renderer, &elements, &overlay);

        renderer.resize(120, 80, &RenderContext::new(&elements, &overlay)).unwrap();
        assert_eq!(renderer.size(), (120, 80));
        assert_eq!(alpha_at(&renderer, 15, 15), 255);
    }

    #[test]
    fn test_export_has_white_background() {
        let renderer = RasterRenderer::new(10, 10).unwrap();
        let png = renderer.export_png(SerializableColor::white()).unwrap();
        let decoded = Pixmap::decode_png(&png).unwrap();
        let pixel = decoded.pixel(5, 5).unwrap();
        assert_eq!((pixel.red(), pixel.alpha()), (255, 255));
    }
}
