//! Canvas2D renderer.
//!
//! Draws projected scene primitives (and viewport chrome) to an HTML
//! `<canvas>` via `CanvasRenderingContext2d`.

use ic_core::model::{Color, Node};
use ic_render::scene::{FONT_FAMILY, Primitive, Scene, StrokeSpec};
use ic_render::svg::svg_color;
use kurbo::Rect;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

/// Decoded node images keyed by data URI.
///
/// A new URI starts decoding on first use and is skipped until ready;
/// `redraw` is invoked once it finishes so the host can repaint. Entries
/// whose URI no longer appears on any node are dropped by
/// [`ImageCache::retain_live`].
pub struct ImageCache<I = HtmlImageElement> {
    images: RefCell<HashMap<String, I>>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self {
            images: RefCell::new(HashMap::new()),
        }
    }
}

impl<I> ImageCache<I> {
    /// Forget images no longer referenced by any of `nodes`.
    pub fn retain_live(&self, nodes: &[Node]) {
        let live: HashSet<&str> = nodes.iter().filter_map(|n| n.image.as_deref()).collect();
        let mut images = self.images.borrow_mut();
        let before = images.len();
        images.retain(|href, _| live.contains(href.as_str()));
        if images.len() != before {
            log::trace!("evicted {} cached image(s)", before - images.len());
        }
    }

    pub fn len(&self) -> usize {
        self.images.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.borrow().is_empty()
    }
}

impl ImageCache<HtmlImageElement> {
    fn ready(&self, href: &str, redraw: Option<&js_sys::Function>) -> Option<HtmlImageElement> {
        if let Some(img) = self.images.borrow().get(href) {
            return (img.complete() && img.natural_width() > 0).then(|| img.clone());
        }
        let img = HtmlImageElement::new().ok()?;
        if let Some(cb) = redraw.cloned() {
            let onload = Closure::once_into_js(move || {
                let _ = cb.call0(&JsValue::NULL);
            });
            img.set_onload(Some(onload.unchecked_ref()));
        }
        img.set_src(href);
        self.images.borrow_mut().insert(href.to_string(), img);
        None
    }
}

/// Render a scene followed by chrome.
pub fn render(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    chrome: &[Primitive],
    images: &ImageCache,
    redraw: Option<&js_sys::Function>,
) {
    ctx.clear_rect(0.0, 0.0, scene.size.width, scene.size.height);
    for prim in scene.primitives.iter().chain(chrome) {
        draw_primitive(ctx, prim, images, redraw);
    }
}

fn draw_primitive(
    ctx: &CanvasRenderingContext2d,
    prim: &Primitive,
    images: &ImageCache,
    redraw: Option<&js_sys::Function>,
) {
    match prim {
        Primitive::Rect {
            rect,
            corner,
            fill,
            stroke,
        } => {
            rounded_rect_path(ctx, *rect, *corner);
            if let Some(fill) = fill {
                ctx.set_fill_style_str(&svg_color(*fill));
                ctx.fill();
            }
            if let Some(stroke) = stroke {
                apply_stroke(ctx, stroke);
                ctx.stroke();
                clear_dash(ctx);
            }
        }

        Primitive::Line { line, stroke } => {
            ctx.begin_path();
            ctx.move_to(line.p0.x, line.p0.y);
            ctx.line_to(line.p1.x, line.p1.y);
            apply_stroke(ctx, stroke);
            ctx.stroke();
            clear_dash(ctx);
        }

        Primitive::Circle {
            circle,
            fill,
            opacity,
            stroke,
        } => {
            ctx.begin_path();
            let _ = ctx.arc(
                circle.center.x,
                circle.center.y,
                circle.radius,
                0.0,
                std::f64::consts::TAU,
            );
            if let Some(fill) = fill {
                ctx.set_global_alpha(*opacity);
                ctx.set_fill_style_str(&svg_color(*fill));
                ctx.fill();
                ctx.set_global_alpha(1.0);
            }
            if let Some(stroke) = stroke {
                apply_stroke(ctx, stroke);
                ctx.stroke();
                clear_dash(ctx);
            }
        }

        Primitive::Text {
            at,
            text,
            size,
            weight,
            color,
        } => {
            ctx.set_font(&format!("{} {size}px {FONT_FAMILY}", weight.as_css()));
            ctx.set_fill_style_str(&svg_color(*color));
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            let _ = ctx.fill_text(text, at.x, at.y);
        }

        Primitive::Image {
            center,
            side,
            rotation,
            href,
        } => {
            let Some(img) = images.ready(href, redraw) else {
                return;
            };
            // Fit inside the square, keeping aspect ratio.
            let (w, h) = (img.natural_width() as f64, img.natural_height() as f64);
            let scale = side / w.max(h);
            let (dw, dh) = (w * scale, h * scale);
            ctx.save();
            let _ = ctx.translate(center.x, center.y);
            let _ = ctx.rotate(rotation.to_radians());
            let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(&img, -dw / 2.0, -dh / 2.0, dw, dh);
            ctx.restore();
        }
    }
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, rect: Rect, corner: f64) {
    let r = corner.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    let Rect { x0, y0, x1, y1 } = rect;
    ctx.begin_path();
    ctx.move_to(x0 + r, y0);
    let _ = ctx.arc_to(x1, y0, x1, y1, r);
    let _ = ctx.arc_to(x1, y1, x0, y1, r);
    let _ = ctx.arc_to(x0, y1, x0, y0, r);
    let _ = ctx.arc_to(x0, y0, x1, y0, r);
    ctx.close_path();
}

fn apply_stroke(ctx: &CanvasRenderingContext2d, stroke: &StrokeSpec) {
    ctx.set_stroke_style_str(&svg_color(stroke.color));
    ctx.set_line_width(stroke.width);
    if let Some([on, off]) = stroke.dash {
        let _ = ctx.set_line_dash(&js_sys::Array::of2(
            &JsValue::from_f64(on),
            &JsValue::from_f64(off),
        ));
    }
}

fn clear_dash(ctx: &CanvasRenderingContext2d) {
    let _ = ctx.set_line_dash(&js_sys::Array::new());
}

/// CSS color for a chart color (export background, etc.).
pub fn css(color: Color) -> String {
    svg_color(color)
}
