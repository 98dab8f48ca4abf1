//! Scene → standalone SVG document.
//!
//! Used as the vector export fallback and for library thumbnails.

use crate::scene::{CanvasSize, FONT_FAMILY, Primitive, Scene, StrokeSpec, project};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ic_core::model::{Chart, Color};

/// Fixed frame used for library thumbnails.
pub const PREVIEW_SIZE: CanvasSize = CanvasSize::new(800.0, 600.0);

pub fn to_svg(scene: &Scene) -> String {
    let CanvasSize { width, height } = scene.size;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    ));
    for prim in &scene.primitives {
        write_primitive(&mut svg, prim);
    }
    svg.push_str("</svg>");
    svg
}

/// Thumbnail of a saved chart at the fixed preview frame.
pub fn preview_svg(chart: &Chart) -> String {
    to_svg(&project(chart, PREVIEW_SIZE))
}

/// `data:` URI wrapping an SVG document.
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn write_primitive(out: &mut String, prim: &Primitive) {
    match prim {
        Primitive::Rect {
            rect,
            corner,
            fill,
            stroke,
        } => {
            out.push_str(&format!(
                "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{corner}\" ry=\"{corner}\" fill=\"{}\"{} />\n",
                rect.x0,
                rect.y0,
                rect.width(),
                rect.height(),
                fill_attr(*fill),
                stroke_attrs(stroke.as_ref()),
            ));
        }
        Primitive::Line { line, stroke } => {
            out.push_str(&format!(
                "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\"{} />\n",
                line.p0.x,
                line.p0.y,
                line.p1.x,
                line.p1.y,
                stroke_attrs(Some(stroke)),
            ));
        }
        Primitive::Circle {
            circle,
            fill,
            opacity,
            stroke,
        } => {
            let opacity = if *opacity < 1.0 {
                format!(" opacity=\"{opacity}\"")
            } else {
                String::new()
            };
            out.push_str(&format!(
                "  <circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"{opacity}{} />\n",
                circle.center.x,
                circle.center.y,
                circle.radius,
                fill_attr(*fill),
                stroke_attrs(stroke.as_ref()),
            ));
        }
        Primitive::Text {
            at,
            text,
            size,
            weight,
            color,
        } => {
            out.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" font-family=\"{FONT_FAMILY}\" font-size=\"{size}\" font-weight=\"{}\" fill=\"{}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>\n",
                at.x,
                at.y,
                weight.as_css(),
                svg_color(*color),
                escape_xml(text),
            ));
        }
        Primitive::Image {
            center,
            side,
            rotation,
            href,
        } => {
            out.push_str(&format!(
                "  <image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{side}\" height=\"{side}\" preserveAspectRatio=\"xMidYMid meet\" transform=\"rotate({rotation} {} {})\" />\n",
                escape_xml(href),
                center.x - side / 2.0,
                center.y - side / 2.0,
                center.x,
                center.y,
            ));
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn fill_attr(fill: Option<Color>) -> String {
    fill.map(svg_color).unwrap_or_else(|| "none".to_string())
}

fn stroke_attrs(stroke: Option<&StrokeSpec>) -> String {
    let Some(s) = stroke else {
        return String::new();
    };
    let mut attrs = format!(" stroke=\"{}\" stroke-width=\"{}\"", svg_color(s.color), s.width);
    if let Some([on, off]) = s.dash {
        attrs.push_str(&format!(" stroke-dasharray=\"{on},{off}\""));
    }
    attrs
}

pub fn svg_color(c: Color) -> String {
    if c.a == 255 {
        format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
    } else {
        format!("rgba({}, {}, {}, {:.3})", c.r, c.g, c.b, c.a as f64 / 255.0)
    }
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
