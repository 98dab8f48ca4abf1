//! Scene → Vello drawing commands.
//!
//! Shapes and strokes are painted directly. Text and images need a font
//! context and decoded pixels; both are logged and skipped for now.

use crate::scene::{Primitive, Scene, StrokeSpec};
use ic_core::model::Color as ChartColor;
use kurbo::{Affine, Cap, Join, Stroke as KurboStroke};
use peniko::{Color, Fill};

/// Paint a projected scene (and optionally chrome) into a Vello scene.
///
/// Call once per frame with a freshly-cleared `vello::Scene`.
pub fn paint_scene(target: &mut vello::Scene, scene: &Scene, chrome: &[Primitive]) {
    for prim in scene.primitives.iter().chain(chrome) {
        paint_primitive(target, prim);
    }
}

fn paint_primitive(target: &mut vello::Scene, prim: &Primitive) {
    match prim {
        Primitive::Rect {
            rect,
            corner,
            fill,
            stroke,
        } => {
            let shape = rect.to_rounded_rect(*corner);
            if let Some(fill) = fill {
                fill_shape(target, &shape, *fill, 1.0);
            }
            if let Some(stroke) = stroke {
                stroke_shape(target, &shape, stroke);
            }
        }
        Primitive::Line { line, stroke } => stroke_shape(target, line, stroke),
        Primitive::Circle {
            circle,
            fill,
            opacity,
            stroke,
        } => {
            if let Some(fill) = fill {
                fill_shape(target, circle, *fill, *opacity);
            }
            if let Some(stroke) = stroke {
                stroke_shape(target, circle, stroke);
            }
        }
        Primitive::Text { at, text, size, .. } => {
            log::trace!("TEXT {text:?} ({size}px) at ({}, {})", at.x, at.y);
            // Glyph shaping needs a font context; not wired up yet.
        }
        Primitive::Image { center, side, .. } => {
            log::trace!("IMAGE {side}x{side} at ({}, {})", center.x, center.y);
        }
    }
}

// ─── Fill and stroke ─────────────────────────────────────────────────────────

fn fill_shape<S: kurbo::Shape>(target: &mut vello::Scene, shape: &S, color: ChartColor, opacity: f64) {
    target.fill(Fill::NonZero, Affine::IDENTITY, to_peniko(color, opacity), None, shape);
}

fn stroke_shape<S: kurbo::Shape>(target: &mut vello::Scene, shape: &S, style: &StrokeSpec) {
    let mut stroke = KurboStroke {
        width: style.width,
        join: Join::Round,
        start_cap: Cap::Butt,
        end_cap: Cap::Butt,
        ..Default::default()
    };
    if let Some(dash) = style.dash {
        stroke = stroke.with_dashes(0.0, dash);
    }
    target.stroke(&stroke, Affine::IDENTITY, to_peniko(style.color, 1.0), None, shape);
}

fn to_peniko(c: ChartColor, opacity: f64) -> Color {
    let alpha = (c.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color::from_rgba8(c.r, c.g, c.b, alpha)
}
