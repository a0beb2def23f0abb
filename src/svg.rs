use std::fmt::Write;

use anyhow::Result;
#[cfg(feature = "png")]
use anyhow::{anyhow, bail};
#[cfg(feature = "png")]
use tiny_skia::{Pixmap, Transform};

use crate::interaction::{ViewState, tooltip_text};
use crate::layout::GraphLayout;
#[cfg(feature = "png")]
use crate::model::CanvasSize;
use crate::render::{DrawCommand, TextRole, render};
use crate::text::TextMeasure;
use crate::theme::Theme;

pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Serializes one paint of `layout` as a standalone SVG document.
///
/// The document is sized in device pixels while the `viewBox` stays in
/// logical coordinates, so the view scale is applied by the viewer.
pub fn render_svg<M: TextMeasure + ?Sized>(
    layout: &GraphLayout,
    view: &ViewState,
    theme: Theme,
    background: Option<&str>,
    measure: &M,
) -> Result<String> {
    let output = render(layout, view, theme, measure);
    let device = output.device_size();
    let background = background.unwrap_or(theme.default_background());

    let mut svg = String::new();
    write!(
        svg,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="Inter, system-ui, sans-serif" font-size="{:.1}">
  <rect width="100%" height="100%" fill="{}" />
"#,
        device.width,
        device.height,
        output.canvas.width,
        output.canvas.height,
        output.font_size,
        escape_xml(background)
    )?;

    for command in &output.commands {
        match command {
            DrawCommand::Curve {
                from,
                ctrl1,
                ctrl2,
                to,
                color,
                width,
            } => {
                writeln!(
                    svg,
                    r#"  <path d="M{:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="none" stroke="{}" stroke-width="{:.1}" stroke-linecap="round" />"#,
                    from.x, from.y, ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y, color, width
                )?;
            }
            DrawCommand::Node {
                commit,
                center,
                radius,
                fill,
                stroke,
            } => {
                writeln!(
                    svg,
                    r#"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" stroke="{}" stroke-width="2"><title>{}</title></circle>"#,
                    center.x,
                    center.y,
                    radius,
                    fill,
                    stroke,
                    escape_xml(&tooltip_text(layout, *commit))
                )?;
            }
            DrawCommand::Badge {
                rect,
                corner_radius,
                fill,
                stroke,
            } => {
                writeln!(
                    svg,
                    r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="{:.1}" ry="{:.1}" fill="{}" stroke="{}" stroke-width="1" />"#,
                    rect.min_x,
                    rect.min_y,
                    rect.width(),
                    rect.height(),
                    corner_radius,
                    corner_radius,
                    fill,
                    stroke
                )?;
            }
            DrawCommand::Text {
                origin,
                text,
                color,
                role,
            } => {
                if text.is_empty() {
                    continue;
                }
                let weight = match role {
                    TextRole::Title => "600",
                    TextRole::Message | TextRole::Badge => "400",
                };
                writeln!(
                    svg,
                    r#"  <text x="{:.1}" y="{:.1}" fill="{}" font-weight="{}" xml:space="preserve">{}</text>"#,
                    origin.x,
                    origin.y,
                    color,
                    weight,
                    escape_xml(text)
                )?;
            }
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Rasterizes the whole graph at the view's scale. The scroll offset is
/// ignored; exports always cover the full canvas.
#[cfg(feature = "png")]
pub fn render_png<M: TextMeasure + ?Sized>(
    layout: &GraphLayout,
    view: &ViewState,
    theme: Theme,
    background: Option<&str>,
    measure: &M,
) -> Result<Vec<u8>> {
    if !(view.scale > 0.0) {
        bail!("scale must be greater than zero when rendering PNG output");
    }
    let (width, height) = pixel_size(layout.canvas_size(view.scale))?;

    let export_view = ViewState {
        scale: view.scale,
        ..ViewState::default()
    };
    let svg = render_svg(layout, &export_view, theme, background, measure)?;

    let mut options = resvg::usvg::Options::default();
    options.font_family = "Inter".to_string();
    options.fontdb_mut().load_system_fonts();
    let tree = resvg::usvg::Tree::from_str(&svg, &options)
        .map_err(|err| anyhow!("failed to parse generated SVG for PNG export: {err}"))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("failed to allocate {width}x{height} surface for PNG export"))?;

    // The document is already sized in device pixels; only rounding is left.
    let size = tree.size();
    let fit = Transform::from_scale(width as f32 / size.width(), height as f32 / size.height());
    resvg::render(&tree, fit, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|err| anyhow!("failed to encode PNG output: {err}"))
}

/// Whole-pixel surface for a scaled canvas.
#[cfg(feature = "png")]
fn pixel_size(device: CanvasSize) -> Result<(u32, u32)> {
    let width = device.width.round();
    let height = device.height.round();
    if !width.is_finite() || !height.is_finite() || width > u32::MAX as f32 || height > u32::MAX as f32 {
        bail!(
            "graph canvas of {:.0}x{:.0} px is too large; try a smaller scale factor",
            device.width,
            device.height
        );
    }
    if width < 1.0 || height < 1.0 {
        bail!("graph canvas collapsed below 1px; try a larger scale factor");
    }
    Ok((width as u32, height as u32))
}
