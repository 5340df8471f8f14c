use crate::config::RenderConfig;
use crate::ir::Item;
use crate::layout::post::{RowGroup, row_groups};
use crate::layout::{Band, Gallery};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Placement of one band in working units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Frames for every band, in band order, plus the total height.
pub fn band_frames(gallery: &Gallery) -> (Vec<BandFrame>, f64) {
    let bands = &gallery.bands;
    let column_width = gallery.band_width;
    let gap = gallery.row_gap;
    let mut frames = vec![
        BandFrame {
            x: 0.0,
            y: 0.0,
            width: column_width,
            height: 0.0,
        };
        bands.len()
    ];
    let mut cursor = 0.0;
    for group in row_groups(bands, gallery.columns) {
        match group {
            RowGroup::Row(range) => {
                let mut tallest: f64 = 0.0;
                for (slot, idx) in range.enumerate() {
                    frames[idx] = frame(&bands[idx], slot, cursor, column_width);
                    tallest = tallest.max(bands[idx].height);
                }
                cursor += tallest + gap;
            }
            RowGroup::Cluster {
                upper,
                centre,
                lower,
            } => {
                let flank = upper.len() / 2;
                let side_slot = |offset: usize| if offset < flank { offset } else { offset + 1 };
                let upper_height = upper
                    .clone()
                    .map(|idx| bands[idx].height)
                    .fold(0.0_f64, f64::max);
                let lower_height = lower
                    .clone()
                    .map(|idx| bands[idx].height)
                    .fold(0.0_f64, f64::max);
                for (offset, idx) in upper.enumerate() {
                    frames[idx] = frame(&bands[idx], side_slot(offset), cursor, column_width);
                }
                let lower_y = cursor + upper_height + gap;
                for (offset, idx) in lower.enumerate() {
                    frames[idx] = frame(&bands[idx], side_slot(offset), lower_y, column_width);
                }
                frames[centre] = frame(&bands[centre], flank, cursor, column_width);
                let span = (upper_height + gap + lower_height).max(bands[centre].height);
                cursor += span + gap;
            }
        }
    }
    let total = if bands.is_empty() { 0.0 } else { cursor - gap };
    (frames, total)
}

fn frame(band: &Band, slot: usize, y: f64, column_width: f64) -> BandFrame {
    BandFrame {
        x: slot as f64 * column_width,
        y,
        width: band.width,
        height: band.height,
    }
}

pub fn render_svg(gallery: &Gallery, items: &[Item], theme: &Theme, config: &RenderConfig) -> String {
    let (frames, total_height) = band_frames(gallery);
    let working_width = gallery.band_width * gallery.columns.max(1) as f64;
    let scale = if working_width > 0.0 {
        f64::from(config.width) / working_width
    } else {
        1.0
    };
    let width = f64::from(config.width);
    let height = (total_height * scale).max(1.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    let mut color_index = 0usize;
    for (band, frame) in gallery.bands.iter().zip(&frames) {
        svg.push_str(&format!(
            "<g class=\"band\" data-rule=\"{}\" data-ordinal=\"{}\" data-orientation=\"{}\">",
            band.rule,
            band.ordinal,
            band.orientation.as_str()
        ));
        for id in band.leaf_ids() {
            let panel = band.panel(id);
            let x = (frame.x + panel.x * frame.width) * scale;
            let y = (frame.y + panel.y * frame.height) * scale;
            let w = panel.width * frame.width * scale;
            let h = panel.height * frame.height * scale;
            let item = panel.item().map(|item| &items[item.index()]);
            let fill = match item {
                Some(item) if item.sensitive => theme.sensitive_color.as_str(),
                Some(_) => {
                    let color = theme.panel_color(color_index);
                    color_index += 1;
                    color
                }
                None => theme.empty_color.as_str(),
            };
            svg.push_str(&format!(
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"2\"/>",
                theme.panel_border
            ));
            if config.show_labels
                && let Some(item) = item
            {
                let cx = x + w / 2.0;
                let cy = y + h / 2.0;
                svg.push_str(&format!(
                    "<text x=\"{cx:.2}\" y=\"{cy:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                    escape_xml(&theme.font_family),
                    theme.font_size,
                    theme.label_color,
                    escape_xml(&item.id)
                ));
            }
        }
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "Inter".to_string());
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.width) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_gallery;

    fn sample(columns: usize) -> (Gallery, Vec<Item>) {
        let items: Vec<Item> = [(1.5, 2.0), (1.0, 0.0), (0.75, 0.0), (1.33, 1.0), (1.0, 0.0), (0.8, 0.0)]
            .iter()
            .enumerate()
            .map(|(idx, (ratio, importance))| Item::with_ratio(format!("p<{idx}>"), *ratio, *importance))
            .collect();
        let config = LayoutConfig {
            columns,
            seed: Some(11),
            ..Default::default()
        };
        (compute_gallery(&items, &config).unwrap(), items)
    }

    #[test]
    fn render_svg_basic() {
        let (gallery, items) = sample(1);
        let svg = render_svg(&gallery, &items, &Theme::light(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("p&lt;0&gt;"));
        assert_eq!(svg.matches("class=\"band\"").count(), gallery.len());
    }

    #[test]
    fn single_column_frames_stack() {
        let (gallery, _) = sample(1);
        let (frames, total) = band_frames(&gallery);
        let mut expected_y = 0.0;
        for (band, frame) in gallery.bands.iter().zip(&frames) {
            assert_eq!(frame.x, 0.0);
            assert!((frame.y - expected_y).abs() < 1e-9);
            expected_y += band.height + gallery.row_gap;
        }
        assert!((total - (expected_y - gallery.row_gap)).abs() < 1e-9);
    }

    #[test]
    fn cluster_frames_put_the_centre_band_in_the_middle_column() {
        let mut gallery = Gallery::new(3, 100.0, 8.0);
        for ordinal in 0..5 {
            let mut band = crate::layout::partition::build(crate::layout::Rule::A, ordinal, 3, 100.0, 1.0).unwrap();
            band.height = 50.0;
            gallery.bands.push(band);
        }
        gallery.bands[2].height = 108.0;
        let (frames, total) = band_frames(&gallery);
        let xs: Vec<f64> = frames.iter().map(|frame| frame.x).collect();
        assert_eq!(xs, vec![0.0, 200.0, 100.0, 0.0, 200.0]);
        assert_eq!(gallery.bands[2].orientation, crate::layout::Orientation::Vertical);
        // Left-slot flank bands face the centre.
        let flipped: Vec<bool> = gallery.bands.iter().map(|band| band.flipped).collect();
        assert_eq!(flipped, vec![true, false, false, true, false]);
        assert_eq!(frames[3].y, 58.0);
        assert_eq!(frames[2].y, 0.0);
        assert_eq!(total, 108.0);
    }
}
