use crate::ir::Item;
use crate::layout::{Band, Gallery};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GalleryDump {
    pub columns: usize,
    pub band_width: f64,
    pub row_gap: f64,
    pub item_count: usize,
    pub bands: Vec<BandDump>,
}

#[derive(Debug, Serialize)]
pub struct BandDump {
    pub rule: String,
    pub ordinal: usize,
    pub orientation: String,
    pub flipped: bool,
    pub width: f64,
    pub height: f64,
    pub main_panel: [f64; 2],
    /// Leaf panels keyed by letter.
    pub panels: BTreeMap<String, PanelDump>,
    pub splits: BTreeMap<String, f64>,
    /// Assigned item ids; the hero comes first.
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PanelDump {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub item: Option<String>,
    pub sensitive: bool,
    pub non_macro: bool,
}

impl GalleryDump {
    pub fn from_gallery(gallery: &Gallery, items: &[Item]) -> Self {
        GalleryDump {
            columns: gallery.columns,
            band_width: gallery.band_width,
            row_gap: gallery.row_gap,
            item_count: gallery.item_count(),
            bands: gallery
                .bands
                .iter()
                .map(|band| BandDump::from_band(band, items))
                .collect(),
        }
    }
}

impl BandDump {
    pub fn from_band(band: &Band, items: &[Item]) -> Self {
        let mut panels = BTreeMap::new();
        for id in band.leaf_ids() {
            let panel = band.panel(id);
            let Some(letter) = panel.letter() else {
                continue;
            };
            let item = panel.item().map(|item| &items[item.index()]);
            panels.insert(
                letter.to_string(),
                PanelDump {
                    x: panel.x,
                    y: panel.y,
                    width: panel.width,
                    height: panel.height,
                    item: item.map(|item| item.id.clone()),
                    sensitive: item.is_some_and(|item| item.sensitive),
                    non_macro: item.is_some_and(|item| item.non_macro),
                },
            );
        }
        let splits = band
            .splits
            .iter()
            .map(|split| (split.name.clone(), split.ratio))
            .collect();
        let (main_width, main_height) = band.main_panel_size();
        BandDump {
            rule: band.rule.to_string(),
            ordinal: band.ordinal,
            orientation: band.orientation.as_str().to_string(),
            flipped: band.flipped,
            width: band.width,
            height: band.height,
            main_panel: [main_width, main_height],
            panels,
            splits,
            items: band
                .items()
                .into_iter()
                .map(|id| items[id.index()].id.clone())
                .collect(),
        }
    }
}

pub fn gallery_json(gallery: &Gallery, items: &[Item]) -> anyhow::Result<String> {
    let dump = GalleryDump::from_gallery(gallery, items);
    Ok(serde_json::to_string_pretty(&dump)?)
}

pub fn write_gallery_dump(path: &Path, gallery: &Gallery, items: &[Item]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GalleryDump::from_gallery(gallery, items);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
