use gallery_bands::theme::Theme;
use gallery_bands::{Config, layout_manifest_json, render_manifest_svg};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GalleryOptions {
    theme: Option<String>,
    columns: Option<usize>,
    seed: Option<i64>,
    width: Option<f32>,
    rules: Option<Vec<String>>,
    show_labels: Option<bool>,
}

fn build_config(options: GalleryOptions) -> Result<Config, String> {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("dark") {
        config.theme = Theme::dark();
        config.render.background = config.theme.background.clone();
    }
    if let Some(columns) = options.columns {
        config.layout.columns = columns;
    }
    // SystemTime is unavailable on wasm32, so the session epoch cannot be read here.
    config.layout.seed = options.seed.or(Some(0));
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(show_labels) = options.show_labels {
        config.render.show_labels = show_labels;
    }
    if let Some(rules) = options.rules {
        let rules = rules
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error: gallery_bands::LayoutError| error.to_string())?;
        config.layout.allowed_rules = Some(rules);
    }
    config.layout.validate().map_err(|error| error.to_string())?;
    Ok(config)
}

fn parse_options(options_json: Option<String>) -> Result<Config, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<GalleryOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        GalleryOptions::default()
    };
    build_config(options).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn layout_gallery_json(manifest: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = parse_options(options_json)?;
    layout_manifest_json(manifest, &config).map_err(|error| JsValue::from_str(&format!("{error:#}")))
}

#[wasm_bindgen]
pub fn render_gallery_svg(manifest: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = parse_options(options_json)?;
    render_manifest_svg(manifest, &config).map_err(|error| JsValue::from_str(&format!("{error:#}")))
}
