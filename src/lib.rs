#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod sequence;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig};
pub use layout::{Gallery, LayoutError, Rule, compute_gallery};

/// Parse a manifest, pack it and return the band dump as JSON.
pub fn layout_manifest_json(manifest: &str, config: &Config) -> anyhow::Result<String> {
    let items = parser::load_items(manifest, config.layout.clip_param)?;
    let gallery = compute_gallery(&items, &config.layout)?;
    layout_dump::gallery_json(&gallery, &items)
}

/// Parse a manifest, pack it and render an SVG preview.
pub fn render_manifest_svg(manifest: &str, config: &Config) -> anyhow::Result<String> {
    let items = parser::load_items(manifest, config.layout.clip_param)?;
    let gallery = compute_gallery(&items, &config.layout)?;
    Ok(render::render_svg(&gallery, &items, &config.theme, &config.render))
}
