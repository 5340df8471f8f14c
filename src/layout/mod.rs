pub mod allocator;
mod error;
pub mod optimizer;
pub mod partition;
mod pool;
pub mod post;
pub mod ratio;
pub mod rules;
pub(crate) mod types;
pub use allocator::PackingContext;
pub use error::LayoutError;
pub use rules::Rule;
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Item;

/// Pack `items` into a finished gallery: allocation, split optimization and
/// post-processing. The seed comes from the config, or the session epoch.
pub fn compute_gallery(items: &[Item], config: &LayoutConfig) -> Result<Gallery, LayoutError> {
    let mut ctx = PackingContext::for_config(config);
    compute_gallery_with(items, config, &mut ctx)
}

pub fn compute_gallery_with(
    items: &[Item],
    config: &LayoutConfig,
    ctx: &mut PackingContext,
) -> Result<Gallery, LayoutError> {
    let mut gallery = allocator::allocate(items, config, ctx)?;
    post::post_process(&mut gallery, items);
    tracing::info!(
        items = items.len(),
        placed = gallery.item_count(),
        bands = gallery.len(),
        columns = gallery.columns,
        "gallery laid out"
    );
    Ok(gallery)
}
