//! Shelf demo: headless glyph atlas walkthrough.
//!
//! Builds an atlas from an optional JSON config, lays out text, and
//! renders it offscreen with `shelf-render`. Falls back to a CPU memory
//! atlas when no GPU adapter is available.
//!
//! ```text
//! shelf-demo [config.json] [text]
//! RUST_LOG=debug shelf-demo        # per-glyph placement logs
//! ```

use std::error::Error;

use log::{info, warn};
use shelf_render::{GpuContext, Renderer, SurfaceProfile, WgpuSurface};
use shelf_text::{
    AtlasConfig, AtlasSurface, BlockRasterizer, CosmicRasterizer, MemorySurface, NdcRect,
    PixelRect, Rasterizer, TextAtlas,
};

const VIEWPORT: (u32, u32) = (960, 240);

const DEMO_TEXT: &str = "The quick brown fox\njumps over the lazy dog.\n0123456789 !?#&";

/// Font-backed rasterizer, or solid blocks when no system fonts exist.
fn rasterizer(config: &AtlasConfig) -> Box<dyn Rasterizer> {
    let cosmic = CosmicRasterizer::new();
    if cosmic.face_count() > 0 {
        Box::new(cosmic)
    } else {
        warn!("No system fonts found; rasterizing solid blocks");
        let size = config.font.line_height.saturating_sub(2).max(1);
        Box::new(BlockRasterizer::new(size / 2 + 1, size))
    }
}

fn log_growth<S: AtlasSurface>(surface: &mut S) {
    surface.on_storage_replaced(Box::new(|event| {
        info!("Atlas storage replaced: {} -> {}", event.old, event.new);
    }));
}

fn run_gpu(gpu: GpuContext, config: &AtlasConfig, text: &str) -> Result<(), Box<dyn Error>> {
    let mut surface = WgpuSurface::from_config(&gpu, config, SurfaceProfile::ReadWriteCopy);
    let mut renderer = Renderer::new(&gpu);
    renderer.watch(&mut surface);
    log_growth(&mut surface);

    let mut atlas = TextAtlas::from_config(surface, rasterizer(config), config);
    let quads = atlas.normalized_quads(NdcRect::FULL, VIEWPORT, text)?;

    renderer.prepare(&gpu, atlas.surface(), &quads);
    let (_target, view) = Renderer::create_target(&gpu, VIEWPORT.0, VIEWPORT.1);
    let stats = renderer.render_to_texture(&gpu, &view);

    let (width, height) = atlas.size();
    info!(
        "Rendered {} quads in {} draw call(s); atlas {}x{} holds {} glyphs, {} rebind(s)",
        stats.quad_count,
        stats.draw_calls,
        width,
        height,
        atlas.glyph_count(),
        stats.atlas_rebinds
    );
    Ok(())
}

fn run_memory(config: &AtlasConfig, text: &str) -> Result<(), Box<dyn Error>> {
    let mut surface = MemorySurface::from_config(config);
    log_growth(&mut surface);

    let mut atlas = TextAtlas::from_config(surface, rasterizer(config), config);
    let region = PixelRect::new(0, 0, VIEWPORT.0 as i32, VIEWPORT.1 as i32);
    let quads = atlas.pixel_quads(region, text)?;

    let (width, height) = atlas.size();
    info!(
        "Laid out {} quads; memory atlas {}x{} holds {} glyphs",
        quads.len(),
        width,
        height,
        atlas.glyph_count()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => AtlasConfig::load(&path)?,
        None => AtlasConfig::default(),
    };
    let text = args.next().unwrap_or_else(|| DEMO_TEXT.to_string());

    info!("Starting shelf demo...");
    match pollster::block_on(GpuContext::new_headless()) {
        Ok(gpu) => run_gpu(gpu, &config, &text),
        Err(e) => {
            warn!("{e}; falling back to the memory atlas");
            run_memory(&config, &text)
        }
    }
}
