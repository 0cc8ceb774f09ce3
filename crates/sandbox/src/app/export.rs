use std::fs;
use std::path::{Path, PathBuf};

use devtools::content::CacheSnapshot;
use devtools::{draw_preview, Cell, GridViewport, PreviewPlan, Rgba};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use super::world::{SandboxWorld, ThingKind};

pub(crate) const SNAPSHOT_CELL_PX: u32 = 8;

#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("no map is loaded")]
    NoMap,
    #[error("frame buffer does not match {width}x{height}")]
    FrameSize { width: u32, height: u32 },
    #[error("a {map_width}x{map_height} map does not fit in one frame")]
    FrameTooLarge { map_width: i32, map_height: i32 },
    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode cache dump: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) struct RenderedFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u8>,
}

/// Terrain and things, one square per cell, with the preview drawn on top.
pub(crate) fn render_world(
    world: &SandboxWorld,
    plan: Option<&PreviewPlan>,
) -> Result<RenderedFrame, ExportError> {
    let (map_width, map_height) = world.size().ok_or(ExportError::NoMap)?;
    let (width, height, byte_len) = frame_size(map_width, map_height)?;
    let mut pixels = vec![0u8; byte_len];

    for z in 0..map_height {
        for x in 0..map_width {
            let cell = Cell::new(x, z);
            if let Some(terrain) = world.terrain_at(cell) {
                fill_cell(&mut pixels, width, cell, 0, terrain_color(terrain));
            }
        }
    }
    for thing in world.things() {
        let color = match thing.kind {
            ThingKind::Pawn { animal: true, .. } => [230, 150, 60, 255],
            ThingKind::Pawn { .. } => [220, 60, 60, 255],
            ThingKind::Plant { growth } => [40, (120.0 + 120.0 * growth.clamp(0.0, 1.0)) as u8, 40, 255],
            ThingKind::Item => [170, 170, 180, 255],
        };
        fill_cell(&mut pixels, width, thing.cell, SNAPSHOT_CELL_PX / 4, color);
    }

    if let Some(plan) = plan {
        let viewport = GridViewport {
            origin: Cell::new(0, 0),
            cell_px: SNAPSHOT_CELL_PX,
        };
        draw_preview(&mut pixels, width, height, &viewport, plan);
    }

    Ok(RenderedFrame {
        width,
        height,
        pixels,
    })
}

pub(crate) fn write_snapshot(
    path: &Path,
    world: &SandboxWorld,
    plan: Option<&PreviewPlan>,
) -> Result<(u32, u32), ExportError> {
    let frame = render_world(world, plan)?;
    let (width, height) = (frame.width, frame.height);
    let image = RgbaImage::from_raw(width, height, frame.pixels)
        .ok_or(ExportError::FrameSize { width, height })?;
    ensure_parent(path)?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ExportError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((width, height))
}

pub(crate) fn write_cache_dump(path: &Path, snapshot: &CacheSnapshot) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(snapshot).map_err(ExportError::Encode)?;
    ensure_parent(path)?;
    fs::write(path, json).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ExportError::Write {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn terrain_color(def_name: &str) -> Rgba {
    match def_name {
        "Soil" => [110, 84, 58, 255],
        "Sand" => [214, 190, 130, 255],
        "WaterShallow" => [70, 120, 200, 255],
        "WaterDeep" => [30, 60, 150, 255],
        _ => {
            // FNV-1a so unknown terrain keeps a stable color between runs.
            let hash = def_name.bytes().fold(0x811c_9dc5u32, |acc, byte| {
                (acc ^ u32::from(byte)).wrapping_mul(0x0100_0193)
            });
            let [r, g, b, _] = hash.to_le_bytes();
            [r / 2 + 64, g / 2 + 64, b / 2 + 64, 255]
        }
    }
}

/// Pixel width, pixel height and RGBA byte length of a map's frame.
fn frame_size(map_width: i32, map_height: i32) -> Result<(u32, u32, usize), ExportError> {
    let too_large = ExportError::FrameTooLarge {
        map_width,
        map_height,
    };
    let scale = |cells: i32| {
        u32::try_from(cells.max(0))
            .ok()
            .and_then(|cells| cells.checked_mul(SNAPSHOT_CELL_PX))
    };
    let (Some(width), Some(height)) = (scale(map_width), scale(map_height)) else {
        return Err(too_large);
    };
    let byte_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(too_large)?;
    Ok((width, height, byte_len))
}

fn fill_cell(pixels: &mut [u8], width: u32, cell: Cell, inset: u32, color: Rgba) {
    let origin = |coord: i32| {
        u64::try_from(coord)
            .ok()
            .map(|coord| coord * u64::from(SNAPSHOT_CELL_PX) + u64::from(inset))
    };
    let (Some(x0), Some(y0)) = (origin(cell.x), origin(cell.z)) else {
        return;
    };
    let size = u64::from(SNAPSHOT_CELL_PX.saturating_sub(inset * 2));
    let width = u64::from(width);
    for y in y0..y0 + size {
        for x in x0..(x0 + size).min(width) {
            let Ok(offset) = usize::try_from((y * width + x) * 4) else {
                return;
            };
            if let Some(pixel) = pixels.get_mut(offset..offset.saturating_add(4)) {
                pixel.copy_from_slice(&color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use devtools::content::DefinitionCache;
    use devtools::CacheSettings;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn render_covers_map_and_draws_plan() {
        let world = SandboxWorld::new(4, 3);
        let frame = render_world(&world, None).expect("render");
        assert_eq!(frame.width, 4 * SNAPSHOT_CELL_PX);
        assert_eq!(frame.height, 3 * SNAPSHOT_CELL_PX);
        assert_eq!(&frame.pixels[..4], &terrain_color("Soil"));

        let plan = PreviewPlan {
            highlighted: vec![Cell::new(0, 0)],
            highlight_color: [255, 255, 255, 255],
            ..PreviewPlan::default()
        };
        let frame = render_world(&world, Some(&plan)).expect("render");
        assert_eq!(&frame.pixels[..4], &[255, 255, 255, 255]);
    }

    #[test]
    fn frame_size_rejects_maps_past_the_pixel_range() {
        assert_eq!(
            frame_size(4, 3).expect("size"),
            (4 * SNAPSHOT_CELL_PX, 3 * SNAPSHOT_CELL_PX, 4 * 3 * 64 * 4)
        );
        assert!(matches!(
            frame_size(i32::MAX, 2),
            Err(ExportError::FrameTooLarge {
                map_width: i32::MAX,
                map_height: 2
            })
        ));
        assert!(frame_size(2, i32::MAX).is_err());
        assert_eq!(frame_size(-5, 3).expect("size").2, 0);
    }

    #[test]
    fn things_outside_the_frame_are_not_drawn() {
        let mut pixels = vec![0u8; 16 * 16 * 4];
        fill_cell(&mut pixels, 16, Cell::new(i32::MAX, i32::MAX), 0, [9, 9, 9, 255]);
        fill_cell(&mut pixels, 16, Cell::new(-1, 0), 0, [9, 9, 9, 255]);
        assert!(pixels.iter().all(|byte| *byte == 0));

        fill_cell(&mut pixels, 16, Cell::new(1, 1), 0, [9, 9, 9, 255]);
        assert_eq!(&pixels[(8 * 16 + 8) * 4..(8 * 16 + 8) * 4 + 4], &[9, 9, 9, 255]);
    }

    #[test]
    fn unloaded_map_cannot_render() {
        let mut world = SandboxWorld::new(2, 2);
        world.unload_map();
        assert!(matches!(render_world(&world, None), Err(ExportError::NoMap)));
    }

    #[test]
    fn snapshot_writes_png_with_map_dimensions() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("shots").join("frame.png");
        let world = SandboxWorld::with_demo_population(6, 5);

        let (width, height) = write_snapshot(&path, &world, None).expect("snapshot");
        let decoded = image::open(&path).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (width, height));
    }

    #[test]
    fn cache_dump_is_valid_json() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("cache.json");
        let cache = DefinitionCache::new(CacheSettings::default());

        write_cache_dump(&path, &cache.snapshot()).expect("dump");
        let raw = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert!(value.get("families").is_some());
        assert!(value["last_refresh_tick"].is_null());
    }
}
