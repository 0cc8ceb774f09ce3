use serde::Serialize;

use super::host::{AreaPurpose, WorldQuery};
use super::types::{Cell, CellRect};

pub type Rgba = [u8; 4];

/// Relative ring radius and its opacity. Larger rings fade out.
pub const RING_SCALES: [(f32, u8); 3] = [(0.75, 210), (1.0, 150), (1.25, 90)];

const HIGHLIGHT_ALPHA: u8 = 72;
const CROSSHAIR_COLOR: Rgba = [255, 255, 255, 230];
const FIRST_CORNER_COLOR: Rgba = [80, 255, 120, 255];
const SECOND_CORNER_COLOR: Rgba = [255, 90, 200, 255];

/// What the session publishes for the renderer. Written only by the
/// session, read once per frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PreviewState {
    pub active: bool,
    pub target_def: Option<String>,
    pub radius: Option<f32>,
    pub damage: Option<u32>,
    pub color: Rgba,
    /// `Some` for two-corner flows.
    pub area: Option<AreaPurpose>,
    pub first_corner: Option<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ring {
    pub center: Cell,
    pub radius: f32,
    pub color: Rgba,
}

/// Everything one frame of preview feedback draws, in draw order: rings,
/// highlighted cells, corner outlines, crosshair.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PreviewPlan {
    pub rings: Vec<Ring>,
    pub highlighted: Vec<Cell>,
    pub highlight_color: Rgba,
    pub corners: Vec<(Cell, Rgba)>,
    pub crosshair: Option<Cell>,
    pub cells_in_area: Option<u64>,
    pub eligible_in_area: Option<usize>,
    pub labels: Vec<String>,
}

/// Maps grid cells onto frame pixels. Cell `origin` sits at pixel (0, 0)
/// and z grows downward on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridViewport {
    pub origin: Cell,
    pub cell_px: u32,
}

impl GridViewport {
    fn cell_origin_px(&self, cell: Cell) -> (i64, i64) {
        let size = i64::from(self.cell_px);
        (
            (i64::from(cell.x) - i64::from(self.origin.x)) * size,
            (i64::from(cell.z) - i64::from(self.origin.z)) * size,
        )
    }

    fn cell_center_px(&self, cell: Cell) -> (f32, f32) {
        let (x, y) = self.cell_origin_px(cell);
        let half = self.cell_px as f32 / 2.0;
        (x as f32 + half, y as f32 + half)
    }
}

/// Builds the frame's feedback from published state only. Returns `None`
/// when nothing should be drawn, including when the map has gone away.
pub fn plan_preview<W>(state: &PreviewState, cursor: Option<Cell>, world: &W) -> Option<PreviewPlan>
where
    W: WorldQuery + ?Sized,
{
    if !state.active {
        return None;
    }
    let bounds = world.map_bounds()?;
    let cursor = cursor.filter(|cell| bounds.contains(*cell))?;
    let highlight_color = with_alpha(state.color, HIGHLIGHT_ALPHA);

    if let Some(purpose) = state.area {
        return Some(plan_area(state.first_corner, cursor, purpose, highlight_color, world));
    }

    let mut plan = PreviewPlan {
        highlight_color,
        crosshair: Some(cursor),
        ..PreviewPlan::default()
    };
    match state.radius {
        Some(radius) if radius.is_finite() && radius >= 0.0 => {
            plan.rings = RING_SCALES
                .iter()
                .map(|(scale, alpha)| Ring {
                    center: cursor,
                    radius: radius * scale,
                    color: with_alpha(state.color, *alpha),
                })
                .collect();
            plan.highlighted = Cell::radial_cells(cursor, radius, bounds);
        }
        _ => plan.highlighted = vec![cursor],
    }
    Some(plan)
}

fn plan_area<W>(
    first_corner: Option<Cell>,
    cursor: Cell,
    purpose: AreaPurpose,
    highlight_color: Rgba,
    world: &W,
) -> PreviewPlan
where
    W: WorldQuery + ?Sized,
{
    let Some(first) = first_corner else {
        return PreviewPlan {
            highlighted: vec![cursor],
            highlight_color,
            ..PreviewPlan::default()
        };
    };

    let rect = CellRect::from_corners(first, cursor);
    let cells_in_area = rect.area();
    let eligible = world.count_eligible(rect, purpose);
    PreviewPlan {
        highlighted: rect.cells().filter(|cell| world.in_bounds(*cell)).collect(),
        highlight_color,
        corners: vec![(first, FIRST_CORNER_COLOR), (cursor, SECOND_CORNER_COLOR)],
        cells_in_area: Some(cells_in_area),
        eligible_in_area: Some(eligible),
        labels: vec![
            format!("Cells in area: {cells_in_area}"),
            format!("{}: {eligible}", purpose.eligible_label()),
        ],
        ..PreviewPlan::default()
    }
}

/// Rasterises a plan into an RGBA8 frame. Everything is clipped to the frame.
pub fn draw_preview(
    frame: &mut [u8],
    width: u32,
    height: u32,
    viewport: &GridViewport,
    plan: &PreviewPlan,
) {
    if width == 0 || height == 0 || viewport.cell_px == 0 {
        return;
    }
    let surface = Surface {
        width: i64::from(width),
        height: i64::from(height),
    };
    let cell_px = i64::from(viewport.cell_px);

    for ring in &plan.rings {
        let (cx, cy) = viewport.cell_center_px(ring.center);
        surface.draw_ring(frame, cx, cy, ring.radius * viewport.cell_px as f32, ring.color);
    }

    for cell in &plan.highlighted {
        let (x, y) = viewport.cell_origin_px(*cell);
        surface.fill_rect(frame, x, y, cell_px, cell_px, plan.highlight_color);
    }

    for (cell, color) in &plan.corners {
        let (x, y) = viewport.cell_origin_px(*cell);
        surface.draw_rect_outline(frame, x, y, cell_px, cell_px, *color);
    }

    if let Some(cell) = plan.crosshair {
        let (x, y) = viewport.cell_origin_px(cell);
        let mid = cell_px / 2;
        surface.fill_rect(frame, x - cell_px / 2, y + mid, cell_px * 2, 1, CROSSHAIR_COLOR);
        surface.fill_rect(frame, x + mid, y - cell_px / 2, 1, cell_px * 2, CROSSHAIR_COLOR);
    }
}

fn with_alpha(color: Rgba, alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

struct Surface {
    width: i64,
    height: i64,
}

impl Surface {
    fn blend_pixel(&self, frame: &mut [u8], x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let Some(byte_offset) = y
            .checked_mul(self.width)
            .and_then(|row| row.checked_add(x))
            .and_then(|pixel| pixel.checked_mul(4))
            .and_then(|offset| usize::try_from(offset).ok())
        else {
            return;
        };
        let Some(pixel) = byte_offset
            .checked_add(4)
            .and_then(|end| frame.get_mut(byte_offset..end))
        else {
            return;
        };

        let alpha = u16::from(color[3]);
        for channel in 0..3 {
            let src = u16::from(color[channel]);
            let dst = u16::from(pixel[channel]);
            pixel[channel] = ((src * alpha + dst * (255 - alpha) + 127) / 255) as u8;
        }
        pixel[3] = pixel[3].max(color[3]);
    }

    fn fill_rect(&self, frame: &mut [u8], x: i64, y: i64, w: i64, h: i64, color: Rgba) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = (x + w).min(self.width);
        let end_y = (y + h).min(self.height);
        if end_x <= start_x || end_y <= start_y {
            return;
        }
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(frame, px, py, color);
            }
        }
    }

    fn draw_rect_outline(&self, frame: &mut [u8], x: i64, y: i64, w: i64, h: i64, color: Rgba) {
        if w <= 1 || h <= 1 {
            return;
        }
        self.fill_rect(frame, x, y, w, 1, color);
        self.fill_rect(frame, x, y + h - 1, w, 1, color);
        self.fill_rect(frame, x, y + 1, 1, h - 2, color);
        self.fill_rect(frame, x + w - 1, y + 1, 1, h - 2, color);
    }

    fn draw_ring(&self, frame: &mut [u8], cx: f32, cy: f32, radius_px: f32, color: Rgba) {
        if !radius_px.is_finite() || radius_px <= 0.0 {
            return;
        }
        let (width, height) = (self.width as f32, self.height as f32);
        let nearest = (cx - cx.clamp(0.0, width)).hypot(cy - cy.clamp(0.0, height));
        let farthest = cx.abs().max((width - cx).abs()).hypot(cy.abs().max((height - cy).abs()));
        if radius_px + 1.0 < nearest || radius_px - 1.0 > farthest {
            return;
        }

        let steps = (f64::from(std::f32::consts::TAU) * f64::from(radius_px) * 2.0).ceil();
        if steps > (self.width * self.height) as f64 {
            self.scan_ring(frame, cx, cy, radius_px, color);
            return;
        }
        let steps = (steps as usize).max(16);
        let mut last = None;
        for step in 0..steps {
            let angle = std::f32::consts::TAU * step as f32 / steps as f32;
            let px = (cx + radius_px * angle.cos()).floor() as i64;
            let py = (cy + radius_px * angle.sin()).floor() as i64;
            if last == Some((px, py)) {
                continue;
            }
            last = Some((px, py));
            self.blend_pixel(frame, px, py, color);
        }
    }

    /// Per-pixel ring for circles whose outline is longer than the frame
    /// has pixels.
    fn scan_ring(&self, frame: &mut [u8], cx: f32, cy: f32, radius_px: f32, color: Rgba) {
        let (cx, cy, radius) = (f64::from(cx), f64::from(cy), f64::from(radius_px));
        for py in 0..self.height {
            for px in 0..self.width {
                let distance = (px as f64 + 0.5 - cx).hypot(py as f64 + 0.5 - cy);
                if (distance - radius).abs() <= 0.5 {
                    self.blend_pixel(frame, px, py, color);
                }
            }
        }
    }
}
