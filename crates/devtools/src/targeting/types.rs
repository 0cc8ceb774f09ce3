use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn distance_squared(self, other: Cell) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dz * dz
    }

    pub fn within_radius(self, center: Cell, radius: f32) -> bool {
        if radius < 0.0 {
            return false;
        }
        (self.distance_squared(center) as f64) <= f64::from(radius) * f64::from(radius)
    }

    /// Cells of `bounds` whose centre lies within `radius` of `center`, row
    /// by row. Only the part of the circle inside `bounds` is visited.
    pub fn radial_cells(center: Cell, radius: f32, bounds: CellRect) -> Vec<Cell> {
        if !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }
        let reach = f64::from(radius).ceil() as i64;
        let span = |centre: i32, min: i32, max: i32| {
            let lo = i64::from(centre).saturating_sub(reach).max(i64::from(min));
            let hi = i64::from(centre).saturating_add(reach).min(i64::from(max));
            // Both ends lie within `min..=max` unless the range is empty.
            (lo as i32, hi as i32, lo <= hi)
        };
        let (min_x, max_x, any_x) = span(center.x, bounds.min.x, bounds.max.x);
        let (min_z, max_z, any_z) = span(center.z, bounds.min.z, bounds.max.z);
        if !any_x || !any_z {
            return Vec::new();
        }

        let mut cells = Vec::new();
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                let cell = Cell::new(x, z);
                if cell.within_radius(center, radius) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Inclusive rectangle spanned by two corner cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellRect {
    pub min: Cell,
    pub max: Cell,
}

impl CellRect {
    pub fn from_corners(a: Cell, b: Cell) -> Self {
        Self {
            min: Cell::new(a.x.min(b.x), a.z.min(b.z)),
            max: Cell::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    pub fn width(&self) -> u32 {
        self.max.x.abs_diff(self.min.x) + 1
    }

    pub fn height(&self) -> u32 {
        self.max.z.abs_diff(self.min.z) + 1
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x) && (self.min.z..=self.max.z).contains(&cell.z)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| Cell::new(x, z)))
    }
}

/// A thing resolved under the cursor, as the host describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingTarget {
    pub id: u64,
    pub cell: Cell,
    pub label: String,
    pub is_pawn: bool,
    pub has_food_need: bool,
    pub is_animal: bool,
}

/// One pointer resolution result. `Cancel` covers right-click, escape and
/// failed resolution alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    Cell(Cell),
    Thing(ThingTarget),
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_corner_order() {
        let rect = CellRect::from_corners(Cell::new(4, 1), Cell::new(2, 3));
        assert_eq!(rect.min, Cell::new(2, 1));
        assert_eq!(rect.max, Cell::new(4, 3));
        assert_eq!(rect.width(), 3);
        assert_eq!(rect.height(), 3);
        assert_eq!(rect.area(), 9);
        assert!(rect.contains(Cell::new(3, 2)));
        assert!(!rect.contains(Cell::new(5, 2)));
        assert_eq!(rect.cells().count(), 9);
    }

    #[test]
    fn single_cell_rect_has_area_one() {
        let cell = Cell::new(-3, 7);
        let rect = CellRect::from_corners(cell, cell);
        assert_eq!(rect.area(), 1);
        assert_eq!(rect.cells().collect::<Vec<_>>(), vec![cell]);
    }

    #[test]
    fn radial_cells_respect_radius() {
        let center = Cell::new(0, 0);
        let open = CellRect::from_corners(Cell::new(-50, -50), Cell::new(50, 50));
        assert_eq!(Cell::radial_cells(center, 0.0, open), vec![center]);

        let one = Cell::radial_cells(center, 1.0, open);
        assert_eq!(one.len(), 5);
        assert!(!one.contains(&Cell::new(1, 1)));

        let wider = Cell::radial_cells(center, 1.5, open);
        assert_eq!(wider.len(), 9);
        assert!(Cell::radial_cells(center, -1.0, open).is_empty());
    }

    #[test]
    fn radial_cells_stay_inside_bounds() {
        let grid = CellRect::from_corners(Cell::new(0, 0), Cell::new(9, 9));

        let corner = Cell::radial_cells(Cell::new(0, 0), 1.0, grid);
        assert_eq!(corner, vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(0, 1)]);

        let huge = Cell::radial_cells(Cell::new(1, 1), 4000.0, grid);
        assert_eq!(huge.len(), 100);
        assert_eq!(Cell::radial_cells(Cell::new(5, 5), f32::MAX, grid).len(), 100);

        let far = Cell::new(i32::MAX, i32::MIN);
        assert!(Cell::radial_cells(far, 3.0, grid).is_empty());
        assert_eq!(Cell::radial_cells(far, 1e30, grid).len(), 100);
    }
}
