use std::fmt;
use std::str::FromStr;

use geo::{Rect, coord};

use crate::error::GeometryError;

pub mod utm;

/// Upper bound on tiles per axis; one catalog query is issued per tile
pub const MAX_GRID_SIZE: u32 = 1000;

/// An axis-aligned extent in a projected coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting non-finite or zero-area extents
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, GeometryError> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(GeometryError::DegenerateBox(format!(
                "({}, {}, {}, {})",
                min_x, min_y, max_x, max_y
            )));
        }

        Ok(Self { min_x, min_y, max_x, max_y })
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The NVDB `kartutsnitt` form: `min_x,min_y,max_x,max_y`
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl FromStr for BoundingBox {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GeometryError::ParseError(format!("{}: {}", s, e)))?;

        match values.as_slice() {
            [min_x, min_y, max_x, max_y] => Self::new(*min_x, *min_y, *max_x, *max_y),
            _ => Err(GeometryError::ParseError(format!(
                "expected 4 comma-separated numbers, got {}",
                values.len()
            ))),
        }
    }
}

/// Split a bounding box into a `grid_size` x `grid_size` grid of tiles.
///
/// Tiles are returned in row-major order with x as the outer axis. Tile edges
/// are computed from the original extent rather than accumulated, so adjacent
/// tiles share exactly the same boundary value and the last row/column ends
/// exactly on the original maximum.
pub fn partition(bbox: &BoundingBox, grid_size: u32) -> Result<Vec<BoundingBox>, GeometryError> {
    if grid_size == 0 || grid_size > MAX_GRID_SIZE {
        return Err(GeometryError::InvalidGridSize(grid_size));
    }

    let x_edges = axis_edges(bbox.min_x, bbox.max_x, grid_size);
    let y_edges = axis_edges(bbox.min_y, bbox.max_y, grid_size);

    let mut tiles = Vec::with_capacity(grid_size as usize * grid_size as usize);
    for x in x_edges.windows(2) {
        for y in y_edges.windows(2) {
            // Fails only if the extent is too small to split at f64 precision
            tiles.push(BoundingBox::new(x[0], y[0], x[1], y[1])?);
        }
    }

    Ok(tiles)
}

fn axis_edges(min: f64, max: f64, steps: u32) -> Vec<f64> {
    let span = max - min;
    (0..=steps)
        .map(|i| {
            if i == steps {
                max
            } else {
                min + span * i as f64 / steps as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
        let w = a.max_x().min(b.max_x()) - a.min_x().max(b.min_x());
        let h = a.max_y().min(b.max_y()) - a.min_y().max(b.min_y());
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }

    #[test]
    fn test_partition_covers_box_without_overlap() {
        let bbox = BoundingBox::new(250000.0, 7000000.0, 300000.0, 7100000.0).unwrap();

        for grid_size in [1, 2, 3, 7, 20] {
            let tiles = partition(&bbox, grid_size).unwrap();
            assert_eq!(tiles.len(), (grid_size * grid_size) as usize);

            let total: f64 = tiles.iter().map(|t| t.to_rect().unsigned_area()).sum();
            assert!((total - bbox.area()).abs() / bbox.area() < 1e-9, "grid {} area mismatch", grid_size);

            for (i, a) in tiles.iter().enumerate() {
                for b in &tiles[i + 1..] {
                    assert_eq!(overlap_area(a, b), 0.0, "tiles {} and {} overlap", a, b);
                }
            }
        }
    }

    #[test]
    fn test_partition_row_major_order() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let tiles = partition(&bbox, 2).unwrap();

        let expected = [
            (0.0, 0.0, 5.0, 5.0),
            (0.0, 5.0, 5.0, 10.0),
            (5.0, 0.0, 10.0, 5.0),
            (5.0, 5.0, 10.0, 10.0),
        ];
        for (tile, (min_x, min_y, max_x, max_y)) in tiles.iter().zip(expected) {
            assert_eq!(*tile, BoundingBox::new(min_x, min_y, max_x, max_y).unwrap());
        }
    }

    #[test]
    fn test_partition_ends_exactly_on_original_bounds() {
        let bbox = BoundingBox::new(0.1, 0.2, 0.7, 0.9).unwrap();
        let tiles = partition(&bbox, 3).unwrap();
        let last = tiles.last().unwrap();
        assert_eq!(last.max_x(), 0.7);
        assert_eq!(last.max_y(), 0.9);
        assert_eq!(tiles[0].min_x(), 0.1);
        assert_eq!(tiles[0].min_y(), 0.2);
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        assert!(BoundingBox::new(10.0, 0.0, 10.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 5.0, 10.0, 1.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());

        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(matches!(partition(&bbox, 0), Err(GeometryError::InvalidGridSize(0))));
        assert!(matches!(
            partition(&bbox, MAX_GRID_SIZE + 1),
            Err(GeometryError::InvalidGridSize(1001))
        ));
        assert!(matches!(partition(&bbox, 70_000), Err(GeometryError::InvalidGridSize(70_000))));
        assert_eq!(partition(&bbox, MAX_GRID_SIZE).unwrap().len(), 1_000_000);
    }

    #[test]
    fn test_bbox_from_str() {
        let bbox: BoundingBox = "250000, 7000000,300000,7100000".parse().unwrap();
        assert_eq!(bbox.min_x(), 250000.0);
        assert_eq!(bbox.max_y(), 7100000.0);
        assert_eq!(bbox.to_query_value(), "250000,7000000,300000,7100000");

        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
        assert!("5,5,1,1".parse::<BoundingBox>().is_err());
    }
}
