use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::geom::{same_ring, PolyPoints};
use crate::projection;
use crate::tilebelt::{Tile, MAX_ZOOM};

/// Every grid cell the segment between the centres of `from` and `to`
/// passes through, in traversal order, both endpoints included.
///
/// Unlike Bresenham, when the segment crosses exactly through a cell corner
/// both cells sharing that corner are emitted (row neighbour first, then
/// column neighbour) before the diagonal cell. With that ordering the
/// traversal of `to -> from` is exactly the reverse of `from -> to`.
pub fn supercover_line(from: (u32, u32), to: (u32, u32)) -> Vec<(u32, u32)> {
  let (x0, y0) = (from.0 as i64, from.1 as i64);
  let (x1, y1) = (to.0 as i64, to.1 as i64);
  let (nx, ny) = ((x1 - x0).abs(), (y1 - y0).abs());
  let (sx, sy) = ((x1 - x0).signum(), (y1 - y0).signum());

  let mut cells = Vec::with_capacity((nx + ny + 1) as usize);
  cells.push(from);

  let (mut x, mut y) = (x0, y0);
  let (mut ix, mut iy) = (0i64, 0i64);
  while ix < nx || iy < ny {
    // sign of (next vertical boundary crossing - next horizontal one), scaled
    // by 2 * nx * ny to stay in integers
    let decision = (1 + 2 * ix) * ny - (1 + 2 * iy) * nx;
    if decision == 0 {
      cells.push((x as u32, (y + sy) as u32));
      cells.push(((x + sx) as u32, y as u32));
      x += sx;
      y += sy;
      ix += 1;
      iy += 1;
    } else if decision < 0 {
      x += sx;
      ix += 1;
    } else {
      y += sy;
      iy += 1;
    }
    cells.push((x as u32, y as u32));
  }
  cells
}

/// Tiles at `zoom` touched by the outline of a delta geometry. Consecutive
/// points are joined only while they stay on the same ring; a point that
/// starts a new ring contributes just its own tile until the next point.
pub fn rasterize(poly: &PolyPoints, zoom: u8) -> Result<HashSet<Tile>> {
  if zoom > MAX_ZOOM {
    return Err(Error::InvalidZoom(zoom));
  }
  let z = zoom as u32;
  let mut tiles: HashSet<Tile> = HashSet::new();
  let mut previous: Option<((u32, u32), &[i32])> = None;

  for (point, path) in poly.points.iter().zip(&poly.paths) {
    let cell = projection::to_tile(*point, zoom);
    match previous {
      Some((prev_cell, prev_path)) if same_ring(prev_path, path) => {
        tiles.extend(
          supercover_line(prev_cell, cell)
            .into_iter()
            .map(|(x, y)| (x, y, z)),
        );
      }
      _ => {
        tiles.insert((cell.0, cell.1, z));
      }
    }
    previous = Some((cell, path.as_slice()));
  }

  debug!(
    "rasterized {} points into {} tiles at z{}",
    poly.len(),
    tiles.len(),
    zoom
  );
  Ok(tiles)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geom::Point;
  use crate::projection::EARTH_RADIUS;
  use std::f64::consts::PI;

  // Projected centre of tile (x, y) at zoom.
  fn tile_center(x: u32, y: u32, zoom: u8) -> Point {
    let n = (1u64 << zoom) as f64;
    let half_world = PI * EARTH_RADIUS;
    Point {
      x: ((x as f64 + 0.5) / n * 2.0 - 1.0) * half_world,
      y: (1.0 - (y as f64 + 0.5) / n * 2.0) * half_world,
    }
  }

  fn poly(points: &[((u32, u32), &[i32])], zoom: u8) -> PolyPoints {
    PolyPoints {
      points: points
        .iter()
        .map(|((x, y), _)| tile_center(*x, *y, zoom))
        .collect(),
      paths: points.iter().map(|(_, path)| path.to_vec()).collect(),
    }
  }

  #[test]
  fn test_supercover_single_point() {
    assert_eq!(supercover_line((5, 7), (5, 7)), vec![(5, 7)]);
    assert_eq!(supercover_line((0, 0), (0, 0)), vec![(0, 0)]);
  }

  #[test]
  fn test_supercover_steep_quadrant_one() {
    assert_eq!(
      supercover_line((0, 0), (2, 3)),
      vec![(0, 0), (0, 1), (1, 1), (1, 2), (2, 2), (2, 3)]
    );
  }

  #[test]
  fn test_supercover_horizontal_and_vertical() {
    assert_eq!(
      supercover_line((0, 0), (3, 0)),
      vec![(0, 0), (1, 0), (2, 0), (3, 0)]
    );
    assert_eq!(
      supercover_line((4, 9), (4, 6)),
      vec![(4, 9), (4, 8), (4, 7), (4, 6)]
    );
    assert_eq!(
      supercover_line((6, 2), (3, 2)),
      vec![(6, 2), (5, 2), (4, 2), (3, 2)]
    );
  }

  #[test]
  fn test_supercover_diagonal_crossings() {
    assert_eq!(
      supercover_line((0, 3), (3, 0)),
      vec![
        (0, 3),
        (0, 2),
        (1, 3),
        (1, 2),
        (1, 1),
        (2, 2),
        (2, 1),
        (2, 0),
        (3, 1),
        (3, 0)
      ]
    );
    // a 3:1 line passes through the corner shared by (1,0), (2,0), (1,1), (2,1)
    assert_eq!(
      supercover_line((0, 0), (3, 1)),
      vec![(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (3, 1)]
    );
    // a 2:1 line crosses a row boundary mid-cell and touches no corner
    assert_eq!(
      supercover_line((0, 0), (2, 1)),
      vec![(0, 0), (1, 0), (1, 1), (2, 1)]
    );
  }

  #[test]
  fn test_supercover_reverse_symmetry() {
    let origin = (10u32, 10u32);
    for dx in -6i64..=6 {
      for dy in -6i64..=6 {
        let to = ((10 + dx) as u32, (10 + dy) as u32);
        let forward = supercover_line(origin, to);
        let mut backward = supercover_line(to, origin);
        backward.reverse();
        assert_eq!(forward, backward, "{:?} -> {:?}", origin, to);
      }
    }
  }

  #[test]
  fn test_supercover_is_connected() {
    for to in [(7u32, 2u32), (1, 9), (0, 0), (12, 12), (3, 11)] {
      let cells = supercover_line((5, 5), to);
      assert_eq!(cells.first(), Some(&(5, 5)));
      assert_eq!(cells.last(), Some(&to));
      for pair in cells.windows(2) {
        let step_x = (pair[0].0 as i64 - pair[1].0 as i64).abs();
        let step_y = (pair[0].1 as i64 - pair[1].1 as i64).abs();
        assert!(step_x <= 1 && step_y <= 1, "{:?}", pair);
      }
    }
  }

  #[test]
  fn test_rasterize_empty() {
    assert!(rasterize(&PolyPoints::default(), 10).unwrap().is_empty());
  }

  #[test]
  fn test_rasterize_rejects_deep_zoom() {
    assert!(matches!(
      rasterize(&PolyPoints::default(), 23),
      Err(Error::InvalidZoom(23))
    ));
  }

  #[test]
  fn test_rasterize_ring_outline() {
    let ring: &[((u32, u32), &[i32])] = &[
      ((1, 1), &[1, 1]),
      ((4, 1), &[1, 2]),
      ((4, 4), &[1, 3]),
      ((1, 4), &[1, 4]),
      ((1, 1), &[1, 5]),
    ];
    let tiles = rasterize(&poly(ring, 5), 5).unwrap();
    assert_eq!(tiles.len(), 12);
    assert!(tiles.contains(&(1, 1, 5)));
    assert!(tiles.contains(&(4, 2, 5)));
    assert!(tiles.contains(&(2, 4, 5)));
    // interior is not part of the outline
    assert!(!tiles.contains(&(2, 2, 5)));
    assert!(tiles.iter().all(|t| t.2 == 5));
  }

  #[test]
  fn test_rasterize_does_not_join_separate_rings() {
    let points: &[((u32, u32), &[i32])] = &[
      ((0, 0), &[1, 1, 1]),
      ((3, 0), &[1, 1, 2]),
      ((0, 8), &[2, 1, 1]),
      ((2, 8), &[2, 1, 2]),
    ];
    let tiles = rasterize(&poly(points, 4), 4).unwrap();
    let expected: HashSet<Tile> = [
      (0, 0, 4),
      (1, 0, 4),
      (2, 0, 4),
      (3, 0, 4),
      (0, 8, 4),
      (1, 8, 4),
      (2, 8, 4),
    ]
    .into_iter()
    .collect();
    assert_eq!(tiles, expected);
  }
}
