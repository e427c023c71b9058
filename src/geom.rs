use crate::error::{Error, Result};

/// A coordinate in the planar Web-Mercator projection, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

/// One record of a point-dump of the patch delta geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRow {
  /// Dump path, e.g. `[geometry, ring, vertex]`
  pub path: Vec<i32>,
  /// Single point WKT, `POINT(x y)`
  pub geom: String,
}

/// Points of a delta geometry with their dump paths, in dump order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyPoints {
  pub points: Vec<Point>,
  pub paths: Vec<Vec<i32>>,
}

impl PolyPoints {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

pub fn parse_wkt_point(wkt: &str) -> Result<Point> {
  let malformed = || Error::MalformedPoint(wkt.to_string());
  let trimmed = wkt.trim();
  let body = match trimmed.get(..5) {
    Some(tag) if tag.eq_ignore_ascii_case("POINT") => trimmed[5..].trim(),
    _ => return Err(malformed()),
  };
  let inner = body
    .strip_prefix('(')
    .and_then(|rest| rest.strip_suffix(')'))
    .ok_or_else(malformed)?;

  let mut coords = inner.split_whitespace().map(|c| c.parse::<f64>());
  match (coords.next(), coords.next(), coords.next()) {
    (Some(Ok(x)), Some(Ok(y)), None) if x.is_finite() && y.is_finite() => Ok(Point { x, y }),
    _ => Err(malformed()),
  }
}

/// Splits point-dump rows into parallel point and path vectors. The first
/// malformed row fails the whole batch.
pub fn parse_poly_points(rows: &[DeltaRow]) -> Result<PolyPoints> {
  let mut out = PolyPoints {
    points: Vec::with_capacity(rows.len()),
    paths: Vec::with_capacity(rows.len()),
  };
  for (i, row) in rows.iter().enumerate() {
    if row.path.is_empty() {
      return Err(Error::MissingPath(i));
    }
    out.points.push(parse_wkt_point(&row.geom)?);
    out.paths.push(row.path.clone());
  }
  Ok(out)
}

/// Whether two dumped points lie on the same ring or line, i.e. every path
/// component but the trailing vertex index matches.
pub fn same_ring(a: &[i32], b: &[i32]) -> bool {
  match (a.split_last(), b.split_last()) {
    (Some((_, a_prefix)), Some((_, b_prefix))) => a_prefix == b_prefix,
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(path: &[i32], geom: &str) -> DeltaRow {
    DeltaRow {
      path: path.to_vec(),
      geom: geom.to_string(),
    }
  }

  #[test]
  fn test_parse_wkt_point() {
    assert_eq!(
      parse_wkt_point("POINT(1 2)").unwrap(),
      Point { x: 1.0, y: 2.0 }
    );
    assert_eq!(
      parse_wkt_point("  point ( -13627361.0 4547675.35 ) ").unwrap(),
      Point {
        x: -13627361.0,
        y: 4547675.35
      }
    );
    assert_eq!(
      parse_wkt_point("POINT(1e3 -2.5E-1)").unwrap(),
      Point { x: 1000.0, y: -0.25 }
    );
  }

  #[test]
  fn test_parse_wkt_point_malformed() {
    for wkt in [
      "",
      "POINT",
      "POINT()",
      "POINT(1)",
      "POINT(1 2 3)",
      "POINT(1 2",
      "POINT 1 2",
      "LINESTRING(1 2, 3 4)",
      "POINT(a b)",
      "POINT(NaN 1)",
    ] {
      assert!(
        matches!(parse_wkt_point(wkt), Err(Error::MalformedPoint(_))),
        "{:?} should not parse",
        wkt
      );
    }
  }

  #[test]
  fn test_parse_poly_points_preserves_order() {
    let rows = vec![
      row(&[1, 1, 1], "POINT(0 0)"),
      row(&[1, 1, 2], "POINT(10 0)"),
      row(&[1, 1, 3], "POINT(10 10)"),
      row(&[2, 1, 1], "POINT(-5 -5)"),
    ];
    let parsed = parse_poly_points(&rows).unwrap();
    assert_eq!(parsed.len(), rows.len());
    assert_eq!(parsed.paths.len(), rows.len());
    assert_eq!(parsed.points[1], Point { x: 10.0, y: 0.0 });
    assert_eq!(parsed.points[3], Point { x: -5.0, y: -5.0 });
    assert_eq!(parsed.paths[3], vec![2, 1, 1]);
  }

  #[test]
  fn test_parse_poly_points_fails_fast() {
    let rows = vec![row(&[1, 1], "POINT(0 0)"), row(&[1, 2], "POINT(oops)")];
    assert!(matches!(
      parse_poly_points(&rows),
      Err(Error::MalformedPoint(_))
    ));

    let rows = vec![row(&[1, 1], "POINT(0 0)"), row(&[], "POINT(1 1)")];
    assert!(matches!(
      parse_poly_points(&rows),
      Err(Error::MissingPath(1))
    ));

    assert!(parse_poly_points(&[]).unwrap().is_empty());
  }

  #[test]
  fn test_same_ring() {
    assert!(same_ring(&[1, 1, 1], &[1, 1, 2]));
    assert!(!same_ring(&[1, 1, 9], &[2, 1, 1]));
    assert!(!same_ring(&[1, 1, 9], &[1, 2, 1]));
    assert!(same_ring(&[1], &[2]));
    assert!(!same_ring(&[], &[1]));
  }
}
