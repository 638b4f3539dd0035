use serde::{Deserialize, Serialize};

/// Integer coordinate of a terrain tile on the XZ plane.
///
/// Coordinates carry the configured origin bias, so the tile containing the
/// world origin is `(bias, bias)` rather than `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i64,
    pub z: i64,
}

impl GridCoord {
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    /// Offset this coordinate by a number of tiles on each axis.
    pub const fn offset(self, dx: i64, dz: i64) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Stable lookup key for this tile, e.g. `Terrain:12,-3`.
    pub fn tile_name(self) -> String {
        format!("Terrain:{},{}", self.x, self.z)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tile_name_format() {
        assert_eq!(GridCoord::new(250, 251).tile_name(), "Terrain:250,251");
        assert_eq!(GridCoord::new(-4, 0).tile_name(), "Terrain:-4,0");
    }

    #[test]
    fn tile_name_is_injective() {
        // "1,23" vs "12,3" style collisions are ruled out by the separator.
        let mut names = HashSet::new();
        for x in -15..15 {
            for z in -15..15 {
                assert!(names.insert(GridCoord::new(x, z).tile_name()));
            }
        }
    }

    #[test]
    fn offset_moves_both_axes() {
        let c = GridCoord::new(10, 10).offset(1, -2);
        assert_eq!(c, GridCoord::new(11, 8));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut coords = vec![
            GridCoord::new(1, 0),
            GridCoord::new(0, 5),
            GridCoord::new(0, 1),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(0, 1),
                GridCoord::new(0, 5),
                GridCoord::new(1, 0)
            ]
        );
    }
}
