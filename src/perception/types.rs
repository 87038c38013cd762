use serde::{Deserialize, Serialize};

/// A point on screen in normalized coordinates, both axes in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Out-of-range inputs are clamped rather than rejected; vision models
    /// occasionally return values like 1.0000001 at screen edges.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Convert to physical pixel coordinates, strictly inside screen bounds.
    pub fn to_pixels(self, screen: ScreenSize) -> PixelPoint {
        let px = ((self.x * screen.width as f64) as i64).min(screen.width as i64 - 1) as i32;
        let py = ((self.y * screen.height as f64) as i64).min(screen.height as i64 - 1) as i32;
        PixelPoint { x: px, y: py }
    }
}

/// A point in physical pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1080,
        height: 2400,
    };

    #[test]
    fn point_clamps_to_unit_range() {
        let p = Point::new(-0.2, 1.3);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 1.0);
    }

    #[test]
    fn center_converts_to_screen_center() {
        let px = Point::new(0.5, 0.5).to_pixels(SCREEN);
        assert_eq!(px, PixelPoint { x: 540, y: 1200 });
    }

    #[test]
    fn edge_point_stays_inside_bounds() {
        let px = Point::new(1.0, 1.0).to_pixels(SCREEN);
        assert_eq!(px, PixelPoint { x: 1079, y: 2399 });
    }

    #[test]
    fn origin_maps_to_zero() {
        let px = Point::new(0.0, 0.0).to_pixels(SCREEN);
        assert_eq!(px, PixelPoint { x: 0, y: 0 });
    }
}
