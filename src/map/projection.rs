use crate::data::boundaries::Bounds;
use glam::DVec2;
use std::f64::consts::PI;

const MAX_LAT: f64 = 85.05;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 20_000.0;
const ZOOM_STEP: f64 = 1.5;

/// Web Mercator position normalized to [0, 1] on both axes
#[inline]
pub fn mercator(lon: f64, lat: f64) -> DVec2 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    DVec2::new(
        (lon + 180.0) / 360.0,
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0,
    )
}

/// Inverse of [`mercator`], returns (lon, lat)
#[inline]
pub fn inverse_mercator(p: DVec2) -> (f64, f64) {
    let lon = p.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * p.y)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Viewport representing the visible map area and zoom level.
///
/// Pixels are braille dots: 2 per cell horizontally, 4 vertically.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Pixels per normalized mercator unit
    #[inline]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    #[inline]
    fn center(&self) -> DVec2 {
        mercator(self.center_lon, self.center_lat)
    }

    fn set_center(&mut self, c: DVec2) {
        let c = c.clamp(DVec2::ZERO, DVec2::ONE);
        let (lon, lat) = inverse_mercator(c);
        self.center_lon = lon;
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);
    }

    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64, self.height as f64) / 2.0
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let delta = DVec2::new(dx as f64, dy as f64) / self.scale();
        self.set_center(self.center() + delta);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    /// Zoom by factor keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.to_world(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let offset = (DVec2::new(px as f64, py as f64) - self.half_size()) / self.scale();
        self.set_center(anchor - offset);
    }

    fn to_world(&self, px: i32, py: i32) -> DVec2 {
        (DVec2::new(px as f64, py as f64) - self.half_size()) / self.scale() + self.center()
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        inverse_mercator(self.to_world(px, py))
    }

    /// Sub-pixel unproject, used for cell-center sampling
    pub fn unproject_f(&self, px: f64, py: f64) -> (f64, f64) {
        inverse_mercator((DVec2::new(px, py) - self.half_size()) / self.scale() + self.center())
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = (mercator(lon, lat) - self.center()) * self.scale() + self.half_size();
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Frame `bounds` with `padding` (fraction of each side left empty)
    pub fn fit_bounds(&mut self, bounds: &Bounds, padding: f64) {
        let top_left = mercator(bounds.min_lon, bounds.max_lat);
        let bottom_right = mercator(bounds.max_lon, bounds.min_lat);
        let extent = (bottom_right - top_left).abs();

        let usable = 1.0 - 2.0 * padding.clamp(0.0, 0.45);
        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;

        let mut zoom = f64::INFINITY;
        if extent.x > 0.0 {
            zoom = zoom.min(usable / extent.x);
        }
        if extent.y > 0.0 {
            zoom = zoom.min(usable * height / (extent.y * width));
        }
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.set_center((top_left + bottom_right) / 2.0);
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, 10);
        assert!(vp.center_lat < 0.0);
    }

    #[test]
    fn test_unproject_roundtrips_project() {
        let vp = Viewport::new(-49.2, -16.6, 300.0, 200, 120);
        let (px, py) = vp.project(-49.5, -16.4);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon + 49.5).abs() < 0.05, "lon {lon}");
        assert!((lat + 16.4).abs() < 0.05, "lat {lat}");
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut vp = Viewport::new(-49.2, -16.6, 100.0, 200, 120);
        let before = vp.unproject(30, 40);
        vp.zoom_in_at(30, 40);
        let after = vp.unproject(30, 40);
        assert!((before.0 - after.0).abs() < 0.05);
        assert!((before.1 - after.1).abs() < 0.05);
        assert!(vp.zoom > 100.0);
    }

    #[test]
    fn test_fit_bounds_contains_corners() {
        let bounds = Bounds {
            min_lon: -53.0,
            min_lat: -19.5,
            max_lon: -45.9,
            max_lat: -12.4,
        };
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 160, 96);
        vp.fit_bounds(&bounds, 0.05);

        for (lon, lat) in [
            (bounds.min_lon, bounds.min_lat),
            (bounds.max_lon, bounds.max_lat),
            (bounds.min_lon, bounds.max_lat),
            (bounds.max_lon, bounds.min_lat),
        ] {
            let (x, y) = vp.project(lon, lat);
            assert!((0..160).contains(&x), "x {x}");
            assert!((0..96).contains(&y), "y {y}");
        }
        let (cx, cy) = bounds.center();
        let (x, y) = vp.project(cx, cy);
        assert!((x - 80).abs() <= 2 && (y - 48).abs() <= 3);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = Viewport::new(0.0, 0.0, MIN_ZOOM, 100, 100);
        vp.zoom_out();
        assert_eq!(vp.zoom, MIN_ZOOM);
    }
}
