use crate::coord::LatLng;

/// Edge length of one map tile in pixels at integer zoom levels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Latitude limit of the square Web-Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;

/// Pixel position in the Web-Mercator world at a given zoom.
///
/// `x` grows east, `y` grows south, origin at (lat = MAX, lng = -180).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldPx {
    pub x: f64,
    pub y: f64,
}

impl WorldPx {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: WorldPx) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * zoom.exp2()
}

pub fn project(p: LatLng, zoom: f64) -> WorldPx {
    let size = world_size_px(zoom);
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) * 0.5 * size;
    WorldPx::new(x, y)
}

pub fn unproject(px: WorldPx, zoom: f64) -> LatLng {
    let size = world_size_px(zoom);
    let lng = px.x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * px.y / size);
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::{WorldPx, project, unproject, world_size_px};
    use crate::coord::LatLng;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_projects_to_world_center() {
        let px = project(LatLng::new(0.0, 0.0), 0.0);
        assert_close(px.x, 128.0, 1e-9);
        assert_close(px.y, 128.0, 1e-9);
    }

    #[test]
    fn world_doubles_per_zoom_level() {
        assert_eq!(world_size_px(1.0), 512.0);
        let a = project(LatLng::new(10.0, 20.0), 3.0);
        let b = project(LatLng::new(10.0, 20.0), 4.0);
        assert_close(b.x, a.x * 2.0, 1e-9);
        assert_close(b.y, a.y * 2.0, 1e-9);
    }

    #[test]
    fn unproject_inverts_project() {
        let p = LatLng::new(39.7392, -104.9903);
        let rt = unproject(project(p, 13.0), 13.0);
        assert_close(rt.lat, p.lat, 1e-9);
        assert_close(rt.lng, p.lng, 1e-9);
    }

    #[test]
    fn distance_sq_is_squared_euclidean() {
        assert_eq!(WorldPx::new(0.0, 0.0).distance_sq(WorldPx::new(3.0, 4.0)), 25.0);
    }
}
