/// Geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate only if both components are finite and in range.
    ///
    /// Latitude must lie in `[-90, 90]`, longitude in `[-180, 180]`.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let c = Self::new(lat, lng);
        c.is_valid().then_some(c)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Shifts the coordinate north by `dlat` degrees, clamped to the poles.
    pub fn offset_lat(self, dlat: f64) -> Self {
        Self::new((self.lat + dlat).clamp(-90.0, 90.0), self.lng)
    }
}
