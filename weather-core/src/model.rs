/// Offset between the Celsius and Kelvin scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Locality resolved from a postal code. An empty name means the code is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalLocation {
    pub locality_name: String,
}

impl PostalLocation {
    pub fn new(locality_name: impl Into<String>) -> Self {
        Self {
            locality_name: locality_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locality_name.is_empty()
    }
}

/// Current temperature in the three supported scales.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeatherReading {
    pub celsius: f64,
    pub fahrenheit: f64,
    pub kelvin: f64,
}

impl WeatherReading {
    /// Build a reading from the two scales reported upstream, deriving kelvin.
    pub fn from_scales(celsius: f64, fahrenheit: f64) -> Self {
        Self {
            celsius,
            fahrenheit,
            kelvin: celsius + KELVIN_OFFSET,
        }
    }

    /// Reading as returned by a weather resolver: kelvin is not populated.
    pub fn raw(celsius: f64, fahrenheit: f64) -> Self {
        Self {
            celsius,
            fahrenheit,
            kelvin: 0.0,
        }
    }

    /// True for the all-zero reading resolvers hand back when the body had no
    /// temperature fields.
    ///
    /// This is a numeric sentinel rather than an explicit absence: a payload missing
    /// only one of the fields still reads as data. 0 °C is 32 °F, so a genuine
    /// reading never collides with it.
    pub fn is_sentinel(&self) -> bool {
        self.celsius == 0.0 && self.fahrenheit == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_scales_derives_kelvin() {
        let reading = WeatherReading::from_scales(25.0, 77.0);
        assert_eq!(reading.kelvin, 298.15);
    }

    #[test]
    fn freezing_point_is_not_sentinel() {
        assert!(!WeatherReading::raw(0.0, 32.0).is_sentinel());
        assert!(WeatherReading::raw(0.0, 0.0).is_sentinel());
    }

    #[test]
    fn empty_location() {
        assert!(PostalLocation::default().is_empty());
        assert!(!PostalLocation::new("Recife").is_empty());
    }
}
