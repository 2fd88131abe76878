use crate::error::WaypointError;

// A single geographic point with optional labels.
//
// `None` means the field was never recorded; `Some("")` means it was
// recorded with empty text. Coordinates are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    latitude: f64,
    longitude: f64,
    name: Option<String>,
    description: Option<String>,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WaypointError> {
        Ok(Waypoint {
            latitude: finite("latitude", latitude)?,
            longitude: finite("longitude", longitude)?,
            name: None,
            description: None,
        })
    }

    /// Builds a waypoint from coordinate text, as found in CSV cells or GPX
    /// attributes. Surrounding whitespace is ignored.
    pub fn from_text(latitude: &str, longitude: &str) -> Result<Self, WaypointError> {
        Ok(Waypoint {
            latitude: parse_coordinate("latitude", latitude)?,
            longitude: parse_coordinate("longitude", longitude)?,
            name: None,
            description: None,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

fn parse_coordinate(field: &'static str, text: &str) -> Result<f64, WaypointError> {
    let invalid = || WaypointError::InvalidCoordinate {
        field,
        value: text.to_string(),
    };
    let value = text.trim().parse::<f64>().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, WaypointError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(WaypointError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_text() {
        let wp = Waypoint::from_text(" 45.2", "-10.5 ").unwrap();
        assert_eq!(wp.latitude(), 45.2);
        assert_eq!(wp.longitude(), -10.5);
        assert_eq!(wp.name(), None);
        assert_eq!(wp.description(), None);
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        assert_eq!(
            Waypoint::from_text("abc", "10.5"),
            Err(WaypointError::InvalidCoordinate {
                field: "latitude",
                value: "abc".to_string()
            })
        );
        assert!(Waypoint::from_text("45.2", "").is_err());
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(Waypoint::from_text("NaN", "0").is_err());
        assert!(Waypoint::from_text("0", "inf").is_err());
        assert!(Waypoint::new(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn keeps_empty_text_distinct_from_absent() {
        let wp = Waypoint::new(1.0, 2.0)
            .unwrap()
            .with_name(Some(String::new()))
            .with_description(None);
        assert_eq!(wp.name(), Some(""));
        assert_eq!(wp.description(), None);
    }
}
