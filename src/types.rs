use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PointId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// What a map point stands for. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Hotspot,
    Ngo,
    Volunteer,
    Donor,
}

impl PointKind {
    pub const ALL: [PointKind; 4] = [
        PointKind::Hotspot,
        PointKind::Ngo,
        PointKind::Volunteer,
        PointKind::Donor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PointKind::Hotspot => "hotspot",
            PointKind::Ngo => "ngo",
            PointKind::Volunteer => "volunteer",
            PointKind::Donor => "donor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! lowercase_enum_text {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| UnknownVariant {
                        kind: $label,
                        value: s.to_string(),
                    })
            }
        }
    };
}

lowercase_enum_text!(Severity, "severity");
lowercase_enum_text!(PointKind, "type");
lowercase_enum_text!(Category, "category");
lowercase_enum_text!(Urgency, "urgency");

/// The need a reporter picked on the form. Does not affect the map point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Food,
    Water,
    Shelter,
    Medical,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Water,
        Category::Shelter,
        Category::Medical,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Water => "water",
            Category::Shelter => "shelter",
            Category::Medical => "medical",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Normal,
        Urgency::Urgent,
        Urgency::Emergency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }
}

/// A WGS84 position. Always finite and inside the lat/lng ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("coordinates {lat}, {lng} are out of range")]
pub struct OutOfRange {
    pub lat: f64,
    pub lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = OutOfRange;

    fn try_from(RawCoordinates { lat, lng }: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(lat, lng).ok_or(OutOfRange { lat, lng })
    }
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let in_range = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        in_range.then_some(Self { lat, lng })
    }

    /// geo points are x = longitude, y = latitude.
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    /// Label used when a report is placed by clicking the map.
    pub fn label(self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Extra fields carried only by points that came from a submitted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub description: String,
    pub affected_count: u32,
    pub contact_info: String,
    pub timestamp_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotPoint {
    pub id: PointId,
    pub lat: f64,
    pub lng: f64,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: PointKind,
    pub name: String,
    pub report_count: u32,
    #[serde(flatten)]
    pub details: Option<ReportDetails>,
}

impl HotspotPoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
}

/// A validated report, ready for the store and for any external sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: PointId,
    pub timestamp_created: DateTime<Utc>,
    pub status: ReportStatus,
    pub verified: bool,
    pub severity: Severity,
    pub category: Category,
    pub urgency: Urgency,
    pub description: String,
    pub affected_count: u32,
    pub contact_info: String,
    pub location: String,
    pub coordinates: Coordinates,
}

impl ReportRecord {
    /// Map point for this report. Submitted reports are always hotspots,
    /// whatever category the reporter chose.
    pub fn to_point(&self) -> HotspotPoint {
        let name = if self.location.trim().is_empty() {
            "New Report".to_string()
        } else {
            self.location.trim().to_string()
        };

        HotspotPoint {
            id: self.id.clone(),
            lat: self.coordinates.lat,
            lng: self.coordinates.lng,
            severity: self.severity,
            kind: PointKind::Hotspot,
            name,
            report_count: 1,
            details: Some(ReportDetails {
                description: self.description.clone(),
                affected_count: self.affected_count,
                contact_info: self.contact_info.clone(),
                timestamp_created: self.timestamp_created,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range_and_nan() {
        assert!(Coordinates::new(6.52, 3.38).is_some());
        assert!(Coordinates::new(90.0, -180.0).is_some());
        assert!(Coordinates::new(90.5, 0.0).is_none());
        assert!(Coordinates::new(0.0, 181.0).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn coordinates_deserialize_through_range_check() {
        let ok: Coordinates = serde_json::from_str(r#"{"lat":6.5,"lng":3.4}"#).unwrap();
        assert_eq!(ok, Coordinates::new(6.5, 3.4).unwrap());

        let err = serde_json::from_str::<Coordinates>(r#"{"lat":500.0,"lng":3.4}"#).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" ngo ".parse::<PointKind>().unwrap(), PointKind::Ngo);
        assert_eq!("water".parse::<Category>().unwrap(), Category::Water);
        let err = "severe".parse::<Severity>().unwrap_err();
        assert_eq!(err.kind, "severity");
    }

    #[test]
    fn point_serializes_kind_as_type() {
        let point = HotspotPoint {
            id: "seed-1".into(),
            lat: 6.5244,
            lng: 3.3792,
            severity: Severity::High,
            kind: PointKind::Hotspot,
            name: "Lagos Island".into(),
            report_count: 15,
            details: None,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "hotspot");
        assert_eq!(json["reportCount"], 15);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn record_point_is_always_a_hotspot() {
        let record = ReportRecord {
            id: "r1".into(),
            timestamp_created: Utc::now(),
            status: ReportStatus::Pending,
            verified: false,
            severity: Severity::Low,
            category: Category::Medical,
            urgency: Urgency::Urgent,
            description: "Clinic short on supplies".into(),
            affected_count: 12,
            contact_info: "555-0000".into(),
            location: "  ".into(),
            coordinates: Coordinates::new(6.45, 3.39).unwrap(),
        };
        let point = record.to_point();
        assert_eq!(point.kind, PointKind::Hotspot);
        assert_eq!(point.name, "New Report");
        assert_eq!(point.report_count, 1);
        assert_eq!(point.details.unwrap().affected_count, 12);
    }
}
