use crate::error::{Field, FieldError, ValidationErrors};
use crate::types::{Category, Coordinates, ReportRecord, ReportStatus, Severity, Urgency};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;
use uuid::Uuid;

/// Whether the free-text location must be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationRequirement {
    Required,
    Optional,
}

/// Where a report was started from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// The user clicked the map; coordinates come from the click.
    MapClick(Coordinates),
    /// The user opened the form directly.
    Manual,
}

impl EntryPoint {
    /// Position implied by the entry, if any.
    pub fn position(&self) -> Option<Coordinates> {
        match self {
            EntryPoint::MapClick(at) => Some(*at),
            EntryPoint::Manual => None,
        }
    }
}

/// Raw form input. Text fields are kept as typed so validation can report
/// exactly what was wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportDraft {
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub severity: Severity,
    pub description: String,
    pub affected_count: String,
    pub contact_info: String,
    pub urgency: Urgency,
    pub category: Category,
}

impl ReportDraft {
    pub fn for_entry(entry: EntryPoint) -> Self {
        match entry {
            EntryPoint::MapClick(at) => Self::at(at),
            EntryPoint::Manual => Self::default(),
        }
    }

    /// Draft prefilled with a position, as after a map click or a
    /// "use my location" button.
    pub fn at(at: Coordinates) -> Self {
        Self {
            location: at.label(),
            latitude: format!("{:.6}", at.lat),
            longitude: format!("{:.6}", at.lng),
            ..Self::default()
        }
    }
}

/// Parses `"lat, lng"` (comma separated, whitespace ignored).
pub fn parse_lat_lng(text: &str) -> Option<(f64, f64)> {
    let (lat, lng) = text.split_once(',')?;
    let lat = lat.trim().parse().ok()?;
    let lng = lng.trim().parse().ok()?;
    Some((lat, lng))
}

fn resolve_coordinates(
    draft: &ReportDraft,
    implied: Option<Coordinates>,
    errors: &mut ValidationErrors,
) -> Option<Coordinates> {
    let explicit: Option<(f64, f64)> = match (draft.latitude.trim(), draft.longitude.trim()) {
        ("", _) | (_, "") => None,
        (lat, lng) => lat.parse().ok().zip(lng.parse().ok()),
    };

    let fallback = || {
        implied
            .map(|at| (at.lat, at.lng))
            .or_else(|| parse_lat_lng(&draft.location))
    };
    let Some((lat, lng)) = explicit.or_else(fallback) else {
        errors.push(FieldError::RequiredField(Field::Coordinates));
        return None;
    };

    let coordinates = Coordinates::new(lat, lng);
    if coordinates.is_none() {
        errors.push(FieldError::InvalidCoordinates { lat, lng });
    }
    coordinates
}

fn positive_count(raw: &str, errors: &mut ValidationErrors) -> Option<u32> {
    let parsed = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok());
    if parsed.is_none() {
        errors.push(FieldError::InvalidNumber {
            field: Field::AffectedCount,
            value: raw.to_string(),
        });
    }
    parsed
}

fn required_text(value: &str, field: Field, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.push(FieldError::RequiredField(field));
    }
}

/// Checks every field of `draft` and, when all pass, turns it into a fresh
/// pending record. All problems are returned together.
pub fn validate(
    draft: &ReportDraft,
    location: LocationRequirement,
) -> Result<ReportRecord, ValidationErrors> {
    validate_from(draft, location, EntryPoint::Manual)
}

/// Like [`validate`], but a map click supplies the position when the draft's
/// latitude and longitude are blank.
pub fn validate_from(
    draft: &ReportDraft,
    location: LocationRequirement,
    entry: EntryPoint,
) -> Result<ReportRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if location == LocationRequirement::Required {
        required_text(&draft.location, Field::Location, &mut errors);
    }
    let coordinates = resolve_coordinates(draft, entry.position(), &mut errors);
    required_text(&draft.description, Field::Description, &mut errors);
    let affected_count = positive_count(&draft.affected_count, &mut errors);
    required_text(&draft.contact_info, Field::ContactInfo, &mut errors);

    match (coordinates, affected_count) {
        (Some(coordinates), Some(affected_count)) if errors.is_empty() => Ok(ReportRecord {
            id: Uuid::new_v4().to_string(),
            timestamp_created: Utc::now(),
            status: ReportStatus::Pending,
            verified: false,
            severity: draft.severity,
            category: draft.category,
            urgency: draft.urgency,
            description: draft.description.trim().to_string(),
            affected_count,
            contact_info: draft.contact_info.trim().to_string(),
            location: draft.location.trim().to_string(),
            coordinates,
        }),
        _ => Err(errors),
    }
}

/// Receives every accepted report, e.g. for forwarding to a backend.
pub trait ReportSink: Send {
    fn submit(&mut self, record: &ReportRecord);

    /// Most recent submissions, newest first, if the sink keeps any.
    fn recent(&self) -> Vec<ReportRecord> {
        Vec::new()
    }
}

/// Logs each report and keeps nothing.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn submit(&mut self, record: &ReportRecord) {
        info!(
            id = %record.id,
            severity = %record.severity,
            category = %record.category,
            urgency = %record.urgency,
            affected = record.affected_count,
            "new report submitted"
        );
    }
}

/// Keeps the last `capacity` reports, newest first, and logs each one.
#[derive(Debug)]
pub struct RecentReports {
    capacity: usize,
    reports: VecDeque<ReportRecord>,
}

impl RecentReports {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            reports: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl ReportSink for RecentReports {
    fn submit(&mut self, record: &ReportRecord) {
        LogSink.submit(record);
        if self.capacity == 0 {
            return;
        }
        if self.reports.len() == self.capacity {
            self.reports.pop_back();
        }
        self.reports.push_front(record.clone());
    }

    fn recent(&self) -> Vec<ReportRecord> {
        self.reports.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointKind;

    fn draft(description: &str, affected: &str, contact: &str, location: &str) -> ReportDraft {
        ReportDraft {
            description: description.into(),
            affected_count: affected.into(),
            contact_info: contact.into(),
            location: location.into(),
            ..ReportDraft::default()
        }
    }

    fn assert_description_and_count_rejected(errors: &ValidationErrors) {
        assert_eq!(
            errors.get(Field::Description),
            Some(&FieldError::RequiredField(Field::Description))
        );
        assert!(matches!(
            errors.get(Field::AffectedCount),
            Some(FieldError::InvalidNumber { field: Field::AffectedCount, .. })
        ));
    }

    #[test]
    fn collects_every_failure() {
        let bad = draft("", "0", "a@b.com", "");

        // nothing places this report, so coordinates are missing too
        let errors = validate(&bad, LocationRequirement::Optional).unwrap_err();
        assert_description_and_count_rejected(&errors);
        assert_eq!(
            errors.get(Field::Coordinates),
            Some(&FieldError::RequiredField(Field::Coordinates))
        );
        assert_eq!(errors.len(), 3);

        let errors = validate(&bad, LocationRequirement::Required).unwrap_err();
        assert_description_and_count_rejected(&errors);
        assert!(errors.get(Field::Location).is_some());
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn map_click_leaves_only_the_field_failures() {
        let bad = draft("", "0", "a@b.com", "");
        let click = EntryPoint::MapClick(Coordinates::new(6.5, 3.4).unwrap());

        let errors = validate_from(&bad, LocationRequirement::Optional, click).unwrap_err();

        assert_description_and_count_rejected(&errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn map_click_position_fills_blank_coordinates() {
        let d = draft("Need food", "5", "555", "");
        let click = EntryPoint::MapClick(Coordinates::new(6.5, 3.4).unwrap());

        let record = validate_from(&d, LocationRequirement::Optional, click).unwrap();
        assert_eq!(record.coordinates, Coordinates::new(6.5, 3.4).unwrap());

        let mut d = d;
        d.latitude = "6.61".into();
        d.longitude = "3.31".into();
        let record = validate_from(&d, LocationRequirement::Optional, click).unwrap();
        assert_eq!(record.coordinates, Coordinates::new(6.61, 3.31).unwrap());
    }

    #[test]
    fn accepts_complete_draft() {
        let good = draft("Need food", "50", "555-1234", "6.52,3.38");

        let record = validate(&good, LocationRequirement::Required).unwrap();

        assert_eq!(record.status, ReportStatus::Pending);
        assert!(!record.verified);
        assert_eq!(record.affected_count, 50);
        assert_eq!(record.coordinates, Coordinates::new(6.52, 3.38).unwrap());
        assert_eq!(record.to_point().kind, PointKind::Hotspot);
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn ids_are_fresh_per_record() {
        let good = draft("Need food", "50", "555-1234", "6.52,3.38");
        let a = validate(&good, LocationRequirement::Optional).unwrap();
        let b = validate(&good, LocationRequirement::Optional).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn whitespace_only_text_is_missing() {
        let blank = draft("   ", "3", "\t", "6.52,3.38");
        let errors = validate(&blank, LocationRequirement::Optional).unwrap_err();
        assert!(errors.get(Field::Description).is_some());
        assert!(errors.get(Field::ContactInfo).is_some());
    }

    #[test]
    fn affected_count_must_be_a_positive_integer() {
        for raw in ["", "abc", "-4", "0", "2.5", "99999999999"] {
            let d = draft("Need food", raw, "555", "6.52,3.38");
            let errors = validate(&d, LocationRequirement::Optional).unwrap_err();
            assert!(errors.get(Field::AffectedCount).is_some(), "accepted {raw:?}");
        }
        let d = draft("Need food", " 7 ", "555", "6.52,3.38");
        assert_eq!(validate(&d, LocationRequirement::Optional).unwrap().affected_count, 7);
    }

    #[test]
    fn location_requirement_is_per_call() {
        let mut d = ReportDraft::at(Coordinates::new(6.45, 3.39).unwrap());
        d.location.clear();
        d.description = "Families queueing since dawn".into();
        d.affected_count = "20".into();
        d.contact_info = "ngo@example.org".into();

        assert!(validate(&d, LocationRequirement::Optional).is_ok());
        let errors = validate(&d, LocationRequirement::Required).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get(Field::Location).is_some());
    }

    #[test]
    fn explicit_coordinates_win_over_location_text() {
        let mut d = draft("Need food", "5", "555", "Surulere District");
        d.latitude = "6.50".into();
        d.longitude = "3.35".into();

        let record = validate(&d, LocationRequirement::Required).unwrap();
        assert_eq!(record.coordinates, Coordinates::new(6.50, 3.35).unwrap());
        assert_eq!(record.to_point().name, "Surulere District");
    }

    #[test]
    fn unresolvable_or_out_of_range_coordinates_fail() {
        let d = draft("Need food", "5", "555", "Surulere District");
        let errors = validate(&d, LocationRequirement::Required).unwrap_err();
        assert_eq!(
            errors.get(Field::Coordinates),
            Some(&FieldError::RequiredField(Field::Coordinates))
        );

        let d = draft("Need food", "5", "555", "95.0, 3.0");
        let errors = validate(&d, LocationRequirement::Required).unwrap_err();
        assert!(matches!(
            errors.get(Field::Coordinates),
            Some(FieldError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn map_click_draft_is_labelled_with_four_decimals() {
        let d = ReportDraft::for_entry(EntryPoint::MapClick(Coordinates::new(6.52441, 3.37921).unwrap()));
        assert_eq!(d.location, "6.5244, 3.3792");
        assert_eq!((d.latitude.as_str(), d.longitude.as_str()), ("6.524410", "3.379210"));
        assert_eq!(d.severity, Severity::Medium);
        assert_eq!(d.urgency, Urgency::Normal);
        assert_eq!(d.category, Category::Food);
    }

    #[test]
    fn recent_reports_are_newest_first_and_bounded() {
        let mut sink = RecentReports::new(2);
        for description in ["first", "second", "third"] {
            let d = draft(description, "1", "555", "6.5,3.4");
            let record = validate(&d, LocationRequirement::Optional).unwrap();
            sink.submit(&record);
        }
        let recent: Vec<String> = sink.recent().into_iter().map(|r| r.description).collect();
        assert_eq!(recent, ["third", "second"]);
        assert_eq!(sink.len(), 2);
    }
}
