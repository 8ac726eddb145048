use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Report form fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Location,
    Coordinates,
    Description,
    AffectedCount,
    ContactInfo,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::Coordinates => "coordinates",
            Field::Description => "description",
            Field::AffectedCount => "affectedCount",
            Field::ContactInfo => "contactInfo",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("{0} is required")]
    RequiredField(Field),

    #[error("{field} must be a whole number greater than zero, got {value:?}")]
    InvalidNumber { field: Field, value: String },

    #[error("coordinates {lat}, {lng} are outside the valid range")]
    InvalidCoordinates { lat: f64, lng: f64 },
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::RequiredField(field) => *field,
            FieldError::InvalidNumber { field, .. } => *field,
            FieldError::InvalidCoordinates { .. } => Field::Coordinates,
        }
    }
}

/// Every problem found in one draft, in field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field() == field)
    }

    /// Inline messages keyed by field name, as a form shows them.
    pub fn messages(&self) -> BTreeMap<&'static str, String> {
        self.0
            .iter()
            .map(|e| (e.field().as_str(), e.to_string()))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "report rejected: {}", joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("hotspot id {0:?} is already in the store")]
    DuplicateId(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location permission denied")]
    Denied,

    #[error("location request timed out")]
    Timeout,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}
