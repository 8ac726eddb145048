use crate::sync::RenderingSurface;
use crate::types::{Coordinates, HotspotPoint, PointKind, Severity};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;
use std::collections::BTreeMap;

// Marker box in pixels, anchored at its centre.
const ICON_SIZE: [u32; 2] = [30, 30];
const ICON_ANCHOR: [u32; 2] = [15, 15];

/// How a marker is drawn: glyph by type, colour by severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerIcon {
    pub glyph: &'static str,
    pub class_name: String,
    pub color: &'static str,
    pub size: [u32; 2],
    pub anchor: [u32; 2],
}

pub fn glyph_for(kind: PointKind) -> &'static str {
    match kind {
        PointKind::Hotspot => "🔥",
        PointKind::Ngo => "🏢",
        PointKind::Volunteer => "👥",
        PointKind::Donor => "🍽️",
    }
}

pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "#fdd835",
        Severity::Medium => "#fb8c00",
        Severity::High => "#e53935",
    }
}

pub fn icon_for(point: &HotspotPoint) -> MarkerIcon {
    MarkerIcon {
        glyph: glyph_for(point.kind),
        class_name: format!("custom-marker {} {}", point.severity, point.kind),
        color: severity_color(point.severity),
        size: ICON_SIZE,
        anchor: ICON_ANCHOR,
    }
}

/// Current map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

/// Rendering surface that keeps the live markers as GeoJSON features, for
/// clients that draw the layer themselves.
#[derive(Debug, Default)]
pub struct GeoJsonSurface {
    next_handle: u64,
    features: BTreeMap<u64, Feature>,
    view: Option<MapView>,
}

impl GeoJsonSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<MapView> {
        self.view
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in the order they were added.
    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.values().cloned().collect(),
            foreign_members: None,
        }
    }

    fn insert(&mut self, feature: Feature) -> u64 {
        self.next_handle += 1;
        self.features.insert(self.next_handle, feature);
        self.next_handle
    }
}

fn point_geometry(at: Coordinates) -> Geometry {
    Geometry::new(Value::from(&at.to_point()))
}

/// GeoJSON properties for a marker: the popup content plus icon styling.
fn icon_properties(icon: &MarkerIcon) -> JsonValue {
    serde_json::json!({
        "glyph": icon.glyph,
        "className": icon.class_name,
        "color": icon.color,
        "size": icon.size,
        "anchor": icon.anchor,
    })
}

pub fn marker_properties(point: &HotspotPoint, icon: &MarkerIcon) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("name".into(), JsonValue::from(point.name.clone()));
    props.insert("type".into(), JsonValue::from(point.kind.as_str()));
    props.insert("severity".into(), JsonValue::from(point.severity.as_str()));
    props.insert("reports".into(), JsonValue::from(point.report_count));
    props.insert("icon".into(), icon_properties(icon));
    if let Some(details) = &point.details {
        props.insert("description".into(), JsonValue::from(details.description.clone()));
        props.insert("affectedCount".into(), JsonValue::from(details.affected_count));
        props.insert("contactInfo".into(), JsonValue::from(details.contact_info.clone()));
        props.insert(
            "reported".into(),
            JsonValue::from(details.timestamp_created.to_rfc3339()),
        );
    }
    props
}

impl RenderingSurface for GeoJsonSurface {
    type Handle = u64;

    fn add_marker(&mut self, point: &HotspotPoint, icon: &MarkerIcon) -> u64 {
        let feature = Feature {
            bbox: None,
            geometry: Some(point_geometry(point.coordinates())),
            id: Some(Id::String(point.id.clone())),
            properties: Some(marker_properties(point, icon)),
            foreign_members: None,
        };
        self.insert(feature)
    }

    fn remove_marker(&mut self, handle: u64) {
        self.features.remove(&handle);
    }

    fn recenter(&mut self, center: Coordinates, zoom: u8) {
        self.view = Some(MapView { center, zoom });
    }

    fn add_location_marker(&mut self, at: Coordinates) -> u64 {
        let mut props = JsonObject::new();
        props.insert("name".into(), JsonValue::from("Your Location"));
        props.insert("type".into(), JsonValue::from("user-location"));
        let feature = Feature {
            bbox: None,
            geometry: Some(point_geometry(at)),
            id: Some(Id::String("user-location".into())),
            properties: Some(props),
            foreign_members: None,
        };
        self.insert(feature)
    }
}
