use crate::error::StoreError;
use crate::types::{HotspotPoint, PointKind};
use serde::Serialize;
use std::collections::HashMap;

/// Append-only, insertion-ordered collection of map points for one session.
#[derive(Debug, Clone, Default)]
pub struct HotspotStore {
    points: Vec<HotspotPoint>,
    // id -> position in `points`
    index: HashMap<String, usize>,
}

/// Per-type totals shown in the map overlay. Counts the whole store, not the
/// filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    pub hotspots: usize,
    pub ngos: usize,
    pub volunteers: usize,
    pub donors: usize,
}

impl HotspotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(points: impl IntoIterator<Item = HotspotPoint>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for point in points {
            store.append(point)?;
        }
        Ok(store)
    }

    pub fn append(&mut self, point: HotspotPoint) -> Result<(), StoreError> {
        if self.index.contains_key(&point.id) {
            return Err(StoreError::DuplicateId(point.id));
        }
        self.index.insert(point.id.clone(), self.points.len());
        self.points.push(point);
        Ok(())
    }

    pub fn all(&self) -> &[HotspotPoint] {
        &self.points
    }

    pub fn get(&self, id: &str) -> Option<&HotspotPoint> {
        self.index.get(id).map(|&i| &self.points[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn count_by_kind(&self) -> KindCounts {
        let mut counts = KindCounts::default();
        for point in &self.points {
            match point.kind {
                PointKind::Hotspot => counts.hotspots += 1,
                PointKind::Ngo => counts.ngos += 1,
                PointKind::Volunteer => counts.volunteers += 1,
                PointKind::Donor => counts.donors += 1,
            }
        }
        counts
    }
}
