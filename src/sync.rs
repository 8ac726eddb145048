//! Marker reconciliation.
//!
//! [`reconcile`] is the pure diff between the markers currently on the map and
//! the points that should be visible. [`MarkerLayer`] is the only thing that
//! applies such a diff to a [`RenderingSurface`]; it keeps the id -> handle
//! map, which can always be rebuilt from the store and the filters.

use crate::render::{icon_for, MarkerIcon};
use crate::types::{Coordinates, HotspotPoint, PointId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Something that can draw markers, e.g. a Leaflet map or a GeoJSON layer.
pub trait RenderingSurface {
    type Handle;

    fn add_marker(&mut self, point: &HotspotPoint, icon: &MarkerIcon) -> Self::Handle;
    fn remove_marker(&mut self, handle: Self::Handle);
    fn recenter(&mut self, center: Coordinates, zoom: u8);
    /// The "you are here" marker. Not a hotspot.
    fn add_location_marker(&mut self, at: Coordinates) -> Self::Handle;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<'a> {
    pub to_add: Vec<&'a HotspotPoint>,
    pub to_remove: BTreeSet<PointId>,
}

impl Reconciliation<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

pub fn reconcile<'a, 'r>(
    rendered: impl IntoIterator<Item = &'r str>,
    visible: &[&'a HotspotPoint],
) -> Reconciliation<'a> {
    let rendered: HashSet<&str> = rendered.into_iter().collect();
    let visible_ids: HashSet<&str> = visible.iter().map(|p| p.id.as_str()).collect();

    let mut queued = HashSet::new();
    let to_add = visible
        .iter()
        .copied()
        .filter(|p| !rendered.contains(p.id.as_str()) && queued.insert(p.id.as_str()))
        .collect();

    let to_remove = rendered
        .iter()
        .filter(|id| !visible_ids.contains(*id))
        .map(|id| id.to_string())
        .collect();

    Reconciliation { to_add, to_remove }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub removed: usize,
}

pub struct MarkerLayer<S: RenderingSurface> {
    surface: S,
    markers: HashMap<PointId, S::Handle>,
    user_marker: Option<S::Handle>,
}

impl<S: RenderingSurface> MarkerLayer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            markers: HashMap::new(),
            user_marker: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn rendered_ids(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    pub fn rendered_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_rendered(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    /// Bring the surface in line with `visible`, touching only what changed.
    pub fn sync(&mut self, visible: &[&HotspotPoint]) -> SyncSummary {
        let diff = reconcile(self.markers.keys().map(String::as_str), visible);
        if diff.is_empty() {
            return SyncSummary::default();
        }

        let summary = SyncSummary {
            added: diff.to_add.len(),
            removed: diff.to_remove.len(),
        };

        for id in diff.to_remove {
            if let Some(handle) = self.markers.remove(&id) {
                self.surface.remove_marker(handle);
            }
        }
        for point in diff.to_add {
            let handle = self.surface.add_marker(point, &icon_for(point));
            self.markers.insert(point.id.clone(), handle);
        }

        debug!(added = summary.added, removed = summary.removed, "markers reconciled");
        summary
    }

    /// Drop every hotspot marker and draw `visible` from scratch.
    pub fn rebuild(&mut self, visible: &[&HotspotPoint]) -> SyncSummary {
        let removed = self.markers.len();
        for (_, handle) in self.markers.drain() {
            self.surface.remove_marker(handle);
        }
        let added = self.sync(visible).added;
        SyncSummary { added, removed }
    }

    pub fn show_user_location(&mut self, at: Coordinates) {
        if let Some(previous) = self.user_marker.take() {
            self.surface.remove_marker(previous);
        }
        self.user_marker = Some(self.surface.add_location_marker(at));
    }

    pub fn has_user_marker(&self) -> bool {
        self.user_marker.is_some()
    }

    pub fn recenter(&mut self, center: Coordinates, zoom: u8) {
        self.surface.recenter(center, zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PointKind, Severity};
    use proptest::prelude::*;

    fn point(id: &str) -> HotspotPoint {
        HotspotPoint {
            id: id.to_string(),
            lat: 6.5,
            lng: 3.4,
            severity: Severity::High,
            kind: PointKind::Hotspot,
            name: id.to_string(),
            report_count: 1,
            details: None,
        }
    }

    /// Records every call so tests can count surface traffic.
    #[derive(Default)]
    struct CallLog {
        next: u32,
        added: Vec<String>,
        removed: Vec<u32>,
        centers: Vec<(Coordinates, u8)>,
    }

    impl RenderingSurface for CallLog {
        type Handle = u32;

        fn add_marker(&mut self, point: &HotspotPoint, _icon: &MarkerIcon) -> u32 {
            self.next += 1;
            self.added.push(point.id.clone());
            self.next
        }

        fn remove_marker(&mut self, handle: u32) {
            self.removed.push(handle);
        }

        fn recenter(&mut self, center: Coordinates, zoom: u8) {
            self.centers.push((center, zoom));
        }

        fn add_location_marker(&mut self, _at: Coordinates) -> u32 {
            self.next += 1;
            self.next
        }
    }

    #[test]
    fn diff_adds_new_and_removes_stale() {
        let (p2, p3, p4) = (point("2"), point("3"), point("4"));
        let visible = [&p2, &p3, &p4];

        let diff = reconcile(["1", "2", "3"], &visible);

        let added: Vec<&str> = diff.to_add.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(added, ["4"]);
        assert_eq!(diff.to_remove, BTreeSet::from(["1".to_string()]));
    }

    #[test]
    fn empty_visible_removes_everything() {
        let diff = reconcile(["a", "b"], &[]);
        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_remove.len(), 2);
    }

    #[test]
    fn layer_leaves_unchanged_markers_alone() {
        let (a, b, c) = (point("a"), point("b"), point("c"));
        let mut layer = MarkerLayer::new(CallLog::default());

        assert_eq!(layer.sync(&[&a, &b]), SyncSummary { added: 2, removed: 0 });
        assert_eq!(layer.sync(&[&b, &c]), SyncSummary { added: 1, removed: 1 });

        let log = layer.surface();
        assert_eq!(log.added, ["a", "b", "c"]);
        // handle 1 belonged to "a"
        assert_eq!(log.removed, [1]);
        assert!(layer.is_rendered("b") && layer.is_rendered("c"));
    }

    #[test]
    fn rebuild_redraws_from_scratch() {
        let (a, b) = (point("a"), point("b"));
        let mut layer = MarkerLayer::new(CallLog::default());
        layer.sync(&[&a, &b]);

        let summary = layer.rebuild(&[&a]);

        assert_eq!(summary, SyncSummary { added: 1, removed: 2 });
        assert_eq!(layer.rendered_count(), 1);
        assert_eq!(layer.surface().added, ["a", "b", "a"]);
    }

    #[test]
    fn user_marker_replaces_previous_and_ignores_hotspots() {
        let a = point("a");
        let mut layer = MarkerLayer::new(CallLog::default());
        layer.sync(&[&a]);

        let here = Coordinates::new(6.6, 3.3).unwrap();
        layer.show_user_location(here);
        layer.show_user_location(here);
        layer.recenter(here, 13);

        assert_eq!(layer.rendered_count(), 1);
        assert_eq!(layer.surface().removed, [2]);
        assert_eq!(layer.surface().centers, [(here, 13)]);
    }

    proptest! {
        #[test]
        fn applying_a_diff_makes_the_next_one_empty(
            rendered in prop::collection::btree_set(0u8..30, 0..20),
            shown in prop::collection::btree_set(0u8..30, 0..20),
        ) {
            let points: Vec<HotspotPoint> = shown.iter().map(|i| point(&i.to_string())).collect();
            let visible: Vec<&HotspotPoint> = points.iter().collect();
            let rendered: BTreeSet<String> = rendered.iter().map(u8::to_string).collect();

            let first = reconcile(rendered.iter().map(String::as_str), &visible);
            for p in &first.to_add {
                prop_assert!(!rendered.contains(&p.id));
            }
            for id in &first.to_remove {
                prop_assert!(!shown.iter().any(|i| i.to_string() == *id));
            }

            let mut applied = rendered.clone();
            for id in &first.to_remove {
                applied.remove(id);
            }
            for p in &first.to_add {
                applied.insert(p.id.clone());
            }

            let second = reconcile(applied.iter().map(String::as_str), &visible);
            prop_assert!(second.is_empty());
        }
    }
}
