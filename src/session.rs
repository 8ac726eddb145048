use crate::config::AppConfig;
use crate::error::{GeolocationError, SubmitError};
use crate::filter::{FilterState, KindSelector, SeveritySelector};
use crate::geolocation::LocationFix;
use crate::intake::{validate_from, EntryPoint, LocationRequirement, ReportDraft, ReportSink};
use crate::render::MapView;
use crate::store::{HotspotStore, KindCounts};
use crate::sync::{MarkerLayer, RenderingSurface, SyncSummary};
use crate::types::{Coordinates, HotspotPoint, ReportRecord};
use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Where the "find my location" flow stands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocationState {
    Idle,
    Requesting { generation: u64 },
    Granted { position: Coordinates },
    Denied,
    TimedOut,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub home: MapView,
    pub locate_zoom: u8,
    pub manual_location: LocationRequirement,
    pub map_click_location: LocationRequirement,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let home = MapView {
            center: config.map.center()?,
            zoom: config.map.zoom,
        };
        Ok(Self {
            home,
            locate_zoom: config.map.locate_zoom,
            manual_location: config.intake.requirement(&EntryPoint::Manual),
            map_click_location: config.intake.requirement(&EntryPoint::MapClick(home.center)),
        })
    }

    pub fn requirement(&self, entry: &EntryPoint) -> LocationRequirement {
        match entry {
            EntryPoint::Manual => self.manual_location,
            EntryPoint::MapClick(_) => self.map_click_location,
        }
    }
}

/// One user's map: the store, the filter dropdowns, the drawn markers and
/// the location banner. Every event runs to completion before the next.
pub struct MapSession<S: RenderingSurface> {
    store: HotspotStore,
    filters: FilterState,
    layer: MarkerLayer<S>,
    view: MapView,
    location: LocationState,
    settings: SessionSettings,
    sink: Box<dyn ReportSink>,
    closed: bool,
}

impl<S: RenderingSurface> MapSession<S> {
    pub fn new(
        store: HotspotStore,
        surface: S,
        settings: SessionSettings,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        let mut session = Self {
            store,
            filters: FilterState::default(),
            layer: MarkerLayer::new(surface),
            view: settings.home,
            location: LocationState::Idle,
            settings,
            sink,
            closed: false,
        };
        session.layer.recenter(session.view.center, session.view.zoom);
        let summary = session.refresh();
        info!(markers = summary.added, "map session started");
        session
    }

    pub fn store(&self) -> &HotspotStore {
        &self.store
    }

    pub fn filters(&self) -> FilterState {
        self.filters
    }

    pub fn layer(&self) -> &MarkerLayer<S> {
        &self.layer
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn location(&self) -> LocationState {
        self.location
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn visible(&self) -> Vec<&HotspotPoint> {
        self.filters.visible(self.store.all())
    }

    pub fn stats(&self) -> KindCounts {
        self.store.count_by_kind()
    }

    pub fn recent_reports(&self) -> Vec<ReportRecord> {
        self.sink.recent()
    }

    fn refresh(&mut self) -> SyncSummary {
        let visible = self.filters.visible(self.store.all());
        self.layer.sync(&visible)
    }

    /// Redraws every marker from the store, discarding the handle map.
    pub fn redraw(&mut self) -> SyncSummary {
        let visible = self.filters.visible(self.store.all());
        self.layer.rebuild(&visible)
    }

    pub fn set_filters(&mut self, filters: FilterState) -> SyncSummary {
        self.filters = filters;
        let summary = self.refresh();
        debug!(
            severity = %filters.severity,
            kind = %filters.kind,
            added = summary.added,
            removed = summary.removed,
            "filters changed"
        );
        summary
    }

    pub fn set_severity_filter(&mut self, severity: SeveritySelector) -> SyncSummary {
        self.set_filters(FilterState {
            severity,
            ..self.filters
        })
    }

    pub fn set_type_filter(&mut self, kind: KindSelector) -> SyncSummary {
        self.set_filters(FilterState {
            kind,
            ..self.filters
        })
    }

    /// Empty form for `entry`, prefilled with the click position if any.
    pub fn report_draft(&self, entry: EntryPoint) -> ReportDraft {
        ReportDraft::for_entry(entry)
    }

    /// Validates and records a report. The new point is drawn straight away
    /// when the current filters admit it.
    pub fn submit_report(
        &mut self,
        draft: &ReportDraft,
        entry: EntryPoint,
    ) -> Result<ReportRecord, SubmitError> {
        let record = validate_from(draft, self.settings.requirement(&entry), entry)?;

        if let Err(e) = self.store.append(record.to_point()) {
            error!(error = %e, "generated report id collided with an existing point");
            return Err(e.into());
        }
        self.sink.submit(&record);
        let summary = self.refresh();
        debug!(id = %record.id, drawn = summary.added > 0, "report added to map");

        Ok(record)
    }

    /// Marks a location request as the one whose answer we want.
    pub fn begin_locate(&mut self, generation: u64) {
        if self.closed {
            return;
        }
        self.location = LocationState::Requesting { generation };
    }

    /// Applies an answer from the locator. Answers for superseded requests, or
    /// arriving after [`teardown`](Self::teardown), are dropped. Returns whether
    /// the answer was applied.
    pub fn finish_locate(&mut self, fix: LocationFix) -> bool {
        let wanted = match self.location {
            LocationState::Requesting { generation } if !self.closed => generation,
            _ => {
                debug!(generation = fix.generation, "ignoring location answer, nothing pending");
                return false;
            }
        };
        if fix.generation != wanted {
            debug!(generation = fix.generation, wanted, "ignoring superseded location answer");
            return false;
        }

        match fix.result {
            Ok(position) => {
                self.location = LocationState::Granted { position };
                self.layer.show_user_location(position);
                self.move_view(position, self.settings.locate_zoom);
                info!(lat = position.lat, lng = position.lng, "map centred on user location");
            }
            Err(e) => {
                self.location = match e {
                    GeolocationError::Denied => LocationState::Denied,
                    GeolocationError::Timeout => LocationState::TimedOut,
                    GeolocationError::Unavailable(_) => LocationState::Unavailable,
                };
                warn!(error = %e, "unable to centre map on user location");
            }
        }
        true
    }

    /// Back to the last granted position, if there is one.
    pub fn recenter_on_user(&mut self) -> bool {
        match self.location {
            LocationState::Granted { position } => {
                self.move_view(position, self.settings.locate_zoom);
                true
            }
            _ => false,
        }
    }

    fn move_view(&mut self, center: Coordinates, zoom: u8) {
        self.view = MapView { center, zoom };
        self.layer.recenter(center, zoom);
    }

    /// The user left the map. Pending location answers become no-ops.
    pub fn teardown(&mut self) {
        self.closed = true;
        if matches!(self.location, LocationState::Requesting { .. }) {
            self.location = LocationState::Idle;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
