use crate::config::AppConfig;
use crate::store::HotspotStore;
use crate::types::{Coordinates, HotspotPoint, PointKind, Severity};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

pub fn seed_store(config: &AppConfig) -> Result<HotspotStore> {
    let points = match &config.seed.csv {
        Some(path) => load_seed_csv(path)?,
        None => sample_hotspots(),
    };
    let store = HotspotStore::with_points(points).context("Seed data has duplicate ids")?;
    info!(points = store.len(), "hotspot store seeded");
    Ok(store)
}

fn sample(
    id: &str,
    (lat, lng): (f64, f64),
    severity: Severity,
    kind: PointKind,
    name: &str,
    report_count: u32,
) -> HotspotPoint {
    HotspotPoint {
        id: id.to_string(),
        lat,
        lng,
        severity,
        kind,
        name: name.to_string(),
        report_count,
        details: None,
    }
}

/// Built-in sample set around Lagos, Nigeria.
pub fn sample_hotspots() -> Vec<HotspotPoint> {
    vec![
        sample("seed-1", (6.5244, 3.3792), Severity::High, PointKind::Hotspot, "Lagos Island", 15),
        sample("seed-2", (6.4474, 3.3903), Severity::Medium, PointKind::Ngo, "Lagos Food Bank", 8),
        sample("seed-3", (6.6018, 3.3515), Severity::Low, PointKind::Volunteer, "Victoria Island Center", 3),
        sample("seed-4", (6.5244, 3.3792), Severity::High, PointKind::Hotspot, "Surulere District", 22),
        sample("seed-5", (6.4474, 3.3903), Severity::Medium, PointKind::Donor, "Lagos Restaurant Chain", 5),
    ]
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    id: String,
    name: String,
    lat: f64,
    lng: f64,
    severity: Severity,
    #[serde(rename = "type")]
    kind: PointKind,
    reports: Option<u32>,
}

/// Reads seed points from a CSV with header `id,name,lat,lng,severity,type,reports`.
pub fn load_seed_csv(path: &Path) -> Result<Vec<HotspotPoint>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open seed CSV: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut points = Vec::new();
    for (line, result) in rdr.deserialize::<SeedRow>().enumerate() {
        // header is line 1
        let row = result.with_context(|| format!("Bad seed row at line {}", line + 2))?;

        if row.id.is_empty() {
            return Err(anyhow!("Seed row at line {} has an empty id", line + 2));
        }
        let coordinates = Coordinates::new(row.lat, row.lng).ok_or_else(|| {
            anyhow!(
                "Seed point '{}' has invalid coordinates {}, {}",
                row.id,
                row.lat,
                row.lng
            )
        })?;

        points.push(HotspotPoint {
            id: row.id,
            lat: coordinates.lat,
            lng: coordinates.lng,
            severity: row.severity,
            kind: row.kind,
            name: row.name,
            report_count: row.reports.unwrap_or(0),
            details: None,
        });
    }

    info!(points = points.len(), path = ?path, "loaded seed CSV");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_seed_is_the_sample_set() {
        let store = seed_store(&AppConfig::default()).unwrap();
        assert_eq!(store.len(), 5);
        let counts = store.count_by_kind();
        assert_eq!((counts.hotspots, counts.ngos, counts.volunteers, counts.donors), (2, 1, 1, 1));
    }

    #[test]
    fn csv_rows_become_points() {
        let file = write_csv(
            "id,name,lat,lng,severity,type,reports\n\
             abuja-1, Wuse Market ,9.0765,7.3986,high,hotspot,4\n\
             abuja-2,Food Bank,9.05,7.49,low,ngo,\n",
        );

        let points = load_seed_csv(file.path()).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].name, "Wuse Market");
        assert_eq!(points[0].report_count, 4);
        assert_eq!(points[1].kind, PointKind::Ngo);
        assert_eq!(points[1].report_count, 0);
    }

    #[test]
    fn csv_rejects_bad_coordinates_and_unknown_types() {
        let file = write_csv("id,name,lat,lng,severity,type,reports\nx,X,91,0,low,ngo,1\n");
        let err = load_seed_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid coordinates"));

        let file = write_csv("id,name,lat,lng,severity,type,reports\nx,X,1,0,low,shop,1\n");
        assert!(load_seed_csv(file.path()).is_err());
    }

    #[test]
    fn duplicate_seed_ids_fail_the_store() {
        let file = write_csv(
            "id,name,lat,lng,severity,type,reports\na,A,1,1,low,ngo,1\na,B,2,2,high,donor,1\n",
        );
        let mut config = AppConfig::default();
        config.seed.csv = Some(file.path().to_path_buf());
        assert!(seed_store(&config).is_err());
    }
}
