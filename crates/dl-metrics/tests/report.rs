use chrono::{NaiveDate, NaiveDateTime};
use dl_core::TimeSeries;
use dl_metrics::*;
use dl_model::*;
use dl_results::{ReportingFrequency, ResultsStore, StoreManifest};

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2009, 6, 21)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn series(values: &[f64]) -> TimeSeries {
    let timestamps = (0..values.len()).map(|i| at(8 + i as u32)).collect();
    TimeSeries::new(timestamps, values.to_vec(), "").unwrap()
}

fn store(name: &str) -> ResultsStore {
    ResultsStore::create(
        std::env::temp_dir().join(name),
        StoreManifest {
            run_id: name.to_string(),
            model_name: "Office".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            method: "single-phase".to_string(),
            description: None,
        },
    )
}

fn model() -> BuildingModel {
    let map = IlluminanceMapDef {
        origin: [0.0, 0.0, 0.8],
        x_length_m: 2.0,
        y_length_m: 2.0,
        x_points: 1,
        y_points: 1,
    };
    let space = |name: &str, zone: Option<&str>, setpoint: Option<f64>| SpaceDef {
        name: name.to_string(),
        thermal_zone: zone.map(str::to_string),
        illuminance_map: Some(map.clone()),
        daylighting_control: setpoint.map(|sp| DaylightingControlDef {
            name: format!("{name} Control"),
            position: [1.0, 1.0, 0.8],
            setpoint_lux: sp,
        }),
        glare_sensor: None,
        window_groups: vec![],
        lights: vec![],
    };
    BuildingModel {
        version: LATEST_VERSION,
        name: "Office".to_string(),
        site: SiteDef {
            name: "Boulder".to_string(),
            latitude_deg: 40.0,
            longitude_deg: -105.0,
            time_zone_h: -7.0,
            elevation_m: 1600.0,
        },
        spaces: vec![
            space("East Office", Some("Zone 1"), Some(500.0)),
            space("West Office", Some("Zone 1"), None),
            space("Storage", None, None),
        ],
        thermal_zones: vec![ThermalZoneDef {
            name: "Zone 1".to_string(),
            primary_daylighting_control: None,
            secondary_daylighting_control: None,
        }],
        window_groups: vec![],
        schedules: vec![],
    }
}

fn hourly(store: &mut ResultsStore, key: &str, name: &str, values: &[f64]) {
    store
        .insert_time_series(key, name, ReportingFrequency::Hourly, series(values))
        .unwrap();
}

#[test]
fn report_from_stores() {
    let mut results = store("dl_metrics_results");
    hourly(&mut results, "East_Office", "Daylight Sensor Illuminance", &[600.0, 250.0, 50.0, 900.0]);
    hourly(&mut results, "East_Office", "Mean Illuminance Map", &[1.0, 1.0, 1.0, 1.0]);
    hourly(&mut results, "West_Office", "Mean Illuminance Map", &[300.0, 150.0, 2500.0, 0.0]);
    hourly(&mut results, "Storage", "Mean Illuminance Map", &[10.0, 10.0, 10.0, 10.0]);

    let mut source = store("dl_metrics_source");
    hourly(&mut source, "Environment", "Site Exterior Horizontal Sky Illuminance", &[5000.0, 8000.0, 9000.0, 0.0]);
    hourly(&mut source, "ZONE 1", OCCUPANT_COUNT, &[3.0, 3.0, 0.0, 3.0]);

    let inputs = gather_inputs(&model(), &results, &source, &MetricsConfig::default()).unwrap();
    assert_eq!(inputs.spaces.len(), 2);
    assert_eq!(inputs.skipped.len(), 1);
    assert!(inputs.skipped[0].starts_with("Storage"));

    let east = &inputs.spaces[0];
    assert_eq!(east.setpoint_lux, 500.0);
    assert_eq!(east.illuminance.values()[0], 600.0);
    assert_eq!(inputs.spaces[1].setpoint_lux, 300.0);

    let report = compute_report(&inputs);
    // Daylit and occupied: hours 8 and 9 only.
    let east_da = report.spaces[0].get(Metric::Da, Mask::DaylitOccupied);
    assert_eq!((east_da.sum, east_da.count, east_da.average), (1.0, 2, 0.5));
    let west_da = report.spaces[1].get(Metric::Da, Mask::DaylitOccupied);
    assert_eq!(west_da.average, 0.5);
    assert!((report.building_da - 0.5).abs() < 1e-12);

    let path = std::env::temp_dir().join("dl_metrics_report").join("metrics.csv");
    write_csv(&path, &report).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2 * 9 + 1);
    assert_eq!(&rows[0][0], "East_Office");
    assert_eq!(&rows[0][1], "da_daylit");
    let last = rows.last().unwrap();
    assert_eq!(&last[0], "building");
    assert_eq!(&last[1], "da_daylit_occupied_average");
    assert_eq!(last[4].parse::<f64>().unwrap(), 0.5);
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn missing_occupancy_is_fatal() {
    let mut results = store("dl_metrics_results_missing");
    hourly(&mut results, "East_Office", "Mean Illuminance Map", &[100.0]);
    let mut source = store("dl_metrics_source_missing");
    hourly(&mut source, "Environment", "Site Exterior Horizontal Sky Illuminance", &[100.0]);

    let err = gather_inputs(&model(), &results, &source, &MetricsConfig::default()).unwrap_err();
    assert!(matches!(err, MetricsError::MissingTimeSeries { ref name, .. } if name == OCCUPANT_COUNT));
}

#[test]
fn non_positive_default_setpoint_is_rejected() {
    let results = store("dl_metrics_results_cfg");
    let source = store("dl_metrics_source_cfg");
    let config = MetricsConfig {
        default_setpoint_lux: 0.0,
    };
    assert!(matches!(
        gather_inputs(&model(), &results, &source, &config),
        Err(MetricsError::Configuration { .. })
    ));
}
