use chrono::NaiveDate;
use dl_core::TimeSeries;
use dl_results::*;

fn manifest(run_id: &str) -> StoreManifest {
    StoreManifest {
        run_id: run_id.to_string(),
        model_name: "Office".to_string(),
        timestamp: "2026-02-25T12:00:00Z".to_string(),
        method: "single-phase".to_string(),
        description: None,
    }
}

#[test]
fn finish_and_open() {
    let temp_dir = std::env::temp_dir().join("dl_results_store_smoke");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let ts = |h| {
        NaiveDate::from_ymd_opt(2009, 6, 21)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    };
    let mut store = ResultsStore::create(temp_dir.clone(), manifest("run_1"));
    store
        .insert_time_series(
            "Open_Office",
            "Mean Illuminance Map",
            ReportingFrequency::Hourly,
            TimeSeries::new(vec![ts(9), ts(10)], vec![350.0, 420.0], "lux").unwrap(),
        )
        .unwrap();
    store.insert_illuminance_map(IlluminanceMapRecord {
        name: "Open_Office DAYLIGHT MAP".to_string(),
        space: "Open_Office".to_string(),
        z: 0.8,
        x_coords: vec![0.0, 2.0],
        y_coords: vec![0.0],
        timestamps: vec![ts(9)],
        grids: vec![vec![300.0, 400.0]],
    });
    store.finish().unwrap();

    let loaded = ResultsStore::open(&temp_dir).unwrap();
    assert_eq!(loaded.manifest().run_id, "run_1");
    let series = loaded
        .time_series("open_office", "Mean Illuminance Map", ReportingFrequency::Hourly)
        .unwrap();
    assert_eq!(series.values(), &[350.0, 420.0]);
    assert_eq!(series.units(), "lux");
    let map = loaded.illuminance_map("Open_Office DAYLIGHT MAP").unwrap();
    assert_eq!(map.grid_at(ts(9)), Some(&[300.0, 400.0][..]));
    assert_eq!(map.grid_at(ts(10)), None);
    std::fs::remove_dir_all(&temp_dir).ok();
}

#[test]
fn finish_replaces_prior_store() {
    let temp_dir = std::env::temp_dir().join("dl_results_store_replace");
    let _ = std::fs::remove_dir_all(&temp_dir);
    ResultsStore::create(temp_dir.clone(), manifest("run_1"))
        .finish()
        .unwrap();
    std::fs::write(temp_dir.join("stale.txt"), "old").unwrap();

    ResultsStore::create(temp_dir.clone(), manifest("run_2"))
        .finish()
        .unwrap();
    assert!(!temp_dir.join("stale.txt").exists());
    let loaded = ResultsStore::open(&temp_dir).unwrap();
    assert_eq!(loaded.manifest().run_id, "run_2");
    assert!(loaded.variables().is_empty());
    std::fs::remove_dir_all(&temp_dir).ok();
}

#[test]
fn finish_refuses_foreign_directory() {
    let temp_dir = std::env::temp_dir().join("dl_results_store_foreign");
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(temp_dir.join("dc")).unwrap();
    std::fs::write(temp_dir.join("Office_map.ill"), "keep").unwrap();

    let err = ResultsStore::create(temp_dir.clone(), manifest("run_3"))
        .finish()
        .unwrap_err();
    assert!(matches!(err, ResultsError::NotAStore { ref path } if *path == temp_dir));
    assert!(temp_dir.join("Office_map.ill").exists());
    assert!(temp_dir.join("dc").is_dir());
    assert!(!ResultsStore::exists(&temp_dir));

    // An empty directory is fine.
    let empty = temp_dir.join("dc");
    ResultsStore::create(empty.clone(), manifest("run_4"))
        .finish()
        .unwrap();
    assert!(ResultsStore::exists(&empty));
    std::fs::remove_dir_all(&temp_dir).ok();
}

#[test]
fn import_csv_columns() {
    let temp_dir = std::env::temp_dir().join("dl_results_import");
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();
    let csv_path = temp_dir.join("source.csv");
    std::fs::write(
        &csv_path,
        "month,day,hour,Environment:Site Solar Altitude Angle [deg](Hourly),ZONE 1:Zone People Occupant Count [](Hourly)\n\
         1,1,1,-40.5,0\n\
         1,1,2,-35.0,\n\
         1,1,3,-28.25,3\n",
    )
    .unwrap();

    let mut store = ResultsStore::create(temp_dir.join("source"), manifest("source"));
    assert_eq!(import::import_csv(&csv_path, import::SERIES_YEAR, &mut store).unwrap(), 2);

    let altitude = store
        .time_series("Environment", "Site Solar Altitude Angle", ReportingFrequency::Hourly)
        .unwrap();
    assert_eq!(altitude.len(), 3);
    assert_eq!(altitude.units(), "deg");
    let occupancy = store
        .time_series("Zone 1", "Zone People Occupant Count", ReportingFrequency::Hourly)
        .unwrap();
    assert_eq!(occupancy.values(), &[0.0, 3.0]);
    std::fs::remove_dir_all(&temp_dir).ok();
}

#[test]
fn import_rejects_bad_number() {
    let temp_dir = std::env::temp_dir().join("dl_results_import_bad");
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();
    let csv_path = temp_dir.join("bad.csv");
    std::fs::write(
        &csv_path,
        "month,day,hour,Environment:Site Solar Altitude Angle [deg]\n1,1,1,abc\n",
    )
    .unwrap();
    let mut store = ResultsStore::create(temp_dir.join("source"), manifest("bad"));
    let err = import::import_csv(&csv_path, 2009, &mut store).unwrap_err();
    assert!(matches!(err, ResultsError::Import { line: 2, .. }));
    std::fs::remove_dir_all(&temp_dir).ok();
}
