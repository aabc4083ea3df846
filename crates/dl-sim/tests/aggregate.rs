use approx::assert_relative_eq;
use chrono::NaiveDate;
use dl_model::IlluminanceMapDef;
use dl_radiance::{PointLayout, SkyConditions, SpacePoints};
use dl_results::ill::read_ill;
use dl_results::{ReportingFrequency, ResultsStore, StoreManifest};
use dl_sim::aggregate::*;
use dl_sim::{Aggregator, MergedHour, SimHour, SpaceInfo};

fn hour(index: usize, hour_ending: u32) -> SimHour {
    SimHour {
        index,
        timestamp: NaiveDate::from_ymd_opt(2009, 6, 21)
            .unwrap()
            .and_hms_opt(hour_ending, 0, 0)
            .unwrap(),
        hour_of_year: 171 * 24 + hour_ending as usize - 1,
        conditions: SkyConditions {
            month: 6,
            day: 21,
            hour: hour_ending,
            solar_altitude_deg: 50.0,
            solar_azimuth_deg: 180.0,
            direct_normal_lux: 60000.0,
            diffuse_horizontal_lux: 15000.0,
            beam_efficacy: 100.0,
            diffuse_efficacy: 120.0,
        },
    }
}

fn spaces() -> Vec<SpaceInfo> {
    vec![
        SpaceInfo {
            name: "Open_Office".to_string(),
            map: IlluminanceMapDef {
                origin: [0.0, 0.0, 0.8],
                x_length_m: 4.0,
                y_length_m: 2.0,
                x_points: 2,
                y_points: 1,
            },
            has_sensor: true,
            glare_views: 2,
            window_groups: vec!["WG1".to_string()],
        },
        SpaceInfo {
            name: "Lobby".to_string(),
            map: IlluminanceMapDef {
                origin: [10.0, 0.0, 0.8],
                x_length_m: 2.0,
                y_length_m: 2.0,
                x_points: 1,
                y_points: 1,
            },
            has_sensor: false,
            glare_views: 0,
            window_groups: vec![],
        },
    ]
}

fn layout() -> PointLayout {
    PointLayout {
        spaces: vec![
            SpacePoints {
                name: "Open_Office".to_string(),
                grid: 2,
                sensor: 1,
                glare: 2,
            },
            SpacePoints {
                name: "Lobby".to_string(),
                grid: 1,
                sensor: 0,
                glare: 0,
            },
        ],
    }
}

#[test]
fn splits_clamps_and_persists() {
    let dir = std::env::temp_dir().join("dl_sim_aggregate");
    let _ = std::fs::remove_dir_all(&dir);

    let spaces = spaces();
    let layout = layout();
    let mut agg = Aggregator::new(&spaces, &layout, vec!["WG1".to_string()]);
    agg.push_hour(
        &hour(0, 12),
        MergedHour {
            // grid, grid, sensor, glare, glare | lobby grid
            values: vec![200.0, -4.0, 450.0, 0.0, 10000.0, 80.0],
            shade_states: vec![1],
            zero_filled: false,
        },
    )
    .unwrap();
    agg.push_hour(&hour(1, 13), MergedHour::zeros(6, 1)).unwrap();
    assert_eq!(agg.clamped(), 1);

    let mut store = ResultsStore::create(
        dir.join("output/radout"),
        StoreManifest {
            run_id: "r".to_string(),
            model_name: "Office".to_string(),
            timestamp: String::new(),
            method: "three-phase".to_string(),
            description: None,
        },
    );
    let summary = agg.write(&dir, &mut store).unwrap();
    assert_eq!(summary.hours, 2);
    assert_eq!(summary.clamped_values, 1);
    // Open_Office has .ill and .glr, Lobby only .ill.
    assert_eq!(summary.files.len(), 3);

    let hourly = ReportingFrequency::Hourly;
    let mean_map = store
        .time_series("Open_Office", MEAN_MAP_ILLUMINANCE, hourly)
        .unwrap();
    assert_eq!(mean_map.values(), &[100.0, 0.0]);
    let sensor = store.time_series("Open_Office", SENSOR_ILLUMINANCE, hourly).unwrap();
    assert_eq!(sensor.values(), &[450.0, 0.0]);
    assert!(store.time_series("Lobby", SENSOR_ILLUMINANCE, hourly).is_none());

    let max_dgp = store.time_series("Open_Office", MAX_DGP, hourly).unwrap();
    assert_relative_eq!(max_dgp.values()[0], 0.0000622 * 10000.0 + 0.184, epsilon = 1e-12);
    let min_dgp = store.time_series("Open_Office", MIN_DGP, hourly).unwrap();
    assert_relative_eq!(min_dgp.values()[0], 0.184, epsilon = 1e-12);

    let shade = store
        .time_series("Open_Office:WG1", SHADE_STATE, hourly)
        .unwrap();
    assert_eq!(shade.values(), &[1.0, 0.0]);

    let map = store.illuminance_map("Open_Office DAYLIGHT MAP").unwrap();
    assert_eq!(map.x_coords, vec![0.0, 2.0]);
    assert_eq!(map.grids[0], vec![200.0, 0.0]);

    let ill = read_ill(&dir.join("output/ts/Open_Office/maps/Open_Office_map.ill")).unwrap();
    assert_eq!(ill.rows.len(), 2);
    assert_eq!(ill.rows[0].sensor, 450.0);
    assert_eq!(ill.rows[0].stamp.hour, 12);
    assert_eq!(ill.geometry.x_max, 4.0);
    assert!(dir.join("output/ts/Open_Office/maps/Open_Office_map.glr").exists());
    assert!(!dir.join("output/ts/Lobby/maps/Lobby_map.glr").exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn wrong_vector_length_is_rejected() {
    let spaces = spaces();
    let layout = layout();
    let mut agg = Aggregator::new(&spaces, &layout, vec![]);
    assert!(agg.push_hour(&hour(0, 12), MergedHour::zeros(5, 0)).is_err());
}

#[test]
fn zero_filled_hours_report_zero_glare() {
    let dir = std::env::temp_dir().join("dl_sim_aggregate_night");
    let _ = std::fs::remove_dir_all(&dir);

    let spaces = spaces();
    let layout = layout();
    let mut night = hour(0, 2);
    night.conditions.solar_altitude_deg = -5.0;
    let mut agg = Aggregator::new(&spaces, &layout, vec!["WG1".to_string()]);
    agg.push_hour(&night, MergedHour::zeros(6, 1)).unwrap();
    // A computed hour with dark views still gets the DGP intercept.
    agg.push_hour(
        &hour(1, 12),
        MergedHour {
            values: vec![0.0; 6],
            shade_states: vec![0],
            zero_filled: false,
        },
    )
    .unwrap();

    let mut store = ResultsStore::create(
        dir.join("output/radout"),
        StoreManifest {
            run_id: "r".to_string(),
            model_name: "Office".to_string(),
            timestamp: String::new(),
            method: "single-phase".to_string(),
            description: None,
        },
    );
    agg.write(&dir, &mut store).unwrap();

    let hourly = ReportingFrequency::Hourly;
    for name in [MIN_DGP, MEAN_DGP, MAX_DGP] {
        let dgp = store.time_series("Open_Office", name, hourly).unwrap();
        assert_eq!(dgp.values()[0], 0.0);
        assert_relative_eq!(dgp.values()[1], 0.184, epsilon = 1e-12);
    }
    let glr = std::fs::read_to_string(dir.join("output/ts/Open_Office/maps/Open_Office_map.glr"))
        .unwrap();
    let rows: Vec<&str> = glr.lines().skip(dl_results::ill::GLR_HEADER.len()).collect();
    assert_eq!(rows[0], "6,21,02:00:00,0,0");
    assert!(rows[1].contains("0.184"));
    std::fs::remove_dir_all(&dir).ok();
}
