use dl_model::*;
use std::path::Path;

fn fixture() -> BuildingModel {
    load_yaml(Path::new("tests/fixtures/office.yaml")).unwrap()
}

#[test]
fn rejects_newer_version() {
    let mut model = fixture();
    model.version = LATEST_VERSION + 1;
    assert!(matches!(
        validate_model(&model),
        Err(ValidationError::UnsupportedVersion { .. })
    ));
}

#[test]
fn rejects_names_that_collide_after_sanitizing() {
    let mut model = fixture();
    let mut twin = model.spaces[1].clone();
    twin.name = "Core_ Corridor".to_string();
    model.spaces.push(twin);
    assert!(matches!(
        validate_model(&model),
        Err(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn rejects_unknown_window_group() {
    let mut model = fixture();
    model.spaces[0].window_groups.push("WG9".to_string());
    let err = validate_model(&model).unwrap_err();
    assert!(err.to_string().contains("WG9"));
}

#[test]
fn rejects_unknown_zone_control() {
    let mut model = fixture();
    model.thermal_zones[0].secondary_daylighting_control = Some("nope".to_string());
    assert!(matches!(
        validate_model(&model),
        Err(ValidationError::MissingReference { .. })
    ));
}

#[test]
fn rejects_short_hourly_schedule() {
    let mut model = fixture();
    model.schedules.push(ScheduleDef {
        name: "Short".to_string(),
        kind: ScheduleKind::Hourly {
            values: vec![1.0; 24],
        },
    });
    assert!(matches!(
        validate_model(&model),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn rejects_empty_grid() {
    let mut model = fixture();
    if let Some(map) = model.spaces[0].illuminance_map.as_mut() {
        map.x_points = 0;
    }
    assert!(validate_model(&model).is_err());
}
