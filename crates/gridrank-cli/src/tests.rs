use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["gridrank-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_quick_with_negative_longitude() {
    let cli = Cli::try_parse_from([
        "gridrank-cli",
        "quick",
        "--business",
        "Corner Cafe",
        "--lat",
        "37.77",
        "--lng",
        "-122.42",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Quick {
            ref location,
            target_domain: None,
        }) if location.business == "Corner Cafe" && location.lng < 0.0
    ));
}

#[test]
fn advanced_defaults_match_quick_check_shape() {
    let cli = Cli::try_parse_from([
        "gridrank-cli",
        "advanced",
        "--business",
        "Corner Cafe",
        "--lat",
        "37.77",
        "--lng",
        "-122.42",
    ])
    .unwrap();

    let Some(Commands::Advanced { grid, poll, .. }) = cli.command else {
        panic!("expected advanced command");
    };
    assert_eq!(grid.grid_size, 3);
    assert!((grid.radius_km - 5.0).abs() < f64::EPSILON);
    assert_eq!(grid.device, Device::Desktop);
    assert_eq!(grid.zoom, 15);
    assert_eq!(poll.max_wait, 1800);
    assert_eq!(poll.poll_interval, 120);
}

#[test]
fn advanced_rejects_unknown_device() {
    let result = Cli::try_parse_from([
        "gridrank-cli",
        "advanced",
        "--business",
        "Corner Cafe",
        "--lat",
        "1",
        "--lng",
        "2",
        "--device",
        "watch",
    ]);
    assert!(result.is_err());
}

#[test]
fn results_collects_repeated_ids_and_coordinates() {
    let cli = Cli::try_parse_from([
        "gridrank-cli",
        "results",
        "--task-id",
        "t1",
        "--task-id",
        "t2",
        "--coordinate",
        "-33.86,151.20,15",
        "--coordinate",
        "-33.87,151.21,15",
        "--target-domain",
        "example.com",
    ])
    .unwrap();

    let Some(Commands::Results {
        task_ids,
        coordinates,
        target_domain,
        ..
    }) = cli.command
    else {
        panic!("expected results command");
    };
    assert_eq!(task_ids, ["t1", "t2"]);
    assert_eq!(coordinates[0], "-33.86,151.20,15");
    assert_eq!(target_domain.as_deref(), Some("example.com"));
}

#[test]
fn results_requires_a_task_id() {
    assert!(Cli::try_parse_from(["gridrank-cli", "results"]).is_err());
}

#[test]
fn target_domain_without_coordinates_is_rejected() {
    let result = Cli::try_parse_from([
        "gridrank-cli",
        "results",
        "--task-id",
        "t1",
        "--target-domain",
        "example.com",
    ]);
    assert!(result.is_err());
}

#[test]
fn status_accepts_no_ids() {
    let cli = Cli::try_parse_from(["gridrank-cli", "status"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Status { ref task_ids }) if task_ids.is_empty()
    ));
}

#[test]
fn global_credentials_flag_follows_subcommand() {
    let cli = Cli::try_parse_from([
        "gridrank-cli",
        "info",
        "--credentials-b64",
        "Z3JpZC11c2VyOmdyaWQtcGFzc3dvcmQ=",
    ])
    .unwrap();
    assert!(matches!(cli.command, Some(Commands::Info)));
    assert_eq!(
        cli.credentials_b64.as_deref(),
        Some("Z3JpZC11c2VyOmdyaWQtcGFzc3dvcmQ=")
    );
}

#[test]
fn grid_parses_southern_hemisphere_centre() {
    let cli = Cli::try_parse_from([
        "gridrank-cli",
        "grid",
        "--lat",
        "-33.86",
        "--lng",
        "151.2",
        "--grid-size",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Grid { grid_size: 5, lat, .. }) if lat < 0.0
    ));
}
