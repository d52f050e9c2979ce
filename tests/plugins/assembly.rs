use partbin::core::error::PartbinError;
use partbin::core::store::Store;
use partbin::plugins::assembly;
use partbin::plugins::inventory;
use partbin::plugins::records::{Component, NewComponent, ProjectStatus};
use std::path::Path;
use tempfile::tempdir;

fn open_store(dir: &Path) -> Store {
    Store::open(&dir.join("inventory.db"), "test", None).expect("open store")
}

struct Blinker {
    store: Store,
    project: i64,
    mcu: i64,
}

/// STM32F401 with `stock` units, required `required` times by project Blinker.
fn blinker(dir: &Path, stock: i64, required: i64) -> Blinker {
    let mut store = open_store(dir);
    let mcu = inventory::add_component(
        &mut store,
        &NewComponent::new("MCU", "STM32F401", "LQFP-64", stock, "BinA"),
    )
    .expect("add mcu");
    let project = inventory::create_project(&mut store, "Blinker", "").expect("project");
    inventory::add_component_to_project(&mut store, project, mcu, required).expect("link");
    Blinker {
        store,
        project,
        mcu,
    }
}

fn quantity(store: &Store, id: i64) -> i64 {
    inventory::get_component(store, id)
        .expect("get")
        .expect("present")
        .quantity
}

fn status(store: &Store, id: i64) -> ProjectStatus {
    inventory::get_project(store, id)
        .expect("get")
        .expect("present")
        .status
}

#[test]
fn scenario_b_buildability_follows_requirement() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 15, 12);

    let check = assembly::can_build(&store, project).expect("check");
    assert!(check.satisfied);
    assert!(check.shortfalls.is_empty());

    inventory::add_component_to_project(&mut store, project, mcu, 20).expect("relink");
    let check = assembly::can_build(&store, project).expect("check");
    assert!(!check.satisfied);
    let lines: Vec<String> = check.shortfalls.iter().map(|s| s.to_string()).collect();
    assert_eq!(lines, vec!["STM32F401 (needed: 20, available: 15)"]);
    assert_eq!(check.shortfalls[0].missing(), 5);
}

#[test]
fn scenario_c_build_deducts_and_completes() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 15, 12);

    assert!(assembly::build_project(&mut store, project).expect("build"));
    assert_eq!(quantity(&store, mcu), 3);
    assert_eq!(status(&store, project), ProjectStatus::Completed);
}

#[test]
fn failed_build_leaves_store_untouched() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu: _,
    } = blinker(tmp.path(), 15, 12);
    // A second, sufficient component must not be deducted either.
    let timer = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "NE555", "DIP-8", 10, "Bin 1"),
    )
    .expect("add timer");
    let led = inventory::add_component(
        &mut store,
        &NewComponent::new("LED", "Red 5mm", "THT", 1, "Bin 2"),
    )
    .expect("add led");
    inventory::add_component_to_project(&mut store, project, timer, 2).expect("link");
    inventory::add_component_to_project(&mut store, project, led, 4).expect("link");

    let before: Vec<Component> = inventory::list_components(&store).expect("list");

    match assembly::build_project(&mut store, project) {
        Err(PartbinError::InsufficientStock {
            project_id,
            shortfalls,
        }) => {
            assert_eq!(project_id, project);
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].component_id, led);
            assert_eq!(shortfalls[0].to_string(), "Red 5mm (needed: 4, available: 1)");
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    assert_eq!(inventory::list_components(&store).expect("list"), before);
    assert_eq!(status(&store, project), ProjectStatus::Active);
}

#[test]
fn deduction_failure_rolls_back_earlier_deductions() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 15, 12);
    let timer = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "NE555", "DIP-8", 10, "Bin 1"),
    )
    .expect("add timer");
    inventory::add_component_to_project(&mut store, project, timer, 2).expect("link");
    assert!(assembly::can_build(&store, project).expect("check").satisfied);

    // Stock passes the check, but the timer's deduction touches no row.
    store
        .conn()
        .execute_batch(&format!(
            "CREATE TRIGGER hold_timer BEFORE UPDATE OF quantity ON components
             WHEN OLD.id = {timer}
             BEGIN SELECT RAISE(IGNORE); END;"
        ))
        .expect("trigger");

    match assembly::build_project(&mut store, project) {
        Err(PartbinError::InsufficientStock {
            project_id,
            shortfalls,
        }) => {
            assert_eq!(project_id, project);
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].component_id, timer);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    assert_eq!(quantity(&store, mcu), 15);
    assert_eq!(quantity(&store, timer), 10);
    assert_eq!(status(&store, project), ProjectStatus::Active);
}

#[test]
fn archived_project_is_not_built() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 10, 4);
    inventory::archive_project(&mut store, project).expect("archive");

    let err = assembly::build_project(&mut store, project).unwrap_err();
    assert!(matches!(err, PartbinError::ValidationError(_)), "{err:?}");

    assert_eq!(quantity(&store, mcu), 10);
    assert_eq!(status(&store, project), ProjectStatus::Archived);
}

#[test]
fn repeated_builds_never_drive_stock_negative() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 30, 12);

    let mut builds = 0;
    loop {
        match assembly::build_project(&mut store, project) {
            Ok(true) => builds += 1,
            Err(PartbinError::InsufficientStock { .. }) => break,
            other => panic!("unexpected build outcome {:?}", other),
        }
        assert!(quantity(&store, mcu) >= 0);
    }

    assert_eq!(builds, 2);
    assert_eq!(quantity(&store, mcu), 6);
}

#[test]
fn rebuilding_completed_project_deducts_again() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 24, 12);

    assert!(assembly::build_project(&mut store, project).expect("first build"));
    assert_eq!(status(&store, project), ProjectStatus::Completed);
    assert!(assembly::build_project(&mut store, project).expect("rebuild"));
    assert_eq!(quantity(&store, mcu), 0);
    assert_eq!(status(&store, project), ProjectStatus::Completed);
}

#[test]
fn unknown_and_empty_projects() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());

    assert!(!assembly::build_project(&mut store, 404).expect("unknown"));
    let check = assembly::can_build(&store, 404).expect("check unknown");
    assert!(check.satisfied);

    let empty = inventory::create_project(&mut store, "Empty", "").expect("project");
    assert!(assembly::can_build(&store, empty).expect("check").satisfied);
    assert!(assembly::build_project(&mut store, empty).expect("build"));
    assert_eq!(status(&store, empty), ProjectStatus::Completed);
}

#[test]
fn build_survives_reopen() {
    let tmp = tempdir().expect("tempdir");
    let Blinker {
        mut store,
        project,
        mcu,
    } = blinker(tmp.path(), 15, 12);
    assert!(assembly::build_project(&mut store, project).expect("build"));
    store.close().expect("close");

    let store = open_store(tmp.path());
    assert_eq!(quantity(&store, mcu), 3);
    assert_eq!(status(&store, project), ProjectStatus::Completed);
}
