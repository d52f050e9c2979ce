use partbin::core::broker;
use partbin::core::error::PartbinError;
use partbin::core::store::Store;
use partbin::plugins::inventory;
use partbin::plugins::records::{ComponentField, FieldUpdate, NewComponent, ProjectStatus, SearchFilter};
use rusqlite::params;
use std::path::Path;
use tempfile::tempdir;

fn open_store(dir: &Path) -> Store {
    Store::open(
        &dir.join("inventory.db"),
        "test",
        Some(&dir.join("inventory.events.jsonl")),
    )
    .expect("open store")
}

fn stm32(quantity: i64) -> NewComponent {
    NewComponent::new("MCU", "STM32F401", "LQFP-64", quantity, "BinA")
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("count rows")
}

fn link_rows(store: &Store) -> Vec<(i64, i64, i64)> {
    let mut stmt = store
        .conn()
        .prepare("SELECT project_id, component_id, quantity FROM project_components ORDER BY rowid")
        .expect("prepare");
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows")
}

#[test]
fn scenario_a_duplicate_add_merges_quantity() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());

    let first = inventory::add_component(&mut store, &stm32(10)).expect("first add");
    let second = inventory::add_component(&mut store, &stm32(5)).expect("second add");

    assert_eq!(first, second);
    assert_eq!(count(&store, "components"), 1);
    let c = inventory::get_component(&store, first)
        .expect("get")
        .expect("present");
    assert_eq!(c.quantity, 15);
    assert_eq!(c.location, "BinA");
}

#[test]
fn natural_key_includes_package() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());

    let lqfp = inventory::add_component(&mut store, &stm32(10)).expect("lqfp");
    let ufqfpn = inventory::add_component(
        &mut store,
        &NewComponent::new("MCU", "STM32F401", "UFQFPN-48", 4, "BinB"),
    )
    .expect("ufqfpn");

    assert_ne!(lqfp, ufqfpn);
    assert_eq!(inventory::list_components(&store).expect("list").len(), 2);
}

#[test]
fn add_validates_before_writing() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());

    let err = inventory::add_component(&mut store, &stm32(-1)).unwrap_err();
    assert!(matches!(err, PartbinError::ValidationError(_)), "{err}");

    let mut no_location = stm32(1);
    no_location.location = "  ".to_string();
    let err = inventory::add_component(&mut store, &no_location).unwrap_err();
    assert!(matches!(err, PartbinError::ValidationError(_)), "{err}");

    assert_eq!(count(&store, "components"), 0);
}

#[test]
fn missing_component_reads_as_none() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());
    assert!(inventory::get_component(&store, 42).expect("get").is_none());
    assert!(inventory::get_project(&store, 42).expect("get").is_none());
}

#[test]
fn update_field_changes_only_that_field() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let id = inventory::add_component(&mut store, &stm32(10)).expect("add");

    let update = FieldUpdate::parse(ComponentField::Location, "Drawer 3").expect("parse");
    let updated = inventory::update_component_field(&mut store, id, &update).expect("update");
    assert_eq!(updated.location, "Drawer 3");

    let stored = inventory::get_component(&store, id)
        .expect("get")
        .expect("present");
    assert_eq!(stored, updated);
    assert_eq!(stored.quantity, 10);
    assert_eq!(stored.name, "STM32F401");
}

#[test]
fn update_rejects_read_only_and_invalid_values() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let id = inventory::add_component(&mut store, &stm32(10)).expect("add");

    assert!(matches!(
        FieldUpdate::parse(ComponentField::Projects, "proj_1"),
        Err(PartbinError::ValidationError(_))
    ));
    assert!(matches!(
        "colour".parse::<ComponentField>(),
        Err(PartbinError::ValidationError(_))
    ));

    let negative = FieldUpdate::Quantity(-3);
    let err = inventory::update_component_field(&mut store, id, &negative).unwrap_err();
    assert!(matches!(err, PartbinError::ValidationError(_)), "{err}");

    let err = inventory::update_component_field(&mut store, 999, &FieldUpdate::Tags("x".into()))
        .unwrap_err();
    assert!(matches!(err, PartbinError::NotFound(_)), "{err}");

    let stored = inventory::get_component(&store, id)
        .expect("get")
        .expect("present");
    assert_eq!(stored.quantity, 10);
}

#[test]
fn update_onto_existing_natural_key_is_duplicate() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    inventory::add_component(&mut store, &stm32(10)).expect("add");
    let other = inventory::add_component(
        &mut store,
        &NewComponent::new("MCU", "STM32F401", "UFQFPN-48", 4, "BinB"),
    )
    .expect("add other");

    let update = FieldUpdate::Package("LQFP-64".to_string());
    let err = inventory::update_component_field(&mut store, other, &update).unwrap_err();
    assert!(matches!(err, PartbinError::DuplicateKey(_)), "{err}");
}

#[test]
fn search_matches_substrings_and_exact_numbers() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let ne555 = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "NE555", "DIP-8", 10, "Bin 1"),
    )
    .expect("add");
    let lm358 = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "LM358", "DIP-8", 3, "Bin 2"),
    )
    .expect("add");
    inventory::add_component(
        &mut store,
        &NewComponent::new("Resistor", "10k 1%", "0805", 100, "Reel"),
    )
    .expect("add");

    let by_name = inventory::search_components(
        &store,
        &[SearchFilter::text(ComponentField::Name, "ne5")],
    )
    .expect("search");
    assert_eq!(by_name.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ne555]);

    let ics = inventory::search_components(&store, &[SearchFilter::text(ComponentField::Type, "IC")])
        .expect("search");
    assert_eq!(ics.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ne555, lm358]);

    let exact = inventory::search_components(
        &store,
        &[
            SearchFilter::text(ComponentField::Package, "DIP"),
            SearchFilter::integer(ComponentField::Quantity, 3),
        ],
    )
    .expect("search");
    assert_eq!(exact.iter().map(|c| c.id).collect::<Vec<_>>(), vec![lm358]);

    // `%` is matched literally, not as a wildcard.
    let percent = inventory::search_components(&store, &[SearchFilter::parse("name", "%").expect("parse")])
        .expect("search");
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "10k 1%");

    assert_eq!(
        inventory::search_components(&store, &[]).expect("all").len(),
        3
    );
    assert!(matches!(
        SearchFilter::parse("quantity", "many"),
        Err(PartbinError::ValidationError(_))
    ));
}

#[test]
fn create_project_is_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());

    let first = inventory::create_project(&mut store, "Blinker", "d1").expect("create");
    let second = inventory::create_project(&mut store, "Blinker", "d2").expect("create again");

    assert_eq!(first, second);
    assert_eq!(count(&store, "projects"), 1);
    let project = inventory::get_project(&store, first)
        .expect("get")
        .expect("present");
    assert_eq!(project.description, "d1");
    assert_eq!(project.status, ProjectStatus::Active);
    assert!(!project.created_at.is_empty());

    assert!(matches!(
        inventory::create_project(&mut store, " ", ""),
        Err(PartbinError::ValidationError(_))
    ));
}

#[test]
fn links_upsert_and_drive_project_tags() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let timer = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "NE555", "DIP-8", 10, "Bin 1"),
    )
    .expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");

    assert!(inventory::add_component_to_project(&mut store, blinker, timer, 1).expect("link"));
    assert!(inventory::add_component_to_project(&mut store, blinker, mcu, 12).expect("link"));
    assert!(inventory::add_component_to_project(&mut store, blinker, timer, 2).expect("relink"));

    let bom = inventory::get_project_components(&store, blinker).expect("components");
    let lines: Vec<(i64, i64, i64)> = bom
        .iter()
        .map(|c| (c.component_id, c.required, c.available))
        .collect();
    assert_eq!(lines, vec![(timer, 2, 10), (mcu, 12, 15)]);

    let c = inventory::get_component(&store, mcu)
        .expect("get")
        .expect("present");
    assert_eq!(c.projects, format!("proj_{blinker}"));
}

#[test]
fn scenario_d_remove_link_clears_tag() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");
    inventory::add_component_to_project(&mut store, blinker, mcu, 12).expect("link");

    assert!(inventory::remove_component_from_project(&mut store, blinker, mcu).expect("remove"));
    assert!(!inventory::remove_component_from_project(&mut store, blinker, mcu).expect("remove again"));

    assert!(inventory::get_project_components(&store, blinker)
        .expect("components")
        .is_empty());
    let c = inventory::get_component(&store, mcu)
        .expect("get")
        .expect("present");
    assert_eq!(c.projects, "");
}

#[test]
fn link_validation_and_refusals() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");

    assert!(matches!(
        inventory::add_component_to_project(&mut store, blinker, mcu, 0),
        Err(PartbinError::InvalidQuantity(0))
    ));
    assert!(matches!(
        inventory::add_component_to_project(&mut store, blinker, 77, 1),
        Err(PartbinError::NotFound(_))
    ));
    // Unknown project: the foreign key refuses the link.
    assert!(!inventory::add_component_to_project(&mut store, 404, mcu, 1).expect("refused"));

    assert!(link_rows(&store).is_empty());
}

#[test]
fn delete_in_use_component_without_force_changes_nothing() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");
    let clock = inventory::create_project(&mut store, "Clock", "").expect("project");
    inventory::add_component_to_project(&mut store, blinker, mcu, 12).expect("link");
    inventory::add_component_to_project(&mut store, clock, mcu, 1).expect("link");

    let before_links = link_rows(&store);
    let before_components = inventory::list_components(&store).expect("list");
    let before_projects = inventory::list_projects(&store).expect("projects");

    match inventory::delete_component(&mut store, mcu, false) {
        Err(PartbinError::InUse {
            component_id,
            projects,
        }) => {
            assert_eq!(component_id, mcu);
            let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["Blinker", "Clock"]);
        }
        other => panic!("expected InUse, got {:?}", other),
    }

    assert_eq!(link_rows(&store), before_links);
    assert_eq!(inventory::list_components(&store).expect("list"), before_components);
    assert_eq!(inventory::list_projects(&store).expect("projects"), before_projects);
    assert_eq!(
        inventory::projects_using_component(&store, mcu)
            .expect("users")
            .len(),
        2
    );
}

#[test]
fn force_delete_cascades_links() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let timer = inventory::add_component(
        &mut store,
        &NewComponent::new("IC", "NE555", "DIP-8", 10, "Bin 1"),
    )
    .expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");
    inventory::add_component_to_project(&mut store, blinker, mcu, 12).expect("link");
    inventory::add_component_to_project(&mut store, blinker, timer, 1).expect("link");

    let unlinked = inventory::delete_component(&mut store, mcu, true).expect("force delete");
    assert_eq!(unlinked.len(), 1);
    assert_eq!(unlinked[0].id, blinker);

    assert!(inventory::get_component(&store, mcu).expect("get").is_none());
    assert!(link_rows(&store).iter().all(|(_, c, _)| *c != mcu));
    assert_eq!(link_rows(&store), vec![(blinker, timer, 1)]);
    assert!(inventory::get_project(&store, blinker).expect("get").is_some());

    assert!(matches!(
        inventory::delete_component(&mut store, mcu, true),
        Err(PartbinError::NotFound(_))
    ));
}

#[test]
fn unlinked_component_deletes_without_force() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    assert!(inventory::delete_component(&mut store, mcu, false)
        .expect("delete")
        .is_empty());
    assert_eq!(count(&store, "components"), 0);
}

#[test]
fn project_delete_cascades_and_archive_sets_status() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");
    let clock = inventory::create_project(&mut store, "Clock", "").expect("project");
    inventory::add_component_to_project(&mut store, blinker, mcu, 2).expect("link");

    inventory::archive_project(&mut store, clock).expect("archive");
    assert_eq!(
        inventory::get_project(&store, clock)
            .expect("get")
            .expect("present")
            .status,
        ProjectStatus::Archived
    );

    inventory::delete_project(&mut store, blinker).expect("delete");
    assert!(link_rows(&store).is_empty());
    assert!(inventory::get_component(&store, mcu).expect("get").is_some());
    assert_eq!(
        inventory::list_projects(&store)
            .expect("projects")
            .iter()
            .map(|p| p.id)
            .collect::<Vec<_>>(),
        vec![clock]
    );

    assert!(matches!(
        inventory::delete_project(&mut store, blinker),
        Err(PartbinError::NotFound(_))
    ));
    assert!(matches!(
        inventory::archive_project(&mut store, blinker),
        Err(PartbinError::NotFound(_))
    ));
}

#[test]
fn every_write_is_audited() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(15)).expect("add");
    let blinker = inventory::create_project(&mut store, "Blinker", "").expect("project");
    inventory::add_component_to_project(&mut store, blinker, mcu, 2).expect("link");
    let _ = inventory::delete_component(&mut store, mcu, false);

    let events = broker::read_audit_log(&tmp.path().join("inventory.events.jsonl")).expect("audit");
    let ops: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.op.as_str(), e.status.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("inventory.add_component", "success"),
            ("project.create", "success"),
            ("project.add_component", "success"),
            ("inventory.delete_component", "error"),
        ]
    );
    assert!(events.iter().all(|e| e.actor == "test" && e.db_id == "inventory.db"));
}

#[test]
fn check_constraint_still_guards_direct_writes() {
    let tmp = tempdir().expect("tempdir");
    let mut store = open_store(tmp.path());
    let mcu = inventory::add_component(&mut store, &stm32(1)).expect("add");
    let err = store
        .conn()
        .execute(
            "UPDATE components SET quantity = -1 WHERE id = ?1",
            params![mcu],
        )
        .unwrap_err();
    assert!(partbin::core::error::is_constraint_violation(&err));
}
