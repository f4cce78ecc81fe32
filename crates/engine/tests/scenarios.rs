use std::cell::Cell;
use std::collections::BTreeSet;
use std::io::Write;
use std::rc::Rc;

use directory::Entity;
use directory::source::JsonFileSource;
use engine::script::{parse_script, replay};
use engine::{Command, Engine, EngineConfig, HeadlessSurface};
use focus::{FilterPanel, Focus, MapView};
use foundation::coord::LatLng;
use foundation::time::Millis;
use markers::ClusterAction;
use pretty_assertions::assert_eq;

fn people() -> Vec<Entity> {
    vec![
        Entity::new("John Doe")
            .with_category("Engineering")
            .with_departments(["Department A"])
            .at(37.7749, -122.4194),
        Entity::new("Emily Carter")
            .with_category("Finance")
            .with_departments(["Department B"])
            .at(25.7617, -80.1918),
        Entity::new("Michael Rodriguez")
            .with_category("Operations")
            .with_departments(["Department C"])
            .at(39.7392, -104.9903),
        Entity::new("Sarah Williams")
            .with_departments(["Department D", "Department C"])
            .at(30.2672, -97.7431),
        // Listed, but never placed on the map.
        Entity::new("Priya Nomad")
            .with_category("Engineering")
            .with_departments(["Department A"]),
        Entity::new("Dana Hill")
            .with_category("Design")
            .with_departments(["Department E"])
            .at(39.7500, -105.0000),
    ]
}

fn setup() -> (Engine, HeadlessSurface) {
    let config = EngineConfig::default();
    let mut surface = HeadlessSurface::new(&config);
    let engine = Engine::new(config, people(), &mut surface);
    surface.take_commands();
    (engine, surface)
}

fn departments(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn count(commands: &[Command], pred: impl Fn(&Command) -> bool) -> usize {
    commands.iter().filter(|c| pred(c)).count()
}

fn flies(commands: &[Command]) -> usize {
    count(commands, |c| matches!(c, Command::FlyTo { .. }))
}

fn names(engine: &Engine) -> Vec<String> {
    engine.snapshot().results
}

#[test]
fn initial_set_lists_everyone_and_places_located_entities() {
    let (engine, surface) = setup();
    assert_eq!(engine.filtered().len(), 6);
    assert_eq!(engine.markers().table().placed_count(), 5);
    assert_eq!(surface.map.marker_count(), 5);
    assert_eq!(engine.focus(), Focus::Idle);
}

#[test]
fn search_is_debounced_to_the_last_keystroke() {
    let (mut engine, mut surface) = setup();
    let published = Rc::new(Cell::new(0));
    let seen = Rc::clone(&published);
    engine.subscribe_filtered(move |_| seen.set(seen.get() + 1));

    engine.set_search_text(Millis(0), "j");
    engine.set_search_text(Millis(100), "jo");
    engine.set_search_text(Millis(200), "john");

    assert_eq!(engine.tick(Millis(450), &mut surface), None);
    assert_eq!(engine.filtered().len(), 6);

    let generation = engine.tick(Millis(500), &mut surface);
    assert!(generation.is_some());
    assert_eq!(names(&engine), vec!["John Doe"]);
    assert_eq!(published.get(), 1);
    assert_eq!(surface.map.marker_count(), 1);
}

#[test]
fn departments_combine_with_or() {
    let (mut engine, mut surface) = setup();
    engine.set_selected_departments(Millis(0), departments(&["Department A", "Department B"]));
    engine.tick(Millis(300), &mut surface);
    assert_eq!(
        names(&engine),
        vec!["John Doe", "Emily Carter", "Priya Nomad"]
    );

    engine.set_selected_categories(Millis(400), departments(&["Engineering"]));
    engine.tick(Millis(700), &mut surface);
    assert_eq!(names(&engine), vec!["John Doe", "Priya Nomad"]);
}

#[test]
fn clicking_a_marker_focuses_then_second_click_zooms_out_once() {
    let (mut engine, mut surface) = setup();
    let key = surface.marker_at(&engine, 2).unwrap();

    engine.marker_clicked(Millis(0), key, &mut surface);
    surface.deliver_popup_closes(&mut engine, Millis(0));
    assert_eq!(engine.focus(), Focus::Focused(2));
    assert_eq!(engine.focus_state().previous_zoom, Some(5.0));
    assert_eq!(
        surface.take_commands(),
        vec![
            Command::SetView {
                center: [39.7392, -104.9903],
                zoom: 5.0
            },
            Command::FlyTo {
                center: [39.7392, -104.9903],
                zoom: 13.0,
                duration_ms: 300
            },
            Command::OpenPopup { marker: key },
            Command::ExpandRow { index: Some(2) },
            Command::SetScrollTop { offset: 144.0 },
        ]
    );

    engine.marker_clicked(Millis(2_000), key, &mut surface);
    // The popup close caused by the zoom-out comes straight back.
    assert_eq!(surface.deliver_popup_closes(&mut engine, Millis(2_001)), 1);

    let commands = surface.take_commands();
    assert_eq!(engine.focus(), Focus::Idle);
    assert_eq!(flies(&commands), 1);
    assert_eq!(
        commands,
        vec![
            Command::ClosePopup { marker: key },
            Command::FlyTo {
                center: [39.7392, -104.9903],
                zoom: 5.0,
                duration_ms: 300
            },
            Command::ExpandRow { index: None },
        ]
    );
    assert_eq!(surface.map.zoom(), 5.0);
}

#[test]
fn closing_the_popup_by_hand_zooms_out() {
    let (mut engine, mut surface) = setup();
    engine.row_clicked(Millis(0), 0, &mut surface);
    surface.take_commands();

    surface.map.user_close_popup();
    surface.deliver_popup_closes(&mut engine, Millis(1_000));

    let commands = surface.take_commands();
    assert_eq!(engine.focus(), Focus::Idle);
    assert_eq!(flies(&commands), 1);
    assert_eq!(surface.list.expanded(), None);
}

#[test]
fn switching_focus_does_not_bounce_through_idle() {
    let (mut engine, mut surface) = setup();
    engine.row_clicked(Millis(0), 0, &mut surface);
    engine.row_clicked(Millis(500), 1, &mut surface);
    // Opening popup 1 auto-closed popup 0.
    surface.deliver_popup_closes(&mut engine, Millis(500));

    assert_eq!(engine.focus(), Focus::Focused(1));
    assert_eq!(engine.focus_state().previous_zoom, Some(13.0));
    assert_eq!(surface.list.expanded(), Some(1));
}

#[test]
fn new_filtered_set_drops_focus_without_animation() {
    let (mut engine, mut surface) = setup();
    let old_key = surface.marker_at(&engine, 2).unwrap();
    engine.marker_clicked(Millis(0), old_key, &mut surface);
    surface.take_commands();

    engine.set_search_text(Millis(1_000), "emily");
    engine.tick(Millis(1_300), &mut surface);
    surface.deliver_popup_closes(&mut engine, Millis(1_300));

    assert_eq!(engine.focus(), Focus::Idle);
    assert_eq!(surface.list.expanded(), None);
    let commands = surface.take_commands();
    assert_eq!(flies(&commands), 0);
    assert_eq!(
        count(&commands, |c| matches!(c, Command::ExpandRow { index: None })),
        1
    );
    assert_eq!(count(&commands, |c| matches!(c, Command::RemoveGroup { .. })), 1);

    // Clicks on markers from the previous generation go nowhere.
    engine.marker_clicked(Millis(1_400), old_key, &mut surface);
    assert_eq!(engine.focus(), Focus::Idle);
    assert!(surface.take_commands().is_empty());
}

#[test]
fn user_close_after_quick_refocus_zooms_out() {
    let (mut engine, mut surface) = setup();
    let key = surface.marker_at(&engine, 2).unwrap();

    engine.marker_clicked(Millis(0), key, &mut surface);
    engine.marker_clicked(Millis(1_000), key, &mut surface);
    surface.deliver_popup_closes(&mut engine, Millis(1_000));
    engine.marker_clicked(Millis(1_100), key, &mut surface);
    surface.deliver_popup_closes(&mut engine, Millis(1_100));
    assert_eq!(engine.focus(), Focus::Focused(2));
    surface.take_commands();

    // Still inside the 500 ms window of the earlier zoom-out.
    surface.map.user_close_popup();
    surface.deliver_popup_closes(&mut engine, Millis(1_200));

    assert_eq!(engine.focus(), Focus::Idle);
    assert_eq!(surface.list.expanded(), None);
    assert_eq!(flies(&surface.take_commands()), 1);
}

#[test]
fn cluster_click_spiderfies_only_at_the_map_maximum() {
    let mut config = EngineConfig::default();
    config.clustering.disable_clustering_at_zoom = 30.0;
    let mut surface = HeadlessSurface::new(&config);
    let twins = vec![
        Entity::new("Ann Twin").at(40.0, -100.0),
        Entity::new("Ben Twin").at(40.000_001, -100.000_001),
    ];
    let mut engine = Engine::new(config, twins, &mut surface);
    let ann = surface.marker_at(&engine, 0).unwrap();

    MapView::set_view(&mut surface.map, LatLng::new(40.0, -100.0), 13.0);
    let (cluster, _) = surface.map.cluster_of(ann).unwrap();
    assert_eq!(
        engine.cluster_clicked(cluster, &mut surface),
        Some(ClusterAction::ZoomToBounds)
    );
    assert_eq!(surface.map.zoom(), 18.0);

    let (cluster, glyph) = surface.map.cluster_of(ann).unwrap();
    assert_eq!(glyph.members.len(), 2);
    surface.take_commands();
    assert_eq!(
        engine.cluster_clicked(cluster, &mut surface),
        Some(ClusterAction::Spiderfy)
    );
    assert_eq!(surface.take_commands(), vec![Command::Spiderfy { cluster }]);
    assert_eq!(surface.map.zoom(), 18.0);
}

#[test]
fn unchanged_membership_keeps_focus() {
    let (mut engine, mut surface) = setup();
    engine.row_clicked(Millis(0), 3, &mut surface);
    let generation = engine.filtered().generation();

    let all = departments(&[
        "Department A",
        "Department B",
        "Department C",
        "Department D",
        "Department E",
    ]);
    engine.set_selected_departments(Millis(100), all);
    assert_eq!(engine.tick(Millis(400), &mut surface), None);

    assert_eq!(engine.filtered().generation(), generation);
    assert_eq!(engine.focus(), Focus::Focused(3));
}

#[test]
fn unplaced_entity_is_focusable_from_the_list() {
    let (mut engine, mut surface) = setup();
    assert_eq!(surface.marker_at(&engine, 4), None);

    engine.row_clicked(Millis(0), 4, &mut surface);
    assert_eq!(engine.focus(), Focus::Focused(4));
    assert_eq!(
        surface.take_commands(),
        vec![
            Command::ExpandRow { index: Some(4) },
            Command::SetScrollTop { offset: 288.0 },
        ]
    );
}

#[test]
fn filter_panel_stays_open_while_editing() {
    let (mut engine, mut surface) = setup();
    surface.panel.expand();

    engine.toggle_department(Millis(1_000), "Department A");
    assert!(!engine.panel_may_auto_collapse(Millis(1_050)));
    engine.row_clicked(Millis(1_050), 0, &mut surface);
    assert!(surface.panel.is_expanded());

    assert!(engine.panel_may_auto_collapse(Millis(1_100)));
    engine.row_clicked(Millis(1_200), 1, &mut surface);
    assert!(!surface.panel.is_expanded());
}

#[test]
fn cluster_click_zooms_until_members_separate() {
    let (mut engine, mut surface) = setup();
    let michael = surface.marker_at(&engine, 2).unwrap();
    let dana = surface.marker_at(&engine, 5).unwrap();

    let (cluster, glyph) = surface.map.cluster_of(michael).unwrap();
    assert_eq!(glyph.members, vec![michael, dana]);

    let action = engine.cluster_clicked(cluster, &mut surface);
    assert_eq!(action, Some(ClusterAction::ZoomToBounds));
    assert!(surface.map.zoom() >= 10.0);
    assert!(surface.map.cluster_of(michael).unwrap().1.is_single());
    assert_eq!(engine.focus(), Focus::Idle);
}

#[test]
fn reload_always_starts_a_new_generation() {
    let (mut engine, mut surface) = setup();
    engine.row_clicked(Millis(0), 0, &mut surface);
    let before = engine.filtered().generation();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{ "name": "John Doe", "departments": ["Department A"], "lat": 37.7749, "lng": -122.4194 }},
            {{ "name": "Zed Zero", "departments": [] }}
        ]"#
    )
    .unwrap();
    let generation = engine
        .reload(&JsonFileSource::new(file.path()), &mut surface)
        .unwrap();

    assert!(generation > before);
    assert_eq!(engine.filtered().len(), 2);
    assert_eq!(engine.focus(), Focus::Idle);
    assert_eq!(surface.map.marker_count(), 1);
}

#[test]
fn teardown_silences_the_engine() {
    let (mut engine, mut surface) = setup();
    engine.row_clicked(Millis(0), 0, &mut surface);
    engine.set_search_text(Millis(10), "emily");
    engine.teardown(&mut surface);
    surface.take_commands();

    assert_eq!(surface.map.marker_count(), 0);
    assert_eq!(engine.tick(Millis(1_000), &mut surface), None);
    engine.row_clicked(Millis(1_000), 1, &mut surface);
    surface.deliver_popup_closes(&mut engine, Millis(1_000));

    assert!(!engine.is_active());
    assert_eq!(engine.focus(), Focus::Idle);
    assert!(surface.take_commands().is_empty());
}

#[test]
fn scripted_session_replays_deterministically() {
    let steps = parse_script(
        r#"[
            { "at": 0, "action": "search", "text": "john" },
            { "at": 400, "action": "click_row", "index": 0 },
            { "at": 1000, "action": "close_popup" }
        ]"#,
    )
    .unwrap();

    let run = || {
        let (mut engine, mut surface) = setup();
        replay(&mut engine, &mut surface, &steps)
    };
    let report = run();

    assert_eq!(report.state.result_count, 1);
    assert_eq!(report.state.focus, Focus::Idle);
    assert!(!report.state.transition_in_flight);
    assert_eq!(report.popup, None);
    assert_eq!(report.zoom, 5.0);
    assert_eq!(flies(&report.commands), 2);
    assert_eq!(report, run());
}
