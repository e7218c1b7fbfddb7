use geojson::{FeatureCollection, GeoJson};
use rand::Rng;

use weed_atlas::colors::{ChoroplethColorer, Palette, string_hash};
use weed_atlas::controller::{Command, MapEvent, MapState, MapViewController};
use weed_atlas::data::{JurisdictionIdentity, RegionDetail, RegulationCount};
use weed_atlas::filters::{FilterFlag, FilterState};
use weed_atlas::map_draw::GeographySource;
use weed_atlas::report::{ReportDocument, ReportTable};

fn colorer() -> ChoroplethColorer {
    ChoroplethColorer::new(&Palette::default()).unwrap()
}

fn square(name: &str, x0: f64) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{"name":"{name}"}},
            "geometry":{{"type":"Polygon","coordinates":[[[{x0},0],[{x1},0],[{x1},5],[{x0},5],[{x0},0]]]}}}}"#,
        x1 = x0 + 5.0
    )
}

fn geography() -> Vec<GeographySource> {
    let text = format!(
        r#"{{"type":"FeatureCollection","features":[{},{}]}}"#,
        square("Queensland", 0.0),
        square("Victoria", 10.0)
    );
    let gj: GeoJson = text.parse().unwrap();
    let collection = FeatureCollection::try_from(gj).unwrap();
    vec![GeographySource { filename: "australia.geojson".into(), collection }]
}

fn counts() -> Vec<RegulationCount> {
    serde_json::from_str(
        r#"[{"country":"Australia","region":"Queensland","count":260},
            {"country":"Australia","region":"Victoria","count":120}]"#,
    )
    .unwrap()
}

fn detail(names: &[&str]) -> RegionDetail {
    let weeds: Vec<serde_json::Value> = names
        .iter()
        .map(|n| serde_json::json!({"canonical_name": n, "level": "National", "has_international_regulation": true}))
        .collect();
    serde_json::from_value(serde_json::json!({"weeds": weeds, "has_any_data": true})).unwrap()
}

fn counts_seq(commands: &[Command]) -> u64 {
    commands
        .iter()
        .find_map(|c| match c {
            Command::FetchCounts { seq, .. } => Some(*seq),
            _ => None,
        })
        .expect("counts request")
}

fn detail_request(commands: &[Command]) -> (u64, JurisdictionIdentity, FilterState) {
    commands
        .iter()
        .find_map(|c| match c {
            Command::FetchDetail { seq, identity, filters } => Some((*seq, identity.clone(), *filters)),
            _ => None,
        })
        .expect("detail request")
}

fn ready_controller() -> MapViewController {
    let mut controller = MapViewController::new(colorer());
    let commands = controller.handle(MapEvent::Mount);
    let seq = counts_seq(&commands);
    controller.handle(MapEvent::GeographyLoaded { result: Ok(geography()) });
    controller.handle(MapEvent::CountsLoaded { seq, result: Ok(counts()) });
    assert_eq!(controller.state(), MapState::Ready);
    controller
}

#[test]
fn suspending_while_selected_drops_the_selection() {
    let mut controller = ready_controller();
    let (seq, identity, _) = detail_request(&controller.handle(MapEvent::Click(0)));
    controller.handle(MapEvent::Hover(Some(0)));
    assert!(controller.tooltip().is_some());

    for flag in FilterFlag::ALL {
        controller.handle(MapEvent::Toggle(flag));
    }
    assert_eq!(controller.state(), MapState::Suspended);
    assert!(controller.selection().is_none());
    assert!(controller.tooltip().is_none());
    assert_eq!(controller.hovered(), None);
    assert_eq!(controller.style_for(0), colorer().suspended_style());

    // odpowiedź sprzed wyłączenia filtrów nie wraca do tabeli
    controller.handle(MapEvent::DetailLoaded { seq, identity, result: Ok(detail(&["Parthenium hysterophorus"])) });
    assert!(controller.selection().is_none());

    let commands = controller.handle(MapEvent::Toggle(FilterFlag::National));
    assert_eq!(controller.state(), MapState::Ready);
    assert!(controller.selected_identity().is_none());
    assert_eq!(commands.len(), 1);
    assert!(matches!(commands[0], Command::FetchCounts { filters, .. } if filters.national && !filters.region));
}

#[test]
fn later_click_wins_over_earlier_response() {
    let mut controller = ready_controller();
    let (seq_a, id_a, _) = detail_request(&controller.handle(MapEvent::Click(0)));
    let (seq_b, id_b, _) = detail_request(&controller.handle(MapEvent::Click(1)));
    assert_ne!(id_a, id_b);

    controller.handle(MapEvent::DetailLoaded { seq: seq_b, identity: id_b.clone(), result: Ok(detail(&["Rubus fruticosus"])) });
    controller.handle(MapEvent::DetailLoaded { seq: seq_a, identity: id_a, result: Ok(detail(&["Lantana camara"])) });

    let selection = controller.selection().expect("selection");
    assert_eq!(selection.identity, id_b);
    assert_eq!(selection.rows[0].canonical_name, "Rubus fruticosus");
}

#[test]
fn other_region_clears_rows_same_region_keeps_them() {
    let mut controller = ready_controller();
    let (seq, identity, _) = detail_request(&controller.handle(MapEvent::Click(0)));
    controller.handle(MapEvent::DetailLoaded { seq, identity, result: Ok(detail(&["Lantana camara"])) });

    let (_, again, _) = detail_request(&controller.handle(MapEvent::Click(0)));
    assert_eq!(controller.selected_identity(), Some(&again));
    assert_eq!(controller.selection().map(|s| s.rows.len()), Some(1));

    controller.handle(MapEvent::Click(1));
    assert!(controller.selection().is_none());
}

#[test]
fn toggling_back_restores_colours_and_request() {
    let mut controller = ready_controller();
    let (_, identity, filters) = detail_request(&controller.handle(MapEvent::Click(1)));
    let before: Vec<_> = (0..2).map(|i| controller.style_for(i)).collect();

    let first = controller.handle(MapEvent::Toggle(FilterFlag::International));
    let seq = counts_seq(&first);
    controller.handle(MapEvent::CountsLoaded { seq, result: Ok(counts()) });

    let second = controller.handle(MapEvent::Toggle(FilterFlag::International));
    let seq = counts_seq(&second);
    controller.handle(MapEvent::CountsLoaded { seq, result: Ok(counts()) });

    let after: Vec<_> = (0..2).map(|i| controller.style_for(i)).collect();
    assert_eq!(before, after);
    let (_, identity_again, filters_again) = detail_request(&second);
    assert_eq!(identity, identity_again);
    assert_eq!(filters, filters_again);
    assert_eq!(filters.to_query_string(), filters_again.to_query_string());
}

#[test]
fn table_and_document_share_source_categories() {
    let mut controller = ready_controller();
    let (seq, identity, _) = detail_request(&controller.handle(MapEvent::Click(0)));
    controller.handle(MapEvent::DetailLoaded { seq, identity, result: Ok(detail(&["Sorghum halepense", "Cenchrus ciliaris"])) });

    let selection = controller.selection().expect("selection");
    let table = ReportTable::from_selection(selection);
    let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    let document = ReportDocument::build(selection, date);
    assert_eq!(table.rows(), document.rows.as_slice());
    assert!(document.rows.iter().all(|r| r.source.label() == "Multiple"));
    assert_eq!(document.filename, "Regulated_Plants_Queensland_2026-01-02.pdf");
}

#[test]
fn unmapped_countries_get_stable_ramps() {
    let colorer = colorer();
    let mut rng = rand::rng();
    let mut used = std::collections::BTreeSet::new();
    for _ in 0..200 {
        let len = rng.random_range(1..12);
        let name: String = (0..len).map(|_| rng.random_range(b'a'..=b'z') as char).collect();
        let count = rng.random_range(0..400u32);
        let identity = JurisdictionIdentity::new(&name, "Somewhere");

        let first = colorer.color_for(count, &identity);
        assert_eq!(first, colorer.color_for(count, &identity));
        let ramp = (string_hash(&name) as usize) % colorer.ramp_count();
        assert_eq!(colorer.ramp_index(&name), Some(ramp));
        used.insert(ramp);
    }
    assert_eq!(used.len(), colorer.ramp_count());
}
