use covid_map::data::boundaries::{parse_boundaries, BoundarySource, Municipality};
use covid_map::data::cases::{CaseRecord, CaseSource};
use covid_map::data::BaseMap;
use covid_map::loader::Loader;
use covid_map::{panel, scale, App, FetchError, Interaction, Phase, StateCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const GO: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"name": "Goiânia"},
         "geometry": {"type": "Polygon", "coordinates": [[[-49.45, -16.85], [-49.05, -16.85], [-49.05, -16.45], [-49.45, -16.45], [-49.45, -16.85]]]}},
        {"type": "Feature", "properties": {"name": "Anápolis"},
         "geometry": {"type": "Polygon", "coordinates": [[[-49.05, -16.45], [-48.75, -16.45], [-48.75, -16.15], [-49.05, -16.15], [-49.05, -16.45]]]}}
    ]
}"#;

struct MemoryCases(HashMap<StateCode, Vec<CaseRecord>>);

impl CaseSource for MemoryCases {
    fn fetch_latest(&self, state: StateCode) -> Result<Vec<CaseRecord>, FetchError> {
        self.0.get(&state).cloned().ok_or(FetchError::Status {
            url: format!("memory://{state}"),
            status: 404,
        })
    }
}

struct MemoryBoundaries;

impl BoundarySource for MemoryBoundaries {
    fn fetch(&self, state: StateCode) -> Result<Vec<Municipality>, FetchError> {
        match state {
            StateCode::GO => parse_boundaries(GO, "memory"),
            _ => Err(FetchError::Io {
                path: format!("{}/map.json", state.lowercase()).into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

fn app() -> App {
    let cases = MemoryCases(HashMap::from([(
        StateCode::GO,
        vec![
            CaseRecord::new("", 153, 3),
            CaseRecord::new("Goiânia", 150, 3),
        ],
    )]));
    let loader = Loader::new(Arc::new(cases), Arc::new(MemoryBoundaries)).unwrap();
    App::new(StateCode::GO, loader, BaseMap::outline(), 120, 40)
}

/// Apply results until both fetches of the current request have landed
fn settle(app: &mut App) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while app.view.cases_pending || app.view.boundaries_pending {
        assert!(Instant::now() < deadline, "fetch timed out");
        app.pump_blocking(Duration::from_millis(100));
    }
    app.prepare_frame();
}

fn index_of(app: &App, name: &str) -> usize {
    app.view
        .municipalities
        .iter()
        .position(|m| m.name == name)
        .unwrap()
}

#[test]
fn goias_choropleth() {
    let mut app = app();
    app.select_state(StateCode::GO);
    settle(&mut app);

    assert_eq!(app.phase, Phase::Rendered);
    let goiania = index_of(&app, "Goiânia");
    let anapolis = index_of(&app, "Anápolis");

    assert_eq!(app.band(goiania), scale::BAND_COUNT - 1);
    assert_eq!(app.band(anapolis), 0);

    let cases = app.view.cases.as_ref().unwrap();
    assert_eq!(
        panel::describe(cases.get("Goiânia")),
        "150 casos confirmados. 3 mortes."
    );
    assert_eq!(panel::describe(cases.get("Anápolis")), "Nenhum caso confirmado.");

    app.dispatch(Interaction::Hover(anapolis));
    assert_eq!(app.info_target().map(|m| m.name.as_str()), Some("Anápolis"));
}

#[test]
fn missing_boundaries_still_render_base_map() {
    let mut app = app();
    app.select_state(StateCode::SP);
    settle(&mut app);

    assert_eq!(app.phase, Phase::Rendered);
    assert!(app.view.municipalities.is_empty());
    assert!(app.view.boundaries_error.is_some());
    assert!(app.view.cases_error.is_some());
    assert!(app.map_renderer.layers().is_some());
    assert!(app.load_status().starts_with("erro"));
}

#[test]
fn switching_state_ignores_previous_request() {
    let mut app = app();
    app.select_state(StateCode::SP);
    app.select_state(StateCode::GO);
    settle(&mut app);

    // Drain whatever the SP request still had in flight.
    for _ in 0..4 {
        app.pump_blocking(Duration::from_millis(50));
    }

    assert_eq!(app.state, StateCode::GO);
    assert_eq!(app.view.municipalities.len(), 2);
    assert!(app.view.boundaries_error.is_none());
    assert!(app.view.cases_error.is_none());
}
