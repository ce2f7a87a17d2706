use elysium_types::{Direction, KnobValue, LayerData, Waveform};

use super::{from_json, to_json};
use crate::error::EngineError;
use crate::state::layer::{Layer, LayerSettings};
use crate::state::oscillator::Oscillator;
use crate::tool::{ToolRegistry, NOTE, SPIN};

fn settings() -> LayerSettings {
    LayerSettings { columns: 4, rows: 5, ..LayerSettings::default() }
}

#[test]
fn round_trip_preserves_tool_configuration() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(settings());
    let cell = layer.cell_at(2, 3).unwrap();

    let note = layer.add_new_tool(&registry, cell, NOTE).unwrap();
    note.set_enabled(false);
    note.set_preferred_order(9);
    note.set_script("run", "print('hi')");
    let velocity = layer.tool_knob(cell, NOTE, "velocity").unwrap();
    layer.set_knob(velocity, KnobValue::Integer(77)).unwrap();
    layer.set_knob_range(velocity, 10.0, 90.0, 1.0).unwrap();
    let duration = layer.tool_knob(cell, NOTE, "duration").unwrap();
    let layer_duration = layer.layer_knob("duration").unwrap();
    layer.link_knob(duration, layer_duration, true).unwrap();
    let triad = layer.tool_knob(cell, NOTE, "triad").unwrap();
    let osc = Oscillator::new(Waveform::Triangle, 0.0, 6.0, 8.0).unwrap();
    layer.set_knob_oscillator(triad, Some(osc)).unwrap();

    layer.add_new_tool(&registry, cell, SPIN).unwrap();
    let playhead = layer.add_playhead(cell, Direction::SE, Some(5)).unwrap();
    layer.playhead_mut(playhead).unwrap().add_skip(2);

    let data = layer.to_data().unwrap();
    let (loaded, problems) = Layer::from_data(&data, &registry, settings()).unwrap();
    assert!(problems.is_empty(), "{:?}", problems);

    let tool = loaded.tool(cell, NOTE).unwrap();
    assert!(!tool.enabled());
    assert_eq!(tool.preferred_order(), 9);
    assert_eq!(tool.scripts().get("run").map(String::as_str), Some("print('hi')"));

    let velocity = loaded.tool_knob(cell, NOTE, "velocity").unwrap();
    let knob = loaded.knob(velocity).unwrap();
    assert_eq!(knob.stored(), KnobValue::Integer(77));
    assert_eq!(knob.range().unwrap().minimum(), 10.0);
    assert_eq!(knob.range().unwrap().maximum(), 90.0);

    let duration = loaded.tool_knob(cell, NOTE, "duration").unwrap();
    let knob = loaded.knob(duration).unwrap();
    assert_eq!(knob.linked(), loaded.layer_knob("duration"));
    assert!(knob.link_value());

    let triad = loaded.tool_knob(cell, NOTE, "triad").unwrap();
    let osc = loaded.knob(triad).unwrap().oscillator().unwrap();
    assert_eq!(osc.shape(), Waveform::Triangle);
    assert_eq!(osc.period(), 8.0);

    assert!(loaded.tool(cell, SPIN).is_some());
    assert_eq!(loaded.playheads().len(), 1);
    assert_eq!(loaded.playheads()[0].direction(), Direction::SE);
    assert_eq!(loaded.playheads()[0].time_to_live(), Some(5));
    assert_eq!(loaded.playheads()[0].pending_skip(), 2);

    // Saving the loaded layer gives the same tree.
    assert_eq!(loaded.to_data().unwrap(), data);
}

#[test]
fn layer_knobs_round_trip() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(settings());
    let transpose = layer.layer_knob("transpose").unwrap();
    layer.set_knob(transpose, KnobValue::Integer(-5)).unwrap();
    let emphasis = layer.layer_knob("emphasis").unwrap();
    let velocity = layer.layer_knob("velocity").unwrap();
    layer.link_knob(emphasis, velocity, true).unwrap();

    let json = to_json(&layer).unwrap();
    let (loaded, problems) = from_json(&json, &registry, settings()).unwrap();
    assert!(problems.is_empty());
    let transpose = loaded.layer_knob("transpose").unwrap();
    assert_eq!(loaded.knob(transpose).unwrap().stored(), KnobValue::Integer(-5));
    let emphasis = loaded.layer_knob("emphasis").unwrap();
    assert_eq!(loaded.knob(emphasis).unwrap().linked(), loaded.layer_knob("velocity"));
}

#[test]
fn layer_knob_linked_to_tool_knob_is_saved_unlinked() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(settings());
    let cell = layer.cell_at(0, 0).unwrap();
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let tool_velocity = layer.tool_knob(cell, NOTE, "velocity").unwrap();
    let velocity = layer.layer_knob("velocity").unwrap();
    layer.link_knob(velocity, tool_velocity, true).unwrap();

    let data = layer.to_data().unwrap();
    assert_eq!(data.knobs["velocity"].linked, None);
    let (loaded, problems) = Layer::from_data(&data, &registry, settings()).unwrap();
    assert!(problems.is_empty(), "{:?}", problems);
    let velocity = loaded.layer_knob("velocity").unwrap();
    assert_eq!(loaded.knob(velocity).unwrap().linked(), None);
}

#[test]
fn oversized_grid_is_rejected() {
    let registry = ToolRegistry::with_builtins();
    let err = from_json(r#"{"columns":70000,"rows":70000}"#, &registry, settings()).err().unwrap();
    assert!(matches!(err, EngineError::Malformed(_)), "{:?}", err);

    let (loaded, _) = from_json(r#"{"columns":256,"rows":3}"#, &registry, settings()).unwrap();
    assert_eq!(loaded.columns(), 256);
}

#[test]
fn bad_elements_are_skipped_and_reported() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(settings());
    let cell = layer.cell_at(1, 1).unwrap();
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let mut data: LayerData = layer.to_data().unwrap();

    let mut unknown = data.cells[0].tools[0].clone();
    unknown.tool_type = "theremin".to_string();
    data.cells[0].tools.push(unknown);

    let mut off_grid = data.cells[0].clone();
    off_grid.column = 40;
    data.cells.push(off_grid);

    let mut bad_period = data.cells[0].tools[0].clone();
    bad_period.tool_type = NOTE.to_string();
    if let Some(knob) = bad_period.knobs.get_mut("velocity") {
        knob.oscillator = Some(elysium_types::OscillatorData {
            shape: Waveform::Sine,
            enabled: true,
            minimum: 0.0,
            maximum: 1.0,
            period: 0.0,
        });
    }
    data.cells.push(elysium_types::CellData { column: 0, row: 0, tools: vec![bad_period] });

    let (loaded, problems) = Layer::from_data(&data, &registry, settings()).unwrap();
    assert_eq!(problems.len(), 3, "{:?}", problems);
    assert!(problems.iter().any(|e| matches!(e, EngineError::UnknownToolType(t) if t == "theremin")));
    assert!(problems.iter().any(|e| matches!(e, EngineError::NoSuchCell(_))));
    assert!(problems.iter().any(|e| matches!(e, EngineError::InvalidPeriod(_))));

    assert!(loaded.tool(cell, NOTE).is_some());
    let origin = loaded.cell_at(0, 0).unwrap();
    assert!(loaded.tool(origin, NOTE).is_none());
    // Only the layer knobs and the surviving note tool's knobs are allocated.
    assert_eq!(loaded.knobs().len(), layer.knobs().len());
}

#[test]
fn malformed_json_is_an_error() {
    let registry = ToolRegistry::with_builtins();
    let err = from_json("{ not json", &registry, settings()).err().unwrap();
    assert!(matches!(err, EngineError::Json(_)));
}
