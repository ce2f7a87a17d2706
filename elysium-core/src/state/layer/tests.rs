use elysium_types::{CellId, Direction, KnobValue, MidiMessage};

use super::*;
use crate::midi::RecordingSink;
use crate::tool::{ToolRegistry, ABSORB, GENERATE, NOTE, REBOUND, SKIP, SPIN, SPLIT};

fn grid(columns: u32, rows: u32, edge_policy: EdgePolicy) -> Layer {
    Layer::new(LayerSettings { columns, rows, edge_policy, ..LayerSettings::default() })
}

fn at(layer: &Layer, column: u32, row: u32) -> CellId {
    layer.cell_at(column, row).unwrap()
}

fn position(layer: &Layer) -> Vec<(HexCoord, Direction)> {
    layer
        .playheads()
        .iter()
        .map(|p| (layer.cell(p.cell()).unwrap().coord(), p.direction()))
        .collect()
}

#[test]
fn grid_is_wired_mutually() {
    let layer = grid(4, 5, EdgePolicy::Stop);
    assert_eq!(layer.cells().len(), 20);
    for cell in layer.cells() {
        for d in Direction::ALL {
            if let Some(other) = cell.neighbour(d) {
                assert_eq!(layer.neighbour(other, d.opposite()), Some(cell.id()));
            }
        }
    }
    let origin = at(&layer, 0, 0);
    assert_eq!(layer.neighbour(origin, Direction::N), Some(at(&layer, 0, 1)));
    assert_eq!(layer.neighbour(origin, Direction::NE), Some(at(&layer, 1, 0)));
    assert_eq!(layer.neighbour(origin, Direction::SE), None);
    assert_eq!(layer.neighbour(origin, Direction::S), None);
    // Odd columns sit half a cell higher.
    assert_eq!(layer.neighbour(at(&layer, 1, 0), Direction::NE), Some(at(&layer, 2, 1)));
    assert!(layer.cell_at(4, 0).is_none());
}

#[test]
fn cells_follow_the_harmonic_table() {
    let layer = grid(4, 5, EdgePolicy::Stop);
    let pitch = |c, r| layer.cell(at(&layer, c, r)).unwrap().pitch();
    assert_eq!(pitch(0, 0), Some(12));
    assert_eq!(pitch(0, 1), Some(19));
    assert_eq!(pitch(1, 0), Some(16));
    assert_eq!(pitch(2, 0), Some(13));
    assert_eq!(pitch(3, 2), Some(12 + 14 + 5));
}

#[test]
fn connect_neighbour_is_mutual_and_cuts_stale_links() {
    let mut layer = grid(3, 3, EdgePolicy::Stop);
    let a = at(&layer, 0, 0);
    let b = at(&layer, 2, 2);
    let old_a = at(&layer, 1, 0);
    let old_b = at(&layer, 1, 1);
    assert_eq!(layer.neighbour(b, Direction::SW), Some(old_b));

    layer.connect_neighbour(a, b, Direction::NE).unwrap();
    assert_eq!(layer.neighbour(a, Direction::NE), Some(b));
    assert_eq!(layer.neighbour(b, Direction::SW), Some(a));
    assert_eq!(layer.neighbour(old_a, Direction::SW), None);
    assert_eq!(layer.neighbour(old_b, Direction::NE), None);

    assert!(matches!(layer.connect_neighbour(a, a, Direction::N), Err(EngineError::SelfLink(_))));
    let bogus = CellId::new(999);
    assert!(matches!(layer.connect_neighbour(a, bogus, Direction::N), Err(EngineError::UnknownCell(_))));

    layer.disconnect_neighbour(a, Direction::NE).unwrap();
    assert_eq!(layer.neighbour(a, Direction::NE), None);
    assert_eq!(layer.neighbour(b, Direction::SW), None);
}

#[test]
fn tools_run_in_preferred_then_attach_order() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(2, 2, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, SPIN).unwrap();
    layer.add_new_tool(&registry, cell, REBOUND).unwrap();
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    assert_eq!(layer.cell(cell).unwrap().tools_in_order(), vec![NOTE, REBOUND, SPIN]);

    // Tie on preferred order: the earlier attachment runs first.
    layer.tool_mut(cell, NOTE).unwrap().set_preferred_order(3);
    assert_eq!(layer.cell(cell).unwrap().tools_in_order(), vec![REBOUND, SPIN, NOTE]);
}

#[test]
fn replacing_a_tool_releases_the_old_knobs() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(2, 2, EdgePolicy::Stop);
    let cell = at(&layer, 1, 1);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let knobs = layer.knobs().len();
    let old_velocity = layer.tool_knob(cell, NOTE, "velocity").unwrap();

    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    assert_eq!(layer.knobs().len(), knobs);
    assert!(!layer.knobs().contains(old_velocity));
    assert_eq!(layer.cell(cell).unwrap().tool_count(), 1);

    assert!(layer.remove_tool(cell, NOTE).unwrap());
    assert!(!layer.remove_tool(cell, NOTE).unwrap());
    assert_eq!(layer.knobs().len(), layer.layer_knobs().all().len());
}

#[test]
fn tool_from_another_layer_is_rejected() {
    let registry = ToolRegistry::with_builtins();
    let mut source = grid(2, 2, EdgePolicy::Stop);
    let mut target = grid(2, 2, EdgePolicy::Stop);
    let tool = source.create_tool(&registry, NOTE).unwrap();
    let cell = at(&target, 0, 0);
    assert!(matches!(target.add_tool(cell, tool), Err(EngineError::Malformed(_))));
}

#[test]
fn single_cell_note_with_stop() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(LayerSettings {
        columns: 1,
        rows: 1,
        base_pitch: 60,
        edge_policy: EdgePolicy::Stop,
        ..LayerSettings::default()
    });
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let playhead = layer.add_playhead(cell, Direction::N, None).unwrap();
    let mut sink = RecordingSink::new();

    layer.tick(&mut sink).unwrap();
    assert_eq!(
        sink.take(),
        vec![
            MidiMessage::NoteOn { note: 60, velocity: 100, channel: 0 },
            MidiMessage::NoteOff { note: 60, velocity: 100, channel: 0 },
        ]
    );
    assert_eq!(layer.playhead(playhead).unwrap().cell(), cell);
    assert!(layer.cell(cell).unwrap().has_playhead(playhead));

    layer.tick(&mut sink).unwrap();
    assert_eq!(sink.note_ons().count(), 1);
    assert_eq!(layer.beat(), 2);
}

fn run_column(policy: EdgePolicy, ticks: usize) -> Layer {
    let mut layer = grid(1, 3, policy);
    let start = at(&layer, 0, 0);
    layer.add_playhead(start, Direction::N, None).unwrap();
    let mut sink = RecordingSink::new();
    for _ in 0..ticks {
        layer.tick(&mut sink).unwrap();
    }
    layer
}

#[test]
fn edge_policies() {
    let layer = run_column(EdgePolicy::Stop, 3);
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 2), Direction::N)]);

    let layer = run_column(EdgePolicy::Wrap, 3);
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 0), Direction::N)]);

    let layer = run_column(EdgePolicy::Bounce, 3);
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 1), Direction::S)]);

    let layer = run_column(EdgePolicy::Remove, 3);
    assert!(layer.playheads().is_empty());
    assert!(layer.cells().iter().all(|c| !c.is_occupied()));
}

#[test]
fn skip_tool_jumps_cells() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 6, EdgePolicy::Stop);
    let start = at(&layer, 0, 0);
    layer.add_new_tool(&registry, start, SKIP).unwrap();
    let amount = layer.tool_knob(start, SKIP, "amount").unwrap();
    layer.set_knob(amount, KnobValue::Integer(2)).unwrap();
    layer.add_playhead(start, Direction::N, None).unwrap();

    layer.tick(&mut RecordingSink::new()).unwrap();
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 3), Direction::N)]);
    assert_eq!(layer.playheads()[0].pending_skip(), 0);
}

#[test]
fn absorb_removes_after_output() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(2, 2, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    layer.add_new_tool(&registry, cell, ABSORB).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();

    let mut sink = RecordingSink::new();
    layer.tick(&mut sink).unwrap();
    assert_eq!(sink.note_ons().count(), 1);
    assert!(layer.playheads().is_empty());
    assert!(!layer.cell(cell).unwrap().is_occupied());
}

#[test]
fn split_spawns_on_neighbours_for_next_tick() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(3, 3, EdgePolicy::Stop);
    let centre = at(&layer, 1, 1);
    layer.add_new_tool(&registry, centre, SPLIT).unwrap();
    layer.add_playhead(at(&layer, 1, 0), Direction::N, Some(8)).unwrap();
    let mut sink = RecordingSink::new();

    layer.tick(&mut sink).unwrap();
    assert_eq!(position(&layer), vec![(HexCoord::new(1, 1), Direction::N)]);

    layer.tick(&mut sink).unwrap();
    let spawned = position(&layer);
    assert_eq!(spawned.len(), 5);
    assert!(spawned.contains(&(HexCoord::new(1, 2), Direction::N)));
    assert!(spawned.contains(&(HexCoord::new(2, 2), Direction::NE)));
    assert!(spawned.contains(&(HexCoord::new(0, 1), Direction::SW)));
    assert!(!spawned.iter().any(|(_, d)| *d == Direction::S));
    // Children inherit what is left of the parent's lifetime.
    assert!(layer.playheads().iter().all(|p| p.time_to_live() == Some(6)));
}

#[test]
fn generator_spawns_playheads_that_expire() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 4, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, GENERATE).unwrap();
    let every = layer.tool_knob(cell, GENERATE, "pulse_every").unwrap();
    let ttl = layer.tool_knob(cell, GENERATE, "time_to_live").unwrap();
    layer.set_knob(every, KnobValue::Integer(2)).unwrap();
    layer.set_knob(ttl, KnobValue::Integer(2)).unwrap();
    let mut sink = RecordingSink::new();

    layer.tick(&mut sink).unwrap();
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 1), Direction::N)]);
    layer.tick(&mut sink).unwrap();
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 2), Direction::N)]);
    assert!(layer.playheads()[0].is_expired());

    // The first playhead expires as the second is born.
    layer.tick(&mut sink).unwrap();
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 1), Direction::N)]);
}

#[test]
fn note_off_waits_for_duration() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 1, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let duration = layer.tool_knob(cell, NOTE, "duration").unwrap();
    let gate = layer.tool_knob(cell, NOTE, "gate").unwrap();
    layer.set_knob(duration, KnobValue::Float(2.0)).unwrap();
    layer.set_knob(gate, KnobValue::Integer(8)).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();
    let mut sink = RecordingSink::new();

    layer.tick(&mut sink).unwrap();
    layer.tick(&mut sink).unwrap();
    assert_eq!(sink.messages.len(), 1);
    assert_eq!(layer.pending_note_offs(), 1);
    layer.tick(&mut sink).unwrap();
    assert!(matches!(sink.messages.last(), Some(MidiMessage::NoteOff { note: 12, .. })));
    assert_eq!(layer.pending_note_offs(), 0);
}

#[test]
fn grid_size_is_bounded() {
    let huge = LayerSettings { columns: 70_000, rows: 70_000, ..LayerSettings::default() };
    assert!(matches!(Layer::try_new(huge), Err(EngineError::Malformed(_))));
    let too_tall = LayerSettings { columns: 1, rows: MAX_DIMENSION + 1, ..LayerSettings::default() };
    assert!(Layer::try_new(too_tall).is_err());

    let clamped = Layer::new(too_tall);
    assert_eq!(clamped.rows(), MAX_DIMENSION);
    assert_eq!(clamped.cell_at(0, MAX_DIMENSION - 1).map(CellId::index), Some(MAX_DIMENSION as usize - 1));
}

#[test]
fn restruck_note_is_released_before_it_sounds_again() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = Layer::new(LayerSettings {
        columns: 1,
        rows: 1,
        base_pitch: 60,
        edge_policy: EdgePolicy::Stop,
        seed: 1,
    });
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let duration = layer.tool_knob(cell, NOTE, "duration").unwrap();
    layer.set_knob(duration, KnobValue::Float(1.0)).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();
    let mut sink = RecordingSink::new();

    layer.tick(&mut sink).unwrap();
    let first: Vec<MidiMessage> = sink.messages.drain(..).collect();
    assert!(matches!(first[..], [MidiMessage::NoteOn { note: 60, .. }]));

    for _ in 0..2 {
        layer.tick(&mut sink).unwrap();
        let messages: Vec<MidiMessage> = sink.messages.drain(..).collect();
        assert!(
            matches!(messages[..], [MidiMessage::NoteOff { note: 60, .. }, MidiMessage::NoteOn { note: 60, .. }]),
            "{:?}",
            messages
        );
    }
    assert_eq!(layer.pending_note_offs(), 1);
}

#[test]
fn disabled_layer_only_advances_the_beat() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 3, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();
    let enabled = layer.layer_knob("enabled").unwrap();
    layer.set_knob(enabled, KnobValue::Boolean(false)).unwrap();

    let mut sink = RecordingSink::new();
    layer.tick(&mut sink).unwrap();
    assert!(sink.messages.is_empty());
    assert_eq!(position(&layer), vec![(HexCoord::new(0, 0), Direction::N)]);
    assert_eq!(layer.beat(), 1);
}

#[test]
fn failing_tool_aborts_the_tick() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 2, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();
    let velocity = layer.tool_knob(cell, NOTE, "velocity").unwrap();
    layer.knobs_mut().release(velocity);

    let mut sink = RecordingSink::new();
    let err = layer.tick(&mut sink).unwrap_err();
    assert!(matches!(err, EngineError::MissingKnob(id) if id == velocity));
    assert!(sink.messages.is_empty());
    assert_eq!(layer.tool(cell, NOTE).unwrap().state().gate_count, 0);
}

#[test]
fn subscribers_see_changes() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 2, EdgePolicy::Stop);
    let events = layer.subscribe();
    let from = at(&layer, 0, 0);
    let to = at(&layer, 0, 1);
    layer.add_new_tool(&registry, from, NOTE).unwrap();
    let playhead = layer.add_playhead(from, Direction::N, None).unwrap();
    layer.tick(&mut RecordingSink::new()).unwrap();

    let seen: Vec<LayerEvent> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            LayerEvent::ToolAdded { cell: from, tool_type: NOTE.to_string() },
            LayerEvent::PlayheadSpawned { playhead, cell: from },
            LayerEvent::ToolFired { cell: from, tool_type: NOTE.to_string(), playhead },
            LayerEvent::PlayheadMoved { playhead, from, to },
        ]
    );

    drop(events);
    let velocity = layer.layer_knob("velocity").unwrap();
    layer.set_knob(velocity, KnobValue::Integer(3)).unwrap();
}

#[test]
fn reset_rewinds_and_releases() {
    let registry = ToolRegistry::with_builtins();
    let mut layer = grid(1, 4, EdgePolicy::Stop);
    let cell = at(&layer, 0, 0);
    layer.add_new_tool(&registry, cell, NOTE).unwrap();
    let duration = layer.tool_knob(cell, NOTE, "duration").unwrap();
    layer.set_knob(duration, KnobValue::Float(10.0)).unwrap();
    layer.add_playhead(cell, Direction::N, None).unwrap();
    let mut sink = RecordingSink::new();
    layer.tick(&mut sink).unwrap();

    layer.reset(&mut sink);
    assert_eq!(layer.beat(), 0);
    assert!(layer.playheads().is_empty());
    assert_eq!(layer.pending_note_offs(), 0);
    assert!(matches!(sink.messages.last(), Some(MidiMessage::NoteOff { .. })));
}
