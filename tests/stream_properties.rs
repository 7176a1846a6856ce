//! Behavioural properties of the CSV stream driver, exercised through its public API.

use csv_stream_daq::adapters::MockLineAdapter;
use csv_stream_daq::capabilities::WaveformSource;
use csv_stream_daq::{CsvStreamInstrument, Unit, WaveformKind};

fn scope_with(lines: &[&str]) -> (CsvStreamInstrument, MockLineAdapter) {
    let transport = MockLineAdapter::with_lines(lines.iter().copied());
    let feeder = transport.clone();
    (CsvStreamInstrument::new(Box::new(transport)), feeder)
}

fn acquire_all(scope: &CsvStreamInstrument, feeder: &MockLineAdapter) {
    while feeder.pending_lines() > 0 {
        scope.acquire_data().unwrap();
    }
}

#[test]
fn lines_without_marker_change_nothing() {
    let noise = [
        "",
        "   ",
        "boot: clocks ok",
        "CSV without dash",
        "csv-data,1,2",
        "ADC,CSV_DATA,1,2",
    ];
    let (scope, feeder) = scope_with(&noise);
    acquire_all(&scope, &feeder);

    assert_eq!(scope.pending_count(), 0);
    for (i, channel) in scope.channels().iter().enumerate() {
        assert_eq!(channel.display_name(), format!("CH{}", i + 1));
        assert_eq!(channel.y_unit(0), Unit::Volts);
        assert!(channel.waveform(0).is_none());
    }
}

#[test]
fn names_and_units_apply_positionally() {
    let (scope, feeder) = scope_with(&["CSV-NAME,A,B", "CSV-UNIT,V,A"]);
    acquire_all(&scope, &feeder);

    let ch = scope.channels();
    assert_eq!(ch[0].display_name(), "A");
    assert_eq!(ch[0].y_unit(0), Unit::Volts);
    assert_eq!(ch[1].display_name(), "B");
    assert_eq!(ch[1].y_unit(0), Unit::Amps);
    assert_eq!(ch[2].display_name(), "CH3");
    assert_eq!(ch[2].y_unit(0), Unit::Volts);
    assert_eq!(ch[3].display_name(), "CH4");
    assert_eq!(ch[3].y_unit(0), Unit::Volts);
}

#[test]
fn prefix_noise_before_marker_is_discarded() {
    let (scope, feeder) = scope_with(&["[00:01.234] <info> CSV-NAME,Temp"]);
    acquire_all(&scope, &feeder);
    assert_eq!(scope.channels()[0].display_name(), "Temp");
}

#[test]
fn data_row_produces_one_sample_set() {
    let (scope, feeder) = scope_with(&["CSV-DATA,1000,1.5,2.5"]);
    acquire_all(&scope, &feeder);
    assert_eq!(scope.pending_count(), 1);

    assert!(scope.pop_pending_waveform());
    let ch = scope.channels();

    let first = ch[0].waveform(0).unwrap();
    assert_eq!(first.kind(), WaveformKind::SparseAnalog);
    assert_eq!(first.offsets(), &[1000]);
    assert_eq!(first.durations(), &[1]);
    assert_eq!(first.samples(), &[1.5]);

    let second = ch[1].waveform(0).unwrap();
    assert_eq!(second.offsets(), &[1000]);
    assert_eq!(second.samples(), &[2.5]);

    assert!(ch[2].waveform(0).is_none());
    assert!(ch[3].waveform(0).is_none());
}

#[test]
fn unparseable_timestamp_drops_row() {
    let (scope, feeder) = scope_with(&["CSV-DATA,abc,1.5"]);
    acquire_all(&scope, &feeder);
    assert_eq!(scope.pending_count(), 0);
    assert!(!scope.pop_pending_waveform());
}

#[test]
fn first_delivery_replaces_then_streaming_appends() {
    let (scope, feeder) = scope_with(&["CSV-DATA,10,1.0,2.0", "CSV-DATA,20,1.1,2.1"]);
    acquire_all(&scope, &feeder);
    assert!(!scope.is_appending_to_waveform());

    assert!(scope.pop_pending_waveform());
    assert!(scope.is_appending_to_waveform());
    let ch0 = &scope.channels()[0];
    assert_eq!(ch0.sample_count(0), 1);
    let revision = ch0.waveform(0).unwrap().revision();

    assert!(scope.pop_pending_waveform());
    let wfm = ch0.waveform(0).unwrap();
    assert_eq!(wfm.len(), 2);
    assert_eq!(wfm.offsets(), &[10, 20]);
    assert_eq!(wfm.revision(), revision + 1);
    assert!(wfm.is_modified());
    assert_eq!(scope.channels()[1].sample_count(0), 2);
}

#[test]
fn empty_queue_delivers_nothing() {
    let (scope, feeder) = scope_with(&["CSV-DATA,10,1.0"]);
    acquire_all(&scope, &feeder);
    assert!(scope.pop_pending_waveform());
    let before = scope.channels()[0].waveform(0).unwrap();

    assert!(!scope.pop_pending_waveform());
    let after = scope.channels()[0].waveform(0).unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(after.revision(), before.revision());
}

#[test]
fn empty_queue_before_any_delivery_keeps_replace_mode() {
    let (scope, _feeder) = scope_with(&[]);
    assert!(!scope.pop_pending_waveform());
    assert!(!scope.is_appending_to_waveform());
}

#[test]
fn k_sets_deliver_in_enqueue_order() {
    const K: i64 = 64;
    let lines: Vec<String> = (0..K).map(|i| format!("CSV-DATA,{},{}", i * 1_000, i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (scope, feeder) = scope_with(&refs);
    acquire_all(&scope, &feeder);
    assert_eq!(scope.pending_count(), K as usize);

    for _ in 0..K {
        assert!(scope.pop_pending_waveform());
    }
    assert!(!scope.pop_pending_waveform());

    let wfm = scope.channels()[0].waveform(0).unwrap();
    assert_eq!(wfm.len(), K as usize);
    let expected: Vec<i64> = (0..K).map(|i| i * 1_000).collect();
    assert_eq!(wfm.offsets(), expected.as_slice());
    assert_eq!(wfm.last(), Some(((K - 1) * 1_000, 1, (K - 1) as f32)));
}

#[test]
fn channels_untouched_by_a_row_keep_their_waveform() {
    let (scope, feeder) =
        scope_with(&["CSV-DATA,1,1.0,1.0", "CSV-DATA,2,2.0", "CSV-DATA,3,3.0,3.0"]);
    acquire_all(&scope, &feeder);
    while scope.pop_pending_waveform() {}

    assert_eq!(scope.channels()[0].sample_count(0), 3);
    assert_eq!(scope.channels()[1].waveform(0).unwrap().offsets(), &[1, 3]);
}

#[test]
fn values_beyond_channel_count_are_ignored() {
    let (scope, feeder) = scope_with(&["CSV-DATA,1,1,2,3,4,5,6"]);
    acquire_all(&scope, &feeder);
    assert_eq!(scope.pending_count(), 1);

    assert!(scope.pop_pending_waveform());
    assert_eq!(scope.channel_count(), 4);
    let values: Vec<f32> = scope
        .channels()
        .iter()
        .map(|c| c.waveform(0).unwrap().samples()[0])
        .collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn units_beyond_channel_count_are_ignored() {
    let (scope, feeder) = scope_with(&["CSV-UNIT,V,A,W,Hz,%"]);
    acquire_all(&scope, &feeder);

    assert_eq!(scope.channel_count(), 4);
    let units: Vec<Unit> = scope.channels().iter().map(|c| c.y_unit(0)).collect();
    assert_eq!(units, vec![Unit::Volts, Unit::Amps, Unit::Watts, Unit::Hertz]);
}
