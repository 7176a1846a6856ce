//! End-to-end acquisition: producer and consumer threads, file replay, session restore.

use csv_stream_daq::adapters::{MockLineAdapter, ReaderAdapter};
use csv_stream_daq::capabilities::{TriggerControl, WaveformSource};
use csv_stream_daq::session::{load_session, save_session, IdTable, InstrumentSession};
use csv_stream_daq::{CsvStreamInstrument, DaqError, Unit};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ROWS: usize = 2_000;

#[test]
fn producer_and_consumer_threads_preserve_order() {
    let transport = MockLineAdapter::new();
    let feeder = transport.clone();
    let scope = Arc::new(CsvStreamInstrument::new(Box::new(transport)));
    scope.start();

    let producer_done = Arc::new(AtomicBool::new(false));

    let producer = {
        let scope = Arc::clone(&scope);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || {
            let result = loop {
                if let Err(e) = scope.acquire_data() {
                    break e;
                }
            };
            done.store(true, Ordering::SeqCst);
            result
        })
    };

    let consumer = {
        let scope = Arc::clone(&scope);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || {
            let mut delivered = 0usize;
            loop {
                if scope.pop_pending_waveform() {
                    delivered += 1;
                } else if done.load(Ordering::SeqCst) && scope.pending_count() == 0 {
                    break delivered;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    feeder.push_line("CSV-NAME,ramp,square");
    feeder.push_line("CSV-UNIT,V,A");
    for i in 0..ROWS {
        feeder.push_line(format!("CSV-DATA,{},{},{}m", i * 10, i, i % 2));
        if i % 250 == 0 {
            feeder.push_line("debug: still alive");
        }
    }
    feeder.close();

    let producer_err = producer.join().unwrap();
    assert!(matches!(producer_err, DaqError::TransportClosed));
    let delivered = consumer.join().unwrap();
    assert_eq!(delivered, ROWS);

    let ramp = scope.channel(0).unwrap();
    assert_eq!(ramp.display_name(), "ramp");
    let wfm = ramp.waveform(0).unwrap();
    assert_eq!(wfm.len(), ROWS);
    assert!(wfm.offsets().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(wfm.revision() as usize, ROWS - 1);

    let square = scope.channel(1).unwrap();
    assert_eq!(square.y_unit(0), Unit::Amps);
    assert!((square.waveform(0).unwrap().samples()[1] - 0.001).abs() < 1e-6);
}

#[test]
fn replay_capture_file_until_closed() {
    let mut capture = tempfile::NamedTempFile::new().unwrap();
    writeln!(capture, "*** reset ***").unwrap();
    writeln!(capture, "CSV-NAME,Vin,Vout,Iout").unwrap();
    writeln!(capture, "CSV-UNIT,V,V,A").unwrap();
    for i in 0..10i64 {
        writeln!(capture, "CSV-DATA,{},12.0,3.3,{}m\r", i * 1_000_000_000, 100 + i).unwrap();
    }
    write!(capture, "CSV-DATA,10000000000,12.1,3.31,110m").unwrap();
    capture.flush().unwrap();

    let scope = CsvStreamInstrument::new(Box::new(ReaderAdapter::open(capture.path()).unwrap()));
    let err = loop {
        if let Err(e) = scope.acquire_data() {
            break e;
        }
    };
    assert!(matches!(err, DaqError::TransportClosed));
    assert!(!err.can_recover());
    assert_eq!(scope.pending_count(), 11);

    while scope.pop_pending_waveform() {}

    let iout = scope.channel(2).unwrap();
    assert_eq!(iout.display_name(), "Iout");
    let wfm = iout.waveform(0).unwrap();
    assert_eq!(wfm.len(), 11);
    assert!((wfm.samples()[10] - 0.110).abs() < 1e-6);
    assert!(scope.channel(3).unwrap().waveform(0).is_none());
}

#[test]
fn restored_session_channels_receive_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scope.yml");

    let original = CsvStreamInstrument::new(Box::new(MockLineAdapter::new()));
    let mut session = InstrumentSession::from_instrument(&original, 40);
    session.channels.insert(
        "ch5".to_string(),
        csv_stream_daq::session::SessionChannel { index: 5, id: 90 },
    );
    save_session(&session, &path).unwrap();

    let transport = MockLineAdapter::with_lines(["CSV-DATA,5,0,1,2,3,4,5"]);
    let mut scope = CsvStreamInstrument::new(Box::new(transport));
    let mut ids = IdTable::new();
    load_session(&path).unwrap().preload(&mut scope, &mut ids).unwrap();
    assert_eq!(scope.channel_count(), 6);
    assert_eq!(ids.len(), 5);

    scope.acquire_data().unwrap();
    assert!(scope.pop_pending_waveform());

    let sixth = ids.get(90).unwrap();
    assert_eq!(sixth.hwname(), "CH6");
    assert_eq!(sixth.waveform(0).unwrap().samples(), &[5.0]);
    assert_eq!(scope.channel(4).unwrap().sample_count(0), 1);
}

#[test]
fn stop_halts_a_trigger_gated_producer() {
    let transport = MockLineAdapter::new();
    let scope = Arc::new(CsvStreamInstrument::new(Box::new(transport)));
    scope.start();

    let producer = {
        let scope = Arc::clone(&scope);
        thread::spawn(move || {
            let mut reads = 0u64;
            while scope.is_trigger_armed() {
                scope.acquire_data().unwrap();
                reads += 1;
            }
            reads
        })
    };

    thread::sleep(Duration::from_millis(20));
    scope.stop();
    assert!(producer.join().unwrap() > 0);
}
