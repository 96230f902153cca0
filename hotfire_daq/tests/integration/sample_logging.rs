//! Integration test: CSV sample log written by the acquisition loop.

use super::{frame_at, Rig};
use hotfire_daq::sample_log::{next_log_path, CsvSampleLog, SampleSink};
use hotfire_common::types::Sample;

#[test]
fn loop_writes_header_and_rows() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    rig.sim.queue_frames(vec![frame_at(50.0), frame_at(75.0), frame_at(80.0)], 0);
    rig.core.run_cycle();
    rig.core.shutdown().unwrap();

    let path = rig.config.general.data_dir.join("test_data_001.csv");
    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "Time (s),thermo_1,pres_1,load_1");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "0,20,50,0");
    assert!(lines[3].starts_with("0.00667,20,80,"));
}

#[test]
fn next_run_gets_next_number() {
    let rig = Rig::new();
    let dir = &rig.config.general.data_dir;
    assert_eq!(next_log_path(dir).unwrap(), dir.join("test_data_002.csv"));

    let columns = rig.config.log_columns();
    let mut second = CsvSampleLog::create(dir, &columns).unwrap();
    assert_eq!(second.path(), dir.join("test_data_002.csv"));

    let narrow = Sample {
        sequence: 0,
        time_s: 0.0,
        values: vec![1.0],
    };
    assert!(second.append(&[narrow]).is_err());
    assert_eq!(second.rows(), 0);
    second.flush().unwrap();
}

#[test]
fn devices_generate_data_without_script() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    for _ in 0..5 {
        let report = rig.core.run_cycle();
        assert_eq!(report.frames, 1);
        assert!(report.logged);
    }
    assert_eq!(rig.core.total_samples(), 5);
    rig.core.shutdown().unwrap();

    let content =
        std::fs::read_to_string(rig.config.general.data_dir.join("test_data_001.csv")).unwrap();
    assert_eq!(content.lines().count(), 6);
}
