use sensor_liveplot::data::export::*;
use sensor_liveplot::data::resample::nearest_by_time;
use sensor_liveplot::{BufferSnapshot, Channel, IngestError, SeriesPoint};

fn point(t: f64, temperature: f64, humidity: f64) -> SeriesPoint {
    SeriesPoint {
        t,
        temperature,
        humidity,
    }
}

fn sample_snapshot() -> BufferSnapshot {
    let mut s = BufferSnapshot::default();
    for i in 0..40 {
        let t = i as f64 * 0.25 + 0.1;
        s.inlet.push(point(t, 20.0 + i as f64 * 0.1, 40.0 + i as f64 * 0.05));
    }
    for i in 0..30 {
        let t = i as f64 * 0.33 + 0.2;
        s.outlet.push(point(t, 25.0 - i as f64 * 0.1, 60.0 - i as f64 * 0.2));
    }
    s
}

#[test]
fn export_then_import_reproduces_tuples() {
    let layout = ExportLayout::default();
    let original = sample_snapshot();
    let rows = build_export_rows(&original, 0.30);

    let mut buf = Vec::new();
    write_export_csv(&mut buf, &layout, &rows).unwrap();
    let imported = read_static_csv(buf.as_slice(), &layout, 0.25).unwrap();

    for channel in Channel::ALL {
        let orig = original.channel(channel);
        let back = imported.channel(channel);
        assert!(back.len() >= orig.len(), "{channel}: lost points");
        for p in orig.points() {
            // Export times are truncated to whole milliseconds.
            let temp = nearest_by_time(&back.t, &back.temperature, p.t, 0.002).unwrap();
            let hum = nearest_by_time(&back.t, &back.humidity, p.t, 0.002).unwrap();
            assert!((temp - p.temperature).abs() < 5e-4, "{channel} t={}", p.t);
            assert!((hum - p.humidity).abs() < 5e-4, "{channel} t={}", p.t);
        }
        // Every re-imported point lies within tolerance of an original one.
        for p in back.points() {
            assert!(nearest_by_time(&orig.t, &orig.temperature, p.t, 0.30 + 0.001).is_some());
        }
    }
}

#[test]
fn save_refuses_empty_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    let err = save_export_csv(&path, &ExportLayout::default(), &[]).unwrap_err();
    assert!(matches!(err, IngestError::EmptyExport));
    assert!(!path.exists());
}

#[test]
fn saved_file_loads_as_static_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    let layout = ExportLayout::new("Sensor at inlet point", "Sensor at outlet point");
    let mut s = BufferSnapshot::default();
    s.inlet.push(point(0.0, 21.0, 45.0));
    s.inlet.push(point(0.35 - 0.1, 21.5, 45.5));
    let rows = build_export_rows(&s, 0.30);
    save_export_csv(&path, &layout, &rows).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("00:00.250,21.500,45.500,,"));

    let loaded = load_static_csv(&path, &layout, 0.25).unwrap();
    assert_eq!(loaded.inlet.t, vec![0.0, 0.25]);
    assert!(loaded.outlet.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_static_csv(&dir.path().join("nope.csv"), &ExportLayout::default(), 0.25).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}
