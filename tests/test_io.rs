mod common;
use common::{noise, sine, write_csv};
use eegspec::io::{read_column, write_curves_json_path, write_records_csv_path};
use eegspec::{Analysis, ChannelSelector, PipelineConfig, RecordStatus};

fn recording(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let fp1 = sine(1600, 10.0, 1.0, 20.0, 256.0);
    let o2 = noise(1600, 4);
    let rows: Vec<String> = (0..1600)
        .map(|i| match i {
            100..=105 => format!("{i},n/a,{}", o2[i]),
            200 => format!("{i}"),
            _ => format!("{i},{},{}", fp1[i], o2[i]),
        })
        .collect();
    write_csv(dir, "rec.csv", "time,Fp1,O2", &rows)
}

#[test]
fn csv_to_feature_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(&dir);
    let cfg = PipelineConfig { channel: ChannelSelector::Name("fp1".into()), ..Default::default() };

    let col = read_column(&path, &cfg.channel, b',').unwrap();
    assert_eq!(col.name, "Fp1");
    assert_eq!(col.rows, 1600);
    assert_eq!(col.malformed_rows, 1);
    assert_eq!(col.cells.len(), 1599);

    let out = Analysis::prepare(col.name.clone(), &col.cells, &cfg).unwrap().run().unwrap();
    assert_eq!(out.conditioning.non_numeric, 6);
    assert_eq!(out.conditioning.valid, 1593);
    assert_eq!(out.records.len(), 4);
    assert_eq!(out.analyzed_count(), 3);

    let out_path = dir.path().join("features.csv");
    write_records_csv_path(&out_path, &out.records).unwrap();
    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][1], "Fp1");
    assert_eq!(&rows[0][4], "analyzed");
    assert_eq!(&rows[3][4], "insufficient");
    assert_eq!(&rows[3][5], "");
    let mf: f64 = rows[0][5].parse().unwrap();
    assert!((9.0..=11.0).contains(&mf));
}

#[test]
fn curves_json_holds_complete_epochs() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(&dir);
    let cfg = PipelineConfig { channel: ChannelSelector::Index(1), retain_psd: true, ..Default::default() };
    let col = read_column(&path, &cfg.channel, b',').unwrap();
    let out = Analysis::prepare(col.name.clone(), &col.cells, &cfg).unwrap().run().unwrap();

    let json_path = dir.path().join("psd.json");
    write_curves_json_path(&json_path, &out).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(doc["channel"], "Fp1");
    let epochs = doc["epochs"].as_array().unwrap();
    assert_eq!(epochs.len(), 3);
    assert_eq!(epochs[0]["frequencies"].as_array().unwrap().len(), 257);
    assert_eq!(epochs[2]["epoch_index"], 2);
}

#[test]
fn lean_run_has_no_curves_to_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording(&dir);
    let cfg = PipelineConfig { channel: ChannelSelector::Index(1), ..Default::default() };
    let col = read_column(&path, &cfg.channel, b',').unwrap();
    let out = Analysis::prepare(col.name.clone(), &col.cells, &cfg).unwrap().run().unwrap();
    assert!(out.curves.is_empty());
    assert!(write_curves_json_path(&dir.path().join("psd.json"), &out).is_err());
    assert_eq!(out.count(RecordStatus::Insufficient), 1);
}

#[test]
fn config_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(
        &path,
        r#"{ "sample_rate": 128, "epoch_dur": 4, "channel": "O2", "filter": { "cutoff_hz": 1.0, "order": 2 } }"#,
    )
    .unwrap();
    let cfg = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.channel, ChannelSelector::Name("O2".into()));
    assert_eq!(cfg.epoch_samples(), 512);
    assert_eq!(cfg.welch, eegspec::WelchConfig::default());
    approx::assert_abs_diff_eq!(cfg.upper_bound, 30.0);
    cfg.validate().unwrap();

    assert!(PipelineConfig::from_json_file(&dir.path().join("missing.json")).is_err());
}
