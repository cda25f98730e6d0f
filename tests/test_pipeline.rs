mod common;

use approx::assert_abs_diff_eq;
use common::{constant, sine, smni_csv, write_csv};
use eegfeat::clip::{apply_clip_bounds, fit_clip_bounds, ClipBounds};
use eegfeat::io::{write_assembled, StFile};
use eegfeat::scoring::{predict_features, ClipStatus, LinearScorer};
use eegfeat::{
    analyze_file, build_train_test, extract_features_from_file, extract_features_from_reader,
    extract_features_from_upload, EogStatus, FeatureError, PipelineConfig, SkipReason,
};

#[test]
fn constant_channels_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let csv = smni_csv("a", &[(0, vec![constant("FP1", 1.0, 256), constant("O1", 2.0, 256)])]);
    let path = write_csv(dir.path(), "co2a0000364.csv", &csv);

    let set = extract_features_from_file(&path, &PipelineConfig::default()).unwrap();
    assert_eq!(set.source_file, "co2a0000364.csv");
    assert_eq!(set.label, 1);
    assert_eq!(set.ch_names, ["FP1", "O1"]);
    assert_eq!(set.td_feats, vec![1.0, 0.0, 1.0, 1.0, 2.0, 0.0, 2.0, 2.0]);
    assert_eq!(set.td_cols[4], "td_mean_O1");
    assert_eq!(set.bp_feats.len(), 10);
    assert!(set.bp_feats.iter().all(|p| p.abs() < 1e-10));
    assert_eq!(set.spec_img.dim(), (46, 13));
    assert!(set.spec_img.iter().all(|&v| (v + 12.0).abs() < 1e-3));
    assert_eq!(set.eog, EogStatus::Disabled);
}

#[test]
fn reader_and_file_agree() {
    let dir = tempfile::tempdir().unwrap();
    let csv = smni_csv("c", &[(3, vec![sine("FP1", 10.0, 4.0, 256), sine("CZ", 20.0, 1.0, 256)])]);
    let path = write_csv(dir.path(), "co2c0000337.csv", &csv);
    let cfg = PipelineConfig::default();

    let a = extract_features_from_file(&path, &cfg).unwrap();
    let b = extract_features_from_reader(csv.as_bytes(), "co2c0000337.csv", &cfg).unwrap();
    assert_eq!(a.bp_feats, b.bp_feats);
    assert_eq!(a.trial_number, 3);
    assert_eq!(a.label, 0);
}

#[test]
fn errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "broken.csv", "a,b\n1,2\n");
    let err = extract_features_from_file(&path, &PipelineConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("broken.csv"));
    assert!(matches!(err.downcast_ref::<FeatureError>(), Some(FeatureError::MissingColumn(_))));
}

#[test]
fn every_channel_incomplete_is_degenerate() {
    let csv = smni_csv("a", &[(0, vec![constant("FP1", 1.0, 100)])]);
    let cfg = PipelineConfig::default();
    let err = extract_features_from_reader(csv.as_bytes(), "x.csv", &cfg).unwrap_err();
    assert!(matches!(err.downcast_ref::<FeatureError>(), Some(FeatureError::DegenerateEpoch(0))));
}

#[test]
fn eog_cleaning_reports_status() {
    let blink = |t: usize| 40.0 * (-((t as f32 - 128.0) / 10.0).powi(2) / 2.0).exp();
    let mut fp1 = sine("FP1", 10.0, 1.0, 256);
    let mut fp2 = sine("FP2", 13.0, 1.0, 256);
    for t in 0..256 {
        fp1.values[t] += blink(t);
        fp2.values[t] += 0.8 * blink(t);
    }
    let channels = vec![fp1, fp2, sine("O1", 10.0, 2.0, 256), sine("O2", 23.0, 1.0, 256)];
    let csv = smni_csv("a", &[(0, channels)]);

    let plain =
        extract_features_from_reader(csv.as_bytes(), "x.csv", &PipelineConfig::default()).unwrap();

    // Threshold 0 marks every component.
    let mut cfg = PipelineConfig::default();
    cfg.eog.enabled = true;
    cfg.eog.corr_threshold = 0.0;
    let set = extract_features_from_reader(csv.as_bytes(), "x.csv", &cfg).unwrap();
    assert_eq!(set.eog, EogStatus::Cleaned { n_removed: 4 });
    assert!(set.eog.is_cleaned());
    assert_eq!(set.bp_feats.len(), 20);
    assert_ne!(set.bp_feats, plain.bp_feats);

    // |r| never exceeds 1, so nothing is marked and the epoch is untouched.
    cfg.eog.corr_threshold = 1.5;
    let set = extract_features_from_reader(csv.as_bytes(), "x.csv", &cfg).unwrap();
    assert_eq!(set.eog, EogStatus::Skipped { reason: SkipReason::NoArtifactComponent });
    assert_eq!(set.bp_feats, plain.bp_feats);
    assert_eq!(set.td_feats, plain.td_feats);

    let occipital = vec![sine("O1", 10.0, 1.0, 256), sine("O2", 12.0, 1.0, 256)];
    let no_frontal = smni_csv("a", &[(0, occipital)]);
    let set = extract_features_from_reader(no_frontal.as_bytes(), "y.csv", &cfg).unwrap();
    let json = serde_json::to_value(&set.eog).unwrap();
    assert_eq!(json["status"], "skipped");
    assert_eq!(json["reason"], "no_frontal_channel");
}

#[test]
fn upload_uses_client_file_name() {
    let csv = smni_csv("c", &[(0, vec![constant("FP1", 1.0, 256)])]);
    let cfg = PipelineConfig::default();
    let set = extract_features_from_upload(csv.as_bytes(), "patient_07.csv", &cfg).unwrap();
    assert_eq!(set.source_file, "patient_07.csv");
    assert_eq!(set.label, 0);

    let err = extract_features_from_upload(csv.as_bytes(), "patient_07.edf", &cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeatureError>(),
        Some(FeatureError::UnsupportedUpload(_))
    ));
}

#[test]
fn malformed_upload_error_names_the_upload() {
    let csv = "trial number,sample num,sensor value,subject identifier\n0,0,1.0,a\n";
    let cfg = PipelineConfig::default();
    let err = extract_features_from_upload(csv.as_bytes(), "patient_07.csv", &cfg).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("patient_07.csv"), "{msg}");
    assert!(msg.contains("reading CSV"), "{msg}");
    assert!(matches!(
        err.downcast_ref::<FeatureError>(),
        Some(FeatureError::MissingColumn("channel"))
    ));
}

#[test]
fn analyze_report_matches_features() {
    let dir = tempfile::tempdir().unwrap();
    let csv = smni_csv("a", &[(0, vec![sine("FP1", 10.0, 1.0, 256), sine("O1", 10.0, 3.0, 256)])]);
    let path = write_csv(dir.path(), "co2a0000364.csv", &csv);
    let report = analyze_file(&path, &PipelineConfig::default()).unwrap();
    assert_eq!(report.channels, ["FP1", "O1"]);
    assert_eq!(report.spectrogram.shape, [46, 13]);
    assert_eq!(report.bandpower_top[0].feature, "bp_alpha_O1");
    assert_eq!(report.bandpower_by_band[2].band, "alpha");
}

fn two_channel(dir: &std::path::Path, name: &str, subject: &str, freq: f32) -> std::path::PathBuf {
    let channels = vec![sine("FP1", freq, 1.0, 256), sine("O1", freq, 2.0, 256)];
    let csv = smni_csv(subject, &[(0, channels)]);
    write_csv(dir, name, &csv)
}

#[test]
fn train_test_bundle_to_safetensors_and_scoring() {
    let dir = tempfile::tempdir().unwrap();
    let train = vec![
        two_channel(dir.path(), "t1.csv", "a", 10.0),
        two_channel(dir.path(), "t2.csv", "c", 20.0),
        two_channel(dir.path(), "t3.csv", "a", 6.0),
    ];
    let odd = smni_csv("c", &[(0, vec![sine("CZ", 10.0, 1.0, 256)])]);
    let test = vec![
        two_channel(dir.path(), "s1.csv", "c", 12.0),
        write_csv(dir.path(), "s2.csv", &odd),
    ];

    let cfg = PipelineConfig::default();
    let bundle = build_train_test(&train, &test, &cfg).unwrap();
    assert_eq!(bundle.train.len(), 3);
    assert_eq!(bundle.train.bp.dim(), (3, 10));
    assert_eq!(bundle.train.groups, ["t1.csv", "t2.csv", "t3.csv"]);
    assert_eq!(bundle.test.len(), 1);
    assert_eq!(bundle.test.skipped, 1);
    assert_eq!(bundle.schema.bp_cols[0], "bp_delta_FP1");

    let out = dir.path().join("train.safetensors");
    write_assembled(&bundle.train, &bundle.schema, &out).unwrap();
    let st = StFile::load(&out).unwrap();
    assert_eq!(st.tensor_f32("spec").unwrap().shape(), &[3, 46, 13]);
    assert_eq!(st.tensor_i64("label").unwrap().as_slice().unwrap(), &[1, 0, 1]);
    let bp = st.tensor_f32("bp").unwrap().into_dimensionality::<ndarray::Ix2>().unwrap();
    assert_abs_diff_eq!(bp[[1, 3]], bundle.train.bp[[1, 3]]);
    let cols: Vec<String> = serde_json::from_str(&st.metadata()["bp_cols"]).unwrap();
    assert_eq!(cols, bundle.schema.bp_cols);

    let (lo_q, hi_q) = cfg.clip_quantiles;
    let bounds = fit_clip_bounds(bundle.train.bp.view(), lo_q, hi_q).unwrap();
    let bounds_path = dir.path().join("bp_clip_bounds.json");
    bounds.save(&bounds_path).unwrap();
    let bounds = ClipBounds::load(&bounds_path).unwrap();
    let clipped = apply_clip_bounds(&bundle.test.bp, &bounds).unwrap();
    for (j, v) in clipped.iter().enumerate() {
        let f = j % bounds.n_features();
        assert!(*v >= bounds.lo[f] && *v <= bounds.hi[f]);
    }

    let set = extract_features_from_file(&test[0], &cfg).unwrap();
    let model = LinearScorer { weights: vec![0.0; 10], bias: 1.0 };
    let pred = predict_features(&set, Some(&bounds), &model);
    assert_eq!(pred.label, 1);
    assert_eq!(pred.clip, ClipStatus::Applied);
    assert_abs_diff_eq!(pred.probability, 1.0 / (1.0 + (-1.0f64).exp()), epsilon = 1e-12);
}

#[test]
fn empty_test_split_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let train = vec![two_channel(dir.path(), "t1.csv", "a", 10.0)];
    let odd = smni_csv("c", &[(0, vec![sine("CZ", 10.0, 1.0, 256)])]);
    let test = vec![write_csv(dir.path(), "s.csv", &odd)];
    let err = build_train_test(&train, &test, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeatureError>(),
        Some(FeatureError::EmptyDataset { skipped: 1 })
    ));
}
