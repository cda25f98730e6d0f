mod common;

use common::{sine, smni_csv};
use eegfeat::clip::{apply_clip_bounds, fit_clip_bounds};
use eegfeat::dataset::{Admission, Assembler};
use eegfeat::spectral::{bandpower, Psd};
use eegfeat::{
    apply_eog, build_epoch_matrix, extract_feature_set, read_long_table, Band, EogStatus,
    EpochMatrix, EpochSelection, FeatureSchema, PipelineConfig, SchemaMismatch,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn epochs_are_dense_for_scattered_gaps() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let channels = vec![
            sine("FP1", 10.0, 1.0, 256),
            sine("CZ", 4.0, 2.0, 256),
            sine("O1", 30.0, 1.0, 256),
        ];
        let csv = smni_csv("a", &[(0, channels)]);
        // Drop about 2 % of the rows at random.
        let thinned: String = csv
            .lines()
            .enumerate()
            .filter(|&(i, _)| i == 0 || rng.random_range(0.0..1.0) > 0.02)
            .map(|(_, l)| format!("{l}\n"))
            .collect();
        let table = read_long_table(thinned.as_bytes(), "x.csv").unwrap();
        let epoch = build_epoch_matrix(&table, &EpochSelection::default(), 256, 0.05).unwrap();
        assert_eq!(epoch.n_samples(), 256);
        assert!(epoch.data.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn bandpower_is_non_negative() {
    let mut rng = StdRng::seed_from_u64(11);
    let freqs: Vec<f32> = (0..65).map(|k| 2.0 * k as f32).collect();
    for _ in 0..50 {
        let power = Array2::from_shape_fn((4, 65), |_| rng.random_range(0.0..10.0f32));
        let psd = Psd { freqs: freqs.clone(), power };
        let lo = rng.random_range(0.0..100.0f32);
        let hi = lo + rng.random_range(0.0..30.0f32);
        for p in bandpower(&psd, &Band::new("b", lo, hi)) {
            assert!(p >= 0.0);
        }
    }
}

#[test]
fn clipping_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(3);
    let x = Array2::from_shape_fn((100, 6), |_| rng.random_range(-50.0..50.0f32));
    let b = fit_clip_bounds(x.view(), 0.01, 0.99).unwrap();
    let once = apply_clip_bounds(&x, &b).unwrap();
    assert_eq!(apply_clip_bounds(&once, &b).unwrap(), once);
}

#[test]
fn no_frontal_channel_leaves_epoch_untouched() {
    let data = Array2::from_shape_fn((3, 256), |(c, t)| ((c * 7 + t * 13) % 29) as f32 - 14.0);
    let mut epoch = EpochMatrix {
        data: data.clone(),
        ch_names: vec!["C3".into(), "O1".into(), "O2".into()],
        trial_number: 0,
        label: 1,
        source_file: "x.csv".into(),
    };
    let mut cfg = PipelineConfig::default();
    cfg.eog.enabled = true;
    assert!(matches!(apply_eog(&mut epoch, &cfg), EogStatus::Skipped { .. }));
    assert_eq!(epoch.data, data);
}

fn single_channel(name: &str) -> EpochMatrix {
    EpochMatrix {
        data: Array2::from_shape_fn((1, 256), |(_, t)| (t as f32 * 0.2).sin()),
        ch_names: vec!["CZ".into()],
        trial_number: 0,
        label: 0,
        source_file: name.into(),
    }
}

#[test]
fn extra_bandpower_column_is_skipped() {
    let base = PipelineConfig::default();
    let mut wider = PipelineConfig::default();
    wider.bands.push(Band::new("sigma", 12.0, 16.0));

    let first = extract_feature_set(single_channel("f1.csv"), &base).unwrap();
    let second = extract_feature_set(single_channel("f2.csv"), &wider).unwrap();
    assert_eq!(second.bp_cols.len(), first.bp_cols.len() + 1);

    let mut asm = Assembler::new(None::<FeatureSchema>);
    assert_eq!(asm.push(first), Admission::Accepted);
    assert_eq!(asm.push(second), Admission::Skipped(SchemaMismatch::BpColumns));
    let (set, _) = asm.finish().unwrap();
    assert_eq!(set.groups, ["f1.csv"]);
    assert_eq!(set.skipped, 1);
}
