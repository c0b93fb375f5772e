//! Integration tests for the coeval pipeline.
//!
//! These tests drive the public API of every crate against files written to
//! a scratch directory:
//! Write fixtures → Load → Binarize → Classify or Assemble → Verify

use coeval_halos::classify::{GT_IONIZED_HALO_COORDS, PRED_NEUTRAL_HALO_MASSES};
use coeval_halos::{classify, occupancy_batch, ClassificationResult, GridConfig, OccupancyField};
use coeval_store::dataset::{
    BRIGHTNESS_TEMP_BOXES, IONIZED_BOXES, PREDICTED_BRIGHTNESS_TEMP_BOXES, REDSHIFTS,
    WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
};
use coeval_store::{load, save, CoevalDataset, Container, LoadOptions, StoreError};
use coeval_tests::{random_catalog, slab_field, SyntheticBox, TestHarness};
use coeval_tools::sort::sort_halos;
use coeval_tools::training_set::make_training_set;
use indexmap::IndexMap;
use ndarray::{Array1, Array4, ArrayD};

fn grid() -> GridConfig {
    GridConfig {
        box_len: 16,
        hii_dim: 8,
        dim: 24,
    }
}

/// Saving then loading returns the same arrays and attributes.
#[test]
fn test_save_load_round_trip() {
    let harness = TestHarness::new(grid());
    let path = harness.path("redshifts.cbx");

    let mut data: IndexMap<String, ArrayD<f32>> = IndexMap::new();
    data.insert(
        "redshifts".to_string(),
        Array1::from(vec![6.0f32, 7.0, 8.0]).into_dyn(),
    );
    let mut attrs = IndexMap::new();
    attrs.insert("seed".to_string(), 42);

    save(&path, &data, &attrs).unwrap();

    let container = load(&path).unwrap();
    assert_eq!(container.array_f32("redshifts").unwrap(), data["redshifts"]);
    assert_eq!(container.attr("seed"), Some("42"));
}

/// A dataset without `ionized_boxes` is rejected with the missing key named.
#[test]
fn test_missing_ionized_boxes_is_reported() {
    let harness = TestHarness::new(grid());
    let boxes = Array4::<f32>::zeros((1, 8, 8, 8));
    let path = harness.write_container(
        "partial.cbx",
        &Container::new()
            .with_array(BRIGHTNESS_TEMP_BOXES, boxes.clone())
            .with_array(WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES, boxes.clone())
            .with_array(PREDICTED_BRIGHTNESS_TEMP_BOXES, boxes)
            .with_array(REDSHIFTS, vec![7.0f32]),
    );

    match CoevalDataset::load(&path) {
        Err(StoreError::MissingKeys(keys)) => assert_eq!(keys, vec![IONIZED_BOXES]),
        other => panic!("expected MissingKeys, got {other:?}"),
    }
}

/// NaN values fail strict loading and pass lenient loading.
#[test]
fn test_nan_values_fail_strict_load() {
    let harness = TestHarness::new(grid());
    let mut field = slab_field(8, 4);
    field[[1, 2, 3]] = f32::NAN;
    let path = harness.write_coeval_dataset(
        "nan.cbx",
        &[SyntheticBox {
            redshift: 7.0,
            seed: 1,
            ground_truth: slab_field(8, 4),
            predicted: field,
        }],
    );

    match CoevalDataset::load(&path) {
        Err(StoreError::Validation(msg)) => {
            assert!(msg.contains(PREDICTED_BRIGHTNESS_TEMP_BOXES))
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let lenient = LoadOptions {
        strict: false,
        ..LoadOptions::default()
    };
    let dataset = CoevalDataset::load_with(&path, &lenient).unwrap();
    assert_eq!(dataset.len(), 1);

    // NaN binarizes to ionized.
    let predicted = dataset.predicted_brightness_temp_boxes().unwrap();
    let occupancy = occupancy_batch(predicted, 0.9).unwrap();
    assert_eq!(occupancy[0].is_neutral([1, 2, 3]), Some(false));
}

/// Every halo lands in exactly one predicted and one ground-truth subset,
/// and each subset agrees with its own field.
#[test]
fn test_classification_partitions_every_halo() {
    let catalog = random_catalog(7, 500, 24);
    let scale = grid().scale().unwrap();
    let ground_truth = OccupancyField::from_probabilities(&slab_field(8, 4), 0.9);
    let predicted = OccupancyField::from_probabilities(&slab_field(8, 6), 0.9);

    let result = classify(&catalog, &ground_truth, &predicted, scale).unwrap();

    assert_eq!(result.pred_neutral.len() + result.pred_ionized.len(), 500);
    assert_eq!(result.gt_neutral.len() + result.gt_ionized.len(), 500);

    let total: f64 = catalog.masses().iter().sum();
    let pred_total = result.pred_neutral.total_mass() + result.pred_ionized.total_mass();
    let gt_total = result.gt_neutral.total_mass() + result.gt_ionized.total_mass();
    assert!((pred_total - total).abs() <= total * 1e-12);
    assert!((gt_total - total).abs() <= total * 1e-12);

    assert!(result.pred_neutral.coords().iter().all(|c| c[0] < 6));
    assert!(result.pred_ionized.coords().iter().all(|c| c[0] >= 6));
    assert!(result.gt_neutral.coords().iter().all(|c| c[0] < 4));
    assert!(result.gt_ionized.coords().iter().all(|c| c[0] >= 4));

    // Catalog order is preserved within each subset.
    let expected: Vec<f64> = catalog
        .coords()
        .iter()
        .zip(catalog.masses())
        .filter(|(coord, _)| coord[0] / scale < 6)
        .map(|(_, &mass)| mass)
        .collect();
    assert_eq!(result.pred_neutral.masses(), expected.as_slice());
}

/// A pipeline document drives halo sorting from dataset and cache to
/// classification files.
#[test]
fn test_sort_halos_pipeline() {
    let harness = TestHarness::new(grid());
    harness.write_coeval_dataset(
        "coeval_boxes.cbx",
        &[
            SyntheticBox {
                redshift: 7.0,
                seed: 33255,
                ground_truth: slab_field(8, 8),
                predicted: slab_field(8, 0),
            },
            SyntheticBox {
                redshift: 8.5,
                seed: 727602,
                ground_truth: slab_field(8, 4),
                predicted: slab_field(8, 4),
            },
        ],
    );
    harness.write_halo_field("cache/a.cbx", 7.0, 33255, random_catalog(1, 50, 24));
    harness.write_halo_field("cache/b.cbx", 8.5, 727602, random_catalog(2, 80, 24));
    harness.write_halo_field("cache/c.cbx", 8.5, 33255, random_catalog(3, 10, 24));

    let yaml = format!(
        r#"
apiVersion: coeval/v1
kind: Pipeline
metadata:
  name: uhf_false
grid: {{ boxLen: 16, hiiDim: 8, dim: 24 }}
classify:
  dataset: {root}/coeval_boxes.cbx
  halos: {root}/cache
  output: {root}/sorted
"#,
        root = harness.root().display()
    );
    let config = harness.write_pipeline("pipeline.yaml", &yaml);

    let report = sort_halos(&config).unwrap();
    assert_eq!(report.classified.len(), 2);
    assert_eq!(report.skipped, vec![harness.path("cache/c.cbx")]);

    // Fully neutral ground truth, fully ionized prediction.
    let first =
        ClassificationResult::load(harness.path("sorted/uhf_false_z_7_rseed_33255_halos.cbx"))
            .unwrap();
    assert_eq!(first.gt_neutral.len(), 50);
    assert_eq!(first.pred_ionized.len(), 50);
    assert!(first.gt_ionized.is_empty());

    // Identical fields give identical partitions.
    let second_path = harness.path("sorted/uhf_false_z_8.5_rseed_727602_halos.cbx");
    let second = ClassificationResult::load(&second_path).unwrap();
    assert_eq!(second.gt_neutral, second.pred_neutral);
    assert_eq!(second.gt_ionized, second.pred_ionized);
    assert_eq!(second.total_halos(), 80);

    let raw = Container::load(&second_path).unwrap();
    assert_eq!(raw.attr("random_seed"), Some("727602"));
    assert_eq!(raw.array(GT_IONIZED_HALO_COORDS).unwrap().shape()[1], 3);
    assert!(raw.contains_key(PRED_NEUTRAL_HALO_MASSES));
}

/// A seed-exclusive training set can be reloaded and every box located by
/// its redshift and seed.
#[test]
fn test_training_set_pipeline() {
    let harness = TestHarness::new(grid());
    let redshifts = [6.0f32, 7.0, 8.0, 9.0];
    let inputs: Vec<String> = [50u64, 100, 150, 200]
        .iter()
        .map(|&seed| {
            let path = harness.write_simulation(format!("rseed_{seed}.cbx"), seed, &redshifts);
            format!("    - {{ path: {}, seed: {seed} }}", path.display())
        })
        .collect();

    let yaml = format!(
        r#"
apiVersion: coeval/v1
kind: Pipeline
metadata:
  name: rseed_exclusive
grid: {{ boxLen: 16, hiiDim: 8, dim: 24 }}
trainingSet:
  inputs:
{inputs}
  output: {root}/training.cbx
  mode: seedExclusive
  boxesPerSeed: 2
  numTrain: 6
"#,
        inputs = inputs.join("\n"),
        root = harness.root().display()
    );
    let config = harness.write_pipeline("pipeline.yaml", &yaml);

    let report = make_training_set(&config).unwrap();
    assert_eq!(report.boxes, 8);
    assert_eq!(report.num_train, 6);

    let dataset =
        CoevalDataset::load_with(harness.path("training.cbx"), &LoadOptions::simulation()).unwrap();
    assert_eq!(dataset.len(), 8);

    let seeds = dataset.random_seeds().unwrap();
    assert!(seeds[6..].iter().all(|&s| s == 200));

    let redshift_values: Vec<f32> = dataset.redshifts().unwrap().to_vec();
    let ionized = dataset.ionized_boxes().unwrap();
    for (i, (&z, &seed)) in redshift_values.iter().zip(&seeds).enumerate() {
        assert_eq!(dataset.box_index(z, seed).unwrap(), Some(i));
        let expected = seed as f32 * 100.0 + z;
        assert!(ionized
            .index_axis(ndarray::Axis(0), i)
            .iter()
            .all(|&v| v == expected));
    }
}
