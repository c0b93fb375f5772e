//! Training-set assembly.
//!
//! Merges the boxes of several simulation outputs into one container:
//!
//! - [`AssemblyMode::Shuffled`] takes every box of every input. Each input's
//!   redshift order is shuffled with an RNG seeded by the input's seed.
//! - [`AssemblyMode::SeedExclusive`] draws `boxes_per_seed` boxes from each
//!   input without replacement. The first `num_train` boxes form the training
//!   split and the rest the validation split. Inputs are consumed in order, so
//!   when `num_train` is a multiple of `boxes_per_seed` no simulation seed
//!   appears in both splits. Each split is shuffled with its own seed.

use std::path::Path;

use coeval_halos::GridConfig;
use coeval_store::dataset::{
    BRIGHTNESS_TEMP_BOXES, IONIZED_BOXES, RANDOM_SEEDS, REDSHIFTS,
    WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
};
use coeval_store::{CoevalDataset, Container, LoadOptions};
use indexmap::IndexMap;
use ndarray::{ArrayD, ArrayView, Axis, IxDyn};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{AssemblyMode, PipelineConfig, TrainingInput, TrainingSetConfig};
use crate::error::{PipelineError, Result};

/// Attribute describing the grid the boxes were simulated on.
pub const INITIAL_CONDITIONS: &str = "p21c_initial_conditions";

const BOX_KEYS: [&str; 3] = [
    BRIGHTNESS_TEMP_BOXES,
    IONIZED_BOXES,
    WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
];

/// Summary of an assembled training set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSetReport {
    pub boxes: usize,
    pub num_train: usize,
    /// `(redshift, count)` in the training split, by increasing redshift.
    pub train_redshifts: Vec<(f32, usize)>,
    /// `(redshift, count)` in the validation split, by increasing redshift.
    pub val_redshifts: Vec<(f32, usize)>,
}

/// Boxes drawn so far, per key, plus their redshifts and seeds.
struct Selection {
    boxes: IndexMap<&'static str, Vec<ArrayD<f32>>>,
    redshifts: Vec<f32>,
    seeds: Vec<i64>,
}

impl Selection {
    fn new() -> Self {
        Self {
            boxes: BOX_KEYS.iter().map(|&key| (key, Vec::new())).collect(),
            redshifts: Vec::new(),
            seeds: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.redshifts.len()
    }

    fn take(
        &mut self,
        dataset: &CoevalDataset,
        input: &TrainingInput,
        order: &[usize],
    ) -> Result<()> {
        let seed = i64::try_from(input.seed).map_err(|_| {
            PipelineError::InvalidConfig(format!("seed {} out of range", input.seed))
        })?;
        let redshifts = dataset.redshifts()?;

        for (&key, selected) in self.boxes.iter_mut() {
            let array = dataset.array(key)?;
            selected.extend(order.iter().map(|&i| array.index_axis(Axis(0), i).to_owned()));
        }
        self.redshifts.extend(order.iter().map(|&i| redshifts[i]));
        self.seeds.extend(std::iter::repeat(seed).take(order.len()));
        Ok(())
    }

    /// Stack the selection in `order` into a container.
    fn into_container(self, order: &[usize], grid: &GridConfig) -> Result<Container> {
        let mut stacked = IndexMap::new();
        for (key, selected) in &self.boxes {
            let views: Vec<ArrayView<'_, f32, IxDyn>> =
                order.iter().map(|&i| selected[i].view()).collect();
            let array = ndarray::stack(Axis(0), &views)
                .map_err(|e| PipelineError::ShapeMismatch(format!("stacking '{key}': {e}")))?;
            stacked.insert(*key, array);
        }

        let mut container =
            Container::new().with_attr(INITIAL_CONDITIONS, initial_conditions(grid));
        for (key, array) in stacked {
            container.insert_array(key, array);
            if key == IONIZED_BOXES {
                let redshifts: Vec<f32> = order.iter().map(|&i| self.redshifts[i]).collect();
                container.insert_array(REDSHIFTS, redshifts);
            }
        }
        let seeds: Vec<i64> = order.iter().map(|&i| self.seeds[i]).collect();
        container.insert_array(RANDOM_SEEDS, seeds);
        Ok(container)
    }
}

/// `p21c_initial_conditions` value for `grid`.
pub fn initial_conditions(grid: &GridConfig) -> String {
    format!(
        "{{'user_params': {{'HII_DIM': {}, 'BOX_LEN': {}}}}}",
        grid.hii_dim, grid.box_len
    )
}

/// Distinct redshifts with their counts, by increasing redshift.
pub fn redshift_counts(redshifts: &[f32]) -> Vec<(f32, usize)> {
    let mut sorted = redshifts.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mut counts: Vec<(f32, usize)> = Vec::new();
    for z in sorted {
        match counts.last_mut() {
            Some((last, n)) if *last == z => *n += 1,
            _ => counts.push((z, 1)),
        }
    }
    counts
}

fn check_boxes(dataset: &CoevalDataset, path: &Path, grid: &GridConfig) -> Result<()> {
    let field_shape = grid.field_shape();
    for key in BOX_KEYS {
        let shape = dataset.array(key)?.shape();
        if shape.len() != 4 || shape[0] != dataset.len() || shape[1..] != field_shape {
            return Err(PipelineError::ShapeMismatch(format!(
                "'{key}' in '{}' is {shape:?}, expected [{}, {}, {}, {}]",
                path.display(),
                dataset.len(),
                field_shape[0],
                field_shape[1],
                field_shape[2]
            )));
        }
    }
    Ok(())
}

/// Box indices drawn from one input.
fn select(config: &TrainingSetConfig, input: &TrainingInput, len: usize) -> Result<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(input.seed);
    match config.mode {
        AssemblyMode::Shuffled => {
            let mut order: Vec<usize> = (0..len).collect();
            if config.shuffle {
                order.shuffle(&mut rng);
            }
            Ok(order)
        }
        AssemblyMode::SeedExclusive => {
            if config.boxes_per_seed > len {
                return Err(PipelineError::InvalidConfig(format!(
                    "'{}' holds {len} boxes, cannot draw {}",
                    input.path.display(),
                    config.boxes_per_seed
                )));
            }
            Ok(index::sample(&mut rng, len, config.boxes_per_seed).into_vec())
        }
    }
}

/// Shuffle `[0, num_train)` and `[num_train, total)` independently.
fn split_order(total: usize, num_train: usize, seed_train: u64, seed_val: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..total).collect();
    let (train, val) = order.split_at_mut(num_train);
    train.shuffle(&mut StdRng::seed_from_u64(seed_train));
    val.shuffle(&mut StdRng::seed_from_u64(seed_val));
    order
}

/// Assemble a training set in memory.
pub fn assemble(
    config: &TrainingSetConfig,
    grid: &GridConfig,
) -> Result<(Container, TrainingSetReport)> {
    config.validate()?;
    grid.validate()?;

    let mut selection = Selection::new();
    for input in &config.inputs {
        let dataset = CoevalDataset::load_with(&input.path, &LoadOptions::simulation())?;
        check_boxes(&dataset, &input.path, grid)?;

        let order = select(config, input, dataset.len())?;
        selection.take(&dataset, input, &order)?;
        debug!(
            path = %input.path.display(),
            seed = input.seed,
            available = dataset.len(),
            selected = order.len(),
            "input selected"
        );
    }

    let total = selection.len();
    if total == 0 {
        return Err(PipelineError::InvalidConfig("inputs hold no boxes".to_string()));
    }
    let num_train = config.num_train.unwrap_or(total);
    if num_train > total {
        return Err(PipelineError::InvalidConfig(format!(
            "numTrain ({num_train}) exceeds the {total} boxes selected"
        )));
    }

    let order = match config.mode {
        AssemblyMode::Shuffled => (0..total).collect(),
        AssemblyMode::SeedExclusive => split_order(
            total,
            num_train,
            config.shuffle_seed_train,
            config.shuffle_seed_val,
        ),
    };

    let ordered: Vec<f32> = order.iter().map(|&i| selection.redshifts[i]).collect();
    let report = TrainingSetReport {
        boxes: total,
        num_train,
        train_redshifts: redshift_counts(&ordered[..num_train]),
        val_redshifts: redshift_counts(&ordered[num_train..]),
    };

    let container = selection.into_container(&order, grid)?;
    Ok((container, report))
}

/// Assemble the pipeline's `trainingSet` step and save it.
pub fn make_training_set(config: &PipelineConfig) -> Result<TrainingSetReport> {
    let step = config.training_set_step()?;
    let (container, report) = assemble(step, &config.grid)?;
    container.save(&step.output)?;

    info!(
        output = %step.output.display(),
        boxes = report.boxes,
        num_train = report.num_train,
        "training set saved"
    );
    for (z, n) in &report.train_redshifts {
        debug!(redshift = z, boxes = n, "training split");
    }
    for (z, n) in &report.val_redshifts {
        debug!(redshift = z, boxes = n, "validation split");
    }
    Ok(report)
}
