//! Pipeline documents.
//!
//! A pipeline is a YAML file describing the grid, the binarization cutoff and
//! the steps to run:
//!
//! ```yaml
//! apiVersion: coeval/v1
//! kind: Pipeline
//! metadata:
//!   name: rseed_variable_128
//! grid: { boxLen: 128, hiiDim: 128, dim: 384 }
//! cutoff: 0.9
//! classify:
//!   dataset: data/coeval_boxes.cbx
//!   halos: data/halos/
//!   output: out/halos/
//! trainingSet:
//!   inputs:
//!     - { path: data/rseed_50.cbx, seed: 50 }
//!     - { path: data/rseed_100.cbx, seed: 100 }
//!   output: out/training.cbx
//!   mode: seedExclusive
//!   numTrain: 1
//! ```

use std::path::{Path, PathBuf};

use coeval_halos::{GridConfig, DEFAULT_CUTOFF};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const API_VERSION: &str = "coeval/v1";
const KIND: &str = "Pipeline";

/// A validated pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: PipelineMetadata,

    /// Grid geometry; determines the halo downsampling scale.
    #[serde(default)]
    pub grid: GridConfig,

    /// Values at or above the cutoff are neutral.
    #[serde(default = "default_cutoff")]
    pub cutoff: f32,

    #[serde(default)]
    pub classify: Option<ClassifyConfig>,

    #[serde(default)]
    pub training_set: Option<TrainingSetConfig>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_cutoff() -> f32 {
    DEFAULT_CUTOFF
}

/// Metadata for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Identifier used as the prefix of output file names.
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Halo classification step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyConfig {
    /// Coeval dataset with ground truth and predicted fields.
    pub dataset: PathBuf,

    /// Directory of halo catalogs, each tagged with a redshift and seed.
    pub halos: PathBuf,

    /// Directory receiving one classification file per matched catalog.
    pub output: PathBuf,

    /// Overrides the scale derived from the grid.
    #[serde(default)]
    pub scale: Option<i64>,
}

/// How boxes are drawn from the training inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssemblyMode {
    /// Every box of every input, redshift order shuffled per input.
    #[default]
    Shuffled,
    /// `boxesPerSeed` boxes from each input, split into train and validation.
    SeedExclusive,
}

/// One simulation output feeding the training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInput {
    pub path: PathBuf,
    /// Simulation seed; also seeds the per-input box selection.
    pub seed: u64,
}

/// Training-set assembly step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSetConfig {
    pub inputs: Vec<TrainingInput>,

    pub output: PathBuf,

    #[serde(default)]
    pub mode: AssemblyMode,

    #[serde(default = "default_boxes_per_seed")]
    pub boxes_per_seed: usize,

    /// Leading boxes forming the training split; the rest is validation.
    /// Defaults to every box.
    #[serde(default)]
    pub num_train: Option<usize>,

    #[serde(default = "default_shuffle_seed_train")]
    pub shuffle_seed_train: u64,

    #[serde(default = "default_shuffle_seed_val")]
    pub shuffle_seed_val: u64,

    /// Shuffle the redshift order of each input (shuffled mode).
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

fn default_boxes_per_seed() -> usize {
    1
}

fn default_shuffle_seed_train() -> u64 {
    16
}

fn default_shuffle_seed_val() -> u64 {
    91
}

fn default_shuffle() -> bool {
    true
}

impl TrainingSetConfig {
    /// Create a shuffled-mode step with default seeds.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.into(),
            mode: AssemblyMode::default(),
            boxes_per_seed: default_boxes_per_seed(),
            num_train: None,
            shuffle_seed_train: default_shuffle_seed_train(),
            shuffle_seed_val: default_shuffle_seed_val(),
            shuffle: default_shuffle(),
        }
    }

    /// Builder method: add an input.
    pub fn with_input(mut self, path: impl Into<PathBuf>, seed: u64) -> Self {
        self.inputs.push(TrainingInput {
            path: path.into(),
            seed,
        });
        self
    }

    /// Builder method: set the assembly mode.
    pub fn with_mode(mut self, mode: AssemblyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: set the training split size.
    pub fn with_num_train(mut self, num_train: usize) -> Self {
        self.num_train = Some(num_train);
        self
    }

    /// Builder method: set the number of boxes drawn per input.
    pub fn with_boxes_per_seed(mut self, boxes_per_seed: usize) -> Self {
        self.boxes_per_seed = boxes_per_seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(PipelineError::MissingField("trainingSet.inputs".to_string()));
        }
        if self.boxes_per_seed == 0 {
            return Err(PipelineError::InvalidConfig(
                "trainingSet.boxesPerSeed must be > 0".to_string(),
            ));
        }
        if let Some(input) = self.inputs.iter().find(|i| i64::try_from(i.seed).is_err()) {
            return Err(PipelineError::InvalidConfig(format!(
                "seed {} of '{}' does not fit a signed 64-bit integer",
                input.seed,
                input.path.display()
            )));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Create a pipeline with no steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: PipelineMetadata {
                name: name.into(),
                description: None,
            },
            grid: GridConfig::default(),
            cutoff: default_cutoff(),
            classify: None,
            training_set: None,
        }
    }

    /// Load a pipeline from a YAML file.
    ///
    /// Relative paths inside the document are kept as written; they resolve
    /// against the working directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate_schema()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate_schema(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(PipelineError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(PipelineError::InvalidKind(self.kind.clone()));
        }
        if self.metadata.name.is_empty() {
            return Err(PipelineError::MissingField("metadata.name".to_string()));
        }
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "cutoff must be in (0, 1], got {}",
                self.cutoff
            )));
        }
        self.grid.validate()?;
        if let Some(classify) = &self.classify {
            if matches!(classify.scale, Some(s) if s <= 0) {
                return Err(PipelineError::InvalidConfig(
                    "classify.scale must be > 0".to_string(),
                ));
            }
        }
        if let Some(training_set) = &self.training_set {
            training_set.validate()?;
        }
        Ok(())
    }

    /// The classification step, or `MissingField` when absent.
    pub fn classify_step(&self) -> Result<&ClassifyConfig> {
        self.classify
            .as_ref()
            .ok_or_else(|| PipelineError::MissingField("classify".to_string()))
    }

    /// The training-set step, or `MissingField` when absent.
    pub fn training_set_step(&self) -> Result<&TrainingSetConfig> {
        self.training_set
            .as_ref()
            .ok_or_else(|| PipelineError::MissingField("trainingSet".to_string()))
    }

    /// Halo downsampling scale: the explicit override or the grid ratio.
    pub fn scale(&self) -> Result<i64> {
        match self.classify.as_ref().and_then(|c| c.scale) {
            Some(scale) => Ok(scale),
            None => Ok(self.grid.scale()?),
        }
    }

    /// Builder method: set the grid.
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Builder method: set the binarization cutoff.
    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Builder method: add a classification step.
    pub fn with_classify(
        mut self,
        dataset: impl Into<PathBuf>,
        halos: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        self.classify = Some(ClassifyConfig {
            dataset: dataset.into(),
            halos: halos.into(),
            output: output.into(),
            scale: None,
        });
        self
    }

    /// Builder method: add a training-set step.
    pub fn with_training_set(mut self, training_set: TrainingSetConfig) -> Self {
        self.training_set = Some(training_set);
        self
    }
}
