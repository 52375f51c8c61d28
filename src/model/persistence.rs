//! Model serialization and persistence
//!
//! Models are stored as pretty-printed JSON with a metadata block.

use crate::core::{Result, SVMError, SparseVector};
use crate::model::{SvmModel, TrainParams};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serializable representation of a trained model
#[derive(Serialize, Deserialize)]
pub struct SerializableModel {
    pub nr_class: usize,
    /// Class labels; empty for regression
    pub labels: Vec<i32>,
    /// Support vectors per class
    pub n_sv: Vec<usize>,
    pub support_vectors: Vec<SerializableVector>,
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob_a: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob_b: Option<Vec<f64>>,
    pub metadata: ModelMetadata,
}

/// Serializable sparse vector
#[derive(Serialize, Deserialize, Clone)]
pub struct SerializableVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

/// Model metadata for tracking and validation
#[derive(Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub total_sv: usize,
    /// Training parameters, including the svm type and kernel
    pub training_params: TrainParams,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl From<&SparseVector> for SerializableVector {
    fn from(v: &SparseVector) -> Self {
        Self {
            indices: v.indices.clone(),
            values: v.values.clone(),
        }
    }
}

impl TryFrom<&SerializableVector> for SparseVector {
    type Error = SVMError;

    fn try_from(v: &SerializableVector) -> Result<Self> {
        if v.indices.len() != v.values.len() {
            return Err(SVMError::SerializationError(format!(
                "inconsistent model: support vector has {} indices but {} values",
                v.indices.len(),
                v.values.len()
            )));
        }
        Ok(SparseVector::new(v.indices.clone(), v.values.clone()))
    }
}

impl SerializableModel {
    pub fn from_model(model: &SvmModel) -> Self {
        Self {
            nr_class: model.nr_class,
            labels: model.labels.clone(),
            n_sv: model.n_sv.clone(),
            support_vectors: model
                .support_vectors
                .iter()
                .map(SerializableVector::from)
                .collect(),
            sv_coef: model.sv_coef.clone(),
            rho: model.rho.clone(),
            prob_a: model.prob_a.clone(),
            prob_b: model.prob_b.clone(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                total_sv: model.total_sv(),
                training_params: model.params.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Rebuild the model, rejecting files whose tables do not line up
    pub fn into_model(self) -> Result<SvmModel> {
        let total_sv = self.support_vectors.len();
        let inconsistent = |what: &str| Err(SVMError::SerializationError(format!("inconsistent model: {what}")));

        if self.metadata.training_params.svm_type.is_classification() {
            let pairs = self.nr_class * self.nr_class.saturating_sub(1) / 2;
            if self.nr_class == 0 {
                return inconsistent("nr_class must be at least 1");
            }
            if self.labels.len() != self.nr_class || self.n_sv.len() != self.nr_class {
                return inconsistent("labels/nSV do not match nr_class");
            }
            if self.n_sv.iter().sum::<usize>() != total_sv {
                return inconsistent("nSV does not add up to the number of support vectors");
            }
            if self.sv_coef.len() != self.nr_class.saturating_sub(1) || self.rho.len() != pairs {
                return inconsistent("coefficient table does not match nr_class");
            }
            let wrong_pairs = |table: &Option<Vec<f64>>| table.as_ref().is_some_and(|t| t.len() != pairs);
            if wrong_pairs(&self.prob_a) || wrong_pairs(&self.prob_b) {
                return inconsistent("probA/probB need one entry per class pair");
            }
        } else {
            if self.sv_coef.len() != 1 || self.rho.len() != 1 {
                return inconsistent("regression model needs one coefficient row and one rho");
            }
            if self.prob_a.as_ref().is_some_and(Vec::is_empty) {
                return inconsistent("probA of a regression model is empty");
            }
        }
        if self.sv_coef.iter().any(|row| row.len() != total_sv) {
            return inconsistent("coefficient row length differs from the number of support vectors");
        }

        let support_vectors = self
            .support_vectors
            .iter()
            .map(SparseVector::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(SvmModel {
            params: self.metadata.training_params,
            nr_class: self.nr_class,
            labels: self.labels,
            n_sv: self.n_sv,
            support_vectors,
            sv_coef: self.sv_coef,
            rho: self.rho,
            prob_a: self.prob_a,
            prob_b: self.prob_b,
        })
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        let model = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(model)
    }
}

/// Write a trained model to `path`
pub fn save_model<P: AsRef<Path>>(model: &SvmModel, path: P) -> Result<()> {
    SerializableModel::from_model(model).save_to_file(path)
}

/// Read a model from `path`
///
/// Any failure, missing file or malformed content, is reported as
/// [`SVMError::ModelLoad`] naming the path.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<SvmModel> {
    let path = path.as_ref();
    SerializableModel::load_from_file(path)
        .and_then(SerializableModel::into_model)
        .map_err(|e| SVMError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
