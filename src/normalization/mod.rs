pub mod min_max;
pub mod unit_sphere;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::shared::Vertex;

pub use min_max::{MinMax, MinMaxMeta};
pub use unit_sphere::{UnitSphere, UnitSphereMeta};

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Metadata of kind '{found}' cannot invert a '{expected}' normalization")]
    MetaMismatch {
        expected: NormalizationType,
        found: NormalizationType,
    },
    #[error("Unknown normalization method '{0}' (expected one of: minmax, unit_sphere)")]
    UnknownMethod(String),
}

/// An invertible transform from arbitrary coordinates into `[0, 1]^3`.
///
/// `forward` returns the normalized buffer together with the metadata that `inverse`
/// needs to undo it. The metadata is an associated type, so the inverse of a strategy
/// can only ever be handed the metadata produced by its own forward pass.
pub trait NormalizationImpl {
    const TYPE: NormalizationType;
    type Meta: Clone + fmt::Debug + Into<NormalizationMeta>;

    /// normalizes the vertices. The input is never modified.
    fn forward(&self, vertices: &[Vertex]) -> (Vec<Vertex>, Self::Meta);

    /// exact algebraic inverse of [NormalizationImpl::forward].
    fn inverse(&self, normalized: &[Vertex], meta: &Self::Meta) -> Vec<Vertex>;
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NormalizationType {
    #[serde(rename = "minmax")]
    MinMax,
    #[serde(rename = "unit_sphere")]
    UnitSphere,
}

impl NormalizationType {
    pub const ALL: [NormalizationType; 2] = [NormalizationType::MinMax, NormalizationType::UnitSphere];

    /// The name used in output paths, summaries and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            NormalizationType::MinMax => "minmax",
            NormalizationType::UnitSphere => "unit_sphere",
        }
    }

    pub(crate) fn get_id(&self) -> u8 {
        match self {
            NormalizationType::MinMax => 0,
            NormalizationType::UnitSphere => 1,
        }
    }

    pub(crate) fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(NormalizationType::MinMax),
            1 => Some(NormalizationType::UnitSphere),
            _ => None,
        }
    }

    /// Runs the forward transform of the strategy and erases the metadata type.
    pub fn forward(&self, vertices: &[Vertex]) -> (Vec<Vertex>, NormalizationMeta) {
        match self {
            NormalizationType::MinMax => {
                let (out, meta) = MinMax.forward(vertices);
                (out, meta.into())
            },
            NormalizationType::UnitSphere => {
                let (out, meta) = UnitSphere.forward(vertices);
                (out, meta.into())
            },
        }
    }

    /// Inverts the strategy with metadata that was recovered at runtime (e.g. from a summary).
    /// Fails when the metadata belongs to another strategy.
    pub fn inverse(&self, normalized: &[Vertex], meta: &NormalizationMeta) -> Result<Vec<Vertex>, Err> {
        match (self, meta) {
            (NormalizationType::MinMax, NormalizationMeta::MinMax(m)) => Ok(MinMax.inverse(normalized, m)),
            (NormalizationType::UnitSphere, NormalizationMeta::UnitSphere(m)) => Ok(UnitSphere.inverse(normalized, m)),
            _ => Err(Err::MetaMismatch { expected: *self, found: meta.get_type() }),
        }
    }
}

impl fmt::Display for NormalizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalizationType {
    type Err = Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minmax" | "min_max" | "min-max" => Ok(NormalizationType::MinMax),
            "unit_sphere" | "unitsphere" | "unit-sphere" | "sphere" => Ok(NormalizationType::UnitSphere),
            _ => Err(Err::UnknownMethod(s.to_owned())),
        }
    }
}


/// The metadata of one forward pass, tagged with the strategy that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NormalizationMeta {
    #[serde(rename = "minmax")]
    MinMax(MinMaxMeta),
    #[serde(rename = "unit_sphere")]
    UnitSphere(UnitSphereMeta),
}

impl NormalizationMeta {
    pub fn get_type(&self) -> NormalizationType {
        match self {
            NormalizationMeta::MinMax(_) => NormalizationType::MinMax,
            NormalizationMeta::UnitSphere(_) => NormalizationType::UnitSphere,
        }
    }
}

impl From<MinMaxMeta> for NormalizationMeta {
    fn from(meta: MinMaxMeta) -> Self {
        NormalizationMeta::MinMax(meta)
    }
}

impl From<UnitSphereMeta> for NormalizationMeta {
    fn from(meta: UnitSphereMeta) -> Self {
        NormalizationMeta::UnitSphere(meta)
    }
}

impl fmt::Display for NormalizationMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationMeta::MinMax(m) => write!(f, "{{vmin: {:?}, vmax: {:?}}}", m.vmin, m.vmax),
            NormalizationMeta::UnitSphere(m) => write!(f, "{{centroid: {:?}, maxd: {:?}}}", m.centroid, m.max_radius),
        }
    }
}
