// Matrix storage, configuration and conversions

pub mod config;
pub mod conversion;
pub mod ellpack;

pub use config::{
    Backend, DenseOrder, DistributionMode, DistributionParams, EngineConfig, MatrixKind,
    Precision, SystemParameters,
};
pub use ellpack::EllpackMatrix;
