// Dataset construction: feature/label extraction from raw career records
// and assembly/persistence of the tabular training artifact.

pub mod assemble;
pub mod extract;

pub use assemble::{assemble, read_csv, write_csv, DatasetError};
pub use extract::{extract, parse_height_inches, FeatureLabelRow};
