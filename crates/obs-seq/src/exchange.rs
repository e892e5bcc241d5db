//! Secondary exchange-format writers.
//!
//! The main output is the Zarr table. Some downstream systems also want the
//! masked grid in their own flat-text format; they plug in here.

use superob::{AnalysisGrid, GriddedField};

use crate::config::ObsErrorTable;
use crate::error::Result;

/// Receives every masked field of a volume after the table is written.
pub trait ExchangeWriter: Send + Sync {
    fn name(&self) -> &str;

    fn write(
        &self,
        field: &GriddedField,
        grid: &AnalysisGrid,
        errors: &ObsErrorTable,
    ) -> Result<()>;
}

/// Writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExchange;

impl ExchangeWriter for NoExchange {
    fn name(&self) -> &str {
        "none"
    }

    fn write(&self, _: &GriddedField, _: &AnalysisGrid, _: &ObsErrorTable) -> Result<()> {
        Ok(())
    }
}
