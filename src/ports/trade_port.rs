//! Trade ingestion port trait.

use std::path::{Path, PathBuf};

use crate::domain::error::PnlError;
use crate::domain::trade::Trade;

/// Rows read from one trade file.
#[derive(Debug, Default)]
pub struct TradeFile {
    pub path: PathBuf,
    /// Parsed rows, in file order.
    pub trades: Vec<Trade>,
    /// Rows that failed to parse, one [`PnlError::MalformedRecord`] each.
    pub skipped: Vec<PnlError>,
}

/// Port for reading batches of raw trade records.
pub trait TradePort {
    /// Trade files in `dir`, sorted by file name.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, PnlError>;

    /// Read one file. `Ok(None)` means the file is not a trade file and was
    /// ignored.
    fn read_trades(&self, path: &Path) -> Result<Option<TradeFile>, PnlError>;
}
