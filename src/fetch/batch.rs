use crate::error::{Error, Result};

/// Splits `symbols` into consecutive batches of at most `batch_size`.
/// Only the last batch may be shorter.
pub fn partition(symbols: &[String], batch_size: usize) -> Result<Vec<Vec<String>>> {
    if batch_size == 0 {
        return Err(Error::ConfigError("batch size must be positive".to_string()));
    }
    Ok(symbols.chunks(batch_size).map(|chunk| chunk.to_vec()).collect())
}
