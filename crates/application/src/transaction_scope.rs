use rbacsync_core::{AppError, AppResult};

use crate::graph_ports::{GraphStore, GraphTransaction};

/// Owns one graph transaction and settles it from an operation outcome.
///
/// Dropping the scope without calling [`TransactionScope::complete`] drops
/// the handle, which rolls the transaction back.
pub struct TransactionScope {
    transaction: Box<dyn GraphTransaction>,
}

impl TransactionScope {
    /// Opens a transaction on the store.
    pub async fn begin(store: &dyn GraphStore) -> AppResult<Self> {
        Ok(Self {
            transaction: store.begin().await?,
        })
    }

    /// Returns the handle every mutation must flow through.
    pub fn transaction(&mut self) -> &mut dyn GraphTransaction {
        self.transaction.as_mut()
    }

    /// Commits on success, rolls back on failure and returns the outcome.
    pub async fn complete<T>(self, outcome: AppResult<T>) -> AppResult<T> {
        match outcome {
            Ok(value) => {
                self.transaction.commit().await?;
                Ok(value)
            }
            Err(error) => match self.transaction.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_error) => Err(AppError::Internal(format!(
                    "{error}; rollback failed: {rollback_error}"
                ))),
            },
        }
    }
}
