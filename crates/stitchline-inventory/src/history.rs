use stitchline_core::{LedgerEntry, LedgerQuery, LedgerReference, LedgerStore, StoreResult, TransactionType};

/// Every row of the given types logged against `reference`, oldest first.
///
/// Rows sharing a timestamp keep the order of `transaction_types`.
pub(crate) async fn ledger_history<S>(
    store: &S,
    reference: LedgerReference,
    transaction_types: &[TransactionType],
) -> StoreResult<Vec<LedgerEntry>>
where
    S: LedgerStore + ?Sized,
{
    let mut history = Vec::new();
    for &transaction_type in transaction_types {
        history.extend(
            store
                .ledger_entries(LedgerQuery {
                    reference,
                    transaction_type,
                })
                .await?,
        );
    }
    history.sort_by_key(|entry| entry.transaction_date);
    Ok(history)
}
