//! Bid evaluator: derive the current leader of a lot from its bets.

use tracing::warn;

use crate::{
    domain::{LotId, RowId},
    store::{port::RecordStore, types::value_to_f64},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeaderInfo {
    pub amount: f64,
    /// User row id of the leading bidder; `None` when no valid bet exists
    /// (the amount is then the lot's initial price).
    pub holder: Option<RowId>,
}

/// Scan all bets for the lot and return the maximum valid amount and its
/// holder.
///
/// Bets whose amount is not a positive number are discarded with a
/// data-quality warning. Ties keep the first bet encountered in store order;
/// the store does not promise a stable iteration order, so equal maxima have
/// no guaranteed winner.
pub async fn current_leader(
    store: &dyn RecordStore,
    lot_id: LotId,
    initial_price: f64,
) -> Result<LeaderInfo> {
    let bets = store.list_bets().await?;

    let mut best: Option<LeaderInfo> = None;
    for bet in bets.iter().filter(|b| b.lot_id() == Some(lot_id)) {
        let Some(amount) = value_to_f64(&bet.amount).filter(|a| *a > 0.0) else {
            warn!(bet = bet.id, raw = %bet.amount, "discarding bet with invalid amount");
            continue;
        };

        if best.map(|b| amount > b.amount).unwrap_or(true) {
            best = Some(LeaderInfo {
                amount,
                holder: bet.bidder(),
            });
        }
    }

    Ok(best.unwrap_or(LeaderInfo {
        amount: initial_price,
        holder: None,
    }))
}
