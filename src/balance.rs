//! Human-readable balances.

use tracing::warn;

use crate::wallet::Account;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// Render a wei amount in ether, trimming trailing zeros but keeping at
/// least one fractional digit: `1.5`, `0.0`, `0.000000000000000001`.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    let digits = format!("{frac:0width$}", width = ETHER_DECIMALS);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Fetch and format an account balance as `"<ether> ETH"`.
///
/// Provider failures are logged and reported as `"0 ETH"`.
pub async fn fetch_formatted_balance(account: &dyn Account) -> String {
    match account.get_balance().await {
        Ok(wei) => format!("{} ETH", format_ether(wei)),
        Err(e) => {
            warn!(error = %e, "failed to fetch balance");
            "0 ETH".to_string()
        }
    }
}
