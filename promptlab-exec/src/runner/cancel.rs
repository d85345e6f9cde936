use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleep for `delay` unless `token` fires first.
///
/// Returns `true` when the full delay elapsed and `false` when the wait was cut
/// short by cancellation. Never errors.
pub async fn sleep_or_cancel(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
