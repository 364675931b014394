//! Simulated card presentations for running without a reader.

use bandgate_core::Uid;
use bandgate_hardware::mock::MockUidHandle;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Present one card per line of `input`. Lines are hex UIDs; blank lines
/// and lines starting with `#` are skipped. Returns how many cards were
/// presented once `input` ends.
pub async fn feed<R>(input: R, reader: MockUidHandle) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut presented = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Uid>() {
            Ok(uid) => {
                info!(uid = %uid, "Presenting simulated band");
                reader.present(uid.to_bytes());
                presented += 1;
            }
            Err(e) => warn!(input = line, error = %e, "Ignoring simulated band"),
        }
    }
    debug!(presented, "Simulated input ended");
    Ok(presented)
}
