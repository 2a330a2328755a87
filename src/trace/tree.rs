use tracing::trace;

use crate::trace::{MemoryProbe, ProbeError};

/// Total RSS of `pid` and its live descendants, enumerated fresh.
///
/// Descendants that vanish or cannot be read count as zero. Only a failure to
/// read `pid` itself fails the measurement.
pub fn tree_rss(probe: &mut dyn MemoryProbe, pid: u32) -> Result<u64, ProbeError> {
    probe.refresh();

    let children = match probe.descendants(pid) {
        Ok(children) => children,
        Err(ProbeError::NoChildren(_)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let mut total: u64 = 0;
    for child in children {
        match probe.rss(child) {
            Ok(rss) => total = total.saturating_add(rss),
            Err(e) => trace!(pid = child, error = %e, "skipping descendant"),
        }
    }

    let own = probe.rss(pid)?;
    Ok(total.saturating_add(own))
}
