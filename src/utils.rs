use crate::constants::{PROFILE_DELETION, PROFILE_INSERTION};
use memory_stats::memory_stats;

pub fn log_memory_usage(info: bool, message: &str) {
    if let Some(usage) = memory_stats() {
        if info {
            log::info!(
                "{} --- Memory usage: {:.2} GB",
                message,
                usage.physical_mem as f64 / 1_000_000_000.
            );
        } else {
            log::debug!(
                "{} --- Memory usage: {:.2} GB",
                message,
                usage.physical_mem as f64 / 1_000_000_000.
            );
        }
    } else {
        log::info!("Memory usage: unknown (WARNING)");
    }
}

/// Number of columns in a profile with each symbol: (match, insertion, deletion).
pub fn profile_counts(profile: &[u8]) -> (usize, usize, usize) {
    let mut counts = (0, 0, 0);
    for &symbol in profile {
        match symbol {
            PROFILE_INSERTION => counts.1 += 1,
            PROFILE_DELETION => counts.2 += 1,
            _ => counts.0 += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_counts() {
        assert_eq!(profile_counts(b"..+.-"), (3, 1, 1));
        assert_eq!(profile_counts(b""), (0, 0, 0));
    }
}
