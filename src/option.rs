use std::sync::Arc;

use crate::context::{MAX_SRTCP_INDEX, MAX_SRTP_PACKET_INDEX};
use crate::replay_detector::*;

/// ContextOption supplies the replay detector a Context installs for each
/// newly seen SSRC.
pub type ContextOption = Arc<dyn (Fn() -> Box<dyn ReplayDetector + Send + 'static>) + Send + Sync>;

/// srtp_replay_protection enables an SRTP replay window of `window_size`
/// packet indices.
pub fn srtp_replay_protection(window_size: usize) -> ContextOption {
    Arc::new(move || -> Box<dyn ReplayDetector + Send + 'static> {
        Box::new(SlidingWindowDetector::new(
            window_size,
            MAX_SRTP_PACKET_INDEX,
        ))
    })
}

/// srtcp_replay_protection enables an SRTCP replay window of `window_size`
/// indices.
pub fn srtcp_replay_protection(window_size: usize) -> ContextOption {
    Arc::new(move || -> Box<dyn ReplayDetector + Send + 'static> {
        Box::new(SlidingWindowDetector::new(
            window_size,
            MAX_SRTCP_INDEX as u64,
        ))
    })
}

/// srtp_no_replay_protection disables SRTP replay protection.
pub fn srtp_no_replay_protection() -> ContextOption {
    Arc::new(|| -> Box<dyn ReplayDetector + Send + 'static> {
        Box::<NoOpReplayDetector>::default()
    })
}

/// srtcp_no_replay_protection disables SRTCP replay protection.
pub fn srtcp_no_replay_protection() -> ContextOption {
    Arc::new(|| -> Box<dyn ReplayDetector + Send + 'static> {
        Box::<NoOpReplayDetector>::default()
    })
}
