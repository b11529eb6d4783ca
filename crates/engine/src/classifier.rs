use common::models::Tier;

use crate::policy;

/// Classification result shared by the generator (display metadata) and
/// the dispatch guard (channel eligibility gate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierInfo {
    pub tier: Tier,
    pub telegram_eligible: bool,
    pub label: &'static str,
}

pub fn classify(confidence: u8) -> TierInfo {
    if confidence >= policy::TIER_HIGH_MIN {
        return TierInfo {
            tier: Tier::High,
            telegram_eligible: true,
            label: "High Confidence",
        };
    }
    if confidence >= policy::TIER_MEDIUM_MIN {
        return TierInfo {
            tier: Tier::Medium,
            telegram_eligible: false,
            label: "Medium Confidence",
        };
    }
    TierInfo {
        tier: Tier::Low,
        telegram_eligible: false,
        label: "Low Confidence",
    }
}
