use serde::{Deserialize, Serialize};

/// Lowest mastery routed to light support.
pub const TIER_1_THRESHOLD: f64 = 0.75;
/// Mastery below this is routed to heavy support.
pub const TIER_3_THRESHOLD: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Light support.
    #[serde(rename = "tier_1")]
    Tier1,
    /// Moderate support.
    #[serde(rename = "tier_2")]
    Tier2,
    /// Heavy support.
    #[serde(rename = "tier_3")]
    Tier3,
}

impl Tier {
    pub fn classify(mastery: f64) -> Self {
        if mastery >= TIER_1_THRESHOLD {
            Self::Tier1
        } else if mastery >= TIER_3_THRESHOLD {
            Self::Tier2
        } else {
            Self::Tier3
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "tier_1",
            Self::Tier2 => "tier_2",
            Self::Tier3 => "tier_3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierDistribution {
    pub tier_1: usize,
    pub tier_2: usize,
    pub tier_3: usize,
}

impl TierDistribution {
    pub fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Tier1 => self.tier_1 += 1,
            Tier::Tier2 => self.tier_2 += 1,
            Tier::Tier3 => self.tier_3 += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tier_1 + self.tier_2 + self.tier_3
    }
}

impl FromIterator<Tier> for TierDistribution {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut distribution = Self::default();
        for tier in iter {
            distribution.add(tier);
        }
        distribution
    }
}
