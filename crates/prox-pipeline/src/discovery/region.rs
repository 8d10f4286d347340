//! Region heuristic for provider selection.

use std::sync::Arc;

use prox_core::geo::{BoundingBox, Coordinates};
use prox_providers::{PlaceProvider, Providers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Inside the domestic bounding box.
    Domestic,
    International,
}

impl Region {
    #[must_use]
    pub fn of(at: &Coordinates, domestic: &BoundingBox) -> Self {
        if domestic.contains(at) {
            Self::Domestic
        } else {
            Self::International
        }
    }
}

/// Providers to query first, and the ones to consult if the first yield nothing relevant.
#[derive(Clone, Default)]
pub struct ProviderPlan {
    pub primary: Vec<Arc<dyn PlaceProvider>>,
    pub fallback: Vec<Arc<dyn PlaceProvider>>,
}

impl ProviderPlan {
    /// Domestic entities try the domestic provider first and fall back to the
    /// international ones. Thorough runs query everything at once.
    #[must_use]
    pub fn for_region(providers: &Providers, region: Region, thorough: bool) -> Self {
        if thorough {
            return Self {
                primary: providers.all(),
                fallback: Vec::new(),
            };
        }
        match region {
            Region::Domestic if !providers.domestic.is_empty() => Self {
                primary: providers.domestic.clone(),
                fallback: providers.international.clone(),
            },
            Region::Domestic | Region::International => Self {
                primary: providers.international.clone(),
                fallback: Vec::new(),
            },
        }
    }

    /// Drop providers that `keep` rejects.
    #[must_use]
    pub fn retain(mut self, keep: impl Fn(&dyn PlaceProvider) -> bool) -> Self {
        self.primary.retain(|p| keep(p.as_ref()));
        self.fallback.retain(|p| keep(p.as_ref()));
        self
    }
}
