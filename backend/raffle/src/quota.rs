//! # Quotas
//!
//! A campaign's tickets are the numbers `1..=total`. The board partitions them
//! by set membership, checked in this order:
//!
//! 1. purchased
//! 2. reserved
//! 3. selected (the current buyer's picks)
//! 4. available
//!
//! Only the first two sets are persisted. `selected` is per-buyer state.
use std::collections::{BTreeSet, HashSet};

use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};

use crate::{
    campaign::{CampaignModel, InitialFilter},
    error::CampaignError,
    money::Cents,
};

pub const QUANTITY_INCREMENTS: [u32; 8] = [1, 5, 15, 150, 1000, 5000, 10000, 20000];

pub const DEFAULT_PAGE: usize = 100;
pub const MAX_PAGE: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStatus {
    Purchased,
    Reserved,
    Selected,
    Available,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaFilter {
    #[default]
    All,
    Available,
    Reserved,
    Purchased,
    Mine,
}

impl From<InitialFilter> for QuotaFilter {
    fn from(filter: InitialFilter) -> Self {
        match filter {
            InitialFilter::All => QuotaFilter::All,
            InitialFilter::Available => QuotaFilter::Available,
        }
    }
}

impl QuotaFilter {
    fn matches(self, status: QuotaStatus) -> bool {
        match self {
            QuotaFilter::All => true,
            QuotaFilter::Available => status == QuotaStatus::Available,
            QuotaFilter::Reserved => status == QuotaStatus::Reserved,
            QuotaFilter::Purchased => status == QuotaStatus::Purchased,
            QuotaFilter::Mine => status == QuotaStatus::Selected,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuotaCounts {
    pub all: u32,
    pub available: u32,
    pub reserved: u32,
    pub purchased: u32,
    pub mine: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QuotaCell {
    pub number: u32,
    pub status: QuotaStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuotaBoard {
    pub total: u32,
    pub purchased: BTreeSet<u32>,
    pub reserved: BTreeSet<u32>,
    pub selected: BTreeSet<u32>,
}

impl QuotaBoard {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn status(&self, number: u32) -> QuotaStatus {
        if self.purchased.contains(&number) {
            QuotaStatus::Purchased
        } else if self.reserved.contains(&number) {
            QuotaStatus::Reserved
        } else if self.selected.contains(&number) {
            QuotaStatus::Selected
        } else {
            QuotaStatus::Available
        }
    }

    /// Flips `number` in the selection. Returns `false` when the click is
    /// ignored: automatic campaigns, taken numbers, or numbers off the board.
    pub fn toggle(&mut self, number: u32, model: CampaignModel) -> bool {
        if model != CampaignModel::Manual || number == 0 || number > self.total {
            return false;
        }

        match self.status(number) {
            QuotaStatus::Purchased | QuotaStatus::Reserved => false,
            QuotaStatus::Selected => self.selected.remove(&number),
            QuotaStatus::Available => self.selected.insert(number),
        }
    }

    pub fn counts(&self) -> QuotaCounts {
        let purchased = self.purchased.len() as u32;
        let reserved = self.reserved.len() as u32;

        QuotaCounts {
            all: self.total,
            available: self.total.saturating_sub(purchased + reserved),
            reserved,
            purchased,
            mine: self.selected.len() as u32,
        }
    }

    /// Cells matching `filter`, skipping `offset` matches.
    pub fn page(&self, filter: QuotaFilter, offset: usize, limit: usize) -> Vec<QuotaCell> {
        let limit = limit.min(MAX_PAGE);

        let cell = |number| QuotaCell {
            number,
            status: self.status(number),
        };

        let numbers: Box<dyn Iterator<Item = u32> + '_> = match filter {
            QuotaFilter::Reserved => Box::new(self.reserved.iter().copied()),
            QuotaFilter::Purchased => Box::new(self.purchased.iter().copied()),
            QuotaFilter::Mine => Box::new(self.selected.iter().copied()),
            QuotaFilter::All | QuotaFilter::Available => Box::new(1..=self.total),
        };

        numbers
            .map(cell)
            .filter(|c| filter.matches(c.status))
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Grid width used by the storefront.
    pub fn grid_columns(&self) -> u8 {
        match self.total {
            0..=100 => 10,
            101..=1000 => 20,
            _ => 25,
        }
    }

    pub fn is_taken(&self, number: u32) -> bool {
        self.purchased.contains(&number) || self.reserved.contains(&number)
    }
}

/// Quantity picker for automatic campaigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantitySelector {
    quantity: u32,
    ticket_price: Cents,
}

impl QuantitySelector {
    /// Manual campaigns pick from the grid instead.
    pub fn for_model(model: CampaignModel, ticket_price: Cents, initial: u32) -> Option<Self> {
        (model == CampaignModel::Automatic).then(|| Self {
            quantity: initial.max(1),
            ticket_price,
        })
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn add(&mut self, delta: i64) -> u32 {
        let next = (i64::from(self.quantity) + delta).clamp(1, i64::from(u32::MAX));
        self.quantity = next as u32;
        self.quantity
    }

    pub fn set(&mut self, value: u32) -> u32 {
        self.quantity = value.max(1);
        self.quantity
    }

    pub fn total(&self) -> Cents {
        self.ticket_price
            .times(u64::from(self.quantity))
            .unwrap_or(Cents(u64::MAX))
    }
}

/// Picks `quantity` distinct numbers in `1..=total` that are not in `taken`.
pub fn pick_available<R: Rng + ?Sized>(
    total: u32,
    taken: &HashSet<u32>,
    quantity: u32,
    rng: &mut R,
) -> Result<Vec<u32>, CampaignError> {
    let taken_in_range = taken.iter().filter(|n| (1..=total).contains(*n)).count() as u32;
    let available = total - taken_in_range;

    if quantity > available {
        return Err(CampaignError::SoldOut {
            requested: quantity,
            available,
        });
    }

    // Sparse boards: rejection sampling stays cheap and avoids listing millions of numbers.
    if taken_in_range <= total / 2 && quantity <= available / 2 {
        let mut picked = BTreeSet::new();
        while (picked.len() as u32) < quantity {
            let number = rng.gen_range(1..=total);
            if !taken.contains(&number) {
                picked.insert(number);
            }
        }
        return Ok(picked.into_iter().collect());
    }

    let free: Vec<u32> = (1..=total).filter(|n| !taken.contains(n)).collect();
    let mut picked: Vec<u32> = index::sample(rng, free.len(), quantity as usize)
        .into_iter()
        .map(|i| free[i])
        .collect();
    picked.sort_unstable();

    Ok(picked)
}
