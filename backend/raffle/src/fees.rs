//! # Publication Fees
//!
//! A campaign goes live only after its owner pays a one-off publication fee.
//! The fee is looked up from the estimated revenue (`total_tickets × ticket_price`)
//! against ascending bands, upper bounds inclusive.
//!
//! | revenue up to | fee |
//! |---------------|-----|
//! | R$ 100 | R$ 7 |
//! | R$ 200 | R$ 17 |
//! | R$ 400 | R$ 27 |
//! | R$ 701 | R$ 37 |
//! | R$ 1.000 | R$ 47 |
//! | R$ 2.000 | R$ 67 |
//! | R$ 4.000 | R$ 77 |
//! | R$ 7.100 | R$ 127 |
//! | R$ 10.000 | R$ 197 |
//! | R$ 20.000 | R$ 247 |
//! | R$ 30.000 | R$ 497 |
//! | R$ 50.000 | R$ 997 |
//! | R$ 70.000 | R$ 1.497 |
//! | R$ 100.000 | R$ 1.997 |
//! | R$ 150.000 | R$ 2.997 |
//! | above | R$ 3.997 |
//!
//! ## Payment Methods
//! - Pix: no surcharge
//! - Card: 3.99% of the estimated revenue plus R$ 0,39
use serde::{Deserialize, Serialize};

use crate::money::Cents;

const FEE_BANDS: [(Cents, Cents); 15] = [
    (Cents::reais(100), Cents::reais(7)),
    (Cents::reais(200), Cents::reais(17)),
    (Cents::reais(400), Cents::reais(27)),
    (Cents::reais(701), Cents::reais(37)),
    (Cents::reais(1_000), Cents::reais(47)),
    (Cents::reais(2_000), Cents::reais(67)),
    (Cents::reais(4_000), Cents::reais(77)),
    (Cents::reais(7_100), Cents::reais(127)),
    (Cents::reais(10_000), Cents::reais(197)),
    (Cents::reais(20_000), Cents::reais(247)),
    (Cents::reais(30_000), Cents::reais(497)),
    (Cents::reais(50_000), Cents::reais(997)),
    (Cents::reais(70_000), Cents::reais(1_497)),
    (Cents::reais(100_000), Cents::reais(1_997)),
    (Cents::reais(150_000), Cents::reais(2_997)),
];

const TOP_FEE: Cents = Cents::reais(3_997);

// basis points
const CARD_RATE_BPS: u128 = 399;
const CARD_FIXED: Cents = Cents(39);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Pix,
    Card,
}

/// Revenue if every ticket sells. Saturates instead of overflowing.
pub fn estimated_revenue(total_tickets: u32, ticket_price: Cents) -> Cents {
    ticket_price
        .times(u64::from(total_tickets))
        .unwrap_or(Cents(u64::MAX))
}

pub fn publication_fee(total_tickets: u32, ticket_price: Cents) -> Cents {
    fee_for_revenue(estimated_revenue(total_tickets, ticket_price))
}

pub fn fee_for_revenue(revenue: Cents) -> Cents {
    FEE_BANDS
        .iter()
        .find(|(limit, _)| revenue <= *limit)
        .map(|(_, fee)| *fee)
        .unwrap_or(TOP_FEE)
}

pub fn card_fee(revenue: Cents) -> Cents {
    // half-up rounding to the cent
    let variable = (u128::from(revenue.0) * CARD_RATE_BPS + 5_000) / 10_000;
    let variable = u64::try_from(variable).unwrap_or(u64::MAX);

    Cents(variable).saturating_add(CARD_FIXED)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub method: PaymentMethod,
    pub estimated_revenue: Cents,
    pub publication_fee: Cents,
    pub card_fee: Cents,
    pub total: Cents,
}

impl FeeQuote {
    pub fn new(total_tickets: u32, ticket_price: Cents, method: PaymentMethod) -> Self {
        let estimated_revenue = estimated_revenue(total_tickets, ticket_price);
        let publication_fee = fee_for_revenue(estimated_revenue);
        let card_fee = match method {
            PaymentMethod::Pix => Cents::ZERO,
            PaymentMethod::Card => card_fee(estimated_revenue),
        };

        Self {
            method,
            estimated_revenue,
            publication_fee,
            card_fee,
            total: publication_fee.saturating_add(card_fee),
        }
    }
}
