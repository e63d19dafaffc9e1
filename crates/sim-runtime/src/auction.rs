//! Land auctions every fifth year, and direct plot purchases from a
//! developer.
//!
//! A standing bid is held in escrow: cash leaves the account when the bid is
//! placed and comes back if the auction is lost or abandoned.

use crate::commands::Rejection;
use crate::SimEvent;
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{
    AuctionResult, AuctionState, FacilityStatus, Factory, FactoryId, LogKind, SimulationState,
};
use sim_econ::{developer_price, land_value, scale_floor, EconError};
use tracing::info;

/// Auctions a company may enter over a game.
pub const MAX_AUCTION_ATTEMPTS: u32 = 5;
pub const AUCTION_INTERVAL: i32 = 5;

struct PlantSpec {
    capacity: u32,
    workers: u32,
    production_target: u32,
}

fn build_factory(state: &mut SimulationState, spec: PlantSpec) -> FactoryId {
    let id = FactoryId(state.allocate_id("factory"));
    let name = format!("Plant {}", state.factories.len() + 1);
    state.factories.push(Factory {
        id: id.clone(),
        name,
        level: 1,
        capacity: spec.capacity,
        current_production: 0,
        efficiency: 80,
        workers: spec.workers,
        upgrade_cost: Decimal::new(50_000, 0),
        wage_level: 1.0,
        status: FacilityStatus::Active,
        producing_model: None,
        production_target: spec.production_target,
        inventory: 0,
    });
    id
}

/// Open an auction for `year` when the calendar, the attempt budget and the
/// factory limit allow it.
pub fn maybe_start_auction<R: Rng>(
    state: &mut SimulationState,
    year: i32,
    rng: &mut R,
) -> Result<Option<SimEvent>, EconError> {
    if year % AUCTION_INTERVAL != 0
        || state.auction.is_some()
        || state.expansion.auction_attempts >= MAX_AUCTION_ATTEMPTS
        || state.factories.len() >= state.expansion.factory_limit()
    {
        return Ok(None);
    }
    let land = land_value(year)?;
    let rival_bid = scale_floor(land, rng.gen_range(0.9..1.2))?;
    state.auction = Some(AuctionState {
        year,
        land_value: land,
        rival_bid,
        user_bid: Decimal::ZERO,
    });
    state.push_log(
        LogKind::Info,
        format!("Land auction opened: plot valued at ${land}, closes at year end"),
        None,
    );
    info!(year, %land, "auction started");
    Ok(Some(SimEvent::AuctionStarted { year, land_value: land }))
}

/// Replace the standing bid with `amount`, moving only the difference in or
/// out of escrow.
pub fn place_bid(state: &mut SimulationState, amount: Decimal) -> Result<(), Rejection> {
    let auction = state.auction.as_mut().ok_or(Rejection::NoAuction)?;
    let difference = amount - auction.user_bid;
    if difference > state.money {
        return Err(Rejection::InsufficientFunds {
            needed: difference,
            available: state.money,
        });
    }
    auction.user_bid = amount;
    state.money -= difference;
    Ok(())
}

/// Close the open auction. A bid strictly above the rival's wins a small
/// plant; otherwise the escrow is refunded. Either way an attempt is used.
pub fn resolve_auction(state: &mut SimulationState) -> Option<SimEvent> {
    let auction = state.auction.take()?;
    let won = auction.user_bid > auction.rival_bid;
    state.expansion.auction_attempts += 1;
    if won {
        let id = build_factory(
            state,
            PlantSpec {
                capacity: 30,
                workers: 20,
                production_target: 15,
            },
        );
        state.push_log(
            LogKind::Success,
            format!("Auction won with ${}: new plant {id}", auction.user_bid),
            None,
        );
    } else {
        state.money += auction.user_bid;
        state.push_log(
            LogKind::Info,
            format!(
                "Auction lost: rival bid ${} against ${}",
                auction.rival_bid, auction.user_bid
            ),
            None,
        );
    }
    info!(year = auction.year, won, "auction resolved");
    let result = AuctionResult {
        year: auction.year,
        won,
        user_bid: auction.user_bid,
        rival_bid: auction.rival_bid,
    };
    state.transient.auction_result = Some(result.clone());
    Some(SimEvent::AuctionResolved(result))
}

/// Buy a plot outright at the developer's price. Any open auction is
/// abandoned and its escrow refunded.
pub fn buy_from_developer(state: &mut SimulationState) -> Result<(), Rejection> {
    let limit = state.expansion.factory_limit();
    if state.factories.len() >= limit {
        return Err(Rejection::LimitReached { kind: "factory", limit });
    }
    let price = developer_price(state.clock.year())?;
    let escrow = state.auction.as_ref().map_or(Decimal::ZERO, |a| a.user_bid);
    if state.money + escrow < price {
        return Err(Rejection::InsufficientFunds {
            needed: price,
            available: state.money + escrow,
        });
    }
    state.auction = None;
    state.money += escrow;
    state.money -= price;
    let first = state.factories.is_empty();
    let id = build_factory(
        state,
        PlantSpec {
            capacity: if first { 100 } else { 20 },
            workers: 50,
            production_target: if first { 80 } else { 16 },
        },
    );
    state.push_log(LogKind::Success, format!("Bought land from developer for ${price}: plant {id}"), None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Catalog, SimConfig};

    fn state() -> SimulationState {
        SimulationState::new(&SimConfig::default(), &Catalog::builtin().unwrap())
    }

    fn opened(s: &mut SimulationState) {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(maybe_start_auction(s, 1955, &mut rng).unwrap().is_some());
    }

    #[test]
    fn auctions_open_on_fifth_years_only() {
        let mut s = state();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(maybe_start_auction(&mut s, 1953, &mut rng).unwrap().is_none());
        opened(&mut s);
        let a = s.auction.clone().unwrap();
        assert_eq!(a.land_value, land_value(1955).unwrap());
        assert!(a.rival_bid >= scale_floor(a.land_value, 0.9).unwrap());
        assert!(a.rival_bid <= scale_floor(a.land_value, 1.2).unwrap());
    }

    #[test]
    fn bids_move_only_the_difference() {
        let mut s = state();
        assert_eq!(place_bid(&mut s, Decimal::ONE), Err(Rejection::NoAuction));
        opened(&mut s);
        let start = s.money;
        place_bid(&mut s, Decimal::new(400_000, 0)).unwrap();
        place_bid(&mut s, Decimal::new(300_000, 0)).unwrap();
        assert_eq!(s.money, start - Decimal::new(300_000, 0));
        assert!(matches!(
            place_bid(&mut s, Decimal::new(10_000_000, 0)),
            Err(Rejection::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn winning_bid_builds_a_plant() {
        let mut s = state();
        opened(&mut s);
        let rival = s.auction.as_ref().unwrap().rival_bid;
        place_bid(&mut s, rival + Decimal::ONE).unwrap();
        let money = s.money;
        let Some(SimEvent::AuctionResolved(r)) = resolve_auction(&mut s) else {
            panic!("expected a result");
        };
        assert!(r.won);
        assert_eq!(s.money, money);
        assert_eq!(s.factories.len(), 2);
        assert_eq!(s.factories[1].capacity, 30);
        assert_eq!(s.expansion.auction_attempts, 1);
        assert!(s.auction.is_none());
        assert_eq!(s.transient.auction_result, Some(r));
    }

    #[test]
    fn losing_bid_is_refunded() {
        let mut s = state();
        let start = s.money;
        opened(&mut s);
        place_bid(&mut s, Decimal::new(1_000, 0)).unwrap();
        resolve_auction(&mut s);
        assert_eq!(s.money, start);
        assert_eq!(s.factories.len(), 1);
        assert_eq!(s.expansion.auction_attempts, 1);
    }

    #[test]
    fn attempt_budget_is_finite() {
        let mut s = state();
        s.expansion.auction_attempts = MAX_AUCTION_ATTEMPTS;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(maybe_start_auction(&mut s, 1955, &mut rng).unwrap().is_none());
    }

    #[test]
    fn developer_purchase_abandons_the_auction() {
        let mut s = state();
        opened(&mut s);
        let start = s.money;
        place_bid(&mut s, Decimal::new(100_000, 0)).unwrap();
        buy_from_developer(&mut s).unwrap();
        let price = developer_price(1950).unwrap();
        assert_eq!(s.money, start - price);
        assert!(s.auction.is_none());
        assert_eq!(s.factories[1].capacity, 20);
        assert_eq!(s.factories[1].production_target, 16);
    }

    #[test]
    fn developer_respects_the_factory_limit() {
        let mut s = state();
        s.money = Decimal::new(1_000_000_000, 0);
        for _ in 1..s.expansion.factory_limit() {
            buy_from_developer(&mut s).unwrap();
        }
        assert!(matches!(
            buy_from_developer(&mut s),
            Err(Rejection::LimitReached { kind: "factory", .. })
        ));
    }
}
