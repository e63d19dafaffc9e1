//! Player command surface. Every command either applies in full or is
//! rejected with state untouched.

use crate::{auction, bank, events, facilities, models, stocks};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::clock::MAX_SPEED;
use sim_core::{
    money_from_f64, Catalog, ClassId, CompanyId, DealershipId, FactoryId, ModelId, PartId,
    SimulationState, ValidationError,
};
use sim_econ::EconError;
use std::fmt;
use thiserror::Error;

pub use models::ModelDesign;

/// Why a command was not applied.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] ValidationError),
    #[error("numeric fault: {0}")]
    Numeric(#[from] EconError),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("holding would exceed {0} shares")]
    HoldingCap(u64),
    #[error("cannot sell {requested} shares, holding {held}")]
    InsufficientShares { requested: u64, held: u64 },
    #[error("unknown {kind}: {id}")]
    UnknownId { kind: &'static str, id: String },
    #[error("{kind} limit of {limit} reached")]
    LimitReached { kind: &'static str, limit: usize },
    #[error("{kind} already at max level {level}")]
    MaxLevel { kind: &'static str, level: u32 },
    #[error("efficiency already at 100%")]
    MaxEfficiency,
    #[error("{kind} {id} is not unlocked")]
    NotUnlocked { kind: &'static str, id: String },
    #[error("{kind} {id} is already unlocked")]
    AlreadyUnlocked { kind: &'static str, id: String },
    #[error("not available before {0}")]
    TooEarly(i32),
    #[error("invalid design: {0}")]
    InvalidDesign(String),
    #[error("model {0} is assigned to a factory")]
    ModelInUse(String),
    #[error("speed {0} is out of range")]
    SpeedOutOfRange(u32),
    #[error("a decision is pending")]
    DecisionPending,
    #[error("nothing is waiting for a decision")]
    NoPendingDecision,
    #[error("no outstanding loan")]
    NoLoan,
    #[error("a term deposit is already open")]
    DepositExists,
    #[error("no open term deposit")]
    NoDeposit,
    #[error("no auction is open")]
    NoAuction,
}

impl Rejection {
    pub fn unknown(kind: &'static str, id: &impl fmt::Display) -> Self {
        Rejection::UnknownId {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result of applying a command.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Applied,
    Rejected(Rejection),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

impl From<Result<(), Rejection>> for CommandOutcome {
    fn from(r: Result<(), Rejection>) -> Self {
        match r {
            Ok(()) => CommandOutcome::Applied,
            Err(e) => CommandOutcome::Rejected(e),
        }
    }
}

/// Commands accepted from the host. Amounts arrive as `f64` and are
/// validated before touching the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SetSpeed { speed: u32 },
    TogglePause,
    BuyDealership,
    UpgradeDealership { id: DealershipId },
    ToggleDealershipStatus { id: DealershipId },
    UpgradeFactory { id: FactoryId },
    ToggleFactoryStatus { id: FactoryId },
    RaiseFactoryWages { id: FactoryId },
    AssignFactory {
        id: FactoryId,
        model: Option<ModelId>,
        target: u32,
    },
    CreateCarModel { design: ModelDesign },
    UpdateCarModel { id: ModelId, design: ModelDesign },
    DeleteCarModel { id: ModelId },
    UnlockClass { id: ClassId },
    UnlockPart { id: PartId },
    AcceptContractOffer,
    RejectContractOffer,
    PayCrisisCost,
    BuyShares { company: CompanyId, shares: f64 },
    SellShares { company: CompanyId, shares: f64 },
    TakeLoan { amount: f64 },
    RepayLoan { amount: f64 },
    CreateDeposit { amount: f64 },
    WithdrawDeposit,
    PlaceBid { amount: f64 },
    BuyLandFromDeveloper,
    DismissAuctionResult,
    PurchaseFactoryExpansion,
    PurchaseShowroomExpansion,
}

/// Positive money amount from a host float.
pub fn positive_amount(v: f64) -> Result<Decimal, Rejection> {
    let amount = money_from_f64(v)?;
    if amount <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }
    Ok(amount)
}

/// Whole share count from a host float. Fractions are truncated.
pub fn share_count(v: f64) -> Result<u64, Rejection> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite.into());
    }
    if v < 0.0 {
        return Err(ValidationError::NegativeMoney.into());
    }
    if v > stocks::MAX_HOLDING as f64 {
        return Err(Rejection::HoldingCap(stocks::MAX_HOLDING));
    }
    let n = v.trunc() as u64;
    if n == 0 {
        return Err(Rejection::NonPositiveAmount);
    }
    Ok(n)
}

fn set_speed(state: &mut SimulationState, speed: u32) -> Result<(), Rejection> {
    if speed == 0 || speed > MAX_SPEED {
        return Err(Rejection::SpeedOutOfRange(speed));
    }
    if speed > 1 && state.transient.has_pending_decision() {
        return Err(Rejection::DecisionPending);
    }
    state.clock.set_speed(speed);
    Ok(())
}

/// Apply `command` to `state`.
pub fn apply(state: &mut SimulationState, catalog: &Catalog, command: Command) -> Result<(), Rejection> {
    match command {
        Command::SetSpeed { speed } => set_speed(state, speed),
        Command::TogglePause => {
            state.clock.toggle_pause();
            Ok(())
        }
        Command::BuyDealership => facilities::buy_dealership(state),
        Command::UpgradeDealership { id } => facilities::upgrade_dealership(state, &id),
        Command::ToggleDealershipStatus { id } => facilities::toggle_dealership(state, &id),
        Command::UpgradeFactory { id } => facilities::upgrade_factory(state, &id),
        Command::ToggleFactoryStatus { id } => facilities::toggle_factory(state, &id),
        Command::RaiseFactoryWages { id } => facilities::raise_wages(state, &id),
        Command::AssignFactory { id, model, target } => {
            facilities::assign_factory(state, &id, model, target)
        }
        Command::CreateCarModel { design } => models::create_model(state, catalog, design).map(|_| ()),
        Command::UpdateCarModel { id, design } => models::update_model(state, catalog, &id, design),
        Command::DeleteCarModel { id } => models::delete_model(state, &id),
        Command::UnlockClass { id } => facilities::unlock_class(state, catalog, &id),
        Command::UnlockPart { id } => facilities::unlock_part(state, catalog, &id),
        Command::AcceptContractOffer => events::accept_offer(state),
        Command::RejectContractOffer => events::reject_offer(state),
        Command::PayCrisisCost => events::pay_crisis(state),
        Command::BuyShares { company, shares } => {
            stocks::buy_shares(state, &company, share_count(shares)?)
        }
        Command::SellShares { company, shares } => {
            stocks::sell_shares(state, &company, share_count(shares)?)
        }
        Command::TakeLoan { amount } => bank::take_loan(state, positive_amount(amount)?),
        Command::RepayLoan { amount } => bank::repay_loan(state, positive_amount(amount)?).map(|_| ()),
        Command::CreateDeposit { amount } => bank::create_deposit(state, positive_amount(amount)?),
        Command::WithdrawDeposit => bank::withdraw_deposit(state).map(|_| ()),
        Command::PlaceBid { amount } => {
            let amount = money_from_f64(amount)?;
            auction::place_bid(state, amount)
        }
        Command::BuyLandFromDeveloper => auction::buy_from_developer(state),
        Command::DismissAuctionResult => {
            state.transient.auction_result = None;
            Ok(())
        }
        Command::PurchaseFactoryExpansion => {
            facilities::purchase_expansion(state, facilities::ExpansionKind::Factories)
        }
        Command::PurchaseShowroomExpansion => {
            facilities::purchase_expansion(state, facilities::ExpansionKind::Showrooms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;

    fn state() -> (SimulationState, Catalog) {
        let catalog = Catalog::builtin().unwrap();
        (SimulationState::new(&SimConfig::default(), &catalog), catalog)
    }

    #[test]
    fn amounts_are_validated_at_the_boundary() {
        assert_eq!(
            positive_amount(f64::NAN),
            Err(Rejection::InvalidAmount(ValidationError::NonFinite))
        );
        assert_eq!(
            positive_amount(-5.0),
            Err(Rejection::InvalidAmount(ValidationError::NegativeMoney))
        );
        assert_eq!(positive_amount(0.0), Err(Rejection::NonPositiveAmount));
        assert_eq!(share_count(10.9).unwrap(), 10);
        assert_eq!(share_count(0.4), Err(Rejection::NonPositiveAmount));
        assert!(matches!(share_count(f64::INFINITY), Err(Rejection::InvalidAmount(_))));
    }

    #[test]
    fn rejected_commands_leave_state_untouched() {
        let (mut s, catalog) = state();
        let before = s.clone();
        for cmd in [
            Command::TakeLoan { amount: f64::NAN },
            Command::CreateDeposit { amount: -1.0 },
            Command::PlaceBid { amount: 1000.0 },
            Command::WithdrawDeposit,
            Command::UpgradeFactory {
                id: FactoryId::from("nope"),
            },
            Command::SetSpeed { speed: 0 },
            Command::AcceptContractOffer,
            Command::UnlockClass {
                id: ClassId::from("A"),
            },
        ] {
            assert!(apply(&mut s, &catalog, cmd).is_err());
        }
        assert_eq!(s, before);
    }

    #[test]
    fn speed_is_held_while_a_decision_is_pending() {
        let (mut s, catalog) = state();
        apply(&mut s, &catalog, Command::SetSpeed { speed: 10 }).unwrap();
        assert_eq!(s.clock.speed, 10);
        s.transient.pending_crisis = Some(sim_core::CrisisEvent {
            title: "Flood".into(),
            description: "Water everywhere".into(),
            cost: Decimal::ONE,
            year: 1950,
        });
        assert_eq!(
            apply(&mut s, &catalog, Command::SetSpeed { speed: 5 }),
            Err(Rejection::DecisionPending)
        );
        apply(&mut s, &catalog, Command::SetSpeed { speed: 1 }).unwrap();
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let cmd: Command = serde_json::from_str(r#"{"command":"take_loan","amount":250000.0}"#).unwrap();
        assert_eq!(cmd, Command::TakeLoan { amount: 250_000.0 });
        let cmd: Command =
            serde_json::from_str(r#"{"command":"upgrade_factory","id":"factory-1"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::UpgradeFactory {
                id: FactoryId::from("factory-1")
            }
        );
    }
}
