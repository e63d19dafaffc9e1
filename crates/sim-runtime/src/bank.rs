//! Loan and term deposit accounts.

use crate::commands::Rejection;
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use sim_core::{LogKind, SimulationState, TermDeposit};
use sim_econ::{deposit_payout, deposit_rate, loan_payment, EconError};
use tracing::info;

/// Debt booked per unit of cash borrowed.
pub fn loan_markup() -> Decimal {
    Decimal::new(15, 1)
}

/// Borrow `amount`; the balance grows by 1.5× the cash received.
pub fn take_loan(state: &mut SimulationState, amount: Decimal) -> Result<(), Rejection> {
    if amount <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }
    let debt = amount * loan_markup();
    state.money += amount;
    state.bank.loan += debt;
    state.push_log(LogKind::Info, format!("Loan taken: ${amount}, debt ${debt}"), None);
    Ok(())
}

/// Repay up to `amount`, bounded by the balance and available cash.
/// Returns the sum paid.
pub fn repay_loan(state: &mut SimulationState, amount: Decimal) -> Result<Decimal, Rejection> {
    if amount <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }
    if state.bank.loan <= Decimal::ZERO {
        return Err(Rejection::NoLoan);
    }
    let paid = amount.min(state.bank.loan).min(state.money);
    if paid <= Decimal::ZERO {
        return Err(Rejection::InsufficientFunds {
            needed: amount.min(state.bank.loan),
            available: state.money,
        });
    }
    state.money -= paid;
    state.bank.loan -= paid;
    Ok(paid)
}

/// Monthly service: pays `ceil(balance / 120)` capped at the balance and
/// shrinks the balance by the same. The payment is booked as an expense by
/// the caller.
pub fn service_loan(state: &mut SimulationState) -> Decimal {
    let payment = loan_payment(state.bank.loan);
    state.bank.loan -= payment;
    state.bank.last_loan_payment = payment;
    payment
}

pub fn create_deposit(state: &mut SimulationState, amount: Decimal) -> Result<(), Rejection> {
    if amount <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }
    if state.bank.deposit.is_some() {
        return Err(Rejection::DepositExists);
    }
    if state.money < amount {
        return Err(Rejection::InsufficientFunds {
            needed: amount,
            available: state.money,
        });
    }
    state.money -= amount;
    state.bank.deposit = Some(TermDeposit {
        initial_amount: amount,
        current_amount: amount,
        start_date: state.clock.date,
        last_compound_date: None,
        years_completed: 0,
        interest_rate: deposit_rate(),
    });
    state.push_log(LogKind::Info, format!("Term deposit opened: ${amount} at 5%"), None);
    Ok(())
}

/// Close the deposit, paying `floor(initial × 1.05^years)` for completed
/// years only.
pub fn withdraw_deposit(state: &mut SimulationState) -> Result<Decimal, Rejection> {
    let deposit = state.bank.deposit.as_ref().ok_or(Rejection::NoDeposit)?;
    let payout = deposit_payout(deposit.initial_amount, deposit.years_completed)?;
    let profit = payout - deposit.initial_amount;
    let years = deposit.years_completed;
    state.bank.deposit = None;
    state.money += payout;
    let message = if years > 0 {
        format!("Deposit withdrawn: ${payout} (profit ${profit} over {years} years)")
    } else {
        format!("Deposit broken early: ${payout}, no interest earned")
    };
    state.push_log(LogKind::Info, message, None);
    Ok(payout)
}

fn compound_period() -> Duration {
    Duration::days(365)
}

/// Credit a year of interest once 365 days have passed since the start or
/// the last compounding. Returns the interest credited, if any.
pub fn compound_deposit(state: &mut SimulationState, now: NaiveDateTime) -> Result<Option<Decimal>, EconError> {
    let Some(deposit) = state.bank.deposit.as_mut() else {
        return Ok(None);
    };
    let since = deposit.last_compound_date.unwrap_or(deposit.start_date);
    if now - since < compound_period() {
        return Ok(None);
    }
    let interest = (deposit.current_amount * deposit.interest_rate).floor();
    deposit.current_amount = deposit
        .current_amount
        .checked_add(interest)
        .ok_or(EconError::NonFinite)?;
    deposit.last_compound_date = Some(now);
    deposit.years_completed += 1;
    state.bank.last_deposit_interest = interest;
    info!(%interest, years = deposit.years_completed, "deposit compounded");
    Ok(Some(interest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{Catalog, SimConfig};

    fn state() -> SimulationState {
        SimulationState::new(&SimConfig::default(), &Catalog::builtin().unwrap())
    }

    fn advance_days(s: &mut SimulationState, days: i64) {
        for _ in 0..days {
            s.clock.date += Duration::days(1);
            let now = s.clock.date;
            compound_deposit(s, now).unwrap();
        }
    }

    #[test]
    fn small_loan_is_paid_off_without_overcharging() {
        let mut s = state();
        take_loan(&mut s, Decimal::ONE).unwrap();
        assert_eq!(s.bank.loan, Decimal::new(15, 1));
        assert_eq!(service_loan(&mut s), Decimal::ONE);
        assert_eq!(s.bank.loan, Decimal::new(5, 1));
        assert_eq!(service_loan(&mut s), Decimal::new(5, 1));
        assert_eq!(s.bank.loan, Decimal::ZERO);
        assert_eq!(service_loan(&mut s), Decimal::ZERO);
    }

    #[test]
    fn loans_book_half_again_as_debt() {
        let mut s = state();
        take_loan(&mut s, Decimal::new(1_000_000, 0)).unwrap();
        assert_eq!(s.money, Decimal::new(6_000_000, 0));
        assert_eq!(s.bank.loan, Decimal::new(1_500_000, 0));
        assert_eq!(service_loan(&mut s), Decimal::new(12_500, 0));
        assert_eq!(s.bank.loan, Decimal::new(1_487_500, 0));
    }

    #[test]
    fn repayment_is_bounded() {
        let mut s = state();
        assert_eq!(repay_loan(&mut s, Decimal::ONE), Err(Rejection::NoLoan));
        take_loan(&mut s, Decimal::new(100, 0)).unwrap();
        assert_eq!(repay_loan(&mut s, Decimal::new(1_000, 0)).unwrap(), Decimal::new(150, 0));
        assert_eq!(s.bank.loan, Decimal::ZERO);
        take_loan(&mut s, Decimal::new(100, 0)).unwrap();
        s.money = Decimal::ZERO;
        assert!(matches!(
            repay_loan(&mut s, Decimal::ONE),
            Err(Rejection::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn one_deposit_at_a_time() {
        let mut s = state();
        create_deposit(&mut s, Decimal::new(1_000, 0)).unwrap();
        assert_eq!(
            create_deposit(&mut s, Decimal::new(1_000, 0)),
            Err(Rejection::DepositExists)
        );
    }

    #[test]
    fn deposit_pays_only_completed_years() {
        let mut s = state();
        let initial = Decimal::new(1_000_000, 0);
        create_deposit(&mut s, initial).unwrap();
        advance_days(&mut s, 365 * 2);
        let at_two_years = deposit_payout(initial, 2).unwrap();
        assert_eq!(s.bank.deposit.as_ref().unwrap().years_completed, 2);
        assert_eq!(s.bank.deposit.as_ref().unwrap().current_amount, Decimal::new(1_102_500, 0));

        let mut mid_year = s.clone();
        advance_days(&mut mid_year, 200);
        assert_eq!(withdraw_deposit(&mut mid_year).unwrap(), at_two_years);
        assert_eq!(withdraw_deposit(&mut s).unwrap(), at_two_years);
        assert!(s.bank.deposit.is_none());
    }

    #[test]
    fn early_break_returns_principal() {
        let mut s = state();
        let start = s.money;
        create_deposit(&mut s, Decimal::new(50_000, 0)).unwrap();
        advance_days(&mut s, 364);
        withdraw_deposit(&mut s).unwrap();
        assert_eq!(s.money, start);
    }

    proptest! {
        #[test]
        fn loan_service_never_goes_negative(cents in 0i64..1_000_000_000_000, months in 1usize..240) {
            let mut s = state();
            s.bank.loan = Decimal::new(cents, 2);
            for _ in 0..months {
                let before = s.bank.loan;
                let payment = service_loan(&mut s);
                prop_assert_eq!(payment, loan_payment(before));
                prop_assert_eq!(s.bank.loan, before - payment);
                prop_assert!(s.bank.loan >= Decimal::ZERO);
            }
        }
    }
}
