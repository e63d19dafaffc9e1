//! Weekly stock market: cyclical targets, noise, ETFs and bankruptcies.

use crate::commands::Rejection;
use chrono::{Datelike, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{
    trading_weeks_remaining, BankruptcyRecord, CompanyId, PortfolioItem, Sector, SimulationState,
    StockCategory, StockCompany, StockCycle,
};
use sim_econ::{to_decimal, EconError};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Regular companies listed per category.
pub const COMPANIES_PER_CATEGORY: usize = 4;
/// Largest holding the player may build in one security.
pub const MAX_HOLDING: u64 = 1_000_000_000;
/// Price at or below which an unprotected company goes bankrupt.
pub fn bankruptcy_threshold() -> Decimal {
    Decimal::new(10, 2)
}
/// Commission charged on both sides of a trade.
pub fn commission_rate() -> Decimal {
    Decimal::new(1, 2)
}

const REGULAR_CATEGORIES: [StockCategory; 5] = [
    StockCategory::Automotive,
    StockCategory::Technology,
    StockCategory::Energy,
    StockCategory::RawMaterials,
    StockCategory::Logistics,
];

fn name_parts(category: StockCategory) -> (&'static [&'static str], &'static [&'static str]) {
    match category {
        StockCategory::Automotive => (
            &["Apex", "Velox", "Turbo", "Hyper", "Nova", "Titan", "Omega", "Prime", "Red", "Blue"],
            &["Motors", "Auto", "Engineering", "Performance", "Cars", "Mobility", "Works", "Machines"],
        ),
        StockCategory::Technology => (
            &["Cyber", "Nano", "Data", "Quantum", "Synapse", "Robo", "Logic", "Micro", "Future", "Net"],
            &["Sys", "Tech", "Soft", "Labs", "Solutions", "Systems", "Inc", "Group", "AI"],
        ),
        StockCategory::Energy => (
            &["Solar", "Atom", "Eco", "Green", "Power", "Fusion", "Volt", "Terra", "Hydro", "Sun"],
            &["Energy", "Power", "Grid", "Electric", "Nuclear", "Gen", "Resources", "Dynamics"],
        ),
        StockCategory::RawMaterials => (
            &["Steel", "Iron", "Gold", "Heavy", "Global", "United", "Deep", "Rock", "Geo", "Metal"],
            &["Mining", "Works", "Materials", "Corp", "Steel", "Extract", "Foundry", "Resources"],
        ),
        StockCategory::Logistics => (
            &["Fast", "Global", "Trans", "Cargo", "Swift", "Pacific", "Atlantic", "Air", "Road", "Inter"],
            &["Freight", "Logistics", "Shipping", "Lines", "Transport", "Express", "Delivery", "Port"],
        ),
        StockCategory::Finance => (&["General"], &["Holdings"]),
    }
}

/// Random "Prefix Suffix" name from the category's pools.
pub fn company_name<R: Rng>(category: StockCategory, rng: &mut R) -> String {
    let (prefixes, suffixes) = name_parts(category);
    let prefix = prefixes.choose(rng).copied().unwrap_or("General");
    let suffix = suffixes.choose(rng).copied().unwrap_or("Corp");
    format!("{prefix} {suffix}")
}

fn sector_of(category: StockCategory) -> Sector {
    match category {
        StockCategory::Automotive => Sector::Automotive,
        StockCategory::Technology => Sector::Technology,
        StockCategory::Energy => Sector::Energy,
        StockCategory::RawMaterials => Sector::HeavyIndustry,
        StockCategory::Logistics => Sector::Logistics,
        StockCategory::Finance => Sector::Finance,
    }
}

fn category_slug(category: StockCategory) -> &'static str {
    match category {
        StockCategory::Automotive => "automotive",
        StockCategory::Technology => "technology",
        StockCategory::Energy => "energy",
        StockCategory::RawMaterials => "raw-materials",
        StockCategory::Logistics => "logistics",
        StockCategory::Finance => "finance",
    }
}

fn cents(v: f64) -> Result<Decimal, EconError> {
    Ok(to_decimal(v)?.round_dp(2))
}

/// A new 3–7 year cycle starting from `price`: stable growth (40%), boom
/// (20%), decline (30%) or crash to one cent (10%).
pub fn generate_cycle<R: Rng>(price: Decimal, year: i32, rng: &mut R) -> Result<StockCycle, EconError> {
    let duration = 3 + rng.gen_range(0..5);
    let roll: f64 = rng.gen();
    let factor = if roll < 0.4 {
        1.2 + rng.gen::<f64>() * 0.6
    } else if roll < 0.6 {
        2.0 + rng.gen::<f64>() * 2.0
    } else if roll < 0.9 {
        0.3 + rng.gen::<f64>() * 0.4
    } else {
        return Ok(StockCycle {
            end_year: year + duration,
            target: Decimal::new(1, 2),
        });
    };
    Ok(StockCycle {
        end_year: year + duration,
        target: (price * to_decimal(factor)?).round_dp(2),
    })
}

fn fresh_listing<R: Rng>(
    slot: String,
    id: CompanyId,
    generation: u32,
    category: StockCategory,
    ipo: Decimal,
    is_protected: bool,
    year: i32,
    rng: &mut R,
) -> Result<StockCompany, EconError> {
    let volatility = 0.05 + rng.gen::<f64>() * 0.15;
    let cycle = generate_cycle(ipo, year, rng)?;
    Ok(StockCompany {
        id,
        slot,
        generation,
        name: company_name(category, rng),
        category,
        sector: sector_of(category),
        starting_price: ipo,
        current_price: ipo,
        volatility,
        total_shares: 10_000_000,
        history: VecDeque::from([ipo]),
        is_etf: false,
        is_protected,
        cycle,
        formation_year: year,
    })
}

fn etf(id: &str, name: &str, category: StockCategory, sector: Sector, price: Decimal, volatility: f64, shares: u64, year: i32) -> StockCompany {
    StockCompany {
        id: CompanyId::from(id),
        slot: id.to_string(),
        generation: 0,
        name: name.to_string(),
        category,
        sector,
        starting_price: price,
        current_price: price,
        volatility,
        total_shares: shares,
        history: VecDeque::from([price]),
        is_etf: true,
        is_protected: false,
        cycle: StockCycle {
            end_year: year,
            target: price,
        },
        formation_year: year,
    }
}

/// Opening listings: four companies per category followed by five ETFs.
/// The first three raw-materials and first two energy companies are blue
/// chips.
pub fn initial_universe<R: Rng>(year: i32, rng: &mut R) -> Result<Vec<StockCompany>, EconError> {
    let mut out = Vec::with_capacity(REGULAR_CATEGORIES.len() * COMPANIES_PER_CATEGORY + 5);
    for category in REGULAR_CATEGORIES {
        for i in 0..COMPANIES_PER_CATEGORY {
            let slot = format!("{}-{i}", category_slug(category));
            let is_protected = matches!(
                (category, i),
                (StockCategory::RawMaterials, 0..=2) | (StockCategory::Energy, 0..=1)
            );
            let ipo = cents(0.5 + rng.gen::<f64>() * 4.5)?;
            let id = CompanyId(slot.clone());
            out.push(fresh_listing(slot, id, 0, category, ipo, is_protected, year, rng)?);
        }
    }
    out.extend([
        etf("etf-global", "Global Market Index", StockCategory::Finance, Sector::Finance, Decimal::new(500, 2), 0.02, 50_000_000, year),
        etf("etf-tech", "Future Tech ETF", StockCategory::Technology, Sector::Technology, Decimal::new(350, 2), 0.08, 20_000_000, year),
        etf("etf-heavy", "Heavy Giants ETF", StockCategory::RawMaterials, Sector::HeavyIndustry, Decimal::new(200, 2), 0.04, 30_000_000, year),
        etf("etf-auto", "Auto-Moto Fund", StockCategory::Automotive, Sector::Automotive, Decimal::new(400, 2), 0.06, 15_000_000, year),
        etf("etf-energy", "Global Power ETF", StockCategory::Energy, Sector::Energy, Decimal::new(600, 2), 0.03, 50_000_000, year),
    ]);
    Ok(out)
}

/// Replace a bankrupt company with a fresh listing in the same slot. The
/// holding keyed by the old id is consumed here so it cannot carry over to
/// the new identity.
pub fn regenerate<R: Rng>(
    old: StockCompany,
    holding: Option<PortfolioItem>,
    date: NaiveDateTime,
    rng: &mut R,
) -> Result<(StockCompany, BankruptcyRecord), EconError> {
    let year = date.year();
    let generation = old.generation + 1;
    let id = CompanyId(format!("{}-g{generation}", old.slot));
    let ipo = cents(2.0 + rng.gen::<f64>() * 3.0)?;
    let fresh = fresh_listing(old.slot.clone(), id, generation, old.category, ipo, false, year, rng)?;
    let (shares_lost, money_lost) = match holding {
        Some(h) => (h.shares, h.avg_buy_price * Decimal::from(h.shares)),
        None => (0, Decimal::ZERO),
    };
    let record = BankruptcyRecord {
        slot: old.slot,
        date: date.date(),
        old_company_name: old.name,
        old_category: old.category,
        ipo_price: old.starting_price,
        years_active: year - old.formation_year,
        shares_lost,
        money_lost,
        new_company_name: fresh.name.clone(),
        new_category: fresh.category,
        new_ipo_price: ipo,
    };
    Ok((fresh, record))
}

fn sector_means(companies: &[StockCompany]) -> (BTreeMap<Sector, (Decimal, u32)>, Decimal) {
    let mut by_sector: BTreeMap<Sector, (Decimal, u32)> = BTreeMap::new();
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for c in companies.iter().filter(|c| !c.is_etf) {
        let e = by_sector.entry(c.sector).or_insert((Decimal::ZERO, 0));
        e.0 += c.current_price;
        e.1 += 1;
        sum += c.current_price;
        count += 1;
    }
    let global = if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    };
    (by_sector, global)
}

fn etf_step<R: Rng>(etf: &StockCompany, target: Decimal, rng: &mut R) -> Result<Decimal, EconError> {
    let drift = (target - etf.current_price) * Decimal::new(5, 2);
    let noise = to_decimal(rng.gen_range(-0.2..0.2))?;
    Ok((etf.current_price + drift + noise).round_dp(2).max(Decimal::new(1, 2)))
}

fn company_step<R: Rng>(c: &mut StockCompany, date: NaiveDateTime, rng: &mut R) -> Result<Decimal, EconError> {
    let year = date.year();
    if year >= c.cycle.end_year {
        c.cycle = generate_cycle(c.current_price, year, rng)?;
    }
    let weeks = trading_weeks_remaining(date, c.cycle.end_year);
    let trend = (c.cycle.target - c.current_price) / Decimal::from(weeks);
    let damping = if c.is_protected { 0.3 } else { 1.0 };
    let swing = rng.gen_range(-1.0..1.0) * c.volatility * 0.5 * damping;
    let noise = to_decimal(swing)? * c.current_price;
    Ok(c.current_price + trend + noise)
}

/// Advance every security by one week. Bankrupt companies are replaced in
/// their slot, their holdings purged, and a record returned for each. On
/// error neither the universe nor the portfolio is touched.
pub fn weekly_update<R: Rng>(
    companies: &mut Vec<StockCompany>,
    portfolio: &mut BTreeMap<CompanyId, PortfolioItem>,
    date: NaiveDateTime,
    rng: &mut R,
) -> Result<Vec<BankruptcyRecord>, EconError> {
    let (by_sector, global) = sector_means(companies);
    let mut records = Vec::new();
    let mut delisted = Vec::new();
    let mut next = Vec::with_capacity(companies.len());
    for c in companies.iter() {
        let mut c = c.clone();
        if c.is_etf {
            let target = if c.sector == Sector::Finance {
                global
            } else {
                by_sector
                    .get(&c.sector)
                    .map(|(sum, n)| sum / Decimal::from(*n))
                    .unwrap_or(c.current_price)
            };
            let price = etf_step(&c, target, rng)?;
            c.current_price = price;
            c.push_price(price);
            next.push(c);
            continue;
        }

        let raw = company_step(&mut c, date, rng)?;
        let price = raw.round_dp(2);
        if c.is_protected && raw < Decimal::ONE {
            let price = cents(1.05 + rng.gen::<f64>() * 0.10)?;
            c.current_price = price;
            c.push_price(price);
            next.push(c);
        } else if !c.is_protected && price <= bankruptcy_threshold() {
            let holding = portfolio.get(&c.id).cloned();
            delisted.push(c.id.clone());
            let (fresh, record) = regenerate(c, holding, date, rng)?;
            records.push(record);
            next.push(fresh);
        } else {
            c.current_price = price;
            c.push_price(price);
            next.push(c);
        }
    }

    for id in &delisted {
        portfolio.remove(id);
    }
    for record in &records {
        warn!(
            slot = %record.slot,
            old = %record.old_company_name,
            new = %record.new_company_name,
            shares_lost = record.shares_lost,
            "company bankrupt; slot relisted"
        );
    }
    *companies = next;
    Ok(records)
}

fn validate_shares(shares: u64) -> Result<(), Rejection> {
    if shares == 0 {
        return Err(Rejection::NonPositiveAmount);
    }
    Ok(())
}

/// Buy `shares` at market plus commission.
pub fn buy_shares(state: &mut SimulationState, company: &CompanyId, shares: u64) -> Result<(), Rejection> {
    validate_shares(shares)?;
    let price = state
        .company(company)
        .map(|c| c.current_price)
        .ok_or_else(|| Rejection::unknown("company", company))?;
    let gross = price * Decimal::from(shares);
    let fee = gross * commission_rate();
    let total = gross + fee;
    if state.money < total {
        return Err(Rejection::InsufficientFunds {
            needed: total,
            available: state.money,
        });
    }
    let held = state.portfolio.get(company).cloned().unwrap_or(PortfolioItem {
        shares: 0,
        avg_buy_price: Decimal::ZERO,
    });
    let new_shares = held.shares.saturating_add(shares);
    if new_shares > MAX_HOLDING {
        return Err(Rejection::HoldingCap(MAX_HOLDING));
    }
    let avg = ((held.avg_buy_price * Decimal::from(held.shares) + gross) / Decimal::from(new_shares)).round_dp(2);
    state.money -= total;
    state.stock_ledger.month_spend += gross;
    state.stock_ledger.month_fees += fee;
    state.stock_ledger.total_fees += fee;
    state.portfolio.insert(
        company.clone(),
        PortfolioItem {
            shares: new_shares,
            avg_buy_price: avg,
        },
    );
    Ok(())
}

/// Sell `shares` at market minus commission, realising profit against the
/// average buy price.
pub fn sell_shares(state: &mut SimulationState, company: &CompanyId, shares: u64) -> Result<(), Rejection> {
    validate_shares(shares)?;
    let price = state
        .company(company)
        .map(|c| c.current_price)
        .ok_or_else(|| Rejection::unknown("company", company))?;
    let held = state
        .portfolio
        .get(company)
        .cloned()
        .ok_or(Rejection::InsufficientShares { requested: shares, held: 0 })?;
    if held.shares < shares {
        return Err(Rejection::InsufficientShares {
            requested: shares,
            held: held.shares,
        });
    }
    let gross = price * Decimal::from(shares);
    let fee = gross * commission_rate();
    let proceeds = gross - fee;
    state.money += proceeds;
    state.stock_ledger.month_revenue += proceeds;
    state.stock_ledger.month_fees += fee;
    state.stock_ledger.total_fees += fee;
    state.stock_ledger.realized_profit += proceeds - held.avg_buy_price * Decimal::from(shares);
    let remaining = held.shares - shares;
    if remaining == 0 {
        state.portfolio.remove(company);
    } else if let Some(item) = state.portfolio.get_mut(company) {
        item.shares = remaining;
    }
    Ok(())
}

/// Market value of all holdings.
pub fn portfolio_value(state: &SimulationState) -> Decimal {
    state
        .portfolio
        .iter()
        .filter_map(|(id, item)| state.company(id).map(|c| c.current_price * Decimal::from(item.shares)))
        .sum()
}
