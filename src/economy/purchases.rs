use rand::Rng;

use super::ledger::{EconomyLedger, LedgerReceipt};
use crate::error::{Result, WorkforceError};
use crate::lifecycle::wellbeing;
use crate::storage::registry::AgentRegistry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Benefit {
    Motivation(f64),
    FatigueRelief(f64),
    Cosmetic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Purchase {
    pub name: &'static str,
    pub cost: u64,
    pub benefit: Benefit,
}

pub const CATALOG: &[Purchase] = &[
    Purchase {
        name: "Recreation Time",
        cost: 50,
        benefit: Benefit::Motivation(0.15),
    },
    Purchase {
        name: "Avatar Customization",
        cost: 25,
        benefit: Benefit::Cosmetic,
    },
    Purchase {
        name: "Energy Boost",
        cost: 15,
        benefit: Benefit::FatigueRelief(0.2),
    },
];

pub fn find(name: &str) -> Option<&'static Purchase> {
    CATALOG
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

/// Spends the item's cost and applies its benefit.
pub fn buy(registry: &mut AgentRegistry, agent_id: &str, name: &str) -> Result<LedgerReceipt> {
    let purchase = find(name).ok_or_else(|| WorkforceError::UnknownPurchase(name.to_string()))?;
    let receipt = EconomyLedger::spend(registry, agent_id, purchase.cost, purchase.name)?;

    let agent = registry.get_mut(agent_id)?;
    match purchase.benefit {
        Benefit::Motivation(amount) => wellbeing::boost_motivation(&mut agent.lifecycle, amount),
        Benefit::FatigueRelief(amount) => wellbeing::relieve_fatigue(&mut agent.lifecycle, amount),
        Benefit::Cosmetic => {}
    }
    Ok(receipt)
}

/// An agent sitting on more than `threshold` credits sometimes treats itself.
pub fn maybe_treat<R: Rng>(
    registry: &mut AgentRegistry,
    agent_id: &str,
    threshold: u64,
    chance: f64,
    rng: &mut R,
) -> Result<Option<LedgerReceipt>> {
    let credits = registry.get(agent_id)?.credits;
    if credits <= threshold || chance <= 0.0 || rng.random::<f64>() >= chance {
        return Ok(None);
    }

    let affordable: Vec<&Purchase> = CATALOG.iter().filter(|p| p.cost <= credits).collect();
    if affordable.is_empty() {
        return Ok(None);
    }
    let choice = affordable[rng.random_range(0..affordable.len())];
    buy(registry, agent_id, choice.name).map(Some)
}
