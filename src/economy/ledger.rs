use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkforceError};
use crate::storage::registry::AgentRegistry;
use crate::types::{Agent, AgentId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_credits: u64,
    pub total_earned: u64,
    pub total_spent: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Earned,
    Spent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub agent: AgentId,
    pub kind: EntryKind,
    pub amount: u64,
    pub balance: u64,
    pub reason: String,
}

impl LedgerReceipt {
    pub fn describe(&self) -> String {
        match self.kind {
            EntryKind::Earned => format!(
                "{} earned {} credits for {} (balance {})",
                self.agent, self.amount, self.reason, self.balance
            ),
            EntryKind::Spent => format!(
                "{} spent {} credits on {} (balance {})",
                self.agent, self.amount, self.reason, self.balance
            ),
        }
    }
}

/// Credit accounting over the registry's per-agent balances. Global figures are always
/// summed from agents, never kept as separate counters.
pub struct EconomyLedger;

impl EconomyLedger {
    /// `floor(base * (0.8 + 0.2 * tier))`, done in integers. `None` when the payout does
    /// not fit in a u64.
    pub fn credit_for(base: u64, tier: u8) -> Option<u64> {
        base.checked_mul(4 + tier as u64).map(|scaled| scaled / 5)
    }

    /// Checks that `amount` can be credited without overflowing any counter.
    pub fn can_earn(agent: &Agent, amount: u64) -> Result<()> {
        match (
            agent.credits.checked_add(amount),
            agent.credits_earned.checked_add(amount),
        ) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(WorkforceError::CreditOverflow {
                agent: agent.id().clone(),
                amount,
            }),
        }
    }

    pub fn earn(
        registry: &mut AgentRegistry,
        agent_id: &str,
        amount: u64,
        reason: &str,
    ) -> Result<LedgerReceipt> {
        let agent = registry.get_mut(agent_id)?;
        Self::can_earn(agent, amount)?;
        agent.credits += amount;
        agent.credits_earned += amount;
        log::debug!("{} earned {} credits: {}", agent_id, amount, reason);

        Ok(LedgerReceipt {
            agent: agent_id.to_string(),
            kind: EntryKind::Earned,
            amount,
            balance: agent.credits,
            reason: reason.to_string(),
        })
    }

    pub fn spend(
        registry: &mut AgentRegistry,
        agent_id: &str,
        amount: u64,
        reason: &str,
    ) -> Result<LedgerReceipt> {
        let agent = registry.get_mut(agent_id)?;
        if amount > agent.credits {
            return Err(WorkforceError::InsufficientFunds {
                agent: agent_id.to_string(),
                requested: amount,
                available: agent.credits,
            });
        }
        agent.credits -= amount;
        agent.credits_spent += amount;
        log::debug!("{} spent {} credits: {}", agent_id, amount, reason);

        Ok(LedgerReceipt {
            agent: agent_id.to_string(),
            kind: EntryKind::Spent,
            amount,
            balance: agent.credits,
            reason: reason.to_string(),
        })
    }

    pub fn totals<'a>(agents: impl IntoIterator<Item = &'a Agent>) -> LedgerTotals {
        agents
            .into_iter()
            .fold(LedgerTotals::default(), |mut totals, agent| {
                totals.total_credits = totals.total_credits.saturating_add(agent.credits);
                totals.total_earned = totals.total_earned.saturating_add(agent.credits_earned);
                totals.total_spent = totals.total_spent.saturating_add(agent.credits_spent);
                totals
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn small_registry() -> AgentRegistry {
        AgentRegistry::populate(&SimulationConfig {
            population: 5,
            starting_credits: 20,
            ..Default::default()
        })
    }

    #[test]
    fn test_credit_for_tiers() {
        assert_eq!(EconomyLedger::credit_for(10, 1), Some(10));
        assert_eq!(EconomyLedger::credit_for(10, 3), Some(14));
        assert_eq!(EconomyLedger::credit_for(10, 5), Some(18));
        assert_eq!(EconomyLedger::credit_for(15, 2), Some(18));
        assert_eq!(EconomyLedger::credit_for(12, 4), Some(19));
    }

    #[test]
    fn test_credit_for_huge_base_is_none() {
        assert_eq!(EconomyLedger::credit_for(u64::MAX / 2, 3), None);
        let base = u64::MAX / 9;
        assert_eq!(EconomyLedger::credit_for(base, 5), Some(base * 9 / 5));
    }

    #[test]
    fn test_earn_overflow_is_rejected_without_change() {
        let mut registry = small_registry();
        let id = registry.ids()[0].clone();

        let result = EconomyLedger::earn(&mut registry, &id, u64::MAX - 10, "windfall");
        assert!(matches!(
            result,
            Err(WorkforceError::CreditOverflow { amount, .. }) if amount == u64::MAX - 10
        ));

        let agent = registry.get(&id).unwrap();
        assert_eq!(agent.credits, 20);
        assert_eq!(agent.credits_earned, 0);
    }

    #[test]
    fn test_earn_and_spend() {
        let mut registry = small_registry();
        let id = registry.ids()[0].clone();

        let earned = EconomyLedger::earn(&mut registry, &id, 14, "spec_sheet").unwrap();
        assert_eq!(earned.balance, 34);

        let spent = EconomyLedger::spend(&mut registry, &id, 30, "Recreation Time").unwrap();
        assert_eq!(spent.balance, 4);

        let agent = registry.get(&id).unwrap();
        assert_eq!(agent.credits_earned, 14);
        assert_eq!(agent.credits_spent, 30);
    }

    #[test]
    fn test_overspend_is_rejected() {
        let mut registry = small_registry();
        let id = registry.ids()[0].clone();

        let result = EconomyLedger::spend(&mut registry, &id, 21, "Skill Upgrade");
        match result {
            Err(WorkforceError::InsufficientFunds {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 21);
                assert_eq!(available, 20);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(registry.get(&id).unwrap().credits, 20);
    }

    #[test]
    fn test_unknown_agent() {
        let mut registry = small_registry();
        assert!(matches!(
            EconomyLedger::earn(&mut registry, "NOBODY-99", 5, "x"),
            Err(WorkforceError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_totals_match_agent_sum() {
        let mut registry = small_registry();
        let ids = registry.ids();
        EconomyLedger::earn(&mut registry, &ids[0], 10, "a").unwrap();
        EconomyLedger::earn(&mut registry, &ids[1], 25, "b").unwrap();
        EconomyLedger::spend(&mut registry, &ids[2], 5, "c").unwrap();

        let totals = EconomyLedger::totals(registry.iter());
        let sum: u64 = registry.iter().map(|a| a.credits).sum();
        assert_eq!(totals.total_credits, sum);
        assert_eq!(totals.total_credits, 5 * 20 + 35 - 5);
        assert_eq!(totals.total_earned, 35);
        assert_eq!(totals.total_spent, 5);
    }
}
