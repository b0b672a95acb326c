use std::collections::BTreeMap;

use crate::config::SimulationConfig;
use crate::error::{Result, WorkforceError};
use crate::lifecycle::shifts::initial_shift;
use crate::types::{Agent, AgentId, Lifecycle, Shift};

/// Fixed catalog of specialties agents are drawn from.
pub const SPECIALTIES: &[&str] = &[
    "solar-panel-voc-analysis",
    "panel-spacing-calculations",
    "solar-efficiency-optimization",
    "panel-temperature-coefficients",
    "solar-string-design",
    "solar-mounting-systems",
    "inverter-mppt-analysis",
    "inverter-efficiency-curves",
    "inverter-dc-voltage-limits",
    "inverter-grid-compliance",
    "inverter-installation-clearances",
    "inverter-thermal-management",
    "battery-capacity-analysis",
    "battery-safety-systems",
    "battery-charging-profiles",
    "battery-installation-codes",
    "battery-ventilation-requirements",
    "as-nzs-3000-compliance",
    "as-nzs-5033-installation",
    "as-nzs-4777-grid-connection",
    "as-nzs-5139-battery-installation",
    "cer-product-approval",
    "specification-extraction",
    "installation-manual-analysis",
    "warranty-terms-analysis",
];

const CALL_SIGNS: &[&str] = &[
    "ATLAS", "NOVA", "TITAN", "ECHO", "PULSE", "ZETA", "ALPHA", "BETA", "GAMMA", "DELTA",
    "OMEGA", "SIGMA", "THETA", "LAMBDA", "QUANTUM", "PHOTON", "ELECTRON", "NEUTRON", "PROTON",
    "ION", "SOLAR", "VOLT", "WATT", "AMP", "OHM", "FLUX", "GRID", "CELL", "PANEL", "POWER",
    "ENERGY", "CHARGE", "CURRENT", "VOLTAGE", "PHASE", "SYNC", "LOGIC", "CORE", "PRIME", "ULTRA",
];

pub fn is_known_specialty(tag: &str) -> bool {
    SPECIALTIES.contains(&tag)
}

fn call_sign(n: usize) -> AgentId {
    format!(
        "{}-{:02}",
        CALL_SIGNS[n % CALL_SIGNS.len()],
        n / CALL_SIGNS.len() + 1
    )
}

/// Tiers fill in equal bands: the first fifth of the roster is tier 1.
fn tier_for(index: usize, population: usize) -> u8 {
    let band = index * 5 / population.max(1);
    band.min(4) as u8 + 1
}

/// Canonical set of agents. The only place agents are created or removed.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentId, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(config: &SimulationConfig) -> Self {
        let mut registry = Self::new();
        registry.top_up(config);
        registry
    }

    /// Rebuilds a registry from persisted agents. Duplicate ids are rejected.
    pub fn from_agents(agents: Vec<Agent>) -> Result<Self> {
        let mut registry = Self::new();
        for agent in agents {
            let id = agent.id().clone();
            if registry.agents.insert(id.clone(), agent).is_some() {
                return Err(WorkforceError::InvalidSnapshot(format!(
                    "duplicate agent id {}",
                    id
                )));
            }
        }
        Ok(registry)
    }

    /// Creates fresh default agents until the configured population is reached.
    pub fn top_up(&mut self, config: &SimulationConfig) -> Vec<AgentId> {
        let mut created = Vec::new();
        let mut name_cursor = 0;

        while self.agents.len() < config.population {
            let index = self.agents.len();
            while self.agents.contains_key(&call_sign(name_cursor)) {
                name_cursor += 1;
            }
            let agent = Self::fresh_agent(call_sign(name_cursor), index, config);
            created.push(agent.id().clone());
            self.agents.insert(agent.id().clone(), agent);
        }

        if !created.is_empty() {
            log::info!(
                "Registry topped up with {} agents ({} total)",
                created.len(),
                self.agents.len()
            );
        }
        created
    }

    fn fresh_agent(id: AgentId, index: usize, config: &SimulationConfig) -> Agent {
        Agent::new(
            id,
            tier_for(index, config.population),
            SPECIALTIES[index % SPECIALTIES.len()],
            initial_shift(index),
            Lifecycle::fresh(
                config.max_work_hours,
                config.break_duration,
                config.initial_motivation,
            ),
            config.starting_credits,
        )
    }

    pub fn get(&self, id: &str) -> Result<&Agent> {
        self.agents
            .get(id)
            .ok_or_else(|| WorkforceError::UnknownAgent(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Agent> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| WorkforceError::UnknownAgent(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Agents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<Agent> {
        self.agents.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn shift_counts(&self) -> BTreeMap<Shift, usize> {
        let mut counts: BTreeMap<Shift, usize> = BTreeMap::new();
        for agent in self.agents.values() {
            *counts.entry(agent.shift).or_default() += 1;
        }
        counts
    }
}
