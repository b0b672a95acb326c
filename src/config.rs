use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub driver: DriverConfig,
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// File settings first, environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(population) = env_parse::<usize>("WORKFORCE_POPULATION") {
            self.simulation.population = population;
        }
        if let Some(seed) = env_parse::<u64>("WORKFORCE_SEED") {
            self.simulation.seed = seed;
        }
        if let Some(retain) = env_parse::<bool>("WORKFORCE_RETAIN_KNOWLEDGE") {
            self.simulation.retain_knowledge_on_reset = retain;
        }
        if let Ok(path) = std::env::var("WORKFORCE_SNAPSHOT_PATH") {
            self.snapshot_path = Some(PathBuf::from(path));
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkTypeProfile {
    pub base_credits: u64,
    pub processing_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population: usize,
    pub seed: u64,
    pub starting_credits: u64,
    pub initial_motivation: f64,
    pub max_work_hours: f64,
    pub break_duration: f64,

    pub fatigue_per_hour: f64,
    pub fatigue_recovery_per_hour: f64,
    pub motivation_decay_per_hour: f64,
    pub motivation_floor: f64,
    pub break_motivation_boost: f64,
    /// Early break once both thresholds are crossed.
    pub exhaustion_min_hours: f64,
    pub exhaustion_fatigue: f64,

    pub rotation_chance: f64,
    pub spend_threshold: u64,
    pub spend_chance: f64,

    pub deadline_multiplier: f64,
    pub retained_terminal_items: usize,
    pub work_types: BTreeMap<String, WorkTypeProfile>,
    pub default_work_type: WorkTypeProfile,

    pub shares_per_pass: usize,
    pub min_query_score: f64,
    pub retain_knowledge_on_reset: bool,
    pub feed_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let work_types = [
            ("spec_sheet", 10, 0.5),
            ("datasheet", 15, 0.75),
            ("installation_manual", 25, 2.0),
            ("user_manual", 12, 1.0),
        ]
        .into_iter()
        .map(|(name, base_credits, processing_hours)| {
            (
                name.to_string(),
                WorkTypeProfile {
                    base_credits,
                    processing_hours,
                },
            )
        })
        .collect();

        Self {
            population: 100,
            seed: 42,
            starting_credits: 50,
            initial_motivation: 0.8,
            max_work_hours: 8.0,
            break_duration: 1.5,
            fatigue_per_hour: 0.04,
            fatigue_recovery_per_hour: 0.2,
            motivation_decay_per_hour: 0.02,
            motivation_floor: 0.3,
            break_motivation_boost: 0.3,
            exhaustion_min_hours: 6.0,
            exhaustion_fatigue: 0.7,
            rotation_chance: 0.1,
            spend_threshold: 100,
            spend_chance: 0.1,
            deadline_multiplier: 3.0,
            retained_terminal_items: 1000,
            work_types,
            default_work_type: WorkTypeProfile {
                base_credits: 10,
                processing_hours: 1.0,
            },
            shares_per_pass: 1,
            min_query_score: 0.5,
            retain_knowledge_on_reset: false,
            feed_capacity: 100,
        }
    }
}

impl SimulationConfig {
    pub fn work_profile(&self, work_type: &str) -> &WorkTypeProfile {
        self.work_types
            .get(work_type)
            .unwrap_or(&self.default_work_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub step_interval_ms: u64,
    pub hours_per_step: f64,
    pub propagation_interval_ms: u64,
    pub persistence_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 1_000,
            hours_per_step: 0.5,
            propagation_interval_ms: 15_000,
            persistence_interval_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.population, 100);
        assert_eq!(config.feed_capacity, 100);
        assert!(!config.retain_knowledge_on_reset);
        assert_eq!(config.work_profile("spec_sheet").base_credits, 10);
        assert_eq!(config.work_profile("installation_manual").base_credits, 25);
    }

    #[test]
    fn test_unknown_work_type_uses_default_profile() {
        let config = SimulationConfig::default();
        assert_eq!(config.work_profile("brochure"), &config.default_work_type);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            snapshot_path = "/tmp/workforce.json"

            [simulation]
            population = 20
            seed = 7

            [driver]
            hours_per_step = 0.25
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.simulation.population, 20);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.max_work_hours, 8.0);
        assert_eq!(config.driver.hours_per_step, 0.25);
        assert_eq!(config.driver.step_interval_ms, 1_000);
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/tmp/workforce.json"))
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[simulation]\npopulation = 12\n").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.simulation.population, 12);
    }
}
