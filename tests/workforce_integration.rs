//! End-to-end behavior of a running workforce: break handoffs, payouts, knowledge
//! conflicts, roster top-up, and the invariants that must hold after every step.

use anyhow::Result;
use serde_json::json;

use workforce::config::SimulationConfig;
use workforce::economy::EconomyLedger;
use workforce::engine::{Scheduler, WorkEvent};
use workforce::knowledge::{KnowledgeStore, QueryResult};
use workforce::storage::{AgentRegistry, WorkQueue};
use workforce::{
    KnowledgeFact, KnowledgeKey, Phase, SpecialtyRequirement, WorkItemDraft, WorkStatus,
    WorkYield, Workforce,
};

fn quiet_config(population: usize) -> SimulationConfig {
    SimulationConfig {
        population,
        rotation_chance: 0.0,
        spend_chance: 0.0,
        ..Default::default()
    }
}

fn key(raw: &str) -> KnowledgeKey {
    raw.parse().unwrap()
}

fn with_facts(work_type: &str, facts: &[(&str, &str)]) -> WorkItemDraft {
    WorkItemDraft::new(work_type).with_output(WorkYield {
        base_credits: None,
        facts: facts
            .iter()
            .map(|(k, v)| KnowledgeFact::new(key(k), *v))
            .collect(),
    })
}

/// Claim coupling, break coupling and holder uniqueness all live in snapshot validation.
fn assert_consistent(workforce: &Workforce) {
    let snapshot = workforce.snapshot();
    snapshot.validate().expect("workforce state is consistent");

    let mut held: Vec<_> = snapshot
        .agents
        .iter()
        .filter_map(|a| a.current_work_item)
        .collect();
    let total = held.len();
    held.sort();
    held.dedup();
    assert_eq!(held.len(), total, "an item is held by two agents");
}

#[test]
fn test_break_mid_task_returns_item_to_queue() -> Result<()> {
    let config = SimulationConfig {
        max_work_hours: 6.0,
        ..quiet_config(1)
    };
    let workforce = Workforce::new(config.clone());
    let item = workforce.submit(WorkItemDraft::new("installation_manual"))?;
    workforce.assign();

    let mut snapshot = workforce.snapshot();
    snapshot.agents[0].lifecycle.hours_in_phase = 5.9;
    let workforce = Workforce::from_snapshot(config, snapshot)?;

    workforce.step(0.2);

    let agent = &workforce.agents()[0];
    assert_eq!(agent.lifecycle.phase, Phase::OnBreak);
    assert!(agent.current_work_item.is_none());
    let item = workforce.work_item(&item)?;
    assert_eq!(item.status, WorkStatus::Pending);
    assert!(item.claimed_by.is_none());
    assert_consistent(&workforce);
    Ok(())
}

#[test]
fn test_tier_three_spec_sheet_pays_fourteen() -> Result<()> {
    let config = quiet_config(100);
    let mut registry = AgentRegistry::populate(&config);
    let mut queue = WorkQueue::new();
    let knowledge = KnowledgeStore::new();

    let agent_id = registry
        .iter()
        .find(|a| a.tier() == 3)
        .map(|a| a.id().clone())
        .unwrap();
    let before = registry.get(&agent_id)?.credits;

    let item = queue.enqueue(with_facts("spec_sheet", &[("trina_440w.voc", "40.4V")]))?;
    Scheduler::claim(&mut registry, &mut queue, &item, &agent_id, &config, 0.0)?;
    let event = Scheduler::complete(&mut registry, &mut queue, &knowledge, &item, &config)?;

    assert!(matches!(event, WorkEvent::Completed { credits: 14, .. }));
    assert_eq!(registry.get(&agent_id)?.credits, before + 14);
    Ok(())
}

#[test]
fn test_oversized_payout_fails_the_item_and_frees_the_agent() -> Result<()> {
    let workforce = Workforce::new(quiet_config(1));
    let item = workforce.submit(WorkItemDraft::new("spec_sheet").with_output(WorkYield {
        base_credits: Some(u64::MAX / 2),
        facts: vec![KnowledgeFact::new(key("trina_440w.voc"), "40.4V")],
    }))?;
    let before = workforce.ledger_totals();

    workforce.step(0.1);
    let report = workforce.step(0.5);

    assert_eq!(report.errors.len(), 1);
    assert!(report.work_events.iter().any(WorkEvent::is_failure));
    assert_eq!(workforce.work_item(&item)?.status, WorkStatus::Failed);
    assert!(workforce.agents()[0].is_idle());
    assert_eq!(workforce.ledger_totals(), before);
    assert!(workforce.read_knowledge(&key("trina_440w.voc")).is_none());
    assert_consistent(&workforce);

    workforce.submit(WorkItemDraft::new("datasheet"))?;
    workforce.step(0.1);
    assert!(workforce.agents()[0].current_work_item.is_some());
    Ok(())
}

#[test]
fn test_existing_fact_is_not_overwritten_by_completion() -> Result<()> {
    let workforce = Workforce::new(quiet_config(2));
    workforce.write_knowledge(key("trina_440w.voc"), json!("40.4V"), "ATLAS-01", false)?;

    workforce.submit(with_facts("spec_sheet", &[("trina_440w.voc", "41.0V")]))?;
    workforce.step(0.1);
    let report = workforce.step(0.5);

    let (agent, facts_known) = report
        .work_events
        .iter()
        .find_map(|e| match e {
            WorkEvent::Completed {
                agent, facts_known, ..
            } => Some((agent.clone(), *facts_known)),
            _ => None,
        })
        .expect("the item completed");
    assert_eq!(facts_known, 1);
    assert_eq!(
        workforce.read_knowledge(&key("trina_440w.voc")),
        Some(json!("40.4V"))
    );
    assert_eq!(
        workforce
            .knowledge()
            .recall(&agent, &key("trina_440w.voc")),
        Some(json!("40.4V"))
    );
    Ok(())
}

#[test]
fn test_short_roster_is_topped_up_on_restore() -> Result<()> {
    let small = Workforce::new(quiet_config(85));
    small.earn("ATLAS-01", 7, "bonus")?;
    let snapshot = small.snapshot();

    let restored = Workforce::from_snapshot(quiet_config(100), snapshot)?;
    let agents = restored.agents();
    assert_eq!(agents.len(), 100);
    assert_eq!(restored.agent("ATLAS-01")?.credits, 57);

    let originals: Vec<_> = small.agents().into_iter().map(|a| a.id().clone()).collect();
    let fresh: Vec<_> = agents
        .iter()
        .filter(|a| !originals.contains(a.id()))
        .collect();
    assert_eq!(fresh.len(), 15);
    assert!(fresh
        .iter()
        .all(|a| a.is_idle() && a.credits == 50 && a.tasks_completed == 0));
    Ok(())
}

#[test]
fn test_invariants_hold_through_a_busy_day() -> Result<()> {
    let config = SimulationConfig {
        population: 20,
        max_work_hours: 4.0,
        break_duration: 1.0,
        spend_threshold: 55,
        spend_chance: 0.5,
        rotation_chance: 0.5,
        ..Default::default()
    };
    let workforce = Workforce::new(config.clone());

    let tags: Vec<String> = workforce
        .agents()
        .iter()
        .map(|a| a.specialty().to_string())
        .collect();
    let types = ["spec_sheet", "datasheet", "installation_manual", "user_manual"];
    for n in 0..60 {
        let work_type = types[n % types.len()];
        let draft = if n % 7 == 0 {
            WorkItemDraft::new(work_type)
        } else {
            let subject = format!("product_{}.rating", n % 15);
            with_facts(work_type, &[(subject.as_str(), "ok")])
        };
        let specialty = match n % 5 {
            1 => SpecialtyRequirement::Preferred(tags[n % tags.len()].clone()),
            // a handful of specialists carry every Required item between them
            3 => SpecialtyRequirement::Required(tags[n % 3].clone()),
            _ if n % 11 == 0 => SpecialtyRequirement::Required("warranty-terms-analysis".into()),
            _ => SpecialtyRequirement::Any,
        };
        workforce.submit(draft.with_specialty(specialty))?;
    }

    for n in 0..48 {
        let report = workforce.step(0.5);
        workforce.propagate();
        assert!(report.errors.is_empty(), "step errors: {:?}", report.errors);
        assert_consistent(&workforce);

        let totals = workforce.ledger_totals();
        assert_eq!(
            totals.total_credits,
            config.population as u64 * config.starting_credits + totals.total_earned
                - totals.total_spent,
            "credits leaked at step {}",
            n
        );

        for event in &report.work_events {
            if let WorkEvent::Completed {
                agent,
                work_type,
                credits,
                ..
            } = event
            {
                let tier = workforce.agent(agent)?.tier();
                let base = config.work_profile(work_type).base_credits;
                assert_eq!(Some(*credits), EconomyLedger::credit_for(base, tier));
            }
        }

        let agents = workforce.agents();
        for item in workforce.work_items().iter().filter(|i| i.is_pending()) {
            let taker = agents.iter().find(|a| Scheduler::is_eligible(a, item));
            assert!(
                taker.is_none(),
                "{} left idle beside {:?} item {} at step {}",
                taker.map(|a| a.id().as_str()).unwrap_or_default(),
                item.specialty,
                item.id,
                n
            );
        }
    }

    let unstaffed = SpecialtyRequirement::Required("warranty-terms-analysis".into());
    let waiting: Vec<_> = workforce
        .work_items()
        .into_iter()
        .filter(|i| i.specialty == unstaffed)
        .collect();
    assert!(!waiting.is_empty());
    assert!(waiting.iter().all(|i| i.is_pending()));

    let progress = workforce.progress();
    assert!(progress.items_completed > 0);
    assert!(progress.items_failed > 0, "items without output time out");
    assert!(matches!(
        workforce.query("never written anywhere"),
        QueryResult::NotFound { .. }
    ));
    Ok(())
}

#[test]
fn test_item_without_output_times_out() -> Result<()> {
    let workforce = Workforce::new(quiet_config(1));
    let item = workforce.submit(WorkItemDraft::new("datasheet"))?;

    // datasheet: 0.75h processing, deadline 2.25h after the claim
    workforce.step(0.25);
    workforce.step(2.0);
    assert!(workforce.work_item(&item)?.is_claimed());

    let report = workforce.step(0.5);
    assert!(report.work_events.iter().any(WorkEvent::is_failure));
    let item = workforce.work_item(&item)?;
    assert_eq!(item.status, WorkStatus::Failed);
    assert!(item.failure_reason.is_some());
    assert!(workforce.agents()[0].is_idle());
    Ok(())
}

#[test]
fn test_pause_and_resume_without_catch_up() -> Result<()> {
    let workforce = Workforce::new(quiet_config(3));
    workforce.step(1.0);
    workforce.pause();

    for _ in 0..10 {
        assert!(workforce.step(1.0).paused);
        assert!(workforce.propagate().is_empty());
    }
    assert_eq!(workforce.clock_hours(), 1.0);

    workforce.resume();
    workforce.step(1.0);
    assert_eq!(workforce.clock_hours(), 2.0);
    assert!(workforce
        .activity()
        .iter()
        .any(|e| e.message == "Simulation paused"));
    Ok(())
}

#[test]
fn test_reset_can_retain_knowledge() -> Result<()> {
    let workforce = Workforce::new(SimulationConfig {
        retain_knowledge_on_reset: true,
        ..quiet_config(4)
    });
    workforce.write_knowledge(key("byd_hvs_7.capacity"), json!("7.68kWh"), "external", false)?;
    workforce.submit(WorkItemDraft::new("datasheet"))?;
    workforce.step(0.5);

    workforce.reset();

    assert_eq!(
        workforce.read_knowledge(&key("byd_hvs_7.capacity")),
        Some(json!("7.68kWh"))
    );
    assert!(workforce.work_items().is_empty());
    assert!(workforce.agents().iter().all(|a| a.is_idle()));
    assert_eq!(workforce.progress().agents, 4);
    Ok(())
}
