use rand::Rng;

use crate::knowledge::{KnowledgeStore, ShareOutcome};
use crate::storage::registry::AgentRegistry;
use crate::types::{AgentId, KnowledgeKey};

#[derive(Debug, Clone, PartialEq)]
pub enum PropagationOutcome {
    Shared {
        teacher: AgentId,
        student: AgentId,
        key: KnowledgeKey,
        outcome: ShareOutcome,
    },
    NoTeachers,
    NoStudents,
}

impl PropagationOutcome {
    /// Whether the student's cache changed.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            PropagationOutcome::Shared {
                outcome: ShareOutcome::Copied | ShareOutcome::Corrected,
                ..
            }
        )
    }

    pub fn describe(&self) -> String {
        match self {
            PropagationOutcome::Shared {
                teacher,
                student,
                key,
                outcome: ShareOutcome::Copied,
            } => format!("{} taught {} about {}", teacher, student, key),
            PropagationOutcome::Shared {
                teacher,
                student,
                key,
                outcome: ShareOutcome::Corrected,
            } => format!("{} corrected {} on {}", teacher, student, key),
            PropagationOutcome::Shared {
                teacher,
                student,
                key,
                outcome: ShareOutcome::AlreadyKnown,
            } => format!("{} already knew {} from {}", student, key, teacher),
            PropagationOutcome::Shared {
                teacher,
                student,
                key,
                outcome: ShareOutcome::Conflict,
            } => format!(
                "{} and {} disagree on {}, student keeps its value",
                teacher, student, key
            ),
            PropagationOutcome::NoTeachers => "no agent has knowledge to share".to_string(),
            PropagationOutcome::NoStudents => "no other agent to teach".to_string(),
        }
    }
}

/// One teacher-to-student share. Teachers are contributors with something cached.
pub fn propagate_once<R: Rng>(
    registry: &AgentRegistry,
    knowledge: &KnowledgeStore,
    rng: &mut R,
) -> PropagationOutcome {
    let teachers: Vec<(&AgentId, Vec<KnowledgeKey>)> = registry
        .iter()
        .filter(|agent| agent.is_knowledgeable())
        .map(|agent| (agent.id(), knowledge.cached_keys(agent.id())))
        .filter(|(_, keys)| !keys.is_empty())
        .collect();
    if teachers.is_empty() {
        return PropagationOutcome::NoTeachers;
    }

    let (teacher, keys) = &teachers[rng.random_range(0..teachers.len())];
    let students: Vec<&AgentId> = registry
        .iter()
        .map(|agent| agent.id())
        .filter(|id| id != teacher)
        .collect();
    if students.is_empty() {
        return PropagationOutcome::NoStudents;
    }

    let student = students[rng.random_range(0..students.len())];
    let key = &keys[rng.random_range(0..keys.len())];

    // Overwrites are only confirmed when the teacher agrees with the shared store.
    let teacher_value = knowledge.recall(teacher, key);
    let confirmed = teacher_value.is_some() && teacher_value == knowledge.read(key);

    match knowledge.share(teacher, student, key, confirmed) {
        Some(outcome) => PropagationOutcome::Shared {
            teacher: (*teacher).clone(),
            student: student.clone(),
            key: key.clone(),
            outcome,
        },
        None => PropagationOutcome::NoTeachers,
    }
}

pub fn propagate<R: Rng>(
    registry: &AgentRegistry,
    knowledge: &KnowledgeStore,
    passes: usize,
    rng: &mut R,
) -> Vec<PropagationOutcome> {
    let mut outcomes = Vec::with_capacity(passes);
    for _ in 0..passes {
        let outcome = propagate_once(registry, knowledge, rng);
        let exhausted = matches!(
            outcome,
            PropagationOutcome::NoTeachers | PropagationOutcome::NoStudents
        );
        outcomes.push(outcome);
        if exhausted {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn create_test_registry(population: usize) -> AgentRegistry {
        AgentRegistry::populate(&SimulationConfig {
            population,
            ..Default::default()
        })
    }

    fn key(raw: &str) -> KnowledgeKey {
        raw.parse().unwrap()
    }

    #[test]
    fn test_no_teachers_without_contributions() {
        let registry = create_test_registry(5);
        let knowledge = KnowledgeStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            propagate_once(&registry, &knowledge, &mut rng),
            PropagationOutcome::NoTeachers
        );
    }

    #[test]
    fn test_share_copies_to_another_agent() {
        let mut registry = create_test_registry(2);
        let ids = registry.ids();
        registry.get_mut(&ids[0]).unwrap().knowledge_contributed = 1;

        let knowledge = KnowledgeStore::new();
        knowledge
            .write(key("trina_440w.voc"), json!("40.4V"), &ids[0], false)
            .unwrap();
        knowledge.learn(&ids[0], key("trina_440w.voc"), json!("40.4V"));

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = propagate_once(&registry, &knowledge, &mut rng);

        assert!(outcome.changed());
        assert_eq!(
            knowledge.recall(&ids[1], &key("trina_440w.voc")),
            Some(json!("40.4V"))
        );
        assert_eq!(
            knowledge.recall(&ids[0], &key("trina_440w.voc")),
            Some(json!("40.4V"))
        );
    }

    #[test]
    fn test_matching_teacher_corrects_student() {
        let mut registry = create_test_registry(2);
        let ids = registry.ids();
        registry.get_mut(&ids[0]).unwrap().knowledge_contributed = 1;

        let knowledge = KnowledgeStore::new();
        knowledge
            .write(key("trina_440w.voc"), json!("40.4V"), &ids[0], false)
            .unwrap();
        knowledge.learn(&ids[0], key("trina_440w.voc"), json!("40.4V"));
        knowledge.learn(&ids[1], key("trina_440w.voc"), json!("39.0V"));

        let mut rng = StdRng::seed_from_u64(3);
        let outcome = propagate_once(&registry, &knowledge, &mut rng);

        assert!(matches!(
            outcome,
            PropagationOutcome::Shared {
                outcome: ShareOutcome::Corrected,
                ..
            }
        ));
    }

    #[test]
    fn test_stale_teacher_cannot_overwrite() {
        let mut registry = create_test_registry(2);
        let ids = registry.ids();
        registry.get_mut(&ids[0]).unwrap().knowledge_contributed = 1;

        let knowledge = KnowledgeStore::new();
        knowledge
            .write(key("trina_440w.voc"), json!("40.4V"), "external", false)
            .unwrap();
        knowledge.learn(&ids[0], key("trina_440w.voc"), json!("41.0V"));
        knowledge.learn(&ids[1], key("trina_440w.voc"), json!("40.4V"));

        let mut rng = StdRng::seed_from_u64(3);
        let outcome = propagate_once(&registry, &knowledge, &mut rng);

        assert!(matches!(
            outcome,
            PropagationOutcome::Shared {
                outcome: ShareOutcome::Conflict,
                ..
            }
        ));
        assert_eq!(
            knowledge.recall(&ids[1], &key("trina_440w.voc")),
            Some(json!("40.4V"))
        );
    }

    #[test]
    fn test_propagate_stops_when_exhausted() {
        let registry = create_test_registry(3);
        let knowledge = KnowledgeStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcomes = propagate(&registry, &knowledge, 5, &mut rng);
        assert_eq!(outcomes, vec![PropagationOutcome::NoTeachers]);
    }
}
