//! Mutation plans emitted by the scheduler.
//!
//! A plan is the complete set of writes one user action needs. The caller
//! applies all of them or none (see [`crate::service`]).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capacity::CapacityWarning;
use crate::models::{AppointmentPatch, AssignmentPatch, DaySnapshot, NewAssignment};

/// A single write intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateAssignment(NewAssignment),
    UpdateAssignment { id: String, patch: AssignmentPatch },
    UpdateAppointment { id: String, patch: AppointmentPatch },
}

/// Writes for one scheduling action, plus non-blocking warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MutationPlan {
    pub mutations: Vec<Mutation>,
    pub warnings: Vec<CapacityWarning>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mutation.
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn with_warning(mut self, warning: Option<CapacityWarning>) -> Self {
        self.warnings.extend(warning);
        self
    }

    /// The assignment this plan creates, if any.
    pub fn created_assignment(&self) -> Option<&NewAssignment> {
        self.mutations.iter().find_map(|m| match m {
            Mutation::CreateAssignment(new) => Some(new),
            _ => None,
        })
    }

    pub fn assignment_patch(&self, assignment_id: &str) -> Option<&AssignmentPatch> {
        self.mutations.iter().find_map(|m| match m {
            Mutation::UpdateAssignment { id, patch } if id == assignment_id => Some(patch),
            _ => None,
        })
    }

    pub fn appointment_patch(&self, appointment_id: &str) -> Option<&AppointmentPatch> {
        self.mutations.iter().find_map(|m| match m {
            Mutation::UpdateAppointment { id, patch } if id == appointment_id => Some(patch),
            _ => None,
        })
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Applies the plan to a copy of `snapshot`, for optimistic display
    /// before the store confirms. Created assignments get fresh ids.
    pub fn preview(&self, snapshot: &DaySnapshot) -> DaySnapshot {
        let mut next = snapshot.clone();
        for mutation in &self.mutations {
            match mutation {
                Mutation::CreateAssignment(new) => {
                    next.assignments
                        .push(new.clone().into_assignment(Uuid::new_v4().to_string()));
                }
                Mutation::UpdateAssignment { id, patch } => {
                    if let Some(a) = next.assignments.iter_mut().find(|a| &a.id == id) {
                        patch.apply_to(a);
                    }
                }
                Mutation::UpdateAppointment { id, patch } => {
                    if let Some(a) = next.appointments.iter_mut().find(|a| &a.id == id) {
                        patch.apply_to(a);
                    }
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, sample_snapshot};
    use crate::models::{AppointmentStatus, AssignmentStatus};

    #[test]
    fn test_preview_applies_all_mutations() {
        let snap = sample_snapshot();
        let mut plan = MutationPlan::new();
        plan.push(Mutation::CreateAssignment(NewAssignment {
            appointment_id: "X".into(),
            technician_id: "T1".into(),
            start_time: at(9, 0),
            end_time: at(10, 0),
            aw_planned: 10,
            status: AssignmentStatus::Scheduled,
        }));
        plan.push(Mutation::UpdateAppointment {
            id: "X".into(),
            patch: AppointmentPatch::scheduled(at(9, 0)),
        });

        let next = plan.preview(&snap);
        assert!(snap.assignments.is_empty());
        assert_eq!(next.assignments.len(), 1);
        assert_eq!(next.assignments[0].technician_id, "T1");
        assert_eq!(
            next.appointment("X").map(|a| a.status),
            Some(AppointmentStatus::Scheduled)
        );
        assert!(plan.created_assignment().is_some());
        assert!(plan.appointment_patch("X").is_some());
        assert!(plan.appointment_patch("Y").is_none());
    }

    #[test]
    fn test_mutation_serde_tag() {
        let m = Mutation::UpdateAssignment {
            id: "S1".into(),
            patch: AssignmentPatch::status(AssignmentStatus::Cancelled),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["op"], "update_assignment");
        assert_eq!(json["patch"]["status"], "cancelled");
    }
}
