//! The threat model: per-feature perturbation rules and attack enumeration.
//!
//! An [`Attacker`] is built from a declarative JSON rule file (validated
//! against the dataset schema at construction) plus a global perturbation
//! budget. During training it answers one question, many times: given an
//! instance, a feature, and the instance's residual budget, which perturbed
//! versions of the instance can the adversary reach, and at what cost?

mod attacker;
mod rules;

pub use attacker::Attacker;
pub use rules::{AttackerRule, Perturbation, Precondition};
