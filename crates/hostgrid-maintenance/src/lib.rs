//! hostgrid-maintenance — relocation decisions for node-moving maintainers.
//!
//! Maintainers that relocate nodes (rebalancing, host evacuation) share one
//! search skeleton: walk every active tenant node, consider every host that
//! could receive it, and keep the best move according to the maintainer's
//! own notion of "better". This crate provides that skeleton and two
//! concrete move advisors. Executing a move — the actual redeployment — is
//! the caller's job.
//!
//! # Components
//!
//! - **`mover`** — The generic best-move search and the zone-stability gate
//! - **`advisors`** — Concrete moves: rebalancing and host evacuation

pub mod advisors;
pub mod mover;

pub use advisors::{EvacuationAdvisor, Move, RebalanceAdvisor};
pub use mover::{DEPLOY_COOLDOWN_SECS, DeployHistory, MoveAdvisor, find_best_move, zone_is_stable};
