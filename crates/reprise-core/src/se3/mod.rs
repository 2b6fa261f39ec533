//! SE(3) algebra - Layer 1 of Reprise
//!
//! Rigid-motion group elements ([`Pose`]) and ordered sequences of them
//! ([`Trajectory`]). Everything else in the crate is built on this module.
//!
//! ## Operations
//!
//! | Operation | Rule |
//! |-----------|------|
//! | `identity` | `R = I`, `t = 0` |
//! | `compose(A, B)` | `(R_A R_B, R_A t_B + t_A)` |
//! | `inverse(A)` | `(R_Aᵀ, −R_Aᵀ t_A)` |
//! | `scale(A, λ)` | `(exp(λ log R_A), λ t_A)` |
//! | `Trajectory::compose` | left fold of `compose`, identity when empty |
//! | `Trajectory::double` | `T ++ T` |
//!
//! Composition is not commutative. Every "return" computation in the crate
//! depends on traversal order, so order is never normalised away.

pub mod pose;
pub mod sampling;
pub mod so3;
pub mod trajectory;

pub use pose::Pose;
pub use sampling::{generate_random_trajectory, RandomTrajectorySpec};
pub use trajectory::Trajectory;
