//! Staged reveal of a proposal: timed auto-advance, an accept/decline decision
//! with an evasive decline control, a celebration, and a final contact action.

pub mod contact;
mod controller;
pub mod decline;
pub mod stage;

pub use contact::{ContactLinkBuilder, MessagingLinkBuilder};
pub use controller::{RevealController, RevealEffect, RevealSnapshot, RevealTimings};
pub use decline::{EvasionPolicy, Offset, DISCOURAGEMENTS};
pub use stage::{transition, RevealEvent, Stage, Transition};
