//! Game session lifecycle.
//!
//! [`coordinator::SessionCoordinator`] owns the single session and its state
//! machine; [`monitor`] attaches and detaches game clients by diffing the
//! live-handle registry on a fixed tick; [`collaborators`] defines the
//! launcher, readiness, and client interfaces supplied by the host.

pub mod collaborators;
pub mod coordinator;
pub mod monitor;

pub use collaborators::{
    ClientId, ClientRegistry, Environment, GameClient, GameLauncher, LaunchRequest, OutputTap,
};
pub use coordinator::{Collaborators, SessionCoordinator};
