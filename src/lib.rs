//! Invitation wizard - guided creation of event invitations
//!
//! The library holds the wizard controller and its collaborators; the
//! `invite-wizard` binary drives it from the command line.

pub mod api;
pub mod config;
pub mod drafts;
pub mod logging;
pub mod package;
pub mod session;
pub mod types;
pub mod wizard;
