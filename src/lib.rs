//! A core implementation of the Nymble anonymous-blacklisting protocol.
//!
//! Nymble lets a server block misbehaving users without ever learning who they
//! are. Honest users stay anonymous and their visits stay unlinkable; a user
//! the server complains about gets linked (and blocked) from the complaint
//! until the end of the current link window, and finds out for themselves that
//! they've been blacklisted.
//!
//! There are four roles, each with its own state type:
//!
//! 1. The [pseudonym manager](pm::PseudonymManager) sees a user's real
//! identity once per link window and turns it into a pseudonym.
//! 1. The [nymble manager](nm::NymbleManager) registers servers, issues
//! credentials against pseudonyms, and turns complaints into blacklists and
//! linking tokens.
//! 1. The [server](server::ServerState) verifies tickets and holds the current
//! blacklist and linking tokens.
//! 1. The [user](user::UserState) holds credentials, pulls one ticket per time
//! period out of them, and checks each blacklist it's handed.
//!
//! Everything here is plain in-memory state. Moving things between roles (or to
//! disk) is up to the caller: every type that crosses a boundary implements
//! [`AsnBinary`].

pub mod error;
pub(crate) mod util;
pub mod blacklist;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod ids;
pub mod nm;
pub mod pm;
pub mod server;
pub mod ticket;
pub mod user;

pub use crate::{
    blacklist::{Blacklist, LinkingToken, VerifyKey},
    chain::{Nymble, Seed},
    config::Params,
    error::{Error, Result},
    ids::{LinkWindow, Pseudonym, ServerId, TimePeriod},
    nm::NymbleManager,
    pm::PseudonymManager,
    server::ServerState,
    ticket::{Credential, NymbleTicket},
    user::UserState,
    util::ser::AsnBinary,
};
