//! Blacklists and linking tokens.
//!
//! A blacklist is the NM's signed statement of which nymbles a server has
//! complained about, as of some time period. Anyone holding the NM's
//! [`VerifyKey`] can check it, which is how users find out (privately) whether
//! they've been blacklisted.
//!
//! A linking token is what the server gets alongside the blacklist: the seed of
//! a complained-about chain as of some time period. It lets the server spot
//! every later ticket from that chain without learning anything about who the
//! user is.

use crate::{
    chain::{Nymble, Seed},
    crypto::base::{SignKeypair, SignKeypairPublic, SignKeypairSignature},
    error::Result,
    ids::{LinkWindow, ServerId, TimePeriod},
    ticket::NymbleTicket,
    util::ser::{self, AsnBinary},
};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};

/// The public material a user needs to check blacklists issued by a nymble
/// manager. It can verify, but it can't issue.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters)]
#[getset(get = "pub")]
pub struct VerifyKey {
    #[rasn(tag(explicit(0)))]
    blacklist: SignKeypairPublic,
}

impl VerifyKey {
    pub(crate) fn new(blacklist: SignKeypairPublic) -> Self {
        Self { blacklist }
    }
}

impl AsnBinary for VerifyKey {}

/// What the blacklist signature covers.
#[derive(Debug, Clone, AsnType, Encode)]
struct BlacklistBody {
    #[rasn(tag(explicit(0)))]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    link_window: LinkWindow,
    #[rasn(tag(explicit(2)))]
    time_period: TimePeriod,
    #[rasn(tag(explicit(3)))]
    entries: Vec<Nymble>,
}

/// A signed snapshot of a server's blacklist for one (link window, time
/// period).
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct Blacklist {
    /// The server this blacklist belongs to
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    server_id: ServerId,
    /// The link window this blacklist is for
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    link_window: LinkWindow,
    /// The time period this blacklist was last bound to
    #[rasn(tag(explicit(2)))]
    #[getset(get_copy = "pub")]
    time_period: TimePeriod,
    /// The complained-about nymbles, sorted and without duplicates
    #[rasn(tag(explicit(3)))]
    #[getset(get = "pub")]
    entries: Vec<Nymble>,
    /// The NM's signature over everything above
    #[rasn(tag(explicit(4)))]
    #[getset(get = "pub")]
    signature: SignKeypairSignature,
}

impl Blacklist {
    /// Build and sign a blacklist.
    pub(crate) fn new_signed(
        sign_key: &SignKeypair,
        server_id: ServerId,
        link_window: LinkWindow,
        time_period: TimePeriod,
        mut entries: Vec<Nymble>,
    ) -> Result<Self> {
        entries.sort();
        entries.dedup();
        let body = BlacklistBody {
            server_id,
            link_window,
            time_period,
            entries,
        };
        let signature = sign_key.sign(&ser::serialize(&body)?)?;
        let BlacklistBody {
            server_id,
            link_window,
            time_period,
            entries,
        } = body;
        Ok(Self {
            server_id,
            link_window,
            time_period,
            entries,
            signature,
        })
    }

    fn body_bytes(&self) -> Result<Vec<u8>> {
        let body = BlacklistBody {
            server_id: self.server_id.clone(),
            link_window: self.link_window,
            time_period: self.time_period,
            entries: self.entries.clone(),
        };
        ser::serialize(&body)
    }

    /// Check that this blacklist was signed by the NM that owns `verify_key`.
    /// Says nothing about which server or link window you were expecting.
    pub fn verify(&self, verify_key: &VerifyKey) -> bool {
        match self.body_bytes() {
            Ok(body) => verify_key.blacklist().verify(&self.signature, &body).is_ok(),
            Err(_) => false,
        }
    }

    /// Whether a nymble is on this blacklist.
    pub fn contains(&self, nymble: &Nymble) -> bool {
        self.entries.contains(nymble)
    }
}

impl AsnBinary for Blacklist {}

/// Lets a server link every ticket from one seed chain, from `time_period`
/// until the end of `link_window`.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::CopyGetters)]
pub struct LinkingToken {
    /// The link window the token works in
    #[rasn(tag(explicit(0)))]
    #[getset(get_copy = "pub")]
    link_window: LinkWindow,
    /// The first time period the token links
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    time_period: TimePeriod,
    #[rasn(tag(explicit(2)))]
    seed: Seed,
}

impl LinkingToken {
    pub(crate) fn new(link_window: LinkWindow, time_period: TimePeriod, seed: Seed) -> Self {
        Self {
            link_window,
            time_period,
            seed,
        }
    }

    /// Whether a nymble seen at `(link_window, time_period)` comes from the
    /// chain this token was made from. Nymbles from before the token's time
    /// period never link.
    pub fn links_nymble(&self, nymble: &Nymble, link_window: LinkWindow, time_period: TimePeriod) -> bool {
        if link_window != self.link_window {
            return false;
        }
        match time_period.checked_sub(self.time_period) {
            Some(steps) => &self.seed.evolve_by(steps).nymble() == nymble,
            None => false,
        }
    }

    /// Whether a ticket comes from the chain this token was made from.
    pub fn links(&self, ticket: &NymbleTicket) -> bool {
        self.links_nymble(ticket.nymble(), ticket.link_window(), ticket.time_period())
    }
}

impl AsnBinary for LinkingToken {}
