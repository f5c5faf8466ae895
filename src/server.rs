//! The server (relying party).
//!
//! A server checks the tickets users present against the key the NM gave it
//! at registration, its current blacklist, and whatever linking tokens it's
//! collected from complaints. Once per time period it syncs with the NM and
//! then marks the period's blacklist as finalized.

use crate::{
    blacklist::{Blacklist, LinkingToken},
    crypto::base::HmacKey,
    ids::{LinkWindow, ServerId, TimePeriod},
    ticket::NymbleTicket,
    util::ser::AsnBinary,
};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};
use tracing::{debug, warn};

/// A server's state.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct ServerState {
    /// Our id
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    key: HmacKey,
    /// The most recent blacklist we've taken from the NM
    #[rasn(tag(explicit(2)))]
    #[getset(get = "pub")]
    blacklist: Blacklist,
    /// The linking tokens that came with it
    #[rasn(tag(explicit(3)))]
    #[getset(get = "pub")]
    linking_tokens: Vec<LinkingToken>,
    /// The time period we're in. Starts at the initial blacklist's period and
    /// moves with [`iterate`](Self::iterate).
    #[rasn(tag(explicit(4)))]
    #[getset(get_copy = "pub")]
    time_period: TimePeriod,
    #[rasn(tag(explicit(5)))]
    finalized: bool,
}

impl ServerState {
    /// Set up a server from its id, the key the NM issued it, and an initial
    /// blacklist.
    pub fn new(server_id: ServerId, key: HmacKey, blacklist: Blacklist) -> Self {
        let time_period = blacklist.time_period();
        Self {
            server_id,
            key,
            blacklist,
            linking_tokens: Vec::new(),
            time_period,
            finalized: false,
        }
    }

    /// Whether the blacklist we hold is finalized for the given time period:
    /// we've called [`blacklist_finalize`](Self::blacklist_finalize) since the
    /// last iteration, and the blacklist is bound to that period.
    pub fn blacklist_finalized(&self, time_period: TimePeriod) -> bool {
        self.finalized && self.blacklist.time_period() == time_period
    }

    /// Mark the blacklist we hold as final for this time period. Always
    /// returns `true`.
    pub fn blacklist_finalize(&mut self) -> bool {
        self.finalized = true;
        true
    }

    /// Move `n` time periods forward. The blacklist is no longer final.
    pub fn iterate(&mut self, n: TimePeriod) {
        self.time_period = self.time_period.saturating_add(n);
        self.finalized = false;
        debug!(server_id = %self.server_id, time_period = self.time_period, "server: iterated");
    }

    /// Check a ticket presented for the given (link window, time period).
    ///
    /// The ticket has to be for us and for exactly that link window and time
    /// period, has to carry a valid MAC under our key, and must not be on our
    /// blacklist or linked by any of our linking tokens.
    pub fn ticket_verify(&self, ticket: &NymbleTicket, link_window: LinkWindow, time_period: TimePeriod) -> bool {
        if ticket.server_id() != &self.server_id || ticket.link_window() != link_window || ticket.time_period() != time_period {
            return false;
        }
        if ticket.verify_server_mac(&self.key).is_err() {
            return false;
        }
        if self.blacklist.link_window() == link_window && self.blacklist.contains(ticket.nymble()) {
            return false;
        }
        !self.linking_tokens.iter().any(|token| token.links(ticket))
    }

    /// Swap in a new blacklist from the NM and add any new linking tokens to
    /// the ones we hold. Returns `false` (and changes nothing) if the
    /// blacklist is for another server.
    ///
    /// Tokens keep linking for the rest of their link window, so a later
    /// update with no complaints doesn't let anyone back in. Tokens for any
    /// link window other than the new blacklist's are dropped.
    pub fn update(&mut self, blacklist: Blacklist, linking_tokens: Vec<LinkingToken>) -> bool {
        if blacklist.server_id() != &self.server_id {
            warn!(server_id = %self.server_id, other = %blacklist.server_id(), "server: refusing blacklist for another server");
            return false;
        }
        let link_window = blacklist.link_window();
        self.linking_tokens.retain(|token| token.link_window() == link_window);
        for token in linking_tokens {
            if token.link_window() == link_window && !self.linking_tokens.contains(&token) {
                self.linking_tokens.push(token);
            }
        }
        debug!(
            server_id = %self.server_id,
            time_period = blacklist.time_period(),
            entries = blacklist.entries().len(),
            tokens = self.linking_tokens.len(),
            "server: blacklist updated"
        );
        self.blacklist = blacklist;
        true
    }
}

impl AsnBinary for ServerState {}
