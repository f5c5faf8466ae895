//! Nymble tickets and the credentials they're drawn from.
//!
//! A ticket is what a user presents to a server for one time period. It
//! carries the period's nymble, the period's seed sealed to the nymble
//! manager (so the NM can recover the seed if the server complains), and two
//! MACs: one only the NM can check (so complaints can't be forged) and one
//! the server checks with the key it got at registration.

use crate::{
    chain::{Nymble, Seed},
    crypto::base::{Hmac, HmacKey, Sealed},
    error::Result,
    ids::{LinkWindow, ServerId, TimePeriod},
    util::ser::{self, AsnBinary},
};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};

/// The coordinates a ticket is bound to. Used as AAD when sealing the seed.
#[derive(Debug, Clone, AsnType, Encode)]
pub(crate) struct TicketContext {
    #[rasn(tag(explicit(0)))]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    link_window: LinkWindow,
    #[rasn(tag(explicit(2)))]
    time_period: TimePeriod,
}

impl TicketContext {
    pub(crate) fn new(server_id: &ServerId, link_window: LinkWindow, time_period: TimePeriod) -> Self {
        Self {
            server_id: server_id.clone(),
            link_window,
            time_period,
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        ser::serialize(self)
    }
}

/// The part of a ticket covered by the MACs.
#[derive(Debug, Clone, AsnType, Encode)]
struct TicketBody {
    #[rasn(tag(explicit(0)))]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    link_window: LinkWindow,
    #[rasn(tag(explicit(2)))]
    time_period: TimePeriod,
    #[rasn(tag(explicit(3)))]
    nymble: Nymble,
    #[rasn(tag(explicit(4)))]
    sealed_seed: Sealed,
}

/// The bytes the NM's ticket MAC is computed over.
pub(crate) fn ticket_body_bytes(
    server_id: &ServerId,
    link_window: LinkWindow,
    time_period: TimePeriod,
    nymble: &Nymble,
    sealed_seed: &Sealed,
) -> Result<Vec<u8>> {
    let body = TicketBody {
        server_id: server_id.clone(),
        link_window,
        time_period,
        nymble: nymble.clone(),
        sealed_seed: sealed_seed.clone(),
    };
    ser::serialize(&body)
}

/// The bytes the server's ticket MAC is computed over: the body, then the NM's
/// MAC.
pub(crate) fn ticket_server_bytes(body: &[u8], mac_n: &Hmac) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + mac_n.len());
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(mac_n);
    bytes
}

/// A single-use ticket for one (server, link window, time period).
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct NymbleTicket {
    /// The server this ticket is for
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    server_id: ServerId,
    /// The link window this ticket is for
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    link_window: LinkWindow,
    /// The time period this ticket is for
    #[rasn(tag(explicit(2)))]
    #[getset(get_copy = "pub")]
    time_period: TimePeriod,
    /// This period's nymble
    #[rasn(tag(explicit(3)))]
    #[getset(get = "pub")]
    nymble: Nymble,
    /// This period's seed, sealed so only the NM can open it
    #[rasn(tag(explicit(4)))]
    #[getset(get = "pub")]
    sealed_seed: Sealed,
    /// The NM's MAC over the ticket body
    #[rasn(tag(explicit(5)))]
    #[getset(get = "pub")]
    mac_n: Hmac,
    /// The server's MAC over the ticket body and `mac_n`
    #[rasn(tag(explicit(6)))]
    #[getset(get = "pub")]
    mac_ns: Hmac,
}

impl NymbleTicket {
    /// The bytes `mac_n` covers.
    pub(crate) fn body_bytes(&self) -> Result<Vec<u8>> {
        ticket_body_bytes(&self.server_id, self.link_window, self.time_period, &self.nymble, &self.sealed_seed)
    }

    /// Check the server MAC on this ticket. This says nothing about whether the
    /// ticket is blacklisted, or whether it's for the period you expect.
    pub fn verify_server_mac(&self, server_key: &HmacKey) -> Result<()> {
        let body = self.body_bytes()?;
        self.mac_ns.verify(server_key, &ticket_server_bytes(&body, &self.mac_n))
    }
}

impl AsnBinary for NymbleTicket {}

/// The NM-issued, per-period authenticators of a ticket. The user can't make
/// these (it doesn't have the keys), so the NM makes one for every period of
/// the link window when it issues a credential.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters)]
#[getset(get = "pub")]
pub struct TicketAuth {
    #[rasn(tag(explicit(0)))]
    sealed_seed: Sealed,
    #[rasn(tag(explicit(1)))]
    mac_n: Hmac,
    #[rasn(tag(explicit(2)))]
    mac_ns: Hmac,
}

impl TicketAuth {
    pub(crate) fn new(sealed_seed: Sealed, mac_n: Hmac, mac_ns: Hmac) -> Self {
        Self { sealed_seed, mac_n, mac_ns }
    }
}

/// What a user gets from the NM for one (pseudonym, server, link window): the
/// base seed of its chain, and the authenticators for every time period.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct Credential {
    /// The server this credential is for
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    server_id: ServerId,
    /// The link window this credential is good for
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    link_window: LinkWindow,
    /// The base of the seed chain (`seed_0`)
    #[rasn(tag(explicit(2)))]
    #[getset(get = "pub(crate)")]
    seed: Seed,
    /// Authenticators for periods `1..=L`, in order
    #[rasn(tag(explicit(3)))]
    #[getset(get = "pub")]
    tickets: Vec<TicketAuth>,
}

impl Credential {
    pub(crate) fn new(server_id: ServerId, link_window: LinkWindow, seed: Seed, tickets: Vec<TicketAuth>) -> Self {
        Self {
            server_id,
            link_window,
            seed,
            tickets,
        }
    }

    /// How many time periods this credential covers.
    pub fn time_periods(&self) -> TimePeriod {
        self.tickets.len() as TimePeriod
    }

    /// Assemble the ticket for a time period given that period's seed. Returns
    /// `None` if the credential doesn't cover the period.
    pub(crate) fn ticket(&self, time_period: TimePeriod, seed: &Seed) -> Option<NymbleTicket> {
        let idx = usize::try_from(time_period).ok()?.checked_sub(1)?;
        let auth = self.tickets.get(idx)?;
        Some(NymbleTicket {
            server_id: self.server_id.clone(),
            link_window: self.link_window,
            time_period,
            nymble: seed.nymble(),
            sealed_seed: auth.sealed_seed.clone(),
            mac_n: auth.mac_n.clone(),
            mac_ns: auth.mac_ns.clone(),
        })
    }
}

impl AsnBinary for Credential {}
