//! The user.
//!
//! A user holds its pseudonym, one credential per server, and the NM's verify
//! key. Tickets come out of the credential one time period at a time, and
//! every blacklist the server forwards is checked (locally, without telling
//! anyone anything) to see whether the user has been blacklisted.

use crate::{
    blacklist::{Blacklist, VerifyKey},
    chain::Seed,
    config::Params,
    crypto::base::Hmac,
    ids::{LinkWindow, Pseudonym, ServerId, TimePeriod},
    ticket::{Credential, NymbleTicket},
    util::ser::AsnBinary,
};
use rasn::{
    types::{constraints::Constraints, Identifier, Tag},
    AsnType, Decode, Decoder, Encode, Encoder,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The (link window, time period) of the last blacklist a user accepted.
#[derive(Debug, Clone, Copy, PartialEq, AsnType, Encode, Decode, getset::CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BlacklistContext {
    #[rasn(tag(explicit(0)))]
    link_window: LinkWindow,
    #[rasn(tag(explicit(1)))]
    time_period: TimePeriod,
}

/// The last seed we walked the chain to, so the next ticket doesn't have to
/// start from the beginning.
#[derive(Debug, Clone, AsnType, Encode, Decode)]
struct SeedCursor {
    #[rasn(tag(explicit(0)))]
    time_period: TimePeriod,
    #[rasn(tag(explicit(1)))]
    seed: Seed,
}

/// Everything a user keeps for one server.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct UserEntry {
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    credential: Credential,
    /// The context of the last blacklist we accepted, if any
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    context: Option<BlacklistContext>,
    /// Whether that blacklist had us on it
    #[rasn(tag(explicit(2)))]
    #[getset(get_copy = "pub")]
    blacklisted: bool,
    #[rasn(tag(explicit(3)))]
    cursor: Option<SeedCursor>,
}

impl UserEntry {
    fn new(credential: Credential) -> Self {
        Self {
            credential,
            context: None,
            blacklisted: false,
            cursor: None,
        }
    }

    /// Walk our chain to the given time period, starting from the cursor if
    /// it isn't past it.
    fn seed_at(&mut self, time_period: TimePeriod) -> Seed {
        let seed = match &self.cursor {
            Some(cursor) if cursor.time_period <= time_period => cursor.seed.evolve_by(time_period - cursor.time_period),
            _ => self.credential.seed().evolve_by(time_period),
        };
        self.cursor = Some(SeedCursor {
            time_period,
            seed: seed.clone(),
        });
        seed
    }

    /// Whether any of our nymbles up to and including `time_period` is on the
    /// blacklist.
    fn is_listed(&self, blacklist: &Blacklist, time_period: TimePeriod) -> bool {
        let mut seed = self.credential.seed().clone();
        for _ in 0..time_period {
            seed = seed.evolve();
            if blacklist.contains(&seed.nymble()) {
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Clone, AsnType, Encode, Decode)]
struct UserServer {
    #[rasn(tag(explicit(0)))]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    entry: UserEntry,
}

#[derive(Debug, Clone, Default)]
struct UserEntries(BTreeMap<ServerId, UserEntry>);

impl AsnType for UserEntries {
    const TAG: Tag = Tag::SET;
    const IDENTIFIER: Identifier = Identifier::SET_OF;
}

impl Encode for UserEntries {
    fn encode_with_tag_and_constraints<'encoder, E: Encoder<'encoder>>(
        &self,
        encoder: &mut E,
        tag: Tag,
        constraints: Constraints,
        identifier: Identifier,
    ) -> std::result::Result<(), E::Error> {
        let servers: Vec<UserServer> = self
            .0
            .iter()
            .map(|(server_id, entry)| UserServer {
                server_id: server_id.clone(),
                entry: entry.clone(),
            })
            .collect();
        encoder.encode_sequence_of(tag, &servers, constraints, identifier)?;
        Ok(())
    }
}

impl Decode for UserEntries {
    fn decode_with_tag_and_constraints<D: Decoder>(decoder: &mut D, tag: Tag, constraints: Constraints) -> std::result::Result<Self, D::Error> {
        let servers = Vec::<UserServer>::decode_with_tag_and_constraints(decoder, tag, constraints)?;
        Ok(Self(servers.into_iter().map(|s| (s.server_id, s.entry)).collect()))
    }
}

/// A user's state.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters)]
pub struct UserState {
    /// The protocol params we expect credentials to follow
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    params: Params,
    /// Our pseudonym for the current link window
    #[rasn(tag(explicit(1)))]
    #[getset(get = "pub")]
    pseudonym: Pseudonym,
    /// The PM's MAC over our pseudonym
    #[rasn(tag(explicit(2)))]
    #[getset(get = "pub")]
    pseudonym_mac: Hmac,
    /// The NM's verify key
    #[rasn(tag(explicit(3)))]
    #[getset(get = "pub")]
    verify_key: VerifyKey,
    #[rasn(tag(explicit(4)))]
    entries: UserEntries,
}

impl UserState {
    /// Create a user with the default params.
    pub fn new(pseudonym: Pseudonym, pseudonym_mac: Hmac, verify_key: VerifyKey) -> Self {
        Self::with_params(pseudonym, pseudonym_mac, verify_key, Params::default())
    }

    /// Create a user with the given params.
    pub fn with_params(pseudonym: Pseudonym, pseudonym_mac: Hmac, verify_key: VerifyKey, params: Params) -> Self {
        Self {
            params,
            pseudonym,
            pseudonym_mac,
            verify_key,
            entries: UserEntries::default(),
        }
    }

    /// Look up what we hold for a server.
    pub fn entry(&self, server_id: &ServerId) -> Option<&UserEntry> {
        self.entries.0.get(server_id)
    }

    /// Store a credential for a server, replacing anything we had for it.
    /// Returns `false` if the credential is for another server or doesn't
    /// cover a full link window.
    pub fn entry_initialize(&mut self, server_id: &ServerId, credential: Credential) -> bool {
        if credential.server_id() != server_id {
            warn!(server_id = %server_id, "user: credential is for another server");
            return false;
        }
        if credential.time_periods() != self.params.link_window_length() {
            warn!(server_id = %server_id, "user: credential does not cover the link window");
            return false;
        }
        self.entries.0.insert(server_id.clone(), UserEntry::new(credential));
        true
    }

    /// Get our ticket for a server in a time period. Returns `None` if we have
    /// no credential for the server or the period is outside the link window.
    pub fn credential_get(&mut self, server_id: &ServerId, time_period: TimePeriod) -> Option<NymbleTicket> {
        if !self.params.contains_time_period(time_period) {
            return None;
        }
        let entry = self.entries.0.get_mut(server_id)?;
        let seed = entry.seed_at(time_period);
        entry.credential.ticket(time_period, &seed)
    }

    /// Take a blacklist the server forwarded to us, and work out whether we're
    /// on it.
    ///
    /// The blacklist has to be signed by our NM, be for this server and our
    /// credential's link window, be bound to exactly `time_period`, and not go
    /// backwards from the last one we accepted. Otherwise we return `false`
    /// and nothing changes.
    pub fn blacklist_update(&mut self, server_id: &ServerId, blacklist: &Blacklist, link_window: LinkWindow, time_period: TimePeriod) -> bool {
        if !self.params.contains_time_period(time_period) {
            return false;
        }
        let verify_key = &self.verify_key;
        let entry = match self.entries.0.get_mut(server_id) {
            Some(entry) => entry,
            None => return false,
        };
        if blacklist.server_id() != server_id
            || blacklist.link_window() != link_window
            || entry.credential.link_window() != link_window
            || blacklist.time_period() != time_period
        {
            return false;
        }
        if let Some(context) = entry.context {
            if context.link_window == link_window && time_period < context.time_period {
                warn!(server_id = %server_id, time_period, "user: blacklist goes backwards");
                return false;
            }
        }
        if !blacklist.verify(verify_key) {
            warn!(server_id = %server_id, "user: blacklist signature does not verify");
            return false;
        }
        entry.blacklisted = entry.is_listed(blacklist, time_period);
        entry.context = Some(BlacklistContext { link_window, time_period });
        debug!(server_id = %server_id, time_period, "user: accepted blacklist");
        true
    }

    /// Whether the last blacklist we accepted for a server had us on it.
    pub fn blacklist_check(&self, server_id: &ServerId) -> bool {
        self.entry(server_id).map(|e| e.blacklisted).unwrap_or(false)
    }
}

impl AsnBinary for UserState {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nm::NymbleManager, pm::PseudonymManager, server::ServerState, util::test};

    const L: u32 = 6;

    struct Fixture {
        nm: NymbleManager,
        user: UserState,
        server: ServerState,
        credential: Credential,
    }

    fn setup() -> Fixture {
        let mut rng = test::rng();
        let params = Params::new(L).unwrap();
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let mut nm = NymbleManager::with_params(&test::hmac_key_np(), params.clone()).unwrap();
        let server_key = nm.entry_add(&mut rng, &test::server_id());
        let (pseudonym, mac) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        let credential = nm.credential_create(&pseudonym, &test::server_id(), 1).unwrap().unwrap();
        let blacklist = nm.blacklist_create(&test::server_id(), 1, 1).unwrap().unwrap();
        let user = UserState::with_params(pseudonym, mac, nm.verify_key().unwrap(), params);
        let server = ServerState::new(test::server_id(), server_key, blacklist);
        Fixture {
            nm,
            user,
            server,
            credential,
        }
    }

    #[test]
    fn user_accessors() {
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let nm = NymbleManager::new(&test::hmac_key_np()).unwrap();
        let (pseudonym, mac) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        let user = UserState::new(pseudonym.clone(), mac.clone(), nm.verify_key().unwrap());
        assert_eq!(user.pseudonym(), &pseudonym);
        assert_eq!(user.pseudonym_mac(), &mac);
        assert_eq!(user.verify_key(), &nm.verify_key().unwrap());
        assert_eq!(user.params().link_window_length(), 288);
    }

    #[test]
    fn user_entry_initialize() {
        let mut fix = setup();
        assert!(!fix.user.entry_initialize(&test::server_id_reversed(), fix.credential.clone()));
        assert!(fix.user.entry(&test::server_id()).is_none());
        assert!(fix.user.entry_initialize(&test::server_id(), fix.credential.clone()));
        assert!(fix.user.entry(&test::server_id()).is_some());

        // a credential minted under different params doesn't fit
        let mut short = UserState::with_params(
            fix.user.pseudonym().clone(),
            fix.user.pseudonym_mac().clone(),
            fix.user.verify_key().clone(),
            Params::new(L - 1).unwrap(),
        );
        assert!(!short.entry_initialize(&test::server_id(), fix.credential.clone()));
    }

    #[test]
    fn user_credential_get() {
        let mut fix = setup();
        assert!(fix.user.credential_get(&test::server_id(), 1).is_none());
        fix.user.entry_initialize(&test::server_id(), fix.credential.clone());
        assert!(fix.user.credential_get(&test::server_id(), 0).is_none());
        assert!(fix.user.credential_get(&test::server_id(), L + 1).is_none());
        assert!(fix.user.credential_get(&test::server_id_reversed(), 1).is_none());

        let mut forward = Vec::new();
        for time_period in 1..=L {
            let ticket = fix.user.credential_get(&test::server_id(), time_period).unwrap();
            assert!(fix.server.ticket_verify(&ticket, 1, time_period));
            forward.push(ticket);
        }
        // walking backwards (past the cursor) gives the same tickets
        for time_period in (1..=L).rev() {
            let ticket = fix.user.credential_get(&test::server_id(), time_period).unwrap();
            assert_eq!(ticket, forward[(time_period - 1) as usize]);
        }
        // and nymbles don't repeat
        for (i, a) in forward.iter().enumerate() {
            for b in &forward[i + 1..] {
                assert_ne!(a.nymble(), b.nymble());
            }
        }
    }

    #[test]
    fn user_blacklist_update() {
        let mut fix = setup();
        let mut user2 = fix.user.clone();
        fix.user.entry_initialize(&test::server_id(), fix.credential.clone());
        let blacklist = fix.server.blacklist().clone();

        assert!(!fix.user.blacklist_update(&test::server_id(), &blacklist, 2, 1));
        assert!(!fix.user.blacklist_update(&test::server_id(), &blacklist, 1, 2));
        assert!(!fix.user.blacklist_update(&test::server_id(), &blacklist, 1, L + 1));
        assert!(!fix.user.blacklist_update(&test::server_id_reversed(), &blacklist, 1, 1));
        assert!(!user2.blacklist_update(&test::server_id(), &blacklist, 1, 1));
        assert!(fix.user.entry(&test::server_id()).unwrap().context().is_none());
        assert!(fix.user.blacklist_update(&test::server_id(), &blacklist, 1, 1));
        assert!(!fix.user.blacklist_check(&test::server_id()));
        assert_eq!(
            fix.user.entry(&test::server_id()).unwrap().context().unwrap().time_period(),
            1
        );

        // a blacklist from some other NM doesn't verify
        let mut rng = test::rng();
        let mut nm2 = NymbleManager::with_params(&test::hmac_key_np_other(), Params::new(L).unwrap()).unwrap();
        nm2.entry_add(&mut rng, &test::server_id());
        let forged = nm2.blacklist_create(&test::server_id(), 2, 1).unwrap().unwrap();
        assert!(!fix.user.blacklist_update(&test::server_id(), &forged, 1, 2));

        // no going backwards
        let bl3 = fix.nm.blacklist_update(&blacklist, &[], 3, 1).unwrap().unwrap();
        assert!(fix.user.blacklist_update(&test::server_id(), &bl3, 1, 3));
        let bl2 = fix.nm.blacklist_update(&blacklist, &[], 2, 1).unwrap().unwrap();
        assert!(!fix.user.blacklist_update(&test::server_id(), &bl2, 1, 2));
        // the same period again is fine
        assert!(fix.user.blacklist_update(&test::server_id(), &bl3, 1, 3));
    }

    #[test]
    fn user_blacklist_check() {
        let mut fix = setup();
        fix.user.entry_initialize(&test::server_id(), fix.credential.clone());
        assert!(!fix.user.blacklist_check(&test::server_id()));
        assert!(!fix.user.blacklist_check(&test::server_id_reversed()));

        let blacklist = fix.server.blacklist().clone();
        let complaint = fix.user.credential_get(&test::server_id(), 1).unwrap();
        let updated = fix.nm.blacklist_update(&blacklist, &[complaint], 1, 1).unwrap().unwrap();

        assert!(fix.user.blacklist_update(&test::server_id(), &blacklist, 1, 1));
        assert!(!fix.user.blacklist_check(&test::server_id()));
        assert!(fix.user.blacklist_update(&test::server_id(), &updated, 1, 1));
        assert!(fix.user.blacklist_check(&test::server_id()));

        // carrying the entry forward keeps us listed
        let later = fix.nm.blacklist_update(&updated, &[], 4, 1).unwrap().unwrap();
        assert!(fix.user.blacklist_update(&test::server_id(), &later, 1, 4));
        assert!(fix.user.blacklist_check(&test::server_id()));

        // a failed update leaves the flag alone
        assert!(!fix.user.blacklist_update(&test::server_id(), &blacklist, 1, 1));
        assert!(fix.user.blacklist_check(&test::server_id()));
    }

    #[test]
    fn user_encode_decode() {
        let mut fix = setup();
        fix.user.entry_initialize(&test::server_id(), fix.credential.clone());
        let ticket3 = fix.user.credential_get(&test::server_id(), 3).unwrap();
        let blacklist = fix.server.blacklist().clone();
        assert!(fix.user.blacklist_update(&test::server_id(), &blacklist, 1, 1));

        let ser = fix.user.serialize_binary().unwrap();
        let mut user2 = UserState::deserialize_binary(&ser).unwrap();
        assert_eq!(user2.pseudonym(), fix.user.pseudonym());
        assert_eq!(user2.credential_get(&test::server_id(), 3).unwrap(), ticket3);
        assert_eq!(
            user2.entry(&test::server_id()).unwrap().context(),
            fix.user.entry(&test::server_id()).unwrap().context()
        );
    }
}
