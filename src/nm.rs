//! The nymble manager (NM).
//!
//! The NM registers servers, hands users credentials for those servers, and
//! turns a server's complaints into blacklist entries and linking tokens. It
//! shares its long-term key with the pseudonym manager, which is how it can
//! check pseudonyms without ever seeing the identity behind them.
//!
//! Every key the NM uses is derived from that one long-term key, so the NM's
//! state is just the key, the params, and the server registry.

use crate::{
    blacklist::{Blacklist, LinkingToken, VerifyKey},
    chain::Seed,
    config::Params,
    crypto::base::{stretch_key, DataWithAAD, Hmac, HmacKey, SecretKey, SignKeypair},
    error::{Error, Result},
    ids::{LinkWindow, Pseudonym, ServerId, TimePeriod},
    pm,
    ticket::{self, Credential, NymbleTicket, TicketAuth, TicketContext},
    util::ser::{self, AsnBinary, BinarySecret},
};
use rand::{CryptoRng, RngCore};
use rasn::{
    types::{constraints::Constraints, Identifier, Tag},
    AsnType, Decode, Decoder, Encode, Encoder,
};
use std::collections::BTreeMap;
use std::ops::Deref;
use tracing::{debug, warn};

const INFO_SEED: &[u8] = b"nymble/nm/seed";
const INFO_TICKET_SEAL: &[u8] = b"nymble/nm/ticket-seal";
const INFO_TICKET_MAC: &[u8] = b"nymble/nm/ticket-mac";
const INFO_TICKET_NONCE: &[u8] = b"nymble/nm/ticket-nonce";
const INFO_BLACKLIST_SIGN: &[u8] = b"nymble/nm/blacklist-sign";

/// What the NM knows about a registered server.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters, getset::CopyGetters)]
pub struct ServerEntry {
    /// The key the server uses to verify tickets
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    key: HmacKey,
    /// The latest time period the server has told us about. Never goes
    /// backwards.
    #[rasn(tag(explicit(1)))]
    #[getset(get_copy = "pub")]
    time_period: TimePeriod,
}

#[derive(Debug, Clone, AsnType, Encode, Decode)]
struct RegisteredServer {
    #[rasn(tag(explicit(0)))]
    server_id: ServerId,
    #[rasn(tag(explicit(1)))]
    entry: ServerEntry,
}

/// All the servers an NM has registered, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
struct ServerRegistry(BTreeMap<ServerId, ServerEntry>);

impl Deref for ServerRegistry {
    type Target = BTreeMap<ServerId, ServerEntry>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsnType for ServerRegistry {
    const TAG: Tag = Tag::SET;
    const IDENTIFIER: Identifier = Identifier::SET_OF;
}

impl Encode for ServerRegistry {
    fn encode_with_tag_and_constraints<'encoder, E: Encoder<'encoder>>(
        &self,
        encoder: &mut E,
        tag: Tag,
        constraints: Constraints,
        identifier: Identifier,
    ) -> std::result::Result<(), E::Error> {
        let servers: Vec<RegisteredServer> = self
            .0
            .iter()
            .map(|(server_id, entry)| RegisteredServer {
                server_id: server_id.clone(),
                entry: entry.clone(),
            })
            .collect();
        encoder.encode_sequence_of(tag, &servers, constraints, identifier)?;
        Ok(())
    }
}

impl Decode for ServerRegistry {
    fn decode_with_tag_and_constraints<D: Decoder>(decoder: &mut D, tag: Tag, constraints: Constraints) -> std::result::Result<Self, D::Error> {
        let servers = Vec::<RegisteredServer>::decode_with_tag_and_constraints(decoder, tag, constraints)?;
        Ok(Self(servers.into_iter().map(|s| (s.server_id, s.entry)).collect()))
    }
}

/// What the per-chain base seed is derived from.
#[derive(Debug, AsnType, Encode)]
struct SeedContext {
    #[rasn(tag(explicit(0)))]
    pseudonym: Pseudonym,
    #[rasn(tag(explicit(1)))]
    server_id: ServerId,
    #[rasn(tag(explicit(2)))]
    link_window: LinkWindow,
}

/// The keys needed to mint tickets, derived once per batch.
struct TicketKeys {
    seal: SecretKey,
    mac: HmacKey,
}

/// The nymble manager's state.
#[derive(Debug, Clone, AsnType, Encode, Decode, getset::Getters)]
pub struct NymbleManager {
    /// The protocol params this NM issues under
    #[rasn(tag(explicit(0)))]
    #[getset(get = "pub")]
    params: Params,
    #[rasn(tag(explicit(1)))]
    key: BinarySecret<32>,
    #[rasn(tag(explicit(2)))]
    registry: ServerRegistry,
}

impl NymbleManager {
    /// Create an NM with the default params. The key is the one shared with
    /// the pseudonym manager and must be exactly
    /// [`DIGEST_LEN`](crate::crypto::base::DIGEST_LEN) bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        Self::with_params(key, Params::default())
    }

    /// Create an NM with the given params.
    pub fn with_params(key: &[u8], params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            key: pm::root_key(key)?,
            registry: ServerRegistry::default(),
        })
    }

    fn derive_hmac_key(&self, info: &[u8]) -> Result<HmacKey> {
        HmacKey::derive(self.key.expose_secret(), info)
    }

    fn blacklist_sign_key(&self) -> Result<SignKeypair> {
        SignKeypair::derive_ed25519(self.key.expose_secret(), INFO_BLACKLIST_SIGN)
    }

    fn ticket_keys(&self) -> Result<TicketKeys> {
        Ok(TicketKeys {
            seal: SecretKey::derive(self.key.expose_secret(), INFO_TICKET_SEAL)?,
            mac: self.derive_hmac_key(INFO_TICKET_MAC)?,
        })
    }

    /// The material users need to check this NM's blacklists.
    pub fn verify_key(&self) -> Result<VerifyKey> {
        Ok(VerifyKey::new(self.blacklist_sign_key()?.public()))
    }

    /// Whether a server is registered.
    pub fn entry_exists(&self, server_id: &ServerId) -> bool {
        self.registry.contains_key(server_id)
    }

    /// Look up a registered server.
    pub fn entry(&self, server_id: &ServerId) -> Option<&ServerEntry> {
        self.registry.get(server_id)
    }

    /// Register a server, returning the key it verifies tickets with. If the
    /// server is already registered, its existing key comes back unchanged
    /// (see [`entry_rotate`](Self::entry_rotate) to replace it).
    pub fn entry_add<R: RngCore + CryptoRng>(&mut self, rng: &mut R, server_id: &ServerId) -> HmacKey {
        if let Some(entry) = self.registry.get(server_id) {
            return entry.key.clone();
        }
        let key = HmacKey::new_blake3(rng);
        self.registry.0.insert(
            server_id.clone(),
            ServerEntry {
                key: key.clone(),
                time_period: 0,
            },
        );
        debug!(server_id = %server_id, "nm: registered server");
        key
    }

    /// Give a registered server a fresh key. Credentials issued under the old
    /// key stop verifying at that server. Returns `None` if the server isn't
    /// registered.
    pub fn entry_rotate<R: RngCore + CryptoRng>(&mut self, rng: &mut R, server_id: &ServerId) -> Option<HmacKey> {
        let entry = self.registry.0.get_mut(server_id)?;
        entry.key = HmacKey::new_blake3(rng);
        debug!(server_id = %server_id, "nm: rotated server key");
        Some(entry.key.clone())
    }

    /// Move a server's time period watermark forward. Returns `false` if the
    /// server isn't registered.
    pub fn entry_update(&mut self, server_id: &ServerId, time_period: TimePeriod) -> bool {
        match self.registry.0.get_mut(server_id) {
            Some(entry) => {
                entry.time_period = entry.time_period.max(time_period);
                true
            }
            None => false,
        }
    }

    /// Check that a pseudonym was issued by our pseudonym manager for the given
    /// link window.
    pub fn pseudonym_verify(&self, pseudonym: &Pseudonym, link_window: LinkWindow, mac: &Hmac) -> bool {
        match pm::pseudonym_mac_key(&self.key) {
            Ok(key) => mac.verify(&key, &pm::pseudonym_mac_message(pseudonym, link_window)).is_ok(),
            Err(_) => false,
        }
    }

    fn seed_base(&self, pseudonym: &Pseudonym, server_id: &ServerId, link_window: LinkWindow) -> Result<Seed> {
        let context = SeedContext {
            pseudonym: pseudonym.clone(),
            server_id: server_id.clone(),
            link_window,
        };
        let mac = Hmac::new(&self.derive_hmac_key(INFO_SEED)?, &ser::serialize(&context)?)?;
        let bytes: [u8; 32] = mac.deref().try_into().map_err(|_| Error::BadLength)?;
        Ok(Seed::new(bytes))
    }

    /// Mint the authenticators for one period of a chain.
    fn ticket_auth(
        keys: &TicketKeys,
        server_key: &HmacKey,
        server_id: &ServerId,
        link_window: LinkWindow,
        time_period: TimePeriod,
        seed: &Seed,
    ) -> Result<TicketAuth> {
        let nymble = seed.nymble();
        let context = TicketContext::new(server_id, link_window, time_period).to_bytes()?;
        // nymbles never repeat, so neither do nonces derived from them
        let mut nonce_bytes = [0u8; 24];
        stretch_key(&nymble[..], &mut nonce_bytes, Some(INFO_TICKET_NONCE), None)?;
        let nonce = keys.seal.make_nonce(&nonce_bytes)?;
        let sealed_seed = keys.seal.seal_with_nonce(nonce, DataWithAAD::new(&seed.as_bytes()[..], context))?;
        let body = ticket::ticket_body_bytes(server_id, link_window, time_period, &nymble, &sealed_seed)?;
        let mac_n = Hmac::new(&keys.mac, &body)?;
        let mac_ns = Hmac::new(server_key, &ticket::ticket_server_bytes(&body, &mac_n))?;
        Ok(TicketAuth::new(sealed_seed, mac_n, mac_ns))
    }

    /// Issue a credential for a pseudonym at a server for a link window. The
    /// credential covers every time period of the window.
    ///
    /// Returns `Ok(None)` if the server isn't registered. This doesn't check
    /// the pseudonym; call [`pseudonym_verify`](Self::pseudonym_verify) first.
    pub fn credential_create(&self, pseudonym: &Pseudonym, server_id: &ServerId, link_window: LinkWindow) -> Result<Option<Credential>> {
        if link_window == 0 {
            Err(Error::LinkWindowInvalid)?;
        }
        let entry = match self.registry.get(server_id) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let keys = self.ticket_keys()?;
        let seed_base = self.seed_base(pseudonym, server_id, link_window)?;
        let mut seed = seed_base.clone();
        let mut tickets = Vec::with_capacity(self.params.link_window_length() as usize);
        for time_period in 1..=self.params.link_window_length() {
            seed = seed.evolve();
            tickets.push(Self::ticket_auth(&keys, &entry.key, server_id, link_window, time_period, &seed)?);
        }
        Ok(Some(Credential::new(server_id.clone(), link_window, seed_base, tickets)))
    }

    /// Open a ticket and recover the seed it was made from. This is the
    /// trapdoor that lets the NM turn a complaint into a linking token.
    pub fn open_ticket(&self, ticket: &NymbleTicket) -> Result<Seed> {
        let keys = self.ticket_keys()?;
        ticket.mac_n().verify(&keys.mac, &ticket.body_bytes()?)?;
        let context = TicketContext::new(ticket.server_id(), ticket.link_window(), ticket.time_period()).to_bytes()?;
        match ticket.sealed_seed().aad() {
            Some(aad) if aad.as_slice() == context.as_slice() => {}
            _ => Err(Error::TicketInvalid)?,
        }
        let opened = keys.seal.open(ticket.sealed_seed())?;
        let bytes: [u8; 32] = opened.as_slice().try_into().map_err(|_| Error::BadLength)?;
        let seed = Seed::new(bytes);
        if &seed.nymble() != ticket.nymble() {
            Err(Error::TicketInvalid)?;
        }
        Ok(seed)
    }

    /// Like [`open_ticket`](Self::open_ticket), but any failure is just `None`.
    pub fn reveal_seed(&self, ticket: &NymbleTicket) -> Option<Seed> {
        self.open_ticket(ticket).ok()
    }

    /// Check a complaint against the context it was filed in, and recover its
    /// seed. Anything that doesn't check out is logged and skipped.
    fn complaint_seed(&self, server_id: &ServerId, link_window: LinkWindow, time_period: TimePeriod, ticket: &NymbleTicket) -> Option<Seed> {
        if ticket.server_id() != server_id || ticket.link_window() != link_window {
            warn!(server_id = %server_id, nymble = %ticket.nymble(), "nm: complaint is for a different server or link window");
            return None;
        }
        if ticket.time_period() > time_period {
            warn!(server_id = %server_id, nymble = %ticket.nymble(), "nm: complaint is from the future");
            return None;
        }
        match self.open_ticket(ticket) {
            Ok(seed) => Some(seed),
            Err(e) => {
                warn!(server_id = %server_id, nymble = %ticket.nymble(), error = %e, "nm: complaint does not open");
                None
            }
        }
    }

    /// Create an empty blacklist for a server, bound to a (link window, time
    /// period). Returns `Ok(None)` if the server isn't registered or the time
    /// period falls outside the link window.
    pub fn blacklist_create(&self, server_id: &ServerId, time_period: TimePeriod, link_window: LinkWindow) -> Result<Option<Blacklist>> {
        if !self.entry_exists(server_id) || !self.params.contains_time_period(time_period) || link_window == 0 {
            return Ok(None);
        }
        let blacklist = Blacklist::new_signed(&self.blacklist_sign_key()?, server_id.clone(), link_window, time_period, Vec::new())?;
        Ok(Some(blacklist))
    }

    /// Check that a blacklist was issued by this NM for the given server and
    /// link window.
    pub fn blacklist_verify(&self, blacklist: &Blacklist, server_id: &ServerId, link_window: LinkWindow) -> bool {
        if blacklist.server_id() != server_id || blacklist.link_window() != link_window {
            return false;
        }
        match self.verify_key() {
            Ok(verify_key) => blacklist.verify(&verify_key),
            Err(_) => false,
        }
    }

    /// Turn complaints into linking tokens. Each token links its chain from
    /// `time_period` to the end of the link window.
    ///
    /// Returns `Ok(None)` if the blacklist wasn't issued by us for this server
    /// and link window, or if the time period is outside the link window.
    /// Complaints that don't check out are skipped.
    pub fn tokens_create(
        &self,
        server_id: &ServerId,
        blacklist: &Blacklist,
        complaints: &[NymbleTicket],
        time_period: TimePeriod,
        link_window: LinkWindow,
    ) -> Result<Option<Vec<LinkingToken>>> {
        if !self.blacklist_verify(blacklist, server_id, link_window) || !self.params.contains_time_period(time_period) {
            warn!(server_id = %server_id, "nm: refusing to create tokens against this blacklist");
            return Ok(None);
        }
        let mut tokens: Vec<LinkingToken> = Vec::with_capacity(complaints.len());
        for ticket in complaints {
            let seed = match self.complaint_seed(server_id, link_window, time_period, ticket) {
                Some(seed) => seed,
                None => continue,
            };
            let token = LinkingToken::new(link_window, time_period, seed.evolve_by(time_period - ticket.time_period()));
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Ok(Some(tokens))
    }

    /// Fold complaints into a blacklist and bind it to a new time period.
    ///
    /// Returns `Ok(None)` if the blacklist wasn't issued by us for the given
    /// link window, or if the time period is outside the link window or goes
    /// backwards. Complaints that don't check out are skipped.
    pub fn blacklist_update(
        &self,
        blacklist: &Blacklist,
        complaints: &[NymbleTicket],
        time_period: TimePeriod,
        link_window: LinkWindow,
    ) -> Result<Option<Blacklist>> {
        let server_id = blacklist.server_id();
        if !self.blacklist_verify(blacklist, server_id, link_window) {
            warn!(server_id = %server_id, "nm: refusing to update a blacklist we can't verify");
            return Ok(None);
        }
        if !self.params.contains_time_period(time_period) || time_period < blacklist.time_period() {
            warn!(server_id = %server_id, time_period, "nm: refusing to move blacklist to this time period");
            return Ok(None);
        }
        let mut entries = blacklist.entries().clone();
        for ticket in complaints {
            if self.complaint_seed(server_id, link_window, time_period, ticket).is_some() {
                entries.push(ticket.nymble().clone());
            }
        }
        let updated = Blacklist::new_signed(&self.blacklist_sign_key()?, server_id.clone(), link_window, time_period, entries)?;
        debug!(server_id = %server_id, time_period, entries = updated.entries().len(), "nm: blacklist updated");
        Ok(Some(updated))
    }
}

impl AsnBinary for NymbleManager {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pm::PseudonymManager, util::test};

    fn setup(link_window_length: u32) -> (PseudonymManager, NymbleManager, HmacKey) {
        let mut rng = test::rng();
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let mut nm = NymbleManager::with_params(&test::hmac_key_np(), Params::new(link_window_length).unwrap()).unwrap();
        let server_key = nm.entry_add(&mut rng, &test::server_id());
        (pm, nm, server_key)
    }

    fn ticket_for(credential: &Credential, time_period: TimePeriod) -> NymbleTicket {
        let seed = credential.seed().evolve_by(time_period);
        credential.ticket(time_period, &seed).unwrap()
    }

    #[test]
    fn nm_new() {
        NymbleManager::new(&test::hmac_key_np()).unwrap();
        let mut doubled = test::hmac_key_np();
        doubled.extend(test::hmac_key_np());
        assert!(matches!(NymbleManager::new(&doubled), Err(Error::BadLength)));
        assert!(matches!(NymbleManager::new(b""), Err(Error::BadLength)));
        let nm = NymbleManager::new(&test::hmac_key_np()).unwrap();
        assert_eq!(nm.params().link_window_length(), 288);
    }

    #[test]
    fn nm_verify_key() {
        let nm1 = NymbleManager::new(&test::hmac_key_np()).unwrap();
        let nm2 = NymbleManager::new(&test::hmac_key_np()).unwrap();
        let nm3 = NymbleManager::new(&test::hmac_key_np_other()).unwrap();
        assert_eq!(nm1.verify_key().unwrap(), nm2.verify_key().unwrap());
        assert_ne!(nm1.verify_key().unwrap(), nm3.verify_key().unwrap());
    }

    #[test]
    fn nm_entries() {
        let mut rng = test::rng();
        let mut nm = NymbleManager::new(&test::hmac_key_np()).unwrap();
        let mut nm2 = NymbleManager::new(&test::hmac_key_np()).unwrap();
        assert!(!nm.entry_exists(&test::server_id()));

        let key1 = nm.entry_add(&mut rng, &test::server_id());
        assert!(nm.entry_exists(&test::server_id()));
        assert!(!nm.entry_exists(&test::server_id_reversed()));
        let key2 = nm.entry_add(&mut rng, &test::server_id_reversed());
        assert!(key1 != key2);
        // adding again is not a rotation
        assert!(nm.entry_add(&mut rng, &test::server_id()) == key1);

        assert!(nm.entry_update(&test::server_id(), 4));
        assert_eq!(nm.entry(&test::server_id()).unwrap().time_period(), 4);
        assert!(nm.entry_update(&test::server_id(), 2));
        assert_eq!(nm.entry(&test::server_id()).unwrap().time_period(), 4);
        assert!(!nm2.entry_update(&test::server_id(), 4));
        nm2.entry_add(&mut rng, &test::server_id());
        assert!(nm2.entry_update(&test::server_id(), 4));

        let key3 = nm.entry_rotate(&mut rng, &test::server_id()).unwrap();
        assert!(key3 != key1);
        assert!(nm.entry(&test::server_id()).unwrap().key() == &key3);
        assert_eq!(nm.entry(&test::server_id()).unwrap().time_period(), 4);
        let unknown = ServerId::new("who dis").unwrap();
        assert!(nm.entry_rotate(&mut rng, &unknown).is_none());
    }

    #[test]
    fn nm_pseudonym_verify() {
        let (pm, nm, _) = setup(4);
        let nm2 = NymbleManager::new(&test::hmac_key_np_other()).unwrap();
        let (pseudonym, mac) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        assert!(nm.pseudonym_verify(&pseudonym, 1, &mac));
        assert!(!nm.pseudonym_verify(&pseudonym, 2, &mac));
        assert!(!nm2.pseudonym_verify(&pseudonym, 1, &mac));

        let mut mac_rev = mac.to_vec();
        mac_rev.reverse();
        assert!(!nm.pseudonym_verify(&pseudonym, 1, &Hmac::try_from_slice(&mac_rev).unwrap()));
        let mut nym_rev = pseudonym.to_vec();
        nym_rev.reverse();
        assert!(!nm.pseudonym_verify(&Pseudonym::try_from_slice(&nym_rev).unwrap(), 1, &mac));
    }

    #[test]
    fn nm_credential_create() {
        let (pm, nm, server_key) = setup(4);
        let (pseudonym, _) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        assert!(nm.credential_create(&pseudonym, &test::server_id_reversed(), 1).unwrap().is_none());
        assert!(matches!(nm.credential_create(&pseudonym, &test::server_id(), 0), Err(Error::LinkWindowInvalid)));

        let credential = nm.credential_create(&pseudonym, &test::server_id(), 1).unwrap().unwrap();
        assert_eq!(credential.server_id(), &test::server_id());
        assert_eq!(credential.link_window(), 1);
        assert_eq!(credential.time_periods(), 4);

        // the same inputs give the same chain
        let credential2 = nm.credential_create(&pseudonym, &test::server_id(), 1).unwrap().unwrap();
        assert!(credential.seed() == credential2.seed());
        let credential_w2 = nm.credential_create(&pseudonym, &test::server_id(), 2).unwrap().unwrap();
        assert!(credential.seed() != credential_w2.seed());

        for time_period in 1..=4 {
            let ticket = ticket_for(&credential, time_period);
            ticket.verify_server_mac(&server_key).unwrap();
        }
    }

    #[test]
    fn nm_open_ticket() {
        let (pm, nm, _) = setup(4);
        let nm2 = NymbleManager::new(&test::hmac_key_np_other()).unwrap();
        let (pseudonym, _) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        let credential = nm.credential_create(&pseudonym, &test::server_id(), 1).unwrap().unwrap();
        let ticket = ticket_for(&credential, 3);
        let seed = nm.open_ticket(&ticket).unwrap();
        assert!(seed == credential.seed().evolve_by(3));
        assert!(nm.reveal_seed(&ticket).is_some());
        assert!(nm2.reveal_seed(&ticket).is_none());

        // a ticket whose nymble was swapped out no longer opens
        let other = ticket_for(&credential, 2);
        let mut ser = ticket.serialize_binary().unwrap();
        let nym3 = ticket.nymble().to_vec();
        let nym2 = other.nymble().to_vec();
        let idx = ser.windows(32).position(|w| w == nym3.as_slice()).unwrap();
        ser[idx..idx + 32].copy_from_slice(&nym2);
        let swapped = NymbleTicket::deserialize_binary(&ser).unwrap();
        assert!(matches!(nm.open_ticket(&swapped), Err(Error::CryptoHmacVerificationFailed)));
    }

    #[test]
    fn nm_blacklist_create_verify() {
        let (_, nm, _) = setup(4);
        let nm2 = NymbleManager::new(&test::hmac_key_np_other()).unwrap();
        for time_period in 1..=4 {
            assert!(nm.blacklist_create(&test::server_id(), time_period, 1).unwrap().is_some());
        }
        assert!(nm.blacklist_create(&test::server_id(), 5, 1).unwrap().is_none());
        assert!(nm.blacklist_create(&test::server_id(), 0, 1).unwrap().is_none());
        assert!(nm.blacklist_create(&test::server_id_reversed(), 1, 1).unwrap().is_none());

        let blacklist = nm.blacklist_create(&test::server_id(), 1, 1).unwrap().unwrap();
        assert!(blacklist.entries().is_empty());
        assert!(nm.blacklist_verify(&blacklist, &test::server_id(), 1));
        assert!(!nm.blacklist_verify(&blacklist, &test::server_id(), 2));
        assert!(!nm.blacklist_verify(&blacklist, &test::server_id_reversed(), 1));
        assert!(!nm2.blacklist_verify(&blacklist, &test::server_id(), 1));
    }

    #[test]
    fn nm_tokens_and_blacklist_update() {
        let (pm, nm, _) = setup(8);
        let (pseudonym, _) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        let credential = nm.credential_create(&pseudonym, &test::server_id(), 1).unwrap().unwrap();
        let blacklist = nm.blacklist_create(&test::server_id(), 1, 1).unwrap().unwrap();
        let complaint = ticket_for(&credential, 1);

        let tokens = nm.tokens_create(&test::server_id(), &blacklist, &[], 1, 1).unwrap().unwrap();
        assert!(tokens.is_empty());
        let tokens = nm.tokens_create(&test::server_id(), &blacklist, &[complaint.clone(), complaint.clone()], 2, 1).unwrap().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].time_period(), 2);
        assert!(!tokens[0].links(&complaint));
        for time_period in 2..=8 {
            assert!(tokens[0].links(&ticket_for(&credential, time_period)));
        }
        assert!(nm.tokens_create(&test::server_id(), &blacklist, &[], 1, 2).unwrap().is_none());
        assert!(nm.tokens_create(&test::server_id(), &blacklist, &[], 9, 1).unwrap().is_none());
        // a complaint from the future is skipped
        let tokens = nm.tokens_create(&test::server_id(), &blacklist, &[ticket_for(&credential, 3)], 2, 1).unwrap().unwrap();
        assert!(tokens.is_empty());

        let updated = nm.blacklist_update(&blacklist, &[], 1, 1).unwrap().unwrap();
        assert!(updated.entries().is_empty());
        let updated = nm.blacklist_update(&blacklist, &[complaint.clone()], 2, 1).unwrap().unwrap();
        assert_eq!(updated.time_period(), 2);
        assert!(updated.contains(complaint.nymble()));
        assert!(nm.blacklist_verify(&updated, &test::server_id(), 1));

        // entries carry forward, and don't duplicate
        let updated2 = nm.blacklist_update(&updated, &[complaint.clone()], 3, 1).unwrap().unwrap();
        assert_eq!(updated2.entries().len(), 1);
        assert!(updated2.contains(complaint.nymble()));

        assert!(nm.blacklist_update(&updated, &[], 1, 1).unwrap().is_none());
        assert!(nm.blacklist_update(&updated, &[], 9, 1).unwrap().is_none());
        assert!(nm.blacklist_update(&updated, &[], 3, 2).unwrap().is_none());
        let nm2 = NymbleManager::with_params(&test::hmac_key_np_other(), Params::new(8).unwrap()).unwrap();
        assert!(nm2.blacklist_update(&updated, &[], 3, 1).unwrap().is_none());
    }

    #[test]
    fn nm_encode_decode() {
        let (_, mut nm, server_key) = setup(4);
        nm.entry_update(&test::server_id(), 3);
        let ser = nm.serialize_binary().unwrap();
        let nm2 = NymbleManager::deserialize_binary(&ser).unwrap();
        assert_eq!(nm2.params(), nm.params());
        assert!(nm2.entry(&test::server_id()).unwrap().key() == &server_key);
        assert_eq!(nm2.entry(&test::server_id()).unwrap().time_period(), 3);
        assert_eq!(nm2.verify_key().unwrap(), nm.verify_key().unwrap());
    }
}
