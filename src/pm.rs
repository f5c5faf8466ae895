//! The pseudonym manager (PM).
//!
//! The PM is the only party that ever sees a user's real identity. It turns
//! that identity into a pseudonym for one link window, plus a MAC over the
//! pseudonym that the nymble manager (which shares the PM's key) can check
//! without learning who the user is.

use crate::{
    crypto::base::{Hmac, HmacKey},
    error::{Error, Result},
    ids::{LinkWindow, Pseudonym},
    util::ser::BinarySecret,
};

/// HKDF label for the key that turns user ids into pseudonyms.
const INFO_PSEUDONYM: &[u8] = b"nymble/pm/pseudonym";
/// HKDF label for the key that MACs pseudonyms. The NM derives this too.
const INFO_PSEUDONYM_MAC: &[u8] = b"nymble/np/mac";

/// Validate a PM/NM root key. It must be exactly one digest long.
pub(crate) fn root_key(key: &[u8]) -> Result<BinarySecret<32>> {
    BinarySecret::try_from_slice(key)
}

/// Derive the key both the PM and the NM use to MAC pseudonyms.
pub(crate) fn pseudonym_mac_key(root: &BinarySecret<32>) -> Result<HmacKey> {
    HmacKey::derive(root.expose_secret(), INFO_PSEUDONYM_MAC)
}

/// What the pseudonym MAC covers: the pseudonym, then the link window.
pub(crate) fn pseudonym_mac_message(pseudonym: &Pseudonym, link_window: LinkWindow) -> Vec<u8> {
    let mut msg = Vec::with_capacity(pseudonym.len() + 4);
    msg.extend_from_slice(&pseudonym[..]);
    msg.extend_from_slice(&link_window.to_be_bytes());
    msg
}

/// Holds the PM's keys.
#[derive(Debug, Clone)]
pub struct PseudonymManager {
    prf_key: HmacKey,
    mac_key: HmacKey,
}

impl PseudonymManager {
    /// Create a PM from its long-term key, which must be exactly
    /// [`DIGEST_LEN`](crate::crypto::base::DIGEST_LEN) bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        let root = root_key(key)?;
        Ok(Self {
            prf_key: HmacKey::derive(root.expose_secret(), INFO_PSEUDONYM)?,
            mac_key: pseudonym_mac_key(&root)?,
        })
    }

    /// Create a pseudonym (and its MAC) for a user in a link window.
    ///
    /// This is a pure function of the PM key, the user id, and the link window:
    /// the same inputs always give back the same pseudonym, so users can come
    /// back and re-derive theirs at any time.
    pub fn pseudonym_create(&self, user_id: &[u8], link_window: LinkWindow) -> Result<(Pseudonym, Hmac)> {
        if user_id.is_empty() {
            Err(Error::IdentifierEmpty)?;
        }
        if link_window == 0 {
            Err(Error::LinkWindowInvalid)?;
        }
        let mut msg = Vec::with_capacity(user_id.len() + 4);
        msg.extend_from_slice(user_id);
        msg.extend_from_slice(&link_window.to_be_bytes());
        let pseudonym = Pseudonym::try_from_slice(&Hmac::new(&self.prf_key, &msg)?)?;
        let mac = Hmac::new(&self.mac_key, &pseudonym_mac_message(&pseudonym, link_window))?;
        Ok((pseudonym, mac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test;

    #[test]
    fn pm_new() {
        PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let mut doubled = test::hmac_key_np();
        doubled.extend(test::hmac_key_np());
        assert!(matches!(PseudonymManager::new(&doubled), Err(Error::BadLength)));
        assert!(matches!(PseudonymManager::new(b""), Err(Error::BadLength)));
    }

    #[test]
    fn pm_pseudonym_create_is_deterministic() {
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let (nym1, mac1) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        let (nym2, mac2) = pm.pseudonym_create(&test::user_id(), 1).unwrap();
        assert_eq!(nym1, nym2);
        assert_eq!(mac1, mac2);

        // a second PM with the same key agrees
        let pm2 = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let (nym3, mac3) = pm2.pseudonym_create(&test::user_id(), 1).unwrap();
        assert_eq!(nym1, nym3);
        assert_eq!(mac1, mac3);
    }

    #[test]
    fn pm_pseudonym_create_is_sensitive() {
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        let (nym, mac) = pm.pseudonym_create(&test::user_id(), 1).unwrap();

        let mut user_id_rev = test::user_id();
        user_id_rev.reverse();
        let (nym_user, mac_user) = pm.pseudonym_create(&user_id_rev, 1).unwrap();
        assert_ne!(nym, nym_user);
        assert_ne!(mac, mac_user);

        let (nym_w, mac_w) = pm.pseudonym_create(&test::user_id(), 2).unwrap();
        assert_ne!(nym, nym_w);
        assert_ne!(mac, mac_w);

        let mut key_rev = test::hmac_key_np();
        key_rev.reverse();
        let pm_rev = PseudonymManager::new(&key_rev).unwrap();
        let (nym_key, mac_key) = pm_rev.pseudonym_create(&test::user_id(), 1).unwrap();
        assert_ne!(nym, nym_key);
        assert_ne!(mac, mac_key);
    }

    #[test]
    fn pm_pseudonym_create_rejects_bad_input() {
        let pm = PseudonymManager::new(&test::hmac_key_np()).unwrap();
        assert!(matches!(pm.pseudonym_create(b"", 1), Err(Error::IdentifierEmpty)));
        assert!(matches!(pm.pseudonym_create(&test::user_id(), 0), Err(Error::LinkWindowInvalid)));
    }
}
