//! Protocol-wide parameters. Every role in a deployment must agree on these,
//! so they're usually loaded once from a shared config file and handed to the
//! nymble manager and to users.

use crate::error::{Error, Result};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};
use serde_derive::{Deserialize, Serialize};

/// The default number of time periods in a link window. With five-minute time
/// periods this makes a link window one day long.
pub const DEFAULT_LINK_WINDOW_LENGTH: u32 = 288;

/// The largest link window we accept. Credentials carry one authenticator per
/// time period, so `L` bounds their size.
pub const MAX_LINK_WINDOW_LENGTH: u32 = 65536;

/// Parameters shared by all roles.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, Serialize, Deserialize, getset::CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Params {
    /// The number of time periods (`L`) in each link window. Time periods
    /// inside a window run from `1` to `L` inclusive.
    #[rasn(tag(explicit(0)))]
    #[serde(default = "default_link_window_length")]
    link_window_length: u32,
}

fn default_link_window_length() -> u32 {
    DEFAULT_LINK_WINDOW_LENGTH
}

impl Params {
    /// Create a new set of params.
    pub fn new(link_window_length: u32) -> Result<Self> {
        let params = Self { link_window_length };
        params.validate()?;
        Ok(params)
    }

    /// Load params from a YAML document, for instance:
    ///
    /// ```yaml
    /// link_window_length: 288
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let params: Self = serde_yaml::from_str(yaml)?;
        params.validate()?;
        Ok(params)
    }

    /// Make sure these params are usable.
    pub fn validate(&self) -> Result<()> {
        if self.link_window_length == 0 {
            Err(Error::ConfigInvalid(String::from("link_window_length must be at least 1")))?;
        }
        if self.link_window_length > MAX_LINK_WINDOW_LENGTH {
            Err(Error::ConfigInvalid(format!("link_window_length must be at most {}", MAX_LINK_WINDOW_LENGTH)))?;
        }
        Ok(())
    }

    /// Whether the given time period falls inside a link window.
    pub fn contains_time_period(&self, time_period: u32) -> bool {
        time_period >= 1 && time_period <= self.link_window_length
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            link_window_length: DEFAULT_LINK_WINDOW_LENGTH,
        }
    }
}
