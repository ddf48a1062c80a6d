//! Serialisation formats for request, response, and spec bodies.
//!
//! Two codecs are supported: a compact binary encoding (MessagePack with
//! struct-as-map framing, so field names travel with the data) and textual
//! JSON using the structs' snake_case field names. Unknown format strings
//! are rejected at flag parsing; within the crate a [`Format`] value is
//! always valid.

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Error;

/// Serialisation mechanism for the bodies that cross the process boundary.
///
/// # Example
///
/// ```
/// use std::str::FromStr;
///
/// use execrpc::Format;
///
/// assert_eq!(Format::default(), Format::Binary);
/// assert_eq!(Format::from_str("json").expect("parses"), Format::Json);
/// assert_eq!(Format::Binary.to_string(), "binary");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Format {
    /// Compact binary encoding.
    #[default]
    Binary,
    /// Textual JSON encoding with snake_case field names.
    Json,
}

impl Format {
    /// Encodes a message in this format.
    pub(crate) fn marshal<T: Serialize>(
        self,
        what: &'static str,
        value: &T,
    ) -> Result<Vec<u8>, Error> {
        match self {
            Self::Binary => rmp_serde::to_vec_named(value).map_err(|err| Error::Serialize {
                what,
                message: err.to_string(),
            }),
            Self::Json => serde_json::to_vec(value).map_err(|err| Error::Serialize {
                what,
                message: err.to_string(),
            }),
        }
    }

    /// Decodes a message in this format.
    pub(crate) fn unmarshal<T: DeserializeOwned>(
        self,
        what: &'static str,
        data: &[u8],
    ) -> Result<T, Error> {
        match self {
            Self::Binary => rmp_serde::from_slice(data).map_err(|err| Error::Deserialize {
                what,
                message: err.to_string(),
            }),
            Self::Json => serde_json::from_slice(data).map_err(|err| Error::Deserialize {
                what,
                message: err.to_string(),
            }),
        }
    }
}
