// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Payload serialization.
//!
//! The queue never interprets item bytes; it hands them to a [`Codec`]. Any
//! codec works as long as `decode(encode(x)) == x` for every payload the
//! producers put.

use std::convert::Infallible;

use serde::{Serialize, de::DeserializeOwned};
use snafu::{Snafu, ensure};

/// Converts payloads to and from the bytes stored in item files.
pub trait Codec<T> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Serialize one payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be represented.
    fn encode(&self, item: &T) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the full contents of one item file.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid encoding of `T`.
    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error>;
}

/// JSON via `serde_json`. Human readable item files; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    type Error = serde_json::Error;

    fn encode(&self, item: &T) -> Result<Vec<u8>, Self::Error> { serde_json::to_vec(item) }

    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error> { serde_json::from_slice(bytes) }
}

#[derive(Snafu, Debug)]
pub enum BincodeError {
    #[snafu(display("bincode encode failed"))]
    BincodeEncode { source: bincode::error::EncodeError },

    #[snafu(display("bincode decode failed"))]
    BincodeDecode { source: bincode::error::DecodeError },

    #[snafu(display("{trailing} trailing bytes after payload"))]
    TrailingBytes { trailing: usize },
}

/// Compact binary encoding via bincode's serde adapter and standard config.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for BincodeCodec {
    type Error = BincodeError;

    fn encode(&self, item: &T) -> Result<Vec<u8>, Self::Error> {
        bincode::serde::encode_to_vec(item, bincode::config::standard())
            .map_err(|source| BincodeError::BincodeEncode { source })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error> {
        let (item, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|source| BincodeError::BincodeDecode { source })?;
        ensure!(
            read == bytes.len(),
            TrailingBytesSnafu {
                trailing: bytes.len() - read,
            }
        );
        Ok(item)
    }
}

/// Stores byte payloads as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Vec<u8>> for RawCodec {
    type Error = Infallible;

    fn encode(&self, item: &Vec<u8>) -> Result<Vec<u8>, Self::Error> { Ok(item.clone()) }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, Self::Error> { Ok(bytes.to_vec()) }
}
