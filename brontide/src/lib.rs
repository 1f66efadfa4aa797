#![deny(unsafe_code)]

//! # brontide
//!
//! An authenticated key exchange in three acts followed by a length-hiding
//! encrypted transport, with a fixed ciphersuite:
//! `Noise_XK_secp256k1_ChaChaPoly_SHA256`.
//!
//! The initiator must know the responder's static public key beforehand;
//! the responder learns (and authenticates) the initiator's static key in
//! act three.
//!
//! ```rust
//! use brontide::{KeyPair, Machine};
//! use rand_core::OsRng;
//!
//! let responder_kp = KeyPair::generate(&mut OsRng).unwrap();
//! let initiator_kp = KeyPair::generate(&mut OsRng).unwrap();
//!
//! let mut initiator = Machine::new(true, &initiator_kp, Some(responder_kp.public)).unwrap();
//! let mut responder = Machine::new(false, &responder_kp, None).unwrap();
//!
//! let act1 = initiator.gen_act_one().unwrap();
//! responder.recv_act_one(&act1).unwrap();
//! let act2 = responder.gen_act_two().unwrap();
//! initiator.recv_act_two(&act2).unwrap();
//! let act3 = initiator.gen_act_three().unwrap();
//! responder.recv_act_three(&act3).unwrap();
//!
//! let mut wire = Vec::new();
//! initiator.write_message(&mut wire, b"hello").unwrap();
//! assert_eq!(responder.read_message(&mut wire.as_slice()).unwrap(), b"hello");
//! ```
//!
//! ## Security Properties
//!
//! - Invalid and off-curve public key encodings are rejected
//! - Key material is zeroized on drop
//! - Every authentication failure is final for the machine or direction
//! - Nonce counters never wrap

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod transport;

mod cipher_state;
mod handshake_state;
mod machine;
mod symmetric_state;

// Re-export the primary public API
pub use config::{
    Builder, HandshakeConfig, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_PROLOGUE, PROTOCOL_NAME,
};
pub use error::Error;
pub use keys::{KeyPair, PublicKey, StaticSecret};
pub use machine::{Act, HandshakeAction, Machine, ACT_ONE_SIZE, ACT_THREE_SIZE, ACT_TWO_SIZE};
pub use transport::{TransportReceiver, TransportSender, TransportState, ENCRYPTED_HEADER_LEN};
