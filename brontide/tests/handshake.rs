//! Integration tests for the three-act handshake.

use brontide::{
    Act, Builder, Error, HandshakeAction, KeyPair, Machine, ACT_ONE_SIZE, ACT_THREE_SIZE,
    ACT_TWO_SIZE,
};
use rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn keypair(seed: u64) -> KeyPair {
    KeyPair::generate(&mut StdRng::seed_from_u64(seed)).unwrap()
}

struct Peers {
    initiator: Machine,
    responder: Machine,
    initiator_kp: KeyPair,
}

fn peers() -> Peers {
    let initiator_kp = keypair(100);
    let responder_kp = keypair(200);
    Peers {
        initiator: Machine::new(true, &initiator_kp, Some(responder_kp.public)).unwrap(),
        responder: Machine::new(false, &responder_kp, None).unwrap(),
        initiator_kp,
    }
}

fn flip(bytes: &mut [u8], bit: usize) {
    bytes[bit / 8] ^= 1 << (bit % 8);
}

// ===========================================================================
// Happy path
// ===========================================================================

#[test]
fn end_to_end_hello() {
    let Peers {
        mut initiator,
        mut responder,
        initiator_kp,
    } = peers();

    let act1 = initiator.gen_act_one().unwrap();
    assert_eq!(act1.len(), 49);
    responder.recv_act_one(&act1).unwrap();

    let act2 = responder.gen_act_two().unwrap();
    assert_eq!(act2.len(), 49);
    initiator.recv_act_two(&act2).unwrap();

    let act3 = initiator.gen_act_three().unwrap();
    assert_eq!(act3.len(), 65);
    responder.recv_act_three(&act3).unwrap();

    assert!(initiator.is_complete());
    assert!(responder.is_complete());
    assert_eq!(responder.remote_static(), Some(initiator_kp.public));
    assert_eq!(initiator.handshake_hash(), responder.handshake_hash());

    let mut wire = Vec::new();
    initiator.write_message(&mut wire, b"hello").unwrap();
    assert_eq!(wire.len(), 24 + 5 + 16);
    assert_eq!(responder.read_message(&mut wire.as_slice()).unwrap(), b"hello");
}

#[test]
fn static_keypair_is_reusable_across_connections() {
    let responder_kp = keypair(1);
    let initiator_kp = keypair(2);

    let mut hashes = Vec::new();
    for _ in 0..2 {
        let mut i = Machine::new(true, &initiator_kp, Some(responder_kp.public)).unwrap();
        let mut r = Machine::new(false, &responder_kp, None).unwrap();
        let act1 = i.gen_act_one().unwrap();
        r.recv_act_one(&act1).unwrap();
        let act2 = r.gen_act_two().unwrap();
        i.recv_act_two(&act2).unwrap();
        let act3 = i.gen_act_three().unwrap();
        r.recv_act_three(&act3).unwrap();
        hashes.push(*i.handshake_hash().unwrap());
    }
    // Fresh ephemerals every time.
    assert_ne!(hashes[0], hashes[1]);
}

#[test]
fn custom_prologue_on_both_sides() {
    let responder_kp = keypair(1);
    let mut i = Builder::new(keypair(2))
        .with_remote_public(responder_kp.public)
        .with_prologue(b"regtest")
        .build_initiator()
        .unwrap();
    let mut r = Builder::new(responder_kp)
        .with_prologue(b"regtest")
        .build_responder()
        .unwrap();

    let act1 = i.gen_act_one().unwrap();
    r.recv_act_one(&act1).unwrap();
    let act2 = r.gen_act_two().unwrap();
    i.recv_act_two(&act2).unwrap();
    let act3 = i.gen_act_three().unwrap();
    r.recv_act_three(&act3).unwrap();
    assert_eq!(r.next_action(), HandshakeAction::Transport);
}

// ===========================================================================
// Rejection
// ===========================================================================

#[test]
fn wrong_responder_key_fails_act_one() {
    let responder_kp = keypair(1);
    let impostor = keypair(3);
    let mut i = Machine::new(true, &keypair(2), Some(impostor.public)).unwrap();
    let mut r = Machine::new(false, &responder_kp, None).unwrap();

    let act1 = i.gen_act_one().unwrap();
    assert!(matches!(
        r.recv_act_one(&act1),
        Err(Error::AuthenticationFailure)
    ));
    assert_eq!(r.next_action(), HandshakeAction::Failed);
}

#[test]
fn prologue_mismatch_fails_act_one() {
    let responder_kp = keypair(1);
    let mut i = Builder::new(keypair(2))
        .with_remote_public(responder_kp.public)
        .with_prologue(b"mainnet")
        .build_initiator()
        .unwrap();
    let mut r = Builder::new(responder_kp)
        .with_prologue(b"testnet")
        .build_responder()
        .unwrap();

    let act1 = i.gen_act_one().unwrap();
    assert!(matches!(
        r.recv_act_one(&act1),
        Err(Error::AuthenticationFailure)
    ));
}

#[test]
fn protocol_name_mismatch_fails_act_one() {
    let responder_kp = keypair(1);
    let mut i = Builder::new(keypair(2))
        .with_remote_public(responder_kp.public)
        .with_protocol_name(b"Noise_XK_secp256k1_AESGCM_SHA256")
        .build_initiator()
        .unwrap();
    let mut r = Machine::new(false, &responder_kp, None).unwrap();

    let act1 = i.gen_act_one().unwrap();
    assert!(matches!(
        r.recv_act_one(&act1),
        Err(Error::AuthenticationFailure)
    ));
}

#[test]
fn invalid_ephemeral_encoding_is_rejected() {
    let Peers { mut responder, .. } = peers();
    let mut act1 = [0u8; ACT_ONE_SIZE];
    act1[0] = 0x07;
    assert!(matches!(
        responder.recv_act_one(&act1),
        Err(Error::InvalidKeyEncoding)
    ));
    assert_eq!(responder.next_action(), HandshakeAction::Failed);
}

#[test]
fn every_bit_of_act_one_is_authenticated() {
    let reference = {
        let Peers { mut initiator, .. } = peers();
        initiator
            .gen_act_one_with_rng(&mut StdRng::seed_from_u64(7))
            .unwrap()
    };
    for bit in 0..ACT_ONE_SIZE * 8 {
        let Peers { mut responder, .. } = peers();
        let mut act1 = reference;
        flip(&mut act1, bit);
        let result = responder.recv_act_one(&act1);
        assert!(
            matches!(
                result,
                Err(Error::AuthenticationFailure) | Err(Error::InvalidKeyEncoding)
            ),
            "bit {bit} flip went unnoticed"
        );
    }
}

#[test]
fn every_bit_of_act_two_is_authenticated() {
    for bit in 0..ACT_TWO_SIZE * 8 {
        let Peers {
            mut initiator,
            mut responder,
            ..
        } = peers();
        let act1 = initiator.gen_act_one().unwrap();
        responder.recv_act_one(&act1).unwrap();
        let mut act2 = responder.gen_act_two().unwrap();
        flip(&mut act2, bit);
        let result = initiator.recv_act_two(&act2);
        assert!(
            matches!(
                result,
                Err(Error::AuthenticationFailure) | Err(Error::InvalidKeyEncoding)
            ),
            "bit {bit} flip went unnoticed"
        );
        assert_eq!(initiator.next_action(), HandshakeAction::Failed);
    }
}

#[test]
fn every_bit_of_act_three_is_authenticated() {
    for bit in 0..ACT_THREE_SIZE * 8 {
        let Peers {
            mut initiator,
            mut responder,
            ..
        } = peers();
        let act1 = initiator.gen_act_one().unwrap();
        responder.recv_act_one(&act1).unwrap();
        let act2 = responder.gen_act_two().unwrap();
        initiator.recv_act_two(&act2).unwrap();
        let mut act3 = initiator.gen_act_three().unwrap();
        flip(&mut act3, bit);
        assert!(
            matches!(
                responder.recv_act_three(&act3),
                Err(Error::AuthenticationFailure)
            ),
            "bit {bit} flip went unnoticed"
        );
        assert_eq!(responder.remote_static(), None);
    }
}

#[test]
fn replayed_act_two_from_another_session_fails() {
    let Peers {
        mut initiator,
        mut responder,
        ..
    } = peers();
    let act1 = initiator.gen_act_one().unwrap();
    responder.recv_act_one(&act1).unwrap();
    let stale_act2 = responder.gen_act_two().unwrap();

    let Peers {
        initiator: mut fresh, ..
    } = peers();
    fresh.gen_act_one().unwrap();
    assert!(matches!(
        fresh.recv_act_two(&stale_act2),
        Err(Error::AuthenticationFailure)
    ));
}

#[test]
fn acts_out_of_order_are_wrong_state() {
    let Peers {
        mut initiator,
        mut responder,
        ..
    } = peers();
    assert_eq!(initiator.next_action(), HandshakeAction::GenAct(Act::One));
    assert!(matches!(
        initiator.recv_act_two(&[0u8; ACT_TWO_SIZE]),
        Err(Error::WrongState)
    ));
    assert!(matches!(
        responder.recv_act_three(&[0u8; ACT_THREE_SIZE]),
        Err(Error::WrongState)
    ));
    assert!(matches!(responder.gen_act_one(), Err(Error::WrongState)));

    // Rejected calls leave both machines usable.
    let act1 = initiator.gen_act_one().unwrap();
    responder.recv_act_one(&act1).unwrap();
}

#[test]
fn deterministic_given_identical_ephemerals() {
    let run = || {
        let Peers {
            mut initiator,
            mut responder,
            ..
        } = peers();
        let act1 = initiator
            .gen_act_one_with_rng(&mut StdRng::seed_from_u64(11))
            .unwrap();
        responder.recv_act_one(&act1).unwrap();
        let act2 = responder
            .gen_act_two_with_rng(&mut StdRng::seed_from_u64(22))
            .unwrap();
        initiator.recv_act_two(&act2).unwrap();
        let act3 = initiator.gen_act_three().unwrap();
        responder.recv_act_three(&act3).unwrap();

        let mut frame = Vec::new();
        initiator.write_message(&mut frame, b"same").unwrap();
        (act1, act2, act3, *initiator.handshake_hash().unwrap(), frame)
    };
    assert_eq!(run(), run());
}

// ===========================================================================
// Known answers
// ===========================================================================

/// Yields the same byte forever, pinning an ephemeral scalar.
struct RepeatedByte(u8);

impl RngCore for RepeatedByte {
    fn next_u32(&mut self) -> u32 {
        u32::from_ne_bytes([self.0; 4])
    }

    fn next_u64(&mut self) -> u64 {
        u64::from_ne_bytes([self.0; 8])
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(self.0);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for RepeatedByte {}

#[test]
fn known_answer_handshake_and_first_frames() {
    let initiator_kp = KeyPair::from_secret_bytes([0x11; 32]).unwrap();
    let responder_kp = KeyPair::from_secret_bytes([0x21; 32]).unwrap();
    assert_eq!(
        hex::encode(initiator_kp.public.serialize()),
        "034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa"
    );
    assert_eq!(
        hex::encode(responder_kp.public.serialize()),
        "028d7500dd4c12685d1f568b4c2b5048e8534b873319f3a8daa612b469132ec7f7"
    );

    let mut initiator = Machine::new(true, &initiator_kp, Some(responder_kp.public)).unwrap();
    let mut responder = Machine::new(false, &responder_kp, None).unwrap();

    let act1 = initiator
        .gen_act_one_with_rng(&mut RepeatedByte(0x12))
        .unwrap();
    assert_eq!(
        hex::encode(act1),
        "036360e856310ce5d294e8be33fc807077dc56ac80d95d9cd4ddbd21325eff73f7\
         923f938c17bf34613f681aa87d21a487"
    );
    responder.recv_act_one(&act1).unwrap();

    let act2 = responder
        .gen_act_two_with_rng(&mut RepeatedByte(0x22))
        .unwrap();
    assert_eq!(
        hex::encode(act2),
        "02466d7fcae563e5cb09a0d1870bb580344804617879a14949cf22285f1bae3f27\
         0cc3583b6d6819c1e14089e810d4f234"
    );
    initiator.recv_act_two(&act2).unwrap();

    let act3 = initiator.gen_act_three().unwrap();
    assert_eq!(
        hex::encode(act3),
        "cba0b23301043cba8161fcf9d859cbe448999c72aa5af7e27b4b935d3f29c8381f\
         089140c11c27d27d7d446229944d9e91cc84ef01e1bd60b4418eb7bcb8841fcc"
    );
    responder.recv_act_three(&act3).unwrap();

    let expected_hash = "ad037972c66d783aa55e4bbe524bca21e529037a4c17946f89a21b7175089e8c";
    assert_eq!(hex::encode(initiator.handshake_hash().unwrap()), expected_hash);
    assert_eq!(hex::encode(responder.handshake_hash().unwrap()), expected_hash);

    let mut wire = Vec::new();
    initiator.write_message(&mut wire, b"hello").unwrap();
    assert_eq!(
        hex::encode(&wire),
        "b6c6d1033867cf7004f25d30c643f70804b5c050aee7c82d4423111f7ea50b3c\
         bfee2b13eb5418f32b804388b7"
    );
    assert_eq!(responder.read_message(&mut wire.as_slice()).unwrap(), b"hello");

    let mut wire = Vec::new();
    responder.write_message(&mut wire, b"hello").unwrap();
    assert_eq!(
        hex::encode(&wire),
        "2b33c613deb1adde4673a80e4f2153a5dc81b0ce4a9cb5b6d4b103b82f420251\
         9648d40ae7361751badc61b1cd"
    );
    assert_eq!(initiator.read_message(&mut wire.as_slice()).unwrap(), b"hello");
}
