//! Integration tests for signature hashing over explicit signing sessions

use covenant_tx::hash::{blake2b160, blake2b256};
use covenant_tx::sighash::{checksig, signature, signature_hash};
use covenant_tx::*;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

fn keypair(byte: u8) -> (SecretKey, [u8; 33]) {
    let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
    let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret).serialize();
    (secret, public)
}

fn draft() -> MutableTransaction {
    let mut tx = MutableTransaction::new();
    tx.add_input(Input::new(Outpoint::new([1; 32], 0)));
    tx.add_input(Input::new(Outpoint::new([2; 32], 1)));
    tx.add_output(Output::new(70_000, Address::from_pubkey(&[3; 33])));
    tx.add_output(Output::new(20_000, Address::from_pubkey(&[4; 33])));
    tx.locktime = 12;
    tx
}

#[test]
fn test_context_digests() {
    let tx = draft();
    let ctx = SighashContext::new(&tx);

    let mut prevouts = Vec::new();
    let mut sequences = Vec::new();
    for input in &tx.inputs {
        prevouts.extend_from_slice(&input.prevout.encode());
        sequences.extend_from_slice(&input.sequence.to_le_bytes());
    }
    let outputs: Vec<u8> = tx.outputs.iter().flat_map(|output| output.encode()).collect();

    assert_eq!(ctx.prevouts, blake2b256(&prevouts));
    assert_eq!(ctx.sequences, blake2b256(&sequences));
    assert_eq!(ctx.outputs, blake2b256(&outputs));
}

#[test]
fn test_preimage_layout() {
    let tx = draft();
    let ctx = SighashContext::new(&tx);
    let script = Script::from_pubkeyhash(&[9; 20]);

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&ctx.prevouts);
    preimage.extend_from_slice(&ctx.sequences);
    preimage.extend_from_slice(&[2; 32]);
    preimage.extend_from_slice(&1u32.to_le_bytes());
    preimage.push(25);
    preimage.extend_from_slice(script.encode());
    preimage.extend_from_slice(&55_000u64.to_le_bytes());
    preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    preimage.extend_from_slice(&ctx.outputs);
    preimage.extend_from_slice(&12u32.to_le_bytes());
    preimage.extend_from_slice(&1u32.to_le_bytes());

    assert_eq!(
        signature_hash(&tx, &ctx, 1, &script, 55_000, SighashType::ALL),
        blake2b256(&preimage)
    );
}

#[test]
fn test_session_signs_every_input() {
    let (secret, public) = keypair(0x11);
    let script = Script::from_pubkeyhash(&blake2b160(&public));
    let values = [60_000, 35_000];

    let mut tx = draft();
    let ctx = SighashContext::new(&tx);
    for (i, value) in values.iter().enumerate() {
        let sig = signature(&tx, &ctx, i, &script, *value, &secret, SighashType::ALL);
        tx.inputs[i].witness = Witness::from_items(vec![sig, public.to_vec()]);
    }

    // Witness data is outside the digests
    assert_eq!(SighashContext::new(&tx), ctx);

    let sealed = tx.finalize();
    for (i, value) in values.iter().enumerate() {
        let items = sealed.inputs[i].witness.items();
        assert!(checksig(&sealed, &ctx, i, &script, *value, &items[0], &items[1]));
        assert!(sealed.checksig(i, &script, *value, &items[0], &items[1]));
    }
}

#[test]
fn test_wrong_key_rejected() {
    let (secret, public) = keypair(0x11);
    let (_, other) = keypair(0x22);
    let script = Script::from_pubkeyhash(&blake2b160(&public));
    let tx = draft().finalize();

    let sig = tx.signature(0, &script, 1_000, &secret, SighashType::ALL);
    assert!(tx.checksig(0, &script, 1_000, &sig, &public));
    assert!(!tx.checksig(0, &script, 1_000, &sig, &other));
}

#[test]
fn test_script_is_committed() {
    let (secret, public) = keypair(0x11);
    let script = Script::from_pubkeyhash(&blake2b160(&public));
    let other = Script::from_pubkeyhash(&[0; 20]);
    let tx = draft().finalize();

    let sig = tx.signature(0, &script, 1_000, &secret, SighashType::ALL);
    assert!(!tx.checksig(0, &other, 1_000, &sig, &public));
}

#[test]
fn test_anyone_can_pay_signature_survives_new_inputs() {
    let (secret, public) = keypair(0x33);
    let script = Script::from_pubkeyhash(&blake2b160(&public));
    let ty = SighashType::ALL.with_anyone_can_pay();

    let mut tx = draft();
    let sig = tx.signature(0, &script, 5_000, &secret, ty);
    assert_eq!(sig[64], 0x81);

    tx.add_input(Input::new(Outpoint::new([7; 32], 7)));
    assert!(tx.checksig(0, &script, 5_000, &sig, &public));

    tx.outputs[0].value -= 1;
    assert!(!tx.checksig(0, &script, 5_000, &sig, &public));
}

#[test]
fn test_single_out_of_range_uses_zero_digest() {
    let mut tx = draft();
    tx.outputs.truncate(1);
    tx.add_input(Input::new(Outpoint::new([5; 32], 5)));
    let script = Script::from_pubkeyhash(&[1; 20]);

    let ctx = SighashContext::new(&tx);
    let hash = signature_hash(&tx, &ctx, 2, &script, 0, SighashType::SINGLE);

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&0u32.to_le_bytes());
    preimage.extend_from_slice(&ctx.prevouts);
    preimage.extend_from_slice(&ZERO_HASH);
    preimage.extend_from_slice(&[5; 32]);
    preimage.extend_from_slice(&5u32.to_le_bytes());
    preimage.push(25);
    preimage.extend_from_slice(script.encode());
    preimage.extend_from_slice(&0u64.to_le_bytes());
    preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    preimage.extend_from_slice(&ZERO_HASH);
    preimage.extend_from_slice(&12u32.to_le_bytes());
    preimage.extend_from_slice(&3u32.to_le_bytes());

    assert_eq!(hash, blake2b256(&preimage));
}

#[test]
fn test_singlereverse_out_of_range_uses_zero_digest() {
    let mut tx = draft();
    tx.outputs.truncate(1);
    tx.add_input(Input::new(Outpoint::new([5; 32], 5)));
    let script = Script::from_pubkeyhash(&[1; 20]);

    let ctx = SighashContext::new(&tx);
    let hash = signature_hash(&tx, &ctx, 2, &script, 0, SighashType::SINGLEREVERSE);

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&0u32.to_le_bytes());
    preimage.extend_from_slice(&ctx.prevouts);
    preimage.extend_from_slice(&ZERO_HASH);
    preimage.extend_from_slice(&[5; 32]);
    preimage.extend_from_slice(&5u32.to_le_bytes());
    preimage.push(25);
    preimage.extend_from_slice(script.encode());
    preimage.extend_from_slice(&0u64.to_le_bytes());
    preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    preimage.extend_from_slice(&ZERO_HASH);
    preimage.extend_from_slice(&12u32.to_le_bytes());
    preimage.extend_from_slice(&4u32.to_le_bytes());

    assert_eq!(hash, blake2b256(&preimage));
}
