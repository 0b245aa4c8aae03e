use crate::hash::Hash;
use crate::keys::{Keypair, Signer};
use crate::pending::{PendingEntry, PendingQueue};
use crate::poh::{HashEntry, PohChain, PohRecorder};

/// Drives a recorder the way the node's generator does, without locks or threads.
fn run(
    recorder: &mut PohRecorder,
    chain: &mut PohChain,
    pending: &PendingQueue,
    signer: &dyn Signer,
    ticks: u64,
) {
    for _ in 0..ticks {
        let tick = if pending.has_unclaimed() {
            let id = chain.in_progress().sequence_id;
            match pending.claim_next(id) {
                Some((position, payload)) => {
                    let sig = signer.sign(&payload.data);
                    let t = recorder.tick_with(payload.data.clone(), sig);
                    chain.include(position, payload);
                    t
                }
                None => recorder.tick(),
            }
        } else {
            recorder.tick()
        };
        if let Some(entry) = tick.data_entry {
            chain.record(entry);
        }
        if let Some(cp) = tick.checkpoint {
            chain.record(cp);
        }
    }
}

#[test]
fn test_idle_run_records_only_checkpoints() {
    let kp = Keypair::from_seed(&[3u8; 32]).unwrap();
    let mut recorder = PohRecorder::new(PohRecorder::genesis_seed(&kp, 42), 100);
    let mut chain = PohChain::new(kp.public_key());
    chain.start(recorder.origin(), 0);
    let pending = PendingQueue::new();

    run(&mut recorder, &mut chain, &pending, &kp, 1000);

    assert_eq!(chain.len(), 11);
    let seqs: Vec<u64> = chain.entries().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (0..=10).map(|i| i * 100).collect::<Vec<_>>());
    assert_eq!(chain.data_entries().count(), 0);
    assert!(chain.in_progress().payload.is_empty());
}

#[test]
fn test_consecutive_checkpoints_rehash_exactly() {
    let mut recorder = PohRecorder::new(Hash::digest(&[b"seed"]), 7);
    let mut chain = PohChain::new([0u8; 32]);
    chain.start(recorder.origin(), 0);
    let kp = Keypair::generate();
    run(&mut recorder, &mut chain, &PendingQueue::new(), &kp, 70);

    for pair in chain.entries().windows(2) {
        let mut h = pair[0].hash;
        for _ in 0..(pair[1].seq - pair[0].seq) {
            h = h.rehash();
        }
        assert_eq!(h, pair[1].hash);
    }
}

#[test]
fn test_pending_entry_folded_once() {
    let kp = Keypair::generate();
    let mut recorder = PohRecorder::new(Hash::digest(&[b"seed"]), 50);
    let mut chain = PohChain::new(kp.public_key());
    chain.start(recorder.origin(), 2);
    let pending = PendingQueue::new();
    pending.push(PendingEntry::new(b"payload".to_vec(), vec![1; 32], vec![2; 32], vec![3; 64]));

    run(&mut recorder, &mut chain, &pending, &kp, 200);

    let data: Vec<&HashEntry> = chain.data_entries().collect();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].data.as_deref(), Some(&b"payload"[..]));
    assert_eq!(data[0].seq, 1);

    let taken = chain.take_block().unwrap();
    assert_eq!(taken.sequence_id, 2);
    assert_eq!(taken.payload.len(), 1);
    assert_eq!(taken.claimed, vec![0]);
    assert_eq!(pending.snapshot()[0].claimed_by_block, Some(2));
}

#[test]
fn test_resume_seed_chains_from_last_block_key() {
    let key = Hash::digest(&[b"block"]);
    let r = PohRecorder::new(PohRecorder::resume_seed(&key), 10);
    assert_eq!(r.origin().hash, key.rehash());
    assert_eq!(r.origin().seq, 0);
}
