use chrono::Utc;
use tempfile::tempdir;
use tickledger_kernel::block::{BlockRecord, TxPayload};
use tickledger_kernel::Hash;
use tickledger_node::store::{BlockStore, MismatchKind, StoreError};

fn payload(tag: &str) -> Vec<TxPayload> {
    vec![TxPayload::new(tag.as_bytes().to_vec(), vec![1; 32], vec![2; 32], vec![3; 64])]
}

fn fill(store: &mut BlockStore, n: usize) {
    for i in 0..n {
        let rec = BlockRecord::seal(
            store.tip_hash(),
            store.next_sequence_id(),
            Utc::now(),
            payload(&format!("block-{i}")),
        )
        .unwrap();
        store.append(rec).unwrap();
    }
}

#[test]
fn test_reopen_reproduces_records_byte_for_byte() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.jsonl");

    let written: Vec<BlockRecord> = {
        let mut store = BlockStore::open(&path).unwrap();
        fill(&mut store, 4);
        store.blocks_from(0).to_vec()
    };
    let on_disk = std::fs::read_to_string(&path).unwrap();

    let store = BlockStore::open(&path).unwrap();
    assert_eq!(store.blocks_from(0), written.as_slice());

    let reencoded: String = store
        .blocks_from(0)
        .iter()
        .map(|r| serde_json::to_string(r).unwrap() + "\n")
        .collect();
    assert_eq!(reencoded, on_disk);
}

#[test]
fn test_empty_store_conventions() {
    let dir = tempdir().unwrap();
    let store = BlockStore::open(dir.path().join("db.jsonl")).unwrap();
    assert!(store.latest().is_none());
    assert_eq!(store.tip_hash(), Hash::ZERO);
    assert_eq!(store.next_sequence_id(), 0);
    assert_eq!(store.find_descendant(&Hash::ZERO), None);
    assert!(store.verify().unwrap().is_valid());
}

#[test]
fn test_chain_links_hold_after_appends() {
    let dir = tempdir().unwrap();
    let mut store = BlockStore::open(dir.path().join("db.jsonl")).unwrap();
    fill(&mut store, 6);

    let blocks = store.blocks_from(0);
    assert_eq!(*blocks[0].parent(), Hash::ZERO);
    for i in 1..blocks.len() {
        let prev = &blocks[i - 1];
        let expected = Hash::digest(&[
            prev.hash.as_bytes(),
            &serde_json::to_vec(&blocks[i].block.payload).unwrap(),
        ]);
        assert_eq!(blocks[i].hash, expected);
        assert_eq!(*blocks[i].parent(), prev.hash);
        assert_eq!(blocks[i].seqid(), i as u64);
    }
}

#[test]
fn test_find_descendant_distinguishes_first_block_from_missing() {
    let dir = tempdir().unwrap();
    let mut store = BlockStore::open(dir.path().join("db.jsonl")).unwrap();
    fill(&mut store, 3);

    assert_eq!(store.find_descendant(&Hash::ZERO), Some(0));
    let second = store.get(1).unwrap().hash;
    assert_eq!(store.find_descendant(&second), Some(2));
    assert_eq!(store.find_descendant(&store.tip_hash()), None);
    assert_eq!(store.find_descendant(&Hash::digest(&[b"unknown"])), None);
}

#[test]
fn test_append_rejects_non_extending_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.jsonl");
    let mut store = BlockStore::open(&path).unwrap();
    fill(&mut store, 2);

    let wrong_parent = BlockRecord::seal(Hash::ZERO, 2, Utc::now(), payload("x")).unwrap();
    assert!(matches!(store.append(wrong_parent), Err(StoreError::Discontinuity { .. })));

    let wrong_seq = BlockRecord::seal(store.tip_hash(), 7, Utc::now(), payload("x")).unwrap();
    assert!(matches!(store.append(wrong_seq), Err(StoreError::Discontinuity { .. })));

    let mut forged = BlockRecord::seal(store.tip_hash(), 2, Utc::now(), payload("x")).unwrap();
    forged.hash = Hash::digest(&[b"forged"]);
    assert!(matches!(store.append(forged), Err(StoreError::Discontinuity { .. })));

    assert_eq!(store.len(), 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
}

#[test]
fn test_verify_reports_tampered_index_repeatably() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.jsonl");
    {
        let mut store = BlockStore::open(&path).unwrap();
        fill(&mut store, 5);
    }

    // Rewrite block 2's payload on disk without touching its key.
    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    let mut rec: BlockRecord = serde_json::from_str(&lines[2]).unwrap();
    rec.block.payload[0].data = b"tampered".to_vec();
    lines[2] = serde_json::to_string(&rec).unwrap();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let store = BlockStore::open(&path).unwrap();
    let first = store.verify().unwrap();
    let second = store.verify().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.indices(), vec![2]);
    assert_eq!(first.mismatches[0].kind, MismatchKind::KeyMismatch);
    assert_eq!(first.checked, 5);
}

#[test]
fn test_unparsable_line_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.jsonl");
    {
        let mut store = BlockStore::open(&path).unwrap();
        fill(&mut store, 2);
    }
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("{\"hash\": 12}\n");
    std::fs::write(&path, text).unwrap();

    match BlockStore::open(&path) {
        Err(StoreError::Parse { line, .. }) => assert_eq!(line, 3),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("garbage line accepted"),
    }
}
