//! Integration tests: end-to-end behaviour across blocks, views, the
//! handle table and packed string collections.

use memblob::prelude::*;
use memblob_test_utils::{collection_of, filled_block, lettered, lettered_block, SAMPLE_ENTRIES};

// ── Blocks ───────────────────────────────────────────────────────────

#[test]
fn every_strategy_grants_at_least_the_request() {
    for strategy in AllocStrategy::ALL {
        for size in [1, 7, 4096, 4097, 100_000] {
            let block = MemoryBlock::allocate(strategy, size).unwrap();
            assert!(block.size() >= size, "{strategy} granted {}", block.size());
            assert_eq!(block.strategy(), Some(strategy));
            assert!(block.as_slice().iter().all(|&b| b == 0));
        }
    }
}

#[test]
fn free_is_idempotent_for_every_strategy() {
    for strategy in AllocStrategy::ALL {
        let mut block = MemoryBlock::allocate(strategy, 64).unwrap();
        assert!(block.free());
        assert!(!block.free());
        assert_eq!(block.size(), 0);
        assert_eq!(block.address(), 0);
        assert_eq!(block.strategy(), None);
    }
}

#[test]
fn aligned_alloc_meets_alignment() {
    let mut block = MemoryBlock::new();
    block.aligned_alloc(1000, 64).unwrap();
    assert_eq!(block.address() % 64, 0);
    assert_eq!(block.size(), 1000);
    assert!(block.validate());

    block.resize(5000).unwrap();
    assert_eq!(block.address() % 64, 0);
    assert_eq!(block.strategy(), Some(AllocStrategy::Aligned));
    assert!(block.aligned_free().unwrap());
}

#[test]
fn mismatched_release_leaves_block_intact() {
    let mut block = filled_block(AllocStrategy::Network, 32, 0x11);
    assert_eq!(
        block.virtual_free(),
        Err(BlockError::StrategyMismatch {
            expected: AllocStrategy::Virtual,
            actual: AllocStrategy::Network,
        })
    );
    assert_eq!(block.size(), 32);
    assert!(block.as_slice().iter().all(|&b| b == 0x11));
    assert_eq!(block.net_free(), Ok(true));
}

#[test]
fn push_out_moves_tail_and_zeroes_gap() {
    let mut block = lettered_block(10);
    block.push_out(4, 6).unwrap();
    assert_eq!(block.size(), 16);
    assert_eq!(&block.as_slice()[..4], b"ABCD");
    assert_eq!(&block.as_slice()[4..10], &[0u8; 6]);
    assert_eq!(&block.as_slice()[10..], b"EFGHIJ");
}

#[test]
fn shifting_survives_a_strategy_without_in_place_resize() {
    let mut block = MemoryBlock::allocate(AllocStrategy::Network, 10).unwrap();
    block.as_mut_slice().copy_from_slice(&lettered(10));
    block.insert_bytes(5, b"--").unwrap();
    assert_eq!(block.as_slice(), b"ABCDE--FGHIJ");
    assert_eq!(block.strategy(), Some(AllocStrategy::Network));
    block.delete_bytes(0, 5).unwrap();
    assert_eq!(block.as_slice(), b"--FGHIJ");
}

#[test]
fn take_transfers_ownership() {
    let mut block = lettered_block(4);
    let moved = block.take();
    assert!(block.is_empty());
    assert_eq!(moved.as_slice(), b"ABCD");
}

// ── Views ────────────────────────────────────────────────────────────

#[test]
fn views_read_what_the_block_wrote() {
    let mut block = MemoryBlock::allocate(AllocStrategy::ComTask, 64).unwrap();
    let guid = Guid::new(0x0123_4567, 0x89AB, 0xCDEF, [1, 2, 3, 4, 5, 6, 7, 8]);
    block.set_at_absolute(0, guid);
    block.set_at_absolute(16, Timestamp(Timestamp::UNIX_EPOCH_TICKS));
    block.set_string(24, "héllo");

    let view = block.view();
    assert_eq!(view.get_at_absolute::<Guid>(0), guid);
    assert_eq!(view.get_at::<Timestamp>(2).0, Timestamp::UNIX_EPOCH_TICKS);
    assert_eq!(view.get_string(24), "héllo");
    assert_eq!(view.string_len(24), 5);
    assert_eq!(view.to_bytes(60, 100).len(), 4);
}

#[test]
fn mutable_view_writes_through() {
    let mut block = MemoryBlock::allocate(AllocStrategy::ProcessHeap, 16).unwrap();
    {
        let mut view = block.view_mut();
        view.set_at::<u16>(3, 0xBEEF);
        view.zero(..6);
    }
    assert_eq!(block.get_at::<u16>(3), 0xBEEF);
    assert_eq!(block.to_vec_of::<u16>(0, 100).len(), 8);
}

// ── Handle table ─────────────────────────────────────────────────────

#[test]
fn stale_handles_never_resolve() {
    let mut table = BlockTable::new();
    let first = table.alloc(AllocStrategy::ProcessHeap, 8).unwrap();
    table.free(first).unwrap();
    let second = table.alloc(AllocStrategy::ProcessHeap, 8).unwrap();
    assert_eq!(first.slot(), second.slot());
    assert_ne!(first, second);
    assert_eq!(
        table.read::<u8>(first, 0),
        Err(BlockError::InvalidHandle { handle: first })
    );
    assert_eq!(table.read::<u8>(second, 0), Ok(0));
}

#[test]
fn table_rejects_out_of_range_access() {
    let mut table = BlockTable::new();
    let h = table.alloc(AllocStrategy::Virtual, 100).unwrap();
    let size = table.size(h).unwrap();
    assert!(table.write::<u32>(h, size - 4, 1).is_ok());
    assert!(matches!(
        table.write::<u32>(h, size - 3, 1),
        Err(BlockError::OutOfBounds { .. })
    ));
}

// ── Collections ──────────────────────────────────────────────────────

#[test]
fn length_prefixed_scenario() {
    let mut names = PackedStringCollection::new();
    names.add_range(["ab", "xyz"]).unwrap();
    assert_eq!(names.count(), 2);
    names.insert_at(1, "Q").unwrap();
    assert_eq!(names.to_vec().unwrap(), ["ab", "Q", "xyz"]);
    names.remove_at(0).unwrap();
    assert_eq!(names.to_vec().unwrap(), ["Q", "xyz"]);
}

#[test]
fn collection_bytes_follow_the_wire_layout() {
    let names = collection_of(Framing::LengthPrefixed(DescriptorWidth::U16), &["hi", "a"]);
    let block = names.into_block();
    assert_eq!(block.get_at_absolute::<u16>(0), 2);
    assert_eq!(block.get_at_absolute::<u16>(2), 2);
    assert_eq!(block.to_chars(4, 2), "hi".encode_utf16().collect::<Vec<_>>());
    assert_eq!(block.get_at_absolute::<u16>(8), 1);
    assert_eq!(block.get_at_absolute::<u16>(10), u16::from(b'a'));
    assert_eq!(block.size(), 12);
}

#[test]
fn null_terminated_block_with_slack_is_trimmed() {
    let mut block = MemoryBlock::allocate(AllocStrategy::Virtual, 64).unwrap();
    let mut pos = 0;
    for entry in ["one", "two"] {
        pos += block.set_string(pos, entry);
    }
    let names = PackedStringCollection::from_block(block, Framing::NullTerminated).unwrap();
    assert_eq!(names.count(), 2);
    assert_eq!(names.get(1).unwrap(), "two");
    assert_eq!(names.config().strategy, AllocStrategy::Virtual);
    assert_eq!(names.to_bytes().len(), pos);
}

#[test]
fn reframe_preserves_entries_and_formatting() {
    let mut names = collection_of(Framing::default(), &SAMPLE_ENTRIES);
    let before = names.format(FormatOptions::QUOTED_LIST);
    names.reframe(Framing::NullTerminated).unwrap();
    names.reframe(Framing::LengthPrefixed(DescriptorWidth::U8)).unwrap();
    assert_eq!(names.format(FormatOptions::QUOTED_LIST), before);
    assert_eq!(names.count(), SAMPLE_ENTRIES.len());
}

#[test]
fn reframe_failure_leaves_collection_unchanged() {
    let mut names = PackedStringCollection::new();
    names.add_range(["x", "", "y"]).unwrap();
    let bytes = names.to_bytes();
    assert_eq!(
        names.reframe(Framing::NullTerminated),
        Err(CollectionError::EmptyEntry)
    );
    assert_eq!(names.to_bytes(), bytes);
    assert_eq!(names.framing(), Framing::default());
}

#[test]
fn foreign_buffer_round_trip() {
    let source = collection_of(Framing::NullTerminated, &SAMPLE_ENTRIES);
    let mut bytes = source.to_bytes();
    bytes.extend_from_slice(&[0, 0, 0xAB, 0xCD]);
    let copy = PackedStringCollection::from_bytes(&bytes, Framing::NullTerminated).unwrap();
    assert_eq!(copy.to_vec().unwrap(), SAMPLE_ENTRIES);
    assert_eq!(copy.to_bytes(), source.to_bytes());
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Add(String),
        Insert(usize, String),
        Remove(usize),
        Replace(usize, String),
        Truncate(usize),
    }

    fn entry() -> impl Strategy<Value = String> {
        "[a-zé\u{1F600}]{1,12}"
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            entry().prop_map(Op::Add),
            (any::<usize>(), entry()).prop_map(|(i, s)| Op::Insert(i, s)),
            any::<usize>().prop_map(Op::Remove),
            (any::<usize>(), entry()).prop_map(|(i, s)| Op::Replace(i, s)),
            any::<usize>().prop_map(Op::Truncate),
        ]
    }

    fn apply(collection: &mut PackedStringCollection, model: &mut Vec<String>, op: Op) {
        match op {
            Op::Add(s) => {
                collection.add(&s).unwrap();
                model.push(s);
            }
            Op::Insert(i, s) => {
                let i = i % (model.len() + 1);
                collection.insert_at(i, &s).unwrap();
                model.insert(i, s);
            }
            Op::Remove(i) if !model.is_empty() => {
                let i = i % model.len();
                collection.remove_at(i).unwrap();
                model.remove(i);
            }
            Op::Replace(i, s) if !model.is_empty() => {
                let i = i % model.len();
                collection.replace(i, &s).unwrap();
                model[i] = s;
            }
            Op::Truncate(k) if !model.is_empty() => {
                let k = k % model.len();
                collection.truncate(k).unwrap();
                model.truncate(k + 1);
            }
            _ => {}
        }
    }

    proptest! {
        #[test]
        fn collection_tracks_a_vec_model(
            ops in proptest::collection::vec(op(), 1..40),
            null_terminated in any::<bool>(),
            rewalk in any::<bool>(),
        ) {
            let framing = if null_terminated {
                Framing::NullTerminated
            } else {
                Framing::LengthPrefixed(DescriptorWidth::U16)
            };
            let index_mode = if rewalk { IndexMode::AlwaysRewalk } else { IndexMode::Cached };
            let mut collection = PackedStringCollection::with_config(CollectionConfig {
                framing,
                index_mode,
                ..CollectionConfig::default()
            });
            let mut model = Vec::new();
            for op in ops {
                apply(&mut collection, &mut model, op);
                prop_assert_eq!(collection.count(), model.len());
            }
            prop_assert_eq!(collection.to_vec().unwrap(), model);
        }

        #[test]
        fn alloc_grants_requested_size(size in 1usize..20_000, pick in 0usize..5) {
            let strategy = AllocStrategy::ALL[pick];
            let mut block = MemoryBlock::new();
            match strategy {
                AllocStrategy::ProcessHeap => block.alloc(size).unwrap(),
                AllocStrategy::Aligned => block.aligned_alloc(size, 32).unwrap(),
                AllocStrategy::Virtual => block.virtual_alloc(size).unwrap(),
                AllocStrategy::Network => block.net_alloc(size).unwrap(),
                AllocStrategy::ComTask => block.com_task_alloc(size).unwrap(),
            }
            prop_assert!(block.size() >= size);
            prop_assert!(block.free());
            prop_assert!(!block.free());
        }
    }
}
