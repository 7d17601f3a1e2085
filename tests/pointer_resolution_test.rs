//! Pointer chain resolution against a synthetic address space

use memory_recorder::process::SyntheticProcess;
use memory_recorder::{
    Address, AddressWidth, MemoryError, ModuleCache, PointerChain, PointerResolver, ProcessMemory,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Manual `a0 = base + o0; a_i = deref(a_{i-1}) + o_i`
fn manual_walk(process: &dyn ProcessMemory, width: AddressWidth, base: u64, offsets: &[i64]) -> u64 {
    let mask = match width {
        AddressWidth::Bits32 => u64::from(u32::MAX),
        AddressWidth::Bits64 => u64::MAX,
    };
    let mut address = (base as i128 + offsets[0] as i128) as u64 & mask;
    for &offset in &offsets[1..] {
        let bytes = process.read_vec(Address::new(address), width.pointer_size()).unwrap();
        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(&bytes);
        address = (u64::from_le_bytes(raw) as i128 + offset as i128) as u64 & mask;
    }
    address
}

fn linked_process(width: AddressWidth) -> SyntheticProcess {
    // three nodes, each holding a pointer to the next at +0x18
    let process = SyntheticProcess::new(1, width);
    let nodes = [0x10_0000u64, 0x20_0000, 0x30_0000];
    for node in nodes {
        process.map_zeroed(Address::new(node), 0x100);
    }
    for pair in nodes.windows(2) {
        process
            .write_pointer(width, Address::new(pair[0] + 0x18), Address::new(pair[1]))
            .unwrap();
    }
    process
}

#[test]
fn test_empty_chain_is_identity() {
    for width in [AddressWidth::Bits32, AddressWidth::Bits64] {
        let process = SyntheticProcess::new(1, width);
        let resolver = PointerResolver::new(&process, width);
        for base in [0u64, 0x1234, u64::MAX] {
            assert_eq!(resolver.resolve(Address::new(base), &[]).unwrap(), Address::new(base));
        }
    }
}

#[test]
fn test_chain_matches_manual_computation() {
    for width in [AddressWidth::Bits32, AddressWidth::Bits64] {
        let process = linked_process(width);
        let offsets = [0x18, 0x18, 0x40];
        let resolved = PointerResolver::new(&process, width)
            .resolve(Address::new(0x10_0000), &offsets)
            .unwrap();

        assert_eq!(resolved.as_u64(), manual_walk(&process, width, 0x10_0000, &offsets));
        assert_eq!(resolved, Address::new(0x30_0040));
    }
}

#[test]
fn test_negative_offsets_both_widths() {
    for width in [AddressWidth::Bits32, AddressWidth::Bits64] {
        let process = linked_process(width);
        let resolved = PointerResolver::new(&process, width)
            .resolve(Address::new(0x10_0020), &[-0x8, -0x10])
            .unwrap();
        assert_eq!(resolved, Address::new(0x20_0000 - 0x10), "{}", width);
    }
}

#[test]
fn test_module_chain_parsed_from_text() {
    let process = linked_process(AddressWidth::Bits64);
    process.add_module("client.dll", Address::new(0x10_0000));
    let modules = ModuleCache::new();

    let chain = PointerChain::parse("CLIENT.DLL+18,18,-4").unwrap();
    let resolved = PointerResolver::new(&process, AddressWidth::Bits64)
        .resolve_chain(&modules, &chain)
        .unwrap();
    assert_eq!(resolved, Address::new(0x30_0000 - 4));
}

#[test]
fn test_broken_hop_is_identified() {
    let process = linked_process(AddressWidth::Bits64);
    let err = PointerResolver::new(&process, AddressWidth::Bits64)
        .resolve(Address::new(0x10_0000), &[0x18, 0x18, 0x18, 0x18, 0x0])
        .unwrap_err();

    // the last node holds a null pointer, so the fourth dereference reads 0x18
    match err {
        MemoryError::PointerChainBroken { level, address, .. } => {
            assert_eq!(level, 3);
            assert_eq!(address, "0x18");
        }
        other => panic!("expected PointerChainBroken, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn prop_resolver_matches_manual_walk(
        o0 in -0x80i64..0x80,
        last in any::<i32>(),
        wide in any::<bool>(),
    ) {
        let width = if wide { AddressWidth::Bits64 } else { AddressWidth::Bits32 };
        let process = linked_process(width);
        // base + o0 always lands on the first node's pointer slot
        let base = (0x10_0018 - o0) as u64;
        let offsets = [o0, 0x18, i64::from(last)];

        let resolved = PointerResolver::new(&process, width)
            .resolve(Address::new(base), &offsets)
            .unwrap();
        prop_assert_eq!(resolved.as_u64(), manual_walk(&process, width, base, &offsets));
    }
}
