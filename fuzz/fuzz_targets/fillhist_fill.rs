#![no_main]

use fillhist::{Axis, BinKind, FillStatus, Histogram};
use libfuzzer_sys::fuzz_target;

fn f64_at(data: &[u8], i: usize) -> f64 {
    let mut b = [0u8; 8];
    for (k, slot) in b.iter_mut().enumerate() {
        *slot = data.get(i * 8 + k).copied().unwrap_or(0);
    }
    f64::from_le_bytes(b)
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // Keep the grid small; the point is the index arithmetic, not allocation.
    let n = (data[0] % 32) as usize;
    let flags = data[1];
    let rest = &data[2..];

    let (low, high) = (f64_at(rest, 0), f64_at(rest, 1));
    let Ok(uniform) = Axis::uniform(n, low, high) else {
        return;
    };
    let uniform = uniform.with_underflow(flags & 1 != 0).with_overflow(flags & 2 != 0);

    let mut edges: Vec<f64> = (2..6).map(|i| f64_at(rest, i)).collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    let Ok(explicit) = Axis::edges(edges) else {
        return;
    };
    let explicit = explicit.with_underflow(flags & 4 != 0).with_overflow(flags & 8 != 0);

    let Ok(mut h) = Histogram::new(vec![uniform, explicit], BinKind::Integer, None) else {
        return;
    };
    for i in 0..8 {
        let p = [f64_at(rest, 6 + 2 * i), f64_at(rest, 7 + 2 * i)];
        let located = h.locate(&p).expect("arity matches");
        let status = h.fill_point(&p).expect("integer fill without weight cannot fail");
        assert_eq!(located.is_some(), status == FillStatus::Filled);
        if let Some(offset) = located {
            assert!(offset < h.nbins());
            let local = h.local_indices(offset).unwrap();
            assert_eq!(h.flat_offset(&local).unwrap(), offset);
        }
    }
    let total: i64 = h.storage().as_i64_slice().unwrap().iter().sum();
    assert_eq!(total as u64, h.stats().filled);
});
