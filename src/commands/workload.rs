//! Built-in synthetic workload with a known call pattern.
//!
//! `main` calls `f` once per iteration and `f` calls `g` twice, so a
//! profile of it must show `main -> f -> g` with `g` holding most samples.
//! All frames are announced through a `StackRecorder`.

use crate::engine::{Frame, StackRecorder};
use std::hint::black_box;

/// Resource name reported for every workload frame
pub const WORKLOAD_RESOURCE: &str = "heatline://workload";

const MAIN_LINE: i32 = 1;
const F_LINE: i32 = 10;
const G_LINE: i32 = 20;

/// Run the workload.
///
/// # Arguments
/// * `recorder` - Shadow stack the frames are pushed to
/// * `iterations` - Number of `f` calls
/// * `rounds` - Loop iterations inside each `g` call
/// * `on_step` - Called on every `g` loop iteration (e.g. to take a sample)
///
/// # Returns
/// A checksum of the computation, so the work cannot be optimized away
pub fn run_workload(recorder: &StackRecorder, iterations: u32, rounds: u64, on_step: &dyn Fn()) -> u64 {
    let _main = recorder.enter(Frame::new("main", WORKLOAD_RESOURCE, MAIN_LINE, 1));
    let mut checksum = 0u64;
    for _ in 0..iterations {
        recorder.set_line(MAIN_LINE + 1);
        checksum = checksum.wrapping_add(f(recorder, rounds, on_step));
    }
    checksum
}

fn f(recorder: &StackRecorder, rounds: u64, on_step: &dyn Fn()) -> u64 {
    let _frame = recorder.enter(Frame::new("f", WORKLOAD_RESOURCE, F_LINE, 1));
    recorder.set_line(F_LINE + 1);
    let first = g(recorder, rounds, on_step);
    recorder.set_line(F_LINE + 2);
    let second = g(recorder, rounds, on_step);
    first ^ second.rotate_left(7)
}

fn g(recorder: &StackRecorder, rounds: u64, on_step: &dyn Fn()) -> u64 {
    let _frame = recorder.enter(Frame::new("g", WORKLOAD_RESOURCE, G_LINE, 1));
    let mut acc = 0u64;
    for i in 0..rounds {
        recorder.set_line(if i % 2 == 0 { G_LINE + 1 } else { G_LINE + 2 });
        acc = black_box(acc.wrapping_mul(31).wrapping_add(i));
        on_step();
    }
    acc
}
