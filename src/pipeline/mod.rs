//! Generic bounded three-stage split -> map -> reduce pipeline runtime
//! (C8), replacing the original's Intel TBB `parallel_pipeline` with
//! `crossbeam-channel` bounded channels plus a `rayon::Scope` worker pool.
//!
//! Three roles, one per spec.md §4.7/§5:
//! - `split` is serial-in-order: it runs alone on its own thread, tagging
//!   each batch it produces with a monotonically increasing sequence
//!   number. Returning `None` signals end of input.
//! - `map` is parallel: any of `threads` workers may run it on any batch,
//!   in any order, concurrently.
//! - `sink` is serial-in-order: it runs alone on the calling thread,
//!   consuming mapped batches through a small reorder buffer so delivery
//!   order always matches the order `split` produced them in, regardless
//!   of which worker finished first.
//!
//! Backpressure falls out of the channel capacities: both channels hold at
//! most `threads` in-flight batches, so `split` blocks on `send` once every
//! worker already has work queued.

pub mod emit;

use std::collections::HashMap;
use std::sync::Mutex;

use crossbeam_channel::bounded;

/// Runs the pipeline to completion, blocking the calling thread until
/// `split` is exhausted and every resulting batch has reached `sink`.
///
/// `threads` is clamped to at least 1. `split`/`sink` need not be `Sync`
/// (each runs on exactly one thread) but `split` must be `Send` since it
/// runs on a dedicated thread distinct from the caller; `map` must be
/// `Sync` since every worker calls it concurrently through a shared
/// reference.
pub fn run<T, U, Split, Map, Sink>(threads: usize, mut split: Split, map: Map, mut sink: Sink)
where
    T: Send,
    U: Send,
    Split: FnMut() -> Option<T> + Send,
    Map: Fn(T) -> U + Sync,
    Sink: FnMut(U),
{
    let threads = threads.max(1);
    let (in_tx, in_rx) = bounded::<(u64, T)>(threads);
    let (out_tx, out_rx) = bounded::<(u64, U)>(threads);

    rayon::scope(|scope| {
        scope.spawn(|_| {
            let mut tag: u64 = 0;
            while let Some(item) = split() {
                if in_tx.send((tag, item)).is_err() {
                    break;
                }
                tag += 1;
            }
            // Dropping `in_tx` here closes the channel, which is how
            // workers learn there is no more input.
        });

        for _ in 0..threads {
            let in_rx = in_rx.clone();
            let out_tx = out_tx.clone();
            let map = &map;
            scope.spawn(move |_| {
                while let Ok((tag, item)) = in_rx.recv() {
                    let mapped = map(item);
                    if out_tx.send((tag, mapped)).is_err() {
                        break;
                    }
                }
            });
        }

        // Drop our own handles to the cloned ends: the splitter owns the
        // only remaining `Sender`, and the workers own the only remaining
        // `Receiver`s, so the channels close exactly when those roles are
        // done producing/consuming.
        drop(in_rx);
        drop(out_tx);

        let mut next_tag: u64 = 0;
        let mut pending: HashMap<u64, U> = HashMap::new();
        while let Ok((tag, item)) = out_rx.recv() {
            pending.insert(tag, item);
            while let Some(item) = pending.remove(&next_tag) {
                sink(item);
                next_tag += 1;
            }
        }
    });
}

/// A `Mutex`-guarded error slot for pipeline `split` closures that read
/// from a fallible source (file I/O). `split` itself can only return
/// `Option<T>`, so an I/O error is stashed here and checked by the caller
/// once [`run`] returns, per spec.md §7's "input errors terminate the run
/// immediately" contract.
#[derive(Default)]
pub struct ErrorSlot(Mutex<Option<anyhow::Error>>);

impl ErrorSlot {
    pub fn new() -> Self {
        ErrorSlot(Mutex::new(None))
    }

    pub fn set(&self, err: anyhow::Error) {
        *self.0.lock().expect("error slot poisoned") = Some(err);
    }

    pub fn take(&self) -> Option<anyhow::Error> {
        self.0.lock().expect("error slot poisoned").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_in_split_order_despite_unordered_work() {
        // Items take wildly different "work" (sleep-free but branchy) so
        // a naive unordered pipeline would very likely reorder them; the
        // sink must still see 0..100 in order.
        let total = 200usize;
        let mut next_in = 0usize;
        let split = || -> Option<usize> {
            if next_in >= total {
                return None;
            }
            let v = next_in;
            next_in += 1;
            Some(v)
        };
        let map = |x: usize| -> usize {
            // Cheap pseudo-work that varies by item so workers finish out
            // of order.
            let mut acc = x;
            for _ in 0..(x % 7) {
                acc = acc.wrapping_mul(31).wrapping_add(1);
            }
            let _ = acc;
            x
        };
        let mut collected = Vec::with_capacity(total);
        run(4, split, map, |item| collected.push(item));

        let expected: Vec<usize> = (0..total).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn empty_input_produces_no_sink_calls() {
        let split = || -> Option<()> { None };
        let sink_calls = AtomicUsize::new(0);
        run(2, split, |x: ()| x, |_| {
            sink_calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(sink_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_slot_round_trips() {
        let slot = ErrorSlot::new();
        assert!(slot.take().is_none());
        slot.set(anyhow::anyhow!("boom"));
        let err = slot.take().expect("error should be present");
        assert_eq!(err.to_string(), "boom");
        assert!(slot.take().is_none());
    }
}
