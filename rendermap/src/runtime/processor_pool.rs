//! Per-processor execution slots.
//!
//! Each simulated processor owns a semaphore with a fixed number of slots.
//! Leaf tasks hold a slot for the duration of their body, which caps how many
//! leaf bodies run on one processor at once. Non-leaf tasks never take a
//! slot: a parent waiting on its children must not starve them.

use crate::machine::{Machine, ProcessorId};
use crate::runtime::RuntimeError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default slots per processor.
pub const DEFAULT_PROCESSOR_SLOTS: usize = 1;

// =============================================================================
// Processor Slots
// =============================================================================

/// Semaphore-backed slots for one processor.
#[derive(Debug)]
pub struct ProcessorSlots {
    processor: ProcessorId,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ProcessorSlots {
    fn new(processor: ProcessorId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            processor,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<SlotPermit<'_>, RuntimeError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RuntimeError::Aborted(format!("{} slots closed", self.processor)))?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);

        Ok(SlotPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneously held slots observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }
}

/// A held processor slot, released on drop.
pub struct SlotPermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for SlotPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Processor Pool
// =============================================================================

/// Slots for every processor in the machine.
#[derive(Debug)]
pub struct ProcessorPool {
    slots: HashMap<ProcessorId, ProcessorSlots>,
}

impl ProcessorPool {
    pub fn new(machine: &Machine, slots_per_processor: usize) -> Self {
        let slots = machine
            .processors()
            .iter()
            .map(|p| (p.id, ProcessorSlots::new(p.id, slots_per_processor)))
            .collect();
        Self { slots }
    }

    pub fn get(&self, processor: ProcessorId) -> Result<&ProcessorSlots, RuntimeError> {
        self.slots
            .get(&processor)
            .ok_or_else(|| RuntimeError::invariant(format!("unknown processor {}", processor)))
    }

    /// Waits for a slot on `processor`.
    pub async fn acquire(&self, processor: ProcessorId) -> Result<SlotPermit<'_>, RuntimeError> {
        self.get(processor)?.acquire().await
    }

    /// Closes every semaphore so pending acquisitions fail.
    pub fn close(&self) {
        for slots in self.slots.values() {
            slots.semaphore.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{MachineConfig, ProcessorKind};

    fn pool(slots: usize) -> (ProcessorPool, ProcessorId) {
        let machine = Machine::build(&MachineConfig::default());
        let cpu = machine.processors_of_kind(ProcessorKind::LocProc)[0];
        (ProcessorPool::new(&machine, slots), cpu)
    }

    #[tokio::test]
    async fn test_permit_tracks_in_flight() {
        let (pool, cpu) = pool(2);
        let slots = pool.get(cpu).unwrap();

        let a = slots.acquire().await.unwrap();
        let b = slots.acquire().await.unwrap();
        assert_eq!(slots.in_flight(), 2);
        assert_eq!(slots.peak_in_flight(), 2);

        drop(a);
        drop(b);
        assert_eq!(slots.in_flight(), 0);
        assert_eq!(slots.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_single_slot_serialises() {
        let (pool, cpu) = pool(1);
        let first = pool.acquire(cpu).await.unwrap();

        let waiting = tokio::time::timeout(std::time::Duration::from_millis(20), pool.acquire(cpu)).await;
        assert!(waiting.is_err(), "second acquire should block");

        drop(first);
        assert!(pool.acquire(cpu).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_pool_fails_acquire() {
        let (pool, cpu) = pool(1);
        pool.close();
        assert!(matches!(pool.acquire(cpu).await, Err(RuntimeError::Aborted(_))));
    }

    #[test]
    fn test_zero_slots_rounds_up() {
        let (pool, cpu) = pool(0);
        assert_eq!(pool.get(cpu).unwrap().capacity(), 1);
    }

    #[test]
    fn test_unknown_processor() {
        let (pool, _) = pool(1);
        assert!(pool.get(ProcessorId(999)).is_err());
    }
}
