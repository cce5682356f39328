//! Processor-level controls: gate table load, interrupt flag, halt.

use crate::idt::GateTable;

/// The processor operations the interrupt core depends on.
pub trait Cpu {
    /// Commit a fully populated gate table (`lidt`).
    fn load_gate_table(&mut self, table: &'static GateTable);
    fn enable_interrupts(&mut self);
    fn disable_interrupts(&mut self);
    fn interrupts_enabled(&self) -> bool;
    /// `sti; hlt`: unmask and sleep until the next interrupt. An interrupt
    /// already pending at the `sti` still wakes the `hlt`.
    fn enable_and_halt(&mut self);
}

/// Proof that processor interrupts are masked.
///
/// Acquiring the guard executes `cli`. Dropping it leaves interrupts masked
/// (polling modes run under it). Operations that must not interleave with the
/// keyboard handler take `&MaskedInterrupts` as an argument.
pub struct MaskedInterrupts<'c, C: Cpu> {
    cpu: &'c mut C,
}

impl<'c, C: Cpu> MaskedInterrupts<'c, C> {
    pub fn acquire(cpu: &'c mut C) -> Self {
        cpu.disable_interrupts();
        MaskedInterrupts { cpu }
    }

    /// Let interrupts in and sleep until `done` holds.
    ///
    /// `done` is only checked with interrupts masked, and the unmask and the
    /// halt are one step, so a handler that satisfies `done` between the
    /// check and the halt still wakes it. Interrupts are masked on return.
    pub fn sleep_until(&mut self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.cpu.enable_and_halt();
            self.cpu.disable_interrupts();
        }
    }
}

/// The executing x86_64 processor.
#[derive(Debug, Default)]
pub struct HwCpu;

impl Cpu for HwCpu {
    fn load_gate_table(&mut self, table: &'static GateTable) {
        table.load();
    }

    fn enable_interrupts(&mut self) {
        x86_64::instructions::interrupts::enable();
    }

    fn disable_interrupts(&mut self) {
        x86_64::instructions::interrupts::disable();
    }

    fn interrupts_enabled(&self) -> bool {
        x86_64::instructions::interrupts::are_enabled()
    }

    fn enable_and_halt(&mut self) {
        x86_64::instructions::interrupts::enable_and_hlt();
    }
}

/// Stop forward progress for good.
pub fn halt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use crate::testutil::{Event, SimCpu, Trace};

    #[test]
    fn test_guard_masks_on_acquire() {
        let trace = Trace::default();
        let mut cpu = SimCpu::new(&trace);
        cpu.enable_interrupts();

        let masked = MaskedInterrupts::acquire(&mut cpu);
        drop(masked);

        assert_eq!(
            trace.events(),
            vec![Event::EnableInterrupts, Event::DisableInterrupts]
        );
    }

    #[test]
    fn test_sleep_checks_condition_only_while_masked() {
        let trace = Trace::default();
        let wakeups = Cell::new(0);
        let mut cpu = SimCpu::new(&trace).on_halt(|| wakeups.set(wakeups.get() + 1));
        let mut last_event_at_check = Vec::new();

        let mut masked = MaskedInterrupts::acquire(&mut cpu);
        masked.sleep_until(|| {
            last_event_at_check.push(trace.events().last().cloned());
            wakeups.get() == 2
        });
        drop(masked);

        assert_eq!(last_event_at_check.len(), 3);
        assert!(last_event_at_check
            .iter()
            .all(|event| *event == Some(Event::DisableInterrupts)));
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_sleep_unmasks_and_halts_as_one_step() {
        let trace = Trace::default();
        let woken = Cell::new(false);
        let mut cpu = SimCpu::new(&trace).on_halt(|| woken.set(true));

        let mut masked = MaskedInterrupts::acquire(&mut cpu);
        masked.sleep_until(|| woken.get());
        drop(masked);

        assert_eq!(
            trace.events(),
            vec![
                Event::DisableInterrupts,
                Event::EnableInterrupts,
                Event::Halt,
                Event::DisableInterrupts
            ]
        );
    }

    #[test]
    fn test_sleep_returns_at_once_when_already_done() {
        let trace = Trace::default();
        let mut cpu = SimCpu::new(&trace);

        let mut masked = MaskedInterrupts::acquire(&mut cpu);
        masked.sleep_until(|| true);
        drop(masked);

        assert_eq!(trace.events(), vec![Event::DisableInterrupts]);
    }

    #[test]
    fn test_dropping_guard_leaves_interrupts_masked() {
        let trace = Trace::default();
        let mut cpu = SimCpu::new(&trace);
        cpu.enable_interrupts();

        drop(MaskedInterrupts::acquire(&mut cpu));

        assert!(!cpu.interrupts_enabled());
    }
}
