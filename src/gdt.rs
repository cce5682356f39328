//! Segment setup: the kernel code selector every gate uses, and a TSS whose
//! interrupt stack table gives the double fault its own stack.

use core::ptr::addr_of;

use lazy_static::lazy_static;
use x86_64::instructions::segmentation::{Segment, CS};
use x86_64::instructions::tables::load_tss;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// TSS interrupt stack table slot for the double fault handler
pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

const FAULT_STACK_BYTES: usize = 5 * 4096;

#[repr(align(16))]
struct FaultStack([u8; FAULT_STACK_BYTES]);

static mut DOUBLE_FAULT_STACK: FaultStack = FaultStack([0; FAULT_STACK_BYTES]);

/// Top of the double fault stack. Stacks grow down.
fn fault_stack_top() -> VirtAddr {
    let base = VirtAddr::from_ptr(addr_of!(DOUBLE_FAULT_STACK));
    base + FAULT_STACK_BYTES as u64
}

struct KernelSegments {
    table: GlobalDescriptorTable,
    code: SegmentSelector,
    tss: SegmentSelector,
}

lazy_static! {
    static ref TSS: TaskStateSegment = {
        let mut tss = TaskStateSegment::new();
        tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = fault_stack_top();
        tss
    };

    static ref SEGMENTS: KernelSegments = {
        let mut table = GlobalDescriptorTable::new();
        let code = table.append(Descriptor::kernel_code_segment());
        let tss = table.append(Descriptor::tss_segment(&TSS));
        KernelSegments { table, code, tss }
    };
}

/// Raw kernel code selector for gate descriptors.
pub fn code_selector() -> u16 {
    SEGMENTS.code.0
}

/// Load the descriptor table, reload CS and install the TSS. Runs before the
/// gate table is loaded.
pub fn init() {
    SEGMENTS.table.load();
    unsafe {
        CS::set_reg(SEGMENTS.code);
        load_tss(SEGMENTS.tss);
    }
    log::info!("segments loaded, code selector {:#x}", code_selector());
}
