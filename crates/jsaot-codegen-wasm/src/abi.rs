//! Contract between generated modules and the host runtime: import and
//! export names, the closure context layout and the value encoding.

/// Module name of every host import.
pub const IMPORT_MODULE: &str = "env";

/// `(i32 size) -> i32 ptr`
pub const ALLOC: &str = "alloc";
/// `(i32 ptr, i32 len)`
pub const CONSOLE_WRITE: &str = "console_write";
/// `(f64 value)`
pub const WRITE_NUMBER: &str = "write_number";
/// `(f64 a, f64 b) -> f64`, the `%` operator
pub const FMOD: &str = "fmod";
/// `(i32 line)`, debug builds only
pub const LINE_MARKER: &str = "line_marker";
/// `(i32 debug_id)`, debug builds only
pub const CALL_MARKER: &str = "call_marker";
/// `(i32 debug_id)`, debug builds only
pub const EXIT_MARKER: &str = "exit_marker";

pub const MEMORY_EXPORT: &str = "memory";
pub const HEAP_BASE_EXPORT: &str = "__heap_base";
pub const START_EXPORT: &str = "_start";

/// Start of the data segment. Address 0 is never a valid context.
pub const DATA_BASE: u32 = 16;

/// Parent link (i32) padded to the cell alignment.
pub const CONTEXT_HEADER: u32 = 8;
pub const CELL_SIZE: u32 = 8;

/// Quiet NaN with a payload, reserved for `undefined`.
pub const UNDEFINED_BITS: u64 = 0x7FF8_0000_0000_0001;

pub fn undefined() -> f64 {
    f64::from_bits(UNDEFINED_BITS)
}

pub fn is_undefined(value: f64) -> bool {
    value.to_bits() == UNDEFINED_BITS
}

/// Bytes needed for a context with `cells` captured variables.
pub fn context_size(cells: usize) -> u32 {
    CONTEXT_HEADER + CELL_SIZE * cells as u32
}

/// Byte offset of a cell inside its context.
pub fn cell_offset(slot: u32) -> u64 {
    (CONTEXT_HEADER + CELL_SIZE * slot) as u64
}

/// Shift of the table index inside a function value's bits.
pub const SLOT_SHIFT: u32 = 32;

/// Function value: table index in the high half, context pointer in the low half.
pub fn pack_function(table_index: u32, context: u32) -> f64 {
    f64::from_bits(((table_index as u64) << SLOT_SHIFT) | context as u64)
}
