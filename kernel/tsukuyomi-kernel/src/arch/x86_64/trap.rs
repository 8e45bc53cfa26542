//! Trap entry, dispatch, and return.
//!
//! Every IDT vector points at a small per-vector stub that pushes a zero
//! error code (for vectors where the CPU does not supply one) and the
//! vector number, then jumps to the common trampoline. The trampoline
//! saves the general-purpose register file including `ds`/`es`, loads the
//! kernel data selectors, and calls [`trap_dispatch`] with a pointer to
//! the assembled [`TrapFrame`]. The return path at `trap_return` pops the
//! registers, skips the vector and error code, and issues `iretq` — a
//! freshly forked process enters user mode through exactly this epilogue.
//!
//! The `TrapFrame` layout is ABI-visible: it must match the push order of
//! the trampoline below, field for field.

use tsukuyomi_core::arch::x86_64::registers::control::Cr2;
use tsukuyomi_core::arch::x86_64::structures::paging::PageFaultErrorCode;

use crate::drivers::{i8042, lapic, uart16550};
use crate::{proc, syscall};

/// Vector assignments.
pub mod vectors {
    /// Local APIC timer.
    pub const TIMER: u64 = 32;
    /// PS/2 keyboard (IRQ 1 via the IOAPIC).
    pub const KEYBOARD: u64 = 33;
    /// UART COM1 (IRQ 4 via the IOAPIC).
    pub const UART: u64 = 36;
    /// System call gate (`int 0x40`).
    pub const SYSCALL: u64 = 0x40;
    /// Local APIC spurious vector.
    pub const SPURIOUS: u64 = 0xFF;
}

/// Saved CPU state at the point of a trap, sufficient to resume with
/// `iretq`.
///
/// Field order matches the trampoline: segment registers and the general
/// purpose file pushed by software, then the vector and error code pushed
/// by the stub, then the hardware interrupt frame.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TrapFrame {
    /// Saved ES (low 16 bits meaningful).
    pub es: u64,
    /// Saved DS (low 16 bits meaningful).
    pub ds: u64,
    /// Saved general-purpose registers.
    pub r15: u64,
    /// See `r15`.
    pub r14: u64,
    /// See `r15`.
    pub r13: u64,
    /// See `r15`.
    pub r12: u64,
    /// See `r15`.
    pub r11: u64,
    /// Fourth syscall argument.
    pub r10: u64,
    /// See `r15`.
    pub r9: u64,
    /// See `r15`.
    pub r8: u64,
    /// First syscall argument.
    pub rdi: u64,
    /// Second syscall argument.
    pub rsi: u64,
    /// Saved frame pointer.
    pub rbp: u64,
    /// Third syscall argument.
    pub rdx: u64,
    /// See `r15`.
    pub rcx: u64,
    /// See `r15`.
    pub rbx: u64,
    /// Syscall number on entry, return value on exit.
    pub rax: u64,
    /// Vector number pushed by the per-vector stub.
    pub vector: u64,
    /// Error code pushed by the CPU, or zero from the stub.
    pub error_code: u64,
    /// Interrupted instruction pointer (hardware frame from here down).
    pub rip: u64,
    /// Interrupted code segment.
    pub cs: u64,
    /// Interrupted RFLAGS.
    pub rflags: u64,
    /// Interrupted stack pointer.
    pub rsp: u64,
    /// Interrupted stack segment.
    pub ss: u64,
}

/// The stub address table exported by the assembly below; entry `n` is the
/// stub for vector `n`.
#[cfg(target_os = "none")]
unsafe extern "C" {
    /// Stub address table emitted by the assembly block below.
    #[link_name = "trap_table"]
    static TRAP_TABLE: [usize; 256];
    /// The trap-return epilogue; a forked process's kernel stack is seeded
    /// so that its first context switch falls through into this label.
    pub fn trap_return() -> !;
}

/// Host builds have no assembled stubs; the addresses are never used.
#[cfg(not(target_os = "none"))]
static TRAP_TABLE: [usize; 256] = [0; 256];

/// Host stand-in for the assembly label.
#[cfg(not(target_os = "none"))]
pub fn trap_return() -> ! {
    unreachable!("trap_return is only reachable on bare metal");
}

/// Returns the per-vector stub address for `vector`.
pub fn stub_addr(vector: usize) -> usize {
    #[cfg(target_os = "none")]
    // SAFETY: `trap_table` is the 256-entry address table emitted by the
    // assembly block below; indexing within 0..256 is in bounds.
    unsafe {
        TRAP_TABLE[vector]
    }
    #[cfg(not(target_os = "none"))]
    {
        TRAP_TABLE[vector]
    }
}

/// Routes a trap by vector.
///
/// General-protection and page faults are fatal; the timer yields the
/// current process; device vectors call their handler and signal EOI;
/// vector 0x40 enters the system-call layer.
#[unsafe(no_mangle)]
extern "C" fn trap_dispatch(frame: &mut TrapFrame) {
    match frame.vector {
        13 => {
            panic!(
                "general protection fault: error={:#x} rip={:#x}",
                frame.error_code, frame.rip
            );
        }
        14 => {
            let code = PageFaultErrorCode::from_bits_truncate(frame.error_code);
            panic!(
                "page fault: addr={:#x} error={:?} rip={:#x}",
                Cr2::read().as_u64(),
                code,
                frame.rip
            );
        }
        vectors::TIMER => {
            lapic::eoi();
            if proc::has_current() {
                proc::sched::yield_cpu();
            }
        }
        vectors::KEYBOARD => {
            i8042::handle_interrupt();
            lapic::eoi();
        }
        vectors::UART => {
            uart16550::handle_interrupt();
            lapic::eoi();
        }
        vectors::SYSCALL => syscall::dispatch(frame),
        vectors::SPURIOUS => {
            // Spurious LAPIC interrupt: no EOI.
        }
        vector => panic!("unhandled trap vector {vector}"),
    }
}

/// Kernel data selector value, substituted into the trampoline.
#[cfg(target_os = "none")]
const KERNEL_DATA: u16 = crate::arch::x86_64::gdt::KERNEL_DATA_SELECTOR.as_u16();

// The per-vector stubs and the exported stub-address table. Vectors where
// the CPU pushes an error code (8, 10-14, 17, 21, 29, 30) push only their
// number; all others push a zero placeholder first, so the frame layout is
// uniform. The listing is mechanical; each stub is one line.
#[cfg(target_os = "none")]
core::arch::global_asm!(
    ".section .text",
    "trap_vector_0: push 0; push 0; jmp trap_common",
    "trap_vector_1: push 0; push 1; jmp trap_common",
    "trap_vector_2: push 0; push 2; jmp trap_common",
    "trap_vector_3: push 0; push 3; jmp trap_common",
    "trap_vector_4: push 0; push 4; jmp trap_common",
    "trap_vector_5: push 0; push 5; jmp trap_common",
    "trap_vector_6: push 0; push 6; jmp trap_common",
    "trap_vector_7: push 0; push 7; jmp trap_common",
    "trap_vector_8: push 8; jmp trap_common",
    "trap_vector_9: push 0; push 9; jmp trap_common",
    "trap_vector_10: push 10; jmp trap_common",
    "trap_vector_11: push 11; jmp trap_common",
    "trap_vector_12: push 12; jmp trap_common",
    "trap_vector_13: push 13; jmp trap_common",
    "trap_vector_14: push 14; jmp trap_common",
    "trap_vector_15: push 0; push 15; jmp trap_common",
    "trap_vector_16: push 0; push 16; jmp trap_common",
    "trap_vector_17: push 17; jmp trap_common",
    "trap_vector_18: push 0; push 18; jmp trap_common",
    "trap_vector_19: push 0; push 19; jmp trap_common",
    "trap_vector_20: push 0; push 20; jmp trap_common",
    "trap_vector_21: push 21; jmp trap_common",
    "trap_vector_22: push 0; push 22; jmp trap_common",
    "trap_vector_23: push 0; push 23; jmp trap_common",
    "trap_vector_24: push 0; push 24; jmp trap_common",
    "trap_vector_25: push 0; push 25; jmp trap_common",
    "trap_vector_26: push 0; push 26; jmp trap_common",
    "trap_vector_27: push 0; push 27; jmp trap_common",
    "trap_vector_28: push 0; push 28; jmp trap_common",
    "trap_vector_29: push 29; jmp trap_common",
    "trap_vector_30: push 30; jmp trap_common",
    "trap_vector_31: push 0; push 31; jmp trap_common",
    "trap_vector_32: push 0; push 32; jmp trap_common",
    "trap_vector_33: push 0; push 33; jmp trap_common",
    "trap_vector_34: push 0; push 34; jmp trap_common",
    "trap_vector_35: push 0; push 35; jmp trap_common",
    "trap_vector_36: push 0; push 36; jmp trap_common",
    "trap_vector_37: push 0; push 37; jmp trap_common",
    "trap_vector_38: push 0; push 38; jmp trap_common",
    "trap_vector_39: push 0; push 39; jmp trap_common",
    "trap_vector_40: push 0; push 40; jmp trap_common",
    "trap_vector_41: push 0; push 41; jmp trap_common",
    "trap_vector_42: push 0; push 42; jmp trap_common",
    "trap_vector_43: push 0; push 43; jmp trap_common",
    "trap_vector_44: push 0; push 44; jmp trap_common",
    "trap_vector_45: push 0; push 45; jmp trap_common",
    "trap_vector_46: push 0; push 46; jmp trap_common",
    "trap_vector_47: push 0; push 47; jmp trap_common",
    "trap_vector_48: push 0; push 48; jmp trap_common",
    "trap_vector_49: push 0; push 49; jmp trap_common",
    "trap_vector_50: push 0; push 50; jmp trap_common",
    "trap_vector_51: push 0; push 51; jmp trap_common",
    "trap_vector_52: push 0; push 52; jmp trap_common",
    "trap_vector_53: push 0; push 53; jmp trap_common",
    "trap_vector_54: push 0; push 54; jmp trap_common",
    "trap_vector_55: push 0; push 55; jmp trap_common",
    "trap_vector_56: push 0; push 56; jmp trap_common",
    "trap_vector_57: push 0; push 57; jmp trap_common",
    "trap_vector_58: push 0; push 58; jmp trap_common",
    "trap_vector_59: push 0; push 59; jmp trap_common",
    "trap_vector_60: push 0; push 60; jmp trap_common",
    "trap_vector_61: push 0; push 61; jmp trap_common",
    "trap_vector_62: push 0; push 62; jmp trap_common",
    "trap_vector_63: push 0; push 63; jmp trap_common",
    "trap_vector_64: push 0; push 64; jmp trap_common",
    "trap_vector_65: push 0; push 65; jmp trap_common",
    "trap_vector_66: push 0; push 66; jmp trap_common",
    "trap_vector_67: push 0; push 67; jmp trap_common",
    "trap_vector_68: push 0; push 68; jmp trap_common",
    "trap_vector_69: push 0; push 69; jmp trap_common",
    "trap_vector_70: push 0; push 70; jmp trap_common",
    "trap_vector_71: push 0; push 71; jmp trap_common",
    "trap_vector_72: push 0; push 72; jmp trap_common",
    "trap_vector_73: push 0; push 73; jmp trap_common",
    "trap_vector_74: push 0; push 74; jmp trap_common",
    "trap_vector_75: push 0; push 75; jmp trap_common",
    "trap_vector_76: push 0; push 76; jmp trap_common",
    "trap_vector_77: push 0; push 77; jmp trap_common",
    "trap_vector_78: push 0; push 78; jmp trap_common",
    "trap_vector_79: push 0; push 79; jmp trap_common",
    "trap_vector_80: push 0; push 80; jmp trap_common",
    "trap_vector_81: push 0; push 81; jmp trap_common",
    "trap_vector_82: push 0; push 82; jmp trap_common",
    "trap_vector_83: push 0; push 83; jmp trap_common",
    "trap_vector_84: push 0; push 84; jmp trap_common",
    "trap_vector_85: push 0; push 85; jmp trap_common",
    "trap_vector_86: push 0; push 86; jmp trap_common",
    "trap_vector_87: push 0; push 87; jmp trap_common",
    "trap_vector_88: push 0; push 88; jmp trap_common",
    "trap_vector_89: push 0; push 89; jmp trap_common",
    "trap_vector_90: push 0; push 90; jmp trap_common",
    "trap_vector_91: push 0; push 91; jmp trap_common",
    "trap_vector_92: push 0; push 92; jmp trap_common",
    "trap_vector_93: push 0; push 93; jmp trap_common",
    "trap_vector_94: push 0; push 94; jmp trap_common",
    "trap_vector_95: push 0; push 95; jmp trap_common",
    "trap_vector_96: push 0; push 96; jmp trap_common",
    "trap_vector_97: push 0; push 97; jmp trap_common",
    "trap_vector_98: push 0; push 98; jmp trap_common",
    "trap_vector_99: push 0; push 99; jmp trap_common",
    "trap_vector_100: push 0; push 100; jmp trap_common",
    "trap_vector_101: push 0; push 101; jmp trap_common",
    "trap_vector_102: push 0; push 102; jmp trap_common",
    "trap_vector_103: push 0; push 103; jmp trap_common",
    "trap_vector_104: push 0; push 104; jmp trap_common",
    "trap_vector_105: push 0; push 105; jmp trap_common",
    "trap_vector_106: push 0; push 106; jmp trap_common",
    "trap_vector_107: push 0; push 107; jmp trap_common",
    "trap_vector_108: push 0; push 108; jmp trap_common",
    "trap_vector_109: push 0; push 109; jmp trap_common",
    "trap_vector_110: push 0; push 110; jmp trap_common",
    "trap_vector_111: push 0; push 111; jmp trap_common",
    "trap_vector_112: push 0; push 112; jmp trap_common",
    "trap_vector_113: push 0; push 113; jmp trap_common",
    "trap_vector_114: push 0; push 114; jmp trap_common",
    "trap_vector_115: push 0; push 115; jmp trap_common",
    "trap_vector_116: push 0; push 116; jmp trap_common",
    "trap_vector_117: push 0; push 117; jmp trap_common",
    "trap_vector_118: push 0; push 118; jmp trap_common",
    "trap_vector_119: push 0; push 119; jmp trap_common",
    "trap_vector_120: push 0; push 120; jmp trap_common",
    "trap_vector_121: push 0; push 121; jmp trap_common",
    "trap_vector_122: push 0; push 122; jmp trap_common",
    "trap_vector_123: push 0; push 123; jmp trap_common",
    "trap_vector_124: push 0; push 124; jmp trap_common",
    "trap_vector_125: push 0; push 125; jmp trap_common",
    "trap_vector_126: push 0; push 126; jmp trap_common",
    "trap_vector_127: push 0; push 127; jmp trap_common",
    "trap_vector_128: push 0; push 128; jmp trap_common",
    "trap_vector_129: push 0; push 129; jmp trap_common",
    "trap_vector_130: push 0; push 130; jmp trap_common",
    "trap_vector_131: push 0; push 131; jmp trap_common",
    "trap_vector_132: push 0; push 132; jmp trap_common",
    "trap_vector_133: push 0; push 133; jmp trap_common",
    "trap_vector_134: push 0; push 134; jmp trap_common",
    "trap_vector_135: push 0; push 135; jmp trap_common",
    "trap_vector_136: push 0; push 136; jmp trap_common",
    "trap_vector_137: push 0; push 137; jmp trap_common",
    "trap_vector_138: push 0; push 138; jmp trap_common",
    "trap_vector_139: push 0; push 139; jmp trap_common",
    "trap_vector_140: push 0; push 140; jmp trap_common",
    "trap_vector_141: push 0; push 141; jmp trap_common",
    "trap_vector_142: push 0; push 142; jmp trap_common",
    "trap_vector_143: push 0; push 143; jmp trap_common",
    "trap_vector_144: push 0; push 144; jmp trap_common",
    "trap_vector_145: push 0; push 145; jmp trap_common",
    "trap_vector_146: push 0; push 146; jmp trap_common",
    "trap_vector_147: push 0; push 147; jmp trap_common",
    "trap_vector_148: push 0; push 148; jmp trap_common",
    "trap_vector_149: push 0; push 149; jmp trap_common",
    "trap_vector_150: push 0; push 150; jmp trap_common",
    "trap_vector_151: push 0; push 151; jmp trap_common",
    "trap_vector_152: push 0; push 152; jmp trap_common",
    "trap_vector_153: push 0; push 153; jmp trap_common",
    "trap_vector_154: push 0; push 154; jmp trap_common",
    "trap_vector_155: push 0; push 155; jmp trap_common",
    "trap_vector_156: push 0; push 156; jmp trap_common",
    "trap_vector_157: push 0; push 157; jmp trap_common",
    "trap_vector_158: push 0; push 158; jmp trap_common",
    "trap_vector_159: push 0; push 159; jmp trap_common",
    "trap_vector_160: push 0; push 160; jmp trap_common",
    "trap_vector_161: push 0; push 161; jmp trap_common",
    "trap_vector_162: push 0; push 162; jmp trap_common",
    "trap_vector_163: push 0; push 163; jmp trap_common",
    "trap_vector_164: push 0; push 164; jmp trap_common",
    "trap_vector_165: push 0; push 165; jmp trap_common",
    "trap_vector_166: push 0; push 166; jmp trap_common",
    "trap_vector_167: push 0; push 167; jmp trap_common",
    "trap_vector_168: push 0; push 168; jmp trap_common",
    "trap_vector_169: push 0; push 169; jmp trap_common",
    "trap_vector_170: push 0; push 170; jmp trap_common",
    "trap_vector_171: push 0; push 171; jmp trap_common",
    "trap_vector_172: push 0; push 172; jmp trap_common",
    "trap_vector_173: push 0; push 173; jmp trap_common",
    "trap_vector_174: push 0; push 174; jmp trap_common",
    "trap_vector_175: push 0; push 175; jmp trap_common",
    "trap_vector_176: push 0; push 176; jmp trap_common",
    "trap_vector_177: push 0; push 177; jmp trap_common",
    "trap_vector_178: push 0; push 178; jmp trap_common",
    "trap_vector_179: push 0; push 179; jmp trap_common",
    "trap_vector_180: push 0; push 180; jmp trap_common",
    "trap_vector_181: push 0; push 181; jmp trap_common",
    "trap_vector_182: push 0; push 182; jmp trap_common",
    "trap_vector_183: push 0; push 183; jmp trap_common",
    "trap_vector_184: push 0; push 184; jmp trap_common",
    "trap_vector_185: push 0; push 185; jmp trap_common",
    "trap_vector_186: push 0; push 186; jmp trap_common",
    "trap_vector_187: push 0; push 187; jmp trap_common",
    "trap_vector_188: push 0; push 188; jmp trap_common",
    "trap_vector_189: push 0; push 189; jmp trap_common",
    "trap_vector_190: push 0; push 190; jmp trap_common",
    "trap_vector_191: push 0; push 191; jmp trap_common",
    "trap_vector_192: push 0; push 192; jmp trap_common",
    "trap_vector_193: push 0; push 193; jmp trap_common",
    "trap_vector_194: push 0; push 194; jmp trap_common",
    "trap_vector_195: push 0; push 195; jmp trap_common",
    "trap_vector_196: push 0; push 196; jmp trap_common",
    "trap_vector_197: push 0; push 197; jmp trap_common",
    "trap_vector_198: push 0; push 198; jmp trap_common",
    "trap_vector_199: push 0; push 199; jmp trap_common",
    "trap_vector_200: push 0; push 200; jmp trap_common",
    "trap_vector_201: push 0; push 201; jmp trap_common",
    "trap_vector_202: push 0; push 202; jmp trap_common",
    "trap_vector_203: push 0; push 203; jmp trap_common",
    "trap_vector_204: push 0; push 204; jmp trap_common",
    "trap_vector_205: push 0; push 205; jmp trap_common",
    "trap_vector_206: push 0; push 206; jmp trap_common",
    "trap_vector_207: push 0; push 207; jmp trap_common",
    "trap_vector_208: push 0; push 208; jmp trap_common",
    "trap_vector_209: push 0; push 209; jmp trap_common",
    "trap_vector_210: push 0; push 210; jmp trap_common",
    "trap_vector_211: push 0; push 211; jmp trap_common",
    "trap_vector_212: push 0; push 212; jmp trap_common",
    "trap_vector_213: push 0; push 213; jmp trap_common",
    "trap_vector_214: push 0; push 214; jmp trap_common",
    "trap_vector_215: push 0; push 215; jmp trap_common",
    "trap_vector_216: push 0; push 216; jmp trap_common",
    "trap_vector_217: push 0; push 217; jmp trap_common",
    "trap_vector_218: push 0; push 218; jmp trap_common",
    "trap_vector_219: push 0; push 219; jmp trap_common",
    "trap_vector_220: push 0; push 220; jmp trap_common",
    "trap_vector_221: push 0; push 221; jmp trap_common",
    "trap_vector_222: push 0; push 222; jmp trap_common",
    "trap_vector_223: push 0; push 223; jmp trap_common",
    "trap_vector_224: push 0; push 224; jmp trap_common",
    "trap_vector_225: push 0; push 225; jmp trap_common",
    "trap_vector_226: push 0; push 226; jmp trap_common",
    "trap_vector_227: push 0; push 227; jmp trap_common",
    "trap_vector_228: push 0; push 228; jmp trap_common",
    "trap_vector_229: push 0; push 229; jmp trap_common",
    "trap_vector_230: push 0; push 230; jmp trap_common",
    "trap_vector_231: push 0; push 231; jmp trap_common",
    "trap_vector_232: push 0; push 232; jmp trap_common",
    "trap_vector_233: push 0; push 233; jmp trap_common",
    "trap_vector_234: push 0; push 234; jmp trap_common",
    "trap_vector_235: push 0; push 235; jmp trap_common",
    "trap_vector_236: push 0; push 236; jmp trap_common",
    "trap_vector_237: push 0; push 237; jmp trap_common",
    "trap_vector_238: push 0; push 238; jmp trap_common",
    "trap_vector_239: push 0; push 239; jmp trap_common",
    "trap_vector_240: push 0; push 240; jmp trap_common",
    "trap_vector_241: push 0; push 241; jmp trap_common",
    "trap_vector_242: push 0; push 242; jmp trap_common",
    "trap_vector_243: push 0; push 243; jmp trap_common",
    "trap_vector_244: push 0; push 244; jmp trap_common",
    "trap_vector_245: push 0; push 245; jmp trap_common",
    "trap_vector_246: push 0; push 246; jmp trap_common",
    "trap_vector_247: push 0; push 247; jmp trap_common",
    "trap_vector_248: push 0; push 248; jmp trap_common",
    "trap_vector_249: push 0; push 249; jmp trap_common",
    "trap_vector_250: push 0; push 250; jmp trap_common",
    "trap_vector_251: push 0; push 251; jmp trap_common",
    "trap_vector_252: push 0; push 252; jmp trap_common",
    "trap_vector_253: push 0; push 253; jmp trap_common",
    "trap_vector_254: push 0; push 254; jmp trap_common",
    "trap_vector_255: push 0; push 255; jmp trap_common",
    // Common trampoline: the stack already holds the hardware frame,
    // the error code, and the vector.
    "trap_common:",
    "    push rax",
    "    push rbx",
    "    push rcx",
    "    push rdx",
    "    push rbp",
    "    push rsi",
    "    push rdi",
    "    push r8",
    "    push r9",
    "    push r10",
    "    push r11",
    "    push r12",
    "    push r13",
    "    push r14",
    "    push r15",
    "    mov ax, ds",
    "    push rax",
    "    mov ax, es",
    "    push rax",
    "    mov ax, {kdata}",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov rdi, rsp",
    "    call trap_dispatch",
    ".global trap_return",
    "trap_return:",
    "    pop rax",
    "    mov es, ax",
    "    pop rax",
    "    mov ds, ax",
    "    pop r15",
    "    pop r14",
    "    pop r13",
    "    pop r12",
    "    pop r11",
    "    pop r10",
    "    pop r9",
    "    pop r8",
    "    pop rdi",
    "    pop rsi",
    "    pop rbp",
    "    pop rdx",
    "    pop rcx",
    "    pop rbx",
    "    pop rax",
    "    add rsp, 16",
    "    iretq",
    // Stub address table consumed by the IDT installer.
    ".section .rodata",
    ".balign 8",
    ".global trap_table",
    "trap_table:",
    ".quad trap_vector_0",
    ".quad trap_vector_1",
    ".quad trap_vector_2",
    ".quad trap_vector_3",
    ".quad trap_vector_4",
    ".quad trap_vector_5",
    ".quad trap_vector_6",
    ".quad trap_vector_7",
    ".quad trap_vector_8",
    ".quad trap_vector_9",
    ".quad trap_vector_10",
    ".quad trap_vector_11",
    ".quad trap_vector_12",
    ".quad trap_vector_13",
    ".quad trap_vector_14",
    ".quad trap_vector_15",
    ".quad trap_vector_16",
    ".quad trap_vector_17",
    ".quad trap_vector_18",
    ".quad trap_vector_19",
    ".quad trap_vector_20",
    ".quad trap_vector_21",
    ".quad trap_vector_22",
    ".quad trap_vector_23",
    ".quad trap_vector_24",
    ".quad trap_vector_25",
    ".quad trap_vector_26",
    ".quad trap_vector_27",
    ".quad trap_vector_28",
    ".quad trap_vector_29",
    ".quad trap_vector_30",
    ".quad trap_vector_31",
    ".quad trap_vector_32",
    ".quad trap_vector_33",
    ".quad trap_vector_34",
    ".quad trap_vector_35",
    ".quad trap_vector_36",
    ".quad trap_vector_37",
    ".quad trap_vector_38",
    ".quad trap_vector_39",
    ".quad trap_vector_40",
    ".quad trap_vector_41",
    ".quad trap_vector_42",
    ".quad trap_vector_43",
    ".quad trap_vector_44",
    ".quad trap_vector_45",
    ".quad trap_vector_46",
    ".quad trap_vector_47",
    ".quad trap_vector_48",
    ".quad trap_vector_49",
    ".quad trap_vector_50",
    ".quad trap_vector_51",
    ".quad trap_vector_52",
    ".quad trap_vector_53",
    ".quad trap_vector_54",
    ".quad trap_vector_55",
    ".quad trap_vector_56",
    ".quad trap_vector_57",
    ".quad trap_vector_58",
    ".quad trap_vector_59",
    ".quad trap_vector_60",
    ".quad trap_vector_61",
    ".quad trap_vector_62",
    ".quad trap_vector_63",
    ".quad trap_vector_64",
    ".quad trap_vector_65",
    ".quad trap_vector_66",
    ".quad trap_vector_67",
    ".quad trap_vector_68",
    ".quad trap_vector_69",
    ".quad trap_vector_70",
    ".quad trap_vector_71",
    ".quad trap_vector_72",
    ".quad trap_vector_73",
    ".quad trap_vector_74",
    ".quad trap_vector_75",
    ".quad trap_vector_76",
    ".quad trap_vector_77",
    ".quad trap_vector_78",
    ".quad trap_vector_79",
    ".quad trap_vector_80",
    ".quad trap_vector_81",
    ".quad trap_vector_82",
    ".quad trap_vector_83",
    ".quad trap_vector_84",
    ".quad trap_vector_85",
    ".quad trap_vector_86",
    ".quad trap_vector_87",
    ".quad trap_vector_88",
    ".quad trap_vector_89",
    ".quad trap_vector_90",
    ".quad trap_vector_91",
    ".quad trap_vector_92",
    ".quad trap_vector_93",
    ".quad trap_vector_94",
    ".quad trap_vector_95",
    ".quad trap_vector_96",
    ".quad trap_vector_97",
    ".quad trap_vector_98",
    ".quad trap_vector_99",
    ".quad trap_vector_100",
    ".quad trap_vector_101",
    ".quad trap_vector_102",
    ".quad trap_vector_103",
    ".quad trap_vector_104",
    ".quad trap_vector_105",
    ".quad trap_vector_106",
    ".quad trap_vector_107",
    ".quad trap_vector_108",
    ".quad trap_vector_109",
    ".quad trap_vector_110",
    ".quad trap_vector_111",
    ".quad trap_vector_112",
    ".quad trap_vector_113",
    ".quad trap_vector_114",
    ".quad trap_vector_115",
    ".quad trap_vector_116",
    ".quad trap_vector_117",
    ".quad trap_vector_118",
    ".quad trap_vector_119",
    ".quad trap_vector_120",
    ".quad trap_vector_121",
    ".quad trap_vector_122",
    ".quad trap_vector_123",
    ".quad trap_vector_124",
    ".quad trap_vector_125",
    ".quad trap_vector_126",
    ".quad trap_vector_127",
    ".quad trap_vector_128",
    ".quad trap_vector_129",
    ".quad trap_vector_130",
    ".quad trap_vector_131",
    ".quad trap_vector_132",
    ".quad trap_vector_133",
    ".quad trap_vector_134",
    ".quad trap_vector_135",
    ".quad trap_vector_136",
    ".quad trap_vector_137",
    ".quad trap_vector_138",
    ".quad trap_vector_139",
    ".quad trap_vector_140",
    ".quad trap_vector_141",
    ".quad trap_vector_142",
    ".quad trap_vector_143",
    ".quad trap_vector_144",
    ".quad trap_vector_145",
    ".quad trap_vector_146",
    ".quad trap_vector_147",
    ".quad trap_vector_148",
    ".quad trap_vector_149",
    ".quad trap_vector_150",
    ".quad trap_vector_151",
    ".quad trap_vector_152",
    ".quad trap_vector_153",
    ".quad trap_vector_154",
    ".quad trap_vector_155",
    ".quad trap_vector_156",
    ".quad trap_vector_157",
    ".quad trap_vector_158",
    ".quad trap_vector_159",
    ".quad trap_vector_160",
    ".quad trap_vector_161",
    ".quad trap_vector_162",
    ".quad trap_vector_163",
    ".quad trap_vector_164",
    ".quad trap_vector_165",
    ".quad trap_vector_166",
    ".quad trap_vector_167",
    ".quad trap_vector_168",
    ".quad trap_vector_169",
    ".quad trap_vector_170",
    ".quad trap_vector_171",
    ".quad trap_vector_172",
    ".quad trap_vector_173",
    ".quad trap_vector_174",
    ".quad trap_vector_175",
    ".quad trap_vector_176",
    ".quad trap_vector_177",
    ".quad trap_vector_178",
    ".quad trap_vector_179",
    ".quad trap_vector_180",
    ".quad trap_vector_181",
    ".quad trap_vector_182",
    ".quad trap_vector_183",
    ".quad trap_vector_184",
    ".quad trap_vector_185",
    ".quad trap_vector_186",
    ".quad trap_vector_187",
    ".quad trap_vector_188",
    ".quad trap_vector_189",
    ".quad trap_vector_190",
    ".quad trap_vector_191",
    ".quad trap_vector_192",
    ".quad trap_vector_193",
    ".quad trap_vector_194",
    ".quad trap_vector_195",
    ".quad trap_vector_196",
    ".quad trap_vector_197",
    ".quad trap_vector_198",
    ".quad trap_vector_199",
    ".quad trap_vector_200",
    ".quad trap_vector_201",
    ".quad trap_vector_202",
    ".quad trap_vector_203",
    ".quad trap_vector_204",
    ".quad trap_vector_205",
    ".quad trap_vector_206",
    ".quad trap_vector_207",
    ".quad trap_vector_208",
    ".quad trap_vector_209",
    ".quad trap_vector_210",
    ".quad trap_vector_211",
    ".quad trap_vector_212",
    ".quad trap_vector_213",
    ".quad trap_vector_214",
    ".quad trap_vector_215",
    ".quad trap_vector_216",
    ".quad trap_vector_217",
    ".quad trap_vector_218",
    ".quad trap_vector_219",
    ".quad trap_vector_220",
    ".quad trap_vector_221",
    ".quad trap_vector_222",
    ".quad trap_vector_223",
    ".quad trap_vector_224",
    ".quad trap_vector_225",
    ".quad trap_vector_226",
    ".quad trap_vector_227",
    ".quad trap_vector_228",
    ".quad trap_vector_229",
    ".quad trap_vector_230",
    ".quad trap_vector_231",
    ".quad trap_vector_232",
    ".quad trap_vector_233",
    ".quad trap_vector_234",
    ".quad trap_vector_235",
    ".quad trap_vector_236",
    ".quad trap_vector_237",
    ".quad trap_vector_238",
    ".quad trap_vector_239",
    ".quad trap_vector_240",
    ".quad trap_vector_241",
    ".quad trap_vector_242",
    ".quad trap_vector_243",
    ".quad trap_vector_244",
    ".quad trap_vector_245",
    ".quad trap_vector_246",
    ".quad trap_vector_247",
    ".quad trap_vector_248",
    ".quad trap_vector_249",
    ".quad trap_vector_250",
    ".quad trap_vector_251",
    ".quad trap_vector_252",
    ".quad trap_vector_253",
    ".quad trap_vector_254",
    ".quad trap_vector_255",
    ".text",
    kdata = const KERNEL_DATA,
);


#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn frame_is_24_quadwords() {
        assert_eq!(size_of::<TrapFrame>(), 24 * 8);
    }

    #[test]
    fn software_saved_block_layout() {
        // Must match the trampoline push order exactly.
        assert_eq!(offset_of!(TrapFrame, es), 0);
        assert_eq!(offset_of!(TrapFrame, ds), 8);
        assert_eq!(offset_of!(TrapFrame, r15), 16);
        assert_eq!(offset_of!(TrapFrame, rax), 16 * 8);
    }

    #[test]
    fn stub_pushed_block_layout() {
        assert_eq!(offset_of!(TrapFrame, vector), 17 * 8);
        assert_eq!(offset_of!(TrapFrame, error_code), 18 * 8);
    }

    #[test]
    fn hardware_frame_layout() {
        assert_eq!(offset_of!(TrapFrame, rip), 19 * 8);
        assert_eq!(offset_of!(TrapFrame, cs), 20 * 8);
        assert_eq!(offset_of!(TrapFrame, rflags), 21 * 8);
        assert_eq!(offset_of!(TrapFrame, rsp), 22 * 8);
        assert_eq!(offset_of!(TrapFrame, ss), 23 * 8);
    }

    #[test]
    fn syscall_argument_registers() {
        // Arguments travel in rdi, rsi, rdx; the number and return in rax.
        assert_eq!(offset_of!(TrapFrame, rdi), 10 * 8);
        assert_eq!(offset_of!(TrapFrame, rsi), 11 * 8);
        assert_eq!(offset_of!(TrapFrame, rdx), 13 * 8);
    }
}
