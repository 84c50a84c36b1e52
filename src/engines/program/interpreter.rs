use super::instruction::{Instruction, Mode, Operation};
use super::memory::SharedMemory;
use rand::Rng;

/// Replace non-finite results: NaN becomes 0, infinities saturate.
pub fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        f64::MIN
    } else {
        value
    }
}

/// Run `instructions` against `input`, mutating `registers` in place.
///
/// Returns register 0 after the last instruction. Memory operations leave the
/// destination untouched when no memory is attached. `rng` only feeds the
/// memory-write row draw.
pub fn execute<R: Rng>(
    instructions: &[Instruction],
    input: &[f64],
    registers: &mut [f64],
    memory: Option<&SharedMemory>,
    rng: &mut R,
) -> f64 {
    if registers.is_empty() {
        return 0.0;
    }
    let reg_count = registers.len();

    for inst in instructions {
        let y = match inst.mode {
            Mode::Register => registers[inst.src % reg_count],
            Mode::Input if input.is_empty() => 0.0,
            Mode::Input => input[inst.src % input.len()],
        };
        let dest = inst.dest % reg_count;
        let x = registers[dest];

        let result = match inst.op {
            Operation::Add => x + y,
            Operation::Sub => x - y,
            Operation::Double => x * 2.0,
            Operation::Half => x / 2.0,
            Operation::ConditionalNegate => {
                if x < y {
                    -x
                } else {
                    x
                }
            }
            Operation::Cos => y.cos(),
            Operation::Log => {
                if y > 0.0 {
                    y.ln()
                } else {
                    x
                }
            }
            Operation::Exp => y.exp(),
            Operation::MemoryRead => match memory {
                Some(mem) => mem.read(inst.src, inst.dest),
                None => x,
            },
            Operation::MemoryWrite => {
                if let Some(mem) = memory {
                    mem.write(registers, rng);
                }
                x
            }
        };

        registers[dest] = clamp(result);
    }

    registers[0]
}
