use super::constants::ConstantsPool;
use super::instructions::{
    Comparison, ConstantValue, FieldRef, Instruction, InvokeType, Label, MethodRef,
    ProgramInstruction, SerializableInstruction,
};
use crate::jvm::names::BinaryName;
use crate::jvm::Error;
use crate::util::Offset;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

/// Finished method body
///
/// Bodies scanned by the analysis passes are plain instruction vectors (built
/// with [`Code::of`]); bodies produced by code generation come out of a
/// [`CodeEmitter`] with accurate frame sizes and placed labels.
#[derive(Clone, Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    instructions: Vec<ProgramInstruction>,
    label_indices: HashMap<Label, usize>,
}

impl Code {
    /// Wrap an existing instruction stream
    ///
    /// Frame sizes are estimated with a straight-line pass; they only matter
    /// if the body is re-assembled, which never happens to bodies the
    /// optimizer merely analyzes.
    pub fn of(instructions: Vec<ProgramInstruction>) -> Code {
        let mut max_locals: usize = 0;
        let mut stack: usize = 0;
        let mut max_stack: usize = 0;

        for insn in &instructions {
            use Instruction::*;
            let local_end = match insn {
                ILoad(idx) | FLoad(idx) | ALoad(idx) | IStore(idx) | FStore(idx)
                | AStore(idx) => Some(*idx as usize + 1),
                LLoad(idx) | DLoad(idx) | LStore(idx) | DStore(idx) => Some(*idx as usize + 2),
                _ => None,
            };
            if let Some(end) = local_end {
                max_locals = max_locals.max(end);
            }

            let (popped, pushed) = insn.stack_effect();
            stack = stack.saturating_sub(popped) + pushed;
            max_stack = max_stack.max(stack);
        }

        Code {
            max_stack: max_stack as u16,
            max_locals: max_locals as u16,
            instructions,
            label_indices: HashMap::new(),
        }
    }

    /// Instructions in the body
    pub fn instructions(&self) -> &[ProgramInstruction] {
        &self.instructions
    }

    /// Lower the body to serialized JVM bytecode
    ///
    /// Symbolic operands are interned into `pool` and labels are resolved to
    /// relative byte offsets. Branches further than a 16-bit offset are
    /// rejected rather than re-encoded as `goto_w` - the optimizer's generated
    /// bodies are far too small to ever need wide jumps.
    pub fn assemble(&self, pool: &mut ConstantsPool) -> Result<Vec<u8>, Error> {
        // Intern all symbolic operands first
        let mut serializable: Vec<SerializableInstruction> = vec![];
        let mut interface_counts: Vec<u8> = vec![];
        for insn in &self.instructions {
            let lowered = insn.map(
                pool,
                |pool, class: &BinaryName| pool.get_class(class),
                |pool, constant: &ConstantValue| pool.get_constant_value(constant),
                |pool, field: &FieldRef| pool.get_field_ref(field),
                |pool, method: &MethodRef| pool.get_method_ref(method),
            )?;
            let count = match insn {
                Instruction::Invoke(InvokeType::Interface, method) => {
                    1 + method.descriptor.parameter_length() as u8
                }
                _ => 0,
            };
            serializable.push(lowered);
            interface_counts.push(count);
        }

        // First pass: compute the byte offset of every instruction
        let mut offsets: Vec<usize> = Vec::with_capacity(serializable.len());
        let mut offset = 0usize;
        for insn in &serializable {
            offsets.push(offset);
            offset += Self::byte_size(insn, offset);
        }
        let code_length = offset;

        let label_offset = |label: Label| -> Result<usize, Error> {
            match self.label_indices.get(&label) {
                Some(idx) if *idx == offsets.len() => Ok(code_length),
                Some(idx) => Ok(offsets[*idx]),
                None => Err(Error::UnplacedLabel(label)),
            }
        };

        // Second pass: write out the bytes
        let mut bytes: Vec<u8> = Vec::with_capacity(code_length);
        for (idx, insn) in serializable.iter().enumerate() {
            let at = offsets[idx];
            use Instruction::*;
            match insn {
                Nop => bytes.write_u8(0x00)?,
                AConstNull => bytes.write_u8(0x01)?,
                IConstM1 => bytes.write_u8(0x02)?,
                IConst0 => bytes.write_u8(0x03)?,
                IConst1 => bytes.write_u8(0x04)?,
                IConst2 => bytes.write_u8(0x05)?,
                IConst3 => bytes.write_u8(0x06)?,
                IConst4 => bytes.write_u8(0x07)?,
                IConst5 => bytes.write_u8(0x08)?,
                BiPush(b) => {
                    bytes.write_u8(0x10)?;
                    bytes.write_i8(*b)?;
                }
                SiPush(s) => {
                    bytes.write_u8(0x11)?;
                    bytes.write_i16::<BigEndian>(*s)?;
                }
                Ldc(constant) => {
                    if constant.0 <= u8::MAX as u16 {
                        bytes.write_u8(0x12)?;
                        bytes.write_u8(constant.0 as u8)?;
                    } else {
                        bytes.write_u8(0x13)?;
                        bytes.write_u16::<BigEndian>(constant.0)?;
                    }
                }
                Ldc2(constant) => {
                    bytes.write_u8(0x14)?;
                    bytes.write_u16::<BigEndian>(constant.0)?;
                }
                ILoad(idx) => Self::write_local(&mut bytes, 0x15, 0x1a, *idx)?,
                LLoad(idx) => Self::write_local(&mut bytes, 0x16, 0x1e, *idx)?,
                FLoad(idx) => Self::write_local(&mut bytes, 0x17, 0x22, *idx)?,
                DLoad(idx) => Self::write_local(&mut bytes, 0x18, 0x26, *idx)?,
                ALoad(idx) => Self::write_local(&mut bytes, 0x19, 0x2a, *idx)?,
                IStore(idx) => Self::write_local(&mut bytes, 0x36, 0x3b, *idx)?,
                LStore(idx) => Self::write_local(&mut bytes, 0x37, 0x3f, *idx)?,
                FStore(idx) => Self::write_local(&mut bytes, 0x38, 0x43, *idx)?,
                DStore(idx) => Self::write_local(&mut bytes, 0x39, 0x47, *idx)?,
                AStore(idx) => Self::write_local(&mut bytes, 0x3a, 0x4b, *idx)?,
                Pop => bytes.write_u8(0x57)?,
                Pop2 => bytes.write_u8(0x58)?,
                Dup => bytes.write_u8(0x59)?,
                Swap => bytes.write_u8(0x5f)?,
                I2L => bytes.write_u8(0x85)?,
                I2B => bytes.write_u8(0x91)?,
                I2C => bytes.write_u8(0x92)?,
                I2S => bytes.write_u8(0x93)?,
                GetStatic(field) => {
                    bytes.write_u8(0xb2)?;
                    bytes.write_u16::<BigEndian>(field.0)?;
                }
                PutStatic(field) => {
                    bytes.write_u8(0xb3)?;
                    bytes.write_u16::<BigEndian>(field.0)?;
                }
                GetField(field) => {
                    bytes.write_u8(0xb4)?;
                    bytes.write_u16::<BigEndian>(field.0)?;
                }
                PutField(field) => {
                    bytes.write_u8(0xb5)?;
                    bytes.write_u16::<BigEndian>(field.0)?;
                }
                Invoke(typ, method) => {
                    let opcode = match typ {
                        InvokeType::Virtual => 0xb6,
                        InvokeType::Special => 0xb7,
                        InvokeType::Static => 0xb8,
                        InvokeType::Interface => 0xb9,
                    };
                    bytes.write_u8(opcode)?;
                    bytes.write_u16::<BigEndian>(method.0)?;
                    if let InvokeType::Interface = typ {
                        bytes.write_u8(interface_counts[idx])?;
                        bytes.write_u8(0)?;
                    }
                }
                New(class) => {
                    bytes.write_u8(0xbb)?;
                    bytes.write_u16::<BigEndian>(class.0)?;
                }
                CheckCast(class) => {
                    bytes.write_u8(0xc0)?;
                    bytes.write_u16::<BigEndian>(class.0)?;
                }
                InstanceOf(class) => {
                    bytes.write_u8(0xc1)?;
                    bytes.write_u16::<BigEndian>(class.0)?;
                }
                Goto(label) => {
                    bytes.write_u8(0xa7)?;
                    Self::write_branch_offset(&mut bytes, at, label_offset(*label)?)?;
                }
                If(comparison, label) => {
                    let opcode = match comparison {
                        Comparison::EqZero => 0x99,
                        Comparison::NeZero => 0x9a,
                        Comparison::Null => 0xc6,
                        Comparison::NonNull => 0xc7,
                    };
                    bytes.write_u8(opcode)?;
                    Self::write_branch_offset(&mut bytes, at, label_offset(*label)?)?;
                }
                LookupSwitch { default, cases } => {
                    bytes.write_u8(0xab)?;
                    while bytes.len() % 4 != 0 {
                        bytes.write_u8(0)?;
                    }
                    let default_offset = label_offset(*default)? as i64 - at as i64;
                    bytes.write_i32::<BigEndian>(default_offset as i32)?;
                    bytes.write_i32::<BigEndian>(cases.len() as i32)?;
                    for (matched, target) in cases {
                        let target_offset = label_offset(*target)? as i64 - at as i64;
                        bytes.write_i32::<BigEndian>(*matched)?;
                        bytes.write_i32::<BigEndian>(target_offset as i32)?;
                    }
                }
                Return => bytes.write_u8(0xb1)?,
                IReturn => bytes.write_u8(0xac)?,
                LReturn => bytes.write_u8(0xad)?,
                FReturn => bytes.write_u8(0xae)?,
                DReturn => bytes.write_u8(0xaf)?,
                AReturn => bytes.write_u8(0xb0)?,
            }
        }

        Ok(bytes)
    }

    /// Serialized size of one instruction starting at byte offset `at`
    fn byte_size(insn: &SerializableInstruction, at: usize) -> usize {
        use Instruction::*;
        match insn {
            Nop | AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4
            | IConst5 | Pop | Pop2 | Dup | Swap | I2L | I2B | I2C | I2S | Return | IReturn
            | LReturn | FReturn | DReturn | AReturn => 1,
            BiPush(_) => 2,
            SiPush(_) => 3,
            Ldc(constant) => {
                if constant.0 <= u8::MAX as u16 {
                    2
                } else {
                    3
                }
            }
            Ldc2(_) => 3,
            ILoad(idx) | LLoad(idx) | FLoad(idx) | DLoad(idx) | ALoad(idx) | IStore(idx)
            | LStore(idx) | FStore(idx) | DStore(idx) | AStore(idx) => {
                if *idx <= 3 {
                    1
                } else if *idx <= u8::MAX as u16 {
                    2
                } else {
                    4 // `wide` prefix
                }
            }
            GetStatic(_) | PutStatic(_) | GetField(_) | PutField(_) => 3,
            Invoke(InvokeType::Interface, _) => 5,
            Invoke(_, _) => 3,
            New(_) | CheckCast(_) | InstanceOf(_) => 3,
            Goto(_) | If(_, _) => 3,
            LookupSwitch { cases, .. } => {
                let padding = (4 - (at + 1) % 4) % 4;
                1 + padding + 8 + 8 * cases.len()
            }
        }
    }

    fn write_local(bytes: &mut Vec<u8>, opcode: u8, short_form: u8, idx: u16) -> std::io::Result<()> {
        if idx <= 3 {
            bytes.write_u8(short_form + idx as u8)
        } else if idx <= u8::MAX as u16 {
            bytes.write_u8(opcode)?;
            bytes.write_u8(idx as u8)
        } else {
            bytes.write_u8(0xc4)?; // wide
            bytes.write_u8(opcode)?;
            bytes.write_u16::<BigEndian>(idx)
        }
    }

    fn write_branch_offset(bytes: &mut Vec<u8>, at: usize, target: usize) -> Result<(), Error> {
        let relative = target as i64 - at as i64;
        if relative < i16::MIN as i64 || relative > i16::MAX as i64 {
            return Err(Error::MethodCodeOverflow(Offset(at)));
        }
        bytes.write_i16::<BigEndian>(relative as i16)?;
        Ok(())
    }
}

/// Append-only builder for generated method bodies
///
/// Tracks a running operand-stack height so that the finished [`Code`] carries
/// a usable `max_stack`, and hands out fresh [`Label`]s for the little control
/// flow the generated adapters need. Emission order is placement order; a
/// label may be branched to before or after it is placed, but each label is
/// placed exactly once.
pub struct CodeEmitter {
    instructions: Vec<ProgramInstruction>,
    label_indices: HashMap<Label, usize>,
    referenced_labels: HashMap<Label, usize>,
    next_label: u32,
    max_locals: u16,
    cur_stack: Option<usize>,
    max_stack: usize,
}

impl CodeEmitter {
    /// Create an emitter for a method whose frame holds `max_locals` slots
    pub fn new(max_locals: u16) -> CodeEmitter {
        CodeEmitter {
            instructions: vec![],
            label_indices: HashMap::new(),
            referenced_labels: HashMap::new(),
            next_label: 0,
            max_locals,
            cur_stack: Some(0),
            max_stack: 0,
        }
    }

    /// Get a label not yet used in this method
    pub fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Mark the next emitted instruction as the target of `label`
    pub fn place_label(&mut self, label: Label) -> Result<(), Error> {
        if self.label_indices.contains_key(&label) {
            return Err(Error::DuplicateLabel(label));
        }
        self.label_indices.insert(label, self.instructions.len());

        // Entering via the label: recover the stack height recorded when the
        // label was first branched to
        let at_label = self.referenced_labels.get(&label).copied();
        self.cur_stack = match (self.cur_stack, at_label) {
            (Some(fall_through), _) => Some(fall_through),
            (None, recorded) => Some(recorded.unwrap_or(0)),
        };
        Ok(())
    }

    /// Append an instruction
    pub fn push_instruction(&mut self, insn: ProgramInstruction) -> Result<(), Error> {
        if let Some(stack) = self.cur_stack {
            let (popped, pushed) = insn.stack_effect();
            if popped > stack {
                return Err(Error::EmitterStackUnderflow(self.instructions.len()));
            }
            let after_pops = stack - popped;

            // Record the height every named target will start from
            let mut record = |label: &Label| {
                self.referenced_labels.entry(*label).or_insert(after_pops);
            };
            match &insn {
                Instruction::Goto(label) | Instruction::If(_, label) => record(label),
                Instruction::LookupSwitch { default, cases } => {
                    record(default);
                    for (_, target) in cases {
                        record(target);
                    }
                }
                _ => (),
            }

            let new_stack = after_pops + pushed;
            self.max_stack = self.max_stack.max(new_stack);
            self.cur_stack = if insn.falls_through() {
                Some(new_stack)
            } else {
                None
            };
        }
        self.instructions.push(insn);
        Ok(())
    }

    /// Push an `int` constant with the smallest encoding available
    pub fn const_int(&mut self, value: i32) -> Result<(), Error> {
        use Instruction::*;
        let insn = match value {
            -1 => IConstM1,
            0 => IConst0,
            1 => IConst1,
            2 => IConst2,
            3 => IConst3,
            4 => IConst4,
            5 => IConst5,
            _ if i8::MIN as i32 <= value && value <= i8::MAX as i32 => BiPush(value as i8),
            _ if i16::MIN as i32 <= value && value <= i16::MAX as i32 => SiPush(value as i16),
            _ => Ldc(ConstantValue::Integer(value)),
        };
        self.push_instruction(insn)
    }

    /// Push a constant string
    pub fn const_string(&mut self, string: &str) -> Result<(), Error> {
        self.push_instruction(Instruction::Ldc(ConstantValue::String(string.to_string())))
    }

    /// Push a `java/lang/Class` literal
    pub fn const_class(&mut self, class: &BinaryName) -> Result<(), Error> {
        self.push_instruction(Instruction::Ldc(ConstantValue::Class(class.clone())))
    }

    /// Invoke a method
    pub fn invoke(&mut self, typ: InvokeType, method: MethodRef) -> Result<(), Error> {
        self.push_instruction(Instruction::Invoke(typ, method))
    }

    /// Turn the emitter into finished code
    pub fn result(self) -> Result<Code, Error> {
        for label in self.referenced_labels.keys() {
            if !self.label_indices.contains_key(label) {
                return Err(Error::UnplacedLabel(*label));
            }
        }
        Ok(Code {
            max_stack: self.max_stack as u16,
            max_locals: self.max_locals,
            instructions: self.instructions,
            label_indices: self.label_indices,
        })
    }
}
