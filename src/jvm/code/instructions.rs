//! AST of the JVM bytecode subset the optimizer scans and emits
//!
//! The representation is slightly different from the usual presentation:
//!
//!   - Instruction operands are generic, so the same enum serves both the
//!     symbolic form the analysis works on ([`ProgramInstruction`]) and the
//!     constant-pool-indexed form that gets serialized
//!     ([`SerializableInstruction`]).
//!
//!   - Branching forms carry [`Label`]s and live in the same enum as
//!     straight-line instructions; the emitter tracks label placement
//!     alongside its append-only buffer.
//!
//!   - Instructions the optimizer never matches on and never emits are simply
//!     omitted.

use crate::jvm::descriptors::{FieldType, MethodDescriptor};
use crate::jvm::names::{BinaryName, UnqualifiedName};
use crate::util::Width;

/// How a method gets invoked
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Label synthesized by the code emitter
///
/// Labels don't exist in the serialized bytecode; they are resolved to byte
/// offsets during assembly.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Label(pub u32);

/// Unary branch conditions
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Comparison {
    /// `ifeq` - branch if the `int` on the stack is zero
    EqZero,
    /// `ifne` - branch if the `int` on the stack is not zero
    NeZero,
    /// `ifnull`
    Null,
    /// `ifnonnull`
    NonNull,
}

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction<Class, Constant, Field, Method> {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers both `ldc` and `ldc_w`
    Ldc2(Constant),
    ILoad(u16),
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IStore(u16),
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    Pop,
    Pop2,
    Dup,
    Swap,
    I2L,
    I2B,
    I2C,
    I2S,
    GetStatic(Field),
    PutStatic(Field),
    GetField(Field),
    PutField(Field),
    Invoke(InvokeType, Method),
    New(Class),
    CheckCast(Class),
    InstanceOf(Class),
    Goto(Label),
    If(Comparison, Label),
    LookupSwitch {
        default: Label,
        cases: Vec<(i32, Label)>,
    },
    Return,
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
}

impl<Class, Constant, Field, Method> Instruction<Class, Constant, Field, Method> {
    /// Map the operand types of the instruction
    ///
    /// The mapping functions share one mutable `context` (an instruction has
    /// at most one symbolic operand, so only one of them runs per call).
    pub fn map<Class2, Constant2, Field2, Method2, Ctx, E>(
        &self,
        context: &mut Ctx,
        map_class: impl Fn(&mut Ctx, &Class) -> Result<Class2, E>,
        map_constant: impl Fn(&mut Ctx, &Constant) -> Result<Constant2, E>,
        map_field: impl Fn(&mut Ctx, &Field) -> Result<Field2, E>,
        map_method: impl Fn(&mut Ctx, &Method) -> Result<Method2, E>,
    ) -> Result<Instruction<Class2, Constant2, Field2, Method2>, E> {
        use Instruction::*;
        Ok(match self {
            Nop => Nop,
            AConstNull => AConstNull,
            IConstM1 => IConstM1,
            IConst0 => IConst0,
            IConst1 => IConst1,
            IConst2 => IConst2,
            IConst3 => IConst3,
            IConst4 => IConst4,
            IConst5 => IConst5,
            BiPush(b) => BiPush(*b),
            SiPush(s) => SiPush(*s),
            Ldc(constant) => Ldc(map_constant(context, constant)?),
            Ldc2(constant) => Ldc2(map_constant(context, constant)?),
            ILoad(idx) => ILoad(*idx),
            LLoad(idx) => LLoad(*idx),
            FLoad(idx) => FLoad(*idx),
            DLoad(idx) => DLoad(*idx),
            ALoad(idx) => ALoad(*idx),
            IStore(idx) => IStore(*idx),
            LStore(idx) => LStore(*idx),
            FStore(idx) => FStore(*idx),
            DStore(idx) => DStore(*idx),
            AStore(idx) => AStore(*idx),
            Pop => Pop,
            Pop2 => Pop2,
            Dup => Dup,
            Swap => Swap,
            I2L => I2L,
            I2B => I2B,
            I2C => I2C,
            I2S => I2S,
            GetStatic(field) => GetStatic(map_field(context, field)?),
            PutStatic(field) => PutStatic(map_field(context, field)?),
            GetField(field) => GetField(map_field(context, field)?),
            PutField(field) => PutField(map_field(context, field)?),
            Invoke(typ, method) => Invoke(*typ, map_method(context, method)?),
            New(class) => New(map_class(context, class)?),
            CheckCast(class) => CheckCast(map_class(context, class)?),
            InstanceOf(class) => InstanceOf(map_class(context, class)?),
            Goto(label) => Goto(*label),
            If(comparison, label) => If(*comparison, *label),
            LookupSwitch { default, cases } => LookupSwitch {
                default: *default,
                cases: cases.clone(),
            },
            Return => Return,
            IReturn => IReturn,
            LReturn => LReturn,
            FReturn => FReturn,
            DReturn => DReturn,
            AReturn => AReturn,
        })
    }
}

/// A loadable constant, in symbolic form
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(BinaryName),
}

impl Width for ConstantValue {
    fn width(&self) -> usize {
        match self {
            ConstantValue::Long(_) | ConstantValue::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Symbolic reference to a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Class declaring the field
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Symbolic reference to a method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Class declaring the method
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Instructions as they appear in analyzed and freshly generated method bodies
pub type ProgramInstruction = Instruction<BinaryName, ConstantValue, FieldRef, MethodRef>;

impl ProgramInstruction {
    /// Net change this instruction makes to the operand stack height, in slots
    ///
    /// Returns `(popped, pushed)`. This is enough for the emitter's
    /// `max_stack` bookkeeping; it is not a verifier.
    pub fn stack_effect(&self) -> (usize, usize) {
        use Instruction::*;
        match self {
            Nop | I2B | I2C | I2S => (0, 0),
            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | BiPush(_) | SiPush(_) => (0, 1),
            Ldc(constant) | Ldc2(constant) => (0, constant.width()),
            ILoad(_) | FLoad(_) | ALoad(_) => (0, 1),
            LLoad(_) | DLoad(_) => (0, 2),
            IStore(_) | FStore(_) | AStore(_) => (1, 0),
            LStore(_) | DStore(_) => (2, 0),
            Pop => (1, 0),
            Pop2 => (2, 0),
            Dup => (1, 2),
            Swap => (2, 2),
            I2L => (1, 2),
            GetStatic(field) => (0, field.descriptor.width()),
            PutStatic(field) => (field.descriptor.width(), 0),
            GetField(field) => (1, field.descriptor.width()),
            PutField(field) => (1 + field.descriptor.width(), 0),
            Invoke(typ, method) => {
                let receiver = match typ {
                    InvokeType::Static => 0,
                    _ => 1,
                };
                let popped = receiver + method.descriptor.parameter_length();
                let pushed = method
                    .descriptor
                    .return_type
                    .as_ref()
                    .map_or(0, |ret| ret.width());
                (popped, pushed)
            }
            New(_) => (0, 1),
            CheckCast(_) | InstanceOf(_) => (1, 1),
            Goto(_) => (0, 0),
            If(_, _) => (1, 0),
            LookupSwitch { .. } => (1, 0),
            Return => (0, 0),
            IReturn | FReturn | AReturn => (1, 0),
            LReturn | DReturn => (2, 0),
        }
    }

    /// Does control flow fall through to the next instruction?
    pub fn falls_through(&self) -> bool {
        use Instruction::*;
        !matches!(
            self,
            Goto(_)
                | LookupSwitch { .. }
                | Return
                | IReturn
                | LReturn
                | FReturn
                | DReturn
                | AReturn
        )
    }
}

/// Instructions whose operands have been interned into a constants pool
pub type SerializableInstruction = Instruction<
    ClassConstantIndex,
    ConstantIndex,
    FieldRefConstantIndex,
    MethodRefConstantIndex,
>;

/// Index into the constant pool
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ConstantIndex(pub u16);

/// Index into the constant pool of a `CONSTANT_Utf8_info`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Utf8ConstantIndex(pub u16);

/// Index into the constant pool of a `CONSTANT_Class_info`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassConstantIndex(pub u16);

/// Index into the constant pool of a `CONSTANT_NameAndType_info`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NameAndTypeConstantIndex(pub u16);

/// Index into the constant pool of a `CONSTANT_Fieldref_info`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FieldRefConstantIndex(pub u16);

/// Index into the constant pool of a `CONSTANT_Methodref_info`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodRefConstantIndex(pub u16);

impl From<Utf8ConstantIndex> for ConstantIndex {
    fn from(idx: Utf8ConstantIndex) -> ConstantIndex {
        ConstantIndex(idx.0)
    }
}

impl From<ClassConstantIndex> for ConstantIndex {
    fn from(idx: ClassConstantIndex) -> ConstantIndex {
        ConstantIndex(idx.0)
    }
}

impl From<NameAndTypeConstantIndex> for ConstantIndex {
    fn from(idx: NameAndTypeConstantIndex) -> ConstantIndex {
        ConstantIndex(idx.0)
    }
}

impl From<FieldRefConstantIndex> for ConstantIndex {
    fn from(idx: FieldRefConstantIndex) -> ConstantIndex {
        ConstantIndex(idx.0)
    }
}

impl From<MethodRefConstantIndex> for ConstantIndex {
    fn from(idx: MethodRefConstantIndex) -> ConstantIndex {
        ConstantIndex(idx.0)
    }
}
