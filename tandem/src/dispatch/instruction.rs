//! The instruction set workers execute.
//!
//! Every instruction is an [`OpCode`] plus a parameter payload. Payloads are
//! kept small so they fit a fixed instruction slot: anything bigger than a few
//! words (vertex formats, uniform maps, render states, raw bytes) is boxed or
//! reference counted. The size of an instruction as far as buffer accounting
//! is concerned is [`INSTRUCTION_HEADER_SIZE`] plus the size of its payload.

use crate::dispatch::future::{Promise, SharedFuture};
use crate::rendering::handle::{
    BufferHandle, ObjectId, ProgramHandle, ShaderHandle, VertexArrayHandle,
};
use crate::rendering::shader_program::{ObjectStatus, ShaderStage};
use crate::rendering::state::{ClearFlags, RenderState};
use crate::rendering::uniform::UniformMap;
use crate::rendering::vertex::{
    ArithmeticType, BufferTarget, BufferUsage, PrimitiveType, VertexAttributeName, VertexFormat,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use static_assertions::const_assert;
use std::fmt::{Debug, Display, Formatter};
use std::mem::{size_of, size_of_val};
use std::sync::Arc;

/// Bytes accounted for the opcode word in front of every payload.
pub const INSTRUCTION_HEADER_SIZE: usize = size_of::<u32>();

/// Upper bound on the payload of any single instruction.
pub const MAX_PARAMS_SIZE: usize = 64;

/// Size of one fixed slot in the resource ring buffer.
pub const INSTRUCTION_SLOT_SIZE: usize = INSTRUCTION_HEADER_SIZE + MAX_PARAMS_SIZE;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Rendering,
    Resource,
}

impl Display for QueueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueKind::Rendering => f.write_str("rendering"),
            QueueKind::Resource => f.write_str("resource"),
        }
    }
}

/// Which queue(s) may carry an opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Route {
    Rendering,
    Resource,
    Either,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum OpCode {
    GenBuffer,
    DeleteBuffer,
    BufferData,
    GenVertexArray,
    DeleteVertexArray,
    SetVertexArrayLayout,
    GenShader,
    DeleteShader,
    CompileShader,
    ShaderStatus,
    GenShaderProgram,
    DeleteShaderProgram,
    LinkShaderProgram,
    ShaderProgramStatus,
    DrawVertexArray,
    Clear,
    SwapBuffers,
    Quit,
}

impl OpCode {
    pub const fn route(self) -> Route {
        match self {
            OpCode::GenBuffer
            | OpCode::DeleteBuffer
            | OpCode::GenShader
            | OpCode::DeleteShader
            | OpCode::CompileShader
            | OpCode::ShaderStatus
            | OpCode::GenShaderProgram
            | OpCode::DeleteShaderProgram
            | OpCode::LinkShaderProgram
            | OpCode::ShaderProgramStatus => Route::Resource,

            OpCode::GenVertexArray
            | OpCode::DeleteVertexArray
            | OpCode::SetVertexArrayLayout
            | OpCode::DrawVertexArray
            | OpCode::SwapBuffers => Route::Rendering,

            OpCode::BufferData | OpCode::Clear | OpCode::Quit => Route::Either,
        }
    }

    pub const fn accepts(self, queue: QueueKind) -> bool {
        matches!(
            (self.route(), queue),
            (Route::Either, _)
                | (Route::Rendering, QueueKind::Rendering)
                | (Route::Resource, QueueKind::Resource)
        )
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

pub struct GenBufferParams {
    pub promise: Promise<BufferHandle>,
}

/// Only handles issue deletions, so this can't be built outside the crate.
pub struct DeleteObjectParams {
    pub(crate) id: ObjectId,
}

impl DeleteObjectParams {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

pub struct BufferDataParams {
    pub promise: Promise<BufferHandle>,
    pub buffer: SharedFuture<BufferHandle>,
    pub target: BufferTarget,
    pub usage: BufferUsage,
    pub size: usize,
    /// `None` allocates `size` bytes of uninitialised storage.
    pub data: Option<Arc<[u8]>>,
}

pub struct GenVertexArrayParams {
    pub promise: Promise<VertexArrayHandle>,
}

pub type AttributeBuffers = Vec<(VertexAttributeName, SharedFuture<BufferHandle>)>;

pub struct SetVertexArrayLayoutParams {
    pub promise: Promise<VertexArrayHandle>,
    pub vertex_array: SharedFuture<VertexArrayHandle>,
    pub format: Box<VertexFormat>,
    pub attribute_buffers: Box<AttributeBuffers>,
    pub index_buffer: Option<SharedFuture<BufferHandle>>,
}

pub struct GenShaderParams {
    pub promise: Promise<ShaderHandle>,
    pub stage: ShaderStage,
}

pub struct CompileShaderParams {
    pub promise: Promise<ShaderHandle>,
    pub shader: SharedFuture<ShaderHandle>,
    pub source: Arc<str>,
}

pub struct ShaderStatusParams {
    pub promise: Promise<ObjectStatus>,
    pub shader: SharedFuture<ShaderHandle>,
}

pub struct GenShaderProgramParams {
    pub promise: Promise<ProgramHandle>,
}

pub struct LinkShaderProgramParams {
    pub promise: Promise<ProgramHandle>,
    pub program: SharedFuture<ProgramHandle>,
    pub vertex_shader: SharedFuture<ShaderHandle>,
    pub fragment_shader: SharedFuture<ShaderHandle>,
}

pub struct ShaderProgramStatusParams {
    pub promise: Promise<ObjectStatus>,
    pub program: SharedFuture<ProgramHandle>,
}

pub struct DrawVertexArrayParams {
    pub vertex_array: SharedFuture<VertexArrayHandle>,
    pub program: SharedFuture<ProgramHandle>,
    pub uniforms: Box<UniformMap>,
    pub state: Box<RenderState>,
    pub primitive: PrimitiveType,
    pub index_type: Option<ArithmeticType>,
    pub first: u32,
    pub count: u32,
}

pub struct ClearParams {
    pub mask: ClearFlags,
}

const_assert!(size_of::<GenBufferParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<DeleteObjectParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<BufferDataParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<GenVertexArrayParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<SetVertexArrayLayoutParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<GenShaderParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<CompileShaderParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<ShaderStatusParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<GenShaderProgramParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<LinkShaderProgramParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<ShaderProgramStatusParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<DrawVertexArrayParams>() <= MAX_PARAMS_SIZE);
const_assert!(size_of::<ClearParams>() <= MAX_PARAMS_SIZE);

pub enum Instruction {
    GenBuffer(GenBufferParams),
    DeleteBuffer(DeleteObjectParams),
    BufferData(BufferDataParams),
    GenVertexArray(GenVertexArrayParams),
    DeleteVertexArray(DeleteObjectParams),
    SetVertexArrayLayout(SetVertexArrayLayoutParams),
    GenShader(GenShaderParams),
    DeleteShader(DeleteObjectParams),
    CompileShader(CompileShaderParams),
    ShaderStatus(ShaderStatusParams),
    GenShaderProgram(GenShaderProgramParams),
    DeleteShaderProgram(DeleteObjectParams),
    LinkShaderProgram(LinkShaderProgramParams),
    ShaderProgramStatus(ShaderProgramStatusParams),
    DrawVertexArray(DrawVertexArrayParams),
    Clear(ClearParams),
    SwapBuffers,
    Quit,
}

impl Instruction {
    pub const fn opcode(&self) -> OpCode {
        match self {
            Instruction::GenBuffer(_) => OpCode::GenBuffer,
            Instruction::DeleteBuffer(_) => OpCode::DeleteBuffer,
            Instruction::BufferData(_) => OpCode::BufferData,
            Instruction::GenVertexArray(_) => OpCode::GenVertexArray,
            Instruction::DeleteVertexArray(_) => OpCode::DeleteVertexArray,
            Instruction::SetVertexArrayLayout(_) => OpCode::SetVertexArrayLayout,
            Instruction::GenShader(_) => OpCode::GenShader,
            Instruction::DeleteShader(_) => OpCode::DeleteShader,
            Instruction::CompileShader(_) => OpCode::CompileShader,
            Instruction::ShaderStatus(_) => OpCode::ShaderStatus,
            Instruction::GenShaderProgram(_) => OpCode::GenShaderProgram,
            Instruction::DeleteShaderProgram(_) => OpCode::DeleteShaderProgram,
            Instruction::LinkShaderProgram(_) => OpCode::LinkShaderProgram,
            Instruction::ShaderProgramStatus(_) => OpCode::ShaderProgramStatus,
            Instruction::DrawVertexArray(_) => OpCode::DrawVertexArray,
            Instruction::Clear(_) => OpCode::Clear,
            Instruction::SwapBuffers => OpCode::SwapBuffers,
            Instruction::Quit => OpCode::Quit,
        }
    }

    pub fn params_size(&self) -> usize {
        match self {
            Instruction::GenBuffer(p) => size_of_val(p),
            Instruction::DeleteBuffer(p)
            | Instruction::DeleteVertexArray(p)
            | Instruction::DeleteShader(p)
            | Instruction::DeleteShaderProgram(p) => size_of_val(p),
            Instruction::BufferData(p) => size_of_val(p),
            Instruction::GenVertexArray(p) => size_of_val(p),
            Instruction::SetVertexArrayLayout(p) => size_of_val(p),
            Instruction::GenShader(p) => size_of_val(p),
            Instruction::CompileShader(p) => size_of_val(p),
            Instruction::ShaderStatus(p) => size_of_val(p),
            Instruction::GenShaderProgram(p) => size_of_val(p),
            Instruction::LinkShaderProgram(p) => size_of_val(p),
            Instruction::ShaderProgramStatus(p) => size_of_val(p),
            Instruction::DrawVertexArray(p) => size_of_val(p),
            Instruction::Clear(p) => size_of_val(p),
            Instruction::SwapBuffers | Instruction::Quit => 0,
        }
    }

    /// Bytes this instruction occupies in a queue buffer.
    pub fn encoded_size(&self) -> usize {
        INSTRUCTION_HEADER_SIZE + self.params_size()
    }

    pub(crate) fn delete_buffer(id: ObjectId) -> Self {
        Instruction::DeleteBuffer(DeleteObjectParams { id })
    }

    pub(crate) fn delete_vertex_array(id: ObjectId) -> Self {
        Instruction::DeleteVertexArray(DeleteObjectParams { id })
    }

    pub(crate) fn delete_shader(id: ObjectId) -> Self {
        Instruction::DeleteShader(DeleteObjectParams { id })
    }

    pub(crate) fn delete_shader_program(id: ObjectId) -> Self {
        Instruction::DeleteShaderProgram(DeleteObjectParams { id })
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::DeleteBuffer(p)
            | Instruction::DeleteVertexArray(p)
            | Instruction::DeleteShader(p)
            | Instruction::DeleteShaderProgram(p) => {
                write!(f, "{}({})", self.opcode(), p.id)
            }
            Instruction::BufferData(p) => {
                write!(f, "BufferData({:?}, {} bytes)", p.target, p.size)
            }
            Instruction::DrawVertexArray(p) => {
                write!(f, "DrawVertexArray({:?}, {}..+{})", p.primitive, p.first, p.count)
            }
            Instruction::Clear(p) => write!(f, "Clear({:?})", p.mask),
            _ => Display::fmt(&self.opcode(), f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_le;

    #[test]
    fn opcodes_round_trip_through_their_byte() {
        for byte in 0..=u8::from(OpCode::Quit) {
            let op = OpCode::try_from(byte).unwrap();
            assert_eq!(u8::from(op), byte);
        }
        assert!(OpCode::try_from(u8::from(OpCode::Quit) + 1).is_err());
    }

    #[test]
    fn routing_table() {
        assert!(OpCode::GenBuffer.accepts(QueueKind::Resource));
        assert!(!OpCode::GenBuffer.accepts(QueueKind::Rendering));
        assert!(OpCode::DrawVertexArray.accepts(QueueKind::Rendering));
        assert!(!OpCode::DrawVertexArray.accepts(QueueKind::Resource));
        assert!(!OpCode::SwapBuffers.accepts(QueueKind::Resource));
        assert!(OpCode::LinkShaderProgram.accepts(QueueKind::Resource));
        assert!(!OpCode::SetVertexArrayLayout.accepts(QueueKind::Resource));

        for op in [OpCode::BufferData, OpCode::Clear, OpCode::Quit] {
            assert!(op.accepts(QueueKind::Rendering));
            assert!(op.accepts(QueueKind::Resource));
        }
    }

    #[test]
    fn encoded_size_is_header_plus_payload() {
        assert_eq!(Instruction::Quit.encoded_size(), INSTRUCTION_HEADER_SIZE);

        let delete = Instruction::delete_buffer(9);
        assert_eq!(
            delete.encoded_size(),
            INSTRUCTION_HEADER_SIZE + size_of::<DeleteObjectParams>()
        );
        assert_le!(delete.encoded_size(), INSTRUCTION_SLOT_SIZE);
    }

    #[test]
    fn debug_shows_opcode() {
        assert_eq!(format!("{:?}", Instruction::delete_shader(3)), "DeleteShader(3)");
        assert_eq!(format!("{:?}", Instruction::SwapBuffers), "SwapBuffers");
    }
}
