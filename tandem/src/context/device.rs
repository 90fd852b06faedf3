use crate::rendering::handle::ObjectId;
use crate::rendering::shader_program::{ObjectStatus, ShaderStage};
use crate::rendering::state::{ClearFlags, StateChange};
use crate::rendering::vertex::{
    ArithmeticType, BufferTarget, BufferUsage, PrimitiveType, VertexAttribute,
};
use snafu::Snafu;

/// Errors the device queues up instead of failing the call that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub))]
pub enum DeviceError {
    #[snafu(display("Invalid {kind} name {id}"))]
    InvalidName { kind: &'static str, id: ObjectId },

    #[snafu(display("Invalid operation: {reason}"))]
    InvalidOperation { reason: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Copy through the regular data call.
    Direct,
    /// Write through a mapped pointer.
    Mapped,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferUpload<'a> {
    pub buffer: ObjectId,
    pub target: BufferTarget,
    pub usage: BufferUsage,
    pub size: usize,
    pub data: Option<&'a [u8]>,
    pub strategy: UploadStrategy,
}

/// One enabled attribute of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub location: u32,
    pub buffer: ObjectId,
    pub attribute: VertexAttribute,
}

/// Issued once the program's uniforms and the render state are in place.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand {
    pub program: ObjectId,
    pub vertex_array: ObjectId,
    pub primitive: PrimitiveType,
    pub index_type: Option<ArithmeticType>,
    pub first: u32,
    pub count: u32,
}

/// GPU calls available to a worker once its context is current.
pub trait GraphicsDevice: Send {
    fn gen_buffer(&mut self) -> ObjectId;
    fn delete_buffer(&mut self, buffer: ObjectId);
    fn buffer_data(&mut self, upload: BufferUpload<'_>);

    fn gen_vertex_array(&mut self) -> ObjectId;
    fn delete_vertex_array(&mut self, vertex_array: ObjectId);
    fn set_vertex_array_layout(
        &mut self,
        vertex_array: ObjectId,
        bindings: &[AttributeBinding],
        index_buffer: Option<ObjectId>,
    );

    fn create_shader(&mut self, stage: ShaderStage) -> ObjectId;
    fn delete_shader(&mut self, shader: ObjectId);
    fn compile_shader(&mut self, shader: ObjectId, source: &str);
    fn shader_status(&mut self, shader: ObjectId) -> ObjectStatus;

    fn create_program(&mut self) -> ObjectId;
    fn delete_program(&mut self, program: ObjectId);
    /// Attaches `shaders`, binds the fixed attribute locations and links.
    fn link_program(
        &mut self,
        program: ObjectId,
        shaders: &[ObjectId],
        attribute_locations: &[(&'static str, u32)],
    );
    fn program_status(&mut self, program: ObjectId) -> ObjectStatus;

    /// Uploads a uniform of `program`, as raw floats in column-major order.
    fn set_uniform(&mut self, program: ObjectId, name: &str, value: &[f32]);
    fn apply_state(&mut self, change: StateChange);
    fn draw(&mut self, command: &DrawCommand);
    fn clear(&mut self, mask: ClearFlags);

    /// Pops the oldest queued error, if any.
    fn poll_error(&mut self) -> Option<DeviceError>;
}
