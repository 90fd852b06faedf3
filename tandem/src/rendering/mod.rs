pub mod draw_call;
pub mod error;
pub mod handle;
pub mod renderer;
pub mod shader_program;
pub mod state;
pub mod static_mesh;
pub mod uniform;
pub mod vertex;

pub use draw_call::DrawCall;
pub use error::DispatchError;
pub use handle::{
    BufferHandle, GpuHandle, GpuResource, ObjectId, ProgramHandle, ShaderHandle,
    VertexArrayHandle,
};
pub use renderer::Renderer;
pub use shader_program::{ObjectStatus, ShaderProgram, ShaderStage};
pub use state::{
    ActivatedParameters, ClearFlags, PolygonMode, RenderState, StateChange, Viewport,
};
pub use static_mesh::{StaticMesh, bytes_of};
pub use uniform::{UniformMap, UniformValue};
pub use vertex::{
    ArithmeticType, BufferTarget, BufferUsage, PrimitiveType, VertexAttribute,
    VertexAttributeName, VertexFormat,
};
