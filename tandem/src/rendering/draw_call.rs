use crate::dispatch::future::SharedFuture;
use crate::rendering::handle::{ProgramHandle, VertexArrayHandle};
use crate::rendering::state::RenderState;
use crate::rendering::uniform::UniformMap;
use crate::rendering::vertex::{ArithmeticType, PrimitiveType};
use bon::Builder;

/// Everything the rendering thread needs to issue one draw.
#[derive(Debug, Clone, Builder)]
pub struct DrawCall {
    pub vertex_array: SharedFuture<VertexArrayHandle>,
    pub program: SharedFuture<ProgramHandle>,
    #[builder(default)]
    pub uniforms: UniformMap,
    #[builder(default)]
    pub state: RenderState,
    #[builder(default = PrimitiveType::Triangles)]
    pub primitive: PrimitiveType,
    #[builder(default)]
    pub first: u32,
    pub count: u32,
    /// Draws indexed when set.
    pub index_type: Option<ArithmeticType>,
}
