use crate::dispatch::future::SharedFuture;
use crate::dispatch::instruction::{AttributeBuffers, QueueKind};
use crate::rendering::draw_call::DrawCall;
use crate::rendering::error::DispatchError;
use crate::rendering::handle::{BufferHandle, ProgramHandle, VertexArrayHandle};
use crate::rendering::renderer::Renderer;
use crate::rendering::state::RenderState;
use crate::rendering::uniform::UniformMap;
use crate::rendering::vertex::{
    BufferTarget, BufferUsage, PrimitiveType, VertexAttributeName, VertexFormat,
};
use bytemuck::Pod;
use std::sync::Arc;

/// Copies typed vertex or index data into a byte blob for upload.
pub fn bytes_of<T: Pod>(data: &[T]) -> Arc<[u8]> {
    Arc::from(bytemuck::cast_slice::<T, u8>(data))
}

/// Geometry uploaded once and drawn many times.
///
/// Attribute and index data go through the resource queue, the vertex array
/// is set up and drawn on the rendering queue.
#[derive(Debug, Clone)]
pub struct StaticMesh {
    vertex_array: SharedFuture<VertexArrayHandle>,
    format: VertexFormat,
    vertex_count: u32,
}

impl StaticMesh {
    pub fn init(
        renderer: &Renderer,
        format: VertexFormat,
        attributes: impl IntoIterator<Item = (VertexAttributeName, Arc<[u8]>)>,
        indices: Option<Arc<[u8]>>,
        vertex_count: u32,
    ) -> Result<Self, DispatchError> {
        let mut attribute_buffers = AttributeBuffers::new();
        for (name, data) in attributes {
            let buffer = upload(renderer, BufferTarget::Array, data)?;
            attribute_buffers.push((name, buffer));
        }

        let index_buffer = match indices {
            Some(data) => Some(upload(renderer, BufferTarget::ElementArray, data)?),
            None => None,
        };

        let vertex_array = renderer.gen_vertex_array()?;
        let vertex_array = renderer.set_vertex_array_layout(
            &vertex_array,
            format.clone(),
            attribute_buffers,
            index_buffer,
        )?;

        Ok(Self {
            vertex_array,
            format,
            vertex_count,
        })
    }

    pub fn vertex_array(&self) -> &SharedFuture<VertexArrayHandle> {
        &self.vertex_array
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        renderer: &Renderer,
        program: &SharedFuture<ProgramHandle>,
        uniforms: UniformMap,
        state: RenderState,
        primitive: PrimitiveType,
        first: u32,
        count: u32,
    ) -> Result<(), DispatchError> {
        let call = DrawCall::builder()
            .vertex_array(self.vertex_array.clone())
            .program(program.clone())
            .uniforms(uniforms)
            .state(state)
            .primitive(primitive)
            .first(first)
            .count(count)
            .maybe_index_type(self.format.index_type)
            .build();

        renderer.draw_vertex_array(call)
    }
}

fn upload(
    renderer: &Renderer,
    target: BufferTarget,
    data: Arc<[u8]>,
) -> Result<SharedFuture<BufferHandle>, DispatchError> {
    let buffer = renderer.gen_buffer()?;
    renderer.buffer_data(
        QueueKind::Resource,
        &buffer,
        target,
        BufferUsage::StaticDraw,
        data.len(),
        Some(data),
    )
}
