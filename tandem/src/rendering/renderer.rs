//! The producer-facing side of the engine.
//!
//! Every operation builds an instruction and hands it to the dispatcher. None
//! of them wait for the GPU: results come back as futures, which can be passed
//! straight into further operations. The rendering thread resolves them when
//! it gets to the instruction that needs them.

use crate::config::{RendererConfig, RenderingMode};
use crate::context::WindowSystem;
use crate::dispatch::Dispatch;
use crate::dispatch::future::{Future, SharedFuture, channel};
use crate::dispatch::immediate::ImmediateDispatch;
use crate::dispatch::instruction::{
    AttributeBuffers, BufferDataParams, ClearParams, CompileShaderParams, DrawVertexArrayParams,
    GenBufferParams, GenShaderParams, GenShaderProgramParams, GenVertexArrayParams, Instruction,
    LinkShaderProgramParams, QueueKind, SetVertexArrayLayoutParams, ShaderProgramStatusParams,
    ShaderStatusParams,
};
use crate::dispatch::threaded::ThreadedDispatch;
use crate::rendering::draw_call::DrawCall;
use crate::rendering::error::DispatchError;
use crate::rendering::handle::{BufferHandle, ProgramHandle, ShaderHandle, VertexArrayHandle};
use crate::rendering::shader_program::{ObjectStatus, ShaderProgram, ShaderStage};
use crate::rendering::state::ClearFlags;
use crate::rendering::static_mesh::StaticMesh;
use crate::rendering::vertex::{BufferTarget, BufferUsage, VertexAttributeName, VertexFormat};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct Renderer {
    dispatch: Arc<dyn Dispatch>,
    config: RendererConfig,
}

impl Renderer {
    pub fn new(
        config: RendererConfig,
        window: Arc<dyn WindowSystem>,
    ) -> Result<Self, DispatchError> {
        info!("Creating {} renderer", config.mode);

        let dispatch: Arc<dyn Dispatch> = match config.mode {
            RenderingMode::Asynchronous => {
                ThreadedDispatch::new(&config, window)? as Arc<dyn Dispatch>
            }
            RenderingMode::Synchronous => {
                ImmediateDispatch::new(&config, window)? as Arc<dyn Dispatch>
            }
        };

        Ok(Self { dispatch, config })
    }

    pub fn mode(&self) -> RenderingMode {
        self.dispatch.mode()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Queues a prebuilt instruction.
    ///
    /// Fails with [`DispatchError::Misrouted`] if `queue` can't execute it.
    pub fn push(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError> {
        self.dispatch.push(queue, instruction)
    }

    pub fn gen_buffer(&self) -> Result<SharedFuture<BufferHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::GenBuffer(GenBufferParams { promise }))?;
        Ok(future.share())
    }

    /// Fills `buffer` with `size` bytes, taken from `data` if given.
    ///
    /// Uploads may go through either queue. The returned future resolves to
    /// the same buffer once the data is in place.
    pub fn buffer_data(
        &self,
        queue: QueueKind,
        buffer: &SharedFuture<BufferHandle>,
        target: BufferTarget,
        usage: BufferUsage,
        size: usize,
        data: Option<Arc<[u8]>>,
    ) -> Result<SharedFuture<BufferHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch.push(
            queue,
            Instruction::BufferData(BufferDataParams {
                promise,
                buffer: buffer.clone(),
                target,
                usage,
                size,
                data,
            }),
        )?;
        Ok(future.share())
    }

    pub fn gen_vertex_array(&self) -> Result<SharedFuture<VertexArrayHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_rendering(Instruction::GenVertexArray(GenVertexArrayParams { promise }))?;
        Ok(future.share())
    }

    /// Points the attributes of `vertex_array` at their buffers.
    ///
    /// The vertex array keeps every buffer it was given alive.
    pub fn set_vertex_array_layout(
        &self,
        vertex_array: &SharedFuture<VertexArrayHandle>,
        format: VertexFormat,
        attribute_buffers: impl IntoIterator<Item = (VertexAttributeName, SharedFuture<BufferHandle>)>,
        index_buffer: Option<SharedFuture<BufferHandle>>,
    ) -> Result<SharedFuture<VertexArrayHandle>, DispatchError> {
        let attribute_buffers: AttributeBuffers = attribute_buffers.into_iter().collect();
        let (promise, future) = channel();
        self.dispatch.push_rendering(Instruction::SetVertexArrayLayout(
            SetVertexArrayLayoutParams {
                promise,
                vertex_array: vertex_array.clone(),
                format: Box::new(format),
                attribute_buffers: Box::new(attribute_buffers),
                index_buffer,
            },
        ))?;
        Ok(future.share())
    }

    pub fn gen_shader(&self, stage: ShaderStage) -> Result<SharedFuture<ShaderHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::GenShader(GenShaderParams { promise, stage }))?;
        Ok(future.share())
    }

    pub fn compile_shader(
        &self,
        shader: &SharedFuture<ShaderHandle>,
        source: impl Into<Arc<str>>,
    ) -> Result<SharedFuture<ShaderHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::CompileShader(CompileShaderParams {
                promise,
                shader: shader.clone(),
                source: source.into(),
            }))?;
        Ok(future.share())
    }

    pub fn shader_status(
        &self,
        shader: &SharedFuture<ShaderHandle>,
    ) -> Result<Future<ObjectStatus>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::ShaderStatus(ShaderStatusParams {
                promise,
                shader: shader.clone(),
            }))?;
        Ok(future)
    }

    pub fn gen_shader_program(&self) -> Result<SharedFuture<ProgramHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::GenShaderProgram(GenShaderProgramParams { promise }))?;
        Ok(future.share())
    }

    /// Links both shaders into `program`, which keeps them alive from then on.
    pub fn link_shader_program(
        &self,
        program: &SharedFuture<ProgramHandle>,
        vertex_shader: &SharedFuture<ShaderHandle>,
        fragment_shader: &SharedFuture<ShaderHandle>,
    ) -> Result<SharedFuture<ProgramHandle>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::LinkShaderProgram(LinkShaderProgramParams {
                promise,
                program: program.clone(),
                vertex_shader: vertex_shader.clone(),
                fragment_shader: fragment_shader.clone(),
            }))?;
        Ok(future.share())
    }

    pub fn shader_program_status(
        &self,
        program: &SharedFuture<ProgramHandle>,
    ) -> Result<Future<ObjectStatus>, DispatchError> {
        let (promise, future) = channel();
        self.dispatch
            .push_resource(Instruction::ShaderProgramStatus(ShaderProgramStatusParams {
                promise,
                program: program.clone(),
            }))?;
        Ok(future)
    }

    pub fn draw_vertex_array(&self, call: DrawCall) -> Result<(), DispatchError> {
        self.dispatch
            .push_rendering(Instruction::DrawVertexArray(DrawVertexArrayParams {
                vertex_array: call.vertex_array,
                program: call.program,
                uniforms: Box::new(call.uniforms),
                state: Box::new(call.state),
                primitive: call.primitive,
                index_type: call.index_type,
                first: call.first,
                count: call.count,
            }))
    }

    pub fn clear(&self, mask: ClearFlags) -> Result<(), DispatchError> {
        self.dispatch
            .push_rendering(Instruction::Clear(ClearParams { mask }))
    }

    /// Presents the frame and ends it.
    pub fn swap_buffers(&self) -> Result<(), DispatchError> {
        self.dispatch.swap_buffers()
    }

    /// Ends the frame without presenting it.
    ///
    /// Blocks while the rendering thread is still busy with the previous frame.
    #[instrument(skip_all)]
    pub fn swap_rendering_queues(&self) -> Result<(), DispatchError> {
        self.dispatch.swap_rendering_queues()
    }

    /// Ends the frame and waits until it was rendered and the resource queue
    /// ran dry.
    #[instrument(skip_all)]
    pub fn flush(&self) -> Result<(), DispatchError> {
        self.dispatch.flush()
    }

    /// Executes everything still queued and stops the workers. Later calls
    /// fail with [`DispatchError::ShutDown`]. Also happens on drop.
    pub fn shutdown(&self) {
        self.dispatch.shutdown();
    }

    pub fn create_static_mesh(
        &self,
        format: VertexFormat,
        attributes: impl IntoIterator<Item = (VertexAttributeName, Arc<[u8]>)>,
        indices: Option<Arc<[u8]>>,
        vertex_count: u32,
    ) -> Result<StaticMesh, DispatchError> {
        StaticMesh::init(self, format, attributes, indices, vertex_count)
    }

    pub fn create_shader_program(
        &self,
        vertex_source: impl Into<Arc<str>>,
        fragment_source: impl Into<Arc<str>>,
    ) -> Result<ShaderProgram, DispatchError> {
        ShaderProgram::init(self, vertex_source, fragment_source)
    }
}

impl Debug for Renderer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("mode", &self.mode())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.dispatch.shutdown();
    }
}
