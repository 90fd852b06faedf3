use crate::dispatch::future::{FutureError, SharedFuture};
use crate::rendering::error::DispatchError;
use crate::rendering::handle::{ProgramHandle, ShaderHandle};
use crate::rendering::renderer::Renderer;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Outcome of compiling a shader or linking a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectStatus {
    pub success: bool,
    pub log: String,
}

impl ObjectStatus {
    pub fn ok(log: impl Into<String>) -> Self {
        Self {
            success: true,
            log: log.into(),
        }
    }

    pub fn failed(log: impl Into<String>) -> Self {
        Self {
            success: false,
            log: log.into(),
        }
    }
}

/// A vertex and a fragment shader, compiled and linked on the resource queue.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    program: SharedFuture<ProgramHandle>,
    vertex_shader: SharedFuture<ShaderHandle>,
    fragment_shader: SharedFuture<ShaderHandle>,
    vertex_status: SharedFuture<ObjectStatus>,
    fragment_status: SharedFuture<ObjectStatus>,
    link_status: SharedFuture<ObjectStatus>,
}

impl ShaderProgram {
    pub fn init(
        renderer: &Renderer,
        vertex_source: impl Into<Arc<str>>,
        fragment_source: impl Into<Arc<str>>,
    ) -> Result<Self, DispatchError> {
        let vertex_shader = renderer.gen_shader(ShaderStage::Vertex)?;
        let vertex_shader = renderer.compile_shader(&vertex_shader, vertex_source)?;
        let fragment_shader = renderer.gen_shader(ShaderStage::Fragment)?;
        let fragment_shader = renderer.compile_shader(&fragment_shader, fragment_source)?;

        let program = renderer.gen_shader_program()?;
        let program = renderer.link_shader_program(&program, &vertex_shader, &fragment_shader)?;

        Ok(Self {
            vertex_status: renderer.shader_status(&vertex_shader)?.share(),
            fragment_status: renderer.shader_status(&fragment_shader)?.share(),
            link_status: renderer.shader_program_status(&program)?.share(),
            program,
            vertex_shader,
            fragment_shader,
        })
    }

    pub fn program(&self) -> &SharedFuture<ProgramHandle> {
        &self.program
    }

    pub fn vertex_shader(&self) -> &SharedFuture<ShaderHandle> {
        &self.vertex_shader
    }

    pub fn fragment_shader(&self) -> &SharedFuture<ShaderHandle> {
        &self.fragment_shader
    }

    /// Blocks until the program was linked.
    pub fn status(&self) -> Result<ObjectStatus, FutureError> {
        self.link_status.wait()
    }

    /// Compile status of the vertex and the fragment shader.
    pub fn shader_statuses(&self) -> Result<(ObjectStatus, ObjectStatus), FutureError> {
        Ok((self.vertex_status.wait()?, self.fragment_status.wait()?))
    }
}
