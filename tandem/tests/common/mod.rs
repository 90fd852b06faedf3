#![allow(dead_code)]

use std::sync::Arc;
use tandem::context::headless::DeviceCall;
use tandem::{
    BufferHandle, HeadlessWindowSystem, ObjectId, Renderer, RendererConfig, RenderingMode,
    SharedFuture, StaticMesh, VertexAttribute, VertexAttributeName, VertexFormat, bytes_of,
};
use tracing_subscriber::EnvFilter;

pub const MODES: [RenderingMode; 2] = [RenderingMode::Asynchronous, RenderingMode::Synchronous];

pub const VERTEX_SHADER: &str = r#"
#version 330 core
in vec3 iPosition;
uniform mat4 uModel;
void main() {
    gl_Position = uModel * vec4(iPosition, 1.0);
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
#version 330 core
out vec4 oColor;
uniform vec4 uColor;
void main() {
    oColor = uColor;
}
"#;

pub const TRIANGLE: [[f32; 3]; 3] = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn renderer(mode: RenderingMode, window: &HeadlessWindowSystem) -> Renderer {
    renderer_with(RendererConfig::builder().mode(mode).build(), window)
}

pub fn renderer_with(config: RendererConfig, window: &HeadlessWindowSystem) -> Renderer {
    init_tracing();
    Renderer::new(config, Arc::new(window.clone())).expect("renderer should start")
}

pub fn position_format() -> VertexFormat {
    VertexFormat::new(
        [(VertexAttributeName::Position, VertexAttribute::float(3))],
        None,
    )
}

pub fn triangle(renderer: &Renderer) -> StaticMesh {
    renderer
        .create_static_mesh(
            position_format(),
            [(VertexAttributeName::Position, bytes_of(&TRIANGLE))],
            None,
            3,
        )
        .expect("mesh should be queued")
}

pub fn id_of(buffer: &SharedFuture<BufferHandle>) -> ObjectId {
    buffer.wait().expect("buffer should be generated").id()
}

/// Ids of every object created in `calls`, tagged with their kind.
pub fn created(calls: &[DeviceCall]) -> Vec<(&'static str, ObjectId)> {
    let mut created: Vec<_> = calls
        .iter()
        .filter_map(|call| match call {
            DeviceCall::GenBuffer { id } => Some(("buffer", *id)),
            DeviceCall::GenVertexArray { id } => Some(("vertex array", *id)),
            DeviceCall::CreateShader { id, .. } => Some(("shader", *id)),
            DeviceCall::CreateProgram { id } => Some(("program", *id)),
            _ => None,
        })
        .collect();
    created.sort();
    created
}

/// Ids of every object deleted in `calls`, tagged with their kind.
pub fn deleted(calls: &[DeviceCall]) -> Vec<(&'static str, ObjectId)> {
    let mut deleted: Vec<_> = calls
        .iter()
        .filter_map(|call| match call {
            DeviceCall::DeleteBuffer { id } => Some(("buffer", *id)),
            DeviceCall::DeleteVertexArray { id } => Some(("vertex array", *id)),
            DeviceCall::DeleteShader { id } => Some(("shader", *id)),
            DeviceCall::DeleteProgram { id } => Some(("program", *id)),
            _ => None,
        })
        .collect();
    deleted.sort();
    deleted
}
