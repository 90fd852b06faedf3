//! Draws a spinning triangle for a few hundred frames on the headless backend.
//!
//! Pass `--synchronous` to execute everything on the main thread, and
//! `RUST_LOG=debug` to see what the workers are up to.

use glamx::{Mat4, Vec4};
use std::error::Error;
use std::sync::Arc;
use tandem::tracing::info;
use tandem::{
    ClearFlags, HeadlessWindowSystem, PrimitiveType, RenderState, Renderer, RendererConfig,
    UniformMap, VertexAttribute, VertexAttributeName, VertexFormat, bytes_of,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use web_time::Instant;

const FRAMES: u32 = 300;

const VERTEX_SHADER: &str = r#"
#version 330 core
in vec3 iPosition;
in vec3 iNormal;
uniform mat4 uModel;
out vec3 vNormal;
void main() {
    vNormal = iNormal;
    gl_Position = uModel * vec4(iPosition, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
#version 330 core
in vec3 vNormal;
uniform vec4 uColor;
out vec4 oColor;
void main() {
    oColor = uColor * max(vNormal.z, 0.2);
}
"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let window = HeadlessWindowSystem::default();
    let renderer = Renderer::new(RendererConfig::from_args(), Arc::new(window.clone()))?;

    let program = renderer.create_shader_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
    let positions = [[-0.5f32, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]];
    let normals = [[0.0f32, 0.0, 1.0]; 3];
    let mesh = renderer.create_static_mesh(
        VertexFormat::new(
            [
                (VertexAttributeName::Position, VertexAttribute::float(3)),
                (VertexAttributeName::Normal, VertexAttribute::float(3)),
            ],
            None,
        ),
        [
            (VertexAttributeName::Position, bytes_of(&positions)),
            (VertexAttributeName::Normal, bytes_of(&normals)),
        ],
        None,
        3,
    )?;

    let status = program.status()?;
    if !status.success {
        return Err(status.log.into());
    }

    let start = Instant::now();
    for frame in 0..FRAMES {
        let angle = frame as f32 / FRAMES as f32 * std::f32::consts::TAU;
        let mut uniforms = UniformMap::new();
        uniforms.insert("uModel".to_string(), Mat4::from_rotation_z(angle).into());
        uniforms.insert("uColor".to_string(), Vec4::new(1.0, 0.4, 0.1, 1.0).into());

        renderer.clear(ClearFlags::COLOR | ClearFlags::DEPTH)?;
        mesh.draw(
            &renderer,
            program.program(),
            uniforms,
            RenderState::default().with_depth_test(true),
            PrimitiveType::Triangles,
            0,
            mesh.vertex_count(),
        )?;
        renderer.swap_buffers()?;
    }
    renderer.flush()?;

    info!(
        "Recorded {FRAMES} frames in {:?} ({} mode), {} device calls",
        start.elapsed(),
        renderer.mode(),
        window.calls().len()
    );

    drop(mesh);
    drop(program);
    renderer.shutdown();
    Ok(())
}
