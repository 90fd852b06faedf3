//! Uploads meshes from a loader thread while the main thread keeps rendering.
//!
//! Meshes only get drawn once their vertex array is ready, so the frame loop
//! never waits on the resource queue. Meshes that failed to load are dropped.

use std::error::Error;
use std::sync::Arc;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;
use tandem::tracing::{info, warn};
use tandem::{
    ClearFlags, HeadlessWindowSystem, PrimitiveType, RenderState, Renderer, RendererConfig,
    StaticMesh, VertexAttribute, VertexAttributeName, VertexFormat, bytes_of,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MESHES: usize = 32;

const VERTEX_SHADER: &str = "#version 330 core\nin vec3 iPosition;\nvoid main() { gl_Position = vec4(iPosition, 1.0); }\n";
const FRAGMENT_SHADER: &str = "#version 330 core\nout vec4 oColor;\nvoid main() { oColor = vec4(1.0); }\n";

fn load_mesh(renderer: &Renderer, seed: usize) -> Result<StaticMesh, tandem::DispatchError> {
    let offset = seed as f32 * 0.01;
    let positions: Vec<[f32; 3]> = (0..64)
        .map(|i| {
            let t = i as f32 / 64.0 * std::f32::consts::TAU;
            [t.cos() + offset, t.sin(), 0.0]
        })
        .collect();

    renderer.create_static_mesh(
        VertexFormat::new(
            [(VertexAttributeName::Position, VertexAttribute::float(3))],
            None,
        ),
        [(VertexAttributeName::Position, bytes_of(&positions))],
        None,
        positions.len() as u32,
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let window = HeadlessWindowSystem::default();
    let renderer = Renderer::new(RendererConfig::from_args(), Arc::new(window.clone()))?;
    let program = renderer.create_shader_program(VERTEX_SHADER, FRAGMENT_SHADER)?;

    let (mesh_tx, mesh_rx) = std::sync::mpsc::channel();
    let mut meshes: Vec<StaticMesh> = Vec::new();
    let mut frames = 0;

    std::thread::scope(|scope| {
        let renderer = &renderer;
        scope.spawn(move || {
            for seed in 0..MESHES {
                match load_mesh(renderer, seed) {
                    Ok(mesh) => {
                        if mesh_tx.send(mesh).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Couldn't queue mesh {seed}: {e}"),
                }
                std::thread::sleep(Duration::from_millis(2));
            }
        });

        let mut pending: Vec<StaticMesh> = Vec::new();
        let mut loading = true;
        while loading || !pending.is_empty() {
            loop {
                match mesh_rx.try_recv() {
                    Ok(mesh) => pending.push(mesh),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        loading = false;
                        break;
                    }
                }
            }
            for mesh in std::mem::take(&mut pending) {
                match mesh.vertex_array().try_get() {
                    Some(Ok(_)) => meshes.push(mesh),
                    Some(Err(e)) => warn!("Dropping a mesh that failed to load: {e}"),
                    None => pending.push(mesh),
                }
            }

            let result = renderer.clear(ClearFlags::COLOR).and_then(|()| {
                meshes.iter().try_for_each(|mesh| {
                    mesh.draw(
                        renderer,
                        program.program(),
                        Default::default(),
                        RenderState::default(),
                        PrimitiveType::LineStrip,
                        0,
                        mesh.vertex_count(),
                    )
                })
            });
            if let Err(e) = result.and_then(|()| renderer.swap_buffers()) {
                warn!("Frame {frames} failed: {e}");
                break;
            }
            frames += 1;
        }
    });

    renderer.flush()?;
    info!(
        "Streamed {} meshes over {frames} frames, {} buffers alive",
        meshes.len(),
        window.live_buffers()
    );

    drop(meshes);
    drop(program);
    renderer.shutdown();
    Ok(())
}
