mod common;

use common::{
    FRAGMENT_SHADER, MODES, TRIANGLE, VERTEX_SHADER, id_of, position_format, renderer, triangle,
};
use tandem::context::headless::DeviceCall;
use tandem::context::{ContextError, UploadStrategy};
use glamx::{Mat4, Vec4};
use tandem::dispatch::future::channel;
use tandem::{
    ArithmeticType, BufferHandle, BufferTarget, BufferUsage, ClearFlags, DispatchError, DrawCall,
    FutureError, HeadlessWindowSystem, PolygonMode, PrimitiveType, QueueKind, RenderState,
    Renderer, RendererConfig, RenderingMode, StateChange, UniformMap, VertexAttribute,
    VertexAttributeName, VertexFormat, Viewport, bytes_of,
};

#[test]
fn upload_layout_and_draw() {
    for mode in MODES {
        let window = HeadlessWindowSystem::default();
        let renderer = renderer(mode, &window);

        let positions = bytes_of(&TRIANGLE);
        let buffer = renderer.gen_buffer().unwrap();
        let buffer = renderer
            .buffer_data(
                QueueKind::Resource,
                &buffer,
                BufferTarget::Array,
                BufferUsage::StaticDraw,
                positions.len(),
                Some(positions.clone()),
            )
            .unwrap();
        let vertex_array = renderer.gen_vertex_array().unwrap();
        let vertex_array = renderer
            .set_vertex_array_layout(
                &vertex_array,
                position_format(),
                [(VertexAttributeName::Position, buffer.clone())],
                None,
            )
            .unwrap();
        let program = renderer
            .create_shader_program(VERTEX_SHADER, FRAGMENT_SHADER)
            .unwrap();
        assert!(program.status().unwrap().success);

        renderer.clear(ClearFlags::COLOR).unwrap();
        renderer
            .draw_vertex_array(
                DrawCall::builder()
                    .vertex_array(vertex_array.clone())
                    .program(program.program().clone())
                    .count(3)
                    .build(),
            )
            .unwrap();
        renderer.swap_buffers().unwrap();
        renderer.flush().unwrap();

        let buffer_id = id_of(&buffer);
        let vertex_array_id = vertex_array.wait().unwrap().id();
        let program_id = program.program().wait().unwrap().id();

        assert_eq!(window.buffer_contents(buffer_id).as_deref(), Some(&positions[..]));
        assert_eq!(window.buffer_target(buffer_id), Some(BufferTarget::Array));

        let (bindings, index_buffer) = window.vertex_array_layout(vertex_array_id).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].location, VertexAttributeName::Position.location());
        assert_eq!(bindings[0].buffer, buffer_id);
        assert_eq!(index_buffer, None);

        let locations = window.program_attribute_locations(program_id).unwrap();
        assert!(locations.contains(&("iPosition", 0)));
        assert!(locations.contains(&("iNormal", 3)));

        let calls = window.calls();
        let draw = calls
            .iter()
            .position(|call| matches!(call, DeviceCall::Draw { .. }))
            .unwrap();
        assert_eq!(
            calls[draw],
            DeviceCall::Draw {
                program: program_id,
                vertex_array: vertex_array_id,
                primitive: PrimitiveType::Triangles,
                first: 0,
                count: 3,
                indexed: false,
            },
            "{mode}"
        );
        assert_eq!(calls[draw + 1], DeviceCall::SwapBuffers);
        assert_eq!(window.swap_count(), 1);
    }
}

#[test]
fn indexed_static_mesh() {
    let window = HeadlessWindowSystem::default();
    let renderer = renderer(RenderingMode::Asynchronous, &window);

    let format = VertexFormat::new(
        [
            (VertexAttributeName::Position, VertexAttribute::float(3)),
            (VertexAttributeName::Normal, VertexAttribute::float(3)),
        ],
        Some(ArithmeticType::UInt16),
    );
    let normals = [[0.0f32, 0.0, 1.0]; 3];
    let mesh = renderer
        .create_static_mesh(
            format,
            [
                (VertexAttributeName::Position, bytes_of(&TRIANGLE)),
                (VertexAttributeName::Normal, bytes_of(&normals)),
            ],
            Some(bytes_of(&[0u16, 1, 2])),
            3,
        )
        .unwrap();
    let program = renderer
        .create_shader_program(VERTEX_SHADER, FRAGMENT_SHADER)
        .unwrap();
    mesh.draw(
        &renderer,
        program.program(),
        Default::default(),
        Default::default(),
        PrimitiveType::Triangles,
        0,
        3,
    )
    .unwrap();
    renderer.flush().unwrap();

    let vertex_array_id = mesh.vertex_array().wait().unwrap().id();
    let (bindings, index_buffer) = window.vertex_array_layout(vertex_array_id).unwrap();
    let locations: Vec<u32> = bindings.iter().map(|binding| binding.location).collect();
    assert_eq!(locations, [0, 3]);

    let index_buffer = index_buffer.unwrap();
    assert_eq!(window.buffer_target(index_buffer), Some(BufferTarget::ElementArray));
    assert_eq!(window.buffer_contents(index_buffer).map(|data| data.len()), Some(6));
    assert_eq!(mesh.vertex_array().wait().unwrap().dependent_count(), 3);

    assert!(window.calls().iter().any(|call| matches!(
        call,
        DeviceCall::Draw {
            indexed: true,
            count: 3,
            ..
        }
    )));
}

#[test]
fn failed_compile_is_reported_not_raised() {
    for mode in MODES {
        let window = HeadlessWindowSystem::default();
        let renderer = renderer(mode, &window);

        let fragment = "#version 330 core\n#error missing output\n";
        let program = renderer
            .create_shader_program(VERTEX_SHADER, fragment)
            .unwrap();

        let (vertex, fragment) = program.shader_statuses().unwrap();
        assert!(vertex.success, "{mode}");
        assert_eq!(vertex.log, "Compile Status OK");
        assert!(!fragment.success, "{mode}");
        assert_eq!(fragment.log, "0:2: #error missing output");

        let link = program.status().unwrap();
        assert!(!link.success);
        assert!(link.log.contains("not compiled"), "{}", link.log);

        // The handles are fine even though the program is unusable.
        assert!(program.program().wait().is_ok());
    }
}

#[test]
fn broken_inputs_break_dependent_instructions() {
    for mode in MODES {
        let window = HeadlessWindowSystem::default();
        let renderer = renderer(mode, &window);

        let (promise, never) = channel::<BufferHandle>();
        drop(promise);
        let never = never.share();

        let uploaded = renderer
            .buffer_data(
                QueueKind::Resource,
                &never,
                BufferTarget::Array,
                BufferUsage::StaticDraw,
                4,
                None,
            )
            .unwrap();
        let vertex_array = renderer.gen_vertex_array().unwrap();
        let vertex_array = renderer
            .set_vertex_array_layout(
                &vertex_array,
                position_format(),
                [(VertexAttributeName::Position, uploaded.clone())],
                None,
            )
            .unwrap();
        renderer.flush().unwrap();

        assert_eq!(uploaded.wait().unwrap_err(), FutureError::BrokenPromise);
        assert_eq!(vertex_array.wait().unwrap_err(), FutureError::BrokenPromise);
        assert_eq!(window.calls(), [DeviceCall::GenVertexArray { id: 1 }], "{mode}");
    }
}

#[test]
fn uploads_fall_back_without_buffer_mapping() {
    for supports_buffer_mapping in [true, false] {
        let window = HeadlessWindowSystem::builder()
            .supports_buffer_mapping(supports_buffer_mapping)
            .build();
        let renderer = renderer(RenderingMode::Asynchronous, &window);
        let mesh = triangle(&renderer);
        renderer.flush().unwrap();
        drop(mesh);

        let expected = if supports_buffer_mapping {
            UploadStrategy::Mapped
        } else {
            UploadStrategy::Direct
        };
        assert!(window.calls().iter().any(|call| matches!(
            call,
            DeviceCall::BufferData { strategy, .. } if *strategy == expected
        )));
    }
}

#[test]
fn missing_entry_points_fail_startup() {
    for mode in MODES {
        let window = HeadlessWindowSystem::builder()
            .missing_entry_points(vec!["glDrawElements"])
            .build();
        common::init_tracing();
        let err = Renderer::new(
            RendererConfig::builder().mode(mode).build(),
            std::sync::Arc::new(window),
        )
        .unwrap_err();

        assert!(
            matches!(
                err,
                DispatchError::Context {
                    source: ContextError::MissingEntryPoint {
                        name: "glDrawElements"
                    }
                }
            ),
            "{mode}: {err}"
        );
    }
}

#[test]
fn refused_contexts_fail_startup() {
    for mode in MODES {
        let window = HeadlessWindowSystem::builder().refuse_contexts(true).build();
        let err = Renderer::new(
            RendererConfig::builder().mode(mode).build(),
            std::sync::Arc::new(window),
        )
        .unwrap_err();

        assert!(
            matches!(
                err,
                DispatchError::Context {
                    source: ContextError::CreateContext { .. }
                }
            ),
            "{mode}: {err}"
        );
    }
}

#[test]
fn draws_apply_only_activated_state() {
    for mode in MODES {
        let window = HeadlessWindowSystem::default();
        let renderer = renderer(mode, &window);

        let mesh = triangle(&renderer);
        let program = renderer
            .create_shader_program(VERTEX_SHADER, FRAGMENT_SHADER)
            .unwrap();
        assert!(program.status().unwrap().success);

        let color = Vec4::new(0.25, 0.5, 0.75, 1.0);
        let mut uniforms = UniformMap::new();
        uniforms.insert("uColor".to_string(), color.into());
        uniforms.insert("uModel".to_string(), Mat4::IDENTITY.into());

        let mut state = RenderState::default()
            .with_polygon_mode(PolygonMode::Line)
            .with_viewport(Viewport::new(0, 0, 640, 480));
        // Not activated, so the device never hears about it.
        state.line_width = 4.0;

        let draw = |uniforms: UniformMap, state: RenderState| {
            mesh.draw(
                &renderer,
                program.program(),
                uniforms,
                state,
                PrimitiveType::Triangles,
                0,
                3,
            )
            .unwrap()
        };
        draw(uniforms, state);
        draw(UniformMap::new(), RenderState::default());
        renderer.flush().unwrap();

        let program_id = program.program().wait().unwrap().id();
        let calls: Vec<DeviceCall> = window
            .calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    DeviceCall::Uniform { .. } | DeviceCall::SetState { .. } | DeviceCall::Draw { .. }
                )
            })
            .collect();

        assert_eq!(calls.len(), 6, "{mode}: {calls:?}");
        assert_eq!(
            calls[0],
            DeviceCall::Uniform {
                program: program_id,
                name: "uColor".to_string(),
                value: color.to_array().to_vec(),
            },
            "{mode}"
        );
        assert!(
            matches!(&calls[1], DeviceCall::Uniform { name, value, .. } if name == "uModel" && value.len() == 16),
            "{mode}"
        );
        assert_eq!(
            calls[2..4],
            [
                DeviceCall::SetState {
                    change: StateChange::PolygonMode(PolygonMode::Line)
                },
                DeviceCall::SetState {
                    change: StateChange::Viewport(Viewport::new(0, 0, 640, 480))
                },
            ],
            "{mode}"
        );
        assert!(matches!(calls[4], DeviceCall::Draw { .. }), "{mode}");
        assert!(matches!(calls[5], DeviceCall::Draw { .. }), "{mode}");

        assert_eq!(
            window.program_uniform(program_id, "uColor"),
            Some(color.to_array().to_vec())
        );
        assert!(!window.calls().iter().any(|call| matches!(
            call,
            DeviceCall::SetState {
                change: StateChange::LineWidth(_)
            }
        )));
    }
}
