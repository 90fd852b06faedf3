//! Turns instructions into device calls.
//!
//! Every worker owns exactly one executor and with it one graphics context.
//! The executor resolves the futures an instruction was given, issues the
//! matching device calls, and fulfills the instruction's promise. If an input
//! future is broken the instruction is skipped and its own promise breaks, so
//! failures travel down the chain of dependent instructions instead of hanging
//! anyone.

use crate::context::{
    AttributeBinding, BufferUpload, ContextError, DrawCommand, EntryPointTable, GraphicsContext,
    GraphicsDevice, UploadStrategy, WindowSystem,
};
use crate::dispatch::Dispatch;
use crate::dispatch::future::{FutureError, SharedFuture};
use crate::dispatch::instruction::{
    BufferDataParams, CompileShaderParams, DrawVertexArrayParams, Instruction,
    LinkShaderProgramParams, OpCode, QueueKind, SetVertexArrayLayoutParams,
};
use crate::rendering::handle::{GpuHandle, GpuResource};
use crate::rendering::vertex::VertexAttributeName;
use crate::utils::Profiler;
use std::sync::{Arc, Weak};
use tandem_utils::debug_panic;
use tracing::{debug, error, info, trace, warn};

/// Attribute locations every program gets bound before linking.
pub const ATTRIBUTE_LOCATIONS: [VertexAttributeName; 4] = [
    VertexAttributeName::Position,
    VertexAttributeName::Texcoord0,
    VertexAttributeName::Texcoord1,
    VertexAttributeName::Normal,
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn resolve<T: Clone>(
    opcode: OpCode,
    what: &str,
    future: &SharedFuture<T>,
) -> Result<T, FutureError> {
    future.wait().inspect_err(|e| {
        error!("Skipping {opcode}: the {what} it depends on is unavailable ({e})");
    })
}

pub struct Executor {
    label: String,
    /// `None` executes instructions of both queues.
    queue: Option<QueueKind>,
    context: Box<dyn GraphicsContext>,
    entry_points: Option<EntryPointTable>,
    window: Arc<dyn WindowSystem>,
    dispatch: Weak<dyn Dispatch>,
    poll_device_errors: bool,
    profiler: Profiler,
}

impl Executor {
    pub fn new(
        label: impl Into<String>,
        queue: Option<QueueKind>,
        context: Box<dyn GraphicsContext>,
        window: Arc<dyn WindowSystem>,
        dispatch: Weak<dyn Dispatch>,
        poll_device_errors: bool,
    ) -> Self {
        Self {
            label: label.into(),
            queue,
            context,
            entry_points: None,
            window,
            dispatch,
            poll_device_errors,
            profiler: Profiler::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn entry_points(&self) -> Option<&EntryPointTable> {
        self.entry_points.as_ref()
    }

    /// Makes the context current on the calling thread, loading its entry
    /// points the first time.
    pub fn bind(&mut self) -> Result<(), ContextError> {
        self.context.make_current()?;

        if self.entry_points.is_none() {
            let table = EntryPointTable::load(self.context.as_ref())?;
            debug!(
                "{}: loaded {} entry points (buffer mapping: {})",
                self.label,
                table.len(),
                table.supports_buffer_mapping()
            );
            self.entry_points = Some(table);
        }
        Ok(())
    }

    #[profiling::function]
    pub fn execute(&mut self, instruction: Instruction) -> Flow {
        let opcode = instruction.opcode();
        if let Some(queue) = self.queue {
            if !opcode.accepts(queue) {
                debug_panic!("{opcode} ended up on the {queue} queue");
                return Flow::Continue;
            }
        }

        trace!("{}: executing {instruction:?}", self.label);

        self.profiler.start();
        let flow = self.dispatch_instruction(instruction);
        self.profiler.stop();

        if self.poll_device_errors {
            let device = self.context.device();
            while let Some(e) = device.poll_error() {
                warn!("{}: device error after {opcode}: {e}", self.label);
            }
        }

        flow
    }

    /// Logs the time this executor spent executing instructions.
    pub fn log_summary(&self) {
        info!(
            "{}: executed {} instructions in {:?} ({:?} on average, recently {:?} on average and {:?} at most)",
            self.label,
            self.profiler.samples(),
            self.profiler.total(),
            self.profiler.average(),
            self.profiler.recent_mean(),
            self.profiler.recent_high(),
        );
    }

    fn upload_strategy(&self) -> UploadStrategy {
        match &self.entry_points {
            Some(table) if table.supports_buffer_mapping() => UploadStrategy::Mapped,
            _ => UploadStrategy::Direct,
        }
    }

    fn dispatch_instruction(&mut self, instruction: Instruction) -> Flow {
        let opcode = instruction.opcode();
        match instruction {
            Instruction::GenBuffer(p) => {
                let id = self.context.device().gen_buffer();
                p.promise.fulfill(GpuHandle::new(id, self.dispatch.clone()));
            }
            Instruction::DeleteBuffer(p) => self.context.device().delete_buffer(p.id),
            Instruction::BufferData(p) => self.buffer_data(opcode, p),

            Instruction::GenVertexArray(p) => {
                let id = self.context.device().gen_vertex_array();
                p.promise.fulfill(GpuHandle::new(id, self.dispatch.clone()));
            }
            Instruction::DeleteVertexArray(p) => self.context.device().delete_vertex_array(p.id),
            Instruction::SetVertexArrayLayout(p) => self.set_vertex_array_layout(opcode, p),

            Instruction::GenShader(p) => {
                let id = self.context.device().create_shader(p.stage);
                p.promise.fulfill(GpuHandle::new(id, self.dispatch.clone()));
            }
            Instruction::DeleteShader(p) => self.context.device().delete_shader(p.id),
            Instruction::CompileShader(p) => self.compile_shader(opcode, p),
            Instruction::ShaderStatus(p) => {
                if let Ok(shader) = resolve(opcode, "shader", &p.shader) {
                    let status = self.context.device().shader_status(shader.id());
                    p.promise.fulfill(status);
                }
            }

            Instruction::GenShaderProgram(p) => {
                let id = self.context.device().create_program();
                p.promise.fulfill(GpuHandle::new(id, self.dispatch.clone()));
            }
            Instruction::DeleteShaderProgram(p) => self.context.device().delete_program(p.id),
            Instruction::LinkShaderProgram(p) => self.link_shader_program(opcode, p),
            Instruction::ShaderProgramStatus(p) => {
                if let Ok(program) = resolve(opcode, "shader program", &p.program) {
                    let status = self.context.device().program_status(program.id());
                    p.promise.fulfill(status);
                }
            }

            Instruction::DrawVertexArray(p) => self.draw_vertex_array(opcode, p),
            Instruction::Clear(p) => self.context.device().clear(p.mask),
            Instruction::SwapBuffers => self.window.swap_buffers(),
            Instruction::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn buffer_data(&mut self, opcode: OpCode, p: BufferDataParams) {
        let Ok(buffer) = resolve(opcode, "buffer", &p.buffer) else {
            return;
        };

        let strategy = self.upload_strategy();
        self.context.device().buffer_data(BufferUpload {
            buffer: buffer.id(),
            target: p.target,
            usage: p.usage,
            size: p.size,
            data: p.data.as_deref(),
            strategy,
        });
        p.promise.fulfill(buffer);
    }

    fn set_vertex_array_layout(&mut self, opcode: OpCode, p: SetVertexArrayLayoutParams) {
        let Ok(vertex_array) = resolve(opcode, "vertex array", &p.vertex_array) else {
            return;
        };

        let mut bindings = Vec::with_capacity(p.attribute_buffers.len());
        let mut dependents: Vec<Arc<dyn GpuResource>> = Vec::with_capacity(bindings.capacity() + 1);
        for (name, buffer) in p.attribute_buffers.iter() {
            let Ok(buffer) = resolve(opcode, "attribute buffer", buffer) else {
                return;
            };
            let Some(attribute) = p.format.attributes.get(name) else {
                error!("{opcode}: the vertex format has no {name:?} attribute, not binding it");
                continue;
            };

            bindings.push(AttributeBinding {
                location: name.location(),
                buffer: buffer.id(),
                attribute: *attribute,
            });
            dependents.push(buffer);
        }

        let index_buffer = match &p.index_buffer {
            Some(future) => match resolve(opcode, "index buffer", future) {
                Ok(buffer) => Some(buffer),
                Err(_) => return,
            },
            None => None,
        };
        let index_id = index_buffer.as_ref().map(|buffer| buffer.id());
        dependents.extend(index_buffer.map(|buffer| buffer as Arc<dyn GpuResource>));

        self.context
            .device()
            .set_vertex_array_layout(vertex_array.id(), &bindings, index_id);
        vertex_array.add_dependents(dependents);
        p.promise.fulfill(vertex_array);
    }

    fn compile_shader(&mut self, opcode: OpCode, p: CompileShaderParams) {
        let Ok(shader) = resolve(opcode, "shader", &p.shader) else {
            return;
        };

        self.context.device().compile_shader(shader.id(), &p.source);
        p.promise.fulfill(shader);
    }

    fn link_shader_program(&mut self, opcode: OpCode, p: LinkShaderProgramParams) {
        let Ok(program) = resolve(opcode, "shader program", &p.program) else {
            return;
        };
        let Ok(vertex_shader) = resolve(opcode, "vertex shader", &p.vertex_shader) else {
            return;
        };
        let Ok(fragment_shader) = resolve(opcode, "fragment shader", &p.fragment_shader) else {
            return;
        };

        let locations = ATTRIBUTE_LOCATIONS.map(|name| (name.shader_input(), name.location()));
        self.context.device().link_program(
            program.id(),
            &[vertex_shader.id(), fragment_shader.id()],
            &locations,
        );

        program.add_dependents([
            vertex_shader as Arc<dyn GpuResource>,
            fragment_shader as Arc<dyn GpuResource>,
        ]);
        p.promise.fulfill(program);
    }

    fn draw_vertex_array(&mut self, opcode: OpCode, p: DrawVertexArrayParams) {
        let Ok(program) = resolve(opcode, "shader program", &p.program) else {
            return;
        };
        let Ok(vertex_array) = resolve(opcode, "vertex array", &p.vertex_array) else {
            return;
        };

        let device = self.context.device();
        for (name, value) in p.uniforms.iter() {
            device.set_uniform(program.id(), name, &value.to_floats());
        }
        for change in p.state.changes() {
            device.apply_state(change);
        }

        device.draw(&DrawCommand {
            program: program.id(),
            vertex_array: vertex_array.id(),
            primitive: p.primitive,
            index_type: p.index_type,
            first: p.first,
            count: p.count,
        });
    }
}
