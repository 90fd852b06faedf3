//! A window system without a window.
//!
//! The headless backend keeps GPU objects in memory and records every call
//! that reaches it, in the order the calls happened across all contexts. It
//! behaves like a strict driver: touching names that were never generated or
//! already deleted queues a [`DeviceError`], shaders that are empty or contain
//! `#error` fail to compile, and programs missing a stage fail to link.
//!
//! All contexts created from one [`HeadlessWindowSystem`] share their objects.
//! Names start at 1. Buffers and vertex arrays each have their own names,
//! while shaders and programs share one namespace.

use crate::context::{
    AttributeBinding, BufferUpload, ContextError, DeviceError, DrawCommand, EntryPoint,
    EntryPointResolver, GraphicsContext, GraphicsDevice, UploadStrategy, WindowSystem,
    CreateContextErr,
};
use crate::rendering::handle::ObjectId;
use crate::rendering::shader_program::{ObjectStatus, ShaderStage};
use crate::rendering::state::{ClearFlags, StateChange};
use crate::rendering::vertex::{BufferTarget, BufferUsage, PrimitiveType};
use bon::bon;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt::{Debug, Formatter};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use tracing::{debug, trace};

pub type CallObserver = Arc<dyn Fn(&DeviceCall) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    GenBuffer {
        id: ObjectId,
    },
    DeleteBuffer {
        id: ObjectId,
    },
    BufferData {
        id: ObjectId,
        target: BufferTarget,
        usage: BufferUsage,
        size: usize,
        strategy: UploadStrategy,
    },
    GenVertexArray {
        id: ObjectId,
    },
    DeleteVertexArray {
        id: ObjectId,
    },
    SetVertexArrayLayout {
        id: ObjectId,
        bindings: Vec<AttributeBinding>,
        index_buffer: Option<ObjectId>,
    },
    CreateShader {
        id: ObjectId,
        stage: ShaderStage,
    },
    DeleteShader {
        id: ObjectId,
    },
    CompileShader {
        id: ObjectId,
        success: bool,
    },
    ShaderStatus {
        id: ObjectId,
        success: bool,
    },
    CreateProgram {
        id: ObjectId,
    },
    DeleteProgram {
        id: ObjectId,
    },
    LinkProgram {
        id: ObjectId,
        shaders: Vec<ObjectId>,
        success: bool,
    },
    ProgramStatus {
        id: ObjectId,
        success: bool,
    },
    Draw {
        program: ObjectId,
        vertex_array: ObjectId,
        primitive: PrimitiveType,
        first: u32,
        count: u32,
        indexed: bool,
    },
    Uniform {
        program: ObjectId,
        name: String,
        value: Vec<f32>,
    },
    SetState {
        change: StateChange,
    },
    Clear {
        mask: ClearFlags,
    },
    SwapBuffers,
}

impl DeviceCall {
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            DeviceCall::DeleteBuffer { .. }
                | DeviceCall::DeleteVertexArray { .. }
                | DeviceCall::DeleteShader { .. }
                | DeviceCall::DeleteProgram { .. }
        )
    }
}

/// A call together with the label of the context that issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLogEntry {
    pub context: Arc<str>,
    pub call: DeviceCall,
}

#[derive(Debug)]
struct BufferObject {
    target: Option<BufferTarget>,
    data: Vec<u8>,
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    compiled: Option<Result<(), String>>,
}

#[derive(Debug, Default)]
struct ProgramObject {
    linked: Option<Result<(), String>>,
    attribute_locations: Vec<(&'static str, u32)>,
    uniforms: HashMap<String, Vec<f32>>,
}

#[derive(Debug, Default)]
struct VertexArrayObject {
    bindings: Vec<AttributeBinding>,
    index_buffer: Option<ObjectId>,
}

#[derive(Debug, Default)]
struct Objects {
    last_buffer: ObjectId,
    last_vertex_array: ObjectId,
    last_shader_object: ObjectId,
    buffers: HashMap<ObjectId, BufferObject>,
    vertex_arrays: HashMap<ObjectId, VertexArrayObject>,
    shaders: HashMap<ObjectId, ShaderObject>,
    programs: HashMap<ObjectId, ProgramObject>,
}

struct Shared {
    objects: Mutex<Objects>,
    log: Mutex<Vec<DeviceLogEntry>>,
    swaps: AtomicUsize,
    observer: Option<CallObserver>,
    missing_entry_points: Vec<&'static str>,
    supports_buffer_mapping: bool,
    refuse_contexts: bool,
}

impl Shared {
    fn record(&self, context: &Arc<str>, call: DeviceCall) {
        trace!("[{context}] {call:?}");
        if let Some(observer) = &self.observer {
            observer(&call);
        }
        self.log.lock().push(DeviceLogEntry {
            context: context.clone(),
            call,
        });
    }
}

#[derive(Clone)]
pub struct HeadlessWindowSystem {
    shared: Arc<Shared>,
}

#[bon]
impl HeadlessWindowSystem {
    #[builder]
    pub fn new(
        // Runs on the calling worker after each device call, before it is logged.
        observer: Option<CallObserver>,
        // Entry points the driver pretends not to have.
        #[builder(default)] missing_entry_points: Vec<&'static str>,
        #[builder(default = true)] supports_buffer_mapping: bool,
        #[builder(default)] refuse_contexts: bool,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                objects: Mutex::default(),
                log: Mutex::default(),
                swaps: AtomicUsize::new(0),
                observer,
                missing_entry_points,
                supports_buffer_mapping,
                refuse_contexts,
            }),
        }
    }
}

impl Default for HeadlessWindowSystem {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HeadlessWindowSystem {
    pub fn log(&self) -> Vec<DeviceLogEntry> {
        self.shared.log.lock().clone()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.shared
            .log
            .lock()
            .iter()
            .map(|entry| entry.call.clone())
            .collect()
    }

    pub fn swap_count(&self) -> usize {
        self.shared.swaps.load(Ordering::Acquire)
    }

    pub fn live_buffers(&self) -> usize {
        self.shared.objects.lock().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.shared.objects.lock().vertex_arrays.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shared.objects.lock().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.shared.objects.lock().programs.len()
    }

    pub fn buffer_contents(&self, id: ObjectId) -> Option<Vec<u8>> {
        self.shared
            .objects
            .lock()
            .buffers
            .get(&id)
            .map(|buffer| buffer.data.clone())
    }

    pub fn buffer_target(&self, id: ObjectId) -> Option<BufferTarget> {
        self.shared
            .objects
            .lock()
            .buffers
            .get(&id)
            .and_then(|buffer| buffer.target)
    }

    pub fn vertex_array_layout(
        &self,
        id: ObjectId,
    ) -> Option<(Vec<AttributeBinding>, Option<ObjectId>)> {
        self.shared
            .objects
            .lock()
            .vertex_arrays
            .get(&id)
            .map(|vao| (vao.bindings.clone(), vao.index_buffer))
    }

    pub fn program_attribute_locations(&self, id: ObjectId) -> Option<Vec<(&'static str, u32)>> {
        self.shared
            .objects
            .lock()
            .programs
            .get(&id)
            .map(|program| program.attribute_locations.clone())
    }

    /// The value last uploaded to uniform `name` of program `id`.
    pub fn program_uniform(&self, id: ObjectId, name: &str) -> Option<Vec<f32>> {
        self.shared
            .objects
            .lock()
            .programs
            .get(&id)
            .and_then(|program| program.uniforms.get(name).cloned())
    }
}

impl Debug for HeadlessWindowSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessWindowSystem")
            .field("calls", &self.shared.log.lock().len())
            .field("swaps", &self.swap_count())
            .finish()
    }
}

impl WindowSystem for HeadlessWindowSystem {
    fn create_context(
        &self,
        label: &str,
        share_with: Option<&dyn GraphicsContext>,
    ) -> Result<Box<dyn GraphicsContext>, ContextError> {
        if self.shared.refuse_contexts {
            return CreateContextErr {
                label,
                reason: "context creation is disabled",
            }
            .fail();
        }

        debug!(
            "Creating headless context {label} (shared with {})",
            share_with.map_or("nothing", |ctx| ctx.label())
        );

        let label: Arc<str> = Arc::from(label);
        Ok(Box::new(HeadlessContext {
            label: label.clone(),
            current_thread: None,
            device: HeadlessDevice {
                label,
                shared: self.shared.clone(),
                errors: VecDeque::new(),
            },
        }))
    }

    fn swap_buffers(&self) {
        self.shared.swaps.fetch_add(1, Ordering::AcqRel);
        self.shared.record(&Arc::from("window"), DeviceCall::SwapBuffers);
    }
}

pub struct HeadlessContext {
    label: Arc<str>,
    current_thread: Option<ThreadId>,
    device: HeadlessDevice,
}

impl HeadlessContext {
    pub fn current_thread(&self) -> Option<ThreadId> {
        self.current_thread
    }
}

impl EntryPointResolver for HeadlessContext {
    fn resolve(&self, name: &str) -> Option<EntryPoint> {
        let shared = &self.device.shared;
        let is_mapping = matches!(name, "glMapBuffer" | "glUnmapBuffer");
        if shared.missing_entry_points.iter().any(|missing| *missing == name)
            || (is_mapping && !shared.supports_buffer_mapping)
        {
            return None;
        }

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        EntryPoint::from_addr((hasher.finish() as usize) | 1)
    }
}

impl GraphicsContext for HeadlessContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn make_current(&mut self) -> Result<(), ContextError> {
        let thread = std::thread::current().id();
        if self.current_thread != Some(thread) {
            trace!("Headless context {} is now current on {thread:?}", self.label);
            self.current_thread = Some(thread);
        }
        Ok(())
    }

    fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut self.device
    }
}

struct HeadlessDevice {
    label: Arc<str>,
    shared: Arc<Shared>,
    errors: VecDeque<DeviceError>,
}

impl HeadlessDevice {
    fn record(&self, call: DeviceCall) {
        self.shared.record(&self.label, call);
    }

    fn invalid_name(&mut self, kind: &'static str, id: ObjectId) {
        self.errors.push_back(DeviceError::InvalidName { kind, id });
    }

    fn invalid_operation(&mut self, reason: impl Into<String>) {
        self.errors.push_back(DeviceError::InvalidOperation {
            reason: reason.into(),
        });
    }
}

fn compile(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("empty shader source".to_string());
    }

    let error = source
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim_start().starts_with("#error"));
    match error {
        Some((n, line)) => Err(format!("0:{}: {}", n + 1, line.trim())),
        None => Ok(()),
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn gen_buffer(&mut self) -> ObjectId {
        let id = {
            let mut objects = self.shared.objects.lock();
            objects.last_buffer += 1;
            let id = objects.last_buffer;
            objects.buffers.insert(
                id,
                BufferObject {
                    target: None,
                    data: Vec::new(),
                },
            );
            id
        };
        self.record(DeviceCall::GenBuffer { id });
        id
    }

    fn delete_buffer(&mut self, buffer: ObjectId) {
        if self.shared.objects.lock().buffers.remove(&buffer).is_none() {
            self.invalid_name("buffer", buffer);
        }
        self.record(DeviceCall::DeleteBuffer { id: buffer });
    }

    fn buffer_data(&mut self, upload: BufferUpload<'_>) {
        let stored = {
            let mut objects = self.shared.objects.lock();
            match objects.buffers.get_mut(&upload.buffer) {
                Some(buffer) => {
                    let mut data = upload.data.map(<[u8]>::to_vec).unwrap_or_default();
                    data.resize(upload.size, 0);
                    buffer.data = data;
                    buffer.target = Some(upload.target);
                    true
                }
                None => false,
            }
        };

        if !stored {
            self.invalid_name("buffer", upload.buffer);
        } else if upload.data.is_some_and(|data| data.len() < upload.size) {
            self.invalid_operation(format!(
                "buffer {} was given fewer than {} bytes",
                upload.buffer, upload.size
            ));
        }

        self.record(DeviceCall::BufferData {
            id: upload.buffer,
            target: upload.target,
            usage: upload.usage,
            size: upload.size,
            strategy: upload.strategy,
        });
    }

    fn gen_vertex_array(&mut self) -> ObjectId {
        let id = {
            let mut objects = self.shared.objects.lock();
            objects.last_vertex_array += 1;
            let id = objects.last_vertex_array;
            objects.vertex_arrays.insert(id, VertexArrayObject::default());
            id
        };
        self.record(DeviceCall::GenVertexArray { id });
        id
    }

    fn delete_vertex_array(&mut self, vertex_array: ObjectId) {
        if self
            .shared
            .objects
            .lock()
            .vertex_arrays
            .remove(&vertex_array)
            .is_none()
        {
            self.invalid_name("vertex array", vertex_array);
        }
        self.record(DeviceCall::DeleteVertexArray { id: vertex_array });
    }

    fn set_vertex_array_layout(
        &mut self,
        vertex_array: ObjectId,
        bindings: &[AttributeBinding],
        index_buffer: Option<ObjectId>,
    ) {
        let mut missing = Vec::new();
        {
            let mut objects = self.shared.objects.lock();
            missing.extend(
                bindings
                    .iter()
                    .map(|binding| binding.buffer)
                    .chain(index_buffer)
                    .filter(|buffer| !objects.buffers.contains_key(buffer))
                    .map(|buffer| ("buffer", buffer)),
            );
            match objects.vertex_arrays.get_mut(&vertex_array) {
                Some(vao) => {
                    vao.bindings = bindings.to_vec();
                    vao.index_buffer = index_buffer;
                }
                None => missing.push(("vertex array", vertex_array)),
            }
        }

        for (kind, id) in missing {
            self.invalid_name(kind, id);
        }

        self.record(DeviceCall::SetVertexArrayLayout {
            id: vertex_array,
            bindings: bindings.to_vec(),
            index_buffer,
        });
    }

    fn create_shader(&mut self, stage: ShaderStage) -> ObjectId {
        let id = {
            let mut objects = self.shared.objects.lock();
            objects.last_shader_object += 1;
            let id = objects.last_shader_object;
            objects.shaders.insert(
                id,
                ShaderObject {
                    stage,
                    compiled: None,
                },
            );
            id
        };
        self.record(DeviceCall::CreateShader { id, stage });
        id
    }

    fn delete_shader(&mut self, shader: ObjectId) {
        if self.shared.objects.lock().shaders.remove(&shader).is_none() {
            self.invalid_name("shader", shader);
        }
        self.record(DeviceCall::DeleteShader { id: shader });
    }

    fn compile_shader(&mut self, shader: ObjectId, source: &str) {
        let result = compile(source);
        let success = result.is_ok();
        let known = match self.shared.objects.lock().shaders.get_mut(&shader) {
            Some(object) => {
                object.compiled = Some(result);
                true
            }
            None => false,
        };

        if !known {
            self.invalid_name("shader", shader);
        }
        self.record(DeviceCall::CompileShader {
            id: shader,
            success: known && success,
        });
    }

    fn shader_status(&mut self, shader: ObjectId) -> ObjectStatus {
        let status = match self.shared.objects.lock().shaders.get(&shader) {
            Some(ShaderObject {
                compiled: Some(Ok(())),
                ..
            }) => Some(ObjectStatus::ok("Compile Status OK")),
            Some(ShaderObject {
                compiled: Some(Err(log)),
                ..
            }) => Some(ObjectStatus::failed(log.clone())),
            Some(ShaderObject { compiled: None, .. }) => {
                Some(ObjectStatus::failed("shader was never compiled"))
            }
            None => None,
        };

        let status = status.unwrap_or_else(|| {
            self.invalid_name("shader", shader);
            ObjectStatus::failed(format!("no shader named {shader}"))
        });

        self.record(DeviceCall::ShaderStatus {
            id: shader,
            success: status.success,
        });
        status
    }

    fn create_program(&mut self) -> ObjectId {
        let id = {
            let mut objects = self.shared.objects.lock();
            objects.last_shader_object += 1;
            let id = objects.last_shader_object;
            objects.programs.insert(id, ProgramObject::default());
            id
        };
        self.record(DeviceCall::CreateProgram { id });
        id
    }

    fn delete_program(&mut self, program: ObjectId) {
        if self.shared.objects.lock().programs.remove(&program).is_none() {
            self.invalid_name("shader program", program);
        }
        self.record(DeviceCall::DeleteProgram { id: program });
    }

    fn link_program(
        &mut self,
        program: ObjectId,
        shaders: &[ObjectId],
        attribute_locations: &[(&'static str, u32)],
    ) {
        let mut missing = Vec::new();
        let success = {
            let mut objects = self.shared.objects.lock();

            let mut stages = Vec::with_capacity(shaders.len());
            let mut result = Ok(());
            for &id in shaders {
                match objects.shaders.get(&id) {
                    Some(ShaderObject {
                        stage,
                        compiled: Some(Ok(())),
                    }) => stages.push(*stage),
                    Some(_) => result = Err(format!("shader {id} is not compiled")),
                    None => {
                        missing.push(("shader", id));
                        result = Err(format!("shader {id} doesn't exist"));
                    }
                }
            }

            if result.is_ok() {
                for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                    if !stages.contains(&stage) {
                        result = Err(format!("no {stage:?} shader attached"));
                    }
                }
            }

            let success = result.is_ok();
            match objects.programs.get_mut(&program) {
                Some(object) => {
                    object.linked = Some(result);
                    object.attribute_locations = attribute_locations.to_vec();
                    success
                }
                None => {
                    missing.push(("shader program", program));
                    false
                }
            }
        };

        for (kind, id) in missing {
            self.invalid_name(kind, id);
        }

        self.record(DeviceCall::LinkProgram {
            id: program,
            shaders: shaders.to_vec(),
            success,
        });
    }

    fn program_status(&mut self, program: ObjectId) -> ObjectStatus {
        let status = match self.shared.objects.lock().programs.get(&program) {
            Some(ProgramObject {
                linked: Some(Ok(())),
                ..
            }) => Some(ObjectStatus::ok("Link Status OK")),
            Some(ProgramObject {
                linked: Some(Err(log)),
                ..
            }) => Some(ObjectStatus::failed(log.clone())),
            Some(ProgramObject { linked: None, .. }) => {
                Some(ObjectStatus::failed("program was never linked"))
            }
            None => None,
        };

        let status = status.unwrap_or_else(|| {
            self.invalid_name("shader program", program);
            ObjectStatus::failed(format!("no shader program named {program}"))
        });

        self.record(DeviceCall::ProgramStatus {
            id: program,
            success: status.success,
        });
        status
    }

    fn set_uniform(&mut self, program: ObjectId, name: &str, value: &[f32]) {
        let linked = {
            let mut objects = self.shared.objects.lock();
            match objects.programs.get_mut(&program) {
                Some(object) if matches!(object.linked, Some(Ok(()))) => {
                    object.uniforms.insert(name.to_string(), value.to_vec());
                    Some(true)
                }
                Some(_) => Some(false),
                None => None,
            }
        };

        match linked {
            None => self.invalid_name("shader program", program),
            Some(false) => self.invalid_operation(format!(
                "setting uniform {name} of unlinked program {program}"
            )),
            Some(true) => {}
        }

        self.record(DeviceCall::Uniform {
            program,
            name: name.to_string(),
            value: value.to_vec(),
        });
    }

    fn apply_state(&mut self, change: StateChange) {
        let invalid = match change {
            StateChange::LineWidth(width) => width <= 0.0,
            StateChange::PointSize(size) => size <= 0.0,
            StateChange::Viewport(viewport) => viewport.width < 0 || viewport.height < 0,
            StateChange::DepthTest(_) | StateChange::PolygonMode(_) => false,
        };
        if invalid {
            self.invalid_operation(format!("invalid value for {change:?}"));
        }

        self.record(DeviceCall::SetState { change });
    }

    fn draw(&mut self, command: &DrawCommand) {
        let (program_ok, vao_ok) = {
            let objects = self.shared.objects.lock();
            (
                objects
                    .programs
                    .get(&command.program)
                    .map(|program| matches!(program.linked, Some(Ok(())))),
                objects.vertex_arrays.contains_key(&command.vertex_array),
            )
        };

        match program_ok {
            None => self.invalid_name("shader program", command.program),
            Some(false) => self.invalid_operation(format!(
                "drawing with unlinked program {}",
                command.program
            )),
            Some(true) => {}
        }
        if !vao_ok {
            self.invalid_name("vertex array", command.vertex_array);
        }

        self.record(DeviceCall::Draw {
            program: command.program,
            vertex_array: command.vertex_array,
            primitive: command.primitive,
            first: command.first,
            count: command.count,
            indexed: command.index_type.is_some(),
        });
    }

    fn clear(&mut self, mask: ClearFlags) {
        self.record(DeviceCall::Clear { mask });
    }

    fn poll_error(&mut self) -> Option<DeviceError> {
        self.errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EntryPointTable;
    use crate::rendering::vertex::VertexAttribute;

    fn device() -> (HeadlessWindowSystem, Box<dyn GraphicsContext>) {
        let window = HeadlessWindowSystem::default();
        let mut context = window.create_context("test", None).unwrap();
        context.make_current().unwrap();
        (window, context)
    }

    #[test]
    fn names_are_allocated_per_kind() {
        let (_window, mut context) = device();
        let device = context.device();

        assert_eq!(device.gen_buffer(), 1);
        assert_eq!(device.gen_buffer(), 2);
        assert_eq!(device.gen_vertex_array(), 1);
        assert_eq!(device.create_shader(ShaderStage::Vertex), 1);
        assert_eq!(device.create_program(), 2);
    }

    #[test]
    fn buffer_data_stores_bytes() {
        let (window, mut context) = device();
        let device = context.device();
        let id = device.gen_buffer();
        device.buffer_data(BufferUpload {
            buffer: id,
            target: BufferTarget::Array,
            usage: BufferUsage::StaticDraw,
            size: 4,
            data: Some(&[1, 2, 3, 4]),
            strategy: UploadStrategy::Direct,
        });

        assert_eq!(window.buffer_contents(id), Some(vec![1, 2, 3, 4]));
        assert_eq!(window.buffer_target(id), Some(BufferTarget::Array));
        assert!(device.poll_error().is_none());
    }

    #[test]
    fn deleted_names_raise_errors() {
        let (window, mut context) = device();
        let device = context.device();
        let id = device.gen_buffer();
        device.delete_buffer(id);
        device.delete_buffer(id);

        assert_eq!(
            device.poll_error(),
            Some(DeviceError::InvalidName { kind: "buffer", id })
        );
        assert!(device.poll_error().is_none());
        assert_eq!(window.live_buffers(), 0);
    }

    #[test]
    fn shader_compilation_rules() {
        let (_window, mut context) = device();
        let device = context.device();

        let good = device.create_shader(ShaderStage::Vertex);
        device.compile_shader(good, "void main() {}");
        assert_eq!(device.shader_status(good), ObjectStatus::ok("Compile Status OK"));

        let bad = device.create_shader(ShaderStage::Fragment);
        device.compile_shader(bad, "void main() {}\n#error nope");
        let status = device.shader_status(bad);
        assert!(!status.success);
        assert_eq!(status.log, "0:2: #error nope");

        let empty = device.create_shader(ShaderStage::Fragment);
        device.compile_shader(empty, "  ");
        assert!(!device.shader_status(empty).success);
    }

    #[test]
    fn link_requires_both_compiled_stages() {
        let (_window, mut context) = device();
        let device = context.device();

        let vs = device.create_shader(ShaderStage::Vertex);
        device.compile_shader(vs, "void main() {}");
        let program = device.create_program();
        device.link_program(program, &[vs], &[]);
        assert!(!device.program_status(program).success);

        let fs = device.create_shader(ShaderStage::Fragment);
        device.compile_shader(fs, "void main() {}");
        device.link_program(program, &[vs, fs], &[("iPosition", 0)]);
        assert_eq!(device.program_status(program), ObjectStatus::ok("Link Status OK"));
    }

    #[test]
    fn contexts_share_objects() {
        let window = HeadlessWindowSystem::default();
        let mut first = window.create_context("first", None).unwrap();
        let mut second = window.create_context("second", Some(first.as_ref())).unwrap();

        let buffer = first.device().gen_buffer();
        let vao = second.device().gen_vertex_array();
        second.device().set_vertex_array_layout(
            vao,
            &[AttributeBinding {
                location: 0,
                buffer,
                attribute: VertexAttribute::float(3),
            }],
            None,
        );
        assert!(second.device().poll_error().is_none());

        let log = window.log();
        assert_eq!(&*log[0].context, "first");
        assert_eq!(&*log[2].context, "second");
    }

    #[test]
    fn entry_points_follow_configuration() {
        let window = HeadlessWindowSystem::builder()
            .supports_buffer_mapping(false)
            .build();
        let context = window.create_context("test", None).unwrap();
        let table = EntryPointTable::load(context.as_ref()).unwrap();
        assert!(!table.supports_buffer_mapping());

        let window = HeadlessWindowSystem::builder()
            .missing_entry_points(vec!["glDrawElements"])
            .build();
        let context = window.create_context("test", None).unwrap();
        assert!(EntryPointTable::load(context.as_ref()).is_err());
    }

    #[test]
    fn refused_context_creation() {
        let window = HeadlessWindowSystem::builder().refuse_contexts(true).build();
        assert!(matches!(
            window.create_context("test", None),
            Err(ContextError::CreateContext { .. })
        ));
    }
}
