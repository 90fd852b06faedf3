//! Reference counted names of GPU objects.
//!
//! A handle is created by the worker that generated the object and travels
//! back to the producer through a future. When the last reference goes away
//! the handle queues the matching delete instruction on the queue that owns
//! the object kind. Handles may also keep other handles alive: a vertex array
//! holds on to the buffers its layout points at, a linked program to its
//! shaders.

use crate::dispatch::Dispatch;
use crate::dispatch::instruction::{Instruction, QueueKind};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

pub type ObjectId = u32;

/// Kind-erased view of a handle, used to keep dependencies alive.
pub trait GpuResource: Send + Sync + Debug {
    fn id(&self) -> ObjectId;
    fn kind_name(&self) -> &'static str;
}

pub trait ResourceKind: Send + Sync + 'static {
    const NAME: &'static str;
    /// Queue the delete instruction for this kind is pushed to.
    const QUEUE: QueueKind;

    fn delete_instruction(id: ObjectId) -> Instruction;
}

pub mod kind {
    use super::{ObjectId, ResourceKind};
    use crate::dispatch::instruction::{Instruction, QueueKind};

    #[derive(Debug)]
    pub enum Buffer {}

    #[derive(Debug)]
    pub enum VertexArray {}

    #[derive(Debug)]
    pub enum Shader {}

    #[derive(Debug)]
    pub enum Program {}

    impl ResourceKind for Buffer {
        const NAME: &'static str = "buffer";
        const QUEUE: QueueKind = QueueKind::Resource;

        fn delete_instruction(id: ObjectId) -> Instruction {
            Instruction::delete_buffer(id)
        }
    }

    impl ResourceKind for VertexArray {
        const NAME: &'static str = "vertex array";
        const QUEUE: QueueKind = QueueKind::Rendering;

        fn delete_instruction(id: ObjectId) -> Instruction {
            Instruction::delete_vertex_array(id)
        }
    }

    impl ResourceKind for Shader {
        const NAME: &'static str = "shader";
        const QUEUE: QueueKind = QueueKind::Resource;

        fn delete_instruction(id: ObjectId) -> Instruction {
            Instruction::delete_shader(id)
        }
    }

    impl ResourceKind for Program {
        const NAME: &'static str = "shader program";
        const QUEUE: QueueKind = QueueKind::Resource;

        fn delete_instruction(id: ObjectId) -> Instruction {
            Instruction::delete_shader_program(id)
        }
    }
}

pub type BufferHandle = Arc<GpuHandle<kind::Buffer>>;
pub type VertexArrayHandle = Arc<GpuHandle<kind::VertexArray>>;
pub type ShaderHandle = Arc<GpuHandle<kind::Shader>>;
pub type ProgramHandle = Arc<GpuHandle<kind::Program>>;

pub struct GpuHandle<K: ResourceKind> {
    id: ObjectId,
    dispatch: Weak<dyn Dispatch>,
    // Released after the delete for this object is queued.
    dependents: Mutex<SmallVec<[Arc<dyn GpuResource>; 2]>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> GpuHandle<K> {
    pub(crate) fn new(id: ObjectId, dispatch: Weak<dyn Dispatch>) -> Arc<Self> {
        Arc::new(Self {
            id,
            dispatch,
            dependents: Mutex::new(SmallVec::new()),
            _kind: PhantomData,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Keeps `dependents` alive for as long as this handle lives.
    pub fn add_dependents(&self, dependents: impl IntoIterator<Item = Arc<dyn GpuResource>>) {
        self.dependents.lock().extend(dependents);
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.lock().len()
    }
}

impl<K: ResourceKind> GpuResource for GpuHandle<K> {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind_name(&self) -> &'static str {
        K::NAME
    }
}

impl<K: ResourceKind> Debug for GpuHandle<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuHandle")
            .field("kind", &K::NAME)
            .field("id", &self.id)
            .field("dependents", &self.dependent_count())
            .finish()
    }
}

impl<K: ResourceKind> Drop for GpuHandle<K> {
    fn drop(&mut self) {
        let Some(dispatch) = self.dispatch.upgrade() else {
            warn!("{} {} outlived its renderer, not deleting it", K::NAME, self.id);
            return;
        };

        trace!("Releasing {} {}", K::NAME, self.id);
        if let Err(e) = dispatch.release(K::QUEUE, K::delete_instruction(self.id)) {
            warn!("Couldn't queue deletion of {} {}: {e}", K::NAME, self.id);
        }
    }
}
