use crate::config::{RendererConfig, RenderingMode};
use crate::context::{ContextError, WindowSystem};
use crate::dispatch::executor::Executor;
use crate::dispatch::instruction::{Instruction, QueueKind};
use crate::dispatch::rendering::RenderingQueue;
use crate::dispatch::resource::ResourceQueue;
use crate::dispatch::{Dispatch, MAX_SHUTDOWN_ROUNDS, check_route};
use crate::rendering::error::{DispatchError, ShutDownErr, SpawnThreadErr};
use parking_lot::Mutex;
use snafu::{ResultExt, ensure};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use tandem_utils::sizes::format_bytes;
use tracing::{debug, error, info, instrument, warn};

/// Runs the rendering and the resource queue on a thread each.
pub(crate) struct ThreadedDispatch {
    rendering: Arc<RenderingQueue>,
    resource: Arc<ResourceQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: AtomicBool,
    closed: AtomicBool,
}

type ReadySender = crossbeam_channel::Sender<Result<(), ContextError>>;

impl ThreadedDispatch {
    pub fn new(
        config: &RendererConfig,
        window: Arc<dyn WindowSystem>,
    ) -> Result<Arc<Self>, DispatchError> {
        let rendering_context = window.create_context(&config.rendering_thread_name, None)?;
        let resource_context = window.create_context(
            &config.resource_thread_name,
            Some(rendering_context.as_ref()),
        )?;

        let dispatch = Arc::new(Self {
            rendering: Arc::new(RenderingQueue::new(config.rendering_buffer_size)),
            resource: Arc::new(ResourceQueue::new(config.resource_buffer_size)),
            workers: Mutex::new(Vec::with_capacity(2)),
            shutting_down: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let weak: Weak<dyn Dispatch> = Arc::downgrade(&dispatch) as Weak<dyn Dispatch>;

        let rendering_executor = Executor::new(
            config.rendering_thread_name.clone(),
            Some(QueueKind::Rendering),
            rendering_context,
            window.clone(),
            weak.clone(),
            config.poll_device_errors,
        );
        let resource_executor = Executor::new(
            config.resource_thread_name.clone(),
            Some(QueueKind::Resource),
            resource_context,
            window,
            weak,
            config.poll_device_errors,
        );

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(2);

        let queue = dispatch.rendering.clone();
        let rendering_worker = spawn_worker(
            &config.rendering_thread_name,
            rendering_executor,
            ready_tx.clone(),
            move |executor| queue.run(executor),
        );
        dispatch.adopt_worker(rendering_worker)?;

        let queue = dispatch.resource.clone();
        let resource_worker = spawn_worker(
            &config.resource_thread_name,
            resource_executor,
            ready_tx,
            move |executor| queue.run(executor),
        );
        dispatch.adopt_worker(resource_worker)?;

        for _ in 0..2 {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    dispatch.stop_workers();
                    return Err(e.into());
                }
                Err(_) => {
                    dispatch.stop_workers();
                    return ShutDownErr.fail();
                }
            }
        }

        info!(
            "Started asynchronous dispatch ({} per rendering buffer, {} resource queue)",
            format_bytes(config.rendering_buffer_size),
            format_bytes(config.resource_buffer_size),
        );
        Ok(dispatch)
    }

    /// Keeps track of a spawned worker. Stops the ones already running if
    /// spawning failed.
    fn adopt_worker(
        &self,
        spawned: Result<JoinHandle<()>, DispatchError>,
    ) -> Result<(), DispatchError> {
        match spawned {
            Ok(handle) => {
                self.workers.lock().push(handle);
                Ok(())
            }
            Err(e) => {
                self.stop_workers();
                Err(e)
            }
        }
    }

    /// Closes the dispatcher, sends both workers a `Quit` and joins them.
    fn stop_workers(&self) {
        self.closed.store(true, Ordering::Release);

        if let Err(e) = self.rendering.push_and_swap(Instruction::Quit) {
            error!("Couldn't ask the rendering thread to quit: {e}");
        }
        if let Err(e) = self.resource.push(Instruction::Quit) {
            error!("Couldn't ask the resource thread to quit: {e}");
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            match worker.join() {
                Ok(()) => debug!("Joined {name}"),
                Err(_) => error!("{name} panicked"),
            }
        }
    }

    fn is_worker_thread(&self) -> bool {
        let current = std::thread::current().id();
        self.rendering.is_rendering_thread()
            || self
                .workers
                .lock()
                .iter()
                .any(|worker| worker.thread().id() == current)
    }
}

fn spawn_worker(
    name: &str,
    mut executor: Executor,
    ready: ReadySender,
    run: impl FnOnce(&mut Executor) + Send + 'static,
) -> Result<JoinHandle<()>, DispatchError> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            profiling::register_thread!();
            debug!("{} started", executor.label());

            let bound = executor.bind();
            let failed = bound.is_err();
            let _ = ready.send(bound);
            drop(ready);
            if failed {
                return;
            }

            run(&mut executor);
            debug!("{} stopped", executor.label());
        })
        .context(SpawnThreadErr { name })
}

impl Dispatch for ThreadedDispatch {
    fn push(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError> {
        check_route(queue, &instruction)?;
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);

        match queue {
            QueueKind::Rendering => self.rendering.push(instruction),
            QueueKind::Resource => self.resource.push(instruction),
        }
    }

    fn release(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError> {
        check_route(queue, &instruction)?;
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);

        match queue {
            QueueKind::Rendering => self.rendering.release(instruction),
            QueueKind::Resource => self.resource.release(instruction),
        }
        Ok(())
    }

    fn swap_rendering_queues(&self) -> Result<(), DispatchError> {
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        self.rendering.swap()
    }

    fn swap_buffers(&self) -> Result<(), DispatchError> {
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        self.rendering.push_and_swap(Instruction::SwapBuffers)
    }

    fn flush(&self) -> Result<(), DispatchError> {
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        self.rendering.flush()?;
        self.resource.wait_idle();
        Ok(())
    }

    #[instrument(skip_all)]
    fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.is_worker_thread() {
            tandem_utils::debug_panic!("A worker thread tried to shut its own dispatcher down");
            return;
        }

        let mut round = 0;
        loop {
            if let Err(e) = self.rendering.flush() {
                error!("Couldn't flush the rendering queue during shutdown: {e}");
                break;
            }
            self.resource.wait_idle();

            if round >= 1 && self.rendering.is_write_buffer_empty() && self.resource.is_idle() {
                debug!("Queues drained after {} rounds", round + 1);
                break;
            }

            round += 1;
            if round >= MAX_SHUTDOWN_ROUNDS {
                warn!("Queues still busy after {MAX_SHUTDOWN_ROUNDS} drain rounds, stopping anyway");
                break;
            }
        }

        self.stop_workers();
        info!("Asynchronous dispatch shut down");
    }

    fn mode(&self) -> RenderingMode {
        RenderingMode::Asynchronous
    }
}

impl Drop for ThreadedDispatch {
    fn drop(&mut self) {
        if !self.workers.get_mut().is_empty() {
            warn!("Dispatcher dropped without shutting down, stopping its workers");
            self.stop_workers();
        }
    }
}
