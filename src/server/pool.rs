//! # Pool de Workers
//! src/server/pool.rs
//!
//! Pool de threads que crece sin límite: si no hay un worker libre para
//! un trabajo nuevo se crea otro thread. Un worker que queda ocioso más de
//! [`KEEP_ALIVE`] termina solo.
//!
//! ## Apagado
//!
//! ```text
//! shutdown(timeout, force)
//!   1. no se aceptan más trabajos; los ociosos terminan
//!   2. esperar hasta `timeout` a que terminen los que están trabajando
//!   3. si quedan: descartar la cola, llamar `force()`, esperar otro `timeout`
//! ```
//!
//! Un thread no se puede matar desde afuera; `force` es quien desbloquea a
//! los workers (p. ej. cerrando sus sockets).

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// Tiempo que un worker ocioso espera antes de terminar
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errores al encolar un trabajo
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("worker pool is shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Estado compartido entre el pool y sus workers
struct PoolState {
    queue: VecDeque<Job>,

    /// Workers vivos (ociosos + trabajando)
    workers: usize,

    /// Workers esperando trabajo
    idle: usize,

    shutdown: bool,

    next_id: u64,
}

struct Shared {
    state: Mutex<PoolState>,

    /// Hay trabajo nuevo o se pidió el apagado
    work_available: Condvar,

    /// Un worker terminó
    worker_exited: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de threads con crecimiento bajo demanda
pub struct WorkerPool {
    shared: Arc<Shared>,
    name: String,
}

impl WorkerPool {
    /// Crea un pool vacío; los threads se llaman `<name>-<n>`
    pub fn new(name: &str) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    workers: 0,
                    idle: 0,
                    shutdown: false,
                    next_id: 0,
                }),
                work_available: Condvar::new(),
                worker_exited: Condvar::new(),
            }),
            name: name.to_string(),
        }
    }

    /// Encola un trabajo; crea un worker si no hay uno ocioso para tomarlo
    pub fn submit<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(SubmitError::ShutDown);
        }

        state.queue.push_back(Box::new(job));
        if state.idle >= state.queue.len() {
            self.shared.work_available.notify_one();
            return Ok(());
        }

        let id = state.next_id;
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.name, id))
            .spawn(move || worker_loop(shared));

        match spawned {
            Ok(_) => {
                state.next_id += 1;
                state.workers += 1;
                Ok(())
            }
            Err(e) => {
                state.queue.pop_back();
                Err(SubmitError::Spawn(e))
            }
        }
    }

    /// Workers vivos en este momento
    pub fn worker_count(&self) -> usize {
        self.shared.lock().workers
    }

    /// Verifica si ya se pidió el apagado
    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Apaga el pool: drenado ordenado y luego cancelación forzada
    ///
    /// Retorna `true` si todos los workers terminaron.
    pub fn shutdown<F: FnOnce()>(&self, timeout: Duration, force: F) -> bool {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
        }
        self.shared.work_available.notify_all();

        if self.await_termination(timeout) {
            return true;
        }

        let dropped = {
            let mut state = self.shared.lock();
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };
        debug!(dropped, "cancelando workers que no terminaron");
        force();

        self.await_termination(timeout)
    }

    /// Espera hasta `timeout` a que no quede ningún worker
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();

        while state.workers > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .worker_exited
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                if state.shutdown {
                    return exit_worker(&shared, state);
                }

                state.idle += 1;
                let (guard, wait) = shared
                    .work_available
                    .wait_timeout(state, KEEP_ALIVE)
                    .unwrap_or_else(PoisonError::into_inner);
                state = guard;
                state.idle -= 1;

                if wait.timed_out() && state.queue.is_empty() {
                    return exit_worker(&shared, state);
                }
            }
        };

        // Un panic en un trabajo no debe llevarse al worker ni descuadrar los contadores
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(
                worker = thread::current().name().unwrap_or("?"),
                "un trabajo terminó con panic"
            );
        }
    }
}

fn exit_worker(shared: &Shared, mut state: MutexGuard<'_, PoolState>) {
    state.workers -= 1;
    drop(state);
    shared.worker_exited.notify_all();
}
