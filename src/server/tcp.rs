//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! `Server` es dueño del backend (directorio o zip), del flag de vida y del
//! pool de workers. El listener corre en su propio thread y entrega cada
//! conexión aceptada a un worker del pool.

use super::connection::{self, OpenConnections};
use super::pool::WorkerPool;
use crate::resolver::ResolverMode;
use crate::zip::ZipError;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Timeout de lectura por defecto para cada cliente
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Tiempo de drenado (y luego de cancelación) en `stop()`
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Cada cuánto el listener revisa el flag de vida si no llegan conexiones
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Pausa después de un error de accept (p. ej. EMFILE) antes de reintentar
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Errores al construir el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot open {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("cannot start listener thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Estado que comparte el listener
struct ListenerContext {
    port: u16,
    read_timeout: Duration,
    running: Arc<AtomicBool>,
    resolver: Arc<ResolverMode>,
    pool: Arc<WorkerPool>,
    connections: OpenConnections,
    local_addr: Arc<Mutex<Option<SocketAddr>>>,
}

/// Servidor HTTP/1.0 de contenido estático
pub struct Server {
    port: u16,
    root: PathBuf,
    resolver: Arc<ResolverMode>,
    running: Arc<AtomicBool>,
    pool: Arc<WorkerPool>,
    connections: OpenConnections,
    read_timeout: Duration,
    shutdown_timeout: Duration,
    listener: Option<JoinHandle<()>>,
    local_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl Server {
    /// Construye el servidor y elige el backend inspeccionando `root`
    ///
    /// Un zip válido activa el modo archivo. Cualquier otra cosa, incluso un
    /// directorio que no existe, es modo directorio; los fallos aparecen
    /// después como 404.
    pub fn new(port: u16, root: impl AsRef<Path>) -> Result<Self, ServerError> {
        let root = canonical_root(root.as_ref());
        let resolver = ResolverMode::probe(&root).map_err(|source| ServerError::Root {
            path: root.clone(),
            source,
        })?;

        match &resolver {
            ResolverMode::Archive(handle) => {
                info!(root = %root.display(), entries = handle.len(), "sirviendo desde zip")
            }
            ResolverMode::Directory(_) => {
                info!(root = %root.display(), "sirviendo desde directorio")
            }
        }

        Ok(Self {
            port,
            root,
            resolver: Arc::new(resolver),
            running: Arc::new(AtomicBool::new(false)),
            pool: Arc::new(WorkerPool::new("httpd-worker")),
            connections: OpenConnections::new(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            listener: None,
            local_addr: Arc::new(Mutex::new(None)),
        })
    }

    /// Cambia el timeout de lectura de los clientes (antes de `start`)
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Cambia cuánto espera `stop()` en cada fase del apagado
    pub fn set_shutdown_timeout(&mut self, timeout: Duration) {
        self.shutdown_timeout = timeout;
    }

    /// Marca el servidor como vivo y lanza el listener en su propio thread
    pub fn start(&mut self) -> Result<(), ServerError> {
        if let Some(handle) = &self.listener {
            if !handle.is_finished() {
                warn!("el listener ya está corriendo");
                return Ok(());
            }
        }

        self.running.store(true, Ordering::SeqCst);
        let ctx = ListenerContext {
            port: self.port,
            read_timeout: self.read_timeout,
            running: Arc::clone(&self.running),
            resolver: Arc::clone(&self.resolver),
            pool: Arc::clone(&self.pool),
            connections: self.connections.clone(),
            local_addr: Arc::clone(&self.local_addr),
        };

        let handle = thread::Builder::new()
            .name("httpd-listener".to_string())
            .spawn(move || listen(ctx))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                e
            })?;
        self.listener = Some(handle);
        Ok(())
    }

    /// Detiene el servidor
    ///
    /// 1. Baja el flag: el listener sale en su próximo poll
    /// 2. Apaga el pool: espera a los workers y, si no terminan, cierra sus sockets
    /// 3. Cierra el zip si lo hay
    ///
    /// Retorna `false` si algún worker no terminó a tiempo.
    pub fn stop(&mut self) -> bool {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                error!("el thread del listener terminó con panic");
            }
        }

        let connections = self.connections.clone();
        let terminated = self.pool.shutdown(self.shutdown_timeout, || {
            let closed = connections.shutdown_all();
            warn!(closed, "forzando el cierre de conexiones en curso");
        });
        if !terminated {
            error!("el pool de workers no terminó");
        }

        if let ResolverMode::Archive(handle) = &*self.resolver {
            if handle.close() {
                info!(path = %handle.path().display(), "zip cerrado");
            }
        }

        info!("servidor detenido");
        terminated
    }

    /// Bloquea hasta que termine el thread del listener
    pub fn wait(&mut self) {
        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                error!("el thread del listener terminó con panic");
            }
        }
    }

    /// Dirección en la que escucha, una vez hecho el bind
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Verifica si el flag de vida está arriba
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Backend elegido al construir
    pub fn mode(&self) -> &ResolverMode {
        &self.resolver
    }

    /// Raíz canónica
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Puerto configurado
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Canonicaliza la raíz; si no existe, usa la ruta absoluta tal cual
fn canonical_root(root: &Path) -> PathBuf {
    match root.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "la raíz no existe; se tratará como directorio");
            std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
        }
    }
}

/// Loop de aceptación; corre mientras el flag de vida esté arriba
fn listen(ctx: ListenerContext) {
    // En Unix, std habilita SO_REUSEADDR en el bind: se puede re-bindear enseguida
    let listener = match bind_all_interfaces(ctx.port) {
        Ok(listener) => listener,
        Err(e) => {
            error!(port = ctx.port, error = %e, "no se pudo hacer bind; el servidor queda inactivo");
            return;
        }
    };

    // Accept no bloqueante: así el flag se revisa cada ACCEPT_POLL_INTERVAL
    if let Err(e) = listener.set_nonblocking(true) {
        error!(error = %e, "no se pudo configurar el socket de escucha");
        return;
    }

    let addr = listener.local_addr().ok();
    *ctx.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = addr;
    info!(port = ctx.port, backend = ctx.resolver.name(), "[+] servidor escuchando");

    while ctx.running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "nueva conexión");
                dispatch(&ctx, stream);
            }
            Err(e) => thread::sleep(accept_backoff(&e)),
        }
    }

    *ctx.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = None;
    info!(port = ctx.port, "listener detenido");
}

/// Escucha en todas las interfaces: `[::]` (dual-stack) o, sin IPv6, `0.0.0.0`
fn bind_all_interfaces(port: u16) -> io::Result<TcpListener> {
    match TcpListener::bind((Ipv6Addr::UNSPECIFIED, port)) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(e),
        Err(e) => {
            debug!(error = %e, "IPv6 no disponible; se usa solo IPv4");
            TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        }
    }
}

/// Cuánto esperar antes del próximo accept
fn accept_backoff(err: &io::Error) -> Duration {
    if err.kind() == io::ErrorKind::WouldBlock {
        return ACCEPT_POLL_INTERVAL;
    }
    warn!(error = %err, "error al aceptar conexión");
    ACCEPT_ERROR_BACKOFF
}

/// Configura el socket aceptado y lo entrega al pool
fn dispatch(ctx: &ListenerContext, stream: TcpStream) {
    // En algunas plataformas el socket aceptado hereda el modo no bloqueante
    let configured = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(ctx.read_timeout)));
    if let Err(e) = configured {
        warn!(error = %e, "no se pudo configurar la conexión; se descarta");
        return;
    }

    let id = ctx.connections.register(&stream);
    let resolver = Arc::clone(&ctx.resolver);
    let connections = ctx.connections.clone();

    let submitted = ctx.pool.submit(move || {
        connection::handle(stream, &resolver);
        if let Some(id) = id {
            connections.release(id);
        }
    });

    if let Err(e) = submitted {
        warn!(error = %e, "no se pudo despachar la conexión");
        if let Some(id) = id {
            ctx.connections.release(id);
        }
    }
}
