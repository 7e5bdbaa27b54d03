//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Cada conexión recorre siempre los mismos estados:
//!
//! ```text
//! ReadRequestLine → ReadHeaders → Resolve → Respond → Closed
//! ```
//!
//! Cualquier error corta el recorrido y termina en una única respuesta de
//! error. Una vez que empezó a enviarse un 200 ya no se puede cambiar por
//! un error: si el envío falla a mitad del body solo se cierra el socket.

use crate::http::request::{read_line, skip_headers};
use crate::http::response::{copy_body, BUFF_LEN};
use crate::http::{HttpError, Request, Response, StatusCode};
use crate::resolver::{ResolverMode, Resolved};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Atiende una conexión completa y la cierra
///
/// Retorna el código de estado enviado (o que se intentó enviar).
pub fn handle(stream: TcpStream, resolver: &ResolverMode) -> StatusCode {
    let start = Instant::now();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    // `&TcpStream` implementa Read y Write: lector y escritor sobre el mismo socket
    let mut reader = BufReader::with_capacity(BUFF_LEN, &stream);
    let mut writer = BufWriter::with_capacity(BUFF_LEN, &stream);
    let mut request_line = String::new();

    let status = match read_and_resolve(&mut reader, resolver, &mut request_line) {
        Ok(mut resolved) => {
            let response = Response::file(resolved.length, resolved.last_modified);
            let sent = writer
                .write_all(&response.to_bytes())
                .and_then(|_| copy_body(&mut resolved.body, &mut writer));

            if let Err(e) = sent {
                warn!(%peer, request = %request_line, error = %e, "envío interrumpido");
            }
            StatusCode::Ok
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(%peer, request = %request_line, detail = %err, "error interno");
            } else if status.is_client_error() {
                debug!(%peer, request = %request_line, detail = %err, "request rechazado");
            }

            let response = Response::error(&err);
            let sent = writer
                .write_all(&response.to_bytes())
                .and_then(|_| writer.flush());

            if let Err(e) = sent {
                debug!(%peer, error = %e, "no se pudo enviar la respuesta de error");
            }
            status
        }
    };

    // El stream del recurso ya se liberó al salir del match; siguen lector, escritor y socket
    drop(reader);
    if let Err(e) = writer.flush() {
        debug!(%peer, error = %e, "flush final falló");
    }
    drop(writer);
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!(%peer, error = %e, "shutdown del socket falló");
    }
    drop(stream);

    info!(
        %peer,
        request = %request_line,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request atendido"
    );
    status
}

/// Lee request line y headers, valida y resuelve el recurso
fn read_and_resolve<R: BufRead>(
    reader: &mut R,
    resolver: &ResolverMode,
    request_line: &mut String,
) -> Result<Resolved, HttpError> {
    // 1. ReadRequestLine
    let line = read_line(reader)?
        .ok_or_else(|| HttpError::bad_request("Missing request line"))?;
    request_line.push_str(&line);
    let request = Request::parse_request_line(&line)?;

    // 2. ReadHeaders (se descartan)
    skip_headers(reader)?;

    // 3. Versión y método
    request.validate()?;

    // 4. Resolve: el target se decodifica recién acá, después del 405
    let path = request.decoded_target()?;
    debug!(path = %path, backend = resolver.name(), "resolviendo");
    resolver.resolve(&path)
}

/// Registro de sockets abiertos para poder cortarlos en un apagado forzado
#[derive(Clone, Default)]
pub struct OpenConnections {
    inner: Arc<Mutex<HashMap<u64, TcpStream>>>,
    next_id: Arc<AtomicU64>,
}

impl OpenConnections {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Guarda un clon del socket; retorna el id para liberarlo después
    pub fn register(&self, stream: &TcpStream) -> Option<u64> {
        let clone = stream.try_clone().ok()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, clone);
        Some(id)
    }

    /// Olvida un socket ya cerrado
    pub fn release(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Cierra todos los sockets registrados; desbloquea lecturas y escrituras pendientes
    pub fn shutdown_all(&self) -> usize {
        let streams: Vec<TcpStream> = self.lock().drain().map(|(_, s)| s).collect();
        for stream in &streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }

    /// Cantidad de conexiones registradas
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Verifica si no hay conexiones registradas
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
