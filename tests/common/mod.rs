//! Helpers compartidos por los tests de integración
//! tests/common/mod.rs

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use static_httpd::server::Server;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Cómo se guarda una entrada en el zip de prueba
#[derive(Clone, Copy)]
pub enum Method {
    Stored,
    Deflate,
    /// Método arbitrario (p. ej. 12 = bzip2) con los bytes tal cual
    Raw(u16),
}

/// Escribe un zip mínimo: LFHs + Central Directory + EOCD
///
/// Un nombre terminado en '/' es una entrada de directorio.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8], Method)]) {
    let mut out: Vec<u8> = Vec::new();
    let mut central: Vec<u8> = Vec::new();

    for (name, data, method) in entries {
        let mut crc = Crc::new();
        crc.update(data);

        let (method_id, payload) = match method {
            Method::Stored => (0u16, data.to_vec()),
            Method::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data).unwrap();
                (8u16, encoder.finish().unwrap())
            }
            Method::Raw(id) => (*id, data.to_vec()),
        };

        let offset = out.len() as u32;
        let is_dir = name.ends_with('/');

        // Local File Header
        out.write_u32::<LittleEndian>(0x0403_4b50).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(method_id).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0x21).unwrap();
        out.write_u32::<LittleEndian>(crc.sum()).unwrap();
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        // Central Directory File Header
        central.write_u32::<LittleEndian>(0x0201_4b50).unwrap();
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(method_id).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0x21).unwrap();
        central.write_u32::<LittleEndian>(crc.sum()).unwrap();
        central.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        central.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        central.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u32::<LittleEndian>(if is_dir { 0x10 } else { 0 }).unwrap();
        central.write_u32::<LittleEndian>(offset).unwrap();
        central.extend_from_slice(name.as_bytes());
    }

    let cd_offset = out.len() as u32;
    let cd_size = central.len() as u32;
    out.extend_from_slice(&central);

    // End of Central Directory
    out.write_u32::<LittleEndian>(0x0605_4b50).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();

    std::fs::write(path, out).unwrap();
}

/// Inicia un servidor en un puerto efímero y espera a que haga el bind
pub fn start_server(root: &Path, read_timeout: Option<Duration>) -> (Server, SocketAddr) {
    let mut server = Server::new(0, root).expect("server");
    if let Some(timeout) = read_timeout {
        server.set_read_timeout(timeout);
    }
    server.set_shutdown_timeout(Duration::from_secs(2));
    server.start().expect("start");

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(addr) = server.local_addr() {
            return (server, SocketAddr::from(([127, 0, 0, 1], addr.port())));
        }
        assert!(Instant::now() < deadline, "el servidor no hizo bind a tiempo");
        thread::sleep(Duration::from_millis(10));
    }
}

/// Envía bytes crudos y lee la respuesta hasta que el servidor cierre
pub fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream.set_write_timeout(Some(Duration::from_secs(10))).unwrap();

    stream.write_all(raw).unwrap();
    stream.flush().unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

/// GET HTTP/1.0 con un header cualquiera
pub fn get(addr: SocketAddr, target: &str) -> ParsedResponse {
    let request = format!("GET {} HTTP/1.0\r\nUser-Agent: test\r\n\r\n", target);
    parse_response(&send_raw(addr, request.as_bytes()))
}

/// Respuesta separada en status, headers y body
#[derive(Debug)]
pub struct ParsedResponse {
    pub status_line: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn parse_response(raw: &[u8]) -> ParsedResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("respuesta sin fin de headers");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default().to_string();
    let status = status_line
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code");

    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect();

    ParsedResponse {
        status_line,
        status,
        headers,
        body,
    }
}
