use crate::{FrameReader, FrameWriter, KvsEngine, Result};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of a response frame that reports a failed operation.
pub const ERROR_PREFIX: &str = "error: ";

/// Settings for `KvsServer` and the store it serves.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the server listens on.
    pub addr: SocketAddr,
    /// Location of the command log.
    pub log_path: PathBuf,
    /// Drop a connection whose peer sends nothing for this long.
    ///
    /// `None` blocks indefinitely, which stalls every other client while one
    /// peer is silent.
    pub read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], 10000)),
            log_path: PathBuf::from("commands.log"),
            read_timeout: None,
        }
    }
}

/// The server of a key value store.
///
/// Connections are served one at a time: accept, read one request frame,
/// execute it with persistence, write one response frame, close.
pub struct KvsServer<E: KvsEngine> {
    engine: E,
    config: ServerConfig,
}

impl<E: KvsEngine> KvsServer<E> {
    /// Create a `KvsServer` with a given storage engine.
    pub fn new(engine: E, config: ServerConfig) -> Self {
        KvsServer { engine, config }
    }

    /// Run the server listening on the configured address.
    pub fn run(mut self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr)?;
        info!("Started server on {}", listener.local_addr()?);
        self.serve_listener(listener)
    }

    /// Serve connections from an already bound listener.
    pub fn serve_listener(&mut self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.serve(stream) {
                        error!("Error on serving client: {}", e);
                    }
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }
        Ok(())
    }

    fn serve(&mut self, tcp: TcpStream) -> Result<()> {
        let peer_addr = tcp.peer_addr()?;
        info!("Received connection from client {}", peer_addr);
        tcp.set_read_timeout(self.config.read_timeout)?;
        let mut reader = FrameReader::new(&tcp);
        let mut writer = FrameWriter::new(&tcp);

        let request = reader.recv()?;
        let response = match self.engine.execute(request.as_str(), true) {
            Ok(response) => response,
            Err(e) => {
                warn!("Request {:?} from {} failed: {}", request, peer_addr, e);
                format!("{}{}", ERROR_PREFIX, e)
            }
        };
        debug!("Sending response back to {}: {:?}", peer_addr, response);
        writer.send(&response)?;
        Ok(())
    }
}
