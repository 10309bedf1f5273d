use crate::{FrameReader, FrameWriter, Operation, Result};
use std::net::{TcpStream, ToSocketAddrs};

/// Key value store client
pub struct KvsClient {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
}

impl KvsClient {
    /// Connect to `addr` to access `KvsServer`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;
        Ok(KvsClient {
            reader: FrameReader::new(tcp_reader),
            writer: FrameWriter::new(tcp_writer),
        })
    }

    /// Sends `op` as one request frame and waits for the response frame.
    pub fn request(&mut self, op: &Operation) -> Result<String> {
        let request = op.to_request()?;
        debug!("Client sending message {:?}", request);
        self.writer.send(&request)?;
        let response = self.reader.recv()?;
        debug!("Client received message {:?}", response);
        Ok(response)
    }

    /// Builds an operation from its parts and sends it.
    pub fn send(
        &mut self,
        command: &str,
        key: Option<String>,
        value: Option<String>,
    ) -> Result<String> {
        self.request(&Operation::new(command, key, value))
    }
}
