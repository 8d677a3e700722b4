//! TCP client for a single Kasa plug.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use hearth_app::ports::SmartSwitch;
use hearth_domain::error::HearthError;

use crate::error::KasaError;
use crate::protocol;

/// A discovered plug, addressed by socket address.
///
/// Each request opens a fresh connection; plugs drop idle ones quickly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KasaPlug {
    addr: SocketAddr,
    alias: String,
}

impl KasaPlug {
    #[must_use]
    pub fn new(addr: SocketAddr, alias: impl Into<String>) -> Self {
        Self {
            addr,
            alias: alias.into(),
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    async fn request(&self, payload: &str) -> Result<Vec<u8>, KasaError> {
        let mut stream = TcpStream::connect(self.addr).await?;
        stream.write_all(&protocol::frame(payload.as_bytes())?).await?;

        let mut prefix = [0u8; 4];
        stream.read_exact(&mut prefix).await?;
        let mut body = vec![0u8; protocol::frame_len(prefix)?];
        stream.read_exact(&mut body).await?;

        Ok(protocol::decrypt(&body))
    }

    async fn set_relay(&self, on: bool) -> Result<(), KasaError> {
        let response = self.request(&protocol::set_relay_state(on)).await?;
        protocol::parse_set_relay_state(&response)?;
        tracing::debug!(alias = %self.alias, addr = %self.addr, on, "relay state set");
        Ok(())
    }
}

impl SmartSwitch for KasaPlug {
    async fn turn_on(&self) -> Result<(), HearthError> {
        Ok(self.set_relay(true).await?)
    }

    async fn turn_off(&self) -> Result<(), HearthError> {
        Ok(self.set_relay(false).await?)
    }

    async fn is_on(&self) -> Result<Option<bool>, HearthError> {
        let response = self.request(protocol::GET_SYSINFO).await?;
        let info = protocol::parse_sysinfo(&response)?;
        Ok(info.is_on())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Serve one framed request with a canned plaintext response and hand
    /// back the decrypted request.
    async fn serve_once(response: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut prefix = [0u8; 4];
            socket.read_exact(&mut prefix).await.unwrap();
            let mut body = vec![0u8; protocol::frame_len(prefix).unwrap()];
            socket.read_exact(&mut body).await.unwrap();
            socket
                .write_all(&protocol::frame(response.as_bytes()).unwrap())
                .await
                .unwrap();
            String::from_utf8(protocol::decrypt(&body)).unwrap()
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn should_send_relay_command() {
        let (addr, server) = serve_once(r#"{"system":{"set_relay_state":{"err_code":0}}}"#).await;
        let plug = KasaPlug::new(addr, "Pump");

        plug.turn_on().await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request, r#"{"system":{"set_relay_state":{"state":1}}}"#);
    }

    #[tokio::test]
    async fn should_read_relay_state() {
        let (addr, server) =
            serve_once(r#"{"system":{"get_sysinfo":{"alias":"Pump","relay_state":0,"err_code":0}}}"#)
                .await;
        let plug = KasaPlug::new(addr, "Pump");

        assert_eq!(plug.is_on().await.unwrap(), Some(false));
        assert_eq!(server.await.unwrap(), protocol::GET_SYSINFO);
    }

    #[tokio::test]
    async fn should_map_device_error_to_actuator_error() {
        let (addr, _server) =
            serve_once(r#"{"system":{"set_relay_state":{"err_code":-1,"err_msg":"busy"}}}"#).await;
        let plug = KasaPlug::new(addr, "Pump");

        let err = plug.turn_off().await.unwrap_err();
        assert!(matches!(err, HearthError::Actuator(_)));
    }

    #[tokio::test]
    async fn should_fail_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let plug = KasaPlug::new(addr, "Pump");
        assert!(plug.is_on().await.is_err());
    }
}
