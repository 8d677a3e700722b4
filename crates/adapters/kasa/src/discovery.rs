//! Alias-based plug discovery.
//!
//! Pinned hosts from [`KasaConfig::hosts`] are resolved directly. Anything
//! else is found by broadcasting `get_sysinfo` and collecting answers until
//! the discovery window closes or a plug with the wanted alias replies.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::time::{Instant, timeout_at};

use hearth_app::ports::SwitchDiscovery;
use hearth_domain::error::HearthError;

use crate::client::KasaPlug;
use crate::config::KasaConfig;
use crate::error::KasaError;
use crate::protocol;

/// Finds Kasa plugs on the local network.
#[derive(Debug, Clone)]
pub struct KasaDiscovery {
    config: KasaConfig,
}

impl KasaDiscovery {
    #[must_use]
    pub fn new(config: KasaConfig) -> Self {
        Self { config }
    }

    async fn resolve_pinned(&self, alias: &str, host: &str) -> Result<KasaPlug, KasaError> {
        let addr = lookup_host((host, self.config.port))
            .await?
            .next()
            .ok_or_else(|| KasaError::UnresolvedHost(host.to_string()))?;
        tracing::info!(alias, %addr, "using pinned plug address");
        Ok(KasaPlug::new(addr, alias))
    }

    async fn broadcast(&self, alias: &str) -> Result<Option<KasaPlug>, KasaError> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;
        socket.set_broadcast(true)?;
        let probe = protocol::encrypt(protocol::GET_SYSINFO.as_bytes());
        socket
            .send_to(&probe, (self.config.broadcast_address.as_str(), self.config.port))
            .await?;

        let deadline = Instant::now() + Duration::from_millis(self.config.discovery_window_ms);
        let mut buf = vec![0u8; protocol::MAX_FRAME_LEN];
        let mut seen = 0usize;

        while let Ok(received) = timeout_at(deadline, socket.recv_from(&mut buf)).await {
            let (len, from) = received?;
            seen += 1;
            let info = match protocol::parse_sysinfo(&protocol::decrypt(&buf[..len])) {
                Ok(info) => info,
                Err(err) => {
                    tracing::debug!(%from, error = %err, "ignoring discovery answer");
                    continue;
                }
            };
            tracing::debug!(%from, alias = %info.alias, model = ?info.model, "plug answered discovery");
            if info.alias == alias {
                let addr = SocketAddr::new(from.ip(), self.config.port);
                tracing::info!(alias, %addr, mac = ?info.mac, "plug discovered");
                return Ok(Some(KasaPlug::new(addr, alias)));
            }
        }

        tracing::debug!(alias, answers = seen, "discovery window closed");
        Ok(None)
    }
}

impl SwitchDiscovery for KasaDiscovery {
    type Switch = KasaPlug;

    async fn discover(&self, alias: &str) -> Result<Option<KasaPlug>, HearthError> {
        if let Some(host) = self.config.hosts.get(alias) {
            return Ok(Some(self.resolve_pinned(alias, host).await?));
        }
        Ok(self.broadcast(alias).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Answer every discovery probe with the sysinfo of each given alias.
    async fn responder(aliases: &'static [&'static str]) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                let request = protocol::decrypt(&buf[..len]);
                assert_eq!(request, protocol::GET_SYSINFO.as_bytes());
                for alias in aliases {
                    let answer = format!(
                        r#"{{"system":{{"get_sysinfo":{{"alias":"{alias}","relay_state":0,"err_code":0}}}}}}"#
                    );
                    socket
                        .send_to(&protocol::encrypt(answer.as_bytes()), from)
                        .await
                        .unwrap();
                }
            }
        });
        port
    }

    fn config(port: u16) -> KasaConfig {
        KasaConfig {
            broadcast_address: "127.0.0.1".to_string(),
            port,
            discovery_window_ms: 300,
            hosts: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn should_find_plug_by_alias() {
        let port = responder(&["Fan", "Heater"]).await;
        let discovery = KasaDiscovery::new(config(port));

        let plug = discovery.discover("Heater").await.unwrap().unwrap();
        assert_eq!(plug.alias(), "Heater");
        assert_eq!(plug.addr(), SocketAddr::from(([127, 0, 0, 1], port)));
    }

    #[tokio::test]
    async fn should_return_none_when_alias_never_answers() {
        let port = responder(&["Fan"]).await;
        let discovery = KasaDiscovery::new(config(port));

        assert!(discovery.discover("Pump").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_use_pinned_host_without_broadcast() {
        let mut config = config(9999);
        config
            .hosts
            .insert("Pump".to_string(), "127.0.0.1".to_string());
        let discovery = KasaDiscovery::new(config);

        let plug = discovery.discover("Pump").await.unwrap().unwrap();
        assert_eq!(plug.addr(), SocketAddr::from(([127, 0, 0, 1], 9999)));
    }
}
