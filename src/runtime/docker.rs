use super::{ContainerRuntime, InspectError, Inspector};
use crate::types::{ContainerInfo, LifecycleEvent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    network_name: Option<String>,
    reconnect_delay: Duration,
}

impl DockerRuntime {
    pub fn connect(network_name: Option<String>, reconnect_delay: Duration) -> Result<Self> {
        // Honours DOCKER_HOST, otherwise the local unix socket.
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            network_name,
            reconnect_delay,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn monitor(&self, event_tx: mpsc::Sender<LifecycleEvent>) -> Result<()> {
        loop {
            // Unfiltered: exec and network events name their container
            // through the `container` attribute.
            let mut stream = self.docker.events(None::<EventsOptions<String>>);

            info!("Listening for Docker events...");
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(message) => {
                        let event = lifecycle_event(message);
                        debug!("Docker event: {} {}", event.kind, event.id);
                        if event_tx.send(event).await.is_err() {
                            return Err(anyhow!("Event channel closed"));
                        }
                    }
                    Err(e) => {
                        error!("Error in Docker event stream: {}", e);
                        break; // Break inner loop to reconnect
                    }
                }
            }

            warn!(
                "Docker event stream ended, events may be missed. Reconnecting in {:?}...",
                self.reconnect_delay
            );
            sleep(self.reconnect_delay).await;
        }
    }
}

#[async_trait]
impl Inspector for DockerRuntime {
    async fn inspect(&self, id: &str) -> Result<Option<ContainerInfo>, InspectError> {
        match self.docker.inspect_container(id, None).await {
            Ok(detail) => Ok(Some(container_info(&detail, self.network_name.as_deref()))),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(InspectError {
                id: id.to_string(),
                source: Box::new(e),
            }),
        }
    }
}

fn lifecycle_event(message: EventMessage) -> LifecycleEvent {
    let kind = message.typ.map(|t| t.to_string()).unwrap_or_default();
    let (id, attributes) = match message.actor {
        Some(actor) => (
            actor.id.unwrap_or_default(),
            actor.attributes.unwrap_or_default(),
        ),
        None => Default::default(),
    };
    LifecycleEvent {
        kind,
        id,
        attributes,
    }
}

fn container_info(detail: &ContainerInspectResponse, network_name: Option<&str>) -> ContainerInfo {
    let address = match network_name {
        Some(network) => get_ip_for_network(detail, network),
        None => get_default_ip(detail),
    };
    ContainerInfo {
        name: detail.name.clone().unwrap_or_default(),
        image: detail
            .config
            .as_ref()
            .and_then(|c| c.image.clone())
            .unwrap_or_default(),
        address: address.unwrap_or_default(),
    }
}

fn get_ip_for_network(detail: &ContainerInspectResponse, network_name: &str) -> Option<String> {
    let net = detail
        .network_settings
        .as_ref()?
        .networks
        .as_ref()?
        .get(network_name)?;
    non_empty(&net.ip_address).or_else(|| non_empty(&net.global_ipv6_address))
}

/// Default bridge address, else the first attached network (by name) that
/// has an IPv4 address.
fn get_default_ip(detail: &ContainerInspectResponse) -> Option<String> {
    let settings = detail.network_settings.as_ref()?;
    if let Some(ip) = non_empty(&settings.ip_address) {
        return Some(ip);
    }
    let networks = settings.networks.as_ref()?;
    let mut names: Vec<&String> = networks.keys().collect();
    names.sort();
    names
        .into_iter()
        .find_map(|name| non_empty(&networks[name].ip_address))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{
        ContainerConfig, EndpointSettings, EventActor, EventMessageTypeEnum, NetworkSettings,
    };
    use std::collections::HashMap;

    fn endpoint(v4: &str, v6: &str) -> EndpointSettings {
        EndpointSettings {
            ip_address: Some(v4.to_string()),
            global_ipv6_address: Some(v6.to_string()),
            ..Default::default()
        }
    }

    fn detail(bridge_ip: &str, networks: Vec<(&str, EndpointSettings)>) -> ContainerInspectResponse {
        ContainerInspectResponse {
            name: Some("/myredis".into()),
            config: Some(ContainerConfig {
                image: Some("library/redis:7".into()),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                ip_address: Some(bridge_ip.to_string()),
                networks: Some(
                    networks
                        .into_iter()
                        .map(|(n, e)| (n.to_string(), e))
                        .collect::<HashMap<_, _>>(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn uses_bridge_address_by_default() {
        let info = container_info(&detail("172.17.0.2", vec![]), None);
        assert_eq!(
            info,
            ContainerInfo {
                name: "/myredis".into(),
                image: "library/redis:7".into(),
                address: "172.17.0.2".into(),
            }
        );
    }

    #[test]
    fn falls_back_to_first_named_network() {
        let d = detail(
            "",
            vec![("zeta", endpoint("10.0.9.9", "")), ("alpha", endpoint("10.0.1.1", ""))],
        );
        assert_eq!(container_info(&d, None).address, "10.0.1.1");
    }

    #[test]
    fn configured_network_prefers_ipv4_then_ipv6() {
        let d = detail(
            "172.17.0.2",
            vec![("overlay", endpoint("", "fd00::5")), ("other", endpoint("10.0.0.3", ""))],
        );
        assert_eq!(container_info(&d, Some("overlay")).address, "fd00::5");
        assert_eq!(container_info(&d, Some("other")).address, "10.0.0.3");
        assert_eq!(container_info(&d, Some("missing")).address, "");
    }

    #[test]
    fn no_network_settings_means_no_address() {
        let d = ContainerInspectResponse::default();
        assert_eq!(container_info(&d, None).address, "");
    }

    #[test]
    fn converts_event_messages() {
        let message = EventMessage {
            typ: Some(EventMessageTypeEnum::CONTAINER),
            action: Some("start".into()),
            actor: Some(EventActor {
                id: Some("a1b2c3d4e5f67890".into()),
                attributes: Some(HashMap::from([("image".to_string(), "redis".to_string())])),
            }),
            ..Default::default()
        };
        let event = lifecycle_event(message);
        assert_eq!(event.kind, "container");
        assert_eq!(event.id, "a1b2c3d4e5f67890");
        assert_eq!(event.attributes["image"], "redis");
    }
}
