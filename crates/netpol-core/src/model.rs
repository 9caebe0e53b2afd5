//! Data model: source Pods and derived NetworkPolicies
//!
//! The controller treats a Pod as an immutable snapshot at the time of a
//! cache read. The derived NetworkPolicy is owned by the controller and is
//! computed deterministically from the Pod's declared container ports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::EntityKey;

/// Label written back onto a Pod to record which policy governs it
///
/// The derived policy selects exactly the Pods carrying this label with the
/// policy's own name as the value.
pub const MARKER_LABEL: &str = "autoNetPolicy";

/// Transport protocol of a declared container port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

/// A port declared by a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPort {
    /// Transport protocol
    pub protocol: Protocol,
    /// Container-relative port number
    pub container_port: u16,
}

/// A container within a Pod, reduced to what the controller needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container name
    pub name: String,
    /// Declared ports, in declaration order
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
}

/// Snapshot of a source Pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Pod labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Containers, in declaration order
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Pod {
    /// The entity key identifying this Pod
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether this Pod already carries the marker label
    ///
    /// Presence of the key suffices; the value is not compared.
    pub fn has_marker_label(&self) -> bool {
        self.labels.contains_key(MARKER_LABEL)
    }
}

/// A (protocol, port) pair in a policy rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPort {
    /// Transport protocol
    pub protocol: Protocol,
    /// Port number
    pub port: u16,
}

/// A single ingress or egress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Ports the rule applies to
    pub ports: Vec<PolicyPort>,
}

/// Spec of a derived NetworkPolicy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicySpec {
    /// Label selector matching the governed Pods
    pub pod_selector: BTreeMap<String, String>,
    /// Ingress rules
    pub ingress: Vec<PolicyRule>,
    /// Egress rules
    pub egress: Vec<PolicyRule>,
}

/// NetworkPolicy derived from a single Pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    /// Policy name, derived from the Pod's entity key
    pub name: String,
    /// Policy namespace, equal to the Pod's namespace
    pub namespace: String,
    /// Policy spec
    pub spec: NetworkPolicySpec,
}

impl NetworkPolicy {
    /// Compute the desired policy for a Pod
    ///
    /// Collects every (protocol, port) pair across all containers, in the
    /// order the containers and ports are declared. Duplicates are
    /// preserved: this is a direct structural mapping, not a set union.
    /// Ingress and egress carry the identical port list, and the selector
    /// matches exactly the Pods labeled with this policy's name.
    pub fn for_pod(pod: &Pod) -> Self {
        let name = pod.key().policy_name();

        let ports: Vec<PolicyPort> = pod
            .containers
            .iter()
            .flat_map(|container| container.ports.iter())
            .map(|port| PolicyPort {
                protocol: port.protocol,
                port: port.container_port,
            })
            .collect();

        let mut pod_selector = BTreeMap::new();
        pod_selector.insert(MARKER_LABEL.to_string(), name.clone());

        Self {
            namespace: pod.namespace.clone(),
            spec: NetworkPolicySpec {
                pod_selector,
                ingress: vec![PolicyRule {
                    ports: ports.clone(),
                }],
                egress: vec![PolicyRule { ports }],
            },
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_with_ports(containers: Vec<Vec<(Protocol, u16)>>) -> Pod {
        Pod {
            namespace: "default".to_string(),
            name: "web".to_string(),
            labels: BTreeMap::new(),
            containers: containers
                .into_iter()
                .enumerate()
                .map(|(i, ports)| Container {
                    name: format!("c{i}"),
                    ports: ports
                        .into_iter()
                        .map(|(protocol, container_port)| ContainerPort {
                            protocol,
                            container_port,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn port_mapping_preserves_declaration_order() {
        let pod = pod_with_ports(vec![
            vec![(Protocol::Tcp, 80)],
            vec![(Protocol::Udp, 53), (Protocol::Tcp, 53)],
        ]);

        let policy = NetworkPolicy::for_pod(&pod);
        let expected = vec![
            PolicyPort {
                protocol: Protocol::Tcp,
                port: 80,
            },
            PolicyPort {
                protocol: Protocol::Udp,
                port: 53,
            },
            PolicyPort {
                protocol: Protocol::Tcp,
                port: 53,
            },
        ];

        assert_eq!(policy.spec.ingress.len(), 1);
        assert_eq!(policy.spec.egress.len(), 1);
        assert_eq!(policy.spec.ingress[0].ports, expected);
        assert_eq!(policy.spec.egress[0].ports, expected);
    }

    #[test]
    fn port_mapping_preserves_duplicates() {
        let pod = pod_with_ports(vec![
            vec![(Protocol::Tcp, 8080)],
            vec![(Protocol::Tcp, 8080)],
        ]);

        let policy = NetworkPolicy::for_pod(&pod);
        assert_eq!(policy.spec.ingress[0].ports.len(), 2);
    }

    #[test]
    fn selector_matches_marker_label() {
        let pod = pod_with_ports(vec![]);
        let policy = NetworkPolicy::for_pod(&pod);

        assert_eq!(policy.name, "default-web");
        assert_eq!(policy.namespace, "default");
        assert_eq!(
            policy.spec.pod_selector.get(MARKER_LABEL),
            Some(&"default-web".to_string())
        );
        assert_eq!(policy.spec.pod_selector.len(), 1);
    }

    #[test]
    fn protocol_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Protocol::Tcp).unwrap(), "\"TCP\"");
        assert_eq!(
            serde_json::from_str::<Protocol>("\"UDP\"").unwrap(),
            Protocol::Udp
        );
    }
}
