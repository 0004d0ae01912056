//! Resource kinds served by each OpenStack API.

use osc_dispatch::{DualKind, ResourceKind, Service};

// Compute

pub const AGGREGATE: ResourceKind =
    ResourceKind::new(Service::Compute, "os-aggregates", "aggregate", "aggregates")
        .client_filter();

pub const COMPUTE_SECURITY_GROUP: ResourceKind = ResourceKind::new(
    Service::Compute,
    "os-security-groups",
    "security_group",
    "security_groups",
)
.nouns("security group", "security groups")
.client_filter();

pub const COMPUTE_SECURITY_GROUP_RULE: ResourceKind = ResourceKind::new(
    Service::Compute,
    "os-security-group-rules",
    "security_group_rule",
    "security_group_rules",
)
.nouns("security group rule", "security group rules")
.id_only();

pub const COMPUTE_FLOATING_IP: ResourceKind = ResourceKind::new(
    Service::Compute,
    "os-floating-ips",
    "floating_ip",
    "floating_ips",
)
.nouns("floating IP", "floating IPs")
.lookup_by("ip")
.client_filter();

// Network

pub const NETWORK: ResourceKind =
    ResourceKind::new(Service::Network, "v2.0/networks", "network", "networks");

pub const SUBNET: ResourceKind =
    ResourceKind::new(Service::Network, "v2.0/subnets", "subnet", "subnets");

pub const PORT: ResourceKind = ResourceKind::new(Service::Network, "v2.0/ports", "port", "ports");

pub const ROUTER: ResourceKind =
    ResourceKind::new(Service::Network, "v2.0/routers", "router", "routers");

pub const NETWORK_SECURITY_GROUP: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/security-groups",
    "security_group",
    "security_groups",
)
.nouns("security group", "security groups");

pub const NETWORK_SECURITY_GROUP_RULE: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/security-group-rules",
    "security_group_rule",
    "security_group_rules",
)
.nouns("security group rule", "security group rules")
.id_only();

pub const DEFAULT_SECURITY_GROUP_RULE: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/default-security-group-rules",
    "default_security_group_rule",
    "default_security_group_rules",
)
.nouns(
    "default security group rule",
    "default security group rules",
)
.id_only();

pub const NETWORK_FLOATING_IP: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/floatingips",
    "floatingip",
    "floatingips",
)
.nouns("floating IP", "floating IPs")
.lookup_by("floating_ip_address");

pub const ADDRESS_GROUP: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/address-groups",
    "address_group",
    "address_groups",
)
.nouns("address group", "address groups");

pub const ADDRESS_SCOPE: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/address-scopes",
    "address_scope",
    "address_scopes",
)
.nouns("address scope", "address scopes");

pub const SUBNET_POOL: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/subnetpools",
    "subnetpool",
    "subnetpools",
)
.nouns("subnet pool", "subnet pools");

pub const QOS_POLICY: ResourceKind =
    ResourceKind::new(Service::Network, "v2.0/qos/policies", "policy", "policies")
        .nouns("QoS policy", "QoS policies");

pub const FLAVOR_PROFILE: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/service_profiles",
    "service_profile",
    "service_profiles",
)
.nouns("network flavor profile", "network flavor profiles")
.id_only();

pub const RBAC_POLICY: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/rbac-policies",
    "rbac_policy",
    "rbac_policies",
)
.nouns("RBAC policy", "RBAC policies")
.id_only();

// Dual-stack

pub const SECURITY_GROUP: DualKind = DualKind::new(NETWORK_SECURITY_GROUP, COMPUTE_SECURITY_GROUP);

pub const SECURITY_GROUP_RULE: DualKind =
    DualKind::new(NETWORK_SECURITY_GROUP_RULE, COMPUTE_SECURITY_GROUP_RULE);

pub const FLOATING_IP: DualKind = DualKind::new(NETWORK_FLOATING_IP, COMPUTE_FLOATING_IP);

// Volume

pub const QOS_SPEC: ResourceKind =
    ResourceKind::new(Service::Volume, "qos-specs", "qos_specs", "qos_specs")
        .nouns("QoS specification", "QoS specifications")
        .client_filter();

pub const VOLUME_TYPE: ResourceKind =
    ResourceKind::new(Service::Volume, "types", "volume_type", "volume_types")
        .nouns("volume type", "volume types")
        .client_filter();

// Image

pub const IMAGE: ResourceKind = ResourceKind::new(Service::Image, "v2/images", "image", "images")
    .unenveloped()
    .patch();

// Identity

pub const PROJECT: ResourceKind =
    ResourceKind::new(Service::Identity, "v3/projects", "project", "projects").patch();

pub const DOMAIN: ResourceKind =
    ResourceKind::new(Service::Identity, "v3/domains", "domain", "domains").patch();

#[cfg(test)]
mod tests {
    use super::*;
    use osc_dispatch::{Backend, UpdateMethod};

    #[test]
    fn test_dual_kinds_share_nouns() {
        for dual in [SECURITY_GROUP, SECURITY_GROUP_RULE, FLOATING_IP] {
            assert_eq!(dual.network.noun, dual.compute.noun);
            assert_eq!(dual.select(Backend::Network).service, Service::Network);
            assert_eq!(dual.select(Backend::Compute).service, Service::Compute);
        }
    }

    #[test]
    fn test_id_only_kinds() {
        for kind in [
            NETWORK_SECURITY_GROUP_RULE,
            DEFAULT_SECURITY_GROUP_RULE,
            FLAVOR_PROFILE,
            RBAC_POLICY,
        ] {
            assert!(kind.lookup_field.is_none(), "{}", kind.noun);
        }
    }

    #[test]
    fn test_image_is_bare_and_patched() {
        assert!(!IMAGE.enveloped);
        assert_eq!(IMAGE.update_method, UpdateMethod::Patch);
        assert_eq!(PROJECT.update_method, UpdateMethod::Patch);
    }
}
