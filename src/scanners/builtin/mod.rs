mod policy_name;
mod policy_type;
mod policy_unattached;
mod proxy_description;
mod proxy_name;
mod revision_count;
mod shared_flow_use;
mod target_load_balancer;
mod target_ssl;
mod target_type;
mod vhost;

use super::ScannerPlugin;

/// Returns every built-in scanner plugin.
pub fn all_plugins() -> Vec<Box<dyn ScannerPlugin>> {
    vec![
        Box::new(proxy_name::ProxyNamePlugin),
        Box::new(revision_count::RevisionCountPlugin),
        Box::new(proxy_description::ProxyDescriptionPlugin),
        Box::new(policy_name::PolicyNamePlugin),
        Box::new(policy_type::PolicyTypePlugin),
        Box::new(policy_unattached::PolicyUnattachedPlugin),
        Box::new(shared_flow_use::SharedFlowUsePlugin),
        Box::new(target_load_balancer::TargetLoadBalancerPlugin),
        Box::new(target_ssl::TargetSslPlugin),
        Box::new(target_type::TargetTypePlugin),
        Box::new(vhost::VhostPlugin),
    ]
}
