//! Manifest templates embedded at build time, addressed by their path under `assets/`.

macro_rules! asset {
    ($path:literal) => {
        ($path, include_str!(concat!("../assets/", $path)))
    };
}

pub static ASSETS: &[(&str, &str)] = &[
    asset!("cluster-manager/cluster-manager-namespace.yaml"),
    asset!("cluster-manager/hub/cluster-manager-addon-manager-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-addon-manager-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-addon-manager-serviceaccount.yaml"),
    asset!("cluster-manager/hub/cluster-manager-manifestworkreplicaset-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-manifestworkreplicaset-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-manifestworkreplicaset-serviceaccount.yaml"),
    asset!("cluster-manager/hub/cluster-manager-placement-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-placement-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-placement-serviceaccount.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-serviceaccount.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-endpoint-hosted.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-service-hosted.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-service.yaml"),
    asset!("cluster-manager/hub/cluster-manager-registration-webhook-serviceaccount.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-clusterrole.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-clusterrolebinding.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-endpoint-hosted.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-service-hosted.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-service.yaml"),
    asset!("cluster-manager/hub/cluster-manager-work-webhook-serviceaccount.yaml"),
];

pub fn names() -> impl Iterator<Item = &'static str> {
    ASSETS.iter().map(|(n, _)| *n)
}
