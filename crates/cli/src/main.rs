use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ocmhub_apply::{ApplyCache, KubeApplier, KubeDeleter};
use ocmhub_core::{ClusterManager, FeatureConfig, HubConfig, InstallMode, ResourceId};
use ocmhub_kubehub::ResourceResolver;
use ocmhub_manifests::{Renderer, ResourceSetSelector, TemplateRenderer};
use ocmhub_reconcile::{HubReconcile, Pipeline, StageOutcome};
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ocmhubctl", version, about = "Cluster-manager hub convergence")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Mode { Default, Hosted }

impl From<Mode> for InstallMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Default => InstallMode::Default,
            Mode::Hosted => InstallMode::Hosted,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resource set selected for a descriptor or a set of flags
    Resources {
        /// ClusterManager descriptor (YAML); overrides the flags below
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
        #[arg(long = "mode", value_enum, default_value_t = Mode::Default)]
        mode: Mode,
        #[arg(long = "addon-manager", action = ArgAction::SetTrue)]
        addon_manager: bool,
        #[arg(long = "mw-replicaset", action = ArgAction::SetTrue)]
        mw_replicaset: bool,
        /// Registration webhook address is an IP (hosted only)
        #[arg(long = "registration-ip", action = ArgAction::SetTrue)]
        registration_ip: bool,
        /// Work webhook address is an IP (hosted only)
        #[arg(long = "work-ip", action = ArgAction::SetTrue)]
        work_ip: bool,
    },
    /// List every catalog group and its members
    Catalog,
    /// Render one manifest for a descriptor
    Render {
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
        /// Resource identifier, e.g. "cluster-manager/cluster-manager-namespace.yaml"
        id: String,
    },
    /// Run one convergence pass against the current kube context
    Reconcile {
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Remove every hub resource selected for the descriptor
    Teardown {
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
}

fn init_tracing() {
    let env = std::env::var("OCMHUB_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("OCMHUB_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid OCMHUB_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_descriptor(path: &Path) -> Result<ClusterManager> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cm: ClusterManager = serde_yaml::from_str(&raw).with_context(|| format!("parsing descriptor {}", path.display()))?;
    if cm.metadata.name.is_empty() {
        return Err(anyhow!("descriptor {} has no metadata.name", path.display()));
    }
    Ok(cm)
}

#[derive(Serialize)]
struct Selection<'a> {
    mode: InstallMode,
    features: FeatureConfig,
    resources: &'a [ResourceId],
}

#[derive(Serialize)]
struct CatalogGroup {
    group: String,
    members: Vec<ResourceId>,
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling pass");
            child.cancel();
        }
    });
    token
}

async fn kube_pipeline() -> Result<Pipeline> {
    let client = ocmhub_kubehub::get_kube_client().await?;
    let resolver = Arc::new(ResourceResolver::new(client));
    let cache = Arc::new(ApplyCache::new());
    let applier = KubeApplier::new(resolver.clone(), cache.clone());
    let deleter = KubeDeleter::new(resolver).with_cache(cache);
    let stage = HubReconcile::new(Arc::new(TemplateRenderer::embedded()), Arc::new(applier), Arc::new(deleter));
    Ok(Pipeline::new().with_stage(stage))
}

fn finish(op: &str, outcome: StageOutcome, cm: &ClusterManager, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            for c in cm.status.conditions.iter() {
                println!("{} • {:?} • {} • {}", c.type_, c.status, c.reason, c.message);
            }
            for r in &cm.status.related_resources {
                let gv = if r.group.is_empty() { r.version.clone() } else { format!("{}/{}", r.group, r.version) };
                let ns = if r.namespace.is_empty() { "-" } else { r.namespace.as_str() };
                println!("{} • {} • {} • {}", gv, r.resource, ns, r.name);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&cm.status)?),
    }
    match outcome.error {
        Some(e) => Err(anyhow!(e).context(format!("{op} stopped"))),
        None if outcome.is_stop() => Err(anyhow!("{op} stopped")),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let selector = ResourceSetSelector::default();

    match cli.command {
        Commands::Resources { file, mode, addon_manager, mw_replicaset, registration_ip, work_ip } => {
            let (mode, features) = match file {
                Some(path) => {
                    let cfg = HubConfig::from_cluster_manager(&load_descriptor(&path)?);
                    (cfg.mode(), cfg.features())
                }
                None => (
                    mode.into(),
                    FeatureConfig {
                        add_on_manager_enabled: addon_manager,
                        manifest_work_replica_set_enabled: mw_replicaset,
                        registration_webhook_uses_ip_endpoint: registration_ip,
                        work_webhook_uses_ip_endpoint: work_ip,
                    },
                ),
            };
            let resources = selector.select(mode, &features);
            match cli.output {
                Output::Human => {
                    for r in &resources {
                        let group = selector.group_of(r).map(|g| g.to_string()).unwrap_or_default();
                        println!("{} • {}", r, group);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&Selection { mode, features, resources: &resources })?),
            }
        }
        Commands::Catalog => {
            let groups: Vec<CatalogGroup> = selector
                .groups()
                .into_iter()
                .map(|(g, members)| CatalogGroup { group: g.to_string(), members })
                .collect();
            match cli.output {
                Output::Human => {
                    println!("catalog {}", selector.catalog().version);
                    for g in &groups {
                        println!("{} ({})", g.group, g.members.len());
                        for m in &g.members {
                            println!("  {}", m);
                        }
                    }
                }
                Output::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({ "version": selector.catalog().version, "groups": groups }))?
                ),
            }
        }
        Commands::Render { file, id } => {
            let cfg = HubConfig::from_cluster_manager(&load_descriptor(&file)?);
            let bytes = TemplateRenderer::embedded().render(&ResourceId::new(id), &cfg)?;
            match cli.output {
                Output::Human => print!("{}", String::from_utf8_lossy(&bytes)),
                Output::Json => {
                    let parsed = ocmhub_manifests::parse_manifest(&bytes)?;
                    println!("{}", serde_json::to_string_pretty(&parsed.json)?);
                }
            }
        }
        Commands::Reconcile { file } => {
            let mut cm = load_descriptor(&file)?;
            info!(cluster_manager = %cm.metadata.name, "reconcile invoked");
            let pipeline = kube_pipeline().await?;
            let outcome = pipeline.reconcile(&cancel_on_ctrl_c(), &mut cm).await;
            finish("reconcile", outcome, &cm, cli.output)?;
        }
        Commands::Teardown { file } => {
            let mut cm = load_descriptor(&file)?;
            info!(cluster_manager = %cm.metadata.name, "teardown invoked");
            let pipeline = kube_pipeline().await?;
            let outcome = pipeline.clean(&cancel_on_ctrl_c(), &mut cm).await;
            finish("teardown", outcome, &cm, cli.output)?;
        }
    }
    Ok(())
}
