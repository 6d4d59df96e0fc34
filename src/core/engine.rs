use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::BlocksmithError;
use super::{
    content_hash, BlockGenerator, BlocksRenderer, ExamineReport, GraphSnapshot, HostGraph, Model,
    NameMapper, NodeId, SummaryBuilder, TypeResolver, WalkOptions, Walker,
};

/// Loads the graph snapshot and runs the walk for every command
pub struct Engine {
    config: Config,
    names: NameMapper,
}

/// A loaded snapshot and the hash of its text
struct LoadedGraph {
    graph: HostGraph,
    content_hash: String,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let names = NameMapper::new(&config.naming);

        Ok(Self { config, names })
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let path = path.unwrap_or_else(|| PathBuf::from("Blocksmith.toml"));
        if tokio::fs::try_exists(&path).await? {
            warn!("⚠️ {} already exists, leaving it untouched", path.display());
            return Ok(());
        }

        Config::default().save(&path)?;
        info!("✅ Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Walk the graph and write the visit report
    pub async fn examine(
        &self,
        graph: Option<PathBuf>,
        output: Option<PathBuf>,
        force_show_everything: bool,
        show_ids: bool,
    ) -> Result<()> {
        let loaded = self.load_graph(graph).await?;
        let mut options = WalkOptions::from(&self.config.walk);
        options.force_show_everything |= force_show_everything;

        let model = self.walk(&loaded.graph, options)?;
        let report = ExamineReport::new(&loaded.graph, &model)
            .with_ids(show_ids)
            .render();

        let path = self.output_dir(output).join("examine").join("examine.txt");
        write_output(&path, &report).await?;

        info!("✅ Examined {} nodes ({} visits) into {}", model.visited_count, model.visits.len(), path.display());
        Ok(())
    }

    /// Generate block definitions, the toolbox and the shared utilities
    pub async fn generate(&self, graph: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let loaded = self.load_graph(graph).await?;
        let model = self.walk(&loaded.graph, WalkOptions::from(&self.config.walk))?;
        let resolver = TypeResolver::new(self.names.clone(), &model);

        info!("🧱 Generating blocks for {} modules and {} classes", model.modules.len(), model.classes.len());
        let generated = BlockGenerator::new(&loaded.graph, &model, &resolver, &self.config.generation)
            .generate()?;

        let renderer = BlocksRenderer::new()?;
        let files = renderer.render_all(&generated, &resolver)?;

        let root = self.output_dir(output).join("generate_blocks");
        for file in &files {
            write_output(&root.join(&file.path), &file.content).await?;
        }

        if !generated.diagnostics.is_empty() {
            warn!("⚠️ {} members were skipped, see warnings above", generated.diagnostics.len());
        }
        info!("✅ Wrote {} files to {}", files.len(), root.display());
        Ok(())
    }

    /// Write the JSON summary of the walked model
    pub async fn summary(&self, graph: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let loaded = self.load_graph(graph).await?;
        let model = self.walk(&loaded.graph, WalkOptions::from(&self.config.walk))?;
        let resolver = TypeResolver::new(self.names.clone(), &model);
        resolver.validate()?;

        let summary = SummaryBuilder::new(&loaded.graph, &model, &resolver)
            .build(loaded.content_hash, Utc::now());

        let path = self.output_dir(output).join("generate_json").join("model.json");
        write_output(&path, &summary.to_json()?).await?;

        info!("✅ Summarized {} modules and {} classes into {}", summary.modules.len(), summary.classes.len(), path.display());
        Ok(())
    }

    async fn load_graph(&self, graph: Option<PathBuf>) -> Result<LoadedGraph> {
        let path = graph.unwrap_or_else(|| self.config.project.graph.clone());
        info!("📖 Loading graph snapshot {}", path.display());

        let content = tokio::fs::read_to_string(&path).await
            .map_err(|e| anyhow::anyhow!("Failed to read graph snapshot {}: {}", path.display(), e))?;
        let snapshot = GraphSnapshot::from_json(&content)?;
        let graph = HostGraph::from_snapshot(&snapshot, &self.config.boundary)?;

        debug!("Snapshot {} holds {} nodes", path.display(), graph.len());

        Ok(LoadedGraph {
            graph,
            content_hash: content_hash(&content),
        })
    }

    /// Configured root modules by name, or the snapshot's own roots
    fn roots(&self, graph: &HostGraph) -> Result<Vec<NodeId>> {
        if self.config.walk.roots.is_empty() {
            return Ok(graph.roots().to_vec());
        }

        self.config.walk.roots.iter()
            .map(|name| {
                graph.module_by_name(name).ok_or_else(|| {
                    anyhow::Error::from(BlocksmithError::Config(format!(
                        "root module {} is not in the graph snapshot", name
                    )))
                })
            })
            .collect()
    }

    fn walk(&self, graph: &HostGraph, options: WalkOptions) -> Result<Model> {
        let roots = self.roots(graph)?;
        Ok(Walker::new(graph, &self.names, options).walk(&roots)?)
    }

    fn output_dir(&self, output: Option<PathBuf>) -> PathBuf {
        output.unwrap_or_else(|| self.config.project.output_dir.clone())
    }
}

async fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}
