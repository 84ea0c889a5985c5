//! Log pipeline artifacts
//!
//! One set per environment: collector inputs, processor pipeline, ingest
//! pipeline, index template, dashboard and alerts. Every stage carries the
//! same metadata tags (`service`, `environment`, `log_type`). Output contains
//! no timestamps, so unchanged inputs render byte-identical files.

mod collector;
mod elastic;
mod kibana;
mod processor;

use crate::{Error, ParsingGrammar, Result};
use mon_model::{Environment, ServiceDescriptor, slugify};
use serde::Serialize;

/// Beats input port of the processor.
pub const PROCESSOR_PORT: u16 = 5044;
/// Default processor endpoint for the collector.
pub const PROCESSOR_HOST: &str = "localhost:5044";
/// Default search cluster endpoint for the processor.
pub const SEARCH_HOST: &str = "localhost:9200";

/// File names of the rendered set, in write order.
pub const PIPELINE_FILES: [&str; 6] = [
    "filebeat.yml",
    "logstash.conf",
    "ingest_pipeline.json",
    "index_template.json",
    "kibana_dashboard.json",
    "alerts.json",
];

/// Tags shared by every stage for one environment.
#[derive(Debug, Clone)]
pub struct PipelineContext<'a> {
    pub descriptor: &'a ServiceDescriptor,
    /// Service slug, e.g. `payments_api`.
    pub service: String,
    /// Lowercase environment tag, e.g. `exp`.
    pub environment: String,
    /// Index-safe service prefix, e.g. `payments-api`.
    pub index_prefix: String,
}

impl<'a> PipelineContext<'a> {
    pub fn new(descriptor: &'a ServiceDescriptor, environment: &Environment) -> Self {
        let service = descriptor.slug();
        Self {
            descriptor,
            index_prefix: service.replace('_', "-"),
            environment: slugify(&environment.name),
            service,
        }
    }

    /// Name the ingest pipeline and index template are registered under.
    pub fn asset_name(&self) -> String {
        format!("{}-logs", self.index_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPipelineFiles {
    /// Registration name of the ingest pipeline and index template.
    pub asset_name: String,
    pub filebeat: String,
    pub logstash: String,
    pub ingest_pipeline: String,
    pub index_template: String,
    pub dashboard: String,
    pub alerts: String,
}

impl LogPipelineFiles {
    /// `(file name, content)` pairs in write order.
    pub fn files(&self) -> [(&'static str, &str); 6] {
        [
            ("filebeat.yml", &self.filebeat),
            ("logstash.conf", &self.logstash),
            ("ingest_pipeline.json", &self.ingest_pipeline),
            ("index_template.json", &self.index_template),
            ("kibana_dashboard.json", &self.dashboard),
            ("alerts.json", &self.alerts),
        ]
    }
}

fn to_json(artifact: &str, value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| Error::Render {
            artifact: artifact.to_string(),
            message: e.to_string(),
        })
}

fn to_yaml(artifact: &str, value: &impl Serialize) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::Render {
        artifact: artifact.to_string(),
        message: e.to_string(),
    })
}

/// Render the artifact set for `environment` from compiled grammars.
pub fn render_environment(
    descriptor: &ServiceDescriptor,
    environment: &Environment,
    grammars: &[ParsingGrammar],
) -> Result<LogPipelineFiles> {
    let ctx = PipelineContext::new(descriptor, environment);
    let files = LogPipelineFiles {
        asset_name: ctx.asset_name(),
        filebeat: to_yaml("filebeat.yml", &collector::filebeat(&ctx, grammars))?,
        logstash: processor::logstash(&ctx, grammars),
        ingest_pipeline: to_json("ingest_pipeline.json", &elastic::ingest_pipeline(&ctx, grammars))?,
        index_template: to_json("index_template.json", &elastic::index_template(&ctx, grammars))?,
        dashboard: to_json("kibana_dashboard.json", &kibana::dashboard(&ctx, grammars))?,
        alerts: to_json("alerts.json", &kibana::alerts(&ctx, grammars))?,
    };
    tracing::debug!(
        service = %ctx.service,
        environment = %ctx.environment,
        sources = grammars.len(),
        "rendered log pipeline artifacts"
    );
    Ok(files)
}
