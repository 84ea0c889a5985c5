//! Artifact generation
//!
//! Runs both synthesis engines over a descriptor and assembles one
//! [`ArtifactSet`] per environment. Problems from either engine are
//! collected and reported together before anything is rendered.

use crate::artifacts::{ArtifactSet, GroupSelection};
use crate::config::InfraConfig;
use crate::{Error, Result};
use mon_checks::{
    CheckCommand, CheckRegistry, CheckSynthesizer, HttpProber, PluginProvider, Prober, SyntaxIssue,
    TemplateProvider,
};
use mon_fs::NormalizedPath;
use mon_logs::{LogCompiler, ParsingGrammar};
use mon_model::ServiceDescriptor;
use std::time::Duration;

/// Output of both engines for one descriptor.
#[derive(Debug, Default)]
pub struct Synthesis {
    pub checks: Vec<CheckCommand>,
    pub grammars: Vec<ParsingGrammar>,
    /// Discovery and lenient-pattern warnings, already logged.
    pub warnings: Vec<String>,
}

pub struct Generator {
    registry: CheckRegistry,
    compiler: LogCompiler,
    prober: Option<Box<dyn Prober>>,
}

impl Generator {
    pub fn new(registry: CheckRegistry, compiler: LogCompiler) -> Self {
        Self {
            registry,
            compiler,
            prober: None,
        }
    }

    /// Registry from built-ins and the configured plugin files; discovery
    /// through HTTP when enabled.
    pub fn from_config(config: &InfraConfig) -> Result<Self> {
        let files = config
            .synthesis
            .plugin_files
            .iter()
            .map(NormalizedPath::new)
            .collect();
        let templates = TemplateProvider::new(files);
        let providers: [&dyn PluginProvider; 1] = [&templates];
        let registry = CheckRegistry::from_providers(&providers)?;

        let mut generator = Self::new(registry, LogCompiler::new(config.synthesis.strict_patterns));
        if config.synthesis.discovery {
            let timeout = Duration::from_secs(config.synthesis.discovery_timeout_secs.max(1));
            generator = generator.with_prober(Box::new(HttpProber::new(timeout)?));
        }
        Ok(generator)
    }

    pub fn with_prober(mut self, prober: Box<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Run both engines, failing with every problem found if any.
    pub fn synthesize(&self, descriptor: &ServiceDescriptor, selection: GroupSelection) -> Result<Synthesis> {
        let mut synthesis = Synthesis::default();
        let mut problems = Vec::new();

        if selection.checks {
            let mut synthesizer = CheckSynthesizer::new(&self.registry);
            if let Some(prober) = self.prober.as_deref() {
                synthesizer = synthesizer.with_discovery(prober);
            }
            let report = synthesizer.synthesize_all(descriptor);
            problems.extend(report.errors.iter().map(ToString::to_string));
            synthesis.warnings.extend(report.warnings.iter().map(ToString::to_string));
            synthesis.checks = report.commands;
        }

        if selection.logs {
            let report = self.compiler.compile_all(descriptor);
            problems.extend(report.errors.iter().map(ToString::to_string));
            synthesis.warnings.extend(report.warnings().map(ToString::to_string));
            synthesis.grammars = report.grammars;
        }

        if !problems.is_empty() {
            return Err(Error::Synthesis { problems });
        }
        tracing::info!(
            service = %descriptor.identification.name,
            checks = synthesis.checks.len(),
            grammars = synthesis.grammars.len(),
            warnings = synthesis.warnings.len(),
            "synthesis complete"
        );
        Ok(synthesis)
    }

    /// Render the artifact set for one environment.
    pub fn render(
        &self,
        descriptor: &ServiceDescriptor,
        synthesis: &Synthesis,
        environment: &str,
        selection: GroupSelection,
    ) -> Result<ArtifactSet> {
        let env = descriptor
            .environment(environment)
            .ok_or_else(|| Error::UnknownEnvironment {
                name: environment.to_string(),
            })?;
        if !env.is_deployable() {
            tracing::warn!(environment = %env.name, "environment has no hosts; artifacts cannot be deployed");
        }

        let checks = selection
            .checks
            .then(|| mon_checks::render_environment(descriptor, env, &synthesis.checks));
        let logs = if selection.logs {
            Some(mon_logs::render_environment(descriptor, env, &synthesis.grammars)?)
        } else {
            None
        };
        Ok(ArtifactSet::new(
            &descriptor.identification.name,
            &env.name,
            env.hosts.clone(),
            checks.as_ref(),
            logs.as_ref(),
        ))
    }

    /// Synthesize once and render every named environment, or all of them
    /// when `environments` is empty.
    pub fn generate(
        &self,
        descriptor: &ServiceDescriptor,
        environments: &[String],
        selection: GroupSelection,
    ) -> Result<Vec<ArtifactSet>> {
        let synthesis = self.synthesize(descriptor, selection)?;
        let names: Vec<String> = if environments.is_empty() {
            descriptor.environments.iter().map(|e| e.name.clone()).collect()
        } else {
            environments.to_vec()
        };
        names
            .iter()
            .map(|name| self.render(descriptor, &synthesis, name, selection))
            .collect()
    }
}

/// Local syntax check of a set's check-system objects.
pub fn check_syntax(set: &ArtifactSet) -> Vec<SyntaxIssue> {
    mon_checks::validate_object_set(set.check_files())
}
