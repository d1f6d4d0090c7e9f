//! Pass trait, pass manager, and serializable pipelines.

use serde::{Deserialize, Serialize};
use sleipnir_ir::Circuit;
use tracing::{debug, info, instrument};

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};
use crate::mapping::QubitMapping;
use crate::placement::{GraphPlacement, PlacementConfig};
use crate::routing::manager::MappingManager;
use crate::routing::{RoutingConfig, RoutingMethod};

/// Properties shared between passes.
///
/// The architecture is set once by the caller; the mapping is produced by
/// a placement pass and rewritten by routing to the output permutation.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Target connectivity graph.
    pub architecture: Option<Architecture>,
    /// Logical-to-physical qubit mapping.
    pub mapping: Option<QubitMapping>,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set for a target architecture.
    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }
}

/// A compilation pass over a circuit.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Run the pass, reading and writing the property set.
    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> MapResult<()>;

    /// Check if this pass should run based on current state.
    fn should_run(&self, _circuit: &Circuit, _properties: &PropertySet) -> bool {
        true
    }
}

/// Pass computing an initial placement (see
/// [`GraphPlacement`](crate::placement::GraphPlacement)).
pub struct PlacementPass {
    config: PlacementConfig,
}

impl PlacementPass {
    /// Create a placement pass.
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }
}

impl Pass for PlacementPass {
    fn name(&self) -> &str {
        "Placement"
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> MapResult<()> {
        let arch = properties
            .architecture
            .as_ref()
            .ok_or_else(|| MapError::MissingArchitecture {
                pass: self.name().to_string(),
            })?;
        let mapping = GraphPlacement::with_config(arch, self.config.clone()).place(circuit)?;
        properties.mapping = Some(mapping);
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.mapping.is_none() && properties.architecture.is_some()
    }
}

/// Pass routing the circuit with an ordered method list.
pub struct RoutingPass {
    methods: Vec<RoutingConfig>,
}

impl RoutingPass {
    /// Create a routing pass.
    pub fn new(methods: Vec<RoutingConfig>) -> Self {
        Self { methods }
    }
}

impl Pass for RoutingPass {
    fn name(&self) -> &str {
        "Routing"
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> MapResult<()> {
        let arch = properties
            .architecture
            .as_ref()
            .ok_or_else(|| MapError::MissingArchitecture {
                pass: self.name().to_string(),
            })?;
        let methods: Vec<RoutingMethod> =
            self.methods.iter().map(RoutingMethod::from).collect();
        let mut mapping = properties.mapping.take().unwrap_or_default();
        MappingManager::new(arch).route(circuit, &mut mapping, &methods)?;
        properties.mapping = Some(mapping);
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.architecture.is_some()
    }
}

/// Manages and executes a sequence of passes.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// The standard placement-then-routing pipeline.
    pub fn standard() -> Self {
        let mut pm = Self::new();
        pm.add_pass(PlacementPass::new(PlacementConfig::default()));
        pm.add_pass(RoutingPass::new(RoutingConfig::default_pipeline()));
        pm
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the circuit.
    #[instrument(skip(self, circuit, properties))]
    pub fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> MapResult<()> {
        info!(
            passes = self.passes.len(),
            qubits = circuit.num_qubits(),
            "running pass manager"
        );
        for pass in &self.passes {
            if pass.should_run(circuit, properties) {
                debug!(pass = pass.name(), "running pass");
                pass.run(circuit, properties)?;
                debug!(pass = pass.name(), ops = circuit.num_ops(), "pass completed");
            } else {
                debug!(pass = pass.name(), "skipping pass");
            }
        }
        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable configuration of one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum PassConfig {
    /// A [`PlacementPass`].
    Placement {
        /// Placement options.
        config: PlacementConfig,
    },
    /// A [`RoutingPass`].
    Routing {
        /// Ordered routing-method configurations.
        methods: Vec<RoutingConfig>,
    },
}

/// A serializable ordered pass list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Passes, in execution order.
    pub passes: Vec<PassConfig>,
}

impl PipelineConfig {
    /// The standard placement-then-routing pipeline.
    pub fn standard() -> Self {
        Self {
            passes: vec![
                PassConfig::Placement {
                    config: PlacementConfig::default(),
                },
                PassConfig::Routing {
                    methods: RoutingConfig::default_pipeline(),
                },
            ],
        }
    }

    /// Build a runnable pass manager from this configuration.
    pub fn build(&self) -> PassManager {
        let mut pm = PassManager::new();
        for pass in &self.passes {
            match pass {
                PassConfig::Placement { config } => {
                    pm.add_pass(PlacementPass::new(config.clone()));
                }
                PassConfig::Routing { methods } => {
                    pm.add_pass(RoutingPass::new(methods.clone()));
                }
            }
        }
        pm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::QubitId;

    #[test]
    fn test_standard_pipeline_runs() {
        let arch = Architecture::line(4);
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let pm = PassManager::standard();
        let mut props = PropertySet::new().with_architecture(arch.clone());
        pm.run(&mut circuit, &mut props).unwrap();

        let mapping = props.mapping.unwrap();
        assert_eq!(mapping.len(), 3);
        for inst in circuit.instructions() {
            if inst.is_two_qubit_gate() {
                let args: Vec<_> = inst
                    .qubits
                    .iter()
                    .map(|w| {
                        sleipnir_ir::Node::from_unit(circuit.qubit_label(*w).unwrap().clone())
                    })
                    .collect();
                assert!(arch.valid_operation(&args));
            }
        }
    }

    #[test]
    fn test_placement_pass_skipped_with_mapping_present() {
        let arch = Architecture::line(3);
        let props = PropertySet {
            architecture: Some(arch),
            mapping: Some(QubitMapping::identity(2)),
        };
        let pass = PlacementPass::new(PlacementConfig::default());
        let circuit = Circuit::with_size("t", 2, 0);
        assert!(!pass.should_run(&circuit, &props));
    }

    #[test]
    fn test_missing_architecture() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        let mut props = PropertySet::new();
        let pass = RoutingPass::new(RoutingConfig::default_pipeline());
        let err = pass.run(&mut circuit, &mut props);
        assert!(matches!(err, Err(MapError::MissingArchitecture { .. })));
    }

    #[test]
    fn test_pipeline_config_round_trip() {
        let pipeline = PipelineConfig::standard();
        let json = serde_json::to_string_pretty(&pipeline).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pipeline);
        assert_eq!(back.build().len(), 2);
    }
}
