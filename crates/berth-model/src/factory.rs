use crate::compose::parse_compose;
use crate::environment::{
    ComposeEnvironment, DockerImageEnvironment, DockerfileEnvironment, Environment,
    InternalEnvironment, Warning,
};
use crate::machine::{InternalMachineConfig, MEMORY_LIMIT_ATTRIBUTE, MEMORY_REQUEST_ATTRIBUTE};
use crate::recipe::{InternalRecipe, RecipeKind, COMPOSE_CONTENT_TYPES};
use crate::{EnvironmentError, ValidationError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Warning code for compose services publishing host ports.
pub const PUBLISHED_PORTS_IGNORED: u32 = 4100;

/// Validates raw recipes and produces normalized environments.
///
/// A default of `0` for the memory limit or request means "unset": the
/// attribute is left absent and the memory provisioner decides later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentFactory {
    default_memory_limit: u64,
    default_memory_request: u64,
}

impl EnvironmentFactory {
    pub fn new(default_memory_limit: u64, default_memory_request: u64) -> Self {
        Self {
            default_memory_limit,
            default_memory_request,
        }
    }

    /// Create an environment; its machine key set equals `machines`' key set.
    pub fn create(
        &self,
        recipe: &InternalRecipe,
        machines: BTreeMap<String, InternalMachineConfig>,
    ) -> Result<Environment, EnvironmentError> {
        let kind = recipe.kind()?;
        if recipe.content.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "The content of the '{kind}' recipe must not be empty"
            ))
            .into());
        }
        validate_memory_attributes(&machines)?;

        let env = match kind {
            RecipeKind::Dockerfile => self.create_dockerfile(recipe, machines)?,
            RecipeKind::Image => self.create_image(recipe, machines)?,
            RecipeKind::Compose => self.create_compose(recipe, machines)?,
        };
        debug!(
            "created {kind} environment with {} machine(s), {} warning(s)",
            env.machines().len(),
            env.warnings().len()
        );
        Ok(env)
    }

    /// Insert default memory attributes where a machine has none.
    ///
    /// Existing values are never overwritten, so applying this twice is the
    /// same as applying it once.
    pub fn apply_memory_defaults(&self, machines: &mut BTreeMap<String, InternalMachineConfig>) {
        for machine in machines.values_mut() {
            if self.default_memory_limit > 0 {
                machine
                    .attributes
                    .entry(MEMORY_LIMIT_ATTRIBUTE.to_owned())
                    .or_insert_with(|| self.default_memory_limit.to_string());
            }
            if self.default_memory_request > 0 {
                machine
                    .attributes
                    .entry(MEMORY_REQUEST_ATTRIBUTE.to_owned())
                    .or_insert_with(|| self.default_memory_request.to_string());
            }
        }
    }

    fn create_dockerfile(
        &self,
        recipe: &InternalRecipe,
        mut machines: BTreeMap<String, InternalMachineConfig>,
    ) -> Result<Environment, ValidationError> {
        ensure_single_machine(RecipeKind::Dockerfile, &machines)?;
        self.apply_memory_defaults(&mut machines);
        Ok(Environment::Dockerfile(DockerfileEnvironment {
            dockerfile_content: recipe.content.clone(),
            base: InternalEnvironment::new(
                RecipeKind::Dockerfile,
                recipe.clone(),
                machines,
                Vec::new(),
            ),
        }))
    }

    fn create_image(
        &self,
        recipe: &InternalRecipe,
        mut machines: BTreeMap<String, InternalMachineConfig>,
    ) -> Result<Environment, ValidationError> {
        ensure_single_machine(RecipeKind::Image, &machines)?;
        let image = recipe.content.trim();
        if image.contains(char::is_whitespace) {
            return Err(ValidationError::new(format!(
                "Docker image reference '{image}' is invalid"
            )));
        }
        self.apply_memory_defaults(&mut machines);
        Ok(Environment::Image(DockerImageEnvironment {
            image: image.to_owned(),
            base: InternalEnvironment::new(RecipeKind::Image, recipe.clone(), machines, Vec::new()),
        }))
    }

    fn create_compose(
        &self,
        recipe: &InternalRecipe,
        mut machines: BTreeMap<String, InternalMachineConfig>,
    ) -> Result<Environment, ValidationError> {
        if let Some(content_type) = recipe.content_type.as_deref() {
            if !COMPOSE_CONTENT_TYPES.contains(&content_type) {
                return Err(ValidationError::new(format!(
                    "Content type '{content_type}' of compose recipe is not supported. Supported values are: {}",
                    COMPOSE_CONTENT_TYPES.join(", ")
                )));
            }
        }

        let compose = parse_compose(&recipe.content)?;
        compose.validate()?;
        let start_order = compose.start_order()?;

        let services: BTreeSet<&str> = compose.services.keys().map(String::as_str).collect();
        let configured: BTreeSet<&str> = machines.keys().map(String::as_str).collect();
        let missing: Vec<&str> = configured.difference(&services).copied().collect();
        if !missing.is_empty() {
            return Err(ValidationError::new(format!(
                "Environment contains machines that are missing in recipe: {}",
                missing.join(", ")
            )));
        }
        let unconfigured: Vec<&str> = services.difference(&configured).copied().collect();
        if !unconfigured.is_empty() {
            return Err(ValidationError::new(format!(
                "Environment contains services without machine configuration: {}",
                unconfigured.join(", ")
            )));
        }

        let mut warnings = Vec::new();
        for (name, service) in &compose.services {
            if !service.ports.is_empty() {
                warnings.push(Warning::new(
                    PUBLISHED_PORTS_IGNORED,
                    format!(
                        "Published ports of machine '{name}' are not supported, they are exposed instead"
                    ),
                ));
            }
            if let (Some(limit), Some(machine)) = (service.mem_limit, machines.get_mut(name)) {
                machine
                    .attributes
                    .entry(MEMORY_LIMIT_ATTRIBUTE.to_owned())
                    .or_insert_with(|| limit.to_string());
            }
        }
        self.apply_memory_defaults(&mut machines);

        Ok(Environment::Compose(ComposeEnvironment {
            base: InternalEnvironment::new(RecipeKind::Compose, recipe.clone(), machines, warnings),
            compose,
            start_order,
        }))
    }
}

fn ensure_single_machine(
    kind: RecipeKind,
    machines: &BTreeMap<String, InternalMachineConfig>,
) -> Result<(), ValidationError> {
    if machines.len() == 1 {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "Environment of type '{kind}' must contain exactly one machine, found {}",
            machines.len()
        )))
    }
}

fn validate_memory_attributes(
    machines: &BTreeMap<String, InternalMachineConfig>,
) -> Result<(), ValidationError> {
    for (name, machine) in machines {
        for attribute in [MEMORY_LIMIT_ATTRIBUTE, MEMORY_REQUEST_ATTRIBUTE] {
            if let Some(value) = machine.attributes.get(attribute) {
                if value.trim().parse::<u64>().is_err() {
                    return Err(ValidationError::new(format!(
                        "Value '{value}' of attribute '{attribute}' in machine '{name}' is illegal"
                    )));
                }
            }
        }
    }
    Ok(())
}
