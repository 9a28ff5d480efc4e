use crate::compose::ComposeRecipe;
use crate::machine::InternalMachineConfig;
use crate::recipe::{InternalRecipe, RecipeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-fatal issue found while creating an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warning {
    pub code: u32,
    pub message: String,
}

impl Warning {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Normalized, infrastructure-agnostic description of an environment.
///
/// Machines and recipe are fixed at creation; only warnings and attributes
/// may be added afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalEnvironment {
    env_type: RecipeKind,
    recipe: InternalRecipe,
    machines: BTreeMap<String, InternalMachineConfig>,
    warnings: Vec<Warning>,
    attributes: BTreeMap<String, String>,
}

impl InternalEnvironment {
    pub fn new(
        env_type: RecipeKind,
        recipe: InternalRecipe,
        machines: BTreeMap<String, InternalMachineConfig>,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            env_type,
            recipe,
            machines,
            warnings,
            attributes: BTreeMap::new(),
        }
    }

    pub fn env_type(&self) -> RecipeKind {
        self.env_type
    }

    pub fn recipe(&self) -> &InternalRecipe {
        &self.recipe
    }

    pub fn machines(&self) -> &BTreeMap<String, InternalMachineConfig> {
        &self.machines
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }
}

/// Single-machine environment built from an inline Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerfileEnvironment {
    pub base: InternalEnvironment,
    pub dockerfile_content: String,
}

/// Single-machine environment running a pre-built image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerImageEnvironment {
    pub base: InternalEnvironment,
    pub image: String,
}

/// Multi-machine environment described by a compose document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComposeEnvironment {
    pub base: InternalEnvironment,
    pub compose: ComposeRecipe,
    /// Machine names in dependency order.
    pub start_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dockerfile(DockerfileEnvironment),
    Image(DockerImageEnvironment),
    Compose(ComposeEnvironment),
}

impl Environment {
    pub fn base(&self) -> &InternalEnvironment {
        match self {
            Environment::Dockerfile(env) => &env.base,
            Environment::Image(env) => &env.base,
            Environment::Compose(env) => &env.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut InternalEnvironment {
        match self {
            Environment::Dockerfile(env) => &mut env.base,
            Environment::Image(env) => &mut env.base,
            Environment::Compose(env) => &mut env.base,
        }
    }

    pub fn kind(&self) -> RecipeKind {
        self.base().env_type()
    }

    pub fn machines(&self) -> &BTreeMap<String, InternalMachineConfig> {
        self.base().machines()
    }

    pub fn warnings(&self) -> &[Warning] {
        self.base().warnings()
    }

    /// Machine names in the order they must be started.
    pub fn start_order(&self) -> Vec<String> {
        match self {
            Environment::Compose(env) => env.start_order.clone(),
            _ => self.machines().keys().cloned().collect(),
        }
    }

    /// blake3 digest of the canonical JSON form.
    ///
    /// Equal environments have equal fingerprints, so callers can detect an
    /// unchanged environment across restarts without keeping the old value.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{InstallerConfig, ServerConfig};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn machines() -> BTreeMap<String, InternalMachineConfig> {
        let mut installer = InstallerConfig::new("exec");
        installer
            .servers
            .insert("exec-agent".to_owned(), ServerConfig::new("4412/tcp", "http"));
        let machine = InternalMachineConfig {
            installers: vec![installer],
            ..InternalMachineConfig::default()
        };
        BTreeMap::from([("dev-machine".to_owned(), machine)])
    }

    fn dockerfile_env(content: &str, warnings: Vec<Warning>) -> DockerfileEnvironment {
        let recipe = InternalRecipe::new("dockerfile", content);
        DockerfileEnvironment {
            base: InternalEnvironment::new(RecipeKind::Dockerfile, recipe, machines(), warnings),
            dockerfile_content: content.to_owned(),
        }
    }

    #[test]
    fn identical_dockerfile_environments_are_equal() {
        let a = dockerfile_env("FROM alpine", vec![Warning::new(1, "w")]);
        let b = dockerfile_env("FROM alpine", vec![Warning::new(1, "w")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn any_differing_field_breaks_equality() {
        let reference = dockerfile_env("FROM alpine", Vec::new());

        let mut other_content = reference.clone();
        other_content.dockerfile_content = "FROM debian".to_owned();
        assert_ne!(reference, other_content);

        let other_recipe = DockerfileEnvironment {
            base: InternalEnvironment::new(
                RecipeKind::Dockerfile,
                InternalRecipe::new("dockerfile", "FROM debian"),
                machines(),
                Vec::new(),
            ),
            dockerfile_content: "FROM alpine".to_owned(),
        };
        assert_ne!(reference, other_recipe);

        let other_warnings = dockerfile_env("FROM alpine", vec![Warning::new(2, "x")]);
        assert_ne!(reference, other_warnings);

        let mut other_attributes = reference.clone();
        other_attributes.base.set_attribute("memory", "1g");
        assert_ne!(reference, other_attributes);

        let other_machines = DockerfileEnvironment {
            base: InternalEnvironment::new(
                RecipeKind::Dockerfile,
                InternalRecipe::new("dockerfile", "FROM alpine"),
                BTreeMap::new(),
                Vec::new(),
            ),
            dockerfile_content: "FROM alpine".to_owned(),
        };
        assert_ne!(reference, other_machines);

        let other_type = DockerfileEnvironment {
            base: InternalEnvironment::new(
                RecipeKind::Image,
                InternalRecipe::new("dockerfile", "FROM alpine"),
                machines(),
                Vec::new(),
            ),
            dockerfile_content: "FROM alpine".to_owned(),
        };
        assert_ne!(reference, other_type);
    }

    #[test]
    fn image_environment_equality_includes_image() {
        let base = InternalEnvironment::new(
            RecipeKind::Image,
            InternalRecipe::new("dockerimage", "alpine"),
            machines(),
            Vec::new(),
        );
        let a = DockerImageEnvironment {
            base: base.clone(),
            image: "alpine".to_owned(),
        };
        let b = DockerImageEnvironment {
            base,
            image: "alpine:3.20".to_owned(),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_tracks_equality() {
        let a = Environment::Dockerfile(dockerfile_env("FROM alpine", Vec::new()));
        let b = Environment::Dockerfile(dockerfile_env("FROM alpine", Vec::new()));
        let c = Environment::Dockerfile(dockerfile_env("FROM debian", Vec::new()));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn warnings_and_attributes_can_be_added() {
        let mut env = Environment::Dockerfile(dockerfile_env("FROM alpine", Vec::new()));
        env.base_mut().add_warning(Warning::new(7, "late"));
        env.base_mut().set_attribute("k", "v");
        assert_eq!(env.warnings().len(), 1);
        assert_eq!(env.base().attributes()["k"], "v");
        assert_eq!(env.start_order(), vec!["dev-machine"]);
    }
}
