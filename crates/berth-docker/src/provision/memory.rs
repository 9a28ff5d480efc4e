use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};

/// Sets the container memory limit from the `memoryLimitBytes` attribute.
///
/// Machines without the attribute get the configured default; a zero
/// default leaves the limit unset.
pub struct MemoryAttributeConverter {
    default_limit: u64,
}

impl MemoryAttributeConverter {
    pub fn new(default_limit: u64) -> Self {
        Self { default_limit }
    }
}

impl Provisioner for MemoryAttributeConverter {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (_, machine, container) in env.machines_and_containers_mut() {
            let limit = machine
                .memory_limit()
                .or((self.default_limit > 0).then_some(self.default_limit));
            if let Some(limit) = limit {
                container.mem_limit = Some(limit);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::test_support::{environment, identity};
    use berth_model::{InternalMachineConfig, MEMORY_LIMIT_ATTRIBUTE};

    #[test]
    fn attribute_wins_over_default() {
        let mut machine = InternalMachineConfig::default();
        machine
            .attributes
            .insert(MEMORY_LIMIT_ATTRIBUTE.to_owned(), "1073741824".to_owned());
        let mut env = environment(vec![("db", InternalMachineConfig::default()), ("dev", machine)]);
        MemoryAttributeConverter::new(512)
            .provision(&mut env, &identity())
            .unwrap();
        assert_eq!(env.container("dev").unwrap().mem_limit, Some(1_073_741_824));
        assert_eq!(env.container("db").unwrap().mem_limit, Some(512));
    }

    #[test]
    fn zero_default_leaves_limit_unset() {
        let mut env = environment(vec![("dev", InternalMachineConfig::default())]);
        MemoryAttributeConverter::new(0)
            .provision(&mut env, &identity())
            .unwrap();
        assert_eq!(env.container("dev").unwrap().mem_limit, None);
    }
}
